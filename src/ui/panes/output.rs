//! Output pane rendering

use crate::snapshot::render_output;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{List, ListItem, Padding, Paragraph},
    Frame,
};

/// Render the output pane
pub fn render_output_pane(
    frame: &mut Frame,
    area: Rect,
    output: &[i64],
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = super::pane_block(" Output ", is_focused);
    let lines = render_output(output);

    if lines.is_empty() {
        let paragraph = Paragraph::new("(no output)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    super::clamp_scroll(scroll_offset, lines.len(), visible_height);

    let items: Vec<ListItem> = lines
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|line| ListItem::new(line).style(Style::default().fg(DEFAULT_THEME.fg)))
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
