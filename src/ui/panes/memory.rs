//! Memory pane: a word dump of the dense region, then any sparse cells
//!
//! Cells are highlighted when they hold the current instruction, were the
//! target of the last write, or sit under the relative base.

use crate::snapshot::Snapshot;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Words shown per row
pub const WORDS_PER_ROW: usize = 8;

fn cell_style(snapshot: &Snapshot, address: usize) -> Style {
    if address == snapshot.pc {
        Style::default()
            .bg(DEFAULT_THEME.secondary)
            .fg(ratatui::style::Color::Black)
            .add_modifier(Modifier::BOLD)
    } else if snapshot.last_write == Some(address) {
        Style::default()
            .fg(DEFAULT_THEME.written)
            .add_modifier(Modifier::BOLD)
    } else if usize::try_from(snapshot.relative_base).ok() == Some(address) {
        Style::default().fg(DEFAULT_THEME.relative_base)
    } else {
        Style::default().fg(DEFAULT_THEME.fg)
    }
}

fn dump_lines(snapshot: &Snapshot) -> Vec<Line<'static>> {
    let dense = snapshot.memory.dense();
    let mut lines: Vec<Line> = dense
        .chunks(WORDS_PER_ROW)
        .enumerate()
        .map(|(row, words)| {
            let base = row * WORDS_PER_ROW;
            let mut spans = vec![Span::styled(
                format!("{:>6}: ", base),
                Style::default().fg(DEFAULT_THEME.comment),
            )];
            spans.extend(words.iter().enumerate().map(|(i, word)| {
                Span::styled(format!("{:>8} ", word), cell_style(snapshot, base + i))
            }));
            Line::from(spans)
        })
        .collect();

    let sparse = snapshot.memory.sparse_entries();
    if !sparse.is_empty() {
        lines.push(Line::from(Span::styled(
            "sparse",
            Style::default().fg(DEFAULT_THEME.primary),
        )));
        lines.extend(sparse.into_iter().map(|(address, value)| {
            Line::from(vec![
                Span::styled(
                    format!("{:>6}: ", address),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled(format!("{:>8}", value), cell_style(snapshot, address)),
            ])
        }));
    }

    lines
}

/// Render the memory pane
pub fn render_memory_pane(
    frame: &mut Frame,
    area: Rect,
    snapshot: &Snapshot,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = super::pane_block(" Memory ", is_focused);
    let lines = dump_lines(snapshot);

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    super::clamp_scroll(scroll_offset, lines.len(), visible_height);

    let visible: Vec<Line> = lines
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();

    frame.render_widget(Paragraph::new(visible).block(block), area);
}
