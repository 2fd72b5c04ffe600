//! Program pane: a disassembly listing of memory
//!
//! The listing is recomputed from the snapshot's memory, so self-modifying
//! programs show their current code. The instruction at the program counter is
//! highlighted and kept at a fixed visual row while stepping.

use crate::interpreter::decoder::{listing, Disassembly};
use crate::memory::Memory;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Scroll state for the program pane
#[derive(Debug, Default)]
pub struct ProgramScrollState {
    pub offset: usize,
    pub target_row: Option<usize>,
}

fn highlight_entry(entry: &Disassembly) -> Vec<Span<'_>> {
    let (mnemonic, rest) = entry
        .text
        .split_once(' ')
        .unwrap_or((entry.text.as_str(), ""));

    let mnemonic_style = if mnemonic == ".word" {
        Style::default().fg(DEFAULT_THEME.comment)
    } else {
        Style::default()
            .fg(DEFAULT_THEME.mnemonic)
            .add_modifier(Modifier::BOLD)
    };

    vec![
        Span::styled(format!("{:<6}", mnemonic), mnemonic_style),
        Span::styled(rest.to_string(), Style::default().fg(DEFAULT_THEME.fg)),
    ]
}

/// Render the program pane
pub fn render_program_pane(
    frame: &mut Frame,
    area: Rect,
    memory: &Memory,
    pc: usize,
    is_error: bool,
    is_focused: bool,
    scroll_state: &mut ProgramScrollState,
) {
    let block = super::pane_block(" Program ", is_focused);
    let entries = listing(memory, pc);
    let current = entries.iter().position(|entry| entry.address == pc);

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    let target_row = scroll_state
        .target_row
        .unwrap_or(visible_height / 2)
        .min(visible_height.saturating_sub(1));
    scroll_state.target_row = Some(target_row);

    if let Some(index) = current {
        scroll_state.offset = index.saturating_sub(target_row);
    }
    super::clamp_scroll(&mut scroll_state.offset, entries.len(), visible_height);

    let lines: Vec<Line> = entries
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(index, entry)| {
            let is_current = Some(index) == current;
            let address = Span::styled(
                format!("{:>6} ", entry.address),
                if is_current {
                    Style::default()
                        .fg(DEFAULT_THEME.secondary)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(DEFAULT_THEME.comment)
                },
            );

            let mut spans = vec![address];
            let mut body = highlight_entry(entry);
            if is_current && is_error {
                for span in &mut body {
                    span.style = Style::default()
                        .bg(DEFAULT_THEME.error)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD);
                }
            } else if is_current {
                for span in &mut body {
                    span.style = span.style.bg(DEFAULT_THEME.current_line_bg);
                }
            }
            spans.extend(body);
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
