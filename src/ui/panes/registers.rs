//! Register pane

use crate::interpreter::engine::MachineState;
use crate::snapshot::Snapshot;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Padding, Paragraph},
    Frame,
};

fn row<'a>(label: &'a str, value: String, style: Style) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            format!("{:<16}", label),
            Style::default().fg(DEFAULT_THEME.comment),
        ),
        Span::styled(value, style),
    ])
}

/// Render the machine registers and counters
pub fn render_registers_pane(frame: &mut Frame, area: Rect, snapshot: &Snapshot, is_focused: bool) {
    let block = super::pane_block(" Registers ", is_focused).padding(Padding::new(1, 0, 0, 0));
    let number = Style::default().fg(DEFAULT_THEME.number);

    let (state, state_style) = match snapshot.state {
        MachineState::Running => ("running", Style::default().fg(DEFAULT_THEME.success)),
        MachineState::AwaitingInput => ("awaiting input", Style::default().fg(DEFAULT_THEME.secondary)),
        MachineState::Halted => ("halted", Style::default().fg(DEFAULT_THEME.error)),
    };

    let last_write = snapshot
        .last_write
        .map(|address| format!("[{}] = {}", address, snapshot.memory.load(address)))
        .unwrap_or_else(|| "-".to_string());

    let lines = vec![
        row("pc", snapshot.pc.to_string(), number.add_modifier(Modifier::BOLD)),
        row("relative base", snapshot.relative_base.to_string(), number),
        row("state", state.to_string(), state_style.add_modifier(Modifier::BOLD)),
        row("step", snapshot.step_index.to_string(), number),
        row("inputs read", snapshot.inputs_consumed.to_string(), number),
        row("outputs", snapshot.output.len().to_string(), number),
        row(
            "last write",
            last_write,
            Style::default().fg(DEFAULT_THEME.written),
        ),
        row("memory words", snapshot.memory.len().to_string(), number),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
