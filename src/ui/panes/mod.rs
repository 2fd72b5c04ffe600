//! TUI pane rendering modules
//!
//! Each pane module exports a primary `render_*` function that draws one
//! region of the screen from a [`Snapshot`](crate::snapshot::Snapshot).
//!
//! - [`program`]: disassembly listing with the current instruction highlighted
//! - [`registers`]: program counter, relative base, state and counters
//! - [`memory`]: word dump of the dense region followed by sparse cells
//! - [`output`]: rendered output log
//! - [`status`]: status bar with keybindings and execution state

pub mod memory;
pub mod output;
pub mod program;
pub mod registers;
pub mod status;

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    style::{Modifier, Style},
    widgets::{Block, Borders},
};

pub use memory::render_memory_pane;
pub use output::render_output_pane;
pub use program::render_program_pane;
pub use registers::render_registers_pane;
pub use status::render_status_bar;

/// Bordered block with the focus-dependent border style shared by every pane
pub(crate) fn pane_block(title: &str, is_focused: bool) -> Block<'_> {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Clamp a scroll offset so the last page stays full
pub(crate) fn clamp_scroll(offset: &mut usize, total: usize, visible: usize) {
    if total > visible {
        *offset = (*offset).min(total - visible);
    } else {
        *offset = 0;
    }
}
