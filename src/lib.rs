//! # Introduction
//!
//! `intcode` loads programs for a small integer virtual machine, runs them one
//! instruction at a time, and composes several machines into pipelines,
//! feedback loops and packet networks. A recorded run can be browsed forward
//! and backward in a terminal UI built with [ratatui](https://docs.rs/ratatui).
//!
//! ## Execution pipeline
//!
//! ```text
//! Text → Parser → Memory image → Machine → Output
//!                                    ↓
//!                          Tracer → Snapshots → TUI
//! ```
//!
//! 1. [`parser`]: turns comma-separated text into a memory image.
//! 2. [`memory`]: unbounded zero-initialised word storage and parameter modes.
//! 3. [`interpreter`]: instruction decoding, the step loop, I/O channels and
//!    the recording tracer.
//! 4. [`orchestrator`]: pipeline, feedback loop and packet network drivers.
//! 5. [`snapshot`]: per-instruction snapshots with a memory limit, and output
//!    rendering.
//! 6. [`ui`]: ratatui-based TUI; not part of the stable library API.
//!
//! ## Instruction set
//!
//! Add, multiply, input, output, jump-if-true, jump-if-false, less-than,
//! equals, adjust-relative-base and halt, with position, immediate and
//! relative parameter modes.

pub mod interpreter;
pub mod memory;
pub mod orchestrator;
pub mod parser;
pub mod snapshot;
pub mod ui;
