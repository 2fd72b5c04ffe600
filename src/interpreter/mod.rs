//! Integer machine execution engine
//!
//! This module provides the core execution logic:
//! - [`decoder`]: Instruction word decoding and disassembly
//! - [`engine`]: The [`Machine`](engine::Machine) fetch-decode-execute loop
//! - [`io`]: Input providers, output consumers and the [`Channel`](io::Channel) pairing them
//! - [`tracer`]: Recorded execution with time-travel navigation
//! - [`errors`]: Runtime error types
//! - [`constants`]: Shared defaults
//!
//! # Execution Model
//!
//! A machine executes one instruction per [`step`](engine::Machine::step) in an
//! explicit loop. Input and output instructions are the only points where it
//! hands control back to its driver, so the same machine can be driven from a
//! plain loop, from callbacks, or from async tasks.

pub mod constants;
pub mod decoder;
pub mod engine;
pub mod errors;
pub mod io;
pub mod tracer;
