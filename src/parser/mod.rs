//! Program text parser
//!
//! This module turns program text into a memory image:
//! - [`parse`]: comma-separated integer parsing with token-level errors
//!
//! # Format
//!
//! A program is a UTF-8 string of comma-separated, optionally signed base-10
//! integers. Surrounding whitespace and newlines are trimmed before splitting,
//! and each token is trimmed again so `1, 2,\n3` is accepted.

pub mod parse;

pub use parse::{parse_program, ParseError};
