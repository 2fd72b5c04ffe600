//! Comma-separated integer program parsing

use std::num::ParseIntError;
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("program text is empty")]
    Empty,

    #[error("invalid token {token:?} at position {index}: {source}")]
    InvalidToken {
        token: String,
        index: usize,
        #[source]
        source: ParseIntError,
    },
}

/// Parse program text into a memory image
pub fn parse_program(text: &str) -> Result<Vec<i64>, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    text.split(',')
        .enumerate()
        .map(|(index, token)| {
            let token = token.trim();
            token.parse::<i64>().map_err(|source| ParseError::InvalidToken {
                token: token.to_string(),
                index,
                source,
            })
        })
        .collect()
}
