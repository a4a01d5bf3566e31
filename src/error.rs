//! Error types for catalogue parsing.
//!
//! `ParseError` is line-local and never aborts a run: the file driver collects
//! one per malformed line and keeps going. `UnrecoverableInput` is the only
//! fatal outcome and stops validation of the file immediately.

use thiserror::Error;

/// A declaration line that matches no grammar production.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: malformed signature `{text}`: {reason}")]
pub struct ParseError {
    pub line: usize,
    pub text: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(line: usize, text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            line,
            text: text.into(),
            reason: reason.into(),
        }
    }
}

/// Input whose block structure cannot be recovered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnrecoverableInput {
    #[error("line {line}: block for `{name}` is never closed with `end`")]
    UnterminatedBlock { name: String, line: usize },
    #[error("line {line}: `end` without an open block")]
    UnmatchedEnd { line: usize },
    #[error("input is not valid UTF-8 (first invalid byte at offset {offset})")]
    InvalidEncoding { offset: usize },
}
