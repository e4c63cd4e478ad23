//! Error types surfaced by the runtime API.

use thiserror::Error;

/// Everything that can go wrong calling into a failpoint.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FailpointError {
    /// No failpoint with this name has ever been enabled.
    #[error("failpoint: failpoint `{0}` does not exist")]
    NotExist(String),

    /// The failpoint exists but currently has no terms installed.
    #[error("failpoint: failpoint `{0}` is disabled")]
    Disabled(String),

    /// Every term on this failpoint has been exhausted by its count.
    #[error("failpoint: failpoint `{0}` is not allowed to fire again")]
    NotAllowed(String),

    /// The terms string given to [`crate::enable`] could not be parsed.
    #[error("failpoint: could not parse terms: {0}")]
    Parse(#[from] ParseError),
}

/// A failure parsing a terms string (§[TERMS] grammar).
#[derive(Debug, Error, Clone, PartialEq)]
#[error("unexpected input at byte {pos}: {tail:?}")]
pub struct ParseError {
    /// Byte offset into the original terms string where parsing stopped
    /// making progress.
    pub pos: usize,
    /// The remaining, unparsed tail of the string at that offset.
    pub tail: String,
}

impl ParseError {
    pub(crate) fn at(source: &str, pos: usize) -> Self {
        ParseError {
            pos,
            tail: source[pos..].to_string(),
        }
    }
}
