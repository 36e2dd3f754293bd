//! Error types for percent-decoding and key/value extraction.

use thiserror::Error;

/// Errors raised by strict percent-decoding in [`crate::codec::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A `%` was not followed by two hexadecimal digits.
    #[error("Invalid percent escape at byte {position}")]
    InvalidEscape {
        /// Byte offset of the offending `%`.
        position: usize,
    },

    /// The decoded bytes do not form valid UTF-8.
    #[error("Decoded bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Errors raised by key/value extraction.
///
/// [`StandardKeyValueParser`](crate::parser::StandardKeyValueParser)
/// never rejects input text, it simply drops tokens it cannot split.
/// The parsing trait stays fallible so custom parsers can refuse inputs
/// they cannot make sense of.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// The input could not be interpreted as key/value pairs.
    #[error("Malformed key/value input: {0}")]
    MalformedInput(String),

    /// A delimiter pattern failed to compile.
    #[error("Invalid delimiter pattern: {0}")]
    Pattern(#[from] regex::Error),
}
