//! Percent-encoding codec and key/value extraction pipeline for Tollgate.
//!
//! This crate provides the low-level plumbing for pulling key/value
//! pairs out of `Authorization` headers, query strings, and
//! form-encoded bodies: regex-delimited splitting, composable cleanup
//! handlers, and a strict percent-encoding codec.
//!
//! # Overview
//!
//! Splitting delimited text sounds trivial and is not: values arrive
//! quoted, percent escapes arrive in mixed case, and malformed tokens
//! must be dropped without failing the whole request. Parsers push each
//! extracted pair through a chain of handlers built at the call site,
//! so every consumer decides its own cleanup: trim, unquote, normalize
//! encoding, then accumulate.
//!
//! # Usage
//!
//! ```rust
//! use tollgate_keyvalue::handler::{DuplicateKeyValueHandler, TrimmingKeyValueHandler};
//! use tollgate_keyvalue::parser::{KeyValueParser, StandardKeyValueParser};
//!
//! let mut collector = DuplicateKeyValueHandler::new();
//! {
//!     let mut trimming = TrimmingKeyValueHandler::new(&mut collector);
//!     StandardKeyValueParser::query().parse("a=%2Fpath&b= 1 ", &mut [&mut trimming])?;
//! }
//! let pairs = collector.into_pairs();
//! assert_eq!(pairs[0].value, "%2Fpath");
//! assert_eq!(pairs[1].value, "1");
//! # Ok::<(), tollgate_keyvalue::ParseError>(())
//! ```
//!
//! # Modules
//!
//! - [`codec`] - Strict percent-encoding, decoding, and normalization
//! - [`error`] - Decode and parse error types
//! - [`handler`] - Accumulating sinks and rewriting wrappers for extracted pairs
//! - [`parser`] - Regex-delimited key/value splitting
//! - [`transformer`] - String rewrites usable inside handler chains

pub mod codec;
pub mod error;
pub mod handler;
pub mod parser;
pub mod transformer;

pub use error::{DecodeError, ParseError};
pub use handler::{KeyValueHandler, Pair};
pub use parser::KeyValueParser;
pub use transformer::Transformer;
