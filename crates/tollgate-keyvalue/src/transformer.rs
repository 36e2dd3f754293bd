//! String transforms applied inside handler wrappers.

use crate::codec;

/// A pure string rewrite, applied to keys or values by the transforming
/// handlers in [`crate::handler`].
pub trait Transformer: Send + Sync {
    /// Produce the rewritten string.
    fn transform(&self, input: &str) -> String;
}

/// Trims leading and trailing whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimTransformer;

impl Transformer for TrimTransformer {
    fn transform(&self, input: &str) -> String {
        input.trim().to_owned()
    }
}

/// Canonicalizes percent-encoded entities via [`codec::normalize`].
///
/// Capitalizes `%XX` escapes, replaces `+` with `%20`, and un-escapes
/// encoded unreserved characters. It will do strange things to a string
/// that is not actually percent-encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlEncodingNormalizingTransformer;

impl Transformer for UrlEncodingNormalizingTransformer {
    fn transform(&self, input: &str) -> String {
        codec::normalize(input).into_owned()
    }
}
