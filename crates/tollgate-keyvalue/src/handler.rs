//! Sinks and wrappers for extracted key/value pairs.
//!
//! A [`KeyValueHandler`] receives every pair a parser finds. Terminal
//! handlers accumulate pairs; wrapper handlers rewrite the pair and
//! delegate to an underlying handler, so cleanup steps stack into a
//! chain built outside-in at the call site.

use std::borrow::Cow;
use std::fmt;

use tracing::debug;

use crate::codec;
use crate::transformer::Transformer;

/// A key/value pair captured from a header, query string, or body.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pair {
    /// The key, in whatever encoding the source delivered it.
    pub key: String,
    /// The value, possibly empty.
    pub value: String,
}

impl Pair {
    /// Creates a pair from anything string-like.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Receives each key/value pair produced by a parser.
pub trait KeyValueHandler {
    /// Handles one extracted pair.
    fn handle(&mut self, key: &str, value: &str);
}

/// Discards every pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullKeyValueHandler;

impl KeyValueHandler for NullKeyValueHandler {
    fn handle(&mut self, _key: &str, _value: &str) {}
}

/// Buffers every pair in arrival order, duplicates included.
#[derive(Debug, Clone, Default)]
pub struct DuplicateKeyValueHandler {
    pairs: Vec<Pair>,
}

impl DuplicateKeyValueHandler {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The pairs collected so far.
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Consumes the handler and returns the collected pairs.
    pub fn into_pairs(self) -> Vec<Pair> {
        self.pairs
    }
}

impl KeyValueHandler for DuplicateKeyValueHandler {
    fn handle(&mut self, key: &str, value: &str) {
        self.pairs.push(Pair::new(key, value));
    }
}

/// Buffers pairs keyed by name, keeping the last value seen for each
/// key while preserving first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct SingleKeyValueHandler {
    pairs: Vec<Pair>,
}

impl SingleKeyValueHandler {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The deduplicated pairs in first-insertion order.
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Consumes the handler and returns the deduplicated pairs.
    pub fn into_pairs(self) -> Vec<Pair> {
        self.pairs
    }
}

impl KeyValueHandler for SingleKeyValueHandler {
    fn handle(&mut self, key: &str, value: &str) {
        if let Some(pair) = self.pairs.iter_mut().find(|pair| pair.key == key) {
            pair.value = value.to_owned();
        } else {
            self.pairs.push(Pair::new(key, value));
        }
    }
}

/// Records a key only when exactly one pair arrives and its value is
/// empty. Any second pair, whatever its content, clears the record.
///
/// Useful for spotting a request whose query string is nothing but a
/// bare token.
#[derive(Debug, Clone, Default)]
pub struct OneKeyOnlyKeyValueHandler {
    invoked: bool,
    key: Option<String>,
}

impl OneKeyOnlyKeyValueHandler {
    /// Creates a fresh handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// The lone empty-valued key, if one (and only one) pair arrived.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Consumes the handler and returns the recorded key.
    pub fn into_key(self) -> Option<String> {
        self.key
    }
}

impl KeyValueHandler for OneKeyOnlyKeyValueHandler {
    fn handle(&mut self, key: &str, value: &str) {
        if self.invoked {
            self.key = None;
        } else {
            self.invoked = true;
            if value.is_empty() {
                self.key = Some(key.to_owned());
            }
        }
    }
}

/// Logs each pair at debug level, tagged with a source label. Terminal,
/// so it can ride alongside a real chain in the same parse call.
#[derive(Debug, Clone)]
pub struct LoggingKeyValueHandler {
    source: String,
}

impl LoggingKeyValueHandler {
    /// Creates a handler that tags pairs with `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl KeyValueHandler for LoggingKeyValueHandler {
    fn handle(&mut self, key: &str, value: &str) {
        debug!(source = %self.source, key = %key, value = %value, "extracted key/value pair");
    }
}

/// Strips one balanced pair of double quotes from the value.
///
/// The quote check runs on the trimmed value. When it matches, the
/// underlying handler sees the trimmed, unquoted value; otherwise it
/// sees the value exactly as it arrived.
pub struct MaybeQuotedValueKeyValueHandler<'a> {
    underlying: &'a mut dyn KeyValueHandler,
}

impl<'a> MaybeQuotedValueKeyValueHandler<'a> {
    /// Wraps `underlying`.
    pub fn new(underlying: &'a mut dyn KeyValueHandler) -> Self {
        Self { underlying }
    }
}

impl KeyValueHandler for MaybeQuotedValueKeyValueHandler<'_> {
    fn handle(&mut self, key: &str, value: &str) {
        let trimmed = value.trim();
        if trimmed.len() > 1 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            self.underlying.handle(key, &trimmed[1..trimmed.len() - 1]);
        } else {
            self.underlying.handle(key, value);
        }
    }
}

impl fmt::Debug for MaybeQuotedValueKeyValueHandler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaybeQuotedValueKeyValueHandler")
            .finish_non_exhaustive()
    }
}

/// Trims whitespace from both key and value before delegating.
pub struct TrimmingKeyValueHandler<'a> {
    underlying: &'a mut dyn KeyValueHandler,
}

impl<'a> TrimmingKeyValueHandler<'a> {
    /// Wraps `underlying`.
    pub fn new(underlying: &'a mut dyn KeyValueHandler) -> Self {
        Self { underlying }
    }
}

impl KeyValueHandler for TrimmingKeyValueHandler<'_> {
    fn handle(&mut self, key: &str, value: &str) {
        self.underlying.handle(key.trim(), value.trim());
    }
}

impl fmt::Debug for TrimmingKeyValueHandler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrimmingKeyValueHandler")
            .finish_non_exhaustive()
    }
}

/// Applies optional [`Transformer`]s to the key and value before
/// delegating. Either side may be left untouched.
pub struct TransformingKeyValueHandler<'a> {
    underlying: &'a mut dyn KeyValueHandler,
    key_transformer: Option<&'a dyn Transformer>,
    value_transformer: Option<&'a dyn Transformer>,
}

impl<'a> TransformingKeyValueHandler<'a> {
    /// Transforms both sides of each pair.
    pub fn new(
        underlying: &'a mut dyn KeyValueHandler,
        key_transformer: &'a dyn Transformer,
        value_transformer: &'a dyn Transformer,
    ) -> Self {
        Self {
            underlying,
            key_transformer: Some(key_transformer),
            value_transformer: Some(value_transformer),
        }
    }

    /// Transforms keys only.
    pub fn key_only(
        underlying: &'a mut dyn KeyValueHandler,
        key_transformer: &'a dyn Transformer,
    ) -> Self {
        Self {
            underlying,
            key_transformer: Some(key_transformer),
            value_transformer: None,
        }
    }

    /// Transforms values only.
    pub fn value_only(
        underlying: &'a mut dyn KeyValueHandler,
        value_transformer: &'a dyn Transformer,
    ) -> Self {
        Self {
            underlying,
            key_transformer: None,
            value_transformer: Some(value_transformer),
        }
    }
}

impl KeyValueHandler for TransformingKeyValueHandler<'_> {
    fn handle(&mut self, key: &str, value: &str) {
        let key = match self.key_transformer {
            Some(transformer) => Cow::Owned(transformer.transform(key)),
            None => Cow::Borrowed(key),
        };
        let value = match self.value_transformer {
            Some(transformer) => Cow::Owned(transformer.transform(value)),
            None => Cow::Borrowed(value),
        };
        self.underlying.handle(&key, &value);
    }
}

impl fmt::Debug for TransformingKeyValueHandler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformingKeyValueHandler")
            .field("key_transformer", &self.key_transformer.is_some())
            .field("value_transformer", &self.value_transformer.is_some())
            .finish_non_exhaustive()
    }
}

/// Canonicalizes the percent-encoding of both key and value via
/// [`codec::normalize`] before delegating.
pub struct UrlEncodingNormalizingKeyValueHandler<'a> {
    underlying: &'a mut dyn KeyValueHandler,
}

impl<'a> UrlEncodingNormalizingKeyValueHandler<'a> {
    /// Wraps `underlying`.
    pub fn new(underlying: &'a mut dyn KeyValueHandler) -> Self {
        Self { underlying }
    }
}

impl KeyValueHandler for UrlEncodingNormalizingKeyValueHandler<'_> {
    fn handle(&mut self, key: &str, value: &str) {
        self.underlying
            .handle(&codec::normalize(key), &codec::normalize(value));
    }
}

impl fmt::Debug for UrlEncodingNormalizingKeyValueHandler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlEncodingNormalizingKeyValueHandler")
            .finish_non_exhaustive()
    }
}
