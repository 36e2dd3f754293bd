//! Nonce acceptance policy.

/// Decides whether a nonce is acceptable.
///
/// Nonce tracking is domain-specific (it needs a store scoped to the
/// consumer and a retention window), so the verifier only consults a
/// policy and leaves the bookkeeping to the embedding service.
pub trait NonceValidator: Send + Sync {
    /// Returns false to reject the request as a replay.
    fn validate(&self, nonce: &str) -> bool;
}

/// Accepts every nonce.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNonceValidator;

impl NonceValidator for NoopNonceValidator {
    fn validate(&self, _nonce: &str) -> bool {
        true
    }
}

/// For testing. Always returns the same result.
#[derive(Debug, Clone, Copy)]
pub struct ConstNonceValidator {
    result: bool,
}

impl ConstNonceValidator {
    /// Creates a validator that answers every nonce with `result`.
    #[must_use]
    pub fn new(result: bool) -> Self {
        Self { result }
    }
}

impl NonceValidator for ConstNonceValidator {
    fn validate(&self, _nonce: &str) -> bool {
        self.result
    }
}
