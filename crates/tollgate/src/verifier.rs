//! Verification of unpacked OAuth1 requests.

use std::fmt;

use chrono::Utc;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::nonce::{NonceValidator, NoopNonceValidator};
use crate::signer::{Signer, StandardSigner};
use crate::unpacked::{OAuth1Request, OAuth1TwoLeggedRequest};

/// Disables a clock-float bound when passed as a window size.
pub const NO_TIMESTAMP_CHECK: i64 = -1;

/// Outcome of verifying a request.
///
/// Checks run in a fixed order, so a request with several problems
/// reports the first one found: timestamp, then nonce, then signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierResult {
    /// The request verified.
    Ok,
    /// The nonce validator rejected the nonce.
    BadNonce,
    /// The signature did not match the normalized request.
    BadSignature,
    /// The timestamp fell outside the allowed clock float.
    BadTimestamp,
}

/// Verifies OAuth1 requests against their secrets.
///
/// The default verifier skips timestamp and nonce checks entirely. The
/// two clock-float bounds are independent knobs; either can be disabled
/// with [`NO_TIMESTAMP_CHECK`].
pub struct Verifier {
    signer: Box<dyn Signer>,
    nonce_validator: Box<dyn NonceValidator>,
    max_clock_float_ahead_mins: i64,
    max_clock_float_behind_mins: i64,
}

impl Verifier {
    /// A verifier with the standard signer, no timestamp checks, and no
    /// nonce validation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signer: Box::new(StandardSigner),
            nonce_validator: Box::new(NoopNonceValidator),
            max_clock_float_ahead_mins: NO_TIMESTAMP_CHECK,
            max_clock_float_behind_mins: NO_TIMESTAMP_CHECK,
        }
    }

    /// Replaces the signer.
    #[must_use]
    pub fn with_signer(mut self, signer: Box<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    /// Replaces the nonce validator.
    #[must_use]
    pub fn with_nonce_validator(mut self, nonce_validator: Box<dyn NonceValidator>) -> Self {
        self.nonce_validator = nonce_validator;
        self
    }

    /// Bounds how far ahead of and behind the server clock a request
    /// timestamp may float, in minutes.
    #[must_use]
    pub fn with_max_clock_float_mins(mut self, ahead_mins: i64, behind_mins: i64) -> Self {
        self.max_clock_float_ahead_mins = ahead_mins;
        self.max_clock_float_behind_mins = behind_mins;
        self
    }

    /// Verifies a request carrying an access token.
    #[must_use]
    pub fn verify(
        &self,
        request: &OAuth1Request,
        token_secret: &str,
        consumer_secret: &str,
    ) -> VerifierResult {
        self.verify_oauth1(
            &request.nonce,
            request.timestamp_secs,
            token_secret,
            consumer_secret,
            &request.signature,
            &request.normalized_request,
        )
    }

    /// Verifies a two-legged request. These sign with an empty token
    /// secret.
    #[must_use]
    pub fn verify_two_legged(
        &self,
        request: &OAuth1TwoLeggedRequest,
        consumer_secret: &str,
    ) -> VerifierResult {
        self.verify_oauth1(
            &request.nonce,
            request.timestamp_secs,
            "",
            consumer_secret,
            &request.signature,
            &request.normalized_request,
        )
    }

    fn verify_oauth1(
        &self,
        nonce: &str,
        timestamp_secs: i64,
        token_secret: &str,
        consumer_secret: &str,
        signature: &str,
        normalized_request: &str,
    ) -> VerifierResult {
        if !self.timestamp_within_float(timestamp_secs, Utc::now().timestamp()) {
            debug!(timestamp_secs, "rejecting request with out-of-window timestamp");
            return VerifierResult::BadTimestamp;
        }
        if !self.nonce_validator.validate(nonce) {
            debug!(nonce = %nonce, "rejecting request with invalid nonce");
            return VerifierResult::BadNonce;
        }
        if self.signature_matches(normalized_request, signature, token_secret, consumer_secret) {
            VerifierResult::Ok
        } else {
            debug!(normalized_request = %normalized_request, "rejecting request with mismatched signature");
            VerifierResult::BadSignature
        }
    }

    fn timestamp_within_float(&self, timestamp_secs: i64, now_secs: i64) -> bool {
        (self.max_clock_float_behind_mins < 0
            || timestamp_secs >= now_secs - self.max_clock_float_behind_mins * 60)
            && (self.max_clock_float_ahead_mins < 0
                || timestamp_secs <= now_secs + self.max_clock_float_ahead_mins * 60)
    }

    // Any failure to decode the presented signature counts as a
    // mismatch, never an error.
    fn signature_matches(
        &self,
        normalized_request: &str,
        signature: &str,
        token_secret: &str,
        consumer_secret: &str,
    ) -> bool {
        let Ok(presented) = self.signer.decode_signature(signature) else {
            return false;
        };
        let expected = self
            .signer
            .sign_bytes(normalized_request, token_secret, consumer_secret);
        presented.ct_eq(&expected).into()
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field(
                "max_clock_float_ahead_mins",
                &self.max_clock_float_ahead_mins,
            )
            .field(
                "max_clock_float_behind_mins",
                &self.max_clock_float_behind_mins,
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::nonce::ConstNonceValidator;
    use crate::request::ParsedRequest;

    use super::*;

    const NORMALIZED: &str = "GET&http%3A%2F%2Fexample.com%2Fresource&oauth_consumer_key%3Dkey";
    const SIGNATURE: &str = "sqAz4vbL%2FV44pBnaXI5GkP%2BxvkI%3D";
    const TOKEN_SECRET: &str = "tokensecret";
    const CONSUMER_SECRET: &str = "consumersecret";

    fn request(timestamp_secs: i64, signature: &str) -> OAuth1Request {
        OAuth1Request {
            token: "tok".to_owned(),
            consumer_key: "key".to_owned(),
            nonce: "n1".to_owned(),
            timestamp_secs,
            signature: signature.to_owned(),
            signature_method: "HMAC-SHA1".to_owned(),
            version: None,
            parsed_request: ParsedRequest::default(),
            normalized_request: NORMALIZED.to_owned(),
        }
    }

    #[test]
    fn test_should_verify_valid_signature() {
        let verifier = Verifier::new();
        let result = verifier.verify(&request(1, SIGNATURE), TOKEN_SECRET, CONSUMER_SECRET);
        assert_eq!(result, VerifierResult::Ok);
    }

    #[test]
    fn test_should_reject_mismatched_signature() {
        let verifier = Verifier::new();
        // A well-formed signature over some other base string.
        let other = StandardSigner.sign("GET&http%3A%2F%2Fexample.com%2Fother", TOKEN_SECRET, CONSUMER_SECRET);
        assert_eq!(
            verifier.verify(&request(1, &other), TOKEN_SECRET, CONSUMER_SECRET),
            VerifierResult::BadSignature
        );
    }

    #[test]
    fn test_should_treat_undecodable_signature_as_mismatch() {
        let verifier = Verifier::new();
        let garbled = request(1, "%ZZnot-percent-encoded");
        assert_eq!(
            verifier.verify(&garbled, TOKEN_SECRET, CONSUMER_SECRET),
            VerifierResult::BadSignature
        );
    }

    #[test]
    fn test_should_reject_wrong_secrets() {
        let verifier = Verifier::new();
        assert_eq!(
            verifier.verify(&request(1, SIGNATURE), "wrong", CONSUMER_SECRET),
            VerifierResult::BadSignature
        );
    }

    #[test]
    fn test_should_report_nonce_before_signature() {
        let verifier =
            Verifier::new().with_nonce_validator(Box::new(ConstNonceValidator::new(false)));
        let tampered = request(1, "bogus");
        assert_eq!(
            verifier.verify(&tampered, TOKEN_SECRET, CONSUMER_SECRET),
            VerifierResult::BadNonce
        );
    }

    #[test]
    fn test_should_report_timestamp_before_nonce() {
        let verifier = Verifier::new()
            .with_max_clock_float_mins(5, 5)
            .with_nonce_validator(Box::new(ConstNonceValidator::new(false)));
        // Far in the past relative to any real clock.
        assert_eq!(
            verifier.verify(&request(1, SIGNATURE), TOKEN_SECRET, CONSUMER_SECRET),
            VerifierResult::BadTimestamp
        );
    }

    #[test]
    fn test_should_accept_current_timestamp_within_window() {
        let verifier = Verifier::new().with_max_clock_float_mins(5, 5);
        let now = Utc::now().timestamp();
        assert_eq!(
            verifier.verify(&request(now, SIGNATURE), TOKEN_SECRET, CONSUMER_SECRET),
            VerifierResult::Ok
        );
    }

    #[test]
    fn test_should_bound_timestamp_window_inclusively() {
        let verifier = Verifier::new().with_max_clock_float_mins(5, 10);
        let now = 1_000_000;
        assert!(verifier.timestamp_within_float(now - 600, now));
        assert!(!verifier.timestamp_within_float(now - 601, now));
        assert!(verifier.timestamp_within_float(now + 300, now));
        assert!(!verifier.timestamp_within_float(now + 301, now));
    }

    #[test]
    fn test_should_disable_each_bound_independently() {
        let now = 1_000_000;

        let no_past_bound = Verifier::new().with_max_clock_float_mins(5, NO_TIMESTAMP_CHECK);
        assert!(no_past_bound.timestamp_within_float(0, now));
        assert!(!no_past_bound.timestamp_within_float(now + 301, now));

        let no_future_bound = Verifier::new().with_max_clock_float_mins(NO_TIMESTAMP_CHECK, 10);
        assert!(no_future_bound.timestamp_within_float(now + 1_000_000, now));
        assert!(!no_future_bound.timestamp_within_float(now - 601, now));

        let unchecked = Verifier::new();
        assert!(unchecked.timestamp_within_float(0, now));
        assert!(unchecked.timestamp_within_float(i64::MAX, now));
    }

    #[test]
    fn test_should_verify_two_legged_with_empty_token_secret() {
        let two_legged = OAuth1TwoLeggedRequest {
            consumer_key: "key".to_owned(),
            nonce: "n1".to_owned(),
            timestamp_secs: 1,
            signature: SIGNATURE.to_owned(),
            signature_method: "HMAC-SHA1".to_owned(),
            version: None,
            parsed_request: ParsedRequest::default(),
            normalized_request: NORMALIZED.to_owned(),
        };
        let verifier = Verifier::new();
        // The fixture signature was built with a token secret, so the
        // empty token secret must not match it.
        assert_eq!(
            verifier.verify_two_legged(&two_legged, CONSUMER_SECRET),
            VerifierResult::BadSignature
        );

        let signed = StandardSigner.sign(NORMALIZED, "", CONSUMER_SECRET);
        let two_legged = OAuth1TwoLeggedRequest {
            signature: signed,
            ..two_legged
        };
        assert_eq!(
            verifier.verify_two_legged(&two_legged, CONSUMER_SECRET),
            VerifierResult::Ok
        );
    }
}
