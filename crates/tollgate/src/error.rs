//! Error types surfaced while unpacking requests.

use thiserror::Error;
use tollgate_keyvalue::{DecodeError, ParseError};

/// Failure to turn a raw request into an
/// [`UnpackedRequest`](crate::unpacked::UnpackedRequest).
///
/// `MalformedRequest` is the interesting case: the request showed clear
/// OAuth intent but a required piece was missing or unacceptable. The
/// other variants wrap lower-level failures encountered on the way.
/// Verification itself never produces errors; see
/// [`VerifierResult`](crate::verifier::VerifierResult).
#[derive(Debug, Clone, Error)]
pub enum UnpackError {
    /// OAuth intent with a missing or invalid required field. Carries a
    /// human-readable reason.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Percent-decoding of a credential failed.
    #[error("Could not unpack request: {0}")]
    Decode(#[from] DecodeError),

    /// A parser rejected one of the request's key/value sources.
    #[error("Could not unpack request: {0}")]
    Parse(#[from] ParseError),
}

/// Failure to decode a presented signature into MAC bytes.
///
/// The verifier folds both cases into `BadSignature` rather than
/// surfacing them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The signature was not validly percent-encoded.
    #[error("Signature percent-decoding failed: {0}")]
    Decode(#[from] DecodeError),

    /// The decoded signature was not valid standard base64.
    #[error("Signature base64 is invalid: {0}")]
    Base64(#[from] base64::DecodeError),
}
