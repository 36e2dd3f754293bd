//! Computes and decodes OAuth 1.0a HMAC-SHA1 signatures.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha1::Sha1;
use tollgate_keyvalue::codec;

use crate::error::SignatureError;

type HmacSha1 = Hmac<Sha1>;

/// Produces and decodes request signatures.
pub trait Signer: Send + Sync {
    /// Signs the normalized request, returning the percent-encoded
    /// base64 signature as it would appear in an `oauth_signature`
    /// parameter.
    fn sign(&self, normalized_request: &str, token_secret: &str, consumer_secret: &str) -> String;

    /// Signs the normalized request, returning the raw MAC bytes.
    fn sign_bytes(
        &self,
        normalized_request: &str,
        token_secret: &str,
        consumer_secret: &str,
    ) -> Vec<u8>;

    /// Decodes a presented signature into MAC bytes.
    fn decode_signature(&self, signature: &str) -> Result<Vec<u8>, SignatureError>;
}

/// HMAC-SHA1 signer keyed with `consumer_secret&token_secret`.
///
/// The secrets are joined verbatim; callers hand in secrets exactly as
/// provisioned, and the two-legged flow passes an empty token secret.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardSigner;

impl Signer for StandardSigner {
    fn sign(&self, normalized_request: &str, token_secret: &str, consumer_secret: &str) -> String {
        let encoded =
            BASE64.encode(self.sign_bytes(normalized_request, token_secret, consumer_secret));
        codec::encode(&encoded).into_owned()
    }

    fn sign_bytes(
        &self,
        normalized_request: &str,
        token_secret: &str,
        consumer_secret: &str,
    ) -> Vec<u8> {
        let key = format!("{consumer_secret}&{token_secret}");
        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can accept any key length");
        mac.update(normalized_request.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    // Percent-decode, trim, then strict standard-alphabet base64.
    fn decode_signature(&self, signature: &str) -> Result<Vec<u8>, SignatureError> {
        let percent_decoded = codec::decode(signature)?;
        Ok(BASE64.decode(percent_decoded.trim())?)
    }
}

/// For testing. Always returns the same signature.
#[derive(Debug, Clone)]
pub struct ConstSigner {
    signature: String,
    bytes: Vec<u8>,
}

impl ConstSigner {
    /// Creates a signer that answers every call with `signature` and
    /// `bytes`.
    #[must_use]
    pub fn new(signature: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            signature: signature.into(),
            bytes,
        }
    }
}

impl Signer for ConstSigner {
    fn sign(&self, _normalized_request: &str, _token_secret: &str, _consumer_secret: &str) -> String {
        self.signature.clone()
    }

    fn sign_bytes(
        &self,
        _normalized_request: &str,
        _token_secret: &str,
        _consumer_secret: &str,
    ) -> Vec<u8> {
        self.bytes.clone()
    }

    fn decode_signature(&self, _signature: &str) -> Result<Vec<u8>, SignatureError> {
        Ok(self.bytes.clone())
    }
}
