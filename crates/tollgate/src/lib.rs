//! OAuth 1.0a and OAuth 2.0 bearer request authentication.
//!
//! Tollgate classifies an inbound HTTP request by the authentication
//! material it carries, canonicalizes the OAuth 1.0a signing material
//! into the signature base string, and verifies HMAC-SHA1 signatures
//! under a configurable clock-float and nonce policy. It is a library
//! for server frameworks to call; it reads nothing off the wire itself.
//!
//! # Overview
//!
//! Unpacking and verification are two separate steps, because secrets
//! live with the embedding service:
//!
//! 1. An [`Unpacker`](unpacker::Unpacker) harvests parameters from the
//!    `Authorization` header, the query string, and any form-encoded
//!    body, classifies the request, and returns an
//!    [`UnpackedRequest`](unpacked::UnpackedRequest) carrying the
//!    normalized request string.
//! 2. The caller looks up the consumer and token secrets for the
//!    presented credentials and hands the OAuth1 variants to a
//!    [`Verifier`](verifier::Verifier), which answers with a
//!    [`VerifierResult`](verifier::VerifierResult).
//!
//! Every component is stateless once built and safe to share across
//! requests.
//!
//! # Usage
//!
//! ```rust
//! use tollgate::unpacked::UnpackedRequest;
//! use tollgate::unpacker::{CustomizableUnpacker, Unpacker};
//! use tollgate::verifier::{Verifier, VerifierResult};
//!
//! # struct Req;
//! # impl tollgate::request::Request for Req {
//! #     fn scheme(&self) -> Option<&str> { Some("https") }
//! #     fn host(&self) -> Option<&str> { Some("photos.example.net") }
//! #     fn port(&self) -> Option<u16> { Some(443) }
//! #     fn verb(&self) -> Option<&str> { Some("GET") }
//! #     fn path(&self) -> Option<&str> { Some("/photos") }
//! #     fn query_string(&self) -> Option<&str> { None }
//! #     fn authorization_header(&self) -> Option<&str> { Some("Bearer tok") }
//! #     fn content_type(&self) -> Option<&str> { None }
//! #     fn body(&self) -> Option<&str> { None }
//! # }
//! # let request = Req;
//! let unpacker = CustomizableUnpacker::standard();
//! let verifier = Verifier::new().with_max_clock_float_mins(5, 5);
//!
//! match unpacker.unpack(&request)? {
//!     UnpackedRequest::OAuth1(oauth1) => {
//!         // Look up secrets for oauth1.consumer_key / oauth1.token.
//!         let result = verifier.verify(&oauth1, "token-secret", "consumer-secret");
//!         assert_ne!(result, VerifierResult::Ok);
//!     }
//!     UnpackedRequest::OAuth2(oauth2) => assert_eq!(oauth2.token, "tok"),
//!     other => panic!("unexpected classification: {other:?}"),
//! }
//! # Ok::<(), tollgate::error::UnpackError>(())
//! ```
//!
//! # Modules
//!
//! - [`adapter`] - [`Request`](request::Request) impl for `http` crate types
//! - [`error`] - Unpacking and signature-decoding errors
//! - [`nonce`] - Replay-prevention policy trait
//! - [`normalizer`] - Signature base string construction
//! - [`params`] - OAuth parameter accumulation and classification
//! - [`request`] - The request surface and its parsed snapshot
//! - [`signer`] - HMAC-SHA1 signature computation and decoding
//! - [`unpacked`] - The classified request shapes
//! - [`unpacker`] - End-to-end request classification
//! - [`verifier`] - Timestamp, nonce, and signature verification

pub mod adapter;
pub mod error;
pub mod nonce;
pub mod normalizer;
pub mod params;
pub mod request;
pub mod signer;
pub mod unpacked;
pub mod unpacker;
pub mod verifier;

pub use error::UnpackError;
pub use request::{ParsedRequest, Request};
pub use unpacked::UnpackedRequest;
pub use unpacker::{CustomizableUnpacker, Unpacker};
pub use verifier::{Verifier, VerifierResult};
