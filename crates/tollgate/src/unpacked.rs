//! The classified request shapes produced by unpacking.

use std::collections::HashMap;

use tollgate_keyvalue::codec;

use crate::error::UnpackError;
use crate::normalizer::Normalizer;
use crate::params::{
    BEARER_TOKEN, CLIENT_ID, HMAC_SHA1, NORMALIZED_REQUEST, OAUTH_CONSUMER_KEY, OAUTH_NONCE,
    OAUTH_SIGNATURE, OAUTH_SIGNATURE_METHOD, OAUTH_TIMESTAMP, OAUTH_TOKEN, OAUTH_VERSION,
    OAuth1Params, ONE_DOT_OH, ONE_DOT_OH_A, value_or_unset,
};
use crate::request::ParsedRequest;

// Tokens longer than this never come from a legitimate issuer.
const MAX_TOKEN_LENGTH: usize = 50;

/// One inbound request, classified by the authentication material it
/// carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackedRequest {
    /// No recognizable OAuth material.
    Unknown(ParsedRequest),
    /// OAuth 1.0a request carrying an access token.
    OAuth1(OAuth1Request),
    /// OAuth 1.0a two-legged request, consumer credentials only.
    OAuth1TwoLegged(OAuth1TwoLeggedRequest),
    /// OAuth 2.0 bearer-token request.
    OAuth2(OAuth2Request),
}

impl UnpackedRequest {
    /// The surviving snapshot of the raw request.
    #[must_use]
    pub fn parsed_request(&self) -> &ParsedRequest {
        match self {
            Self::Unknown(parsed_request) => parsed_request,
            Self::OAuth1(request) => &request.parsed_request,
            Self::OAuth1TwoLegged(request) => &request.parsed_request,
            Self::OAuth2(request) => &request.parsed_request,
        }
    }

    /// Short label for the OAuth flavor, `None` for unknown requests.
    #[must_use]
    pub fn oauth_version_string(&self) -> Option<&'static str> {
        match self {
            Self::Unknown(_) => None,
            Self::OAuth1(_) | Self::OAuth1TwoLegged(_) => Some("oauth1"),
            Self::OAuth2(_) => Some("oauth2"),
        }
    }
}

/// A validated OAuth 1.0a request with an access token.
///
/// Token, consumer key, and nonce are percent-decoded at build time;
/// the signature stays in its wire form until verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth1Request {
    /// Percent-decoded access token.
    pub token: String,
    /// Percent-decoded consumer key.
    pub consumer_key: String,
    /// Percent-decoded nonce.
    pub nonce: String,
    /// Timestamp in seconds since the epoch.
    pub timestamp_secs: i64,
    /// Presented signature, still percent-encoded.
    pub signature: String,
    /// Signature method named by the request.
    pub signature_method: String,
    /// OAuth version named by the request, if any.
    pub version: Option<String>,
    /// Snapshot of the raw request.
    pub parsed_request: ParsedRequest,
    /// Canonical signature base string for this request.
    pub normalized_request: String,
}

impl OAuth1Request {
    /// Validates the request pieces and freezes them, computing the
    /// normalized request along the way.
    ///
    /// # Errors
    ///
    /// [`UnpackError::MalformedRequest`] when a required piece is
    /// absent, the signature method is not HMAC-SHA1, the version is
    /// unsupported, or the token is malformed; a decode error when a
    /// credential is not validly percent-encoded.
    pub fn build(
        parsed_request: ParsedRequest,
        oauth1_params: OAuth1Params,
        normalizer: &dyn Normalizer,
    ) -> Result<Self, UnpackError> {
        let parts = validate(&parsed_request, &oauth1_params)?;

        let token = required(oauth1_params.token.as_deref(), OAUTH_TOKEN)?;
        let consumer_key = required(oauth1_params.consumer_key.as_deref(), OAUTH_CONSUMER_KEY)?;
        let nonce = required(oauth1_params.nonce.as_deref(), OAUTH_NONCE)?;
        let timestamp_secs = oauth1_params
            .timestamp_secs
            .ok_or_else(|| missing(OAUTH_TIMESTAMP))?;
        let signature = required(oauth1_params.signature.as_deref(), OAUTH_SIGNATURE)?.to_owned();
        let signature_method =
            required(oauth1_params.signature_method.as_deref(), OAUTH_SIGNATURE_METHOD)?.to_owned();

        let token = codec::decode(token)?;
        let consumer_key = codec::decode(consumer_key)?;
        let nonce = codec::decode(nonce)?;
        let normalized_request = normalizer.normalize(
            parts.scheme,
            parts.host,
            parts.port,
            parts.verb,
            parts.path,
            &parsed_request.params,
            &oauth1_params,
        );

        Ok(Self {
            token,
            consumer_key,
            nonce,
            timestamp_secs,
            signature,
            signature_method,
            version: oauth1_params.version,
            parsed_request,
            normalized_request,
        })
    }

    /// Diagnostic view of the OAuth parameters keyed by wire name. The
    /// version defaults to `1.0` when the request named none.
    #[must_use]
    pub fn oauth_param_map(&self) -> HashMap<String, String> {
        let mut map = base_param_map(
            &self.consumer_key,
            &self.nonce,
            self.timestamp_secs,
            &self.signature,
            &self.signature_method,
            self.version.as_deref(),
            &self.normalized_request,
        );
        map.insert(OAUTH_TOKEN.to_owned(), self.token.clone());
        map
    }
}

/// A validated OAuth 1.0a request without an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth1TwoLeggedRequest {
    /// Percent-decoded consumer key.
    pub consumer_key: String,
    /// Percent-decoded nonce.
    pub nonce: String,
    /// Timestamp in seconds since the epoch.
    pub timestamp_secs: i64,
    /// Presented signature, still percent-encoded.
    pub signature: String,
    /// Signature method named by the request.
    pub signature_method: String,
    /// OAuth version named by the request, if any.
    pub version: Option<String>,
    /// Snapshot of the raw request.
    pub parsed_request: ParsedRequest,
    /// Canonical signature base string for this request.
    pub normalized_request: String,
}

impl OAuth1TwoLeggedRequest {
    /// Validates the request pieces and freezes them. Same rules as
    /// [`OAuth1Request::build`], minus the token.
    pub fn build(
        parsed_request: ParsedRequest,
        oauth1_params: OAuth1Params,
        normalizer: &dyn Normalizer,
    ) -> Result<Self, UnpackError> {
        let parts = validate(&parsed_request, &oauth1_params)?;

        let consumer_key = required(oauth1_params.consumer_key.as_deref(), OAUTH_CONSUMER_KEY)?;
        let nonce = required(oauth1_params.nonce.as_deref(), OAUTH_NONCE)?;
        let timestamp_secs = oauth1_params
            .timestamp_secs
            .ok_or_else(|| missing(OAUTH_TIMESTAMP))?;
        let signature = required(oauth1_params.signature.as_deref(), OAUTH_SIGNATURE)?.to_owned();
        let signature_method =
            required(oauth1_params.signature_method.as_deref(), OAUTH_SIGNATURE_METHOD)?.to_owned();

        let consumer_key = codec::decode(consumer_key)?;
        let nonce = codec::decode(nonce)?;
        let normalized_request = normalizer.normalize(
            parts.scheme,
            parts.host,
            parts.port,
            parts.verb,
            parts.path,
            &parsed_request.params,
            &oauth1_params,
        );

        Ok(Self {
            consumer_key,
            nonce,
            timestamp_secs,
            signature,
            signature_method,
            version: oauth1_params.version,
            parsed_request,
            normalized_request,
        })
    }

    /// Diagnostic view of the OAuth parameters keyed by wire name.
    #[must_use]
    pub fn oauth_param_map(&self) -> HashMap<String, String> {
        base_param_map(
            &self.consumer_key,
            &self.nonce,
            self.timestamp_secs,
            &self.signature,
            &self.signature_method,
            self.version.as_deref(),
            &self.normalized_request,
        )
    }
}

/// An OAuth 2.0 bearer-token request. Just a wrapper for the token,
/// really.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2Request {
    /// Percent-decoded bearer token.
    pub token: String,
    /// Snapshot of the raw request.
    pub parsed_request: ParsedRequest,
    /// Client id from the header, if one was presented.
    pub client_id: Option<String>,
}

impl OAuth2Request {
    /// Wraps an already-decoded bearer token.
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        parsed_request: ParsedRequest,
        client_id: Option<String>,
    ) -> Self {
        Self {
            token: token.into(),
            parsed_request,
            client_id,
        }
    }

    /// Diagnostic view of the bearer credentials.
    #[must_use]
    pub fn oauth_param_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::with_capacity(2);
        map.insert(BEARER_TOKEN.to_owned(), self.token.clone());
        if let Some(client_id) = &self.client_id {
            map.insert(CLIENT_ID.to_owned(), client_id.clone());
        }
        map
    }
}

struct ValidParts<'a> {
    scheme: &'a str,
    host: &'a str,
    port: u16,
    verb: &'a str,
    path: &'a str,
}

fn missing(name: &str) -> UnpackError {
    UnpackError::MalformedRequest(format!("no value for {name}"))
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, UnpackError> {
    value.ok_or_else(|| missing(name))
}

// The OAuth1Params slots themselves are not re-checked here beyond the
// method, version, and token shape; classification only hands over
// fully populated parameter sets.
fn validate<'a>(
    parsed_request: &'a ParsedRequest,
    oauth1_params: &OAuth1Params,
) -> Result<ValidParts<'a>, UnpackError> {
    let Some(scheme) = parsed_request.scheme.as_deref() else {
        return Err(missing("scheme"));
    };
    let Some(host) = parsed_request.host.as_deref() else {
        return Err(missing("host"));
    };
    let Some(port) = parsed_request.port else {
        return Err(missing("port"));
    };
    let Some(verb) = parsed_request.verb.as_deref() else {
        return Err(missing("verb"));
    };
    let Some(path) = parsed_request.path.as_deref() else {
        return Err(missing("path"));
    };

    if oauth1_params.signature_method.as_deref() != Some(HMAC_SHA1) {
        return Err(UnpackError::MalformedRequest(format!(
            "unsupported signature method: {}",
            value_or_unset(oauth1_params.signature_method.as_deref())
        )));
    }
    if let Some(version) = oauth1_params.version.as_deref() {
        if version != ONE_DOT_OH && version.to_lowercase() != ONE_DOT_OH_A {
            return Err(UnpackError::MalformedRequest(format!(
                "unsupported oauth version: {version}"
            )));
        }
    }
    if let Some(token) = oauth1_params.token.as_deref() {
        if token.find(' ').is_some_and(|index| index > 0) || token.len() > MAX_TOKEN_LENGTH {
            return Err(UnpackError::MalformedRequest(format!(
                "malformed oauth token: {token}"
            )));
        }
    }

    Ok(ValidParts {
        scheme,
        host,
        port,
        verb,
        path,
    })
}

fn base_param_map(
    consumer_key: &str,
    nonce: &str,
    timestamp_secs: i64,
    signature: &str,
    signature_method: &str,
    version: Option<&str>,
    normalized_request: &str,
) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(8);
    map.insert(OAUTH_CONSUMER_KEY.to_owned(), consumer_key.to_owned());
    map.insert(OAUTH_NONCE.to_owned(), nonce.to_owned());
    map.insert(OAUTH_TIMESTAMP.to_owned(), timestamp_secs.to_string());
    map.insert(OAUTH_SIGNATURE_METHOD.to_owned(), signature_method.to_owned());
    map.insert(OAUTH_SIGNATURE.to_owned(), signature.to_owned());
    map.insert(
        OAUTH_VERSION.to_owned(),
        version.unwrap_or(ONE_DOT_OH).to_owned(),
    );
    map.insert(NORMALIZED_REQUEST.to_owned(), normalized_request.to_owned());
    map
}
