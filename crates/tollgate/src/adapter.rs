//! Adapter for requests built on the `http` crate.

use http::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use http::request::Parts;
use http::uri::Authority;

use crate::request::Request;

/// [`Request`] view over [`http::request::Parts`] plus an optional
/// textual body.
///
/// Scheme, host, and port come from the URI when it is in absolute
/// form. Server-side requests usually arrive in origin form instead,
/// so the host also falls back to the `Host` header, and the port to
/// the scheme's well-known default. The `http` types never carry the
/// transport, though; use [`with_scheme`](Self::with_scheme) to supply
/// the one the listener actually used rather than letting requests
/// fail as incomplete.
#[derive(Debug)]
pub struct HttpParts {
    parts: Parts,
    body: Option<String>,
    scheme_override: Option<String>,
    host_authority: Option<Authority>,
}

impl HttpParts {
    /// Wraps request parts and an optional body that has already been
    /// read and decoded to text.
    #[must_use]
    pub fn new(parts: Parts, body: Option<String>) -> Self {
        let host_authority = parts
            .headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());
        Self {
            parts,
            body,
            scheme_override: None,
            host_authority,
        }
    }

    /// Overrides the scheme, for requests whose URI does not carry one.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme_override = Some(scheme.into());
        self
    }
}

impl Request for HttpParts {
    fn scheme(&self) -> Option<&str> {
        self.scheme_override
            .as_deref()
            .or_else(|| self.parts.uri.scheme_str())
    }

    fn host(&self) -> Option<&str> {
        self.parts
            .uri
            .host()
            .or_else(|| self.host_authority.as_ref().map(Authority::host))
    }

    fn port(&self) -> Option<u16> {
        self.parts
            .uri
            .port_u16()
            .or_else(|| self.host_authority.as_ref().and_then(Authority::port_u16))
            .or_else(|| self.scheme().and_then(default_port))
    }

    fn verb(&self) -> Option<&str> {
        Some(self.parts.method.as_str())
    }

    fn path(&self) -> Option<&str> {
        Some(self.parts.uri.path())
    }

    fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    fn authorization_header(&self) -> Option<&str> {
        self.parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }

    fn content_type(&self) -> Option<&str> {
        self.parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    if scheme.eq_ignore_ascii_case("http") {
        Some(80)
    } else if scheme.eq_ignore_ascii_case("https") {
        Some(443)
    } else {
        None
    }
}
