//! The request surface consumed by the unpacker.

use tollgate_keyvalue::Pair;

/// Read-only view of an inbound HTTP request.
///
/// Every accessor is optional: the unpacker classifies whatever is
/// present and only demands specific pieces once a request has shown
/// clear OAuth 1.0a intent. Implementations adapt whatever request
/// type the embedding server uses; [`HttpParts`](crate::adapter::HttpParts)
/// covers the `http` crate.
pub trait Request {
    /// URL scheme, such as `http` or `https`, in any case.
    fn scheme(&self) -> Option<&str>;

    /// Host the request was addressed to.
    fn host(&self) -> Option<&str>;

    /// Port the request arrived on.
    fn port(&self) -> Option<u16>;

    /// HTTP method, in any case.
    fn verb(&self) -> Option<&str>;

    /// Path component of the request URL.
    fn path(&self) -> Option<&str>;

    /// Raw query string, without the leading `?`.
    fn query_string(&self) -> Option<&str>;

    /// Value of the `Authorization` header, if present.
    fn authorization_header(&self) -> Option<&str>;

    /// Value of the `Content-Type` header, if present.
    fn content_type(&self) -> Option<&str>;

    /// Request body, if present and textual.
    fn body(&self) -> Option<&str>;
}

/// Immutable snapshot of the request pieces that survive unpacking.
///
/// The scheme and verb are upper-cased at construction; `params` holds
/// the non-OAuth parameters extracted from the query string and body,
/// in arrival order with duplicates preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Upper-cased URL scheme.
    pub scheme: Option<String>,
    /// Host exactly as presented.
    pub host: Option<String>,
    /// Port the request arrived on.
    pub port: Option<u16>,
    /// Upper-cased HTTP method.
    pub verb: Option<String>,
    /// Path exactly as presented.
    pub path: Option<String>,
    /// Non-OAuth parameters, still percent-encoded.
    pub params: Vec<Pair>,
}

impl ParsedRequest {
    /// Snapshots `request` together with its extracted non-OAuth
    /// parameters.
    pub fn from_request(request: &dyn Request, params: Vec<Pair>) -> Self {
        Self {
            scheme: request.scheme().map(str::to_uppercase),
            host: request.host().map(str::to_owned),
            port: request.port(),
            verb: request.verb().map(str::to_uppercase),
            path: request.path().map(str::to_owned),
            params,
        }
    }
}
