//! Orchestration: from a raw request to a classified
//! [`UnpackedRequest`].

use std::fmt;

use tollgate_keyvalue::codec;
use tollgate_keyvalue::error::ParseError;
use tollgate_keyvalue::handler::{
    KeyValueHandler, MaybeQuotedValueKeyValueHandler, TransformingKeyValueHandler,
    TrimmingKeyValueHandler,
};
use tollgate_keyvalue::parser::{KeyValueParser, StandardKeyValueParser};
use tollgate_keyvalue::transformer::{Transformer, UrlEncodingNormalizingTransformer};
use tracing::debug;

use crate::error::UnpackError;
use crate::normalizer::{Normalizer, StandardNormalizer};
use crate::params::{
    BEARER_TOKEN, OAUTH1_HEADER_AUTHTYPE, OAUTH2_HEADER_AUTHTYPE, OAuthParamsBuilder, ParamsHelper,
    StandardParamsHelper,
};
use crate::request::{ParsedRequest, Request};
use crate::unpacked::{OAuth1Request, OAuth1TwoLeggedRequest, OAuth2Request, UnpackedRequest};

/// Content type that marks a request body as form parameters.
pub const WWW_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Classifies inbound requests into [`UnpackedRequest`] values.
pub trait Unpacker {
    /// Unpacks one request.
    ///
    /// # Errors
    ///
    /// [`UnpackError`] when the request shows OAuth intent but its
    /// material is incomplete, malformed, or disallowed by policy.
    fn unpack(&self, request: &dyn Request) -> Result<UnpackedRequest, UnpackError> {
        self.unpack_with_handlers(request, &mut [])
    }

    /// Unpacks one request, additionally feeding every raw query and
    /// body pair to `extra_handlers`. Header pairs are not forwarded;
    /// the authorization header carries credentials only.
    ///
    /// # Errors
    ///
    /// Same as [`unpack`](Self::unpack).
    fn unpack_with_handlers(
        &self,
        request: &dyn Request,
        extra_handlers: &mut [&mut dyn KeyValueHandler],
    ) -> Result<UnpackedRequest, UnpackError>;
}

/// Decides whether a bearer-token request may proceed.
///
/// Bearer tokens are replayable by anyone who sees them, so the
/// standard policy insists on HTTPS.
pub trait OAuth2Policy: Send + Sync {
    /// `true` to accept the request, `false` to reject it as malformed.
    fn allow(&self, request: &dyn Request, parsed_request: &ParsedRequest) -> bool;
}

/// Accepts bearer tokens over HTTPS only.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpsOnlyOAuth2Policy;

impl OAuth2Policy for HttpsOnlyOAuth2Policy {
    fn allow(&self, request: &dyn Request, _parsed_request: &ParsedRequest) -> bool {
        request
            .scheme()
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https"))
    }
}

/// Accepts bearer tokens on any transport. For deployments that
/// terminate TLS in front of the service.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllOAuth2Policy;

impl OAuth2Policy for AllowAllOAuth2Policy {
    fn allow(&self, _request: &dyn Request, _parsed_request: &ParsedRequest) -> bool {
        true
    }
}

/// The configurable unpacker.
///
/// Parameters are harvested from the `Authorization` header, the query
/// string, and the body when its content type is form-encoded, in that
/// order. Keys pass through [`ParamsHelper::process_key`] and both
/// sides of every pair are trimmed; each source can additionally apply
/// its own [`Transformer`] to both sides. Classification prefers
/// OAuth1 over a bearer token when a request somehow presents both.
pub struct CustomizableUnpacker {
    helper: Box<dyn ParamsHelper>,
    normalizer: Box<dyn Normalizer>,
    query_parser: StandardKeyValueParser,
    header_parser: StandardKeyValueParser,
    query_transformer: Option<Box<dyn Transformer>>,
    body_transformer: Option<Box<dyn Transformer>>,
    header_transformer: Option<Box<dyn Transformer>>,
    oauth2_policy: Box<dyn OAuth2Policy>,
}

impl CustomizableUnpacker {
    /// Bare wiring: the standard parsers, no per-source transformers,
    /// and the given strategies.
    #[must_use]
    pub fn new(
        helper: Box<dyn ParamsHelper>,
        normalizer: Box<dyn Normalizer>,
        oauth2_policy: Box<dyn OAuth2Policy>,
    ) -> Self {
        Self {
            helper,
            normalizer,
            query_parser: StandardKeyValueParser::query(),
            header_parser: StandardKeyValueParser::header(),
            query_transformer: None,
            body_transformer: None,
            header_transformer: None,
            oauth2_policy,
        }
    }

    /// The production wiring: percent-encoding normalization on every
    /// source and bearer tokens allowed over HTTPS only.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(
            Box::new(StandardParamsHelper),
            Box::new(StandardNormalizer),
            Box::new(HttpsOnlyOAuth2Policy),
        )
        .with_query_transformer(Box::new(UrlEncodingNormalizingTransformer))
        .with_body_transformer(Box::new(UrlEncodingNormalizingTransformer))
        .with_header_transformer(Box::new(UrlEncodingNormalizingTransformer))
    }

    /// Replaces the bearer-token transport policy.
    #[must_use]
    pub fn with_oauth2_policy(mut self, policy: Box<dyn OAuth2Policy>) -> Self {
        self.oauth2_policy = policy;
        self
    }

    /// Replaces the query-string parser.
    #[must_use]
    pub fn with_query_parser(mut self, parser: StandardKeyValueParser) -> Self {
        self.query_parser = parser;
        self
    }

    /// Replaces the authorization-header parser.
    #[must_use]
    pub fn with_header_parser(mut self, parser: StandardKeyValueParser) -> Self {
        self.header_parser = parser;
        self
    }

    /// Applies `transformer` to both sides of every query-string pair.
    #[must_use]
    pub fn with_query_transformer(mut self, transformer: Box<dyn Transformer>) -> Self {
        self.query_transformer = Some(transformer);
        self
    }

    /// Applies `transformer` to both sides of every body pair.
    #[must_use]
    pub fn with_body_transformer(mut self, transformer: Box<dyn Transformer>) -> Self {
        self.body_transformer = Some(transformer);
        self
    }

    /// Applies `transformer` to both sides of every header pair.
    #[must_use]
    pub fn with_header_transformer(mut self, transformer: Box<dyn Transformer>) -> Self {
        self.header_transformer = Some(transformer);
        self
    }

    // The header either carries a verbatim bearer payload or OAuth1
    // pairs in comma grammar, selected by the auth scheme in front of
    // the first space.
    fn parse_header(
        &self,
        header: Option<&str>,
        builder: &mut OAuthParamsBuilder<'_>,
    ) -> Result<(), ParseError> {
        let Some(header) = header else {
            return Ok(());
        };
        let Some(space_index) = header.find(' ') else {
            return Ok(());
        };
        if space_index == 0 || space_index + 1 >= header.len() {
            return Ok(());
        }
        let auth_type = &header[..space_index];
        let auth_string = &header[space_index + 1..];

        if auth_type.eq_ignore_ascii_case(OAUTH2_HEADER_AUTHTYPE) {
            // Everything after the space is the token, untransformed.
            builder.header_handler().handle(BEARER_TOKEN, auth_string);
        } else if auth_type.eq_ignore_ascii_case(OAUTH1_HEADER_AUTHTYPE) {
            let key_transformer = HelperKeyTransformer {
                helper: self.helper.as_ref(),
            };
            let mut view = builder.header_handler();
            let mut source_wrapped;
            let inner: &mut dyn KeyValueHandler = match self.header_transformer.as_deref() {
                Some(transformer) => {
                    source_wrapped =
                        TransformingKeyValueHandler::new(&mut view, transformer, transformer);
                    &mut source_wrapped
                }
                None => &mut view,
            };
            let mut trimming = TrimmingKeyValueHandler::new(inner);
            let mut keyed = TransformingKeyValueHandler::key_only(&mut trimming, &key_transformer);
            let mut quoted = MaybeQuotedValueKeyValueHandler::new(&mut keyed);
            self.header_parser.parse(auth_string, &mut [&mut quoted])?;
        }
        Ok(())
    }

    fn parse_params(
        &self,
        parser: &StandardKeyValueParser,
        input: &str,
        source_transformer: Option<&dyn Transformer>,
        builder_view: &mut dyn KeyValueHandler,
        extra_handlers: &mut [&mut dyn KeyValueHandler],
    ) -> Result<(), ParseError> {
        let key_transformer = HelperKeyTransformer {
            helper: self.helper.as_ref(),
        };
        let mut source_wrapped;
        let inner: &mut dyn KeyValueHandler = match source_transformer {
            Some(transformer) => {
                source_wrapped =
                    TransformingKeyValueHandler::new(builder_view, transformer, transformer);
                &mut source_wrapped
            }
            None => builder_view,
        };
        let mut trimming = TrimmingKeyValueHandler::new(inner);
        let mut keyed = TransformingKeyValueHandler::key_only(&mut trimming, &key_transformer);

        let mut handlers: Vec<&mut dyn KeyValueHandler> =
            Vec::with_capacity(extra_handlers.len() + 1);
        handlers.push(&mut keyed);
        for handler in extra_handlers.iter_mut() {
            handlers.push(&mut **handler);
        }
        parser.parse(input, &mut handlers)
    }

    fn parse_request(
        &self,
        request: &dyn Request,
        builder: &mut OAuthParamsBuilder<'_>,
        extra_handlers: &mut [&mut dyn KeyValueHandler],
    ) -> Result<(), ParseError> {
        self.parse_header(request.authorization_header(), builder)?;

        {
            let mut view = builder.query_handler();
            self.parse_params(
                &self.query_parser,
                request.query_string().unwrap_or(""),
                self.query_transformer.as_deref(),
                &mut view,
                extra_handlers,
            )?;
        }

        // The content type alone decides whether the body carries form
        // parameters; the verb plays no part.
        if request
            .content_type()
            .is_some_and(|content_type| content_type.starts_with(WWW_FORM_URLENCODED))
        {
            let mut view = builder.query_handler();
            self.parse_params(
                &self.query_parser,
                request.body().unwrap_or(""),
                self.body_transformer.as_deref(),
                &mut view,
                extra_handlers,
            )?;
        }
        Ok(())
    }
}

impl Unpacker for CustomizableUnpacker {
    fn unpack_with_handlers(
        &self,
        request: &dyn Request,
        extra_handlers: &mut [&mut dyn KeyValueHandler],
    ) -> Result<UnpackedRequest, UnpackError> {
        let mut builder = OAuthParamsBuilder::new(self.helper.as_ref());
        self.parse_request(request, &mut builder, extra_handlers)?;

        let parsed_request = ParsedRequest::from_request(request, builder.other_params().to_vec());

        if builder.is_oauth1() {
            debug!(
                path = %parsed_request.path.as_deref().unwrap_or(""),
                host = %parsed_request.host.as_deref().unwrap_or(""),
                "building oauth1 request"
            );
            let oauth1 = OAuth1Request::build(
                parsed_request,
                builder.oauth1_params(),
                self.normalizer.as_ref(),
            )?;
            Ok(UnpackedRequest::OAuth1(oauth1))
        } else if builder.is_oauth1_two_legged() {
            debug!(
                path = %parsed_request.path.as_deref().unwrap_or(""),
                host = %parsed_request.host.as_deref().unwrap_or(""),
                "building oauth1 two-legged request"
            );
            let two_legged = OAuth1TwoLeggedRequest::build(
                parsed_request,
                builder.oauth1_params(),
                self.normalizer.as_ref(),
            )?;
            Ok(UnpackedRequest::OAuth1TwoLegged(two_legged))
        } else if let Some(token) = builder.oauth2_token() {
            debug!(
                path = %parsed_request.path.as_deref().unwrap_or(""),
                host = %parsed_request.host.as_deref().unwrap_or(""),
                "building oauth2 request"
            );
            if !self.oauth2_policy.allow(request, &parsed_request) {
                return Err(UnpackError::MalformedRequest(
                    "OAuth 2.0 requests not allowed".to_owned(),
                ));
            }
            let token = codec::decode(token)?;
            let client_id = builder.client_id().map(str::to_owned);
            Ok(UnpackedRequest::OAuth2(OAuth2Request::new(
                token,
                parsed_request,
                client_id,
            )))
        } else {
            Ok(UnpackedRequest::Unknown(parsed_request))
        }
    }
}

impl fmt::Debug for CustomizableUnpacker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomizableUnpacker")
            .field("query_parser", &self.query_parser)
            .field("header_parser", &self.header_parser)
            .finish_non_exhaustive()
    }
}

// Bridges ParamsHelper::process_key into the transformer seam.
struct HelperKeyTransformer<'a> {
    helper: &'a dyn ParamsHelper,
}

impl Transformer for HelperKeyTransformer<'_> {
    fn transform(&self, input: &str) -> String {
        self.helper.process_key(input)
    }
}
