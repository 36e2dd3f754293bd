//! OAuth parameter names, the typed parameter carrier, and the
//! request-scoped accumulator that classifies a request.

use std::fmt;

use tollgate_keyvalue::Pair;
use tollgate_keyvalue::handler::{DuplicateKeyValueHandler, KeyValueHandler, SingleKeyValueHandler};

/// Key under which an OAuth 2.0 bearer token is delivered to the
/// accumulator by the header parser.
pub const BEARER_TOKEN: &str = "Bearer";
/// Header-only key identifying the OAuth 2.0 client.
pub const CLIENT_ID: &str = "client_id";
/// OAuth 1.0a access token parameter.
pub const OAUTH_TOKEN: &str = "oauth_token";
/// OAuth 1.0a consumer key parameter.
pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
/// OAuth 1.0a nonce parameter.
pub const OAUTH_NONCE: &str = "oauth_nonce";
/// OAuth 1.0a timestamp parameter, in seconds since the epoch.
pub const OAUTH_TIMESTAMP: &str = "oauth_timestamp";
/// OAuth 1.0a signature parameter.
pub const OAUTH_SIGNATURE: &str = "oauth_signature";
/// OAuth 1.0a signature method parameter.
pub const OAUTH_SIGNATURE_METHOD: &str = "oauth_signature_method";
/// OAuth 1.0a version parameter.
pub const OAUTH_VERSION: &str = "oauth_version";
/// Key for the canonical signature base string in diagnostic maps.
pub const NORMALIZED_REQUEST: &str = "normalized_request";
/// Placeholder rendered for absent values in diagnostic output.
pub const UNSET: &str = "(unset)";

/// The only signature method accepted at request build time.
pub const HMAC_SHA1: &str = "HMAC-SHA1";
/// OAuth version accepted verbatim.
pub const ONE_DOT_OH: &str = "1.0";
/// OAuth version accepted after lower-casing.
pub const ONE_DOT_OH_A: &str = "1.0a";

/// Authorization scheme announcing OAuth 1.0a credentials.
pub const OAUTH1_HEADER_AUTHTYPE: &str = "oauth";
/// Authorization scheme announcing an OAuth 2.0 bearer token.
pub const OAUTH2_HEADER_AUTHTYPE: &str = "bearer";

pub(crate) fn value_or_unset(value: Option<&str>) -> &str {
    value.unwrap_or(UNSET)
}

/// Immutable carrier for the OAuth 1.0a parameters of one request.
///
/// The token is optional to allow for two-legged requests. Values are
/// held exactly as extracted from the wire, still percent-encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuth1Params {
    /// Access token, still percent-encoded. `None` for two-legged
    /// requests.
    pub token: Option<String>,
    /// Consumer key, still percent-encoded.
    pub consumer_key: Option<String>,
    /// Request nonce, still percent-encoded.
    pub nonce: Option<String>,
    /// Timestamp parsed to seconds since the epoch.
    pub timestamp_secs: Option<i64>,
    /// Timestamp exactly as it appeared on the wire.
    pub timestamp_str: Option<String>,
    /// Presented signature, still percent-encoded.
    pub signature: Option<String>,
    /// Signature method named by the request.
    pub signature_method: Option<String>,
    /// OAuth version named by the request, if any.
    pub version: Option<String>,
}

impl OAuth1Params {
    /// Flattens the populated fields into signing-order pairs for the
    /// normalized request, skipping the signature itself unless
    /// `include_signature` is set.
    pub fn to_list(&self, include_signature: bool) -> Vec<Pair> {
        let mut buf = Vec::with_capacity(7);
        if let Some(consumer_key) = &self.consumer_key {
            buf.push(Pair::new(OAUTH_CONSUMER_KEY, consumer_key.clone()));
        }
        if let Some(nonce) = &self.nonce {
            buf.push(Pair::new(OAUTH_NONCE, nonce.clone()));
        }
        if let Some(token) = &self.token {
            buf.push(Pair::new(OAUTH_TOKEN, token.clone()));
        }
        if include_signature {
            if let Some(signature) = &self.signature {
                buf.push(Pair::new(OAUTH_SIGNATURE, signature.clone()));
            }
        }
        if let Some(signature_method) = &self.signature_method {
            buf.push(Pair::new(OAUTH_SIGNATURE_METHOD, signature_method.clone()));
        }
        if let Some(timestamp_str) = &self.timestamp_str {
            buf.push(Pair::new(OAUTH_TIMESTAMP, timestamp_str.clone()));
        }
        if let Some(version) = &self.version {
            buf.push(Pair::new(OAUTH_VERSION, version.clone()));
        }
        buf
    }
}

impl fmt::Display for OAuth1Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let timestamp_secs = self
            .timestamp_secs
            .map_or_else(|| UNSET.to_owned(), |secs| secs.to_string());
        write!(
            f,
            "{}={},{}={},{}={},{}={}(->{}),{}={},{}={},{}={}",
            OAUTH_TOKEN,
            value_or_unset(self.token.as_deref()),
            OAUTH_CONSUMER_KEY,
            value_or_unset(self.consumer_key.as_deref()),
            OAUTH_NONCE,
            value_or_unset(self.nonce.as_deref()),
            OAUTH_TIMESTAMP,
            value_or_unset(self.timestamp_str.as_deref()),
            timestamp_secs,
            OAUTH_SIGNATURE,
            value_or_unset(self.signature.as_deref()),
            OAUTH_SIGNATURE_METHOD,
            value_or_unset(self.signature_method.as_deref()),
            OAUTH_VERSION,
            value_or_unset(self.version.as_deref()),
        )
    }
}

/// Customization points for parameter accumulation.
pub trait ParamsHelper: Send + Sync {
    /// Parses a timestamp string to seconds. Returning `None` drops the
    /// field entirely instead of failing the request.
    fn parse_timestamp(&self, value: &str) -> Option<i64>;

    /// Rewrites the signature as delivered by the request.
    fn process_signature(&self, signature: &str) -> String;

    /// Rewrites parameter keys before dispatch.
    fn process_key(&self, key: &str) -> String;
}

/// Default helper: integer timestamps, keys and signatures untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardParamsHelper;

impl ParamsHelper for StandardParamsHelper {
    fn parse_timestamp(&self, value: &str) -> Option<i64> {
        value.parse().ok()
    }

    fn process_signature(&self, signature: &str) -> String {
        signature.to_owned()
    }

    fn process_key(&self, key: &str) -> String {
        key.to_owned()
    }
}

/// Request-scoped collector for OAuth and other parameters.
///
/// Key/value pairs from the header, query string, and body are pushed
/// in through [`header_handler`](Self::header_handler) and
/// [`query_handler`](Self::query_handler); recognized OAuth keys land
/// in typed slots, everything else in ordered lists. Once all sources
/// are drained, the classification predicates decide which request
/// shape the parameters describe.
pub struct OAuthParamsBuilder<'h> {
    helper: &'h dyn ParamsHelper,
    v2_token: Option<String>,
    client_id: Option<String>,
    token: Option<String>,
    consumer_key: Option<String>,
    nonce: Option<String>,
    timestamp_secs: Option<i64>,
    timestamp_str: Option<String>,
    signature: Option<String>,
    signature_method: Option<String>,
    version: Option<String>,
    params_handler: DuplicateKeyValueHandler,
    other_oauth_params_handler: SingleKeyValueHandler,
}

impl<'h> OAuthParamsBuilder<'h> {
    /// Creates an empty accumulator using `helper` for timestamp and
    /// signature processing.
    pub fn new(helper: &'h dyn ParamsHelper) -> Self {
        Self {
            helper,
            v2_token: None,
            client_id: None,
            token: None,
            consumer_key: None,
            nonce: None,
            timestamp_secs: None,
            timestamp_str: None,
            signature: None,
            signature_method: None,
            version: None,
            params_handler: DuplicateKeyValueHandler::new(),
            other_oauth_params_handler: SingleKeyValueHandler::new(),
        }
    }

    /// Handler view for pairs extracted from the `Authorization`
    /// header.
    pub fn header_handler(&mut self) -> BuilderHandler<'_, 'h> {
        BuilderHandler {
            builder: self,
            from_header: true,
        }
    }

    /// Handler view for pairs extracted from the query string or a
    /// form-encoded body.
    pub fn query_handler(&mut self) -> BuilderHandler<'_, 'h> {
        BuilderHandler {
            builder: self,
            from_header: false,
        }
    }

    // Recognized keys consume their pair even when the guard rejects
    // the value, so an empty oauth_nonce never leaks into otherParams.
    fn handle_key_value(&mut self, key: &str, value: &str, from_header: bool) {
        match key {
            BEARER_TOKEN => {
                if from_header && !value.is_empty() {
                    self.v2_token = Some(value.to_owned());
                }
            }
            CLIENT_ID => {
                if from_header && !value.is_empty() {
                    self.client_id = Some(value.to_owned());
                }
            }
            OAUTH_TOKEN => {
                self.token = Some(value.trim().to_owned());
            }
            OAUTH_CONSUMER_KEY => {
                if !value.is_empty() {
                    self.consumer_key = Some(value.to_owned());
                }
            }
            OAUTH_NONCE => {
                if !value.is_empty() {
                    self.nonce = Some(value.to_owned());
                }
            }
            OAUTH_TIMESTAMP => {
                if let Some(secs) = self.helper.parse_timestamp(value) {
                    self.timestamp_secs = Some(secs);
                    self.timestamp_str = Some(value.to_owned());
                }
            }
            OAUTH_SIGNATURE => {
                if !value.is_empty() {
                    self.signature = Some(self.helper.process_signature(value));
                }
            }
            OAUTH_SIGNATURE_METHOD => {
                if !value.is_empty() {
                    self.signature_method = Some(value.to_owned());
                }
            }
            OAUTH_VERSION => {
                if !value.is_empty() {
                    self.version = Some(value.to_owned());
                }
            }
            _ if key.starts_with("oauth_") => {
                self.other_oauth_params_handler.handle(key, value);
            }
            _ => {
                if !from_header {
                    self.params_handler.handle(key, value);
                }
            }
        }
    }

    /// True when a bearer token was captured and the OAuth 1.0a
    /// predicates do not claim the request first.
    pub fn is_oauth2(&self) -> bool {
        self.v2_token.is_some() && !self.is_oauth1() && !self.is_oauth1_two_legged()
    }

    /// True when a non-empty token plus the five other required OAuth
    /// 1.0a fields are present. The version is optional.
    pub fn is_oauth1(&self) -> bool {
        self.token.as_deref().is_some_and(|token| !token.is_empty())
            && self.consumer_key.is_some()
            && self.nonce.is_some()
            && self.timestamp_str.is_some()
            && self.signature.is_some()
            && self.signature_method.is_some()
    }

    /// True when the token is absent or empty but the five other
    /// required OAuth 1.0a fields are present.
    pub fn is_oauth1_two_legged(&self) -> bool {
        self.token.as_deref().is_none_or(str::is_empty)
            && self.consumer_key.is_some()
            && self.nonce.is_some()
            && self.timestamp_str.is_some()
            && self.signature.is_some()
            && self.signature_method.is_some()
    }

    /// The bearer token, if one was captured from the header.
    pub fn oauth2_token(&self) -> Option<&str> {
        self.v2_token.as_deref()
    }

    /// The client id, if one was captured from the header.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Non-OAuth parameters from the query string and body, in arrival
    /// order with duplicates preserved. These participate in the
    /// normalized request.
    pub fn other_params(&self) -> &[Pair] {
        self.params_handler.pairs()
    }

    /// Unrecognized `oauth_`-prefixed parameters, last value per key.
    /// Captured for inspection only; they take no part in signing.
    pub fn other_oauth_params(&self) -> &[Pair] {
        self.other_oauth_params_handler.pairs()
    }

    /// Freezes the accumulated OAuth 1.0a fields into an immutable
    /// carrier.
    pub fn oauth1_params(&self) -> OAuth1Params {
        OAuth1Params {
            token: self.token.clone(),
            consumer_key: self.consumer_key.clone(),
            nonce: self.nonce.clone(),
            timestamp_secs: self.timestamp_secs,
            timestamp_str: self.timestamp_str.clone(),
            signature: self.signature.clone(),
            signature_method: self.signature_method.clone(),
            version: self.version.clone(),
        }
    }
}

impl fmt::Debug for OAuthParamsBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthParamsBuilder")
            .field("v2_token", &self.v2_token)
            .field("client_id", &self.client_id)
            .field("token", &self.token)
            .field("consumer_key", &self.consumer_key)
            .field("nonce", &self.nonce)
            .field("timestamp_secs", &self.timestamp_secs)
            .field("timestamp_str", &self.timestamp_str)
            .field("signature", &self.signature)
            .field("signature_method", &self.signature_method)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for OAuthParamsBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let timestamp_secs = self
            .timestamp_secs
            .map_or_else(|| UNSET.to_owned(), |secs| secs.to_string());
        write!(
            f,
            "{}={},{}={},{}={},{}={},{}={},{}={}(->{}),{}={},{}={},{}={}",
            BEARER_TOKEN,
            value_or_unset(self.v2_token.as_deref()),
            CLIENT_ID,
            value_or_unset(self.client_id.as_deref()),
            OAUTH_TOKEN,
            value_or_unset(self.token.as_deref()),
            OAUTH_CONSUMER_KEY,
            value_or_unset(self.consumer_key.as_deref()),
            OAUTH_NONCE,
            value_or_unset(self.nonce.as_deref()),
            OAUTH_TIMESTAMP,
            value_or_unset(self.timestamp_str.as_deref()),
            timestamp_secs,
            OAUTH_SIGNATURE,
            value_or_unset(self.signature.as_deref()),
            OAUTH_SIGNATURE_METHOD,
            value_or_unset(self.signature_method.as_deref()),
            OAUTH_VERSION,
            value_or_unset(self.version.as_deref()),
        )
    }
}

/// [`KeyValueHandler`] view over an [`OAuthParamsBuilder`], tagged with
/// the source of its pairs.
pub struct BuilderHandler<'b, 'h> {
    builder: &'b mut OAuthParamsBuilder<'h>,
    from_header: bool,
}

impl KeyValueHandler for BuilderHandler<'_, '_> {
    fn handle(&mut self, key: &str, value: &str) {
        self.builder.handle_key_value(key, value, self.from_header);
    }
}

impl fmt::Debug for BuilderHandler<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderHandler")
            .field("from_header", &self.from_header)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(builder: &mut OAuthParamsBuilder<'_>, pairs: &[(&str, &str)], from_header: bool) {
        for (key, value) in pairs {
            builder.handle_key_value(key, value, from_header);
        }
    }

    fn full_oauth1_query() -> Vec<(&'static str, &'static str)> {
        vec![
            (OAUTH_CONSUMER_KEY, "ck"),
            (OAUTH_NONCE, "n1"),
            (OAUTH_TIMESTAMP, "1234567890"),
            (OAUTH_SIGNATURE, "sig"),
            (OAUTH_SIGNATURE_METHOD, "HMAC-SHA1"),
        ]
    }

    #[test]
    fn test_should_classify_oauth1_with_token() {
        let helper = StandardParamsHelper;
        let mut builder = OAuthParamsBuilder::new(&helper);
        feed(&mut builder, &full_oauth1_query(), false);
        builder.handle_key_value(OAUTH_TOKEN, " tok ", false);

        assert!(builder.is_oauth1());
        assert!(!builder.is_oauth1_two_legged());
        assert!(!builder.is_oauth2());
        assert_eq!(builder.oauth1_params().token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_should_classify_two_legged_when_token_absent_or_empty() {
        let helper = StandardParamsHelper;
        let mut builder = OAuthParamsBuilder::new(&helper);
        feed(&mut builder, &full_oauth1_query(), false);
        assert!(builder.is_oauth1_two_legged());

        builder.handle_key_value(OAUTH_TOKEN, "   ", false);
        assert!(builder.is_oauth1_two_legged());
        assert!(!builder.is_oauth1());
        assert_eq!(builder.oauth1_params().token.as_deref(), Some(""));
    }

    #[test]
    fn test_should_capture_bearer_token_only_from_header() {
        let helper = StandardParamsHelper;
        let mut builder = OAuthParamsBuilder::new(&helper);
        builder.handle_key_value(BEARER_TOKEN, "abc", false);
        assert_eq!(builder.oauth2_token(), None);
        // Swallowed, not treated as an ordinary query param.
        assert!(builder.other_params().is_empty());

        builder.handle_key_value(BEARER_TOKEN, "abc", true);
        assert_eq!(builder.oauth2_token(), Some("abc"));
        assert!(builder.is_oauth2());
    }

    #[test]
    fn test_should_capture_client_id_only_from_header() {
        let helper = StandardParamsHelper;
        let mut builder = OAuthParamsBuilder::new(&helper);
        builder.handle_key_value(CLIENT_ID, "app1", false);
        assert_eq!(builder.client_id(), None);

        builder.handle_key_value(CLIENT_ID, "app1", true);
        assert_eq!(builder.client_id(), Some("app1"));
    }

    #[test]
    fn test_should_prefer_oauth1_over_bearer_token() {
        let helper = StandardParamsHelper;
        let mut builder = OAuthParamsBuilder::new(&helper);
        builder.handle_key_value(BEARER_TOKEN, "abc", true);
        feed(&mut builder, &full_oauth1_query(), false);
        builder.handle_key_value(OAUTH_TOKEN, "tok", false);

        assert!(builder.is_oauth1());
        assert!(!builder.is_oauth2());
    }

    #[test]
    fn test_should_swallow_empty_values_for_required_slots() {
        let helper = StandardParamsHelper;
        let mut builder = OAuthParamsBuilder::new(&helper);
        builder.handle_key_value(OAUTH_CONSUMER_KEY, "", false);
        builder.handle_key_value(OAUTH_NONCE, "", false);
        builder.handle_key_value(OAUTH_SIGNATURE, "", false);

        let params = builder.oauth1_params();
        assert_eq!(params.consumer_key, None);
        assert_eq!(params.nonce, None);
        assert_eq!(params.signature, None);
        assert!(builder.other_params().is_empty());
    }

    #[test]
    fn test_should_drop_unparseable_timestamps() {
        let helper = StandardParamsHelper;
        let mut builder = OAuthParamsBuilder::new(&helper);
        builder.handle_key_value(OAUTH_TIMESTAMP, "not-a-number", false);

        let params = builder.oauth1_params();
        assert_eq!(params.timestamp_secs, None);
        assert_eq!(params.timestamp_str, None);
    }

    #[test]
    fn test_should_keep_timestamp_string_verbatim() {
        let helper = StandardParamsHelper;
        let mut builder = OAuthParamsBuilder::new(&helper);
        builder.handle_key_value(OAUTH_TIMESTAMP, "0099", false);

        let params = builder.oauth1_params();
        assert_eq!(params.timestamp_secs, Some(99));
        assert_eq!(params.timestamp_str.as_deref(), Some("0099"));
    }

    #[test]
    fn test_should_sideline_unknown_oauth_prefixed_keys() {
        let helper = StandardParamsHelper;
        let mut builder = OAuthParamsBuilder::new(&helper);
        builder.handle_key_value("oauth_body_hash", "h1", false);
        builder.handle_key_value("oauth_body_hash", "h2", false);
        builder.handle_key_value("plain", "p", false);

        assert_eq!(
            builder.other_oauth_params(),
            &[Pair::new("oauth_body_hash", "h2")]
        );
        assert_eq!(builder.other_params(), &[Pair::new("plain", "p")]);
    }

    #[test]
    fn test_should_collect_other_params_from_query_but_not_header() {
        let helper = StandardParamsHelper;
        let mut builder = OAuthParamsBuilder::new(&helper);
        builder.handle_key_value("a", "1", true);
        builder.handle_key_value("a", "1", false);
        builder.handle_key_value("a", "2", false);

        assert_eq!(
            builder.other_params(),
            &[Pair::new("a", "1"), Pair::new("a", "2")]
        );
    }

    #[test]
    fn test_should_list_params_in_signing_order() {
        let params = OAuth1Params {
            token: Some("tok".to_owned()),
            consumer_key: Some("ck".to_owned()),
            nonce: Some("n1".to_owned()),
            timestamp_secs: Some(99),
            timestamp_str: Some("99".to_owned()),
            signature: Some("sig".to_owned()),
            signature_method: Some(HMAC_SHA1.to_owned()),
            version: Some(ONE_DOT_OH.to_owned()),
        };

        let keys: Vec<String> = params
            .to_list(false)
            .into_iter()
            .map(|pair| pair.key)
            .collect();
        assert_eq!(
            keys,
            vec![
                OAUTH_CONSUMER_KEY,
                OAUTH_NONCE,
                OAUTH_TOKEN,
                OAUTH_SIGNATURE_METHOD,
                OAUTH_TIMESTAMP,
                OAUTH_VERSION,
            ]
        );

        let with_sig = params.to_list(true);
        assert_eq!(with_sig[3].key, OAUTH_SIGNATURE);
    }

    #[test]
    fn test_should_render_unset_fields_in_display() {
        let params = OAuth1Params::default();
        let rendered = params.to_string();
        assert!(rendered.starts_with("oauth_token=(unset),"));
        assert!(rendered.contains("oauth_timestamp=(unset)(->(unset))"));
    }

    #[test]
    fn test_should_parse_integer_timestamps_only() {
        assert_eq!(StandardParamsHelper.parse_timestamp("123"), Some(123));
        assert_eq!(StandardParamsHelper.parse_timestamp("-9"), Some(-9));
        assert_eq!(StandardParamsHelper.parse_timestamp("12.5"), None);
        assert_eq!(StandardParamsHelper.parse_timestamp(""), None);
    }
}
