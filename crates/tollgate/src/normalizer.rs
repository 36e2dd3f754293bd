//! Builds the canonical OAuth 1.0a signature base string.

use tollgate_keyvalue::{Pair, codec};

use crate::params::OAuth1Params;

/// Produces the normalized request string that OAuth 1.0a signatures
/// are computed over.
pub trait Normalizer: Send + Sync {
    /// Builds the signature base string from the request pieces.
    ///
    /// `params` and the fields of `oauth1_params` are taken as already
    /// percent-encoded: individual keys and values are joined without
    /// re-encoding, and only the assembled URL and parameter string are
    /// encoded as wholes. The signature field itself never participates.
    #[allow(clippy::too_many_arguments)]
    fn normalize(
        &self,
        scheme: &str,
        host: &str,
        port: u16,
        verb: &str,
        path: &str,
        params: &[Pair],
        oauth1_params: &OAuth1Params,
    ) -> String;
}

/// The standard OAuth 1.0a normalization: upper-cased verb, lower-cased
/// scheme and host, default ports elided, parameters sorted by key then
/// value.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardNormalizer;

impl StandardNormalizer {
    /// Ports 80-on-http and 443-on-https stay out of the base string.
    fn include_port(port: u16, scheme: &str) -> bool {
        !((port == 80 && scheme.eq_ignore_ascii_case("http"))
            || (port == 443 && scheme.eq_ignore_ascii_case("https")))
    }
}

impl Normalizer for StandardNormalizer {
    fn normalize(
        &self,
        scheme: &str,
        host: &str,
        port: u16,
        verb: &str,
        path: &str,
        params: &[Pair],
        oauth1_params: &OAuth1Params,
    ) -> String {
        let mut sig_params = Vec::with_capacity(params.len() + 7);
        sig_params.extend_from_slice(params);
        sig_params.extend(oauth1_params.to_list(false));
        sig_params.sort();

        let mut param_string = String::with_capacity(512);
        for (i, pair) in sig_params.iter().enumerate() {
            if i > 0 {
                param_string.push('&');
            }
            param_string.push_str(&pair.key);
            param_string.push('=');
            param_string.push_str(&pair.value);
        }

        let mut request_url = String::with_capacity(512);
        request_url.push_str(&scheme.to_lowercase());
        request_url.push_str("://");
        request_url.push_str(&host.to_lowercase());
        if Self::include_port(port, scheme) {
            request_url.push(':');
            request_url.push_str(&port.to_string());
        }
        request_url.push_str(path);

        let mut normalized = String::with_capacity(512);
        normalized.push_str(&verb.to_uppercase());
        normalized.push('&');
        normalized.push_str(&codec::encode(&request_url));
        normalized.push('&');
        normalized.push_str(&codec::encode(&param_string));
        normalized
    }
}
