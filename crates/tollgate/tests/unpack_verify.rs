//! End-to-end tests: raw request through unpacking to verification.

use chrono::Utc;
use tollgate::error::UnpackError;
use tollgate::request::Request;
use tollgate::signer::{Signer, StandardSigner};
use tollgate::unpacked::UnpackedRequest;
use tollgate::unpacker::{CustomizableUnpacker, Unpacker};
use tollgate::verifier::{NO_TIMESTAMP_CHECK, Verifier, VerifierResult};

const CONSUMER_SECRET: &str = "consumersecret";
const TOKEN_SECRET: &str = "tokensecret";

#[derive(Debug, Default)]
struct TestRequest {
    scheme: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    verb: Option<String>,
    path: Option<String>,
    query_string: Option<String>,
    authorization_header: Option<String>,
    content_type: Option<String>,
    body: Option<String>,
}

impl TestRequest {
    fn https_get(query_string: Option<String>) -> Self {
        Self {
            scheme: Some("https".to_owned()),
            host: Some("photos.example.net".to_owned()),
            port: Some(443),
            verb: Some("GET".to_owned()),
            path: Some("/photos".to_owned()),
            query_string,
            ..Self::default()
        }
    }
}

impl Request for TestRequest {
    fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    fn port(&self) -> Option<u16> {
        self.port
    }

    fn verb(&self) -> Option<&str> {
        self.verb.as_deref()
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    fn authorization_header(&self) -> Option<&str> {
        self.authorization_header.as_deref()
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

fn oauth1_query(token: Option<&str>, timestamp: i64, signature: &str) -> String {
    let mut query = format!(
        "oauth_consumer_key=ck&oauth_nonce=n1&oauth_signature_method=HMAC-SHA1\
         &oauth_timestamp={timestamp}&oauth_signature={signature}"
    );
    if let Some(token) = token {
        query.push_str("&oauth_token=");
        query.push_str(token);
    }
    query
}

/// Unpacks once with a placeholder signature to learn the normalized
/// request, signs it, then unpacks the properly signed request.
fn signed_request(token: Option<&str>, timestamp: i64, token_secret: &str) -> UnpackedRequest {
    let unpacker = CustomizableUnpacker::standard();
    let probe = TestRequest::https_get(Some(oauth1_query(token, timestamp, "probe")));
    let normalized = match unpacker.unpack(&probe).unwrap() {
        UnpackedRequest::OAuth1(oauth1) => oauth1.normalized_request,
        UnpackedRequest::OAuth1TwoLegged(two_legged) => two_legged.normalized_request,
        other => panic!("probe classified as {other:?}"),
    };

    let signature = StandardSigner.sign(&normalized, token_secret, CONSUMER_SECRET);
    let request = TestRequest::https_get(Some(oauth1_query(token, timestamp, &signature)));
    unpacker.unpack(&request).unwrap()
}

#[test]
fn test_should_unpack_and_verify_three_legged_request() {
    let now = Utc::now().timestamp();
    let UnpackedRequest::OAuth1(oauth1) = signed_request(Some("tok"), now, TOKEN_SECRET) else {
        panic!("expected OAuth1");
    };
    assert_eq!(oauth1.token, "tok");
    assert_eq!(oauth1.consumer_key, "ck");

    let verifier = Verifier::new().with_max_clock_float_mins(5, 5);
    assert_eq!(
        verifier.verify(&oauth1, TOKEN_SECRET, CONSUMER_SECRET),
        VerifierResult::Ok
    );
}

#[test]
fn test_should_reject_tampered_signature() {
    let now = Utc::now().timestamp();
    let UnpackedRequest::OAuth1(mut oauth1) = signed_request(Some("tok"), now, TOKEN_SECRET) else {
        panic!("expected OAuth1");
    };

    // Flip one character of the percent-encoded signature.
    let mut bytes = oauth1.signature.into_bytes();
    bytes[0] = if bytes[0] == b'A' { b'B' } else { b'A' };
    oauth1.signature = String::from_utf8(bytes).unwrap();

    let verifier = Verifier::new();
    assert_eq!(
        verifier.verify(&oauth1, TOKEN_SECRET, CONSUMER_SECRET),
        VerifierResult::BadSignature
    );
}

#[test]
fn test_should_unpack_and_verify_two_legged_request() {
    let now = Utc::now().timestamp();
    // Two-legged requests sign with an empty token secret.
    let UnpackedRequest::OAuth1TwoLegged(two_legged) = signed_request(None, now, "") else {
        panic!("expected OAuth1TwoLegged");
    };
    assert_eq!(two_legged.consumer_key, "ck");

    let verifier = Verifier::new().with_max_clock_float_mins(5, 5);
    assert_eq!(
        verifier.verify_two_legged(&two_legged, CONSUMER_SECRET),
        VerifierResult::Ok
    );
    // The consumer secret alone decides; a wrong one must fail.
    assert_eq!(
        verifier.verify_two_legged(&two_legged, "wrong"),
        VerifierResult::BadSignature
    );
}

#[test]
fn test_should_report_out_of_window_timestamp() {
    let stale = Utc::now().timestamp() - 3600;
    let UnpackedRequest::OAuth1(oauth1) = signed_request(Some("tok"), stale, TOKEN_SECRET) else {
        panic!("expected OAuth1");
    };

    let bounded = Verifier::new().with_max_clock_float_mins(5, 5);
    assert_eq!(
        bounded.verify(&oauth1, TOKEN_SECRET, CONSUMER_SECRET),
        VerifierResult::BadTimestamp
    );

    // Disabling the behind bound accepts arbitrarily old requests.
    let unbounded_past = Verifier::new().with_max_clock_float_mins(5, NO_TIMESTAMP_CHECK);
    assert_eq!(
        unbounded_past.verify(&oauth1, TOKEN_SECRET, CONSUMER_SECRET),
        VerifierResult::Ok
    );
}

#[test]
fn test_should_unpack_bearer_token_over_https() {
    let unpacker = CustomizableUnpacker::standard();
    let mut request = TestRequest::https_get(None);
    request.authorization_header = Some("Bearer some-access-token".to_owned());

    let UnpackedRequest::OAuth2(oauth2) = unpacker.unpack(&request).unwrap() else {
        panic!("expected OAuth2");
    };
    assert_eq!(oauth2.token, "some-access-token");
}

#[test]
fn test_should_reject_bearer_token_over_http() {
    let unpacker = CustomizableUnpacker::standard();
    let mut request = TestRequest::https_get(None);
    request.scheme = Some("http".to_owned());
    request.port = Some(80);
    request.authorization_header = Some("Bearer some-access-token".to_owned());

    assert!(matches!(
        unpacker.unpack(&request),
        Err(UnpackError::MalformedRequest(_))
    ));
}

#[test]
fn test_should_prefer_oauth1_params_over_bearer_header() {
    let now = Utc::now().timestamp();
    let unpacker = CustomizableUnpacker::standard();
    let mut request =
        TestRequest::https_get(Some(oauth1_query(Some("tok"), now, "sig")));
    request.authorization_header = Some("Bearer some-access-token".to_owned());

    assert!(matches!(
        unpacker.unpack(&request).unwrap(),
        UnpackedRequest::OAuth1(_)
    ));
}

#[test]
fn test_should_verify_request_signed_from_header_credentials() {
    let now = Utc::now().timestamp();
    let unpacker = CustomizableUnpacker::standard();

    // Learn the normalized request from a probe carrying header
    // credentials, then re-present it with the real signature.
    let header = |signature: &str| {
        format!(
            "OAuth oauth_consumer_key=\"ck\", oauth_nonce=\"n1\", \
             oauth_signature_method=\"HMAC-SHA1\", oauth_timestamp=\"{now}\", \
             oauth_signature=\"{signature}\", oauth_token=\"tok\", oauth_version=\"1.0\""
        )
    };
    let mut probe = TestRequest::https_get(Some("size=large".to_owned()));
    probe.authorization_header = Some(header("probe"));
    let UnpackedRequest::OAuth1(probed) = unpacker.unpack(&probe).unwrap() else {
        panic!("expected OAuth1");
    };

    let signature = StandardSigner.sign(&probed.normalized_request, TOKEN_SECRET, CONSUMER_SECRET);
    let mut request = TestRequest::https_get(Some("size=large".to_owned()));
    request.authorization_header = Some(header(&signature));
    let UnpackedRequest::OAuth1(oauth1) = unpacker.unpack(&request).unwrap() else {
        panic!("expected OAuth1");
    };

    assert_eq!(
        Verifier::new().verify(&oauth1, TOKEN_SECRET, CONSUMER_SECRET),
        VerifierResult::Ok
    );
}

#[test]
fn test_should_verify_form_body_parameters_in_signature() {
    let now = Utc::now().timestamp();
    let unpacker = CustomizableUnpacker::standard();

    let make = |signature: &str| {
        let mut request = TestRequest::https_get(None);
        request.verb = Some("POST".to_owned());
        request.content_type = Some("application/x-www-form-urlencoded".to_owned());
        request.body = Some(format!(
            "file=vacation.jpg&{}",
            oauth1_query(Some("tok"), now, signature)
        ));
        request
    };

    let UnpackedRequest::OAuth1(probed) = unpacker.unpack(&make("probe")).unwrap() else {
        panic!("expected OAuth1");
    };
    // Body params participate in the base string.
    assert!(probed.normalized_request.contains("file%3Dvacation.jpg"));

    let signature = StandardSigner.sign(&probed.normalized_request, TOKEN_SECRET, CONSUMER_SECRET);
    let UnpackedRequest::OAuth1(oauth1) = unpacker.unpack(&make(&signature)).unwrap() else {
        panic!("expected OAuth1");
    };
    assert_eq!(
        Verifier::new().verify(&oauth1, TOKEN_SECRET, CONSUMER_SECRET),
        VerifierResult::Ok
    );
}

#[test]
fn test_should_classify_form_body_credentials_on_any_verb() {
    // Body parsing is gated on the content type alone, so OAuth1
    // parameters delivered in a DELETE body still classify.
    let now = Utc::now().timestamp();
    let unpacker = CustomizableUnpacker::standard();

    let make = |signature: &str| {
        let mut request = TestRequest::https_get(None);
        request.verb = Some("DELETE".to_owned());
        request.content_type = Some("application/x-www-form-urlencoded".to_owned());
        request.body = Some(oauth1_query(Some("tok"), now, signature));
        request
    };

    let UnpackedRequest::OAuth1(probed) = unpacker.unpack(&make("placeholder")).unwrap() else {
        panic!("expected OAuth1");
    };
    assert!(probed.normalized_request.starts_with("DELETE&"));

    let signature = StandardSigner.sign(&probed.normalized_request, TOKEN_SECRET, CONSUMER_SECRET);
    let UnpackedRequest::OAuth1(oauth1) = unpacker.unpack(&make(&signature)).unwrap() else {
        panic!("expected OAuth1");
    };
    assert_eq!(
        Verifier::new().verify(&oauth1, TOKEN_SECRET, CONSUMER_SECRET),
        VerifierResult::Ok
    );
}

#[test]
fn test_should_return_unknown_for_plain_requests() {
    let unpacker = CustomizableUnpacker::standard();
    let request = TestRequest::https_get(Some("size=large&page=2".to_owned()));
    let unpacked = unpacker.unpack(&request).unwrap();

    let UnpackedRequest::Unknown(parsed) = unpacked else {
        panic!("expected Unknown");
    };
    assert_eq!(parsed.params.len(), 2);
}

#[test]
fn test_should_reject_incomplete_oauth1_request_as_unknown() {
    // OAuth intent but no nonce or timestamp: none of the predicates
    // hold, so the request falls through as unknown rather than failing.
    let unpacker = CustomizableUnpacker::standard();
    let request = TestRequest::https_get(Some(
        "oauth_consumer_key=ck&oauth_signature=sig&oauth_signature_method=HMAC-SHA1".to_owned(),
    ));
    assert!(matches!(
        unpacker.unpack(&request).unwrap(),
        UnpackedRequest::Unknown(_)
    ));
}
