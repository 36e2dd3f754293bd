//! Percent-encoding codec tuned for signature-base construction.
//!
//! Three operations: [`encode`] escapes a raw string, [`decode`] strictly
//! reverses form-style encoding, and [`normalize`] rewrites an
//! already-encoded string into the single canonical form that byte-wise
//! comparison and sorting require. `normalize` is idempotent, so material
//! that arrives pre-encoded from clients with different escaping habits
//! converges to the same bytes.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::DecodeError;

/// Everything outside the RFC 3986 unreserved set gets escaped.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a raw string with uppercase hex escapes.
///
/// Unreserved characters (`A-Z a-z 0-9 - _ . ~`) pass through; every other
/// byte of the UTF-8 encoding becomes `%XX`. Returns the input unchanged
/// (borrowed) when nothing needs escaping.
///
/// # Examples
///
/// ```
/// use tollgate_keyvalue::codec;
///
/// assert_eq!(codec::encode("a b+c"), "a%20b%2Bc");
/// assert_eq!(codec::encode("safe-chars_."), "safe-chars_.");
/// ```
#[must_use]
pub fn encode(input: &str) -> Cow<'_, str> {
    utf8_percent_encode(input, URI_ENCODE_SET).into()
}

/// Decode a percent-encoded string with form semantics.
///
/// `%XX` escapes (either hex case) decode to their byte value and `+`
/// decodes to a space.
///
/// # Errors
///
/// Returns [`DecodeError`] when a `%` is not followed by two hex digits or
/// when the decoded bytes are not valid UTF-8.
///
/// # Examples
///
/// ```
/// use tollgate_keyvalue::codec;
///
/// assert_eq!(codec::decode("a%20b+c").unwrap(), "a b c");
/// assert!(codec::decode("broken%2").is_err());
/// ```
pub fn decode(input: &str) -> Result<String, DecodeError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let Some((hi, lo)) = hex_pair(bytes, i + 1) else {
                    return Err(DecodeError::InvalidEscape { position: i });
                };
                out.push(hi * 16 + lo);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| DecodeError::InvalidUtf8)
}

/// Canonicalize an already-percent-encoded string.
///
/// Rewrites the input so that equal values become equal bytes:
///
/// ```text
/// %XX for an unreserved char  ->  the bare char   (%5F -> _, %2E -> .)
/// %xx other escapes           ->  %XX uppercased  (%3a -> %3A)
/// +                           ->  %20
/// , [ ]                       ->  %2C %5B %5D
/// ```
///
/// A `%` with fewer than two characters left after it passes through
/// untouched; `normalize` never fails. The transform is idempotent and
/// returns the input borrowed when it is already canonical.
#[must_use]
pub fn normalize(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    let mut owned: Option<Vec<u8>> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' && i + 3 <= bytes.len() {
            let hi = bytes[i + 1];
            let lo = bytes[i + 2];
            if let Some(unescaped) = unescape_unreserved(hi, lo) {
                let buf = owned.get_or_insert_with(|| bytes[..i].to_vec());
                buf.push(unescaped);
            } else {
                let canonical = [b'%', hi.to_ascii_uppercase(), lo.to_ascii_uppercase()];
                if bytes[i..i + 3] == canonical {
                    if let Some(buf) = owned.as_mut() {
                        buf.extend_from_slice(&canonical);
                    }
                } else {
                    let buf = owned.get_or_insert_with(|| bytes[..i].to_vec());
                    buf.extend_from_slice(&canonical);
                }
            }
            i += 3;
            continue;
        }
        let escape_as = match b {
            b'+' => Some(*b"%20"),
            b',' => Some(*b"%2C"),
            b'[' => Some(*b"%5B"),
            b']' => Some(*b"%5D"),
            _ => None,
        };
        if let Some(escape) = escape_as {
            let buf = owned.get_or_insert_with(|| bytes[..i].to_vec());
            buf.extend_from_slice(&escape);
        } else if let Some(buf) = owned.as_mut() {
            buf.push(b);
        }
        i += 1;
    }
    match owned {
        // Only ASCII runs are rewritten, so the buffer stays valid UTF-8.
        Some(buf) => Cow::Owned(String::from_utf8(buf).expect("rewrites preserve UTF-8")),
        None => Cow::Borrowed(input),
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn hex_pair(bytes: &[u8], at: usize) -> Option<(u8, u8)> {
    let hi = bytes.get(at).copied().and_then(hex_value)?;
    let lo = bytes.get(at + 1).copied().and_then(hex_value)?;
    Some((hi, lo))
}

/// Escapes of unreserved characters that `normalize` rewrites to the bare
/// char, matched case-insensitively.
fn unescape_unreserved(hi: u8, lo: u8) -> Option<u8> {
    match (hi.to_ascii_uppercase(), lo.to_ascii_uppercase()) {
        (b'5', b'F') => Some(b'_'),
        (b'2', b'D') => Some(b'-'),
        (b'7', b'E') => Some(b'~'),
        (b'2', b'E') => Some(b'.'),
        _ => None,
    }
}
