//! Canonical parameter serialization and the keyed hash over it.
//!
//! The gateway signs the exact query string produced by sorting parameters
//! lexicographically by name and percent-encoding each value; the hash is
//! appended as one more parameter and excluded when recomputing.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Query parameter carrying the keyed hash.
pub const SIGNATURE_PARAM: &str = "pg_sig";

// Unreserved characters (RFC 3986) pass through; everything else is encoded
// so both sides serialize to identical bytes.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Serialize parameters in canonical (lexicographic) order.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(name, QUERY_ENCODE),
                utf8_percent_encode(value, QUERY_ENCODE)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Keyed hash over the canonical query string, lowercase hex.
pub fn sign(canonical: &str, secret: &str) -> String {
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(canonical.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Recompute the hash over every parameter except `pg_sig` and compare it to
/// the supplied one in constant time.
pub fn verify<'a, I>(params: I, provided: &str, secret: &str) -> bool
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let filtered: BTreeMap<String, String> = params
        .into_iter()
        .filter(|(name, _)| name.as_str() != SIGNATURE_PARAM)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let expected = sign(&canonical_query(&filtered), secret);
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}
