//! OAuth2 request body encoding and response body decoding.
//!
//! Token and revocation endpoints speak
//! `application/x-www-form-urlencoded` on the way in and JSON on the way
//! out (RFC 6749 §4.3, §5, §6; RFC 7009 §2.1).

use serde_json::Value;
use url::form_urlencoded::byte_serialize;

use crate::ProtocolError;

/// Encodes key/value pairs as a form body: `k1=v1&k2=v2`.
///
/// Spaces are written as `%20` rather than `+`, so a scope list
/// `["public", "private"]` becomes `scope=public%20private`.
pub fn encode_form<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .iter()
        .map(|(k, v)| {
            format!("{}={}", encode_component(k.as_ref()), encode_component(v.as_ref()))
        })
        .collect::<Vec<_>>()
        .join("&")
}

// `byte_serialize` escapes a literal '+' as "%2B", so any '+' left in its
// output stands for a space.
fn encode_component(raw: &str) -> String {
    byte_serialize(raw.as_bytes()).collect::<String>().replace('+', "%20")
}

/// Interprets a token endpoint response body.
///
/// - body is not JSON → [`ProtocolError::Unparsable`] with the raw text
///   (regardless of status)
/// - JSON with a non-2xx status → [`ProtocolError::Rejected`] with the
///   parsed document
/// - JSON with a 2xx status → the parsed document
pub fn decode_response_body(success: bool, body: &str) -> Result<Value, ProtocolError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|_| ProtocolError::Unparsable(body.to_string()))?;

    if !success {
        return Err(ProtocolError::Rejected(json));
    }
    Ok(json)
}
