//! `application/x-www-form-urlencoded` to JSON transcoding.
//!
//! The output format is relied on by existing callers and must stay bit-exact:
//!
//! - pairs are grouped by key, keys appear in the order they first occur in the payload;
//! - a key with several values renders as an array of strings, a key with one value as a string;
//! - values only get their `"` escaped as `\"`, keys are not escaped at all.
//!
//! The escaping is narrower than JSON requires. A value holding a backslash or a control
//! character produces text that a JSON parser rejects or reads differently.
//!
//! Percent decoding is lenient: a malformed escape such as `%zz` is kept as literal text rather
//! than rejecting the payload.

use crate::ResolveError;
use bytes::{BufMut, Bytes, BytesMut};
use indexmap::IndexMap;

/// Transcodes a url encoded form payload into a flat JSON object.
///
/// # Example
/// ```
/// use micro_value::form::json_bytes_from_query_string;
///
/// let json = json_bytes_from_query_string(b"a=1&a=2&b=3").unwrap();
/// assert_eq!(&json[..], br#"{"a":["1","2"],"b":"3"}"#);
/// ```
pub fn json_bytes_from_query_string(query: &[u8]) -> Result<Bytes, ResolveError> {
    let pairs = serde_urlencoded::from_bytes::<Vec<(String, String)>>(query)?;

    let mut grouped: IndexMap<String, Vec<String>> = IndexMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        grouped.entry(key).or_default().push(value);
    }

    let mut buf = BytesMut::with_capacity(query.len() + 16);
    buf.put_u8(b'{');
    for (i, (key, values)) in grouped.iter().enumerate() {
        if i > 0 {
            buf.put_u8(b',');
        }
        put_quoted(&mut buf, key);
        buf.put_u8(b':');
        if let [single] = values.as_slice() {
            put_quoted(&mut buf, &json_string_value_encode(single));
        } else {
            buf.put_u8(b'[');
            for (j, value) in values.iter().enumerate() {
                if j > 0 {
                    buf.put_u8(b',');
                }
                put_quoted(&mut buf, &json_string_value_encode(value));
            }
            buf.put_u8(b']');
        }
    }
    buf.put_u8(b'}');

    Ok(buf.freeze())
}

/// Escapes embedded double quotes, and nothing else.
pub fn json_string_value_encode(value: &str) -> String {
    value.replace('"', "\\\"")
}

fn put_quoted(buf: &mut BytesMut, text: &str) {
    buf.put_u8(b'"');
    buf.put_slice(text.as_bytes());
    buf.put_u8(b'"');
}
