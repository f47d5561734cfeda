//! MIME tagged raw values.
//!
//! A [`MimeValue`] pairs a raw value with the encoding it was captured in. The encoding is either
//! one of the in-memory markers defined here ([`MIME_VALUE_TEXT`], [`MIME_VALUE_STRING_MAP`],
//! [`MIME_VALUE_OBJECT`]) or a wire content type such as `application/json`. Every typed value
//! resolver receives its input as a [`MimeValue`].

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fmt;
use std::io::Read;
use std::sync::Arc;

/// The value is already plain text held in memory.
pub const MIME_VALUE_TEXT: &str = "x-value/text";

/// The value is an in-memory string keyed map.
pub const MIME_VALUE_STRING_MAP: &str = "x-value/string-map";

/// The value is an arbitrary in-memory object.
pub const MIME_VALUE_OBJECT: &str = "x-value/object";

/// A value tagged with its wire or in-memory encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct MimeValue {
    mime_type: String,
    value: RawValue,
}

impl MimeValue {
    pub fn new(mime_type: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Self { mime_type: mime_type.into(), value: value.into() }
    }

    /// Plain text, tagged [`MIME_VALUE_TEXT`].
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(MIME_VALUE_TEXT, RawValue::Text(text.into()))
    }

    /// A string keyed map, tagged [`MIME_VALUE_STRING_MAP`].
    pub fn string_map(map: Map<String, Value>) -> Self {
        Self::new(MIME_VALUE_STRING_MAP, RawValue::Json(Value::Object(map)))
    }

    /// Any in-memory object, tagged [`MIME_VALUE_OBJECT`].
    pub fn object(value: Value) -> Self {
        Self::new(MIME_VALUE_OBJECT, RawValue::Json(value))
    }

    /// A wire payload encoded as `application/json`.
    pub fn json(value: impl Into<RawValue>) -> Self {
        Self::new(mime::APPLICATION_JSON.as_ref(), value)
    }

    /// A wire payload encoded as `application/x-www-form-urlencoded`.
    pub fn form(value: impl Into<RawValue>) -> Self {
        Self::new(mime::APPLICATION_WWW_FORM_URLENCODED.as_ref(), value)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn value(&self) -> &RawValue {
        &self.value
    }

    pub fn into_value(self) -> RawValue {
        self.value
    }

    pub fn into_parts(self) -> (String, RawValue) {
        (self.mime_type, self.value)
    }
}

/// The runtime shape of the value carried by a [`MimeValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Bytes(Bytes),
    Json(Value),
    Stream(ReadStream),
}

impl RawValue {
    /// A short name of the runtime shape, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Text(_) => "text",
            RawValue::Bytes(_) => "bytes",
            RawValue::Json(Value::Null) => "null",
            RawValue::Json(Value::Bool(_)) => "bool",
            RawValue::Json(Value::Number(_)) => "number",
            RawValue::Json(Value::String(_)) => "string",
            RawValue::Json(Value::Array(_)) => "array",
            RawValue::Json(Value::Object(_)) => "object",
            RawValue::Stream(_) => "stream",
        }
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_owned())
    }
}

impl From<Bytes> for RawValue {
    fn from(value: Bytes) -> Self {
        RawValue::Bytes(value)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(value: Vec<u8>) -> Self {
        RawValue::Bytes(Bytes::from(value))
    }
}

impl From<&'static [u8]> for RawValue {
    fn from(value: &'static [u8]) -> Self {
        RawValue::Bytes(Bytes::from_static(value))
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        RawValue::Json(value)
    }
}

impl From<Map<String, Value>> for RawValue {
    fn from(value: Map<String, Value>) -> Self {
        RawValue::Json(Value::Object(value))
    }
}

impl From<ReadStream> for RawValue {
    fn from(value: ReadStream) -> Self {
        RawValue::Stream(value)
    }
}

type BoxRead = Box<dyn Read + Send>;

/// A readable stream that can be consumed exactly once.
///
/// Clones share the same underlying reader; whichever clone drains it first wins, the others
/// observe an already consumed stream. The reader is dropped, and therefore closed, right after
/// it has been drained.
#[derive(Clone)]
pub struct ReadStream {
    inner: Arc<Mutex<Option<BoxRead>>>,
}

impl ReadStream {
    pub fn new<R: Read + Send + 'static>(reader: R) -> Self {
        Self { inner: Arc::new(Mutex::new(Some(Box::new(reader)))) }
    }

    pub fn is_consumed(&self) -> bool {
        self.inner.lock().is_none()
    }

    /// Reads the stream to its end and closes it.
    ///
    /// Returns `None` when the stream has been consumed before.
    pub fn drain(&self) -> Option<std::io::Result<Vec<u8>>> {
        let mut reader = self.inner.lock().take()?;
        let mut buf = Vec::new();
        let result = reader.read_to_end(&mut buf).map(|_| buf);
        drop(reader);
        Some(result)
    }
}

impl fmt::Debug for ReadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadStream").field("consumed", &self.is_consumed()).finish()
    }
}

impl PartialEq for ReadStream {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn constructors_tag_mime_type() {
        assert_eq!(MimeValue::text("a").mime_type(), MIME_VALUE_TEXT);
        assert_eq!(MimeValue::object(json!(1)).mime_type(), MIME_VALUE_OBJECT);
        assert_eq!(MimeValue::string_map(Map::new()).mime_type(), MIME_VALUE_STRING_MAP);
        assert_eq!(MimeValue::json("{}").mime_type(), "application/json");
        assert_eq!(MimeValue::form("a=1").mime_type(), "application/x-www-form-urlencoded");
    }

    #[test]
    fn stream_drains_once() {
        let stream = ReadStream::new(Cursor::new(b"hello".to_vec()));
        let shared = stream.clone();

        assert!(!stream.is_consumed());
        assert_eq!(stream.drain().unwrap().unwrap(), b"hello");
        assert!(shared.is_consumed());
        assert!(shared.drain().is_none());
    }

    #[test]
    fn raw_value_kind() {
        assert_eq!(RawValue::from("x").kind(), "text");
        assert_eq!(RawValue::from(vec![1u8]).kind(), "bytes");
        assert_eq!(RawValue::from(json!({"a": 1})).kind(), "object");
        assert_eq!(RawValue::from(json!([1])).kind(), "array");
        assert_eq!(RawValue::from(ReadStream::new(Cursor::new(Vec::<u8>::new()))).kind(), "stream");
    }
}
