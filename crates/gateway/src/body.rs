use bytes::Bytes;
use serde_json::Value;

/// The body written to the client once a backend response has been decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBody {
    inner: Kind,
}

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Once(Option<Bytes>),
    Json(Value),
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        Self { inner: Kind::Once(Some(bytes)) }
    }

    pub fn json(value: Value) -> Self {
        Self { inner: Kind::Json(value) }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.inner, Kind::Once(None))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match &self.inner {
            Kind::Json(value) => Some(value),
            Kind::Once(_) => None,
        }
    }

    /// Serializes the body into the bytes sent on the wire.
    pub fn into_bytes(self) -> Result<Bytes, serde_json::Error> {
        match self.inner {
            Kind::Once(None) => Ok(Bytes::new()),
            Kind::Once(Some(bytes)) => Ok(bytes),
            Kind::Json(value) => serde_json::to_vec(&value).map(Bytes::from),
        }
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        ResponseBody { inner: Kind::Once(Some(Bytes::from(value))) }
    }
}

impl From<()> for ResponseBody {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}

impl From<Option<Bytes>> for ResponseBody {
    fn from(option: Option<Bytes>) -> Self {
        match option {
            Some(bytes) => Self::once(bytes),
            None => Self::empty(),
        }
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        if value.is_empty() { Self::empty() } else { Self::once(Bytes::from_static(value.as_bytes())) }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self::once(bytes) }
    }
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        Self::json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check_send<T: Send + Sync>() {}

    #[test]
    fn is_send() {
        check_send::<ResponseBody>();
    }

    #[test]
    fn test_empty() {
        assert!(ResponseBody::from("").is_empty());
        assert!(ResponseBody::from(()).is_empty());
        assert!(ResponseBody::from(None).is_empty());
        assert_eq!(ResponseBody::empty().into_bytes().unwrap(), Bytes::new());
    }

    #[test]
    fn test_string_body() {
        let body = ResponseBody::from("hello".to_owned());
        assert!(!body.is_empty());
        assert_eq!(body.into_bytes().unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_json_body() {
        let body = ResponseBody::from(json!({"code": 200}));
        assert_eq!(body.as_json(), Some(&json!({"code": 200})));
        assert_eq!(body.into_bytes().unwrap(), Bytes::from_static(br#"{"code":200}"#));
    }
}
