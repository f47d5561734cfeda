use std::io;
use thiserror::Error;

/// Errors produced while resolving a [`MimeValue`](crate::MimeValue) into a typed value.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("malformed text: {reason}")]
    MalformedText { reason: String },

    #[error("cannot decode text to hashmap, text: {text}, error: {source}")]
    DecodeText {
        text: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot decode json to hashmap, error: {source}")]
    DecodeJson {
        #[from]
        source: serde_json::Error,
    },

    #[error("cannot encode value to json text, error: {source}")]
    EncodeJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot parse form data, error: {source}")]
    DecodeForm {
        #[from]
        source: serde_urlencoded::de::Error,
    },

    #[error("cannot cast object to hashmap, object: {object}, object.type: {kind}")]
    CastObject { object: String, kind: &'static str },

    #[error("unsupported mime-type to hashmap, value: {value}, value.type: {kind}, mime-type: {mime_type}")]
    UnsupportedMimeType { value: String, kind: &'static str, mime_type: String },

    #[error("cannot convert value to bytes, value: {value}, value.type: {kind}")]
    UnsupportedBytes { value: String, kind: &'static str },

    #[error("unable to cast {value} of type {kind} to string")]
    CastString { value: String, kind: &'static str },

    #[error("stream has been consumed")]
    StreamConsumed,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ResolveError {
    pub fn malformed_text<S: ToString>(str: S) -> Self {
        Self::MalformedText { reason: str.to_string() }
    }

    pub fn decode_text<S: ToString>(text: S, source: serde_json::Error) -> Self {
        Self::DecodeText { text: text.to_string(), source }
    }

    pub fn encode_json(source: serde_json::Error) -> Self {
        Self::EncodeJson { source }
    }
}
