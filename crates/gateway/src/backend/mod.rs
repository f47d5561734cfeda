//! Backend invocation and response decoding.
//!
//! A [`Backend`] speaks one protocol: it calls the backend service an endpoint maps to and returns
//! what came back. A [`ResponseDecoder`] registered for the same protocol turns that result into
//! the status, headers and body written to the client. Both are registered in a
//! [`BackendRegistry`], which also drives the final exchange of every request.

mod decoder;
mod echo;
mod registry;

pub use decoder::{
    RESPONSE_KEY_BODY, RESPONSE_KEY_HEADERS, RESPONSE_KEY_STATUS, decoder_fn, http_response_decoder,
    rpc_response_decoder,
};
pub use echo::EchoBackend;
pub use registry::{BackendRegistry, BackendRegistryBuilder};

use crate::body::ResponseBody;
use crate::context::Context;
use crate::endpoint::BackendService;
use crate::error::{BoxError, StateError};
use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use micro_value::MimeValue;

pub const PROTOCOL_HTTP: &str = "http";
pub const PROTOCOL_DUBBO: &str = "dubbo";
pub const PROTOCOL_GRPC: &str = "grpc";
pub const PROTOCOL_ECHO: &str = "echo";

/// What a backend returned, before decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: MimeValue,
}

impl BackendResponse {
    pub fn new(body: MimeValue) -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// The outward response produced by a [`ResponseDecoder`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

/// Invokes backend services of one protocol.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn invoke(&self, service: &BackendService, ctx: &mut Context) -> Result<BackendResponse, StateError>;
}

/// Converts the result of a backend into the outward response.
pub trait ResponseDecoder: Send + Sync {
    fn decode(&self, ctx: &Context, response: BackendResponse) -> Result<DecodedResponse, BoxError>;
}
