use super::{Backend, BackendResponse};
use crate::context::Context;
use crate::endpoint::BackendService;
use crate::error::StateError;
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};
use micro_value::MimeValue;
use serde_json::{Map, Value, json};
use tracing::debug;

/// Answers every call with a description of the call itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoBackend;

#[async_trait]
impl Backend for EchoBackend {
    async fn invoke(&self, service: &BackendService, ctx: &mut Context) -> Result<BackendResponse, StateError> {
        debug!(request_id = ctx.request_id(), uri = %service.uri, "echo backend invoked");

        let arguments = ctx
            .arguments()
            .iter()
            .map(|argument| (argument.name.clone(), argument.value.to_json()))
            .collect::<Map<String, Value>>();

        let body = json!({
            "request_id": ctx.request_id(),
            "protocol": service.protocol,
            "host": service.host,
            "uri": service.uri,
            "method": service.method,
            "arguments": arguments,
        });

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(BackendResponse::new(MimeValue::object(body)).with_headers(headers))
    }
}
