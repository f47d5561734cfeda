use super::{
    Backend, BackendResponse, PROTOCOL_DUBBO, PROTOCOL_ECHO, PROTOCOL_GRPC, PROTOCOL_HTTP, ResponseDecoder,
    http_response_decoder, rpc_response_decoder,
};
use crate::context::Context;
use crate::endpoint::BackendService;
use crate::error::StateError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The sealed protocol to backend and protocol to decoder maps.
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn Backend>>,
    decoders: HashMap<String, Arc<dyn ResponseDecoder>>,
}

impl BackendRegistry {
    pub fn builder() -> BackendRegistryBuilder {
        BackendRegistryBuilder::new()
    }

    pub fn backend(&self, protocol: &str) -> Option<&Arc<dyn Backend>> {
        self.backends.get(protocol)
    }

    pub fn response_decoder(&self, protocol: &str) -> Option<&Arc<dyn ResponseDecoder>> {
        self.decoders.get(protocol)
    }

    /// Invokes `service` with the backend registered for its protocol.
    ///
    /// The backend result, success or error, is returned as it is.
    pub async fn dispatch(&self, service: &BackendService, ctx: &mut Context) -> Result<BackendResponse, StateError> {
        let Some(backend) = self.backends.get(&service.protocol) else {
            return Err(StateError::unknown_protocol(&service.protocol));
        };

        debug!(
            request_id = ctx.request_id(),
            protocol = %service.protocol,
            host = %service.host,
            uri = %service.uri,
            method = %service.method,
            "dispatch backend service"
        );
        backend.invoke(service, ctx).await
    }

    /// Invokes the endpoint's service through `backend` and writes the decoded result into the
    /// response of `ctx`.
    ///
    /// The response is written as a whole or not at all: status first, then headers, then body.
    pub async fn exchange(&self, ctx: &mut Context, backend: &dyn Backend) -> Result<(), StateError> {
        let endpoint = Arc::clone(ctx.endpoint());
        let service = &endpoint.service;

        let response = backend.invoke(service, ctx).await?;

        let Some(decoder) = self.decoders.get(&service.protocol) else {
            return Err(StateError::response_decoder_not_found());
        };

        let decoded = decoder.decode(ctx, response).map_err(|e| {
            warn!(request_id = ctx.request_id(), protocol = %service.protocol, cause = %e, "decode backend response failed");
            StateError::decode_response(e)
        })?;

        let response = ctx.response_mut();
        response.set_status_code(decoded.status);
        response.set_headers(decoded.headers);
        response.set_body(decoded.body);
        Ok(())
    }
}

#[async_trait]
impl Backend for BackendRegistry {
    async fn invoke(&self, service: &BackendService, ctx: &mut Context) -> Result<BackendResponse, StateError> {
        self.dispatch(service, ctx).await
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut backends = self.backends.keys().collect::<Vec<_>>();
        backends.sort();
        let mut decoders = self.decoders.keys().collect::<Vec<_>>();
        decoders.sort();
        f.debug_struct("BackendRegistry").field("backends", &backends).field("decoders", &decoders).finish()
    }
}

/// Collects backends and decoders before the registry is sealed.
pub struct BackendRegistryBuilder {
    backends: HashMap<String, Arc<dyn Backend>>,
    decoders: HashMap<String, Arc<dyn ResponseDecoder>>,
}

impl BackendRegistryBuilder {
    fn new() -> Self {
        Self { backends: HashMap::new(), decoders: HashMap::new() }
    }

    /// Registers `backend` for `protocol`, replacing any previous one.
    pub fn register_backend<B: Backend + 'static>(self, protocol: impl Into<String>, backend: B) -> Self {
        self.register_backend_shared(protocol, Arc::new(backend))
    }

    pub fn register_backend_shared(mut self, protocol: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        let protocol = protocol.into();
        debug!(protocol = %protocol, "registered backend");
        self.backends.insert(protocol, backend);
        self
    }

    /// Registers `decoder` for `protocol`, replacing any previous one.
    pub fn register_response_decoder<D: ResponseDecoder + 'static>(
        mut self,
        protocol: impl Into<String>,
        decoder: D,
    ) -> Self {
        let protocol = protocol.into();
        debug!(protocol = %protocol, "registered backend response decoder");
        self.decoders.insert(protocol, Arc::new(decoder));
        self
    }

    /// Registers the pass-through decoder for `http` and `echo`, and the RPC map decoder for
    /// `dubbo` and `grpc`.
    pub fn default_decoders(self) -> Self {
        self.register_response_decoder(PROTOCOL_HTTP, http_response_decoder())
            .register_response_decoder(PROTOCOL_ECHO, http_response_decoder())
            .register_response_decoder(PROTOCOL_DUBBO, rpc_response_decoder())
            .register_response_decoder(PROTOCOL_GRPC, rpc_response_decoder())
    }

    pub fn build(self) -> BackendRegistry {
        BackendRegistry { backends: self.backends, decoders: self.decoders }
    }
}

impl fmt::Debug for BackendRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistryBuilder")
            .field("backends", &self.backends.len())
            .field("decoders", &self.decoders.len())
            .finish()
    }
}
