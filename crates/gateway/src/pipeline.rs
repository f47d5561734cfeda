//! Serves a request: resolves the endpoint arguments, then runs the filter chain of the route
//! around the backend exchange.

use crate::backend::BackendRegistry;
use crate::context::Context;
use crate::endpoint::{BackendService, Endpoint, ResolvedArgument};
use crate::error::{ServeError, StateError};
use crate::filter::{Filter, FilterHandler, FilterInvoker, FilterRegistry, compose};
use async_trait::async_trait;
use dashmap::DashMap;
use micro_value::ValueResolvers;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The request processing core of the gateway.
///
/// Filter chains are composed on first use and cached by the list of selective filter ids of
/// the route, so routes configured alike share a chain.
pub struct Pipeline {
    filters: Arc<FilterRegistry>,
    backends: Arc<BackendRegistry>,
    resolvers: Arc<ValueResolvers>,
    chains: DashMap<Vec<String>, FilterHandler>,
}

impl Pipeline {
    pub fn new(filters: Arc<FilterRegistry>, backends: Arc<BackendRegistry>, resolvers: Arc<ValueResolvers>) -> Self {
        Self { filters, backends, resolvers, chains: DashMap::new() }
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    pub fn resolvers(&self) -> &ValueResolvers {
        &self.resolvers
    }

    /// Resolves every declared argument of `service`, failing on the first that cannot be
    /// decoded.
    pub fn resolve_arguments(&self, service: &BackendService) -> Result<Vec<ResolvedArgument>, StateError> {
        service
            .arguments
            .iter()
            .map(|argument| {
                let value = self
                    .resolvers
                    .resolve(&argument.type_class, &argument.generic_types, argument.value.clone())
                    .map_err(|e| StateError::resolve_argument(&argument.name, e))?;
                Ok(ResolvedArgument { name: argument.name.clone(), type_class: argument.type_class.clone(), value })
            })
            .collect()
    }

    /// Returns the chain of `endpoint`: global filters in order, then its selective filters in the
    /// order it names them, around the backend exchange.
    pub fn chain(&self, endpoint: &Endpoint) -> FilterHandler {
        if let Some(chain) = self.chains.get(&endpoint.filters) {
            return Arc::clone(&chain);
        }
        let chain = self.compose_chain(endpoint);
        Arc::clone(self.chains.entry(endpoint.filters.clone()).or_insert(chain).value())
    }

    fn compose_chain(&self, endpoint: &Endpoint) -> FilterHandler {
        let mut filters: Vec<Arc<dyn Filter>> = self.filters.global().to_vec();
        for id in &endpoint.filters {
            match self.filters.lookup_selective(id) {
                Ok(Some(filter)) => filters.push(Arc::clone(filter)),
                Ok(None) => warn!(filter_id = %id, pattern = %endpoint.http_pattern, "selective filter not found, skipped"),
                Err(e) => warn!(pattern = %endpoint.http_pattern, cause = %e, "invalid selective filter id, skipped"),
            }
        }
        debug!(pattern = %endpoint.http_pattern, filters = filters.len(), "composed filter chain");

        let terminal: FilterHandler = Arc::new(Exchange { backends: Arc::clone(&self.backends) });
        compose(&filters, terminal)
    }

    /// Serves the request held by `ctx`. On success the response of `ctx` holds the decoded
    /// backend response; on failure it is left as the filters left it.
    pub async fn serve(&self, ctx: &mut Context) -> Result<(), ServeError> {
        let endpoint = Arc::clone(ctx.endpoint());
        let arguments = self.resolve_arguments(&endpoint.service)?;
        ctx.set_arguments(arguments);

        self.chain(&endpoint).invoke(ctx).await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("filters", &self.filters)
            .field("backends", &self.backends)
            .field("resolvers", &self.resolvers)
            .field("chains", &self.chains.len())
            .finish()
    }
}

/// The terminal handler: dispatches by protocol and decodes the result.
struct Exchange {
    backends: Arc<BackendRegistry>,
}

#[async_trait]
impl FilterInvoker for Exchange {
    async fn invoke(&self, ctx: &mut Context) -> Result<(), ServeError> {
        let backends = self.backends.as_ref();
        backends.exchange(ctx, backends).await.map_err(ServeError::from)
    }
}
