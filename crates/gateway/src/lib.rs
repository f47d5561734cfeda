//! The request processing core of the micro gateway.
//!
//! A request that matched an [`Endpoint`] is served by the [`Pipeline`]:
//!
//! 1. the declared arguments of the backend service are resolved to typed values with the
//!    [`ValueResolvers`](micro_value::ValueResolvers) registry,
//! 2. the filter chain of the route runs: global filters ordered by [`Filter::order`], then the
//!    selective filters the route names,
//! 3. at the end of the chain the [`BackendRegistry`] dispatches the call by protocol and the
//!    response decoder of that protocol writes the outward response into the [`Context`].
//!
//! Registries are built once at startup with their builders and are read-only afterwards.
//!
//! # Example
//! ```no_run
//! use micro_gateway::backend::{BackendRegistry, EchoBackend, PROTOCOL_ECHO};
//! use micro_gateway::filter::FilterRegistry;
//! use micro_gateway::{BackendService, Context, Endpoint, Pipeline};
//! use micro_value::ValueResolvers;
//! use std::sync::Arc;
//!
//! # async fn serve() -> Result<(), micro_gateway::ServeError> {
//! let backends = BackendRegistry::builder().register_backend(PROTOCOL_ECHO, EchoBackend).default_decoders().build();
//! let pipeline = Pipeline::new(
//!     Arc::new(FilterRegistry::builder().build()),
//!     Arc::new(backends),
//!     Arc::new(ValueResolvers::builder().builtins().build()),
//! );
//!
//! let endpoint = Endpoint::new(http::Method::GET, "/echo", BackendService::new(PROTOCOL_ECHO, "local", "/echo"));
//! let mut ctx = Context::new("req-1", Arc::new(endpoint));
//! pipeline.serve(&mut ctx).await?;
//! # Ok(())
//! # }
//! ```

mod body;
mod context;
mod endpoint;
mod error;
mod pipeline;

pub mod backend;
pub mod config;
pub mod filter;
pub mod logging;

pub use body::ResponseBody;
pub use context::{ATTR_JWT_SUBJECT, Context, Response};
pub use endpoint::{Argument, BackendService, Endpoint, ResolvedArgument};
pub use error::*;
pub use pipeline::Pipeline;

pub use backend::BackendRegistry;
pub use filter::Filter;
