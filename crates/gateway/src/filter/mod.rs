//! Filters wrap the request handler with cross-cutting behavior.
//!
//! A [`Filter`] is a middleware constructor: given the next [`FilterHandler`] it returns a handler
//! that may run code before and after calling it, or not call it at all. A chain built from the
//! filters `[A, B]` around the terminal handler `T` runs as
//! `A-entry, B-entry, T, B-exit, A-exit`.

mod permission;
mod registry;

pub use permission::{
    ExchangePermissionProvider, ORDER_PERMISSION_VERIFICATION, PERMISSION_VERIFICATION, PermissionFilter,
    PermissionProvider,
};
pub use registry::{FilterLookupError, FilterRegistry, FilterRegistryBuilder};

use crate::context::Context;
use crate::error::ServeError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// A step of the request processing chain.
#[async_trait]
pub trait FilterInvoker: Send + Sync {
    async fn invoke(&self, ctx: &mut Context) -> Result<(), ServeError>;
}

pub type FilterHandler = Arc<dyn FilterInvoker>;

/// A middleware constructor identified by a unique id.
pub trait Filter: Send + Sync {
    fn filter_id(&self) -> &str;

    /// The position of a global filter in the chain, lower runs first.
    fn order(&self) -> i32 {
        0
    }

    /// Wraps `next`. The returned handler decides whether, and when, `next` runs.
    fn invoke(&self, next: FilterHandler) -> FilterHandler;
}

struct FnInvoker<F>(F);

#[async_trait]
impl<F> FilterInvoker for FnInvoker<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), ServeError>> + Send + Sync,
{
    async fn invoke(&self, ctx: &mut Context) -> Result<(), ServeError> {
        (self.0)(ctx).await
    }
}

/// Creates a handler from a closure returning a boxed future.
pub fn invoker_fn<F>(f: F) -> FilterHandler
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), ServeError>> + Send + Sync + 'static,
{
    Arc::new(FnInvoker(f))
}

/// Wraps `terminal` with `filters`, the first filter becoming the outermost handler.
pub fn compose<'a, I>(filters: I, terminal: FilterHandler) -> FilterHandler
where
    I: IntoIterator<Item = &'a Arc<dyn Filter>>,
    I::IntoIter: DoubleEndedIterator,
{
    filters.into_iter().rev().fold(terminal, |next, filter| filter.invoke(next))
}
