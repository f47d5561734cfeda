use super::Filter;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterLookupError {
    #[error("filter id must not be empty")]
    EmptyId,
}

/// The sealed set of global and selective filters.
///
/// Global filters run on every route, selective filters only on the routes that name them. Both
/// sequences are ordered by [`Filter::order`]; filters with the same order keep their
/// registration order.
pub struct FilterRegistry {
    global: Vec<Arc<dyn Filter>>,
    selective: Vec<Arc<dyn Filter>>,
}

impl FilterRegistry {
    pub fn builder() -> FilterRegistryBuilder {
        FilterRegistryBuilder::new()
    }

    pub fn global(&self) -> &[Arc<dyn Filter>] {
        &self.global
    }

    pub fn selective(&self) -> &[Arc<dyn Filter>] {
        &self.selective
    }

    /// Finds the first selective filter registered under `id`.
    pub fn lookup_selective(&self, id: &str) -> Result<Option<&Arc<dyn Filter>>, FilterLookupError> {
        if id.is_empty() {
            return Err(FilterLookupError::EmptyId);
        }
        Ok(self.selective.iter().find(|filter| filter.filter_id() == id))
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids = |filters: &[Arc<dyn Filter>]| filters.iter().map(|filter| filter.filter_id().to_owned()).collect::<Vec<_>>();
        f.debug_struct("FilterRegistry").field("global", &ids(&self.global)).field("selective", &ids(&self.selective)).finish()
    }
}

struct OrderedFilter {
    order: i32,
    filter: Arc<dyn Filter>,
}

/// Collects filters before the registry is sealed.
pub struct FilterRegistryBuilder {
    global: Vec<OrderedFilter>,
    selective: Vec<OrderedFilter>,
}

impl FilterRegistryBuilder {
    fn new() -> Self {
        Self { global: vec![], selective: vec![] }
    }

    pub fn register_global<F: Filter + 'static>(self, filter: F) -> Self {
        self.register_global_shared(Arc::new(filter))
    }

    /// Registers a global filter that may also be held elsewhere. Registering the same filter
    /// twice runs it twice.
    pub fn register_global_shared(mut self, filter: Arc<dyn Filter>) -> Self {
        debug!(filter_id = filter.filter_id(), order = filter.order(), "registered global filter");
        append_sorted(&mut self.global, filter);
        self
    }

    pub fn register_selective<F: Filter + 'static>(self, filter: F) -> Self {
        self.register_selective_shared(Arc::new(filter))
    }

    /// Registers a selective filter. On lookup the first filter of the sequence with the id wins.
    pub fn register_selective_shared(mut self, filter: Arc<dyn Filter>) -> Self {
        debug!(filter_id = filter.filter_id(), order = filter.order(), "registered selective filter");
        append_sorted(&mut self.selective, filter);
        self
    }

    pub fn build(self) -> FilterRegistry {
        let into_filters = |filters: Vec<OrderedFilter>| -> Vec<Arc<dyn Filter>> {
            filters.into_iter().map(|ordered| ordered.filter).collect()
        };
        FilterRegistry { global: into_filters(self.global), selective: into_filters(self.selective) }
    }
}

fn append_sorted(filters: &mut Vec<OrderedFilter>, filter: Arc<dyn Filter>) {
    filters.push(OrderedFilter { order: filter.order(), filter });
    // stable, so equal orders keep registration order
    filters.sort_by_key(|ordered| ordered.order);
}

impl fmt::Debug for FilterRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistryBuilder")
            .field("global", &self.global.len())
            .field("selective", &self.selective.len())
            .finish()
    }
}
