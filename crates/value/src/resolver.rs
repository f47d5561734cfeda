//! The typed value resolution registry.
//!
//! Resolvers are registered under one or more aliases of a type name while the registry is being
//! built; [`ValueResolversBuilder::build`] seals it and the resulting [`ValueResolvers`] is
//! read-only, so it can be shared by any number of concurrent requests.
//!
//! # Example
//! ```
//! use micro_value::{resolver_fn, MimeValue, TypedValue, ValueResolvers};
//!
//! let resolvers = ValueResolvers::builder()
//!     .builtins()
//!     .register(&["upper"], resolver_fn(|_, _, _, value| {
//!         let text = micro_value::builtin::cast_decode_to_string(value)?;
//!         Ok(TypedValue::String(text.to_uppercase()))
//!     }))
//!     .build();
//!
//! let value = resolvers.resolve("upper", &[], MimeValue::text("abc")).unwrap();
//! assert_eq!(value, TypedValue::String("ABC".into()));
//! ```

use crate::builtin;
use crate::{MimeValue, RawValue, ResolveError, TypeDescriptor, TypedValue};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Alias of the resolver used for type names that have no resolver of their own.
pub const DEFAULT_RESOLVER_NAME: &str = "$default";

/// Converts a [`MimeValue`] into a [`TypedValue`] of the declared type.
///
/// Implementations must be stateless and reentrant: a single instance serves every request. The
/// registry is passed in so that composite types can resolve their elements.
pub trait ValueResolver: Send + Sync {
    fn resolve(
        &self,
        registry: &ValueResolvers,
        type_class: &str,
        generic_types: &[String],
        value: MimeValue,
    ) -> Result<TypedValue, ResolveError>;
}

struct FnResolver<F>(F);

impl<F> ValueResolver for FnResolver<F>
where
    F: Fn(&ValueResolvers, &str, &[String], MimeValue) -> Result<TypedValue, ResolveError> + Send + Sync,
{
    fn resolve(
        &self,
        registry: &ValueResolvers,
        type_class: &str,
        generic_types: &[String],
        value: MimeValue,
    ) -> Result<TypedValue, ResolveError> {
        (self.0)(registry, type_class, generic_types, value)
    }
}

/// Creates a resolver from a closure.
pub fn resolver_fn<F>(f: F) -> impl ValueResolver
where
    F: Fn(&ValueResolvers, &str, &[String], MimeValue) -> Result<TypedValue, ResolveError> + Send + Sync,
{
    FnResolver(f)
}

struct CastResolver<F>(F);

impl<F> ValueResolver for CastResolver<F>
where
    F: Fn(&RawValue) -> TypedValue + Send + Sync,
{
    fn resolve(&self, _: &ValueResolvers, _: &str, _: &[String], value: MimeValue) -> Result<TypedValue, ResolveError> {
        Ok((self.0)(value.value()))
    }
}

/// Creates a resolver that only looks at the raw value and cannot fail.
pub fn cast_resolver<F>(f: F) -> impl ValueResolver
where
    F: Fn(&RawValue) -> TypedValue + Send + Sync,
{
    CastResolver(f)
}

type SharedResolver = Arc<dyn ValueResolver>;

/// A sealed alias to resolver map.
pub struct ValueResolvers {
    resolvers: HashMap<String, SharedResolver>,
}

static BUILTIN: Lazy<ValueResolvers> = Lazy::new(|| ValueResolvers::builder().builtins().build());

impl ValueResolvers {
    pub fn builder() -> ValueResolversBuilder {
        ValueResolversBuilder::new()
    }

    /// Returns the shared registry holding only the built-in resolvers.
    pub fn builtin() -> &'static ValueResolvers {
        &BUILTIN
    }

    /// Returns the resolver registered under `alias`, without falling back to the default one.
    pub fn lookup(&self, alias: &str) -> Option<&dyn ValueResolver> {
        self.resolvers.get(alias).map(|resolver| &**resolver)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.resolvers.contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Resolves `value` as `type_class`.
    ///
    /// A type without a resolver goes to the resolver registered as [`DEFAULT_RESOLVER_NAME`].
    /// When even that one is missing the value is described, never rejected.
    pub fn resolve(
        &self,
        type_class: &str,
        generic_types: &[String],
        value: MimeValue,
    ) -> Result<TypedValue, ResolveError> {
        let resolver = self.resolvers.get(type_class).or_else(|| self.resolvers.get(DEFAULT_RESOLVER_NAME));
        match resolver {
            Some(resolver) => resolver.resolve(self, type_class, generic_types, value),
            None => Ok(describe(type_class, generic_types, value)),
        }
    }
}

impl fmt::Debug for ValueResolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut aliases = self.resolvers.keys().collect::<Vec<_>>();
        aliases.sort();
        f.debug_struct("ValueResolvers").field("aliases", &aliases).finish()
    }
}

pub(crate) fn describe(type_class: &str, generic_types: &[String], value: MimeValue) -> TypedValue {
    TypedValue::Unresolved(TypeDescriptor { class: type_class.to_owned(), generic: generic_types.to_vec(), value })
}

/// Collects resolvers before the registry is sealed.
pub struct ValueResolversBuilder {
    resolvers: HashMap<String, SharedResolver>,
}

impl ValueResolversBuilder {
    fn new() -> Self {
        Self { resolvers: HashMap::new() }
    }

    /// Registers the built-in string, number, boolean, map and list resolvers and the default one.
    pub fn builtins(self) -> Self {
        builtin::register(self)
    }

    /// Registers `resolver` under every alias. An alias registered before is replaced, other
    /// aliases of the replaced resolver keep it.
    pub fn register<R: ValueResolver + 'static>(mut self, aliases: &[&str], resolver: R) -> Self {
        let shared: SharedResolver = Arc::new(resolver);
        for alias in aliases {
            if self.resolvers.insert((*alias).to_owned(), Arc::clone(&shared)).is_some() {
                debug!(alias, "replaced typed value resolver");
            } else {
                debug!(alias, "registered typed value resolver");
            }
        }
        self
    }

    pub fn build(self) -> ValueResolvers {
        ValueResolvers { resolvers: self.resolvers }
    }
}

impl fmt::Debug for ValueResolversBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueResolversBuilder").field("len", &self.resolvers.len()).finish()
    }
}
