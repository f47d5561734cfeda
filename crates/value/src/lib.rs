//! Typed value resolution for the micro gateway.
//!
//! Arguments reach the gateway loosely typed: query strings, form fields, JSON bodies, in-memory
//! maps produced by other filters. This crate turns such a [`MimeValue`] into a [`TypedValue`]
//! of the type a backend method declares, looked up by type name in a [`ValueResolvers`]
//! registry.
//!
//! Resolution favours resilience over strictness:
//! - numeric and boolean resolvers cast on a best-effort basis and never fail,
//! - a type name without a resolver is described rather than rejected,
//! - errors are reserved for inputs that cannot be decoded at all (bad JSON, unreadable streams).
//!
//! # Example
//! ```
//! use micro_value::{MimeValue, TypedValue, ValueResolvers};
//!
//! let resolvers = ValueResolvers::builtin();
//!
//! let id = resolvers.resolve("java.lang.Long", &[], MimeValue::text("1024")).unwrap();
//! assert_eq!(id, TypedValue::Long(1024));
//!
//! let form = resolvers.resolve("map", &[], MimeValue::form("a=1&a=2&b=3")).unwrap();
//! assert_eq!(form.to_json(), serde_json::json!({"a": ["1", "2"], "b": "3"}));
//! ```

mod error;
mod mime_value;
mod resolver;
mod typed;

pub mod builtin;
pub mod cast;
pub mod form;

pub use error::ResolveError;
pub use mime_value::{MIME_VALUE_OBJECT, MIME_VALUE_STRING_MAP, MIME_VALUE_TEXT, MimeValue, RawValue, ReadStream};
pub use resolver::{DEFAULT_RESOLVER_NAME, ValueResolver, ValueResolvers, ValueResolversBuilder};
pub use resolver::{cast_resolver, resolver_fn};
pub use typed::{TypeDescriptor, TypedValue};
