//! Route and backend service metadata.

use http::Method;
use micro_value::{MimeValue, TypedValue};
use serde_json::{Map, Value};

/// A declared argument of a backend method, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub type_class: String,
    pub generic_types: Vec<String>,
    pub value: MimeValue,
}

impl Argument {
    pub fn new(name: impl Into<String>, type_class: impl Into<String>, value: MimeValue) -> Self {
        Self { name: name.into(), type_class: type_class.into(), generic_types: Vec::new(), value }
    }

    pub fn with_generic_types<I, S>(mut self, generic_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generic_types = generic_types.into_iter().map(Into::into).collect();
        self
    }
}

/// An argument after its value has been resolved to the declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArgument {
    pub name: String,
    pub type_class: String,
    pub value: TypedValue,
}

/// The backend side of an endpoint: which protocol to speak and which method to call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendService {
    pub protocol: String,
    pub host: String,
    pub uri: String,
    pub method: String,
    pub arguments: Vec<Argument>,
}

impl BackendService {
    pub fn new(protocol: impl Into<String>, host: impl Into<String>, uri: impl Into<String>) -> Self {
        Self { protocol: protocol.into(), host: host.into(), uri: uri.into(), ..Self::default() }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }
}

/// A route exposed by the gateway and the backend service it maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub http_method: Method,
    pub http_pattern: String,
    pub authorize: bool,
    /// Ids of the selective filters enabled for this route, in execution order.
    pub filters: Vec<String>,
    pub service: BackendService,
    /// Free-form route metadata for filters.
    pub attributes: Map<String, Value>,
}

impl Endpoint {
    pub fn new(http_method: Method, http_pattern: impl Into<String>, service: BackendService) -> Self {
        Self {
            http_method,
            http_pattern: http_pattern.into(),
            authorize: false,
            filters: Vec::new(),
            service,
            attributes: Map::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_authorize(mut self, authorize: bool) -> Self {
        self.authorize = authorize;
        self
    }

    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = filters.into_iter().map(Into::into).collect();
        self
    }
}
