//! Per-request state shared by filters and backends.

use crate::body::ResponseBody;
use crate::endpoint::{Endpoint, ResolvedArgument};
use http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// The attribute holding the authenticated subject of the request.
pub const ATTR_JWT_SUBJECT: &str = "X-Jwt-Subject";

/// The state of one request while it travels through the filter chain.
///
/// A context is owned by a single request and is only ever borrowed mutably by the handler that
/// currently runs, so it needs no synchronization of its own.
#[derive(Debug)]
pub struct Context {
    request_id: String,
    endpoint: Arc<Endpoint>,
    attributes: HashMap<String, Value>,
    arguments: Vec<ResolvedArgument>,
    response: Response,
}

impl Context {
    pub fn new(request_id: impl Into<String>, endpoint: Arc<Endpoint>) -> Self {
        Self {
            request_id: request_id.into(),
            endpoint,
            attributes: HashMap::new(),
            arguments: Vec::new(),
            response: Response::default(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn arguments(&self) -> &[ResolvedArgument] {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&ResolvedArgument> {
        self.arguments.iter().find(|argument| argument.name == name)
    }

    pub fn set_arguments(&mut self, arguments: Vec<ResolvedArgument>) {
        self.arguments = arguments;
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }
}

/// The response under construction.
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn set_status_code(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Merges `headers` into the response; a name present in both keeps only the new values.
    pub fn set_headers(&mut self, headers: HeaderMap) {
        self.headers.extend(headers);
    }

    pub fn set_body(&mut self, body: ResponseBody) {
        self.body = body;
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, ResponseBody) {
        (self.status, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::BackendService;
    use http::{HeaderValue, Method};
    use serde_json::json;

    fn context() -> Context {
        let endpoint = Endpoint::new(Method::GET, "/users/{id}", BackendService::new("echo", "local", "/users"));
        Context::new("req-1", Arc::new(endpoint))
    }

    #[test]
    fn attributes() {
        let mut ctx = context();
        assert!(ctx.attribute(ATTR_JWT_SUBJECT).is_none());

        ctx.set_attribute(ATTR_JWT_SUBJECT, "alice");
        assert_eq!(ctx.attribute(ATTR_JWT_SUBJECT), Some(&json!("alice")));
    }

    #[test]
    fn response_defaults_to_ok_and_empty() {
        let ctx = context();
        assert_eq!(ctx.response().status(), StatusCode::OK);
        assert!(ctx.response().headers().is_empty());
        assert!(ctx.response().body().is_empty());
    }

    #[test]
    fn set_headers_merges() {
        let mut ctx = context();
        let response = ctx.response_mut();

        let mut first = HeaderMap::new();
        first.insert("x-a", HeaderValue::from_static("1"));
        first.insert("x-b", HeaderValue::from_static("1"));
        response.set_headers(first);

        let mut second = HeaderMap::new();
        second.insert("x-b", HeaderValue::from_static("2"));
        response.set_headers(second);

        assert_eq!(response.headers().get("x-a").unwrap(), "1");
        assert_eq!(response.headers().get_all("x-b").iter().collect::<Vec<_>>(), vec!["2"]);
    }
}
