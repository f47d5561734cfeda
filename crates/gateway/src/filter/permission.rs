use super::{Filter, FilterHandler, FilterInvoker};
use crate::backend::BackendRegistry;
use crate::config::{PermissionConfig, VerificationConfig};
use crate::context::{ATTR_JWT_SUBJECT, Context};
use crate::endpoint::{Argument, BackendService, Endpoint, ResolvedArgument};
use crate::error::{BoxError, ERROR_CODE_GATEWAY_INTERNAL, ERROR_CODE_PERMISSION_DENIED, InvokeError, ServeError};
use async_trait::async_trait;
use dashmap::DashMap;
use http::{Method, StatusCode};
use micro_value::builtin::{JAVA_LANG_STRING, cast_decode_to_string};
use micro_value::{MimeValue, TypedValue};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const PERMISSION_VERIFICATION: &str = "PermissionVerification";
pub const ORDER_PERMISSION_VERIFICATION: i32 = 1030;

/// Cache size past which expired decisions are swept on insert.
const CACHE_SWEEP_THRESHOLD: usize = 1024;

/// Decides whether a subject may call a route.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn verify(&self, subject_id: &str, method: &str, pattern: &str) -> Result<bool, BoxError>;
}

/// Verifies that the authenticated subject may access the route of an authorized endpoint.
///
/// The subject is read from the [`ATTR_JWT_SUBJECT`] attribute. Decisions are cached per
/// subject, method and pattern for the configured expiration.
pub struct PermissionFilter {
    disabled: bool,
    verifier: Arc<PermissionVerifier>,
}

impl PermissionFilter {
    pub fn new<P: PermissionProvider + 'static>(config: &PermissionConfig, provider: P) -> Self {
        if config.disabled {
            info!("permission verification is disabled");
        }
        let verifier = PermissionVerifier {
            provider: Arc::new(provider),
            expiration: config.cache_expiration(),
            cache: DashMap::new(),
        };
        Self { disabled: config.disabled, verifier: Arc::new(verifier) }
    }
}

impl Filter for PermissionFilter {
    fn filter_id(&self) -> &str {
        PERMISSION_VERIFICATION
    }

    fn order(&self) -> i32 {
        ORDER_PERMISSION_VERIFICATION
    }

    fn invoke(&self, next: FilterHandler) -> FilterHandler {
        if self.disabled {
            return next;
        }
        Arc::new(PermissionInvoker { next, verifier: Arc::clone(&self.verifier) })
    }
}

impl fmt::Debug for PermissionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionFilter")
            .field("disabled", &self.disabled)
            .field("expiration", &self.verifier.expiration)
            .finish()
    }
}

struct PermissionInvoker {
    next: FilterHandler,
    verifier: Arc<PermissionVerifier>,
}

#[async_trait]
impl FilterInvoker for PermissionInvoker {
    async fn invoke(&self, ctx: &mut Context) -> Result<(), ServeError> {
        if ctx.endpoint().authorize {
            self.verifier.verify(ctx).await?;
        }
        self.next.invoke(ctx).await
    }
}

#[derive(Clone, Copy)]
struct Decision {
    allowed: bool,
    expires_at: Instant,
}

struct PermissionVerifier {
    provider: Arc<dyn PermissionProvider>,
    expiration: Duration,
    cache: DashMap<String, Decision>,
}

impl PermissionVerifier {
    async fn verify(&self, ctx: &Context) -> Result<(), InvokeError> {
        let subject = match ctx.attribute(ATTR_JWT_SUBJECT) {
            Some(Value::String(subject)) => subject.clone(),
            Some(subject) => subject.to_string(),
            None => return Err(subject_not_found()),
        };
        let endpoint = ctx.endpoint();
        let method = endpoint.http_method.as_str();
        let pattern = endpoint.http_pattern.as_str();

        let key = format!("{subject}@{method}#{pattern}");
        let allowed = match self.cached(&key) {
            Some(allowed) => allowed,
            None => {
                let allowed = self.provider.verify(&subject, method, pattern).await.map_err(|e| {
                    warn!(request_id = ctx.request_id(), key = %key, cause = %e, "load permission failed");
                    InvokeError::new(StatusCode::INTERNAL_SERVER_ERROR, ERROR_CODE_GATEWAY_INTERNAL, "PERMISSION:LOAD_ACCESS")
                        .with_cause(e)
                })?;
                self.store(key, allowed);
                allowed
            }
        };

        if allowed {
            Ok(())
        } else {
            debug!(request_id = ctx.request_id(), subject = %subject, method, pattern, "permission denied");
            Err(InvokeError::new(StatusCode::FORBIDDEN, ERROR_CODE_PERMISSION_DENIED, "PERMISSION:SUBJECT_ACCESS_DENIED"))
        }
    }

    fn cached(&self, key: &str) -> Option<bool> {
        let now = Instant::now();
        let decision = *self.cache.get(key)?;
        if decision.expires_at > now {
            return Some(decision.allowed);
        }
        // a concurrent insert may have refreshed the entry since the read
        self.cache.remove_if(key, |_, decision| decision.expires_at <= now);
        None
    }

    fn store(&self, key: String, allowed: bool) {
        let now = Instant::now();
        self.cache.insert(key, Decision { allowed, expires_at: now + self.expiration });
        if self.cache.len() > CACHE_SWEEP_THRESHOLD {
            self.cache.retain(|_, decision| decision.expires_at > now);
            debug!(entries = self.cache.len(), "swept expired permission decisions");
        }
    }
}

fn subject_not_found() -> InvokeError {
    InvokeError::new(StatusCode::BAD_REQUEST, ERROR_CODE_PERMISSION_DENIED, "PERMISSION:SUBJECT_NOT_FOUND")
}

/// Asks a backend service for the decision.
///
/// The service receives the `subjectId`, `method` and `pattern` string arguments. The subject is
/// allowed when the text of the answer contains `success`.
pub struct ExchangePermissionProvider {
    backends: Arc<BackendRegistry>,
    endpoint: Arc<Endpoint>,
}

impl ExchangePermissionProvider {
    pub fn new(backends: Arc<BackendRegistry>, config: &VerificationConfig) -> Self {
        info!(
            protocol = %config.protocol,
            host = %config.host,
            uri = %config.uri,
            method = %config.method,
            "permission verification by backend service"
        );
        let service = BackendService::new(&config.protocol, &config.host, &config.uri)
            .with_method(&config.method)
            .with_argument(Argument::new("subjectId", JAVA_LANG_STRING, MimeValue::text("")))
            .with_argument(Argument::new("method", JAVA_LANG_STRING, MimeValue::text("")))
            .with_argument(Argument::new("pattern", JAVA_LANG_STRING, MimeValue::text("")));
        let endpoint = Endpoint::new(Method::POST, &config.uri, service);
        Self { backends, endpoint: Arc::new(endpoint) }
    }
}

#[async_trait]
impl PermissionProvider for ExchangePermissionProvider {
    async fn verify(&self, subject_id: &str, method: &str, pattern: &str) -> Result<bool, BoxError> {
        let mut ctx = Context::new(format!("permission:{subject_id}"), Arc::clone(&self.endpoint));
        let arguments = [("subjectId", subject_id), ("method", method), ("pattern", pattern)]
            .into_iter()
            .map(|(name, value)| ResolvedArgument {
                name: name.to_owned(),
                type_class: JAVA_LANG_STRING.to_owned(),
                value: TypedValue::String(value.to_owned()),
            })
            .collect();
        ctx.set_arguments(arguments);

        let response = self.backends.dispatch(&self.endpoint.service, &mut ctx).await?;
        let text = cast_decode_to_string(response.body)?;
        Ok(text.contains("success"))
    }
}

impl fmt::Debug for ExchangePermissionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangePermissionProvider").field("service", &self.endpoint.service).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, BackendResponse};
    use crate::error::StateError;
    use crate::filter::tests::{Trace, terminal};
    use mockall::predicate::eq;
    use std::error::Error;

    fn context(authorize: bool, subject: Option<&str>) -> Context {
        let endpoint = Endpoint::new(Method::GET, "/orders/{id}", BackendService::new("echo", "local", "/orders"))
            .with_authorize(authorize);
        let mut ctx = Context::new("test", Arc::new(endpoint));
        if let Some(subject) = subject {
            ctx.set_attribute(ATTR_JWT_SUBJECT, subject);
        }
        ctx
    }

    fn chain(provider: MockPermissionProvider, trace: &Trace) -> FilterHandler {
        PermissionFilter::new(&PermissionConfig::default(), provider).invoke(terminal(trace))
    }

    #[tokio::test]
    async fn unauthorized_endpoint_skips_verification() {
        let mut provider = MockPermissionProvider::new();
        provider.expect_verify().never();
        let trace = Trace::default();

        chain(provider, &trace).invoke(&mut context(false, None)).await.unwrap();

        assert_eq!(*trace.lock().unwrap(), vec!["T"]);
    }

    #[tokio::test]
    async fn missing_subject() {
        let mut provider = MockPermissionProvider::new();
        provider.expect_verify().never();
        let trace = Trace::default();

        let err = chain(provider, &trace).invoke(&mut context(true, None)).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "PERMISSION:SUBJECT_NOT_FOUND");
        assert!(trace.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn allowed_decision_is_cached() {
        let mut provider = MockPermissionProvider::new();
        provider
            .expect_verify()
            .with(eq("alice"), eq("GET"), eq("/orders/{id}"))
            .times(1)
            .returning(|_, _, _| Ok(true));
        let trace = Trace::default();
        let chain = chain(provider, &trace);

        chain.invoke(&mut context(true, Some("alice"))).await.unwrap();
        chain.invoke(&mut context(true, Some("alice"))).await.unwrap();

        assert_eq!(*trace.lock().unwrap(), vec!["T", "T"]);
    }

    #[tokio::test]
    async fn denied() {
        let mut provider = MockPermissionProvider::new();
        provider.expect_verify().returning(|_, _, _| Ok(false));
        let trace = Trace::default();

        let err = chain(provider, &trace).invoke(&mut context(true, Some("bob"))).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "PERMISSION:SUBJECT_ACCESS_DENIED");
        assert!(trace.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure() {
        let mut provider = MockPermissionProvider::new();
        provider.expect_verify().returning(|_, _, _| Err("auth service down".into()));
        let trace = Trace::default();

        let err = chain(provider, &trace).invoke(&mut context(true, Some("bob"))).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "PERMISSION:LOAD_ACCESS");
        let ServeError::Invoke(err) = err else { panic!("expected an invoke error") };
        assert_eq!(err.source().unwrap().to_string(), "auth service down");
    }

    #[tokio::test]
    async fn disabled_filter_returns_next() {
        let mut provider = MockPermissionProvider::new();
        provider.expect_verify().never();
        let config = PermissionConfig { disabled: true, ..PermissionConfig::default() };
        let trace = Trace::default();
        let next = terminal(&trace);

        let handler = PermissionFilter::new(&config, provider).invoke(Arc::clone(&next));

        assert!(Arc::ptr_eq(&handler, &next));
    }

    #[tokio::test]
    async fn expired_decisions_are_swept() {
        let mut provider = MockPermissionProvider::new();
        provider.expect_verify().returning(|_, _, _| Ok(true));
        let config = PermissionConfig { cache_expiration_minutes: 0, ..PermissionConfig::default() };
        let filter = PermissionFilter::new(&config, provider);
        let chain = filter.invoke(terminal(&Trace::default()));

        for i in 0..3 * CACHE_SWEEP_THRESHOLD {
            let subject = format!("user-{i}");
            chain.invoke(&mut context(true, Some(&subject))).await.unwrap();
        }

        assert!(filter.verifier.cache.len() <= CACHE_SWEEP_THRESHOLD);
    }

    #[test]
    fn expired_lookup_keeps_a_refreshed_decision() {
        let verifier = PermissionVerifier {
            provider: Arc::new(MockPermissionProvider::new()),
            expiration: Duration::from_secs(60),
            cache: DashMap::new(),
        };
        let stale = Decision { allowed: false, expires_at: Instant::now() };
        verifier.cache.insert("k".into(), stale);

        assert_eq!(verifier.cached("k"), None);
        assert!(verifier.cache.is_empty());

        verifier.store("k".into(), true);
        assert_eq!(verifier.cached("k"), Some(true));
    }

    struct VerificationBackend;

    #[async_trait]
    impl Backend for VerificationBackend {
        async fn invoke(&self, service: &BackendService, ctx: &mut Context) -> Result<BackendResponse, StateError> {
            assert_eq!(service.uri, "/permissions/verify");
            let subject = ctx.argument("subjectId").and_then(|argument| argument.value.as_str()).unwrap_or_default();
            let answer = if subject == "alice" { r#"{"status":"success"}"# } else { r#"{"status":"failed"}"# };
            Ok(BackendResponse::new(MimeValue::json(answer)))
        }
    }

    #[tokio::test]
    async fn exchange_provider() {
        let backends = Arc::new(BackendRegistry::builder().register_backend("http", VerificationBackend).build());
        let config = VerificationConfig {
            protocol: "http".into(),
            host: "auth.internal".into(),
            uri: "/permissions/verify".into(),
            method: "POST".into(),
        };
        let provider = ExchangePermissionProvider::new(backends, &config);

        assert!(provider.verify("alice", "GET", "/orders").await.unwrap());
        assert!(!provider.verify("bob", "GET", "/orders").await.unwrap());
    }

    #[tokio::test]
    async fn exchange_provider_unknown_protocol() {
        let backends = Arc::new(BackendRegistry::builder().build());
        let config = VerificationConfig { protocol: "smtp".into(), ..VerificationConfig::default() };
        let provider = ExchangePermissionProvider::new(backends, &config);

        let err = provider.verify("alice", "GET", "/orders").await.unwrap_err();
        assert!(err.to_string().contains("GATEWAY:UNKNOWN_PROTOCOL"));
    }
}
