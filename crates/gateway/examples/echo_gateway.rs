use futures::FutureExt;
use http::Method;
use micro_gateway::backend::{BackendRegistry, EchoBackend, PROTOCOL_ECHO};
use micro_gateway::config::GatewayConfig;
use micro_gateway::filter::{
    ExchangePermissionProvider, Filter, FilterHandler, FilterRegistry, PERMISSION_VERIFICATION, PermissionFilter,
    invoker_fn,
};
use micro_gateway::{Argument, BackendService, Context, Endpoint, Pipeline};
use micro_value::{MimeValue, ValueResolvers};
use std::error::Error;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

const DEFAULT_CONFIG: &str = r#"
[logging]
level = "debug"

[echo]
enabled = true
"#;

/// Logs the elapsed time of every request.
struct AccessLogFilter;

impl Filter for AccessLogFilter {
    fn filter_id(&self) -> &str {
        "AccessLog"
    }

    fn order(&self) -> i32 {
        -100
    }

    fn invoke(&self, next: FilterHandler) -> FilterHandler {
        invoker_fn(move |ctx| {
            let next = Arc::clone(&next);
            async move {
                let start = Instant::now();
                let result = next.invoke(ctx).await;
                info!(
                    request_id = ctx.request_id(),
                    pattern = %ctx.endpoint().http_pattern,
                    elapsed = ?start.elapsed(),
                    success = result.is_ok(),
                    "request served"
                );
                result
            }
            .boxed()
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = match std::env::args().nth(1) {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::from_toml_str(DEFAULT_CONFIG)?,
    };
    micro_gateway::logging::init(&config.logging)?;

    let mut backends = BackendRegistry::builder().default_decoders();
    if config.echo.enabled {
        backends = backends.register_backend(PROTOCOL_ECHO, EchoBackend);
    }
    let backends = Arc::new(backends.build());

    let mut filters = FilterRegistry::builder().register_global(AccessLogFilter);
    let mut route_filters = vec![];
    if let Some(verification) = &config.permission.verification {
        let provider = ExchangePermissionProvider::new(Arc::clone(&backends), verification);
        filters = filters.register_selective(PermissionFilter::new(&config.permission, provider));
        route_filters.push(PERMISSION_VERIFICATION);
    }

    let resolvers = ValueResolvers::builder().builtins().build();
    let pipeline = Pipeline::new(Arc::new(filters.build()), backends, Arc::new(resolvers));
    info!(?pipeline, "pipeline ready");

    let service = BackendService::new(PROTOCOL_ECHO, "local", "/users/search")
        .with_method("search")
        .with_argument(Argument::new("page", "int", MimeValue::text("2")))
        .with_argument(Argument::new("filter", "java.util.Map", MimeValue::form("tag=rust&tag=http&owner=me")))
        .with_argument(Argument::new("ids", "java.util.List", MimeValue::text("7")).with_generic_types(["long"]));
    let endpoint = Endpoint::new(Method::GET, "/users/search", service).with_filters(route_filters);

    let mut ctx = Context::new("demo-1", Arc::new(endpoint));
    ctx.set_attribute(micro_gateway::ATTR_JWT_SUBJECT, "demo");

    match pipeline.serve(&mut ctx).await {
        Ok(()) => {
            let response = ctx.response();
            info!(status = %response.status(), headers = ?response.headers(), "backend responded");
            let body = ctx.response().body().clone().into_bytes()?;
            println!("{}", String::from_utf8_lossy(&body));
        }
        Err(e) => error!(status = %e.status(), code = e.error_code(), cause = %e, "request failed"),
    }

    Ok(())
}
