//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Check the tenant, resolve the pipeline, hand it to the executor
//! - Apply config reloads to the registry while serving

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::request::{OkapiRequestId, RequestContext, X_OKAPI_REQUEST_ID};
use crate::lifecycle::shutdown_signal;
use crate::observability::metrics;
use crate::pipeline::{body, Pipeline};
use crate::registry::{Registry, TenantRegistry};
use crate::routing::RouteResolver;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub resolver: RouteResolver,
    pub pipeline: Arc<Pipeline>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    registry: Arc<Registry>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let registry = Arc::new(Registry::from_config(&config));
        Self::with_registry(config, registry)
    }

    /// Create a server over an existing registry.
    pub fn with_registry(config: GatewayConfig, registry: Arc<Registry>) -> Self {
        let resolver = RouteResolver::new(registry.clone(), registry.clone());
        let state = AppState {
            registry: registry.clone(),
            resolver,
            pipeline: Arc::new(Pipeline::from_config(&config)),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            registry,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/_/proxy/health", get(health_handler))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_OKAPI_REQUEST_ID, OkapiRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_OKAPI_REQUEST_ID))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configurations received on `config_updates` replace the registry
    /// contents. The server stops on `shutdown` or on SIGINT/SIGTERM and lets
    /// in-flight requests finish.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            modules = self.config.modules.len(),
            tenants = self.config.tenants.len(),
            "HTTP server starting"
        );

        let registry = self.registry.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) => registry.reload(&config),
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.recv() => tracing::info!("Shutdown requested"),
                    _ = shutdown_signal() => {},
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}

/// Main gateway handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = dispatch(&state, request).await;

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

async fn dispatch(state: &AppState, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    let ctx = match RequestContext::from_parts(&parts) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::debug!(path = %parts.uri.path(), error = %e, "Rejecting request");
            return reject(e, body).await;
        }
    };

    if !state.registry.exists(&ctx.tenant) {
        tracing::debug!(request_id = %ctx.request_id, tenant = %ctx.tenant, "Unknown tenant");
        return reject(GatewayError::UnknownTenant(ctx.tenant), body).await;
    }

    tracing::debug!(
        request_id = %ctx.request_id,
        tenant = %ctx.tenant,
        method = %ctx.method,
        path = %ctx.path,
        "Resolving pipeline"
    );

    let steps = match state
        .resolver
        .resolve(&ctx.method, &ctx.path, &ctx.tenant, ctx.module_hint.as_ref())
    {
        Ok(steps) => steps,
        Err(e) => {
            tracing::warn!(request_id = %ctx.request_id, tenant = %ctx.tenant, error = %e, "Route resolution failed");
            return reject(e, body).await;
        }
    };

    state.pipeline.execute(steps, &ctx, &parts.headers, body).await
}

/// Answer with an error once the unread client body is drained.
async fn reject(error: GatewayError, request_body: Body) -> Response {
    body::drain(request_body).await;
    error.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use bytes::Bytes;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn state(toml: &str) -> AppState {
        let config = parse_config(toml).unwrap();
        let registry = Arc::new(Registry::from_config(&config));
        AppState {
            resolver: RouteResolver::new(registry.clone(), registry.clone()),
            pipeline: Arc::new(Pipeline::from_config(&config)),
            registry,
        }
    }

    // A body that flags when its last chunk has been read.
    fn tracked_body(done: Arc<AtomicBool>) -> Body {
        let chunks = futures_util::stream::iter(0..3).map(move |i| {
            if i == 2 {
                done.store(true, Ordering::SeqCst);
            }
            Ok::<_, std::io::Error>(Bytes::from_static(b"chunk"))
        });
        Body::from_stream(chunks)
    }

    #[tokio::test]
    async fn test_rejections_drain_request_body() {
        // mod-a is enabled for t1 but has no deployment.
        let state = state(
            r#"
[[modules]]
id = "mod-a-1.0.0"
[[modules.provides]]
id = "notes"
version = "1.0"
[[modules.provides.handlers]]
methods = ["POST"]
path = "/notes"
level = "50"
type = "request-response"

[[tenants]]
id = "t1"
modules = ["mod-a-1.0.0"]
"#,
        );

        let cases = [
            (None, StatusCode::FORBIDDEN),
            (Some("unknown"), StatusCode::BAD_REQUEST),
            (Some("t1"), StatusCode::NOT_FOUND),
        ];
        for (tenant, expected) in cases {
            let done = Arc::new(AtomicBool::new(false));
            let mut builder = Request::builder().method("POST").uri("/notes");
            if let Some(tenant) = tenant {
                builder = builder.header("x-okapi-tenant", tenant);
            }
            let request = builder.body(tracked_body(done.clone())).unwrap();

            let response = dispatch(&state, request).await;
            assert_eq!(response.status(), expected);
            assert!(done.load(Ordering::SeqCst), "body left unread for {tenant:?}");
        }
    }
}
