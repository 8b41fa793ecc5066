//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use okapi_gateway::config::{parse_config, GatewayConfig};
use okapi_gateway::lifecycle::Shutdown;
use okapi_gateway::HttpServer;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// One request as seen by a mock module.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// What a mock module answers.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Option<String>,
}

impl Reply {
    /// 200 echoing the request body.
    pub fn echo() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn status(code: u16) -> Self {
        Self {
            status: StatusCode::from_u16(code).unwrap(),
            headers: Vec::new(),
            body: Some(String::new()),
        }
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers
            .push((HeaderName::from_static(name), HeaderValue::from_str(value).unwrap()));
        self
    }
}

type Behavior = dyn Fn(&Recorded) -> Reply + Send + Sync;

#[derive(Clone)]
struct MockState {
    behavior: Arc<Behavior>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

/// A module instance on an ephemeral port that records every request.
pub struct MockModule {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockModule {
    pub async fn start<F>(behavior: F) -> Self
    where
        F: Fn(&Recorded) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            behavior: Arc::new(behavior),
            requests: requests.clone(),
        };

        let app = Router::new().fallback(mock_handler).with_state(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, requests }
    }

    /// A module that always answers `reply`.
    pub async fn replying(reply: Reply) -> Self {
        Self::start(move |_| reply.clone()).await
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn mock_handler(State(state): State<MockState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let recorded = Recorded {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    };

    let reply = (state.behavior)(&recorded);
    let body = reply
        .body
        .unwrap_or_else(|| String::from_utf8_lossy(&recorded.body).into_owned());
    state.requests.lock().unwrap().push(recorded);

    let mut response = (reply.status, body).into_response();
    for (name, value) in reply.headers {
        response.headers_mut().append(name, value);
    }
    response
}

/// A running gateway bound to an ephemeral port.
pub struct Gateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<GatewayConfig>,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_gateway(config: GatewayConfig) -> Gateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    Gateway {
        addr,
        shutdown,
        config_updates: config_tx,
    }
}

/// Parse a TOML configuration, panicking on invalid input.
pub fn config(toml: &str) -> GatewayConfig {
    parse_config(toml).unwrap()
}

/// A handler-providing module declaration.
pub fn module(id: &str, path: &str, level: &str, kind: &str) -> String {
    format!(
        r#"
[[modules]]
id = "{id}"
[[modules.provides]]
id = "{id}-api"
version = "1.0"
[[modules.provides.handlers]]
methods = ["*"]
path = "{path}"
level = "{level}"
type = "{kind}"
"#
    )
}

/// A filter-only module declaration.
pub fn filter(id: &str, path: &str, phase: &str, kind: &str) -> String {
    format!(
        r#"
[[modules]]
id = "{id}"
[[modules.filters]]
methods = ["*"]
path = "{path}"
phase = "{phase}"
type = "{kind}"
"#
    )
}

pub fn deployment(id: &str, url: &str) -> String {
    format!(
        r#"
[[deployments]]
module_id = "{id}"
url = "{url}"
"#
    )
}

pub fn tenant(id: &str, modules: &[&str]) -> String {
    let modules = modules
        .iter()
        .map(|m| format!("\"{m}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
[[tenants]]
id = "{id}"
modules = [{modules}]
"#
    )
}

/// All `X-Okapi-Trace` values of a response, in order.
pub fn traces(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("x-okapi-trace")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
