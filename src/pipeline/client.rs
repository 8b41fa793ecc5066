//! Outbound HTTP client for module calls.

use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, Response, Uri},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::error::{GatewayError, GatewayResult};

/// Non-blocking client used for every module hop.
///
/// Dropping a pending `send` future aborts the outbound call, which is how a
/// client disconnect cancels the in-flight module request.
#[derive(Clone)]
pub struct ModuleClient {
    inner: Client<HttpConnector, Body>,
}

impl ModuleClient {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let inner = Client::builder(TokioExecutor::new()).build(connector);
        Self { inner }
    }

    /// Send one request to a module and wait for its response head.
    pub async fn send(
        &self,
        location: &Url,
        method: Method,
        path_and_query: &str,
        headers: HeaderMap,
        body: Body,
    ) -> GatewayResult<Response<Incoming>> {
        let uri = module_uri(location, path_and_query)?;

        let mut request = Request::new(body);
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;

        self.inner
            .request(request)
            .await
            .map_err(|e| GatewayError::ModuleUnreachable {
                url: location.clone(),
                reason: error_chain(&e),
            })
    }
}

/// Join a module base URL with the request path.
fn module_uri(location: &Url, path_and_query: &str) -> GatewayResult<Uri> {
    let base = location.as_str().trim_end_matches('/');
    format!("{base}{path_and_query}")
        .parse()
        .map_err(|e: axum::http::uri::InvalidUri| GatewayError::ModuleUnreachable {
            url: location.clone(),
            reason: e.to_string(),
        })
}

// The legacy client reports "client error (Connect)" at the top level; the
// useful detail lives in the source chain.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_uri() {
        let base = Url::parse("http://127.0.0.1:9131").unwrap();
        let uri = module_uri(&base, "/users?limit=10").unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:9131/users?limit=10");

        let prefixed = Url::parse("http://modules.local/mod-users/").unwrap();
        let uri = module_uri(&prefixed, "/users").unwrap();
        assert_eq!(uri.to_string(), "http://modules.local/mod-users/users");
    }

    #[tokio::test]
    async fn test_refused_connection_names_location() {
        // Bind then drop to obtain a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ModuleClient::new(Duration::from_secs(1));
        let location = Url::parse(&format!("http://{addr}")).unwrap();
        let err = client
            .send(&location, Method::GET, "/", HeaderMap::new(), Body::empty())
            .await
            .unwrap_err();

        assert!(matches!(&err, GatewayError::ModuleUnreachable { url, .. } if url == &location));
        assert!(err.to_string().starts_with(&format!("connect url {location}")));
    }
}
