//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a request ID (`X-Okapi-Request-Id`) when the client sent none
//! - Extract routing-relevant information (tenant, module override, path)
//! - Prepare the header set forwarded to modules
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Tenant checks happen before any module is invoked
//! - Hop-by-hop headers and `Host` never reach a module

use axum::http::{
    header::{self, HeaderName},
    request::Parts,
    HeaderMap, HeaderValue, Method, Request,
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::registry::ModuleId;

pub const X_OKAPI_TENANT: HeaderName = HeaderName::from_static("x-okapi-tenant");
pub const X_OKAPI_REQUEST_ID: HeaderName = HeaderName::from_static("x-okapi-request-id");
pub const X_OKAPI_URL: HeaderName = HeaderName::from_static("x-okapi-url");
pub const X_OKAPI_MODULE_ID: HeaderName = HeaderName::from_static("x-okapi-module-id");
pub const X_OKAPI_TRACE: HeaderName = HeaderName::from_static("x-okapi-trace");
pub const X_OKAPI_STOP: HeaderName = HeaderName::from_static("x-okapi-stop");

/// Headers that describe one connection and must not be forwarded.
pub const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

/// Generates request ids of the form `<8 hex>/<first path segment>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OkapiRequestId;

impl MakeRequestId for OkapiRequestId {
    fn make_request_id<B>(&mut self, request: &Request<B>) -> Option<RequestId> {
        let segment = request
            .uri()
            .path()
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default();
        let token = Uuid::new_v4().simple().to_string();
        let id = format!("{}/{}", &token[..8], segment);
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Routing-relevant facts about one inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub tenant: String,
    pub request_id: String,
    pub module_hint: Option<ModuleId>,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
}

impl RequestContext {
    /// Extract the context, rejecting requests without a usable tenant.
    pub fn from_parts(parts: &Parts) -> GatewayResult<Self> {
        let tenant = match parts.headers.get(X_OKAPI_TENANT) {
            None => return Err(GatewayError::MissingTenant),
            Some(value) => value
                .to_str()
                .map_err(|_| GatewayError::InvalidHeader("X-Okapi-Tenant"))?
                .trim()
                .to_string(),
        };
        if tenant.is_empty() {
            return Err(GatewayError::MissingTenant);
        }

        let module_hint = match parts.headers.get(X_OKAPI_MODULE_ID) {
            None => None,
            Some(value) => Some(ModuleId::new(
                value
                    .to_str()
                    .map_err(|_| GatewayError::InvalidHeader("X-Okapi-Module-Id"))?
                    .trim(),
            )),
        };

        let request_id = parts
            .headers
            .get(X_OKAPI_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            tenant,
            request_id,
            module_hint,
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
        })
    }

    /// Path plus query string for a module call on `path`.
    pub fn path_and_query(&self, path: &str) -> String {
        match &self.query {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }
}

/// Header set forwarded to the first module.
pub fn forward_headers(
    inbound: &HeaderMap,
    request_id: &str,
    public_url: Option<&HeaderValue>,
) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    if let Some(url) = public_url {
        headers.insert(X_OKAPI_URL, url.clone());
    }
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(X_OKAPI_REQUEST_ID, value);
    }
    headers
}

pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove(header::UPGRADE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(Body::empty()).unwrap().into_parts().0
    }

    #[test]
    fn test_missing_tenant() {
        let err = RequestContext::from_parts(&parts(Request::builder().uri("/foo"))).unwrap_err();
        assert!(matches!(err, GatewayError::MissingTenant));

        let blank = parts(Request::builder().uri("/foo").header("X-Okapi-Tenant", "  "));
        assert!(matches!(RequestContext::from_parts(&blank), Err(GatewayError::MissingTenant)));
    }

    #[test]
    fn test_context_fields() {
        let ctx = RequestContext::from_parts(&parts(
            Request::builder()
                .method("POST")
                .uri("/notes/1?full=true")
                .header("X-Okapi-Tenant", "t1")
                .header("X-Okapi-Module-Id", "mod-b-1.0.0")
                .header("X-Okapi-Request-Id", "abc/notes"),
        ))
        .unwrap();

        assert_eq!(ctx.tenant, "t1");
        assert_eq!(ctx.method, Method::POST);
        assert_eq!(ctx.path, "/notes/1");
        assert_eq!(ctx.module_hint, Some(ModuleId::new("mod-b-1.0.0")));
        assert_eq!(ctx.request_id, "abc/notes");
        assert_eq!(ctx.path_and_query("/other"), "/other?full=true");
    }

    #[test]
    fn test_forward_headers() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("gateway:9130"));
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        inbound.insert(X_OKAPI_TENANT, HeaderValue::from_static("t1"));
        inbound.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let public_url = HeaderValue::from_static("http://gateway:9130");
        let headers = forward_headers(&inbound, "abc/foo", Some(&public_url));

        assert!(headers.get(header::HOST).is_none());
        assert!(headers.get(header::CONNECTION).is_none());
        assert_eq!(headers[X_OKAPI_TENANT], "t1");
        assert_eq!(headers[X_OKAPI_URL], "http://gateway:9130");
        assert_eq!(headers[X_OKAPI_REQUEST_ID], "abc/foo");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_request_id_format() {
        let request = Request::builder().uri("/users/1").body(()).unwrap();
        let id = OkapiRequestId.make_request_id(&request).unwrap();
        let value = id.header_value().to_str().unwrap();
        let (token, segment) = value.split_once('/').unwrap();
        assert_eq!(token.len(), 8);
        assert_eq!(segment, "users");
    }
}
