//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay a module response (status, headers, body) to the client
//! - Relay a module's status/headers with a substituted body
//! - Copy `X-Okapi-*` response headers into the request of the next step
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped automatically
//! - Trace headers are added by the pipeline afterwards, never here

use axum::{
    body::Body,
    http::{header, HeaderMap, Response as HttpResponse},
    response::Response,
};
use hyper::body::Incoming;

use crate::http::request::{strip_hop_by_hop, X_OKAPI_STOP, X_OKAPI_TRACE};

/// Relay a module response verbatim, streaming its body.
pub fn relay(response: HttpResponse<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

/// Relay a module's status and headers, answering with `body` instead of
/// the module's own body.
pub fn relay_with_body(response: HttpResponse<Incoming>, body: Body) -> Response {
    let (mut parts, module_body) = response.into_parts();
    drop(module_body);
    strip_hop_by_hop(&mut parts.headers);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, body)
}

/// True when the module asked the gateway to skip the remaining steps.
pub fn stop_requested(headers: &HeaderMap) -> bool {
    headers.contains_key(X_OKAPI_STOP)
}

/// Copy a module's `x-okapi-*` response headers into the request headers
/// for the following steps. Trace and stop markers stay behind.
pub fn relay_okapi_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from {
        if *name == X_OKAPI_TRACE || *name == X_OKAPI_STOP {
            continue;
        }
        if name.as_str().starts_with("x-okapi-") {
            to.insert(name.clone(), value.clone());
        }
    }
}
