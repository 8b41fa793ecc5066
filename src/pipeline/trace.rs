//! Trace recording.
//!
//! One entry per executed step, in execution order, surfaced to the client
//! as repeated `X-Okapi-Trace` headers:
//!
//! ```text
//! X-Okapi-Trace: GET mod-auth-1.0.0:202 412us
//! X-Okapi-Trace: GET mod-users-1.2.0:200 1893us
//! ```

use std::fmt;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;

use crate::http::X_OKAPI_TRACE;
use crate::registry::ModuleId;

/// The outcome of one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub method: Method,
    pub module: ModuleId,
    pub status: StatusCode,
    pub elapsed: Duration,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} {}us",
            self.method,
            self.module,
            self.status.as_u16(),
            self.elapsed.as_micros()
        )
    }
}

/// Ordered trace of one request. Entries are never reordered or merged.
#[derive(Debug, Default, Clone)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, method: Method, module: ModuleId, status: StatusCode, elapsed: Duration) {
        crate::observability::metrics::record_module_call(module.as_str(), status.as_u16(), elapsed);
        self.entries.push(TraceEntry {
            method,
            module,
            status,
            elapsed,
        });
    }

    /// Append one header per entry, keeping any existing trace values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for entry in &self.entries {
            if let Ok(value) = HeaderValue::from_str(&entry.to_string()) {
                headers.append(X_OKAPI_TRACE, value);
            }
        }
    }

    /// Attach the trace to a finished response.
    pub fn finish(&self, mut response: Response) -> Response {
        self.apply(response.headers_mut());
        response
    }
}
