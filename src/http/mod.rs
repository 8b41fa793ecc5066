//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, timeout, tracing layers)
//!     → request.rs (tenant extraction, forwarded header set)
//!     → [routing resolves the module pipeline]
//!     → [pipeline forwards step by step]
//!     → response.rs (relay module responses)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{
    OkapiRequestId, RequestContext, X_OKAPI_MODULE_ID, X_OKAPI_REQUEST_ID, X_OKAPI_STOP,
    X_OKAPI_TENANT, X_OKAPI_TRACE, X_OKAPI_URL,
};
pub use server::HttpServer;
