//! Multi-tenant API gateway library.
//!
//! Requests carrying `X-Okapi-Tenant` are routed through an ordered pipeline
//! of the modules enabled for that tenant; see [`pipeline`] for how each
//! step is forwarded.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod routing;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use registry::Registry;
