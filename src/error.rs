//! Gateway error taxonomy.
//!
//! Every variant maps to exactly one client-visible status and a plain-text
//! reason. Downstream application errors (a module answering non-2xx) are
//! not errors here: they are relayed verbatim by the pipeline.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use url::Url;

use crate::registry::ModuleId;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing Tenant")]
    MissingTenant,

    #[error("No such Tenant {0}")]
    UnknownTenant(String),

    #[error("Invalid header {0}")]
    InvalidHeader(&'static str),

    #[error("No suitable module found for path {path} for tenant {tenant}")]
    NoRoute { path: String, tenant: String },

    #[error("No running module instance found for {0}")]
    ModuleNotDeployed(ModuleId),

    #[error("connect url {url}: {reason}")]
    ModuleUnreachable { url: Url, reason: String },

    #[error("Unsupported routing type {kind} for module {module} on path {path}")]
    UnsupportedRoutingType {
        kind: String,
        module: ModuleId,
        path: String,
    },

    #[error("Redirect loop: {path}")]
    RedirectLoop { path: String },

    #[error("Redirecting {from} to {to} FAILED. No suitable module found")]
    RedirectFailed { from: String, to: String },

    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("Failed to read request body: {0}")]
    Body(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingTenant => StatusCode::FORBIDDEN,
            GatewayError::UnknownTenant(_) | GatewayError::InvalidHeader(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::NoRoute { .. } | GatewayError::ModuleNotDeployed(_) => {
                StatusCode::NOT_FOUND
            }
            GatewayError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::ModuleUnreachable { .. }
            | GatewayError::UnsupportedRoutingType { .. }
            | GatewayError::RedirectLoop { .. }
            | GatewayError::RedirectFailed { .. }
            | GatewayError::Body(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_input_errors() {
        assert_eq!(GatewayError::MissingTenant.status(), StatusCode::FORBIDDEN);
        assert_eq!(GatewayError::MissingTenant.to_string(), "Missing Tenant");

        let unknown = GatewayError::UnknownTenant("unknown".into());
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
        assert_eq!(unknown.to_string(), "No such Tenant unknown");
    }

    #[test]
    fn test_unreachable_names_location() {
        let err = GatewayError::ModuleUnreachable {
            url: Url::parse("http://127.0.0.1:9131").unwrap(),
            reason: "connection refused".into(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("http://127.0.0.1:9131/"));
    }
}
