//! Tenant registry and module directory.
//!
//! # Data Flow
//! ```text
//! GatewayConfig (modules, tenants, deployments)
//!     → store.rs builds an immutable RegistrySnapshot
//!     → ArcSwap publishes it to every request
//!
//! Per request (read-only):
//!     TenantRegistry::exists / enabled_modules
//!     ModuleDirectory::lookup → compiled routes + base URL
//! ```
//!
//! # Design Decisions
//! - Requests only see the read-only traits below
//! - Descriptor/tenant updates replace the whole snapshot atomically
//! - Module locations live in a concurrent map so deployments can change
//!   without rebuilding descriptors

pub mod descriptor;
pub mod store;
pub mod tenant;

use std::sync::Arc;

use url::Url;

use crate::routing::router::ModuleRoutes;

pub use descriptor::{
    InterfaceDescriptor, InterfaceType, ModuleDescriptor, ModuleId, Phase, RoutingEntry,
    RoutingType, LEVEL_WIDTH,
};
pub use store::{Registry, RegistrySnapshot};
pub use tenant::Tenant;

/// Read-only view of tenants.
pub trait TenantRegistry: Send + Sync {
    fn exists(&self, tenant: &str) -> bool;

    fn is_enabled(&self, tenant: &str, module: &ModuleId) -> bool;

    /// Enabled modules in enablement order; empty for unknown tenants.
    fn enabled_modules(&self, tenant: &str) -> Vec<ModuleId>;
}

/// Result of a directory lookup.
#[derive(Debug, Clone)]
pub struct ModuleLookup {
    pub routes: Arc<ModuleRoutes>,
    /// Where the module currently runs; `None` when it is not deployed.
    pub base_url: Option<Url>,
}

/// Read-only view of module descriptors and their locations.
///
/// Lookups never perform I/O: they are consulted during route resolution,
/// before any request is forwarded.
pub trait ModuleDirectory: Send + Sync {
    fn lookup(&self, module: &ModuleId) -> Option<ModuleLookup>;
}
