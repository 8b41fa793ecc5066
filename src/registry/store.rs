//! In-memory registry backed by an atomically swapped snapshot.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use url::Url;

use crate::config::GatewayConfig;
use crate::registry::{
    ModuleDescriptor, ModuleDirectory, ModuleId, ModuleLookup, Tenant, TenantRegistry,
};
use crate::routing::router::ModuleRoutes;

/// Immutable view of descriptors and tenants.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    tenants: HashMap<String, Tenant>,
    modules: HashMap<ModuleId, Arc<ModuleRoutes>>,
}

impl RegistrySnapshot {
    pub fn new(
        descriptors: impl IntoIterator<Item = ModuleDescriptor>,
        tenants: impl IntoIterator<Item = Tenant>,
    ) -> Self {
        let modules = descriptors
            .into_iter()
            .map(|d| (d.id.clone(), Arc::new(ModuleRoutes::new(d))))
            .collect();
        let tenants = tenants.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self { tenants, modules }
    }

    pub fn tenant(&self, id: &str) -> Option<&Tenant> {
        self.tenants.get(id)
    }

    pub fn module(&self, id: &ModuleId) -> Option<&Arc<ModuleRoutes>> {
        self.modules.get(id)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }
}

/// Shared tenant registry and module directory.
///
/// Readers load the current snapshot without locking; updates publish a new
/// snapshot in one atomic swap. Module locations are kept separately so the
/// deployment side can move a module without touching descriptors.
#[derive(Debug, Default)]
pub struct Registry {
    snapshot: ArcSwap<RegistrySnapshot>,
    locations: DashMap<ModuleId, Url>,
}

impl Registry {
    pub fn new(snapshot: RegistrySnapshot) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            locations: DashMap::new(),
        }
    }

    /// Build a registry from the modules, tenants and deployments in `config`.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let registry = Self::new(Self::snapshot_from(config));
        for deployment in &config.deployments {
            registry.deploy(deployment.module_id.clone(), deployment.url.clone());
        }
        registry
    }

    fn snapshot_from(config: &GatewayConfig) -> RegistrySnapshot {
        RegistrySnapshot::new(config.modules.iter().cloned(), config.tenants.iter().cloned())
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    /// Publish a new snapshot.
    pub fn replace(&self, snapshot: RegistrySnapshot) {
        tracing::info!(
            modules = snapshot.module_count(),
            tenants = snapshot.tenant_count(),
            "Registry snapshot replaced"
        );
        self.snapshot.store(Arc::new(snapshot));
    }

    /// Apply a reloaded configuration.
    ///
    /// New locations are inserted before stale ones are removed, so a module
    /// present in both configurations stays reachable throughout.
    pub fn reload(&self, config: &GatewayConfig) {
        self.replace(Self::snapshot_from(config));

        let declared: HashSet<&ModuleId> =
            config.deployments.iter().map(|d| &d.module_id).collect();
        for deployment in &config.deployments {
            self.deploy(deployment.module_id.clone(), deployment.url.clone());
        }
        self.locations.retain(|id, _| declared.contains(id));
    }

    /// Record where a module instance is listening.
    pub fn deploy(&self, module: ModuleId, url: Url) {
        tracing::debug!(module = %module, url = %url, "Module location registered");
        self.locations.insert(module, url);
    }
}

impl TenantRegistry for Registry {
    fn exists(&self, tenant: &str) -> bool {
        self.snapshot.load().tenant(tenant).is_some()
    }

    fn is_enabled(&self, tenant: &str, module: &ModuleId) -> bool {
        self.snapshot
            .load()
            .tenant(tenant)
            .is_some_and(|t| t.is_enabled(module))
    }

    fn enabled_modules(&self, tenant: &str) -> Vec<ModuleId> {
        self.snapshot
            .load()
            .tenant(tenant)
            .map(|t| t.modules.clone())
            .unwrap_or_default()
    }
}

impl ModuleDirectory for Registry {
    fn lookup(&self, module: &ModuleId) -> Option<ModuleLookup> {
        let routes = self.snapshot.load().module(module)?.clone();
        let base_url = self.locations.get(module).map(|url| url.value().clone());
        Some(ModuleLookup { routes, base_url })
    }
}
