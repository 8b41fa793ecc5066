//! Route resolution: (method, path, tenant) → ordered pipeline steps.
//!
//! # Responsibilities
//! - Collect every matching routing entry of every module enabled for the tenant
//! - Order the matches by level (string comparison, stable)
//! - Expand `redirect` entries into the handlers serving the target path
//! - Attach each module's current network location
//!
//! # Design Decisions
//! - One total order: the level string. Phases only influence it through
//!   the level convention (auth 10, pre 40, handler 50, post 60)
//! - Ties keep the tenant's module enablement order (stable sort)
//! - Conflicts between non-`multiple` providers are rejected when modules are
//!   enabled, never here
//! - An empty result is not an error; the pipeline answers it with 404

use std::sync::Arc;

use axum::http::Method;
use url::Url;

use crate::error::{GatewayError, GatewayResult};
use crate::pipeline::PipelineStep;
use crate::registry::{
    ModuleDescriptor, ModuleDirectory, ModuleId, RoutingEntry, RoutingType, TenantRegistry,
};

/// Longest redirect chain followed before giving up.
pub const MAX_REDIRECTS: usize = 8;

struct Candidate {
    module: Arc<ModuleDescriptor>,
    location: Option<Url>,
    entry: RoutingEntry,
}

/// Builds the step sequence for a request from the shared registries.
#[derive(Clone)]
pub struct RouteResolver {
    tenants: Arc<dyn TenantRegistry>,
    directory: Arc<dyn ModuleDirectory>,
}

impl RouteResolver {
    pub fn new(tenants: Arc<dyn TenantRegistry>, directory: Arc<dyn ModuleDirectory>) -> Self {
        Self { tenants, directory }
    }

    /// Resolve the ordered steps for a request.
    ///
    /// `module_hint` (the `X-Okapi-Module-Id` override) restricts entries of
    /// `multiple` interfaces to the named module; other entries are unaffected.
    pub fn resolve(
        &self,
        method: &Method,
        path: &str,
        tenant: &str,
        module_hint: Option<&ModuleId>,
    ) -> GatewayResult<Vec<PipelineStep>> {
        let mut chain = vec![path.to_string()];
        self.resolve_path(method, path, tenant, module_hint, false, &mut chain)
    }

    fn resolve_path(
        &self,
        method: &Method,
        path: &str,
        tenant: &str,
        module_hint: Option<&ModuleId>,
        handlers_only: bool,
        chain: &mut Vec<String>,
    ) -> GatewayResult<Vec<PipelineStep>> {
        let mut candidates = self.candidates(method, path, tenant, module_hint, handlers_only);
        candidates.sort_by(|a, b| a.entry.effective_level().cmp(b.entry.effective_level()));

        let mut steps = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if candidate.entry.kind == RoutingType::Redirect {
                steps.extend(self.follow_redirect(method, path, tenant, module_hint, &candidate, chain)?);
                continue;
            }

            let Some(location) = candidate.location else {
                return Err(GatewayError::ModuleNotDeployed(candidate.module.id.clone()));
            };
            steps.push(PipelineStep {
                module: candidate.module,
                entry: candidate.entry,
                location,
                path: path.to_string(),
            });
        }

        Ok(steps)
    }

    fn candidates(
        &self,
        method: &Method,
        path: &str,
        tenant: &str,
        module_hint: Option<&ModuleId>,
        handlers_only: bool,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for module_id in self.tenants.enabled_modules(tenant) {
            let Some(lookup) = self.directory.lookup(&module_id) else {
                tracing::warn!(tenant = %tenant, module = %module_id, "Enabled module has no descriptor");
                continue;
            };

            for route in lookup.routes.matching(method, path) {
                if handlers_only && !route.entry.is_handler() {
                    continue;
                }
                if route.is_multiple() && module_hint.is_some_and(|hint| *hint != module_id) {
                    continue;
                }
                candidates.push(Candidate {
                    module: lookup.routes.descriptor.clone(),
                    location: lookup.base_url.clone(),
                    entry: route.entry.clone(),
                });
            }
        }

        candidates
    }

    fn follow_redirect(
        &self,
        method: &Method,
        path: &str,
        tenant: &str,
        module_hint: Option<&ModuleId>,
        candidate: &Candidate,
        chain: &mut Vec<String>,
    ) -> GatewayResult<Vec<PipelineStep>> {
        let Some(redirect_path) = candidate.entry.redirect_path.as_deref() else {
            return Err(GatewayError::RedirectFailed {
                from: path.to_string(),
                to: String::new(),
            });
        };
        let target = redirect_target(&candidate.entry, redirect_path, path);

        if chain.contains(&target) || chain.len() > MAX_REDIRECTS {
            return Err(GatewayError::RedirectLoop { path: target });
        }

        tracing::debug!(from = %path, to = %target, module = %candidate.module.id, "Following redirect");
        chain.push(target.clone());
        let redirected = self.resolve_path(method, &target, tenant, module_hint, true, chain);
        chain.pop();

        let redirected = redirected?;
        if redirected.is_empty() {
            return Err(GatewayError::RedirectFailed {
                from: path.to_string(),
                to: target,
            });
        }
        Ok(redirected)
    }
}

/// Target path of a redirect: a prefix entry keeps the unmatched suffix,
/// a pattern entry is replaced as a whole.
fn redirect_target(entry: &RoutingEntry, redirect_path: &str, path: &str) -> String {
    match (&entry.path_pattern, &entry.path) {
        (None, Some(prefix)) => match path.strip_prefix(prefix.as_str()) {
            Some(suffix) => format!("{redirect_path}{suffix}"),
            None => redirect_path.to_string(),
        },
        _ => redirect_path.to_string(),
    }
}
