//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (tenants reference existing modules)
//! - Check the level encoding shared by all descriptors
//! - Detect conflicting providers of non-`multiple` interfaces
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::registry::{InterfaceType, ModuleDescriptor, ModuleId, RoutingEntry, RoutingType, LEVEL_WIDTH};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate module id {0}")]
    DuplicateModule(ModuleId),

    #[error("duplicate tenant id {0}")]
    DuplicateTenant(String),

    #[error("tenant {tenant} enables unknown module {module}")]
    UnknownModule { tenant: String, module: ModuleId },

    #[error("deployment references unknown module {0}")]
    UnknownDeployment(ModuleId),

    #[error("module {module}: level {level:?} on {path} must be {width} digits")]
    InvalidLevel {
        module: ModuleId,
        path: String,
        level: String,
        width: usize,
    },

    #[error("module {module}: routing entry has neither path nor path_pattern")]
    MissingPath { module: ModuleId },

    #[error("module {module}: redirect entry {path} has no redirect_path")]
    MissingRedirectPath { module: ModuleId, path: String },

    #[error("tenant {tenant}: interface {interface} provided by both {first} and {second}")]
    InterfaceConflict {
        tenant: String,
        interface: String,
        first: ModuleId,
        second: ModuleId,
    },
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut modules: HashMap<&ModuleId, &ModuleDescriptor> = HashMap::new();
    for descriptor in &config.modules {
        if modules.insert(&descriptor.id, descriptor).is_some() {
            errors.push(ValidationError::DuplicateModule(descriptor.id.clone()));
        }
        validate_descriptor(descriptor, &mut errors);
    }

    for deployment in &config.deployments {
        if !modules.contains_key(&deployment.module_id) {
            errors.push(ValidationError::UnknownDeployment(deployment.module_id.clone()));
        }
    }

    let mut tenant_ids = HashSet::new();
    for tenant in &config.tenants {
        if !tenant_ids.insert(tenant.id.as_str()) {
            errors.push(ValidationError::DuplicateTenant(tenant.id.clone()));
        }

        // interface id -> first enabled provider
        let mut providers: HashMap<&str, &ModuleId> = HashMap::new();
        for module_id in &tenant.modules {
            let Some(descriptor) = modules.get(module_id) else {
                errors.push(ValidationError::UnknownModule {
                    tenant: tenant.id.clone(),
                    module: module_id.clone(),
                });
                continue;
            };

            for interface in &descriptor.provides {
                if interface.interface_type == InterfaceType::Multiple {
                    continue;
                }
                match providers.get(interface.id.as_str()) {
                    Some(first) if *first != module_id => {
                        errors.push(ValidationError::InterfaceConflict {
                            tenant: tenant.id.clone(),
                            interface: interface.id.clone(),
                            first: (*first).clone(),
                            second: module_id.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        providers.insert(interface.id.as_str(), module_id);
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_descriptor(descriptor: &ModuleDescriptor, errors: &mut Vec<ValidationError>) {
    let entries = descriptor
        .provides
        .iter()
        .flat_map(|i| i.handlers.iter())
        .chain(descriptor.filters.iter());

    for entry in entries {
        validate_entry(&descriptor.id, entry, errors);
    }
}

fn validate_entry(module: &ModuleId, entry: &RoutingEntry, errors: &mut Vec<ValidationError>) {
    if entry.path.is_none() && entry.path_pattern.is_none() {
        errors.push(ValidationError::MissingPath {
            module: module.clone(),
        });
    }

    if let Some(level) = &entry.level {
        if !is_valid_level(level) {
            errors.push(ValidationError::InvalidLevel {
                module: module.clone(),
                path: entry.display_path().to_string(),
                level: level.clone(),
                width: LEVEL_WIDTH,
            });
        }
    }

    if entry.kind == RoutingType::Redirect && entry.redirect_path.is_none() {
        errors.push(ValidationError::MissingRedirectPath {
            module: module.clone(),
            path: entry.display_path().to_string(),
        });
    }
}

/// A level is exactly `LEVEL_WIDTH` ASCII digits.
pub fn is_valid_level(level: &str) -> bool {
    level.len() == LEVEL_WIDTH && level.bytes().all(|b| b.is_ascii_digit())
}
