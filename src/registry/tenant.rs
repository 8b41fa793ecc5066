//! Tenant records.

use serde::{Deserialize, Serialize};

use crate::registry::ModuleId;

/// A tenant and the modules enabled for it.
///
/// `modules` keeps its declaration order: the route resolver breaks level
/// ties by this order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Tenant {
    pub id: String,
    #[serde(default)]
    pub modules: Vec<ModuleId>,
}

impl Tenant {
    pub fn new(id: impl Into<String>, modules: Vec<ModuleId>) -> Self {
        Self {
            id: id.into(),
            modules,
        }
    }

    pub fn is_enabled(&self, module: &ModuleId) -> bool {
        self.modules.contains(module)
    }
}
