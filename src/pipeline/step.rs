//! Pipeline steps.

use std::sync::Arc;

use url::Url;

use crate::registry::{ModuleDescriptor, ModuleId, RoutingEntry};

/// One module + routing-entry pairing selected for a request.
///
/// Steps live only as long as the request they were resolved for.
#[derive(Debug, Clone)]
pub struct PipelineStep {
    pub module: Arc<ModuleDescriptor>,
    pub entry: RoutingEntry,
    /// Base URL of the running module instance.
    pub location: Url,
    /// Path sent to the module; differs from the client path after a redirect.
    pub path: String,
}

impl PipelineStep {
    pub fn module_id(&self) -> &ModuleId {
        &self.module.id
    }

    pub fn level(&self) -> &str {
        self.entry.effective_level()
    }
}
