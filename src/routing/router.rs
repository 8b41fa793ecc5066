//! Compiled route tables.
//!
//! # Responsibilities
//! - Compile every routing entry of a descriptor into a matcher once
//! - Remember which interface (and interface type) an entry came from
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Handlers are listed before filters, in declaration order

use std::sync::Arc;

use axum::http::Method;

use crate::registry::{InterfaceType, ModuleDescriptor, RoutingEntry};
use crate::routing::matcher::{compile, AndMatcher, Matcher};

/// A routing entry together with its compiled matcher.
#[derive(Debug)]
pub struct CompiledRoute {
    pub entry: RoutingEntry,
    /// Type of the providing interface; `None` for filters.
    pub interface_type: Option<InterfaceType>,
    matcher: AndMatcher,
}

impl CompiledRoute {
    pub fn new(entry: RoutingEntry, interface_type: Option<InterfaceType>) -> Self {
        let matcher = compile(&entry);
        Self {
            entry,
            interface_type,
            matcher,
        }
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.matcher.matches(method, path)
    }

    pub fn is_multiple(&self) -> bool {
        self.interface_type == Some(InterfaceType::Multiple)
    }
}

/// A descriptor and its compiled routes.
#[derive(Debug)]
pub struct ModuleRoutes {
    pub descriptor: Arc<ModuleDescriptor>,
    pub routes: Vec<CompiledRoute>,
}

impl ModuleRoutes {
    pub fn new(descriptor: ModuleDescriptor) -> Self {
        let mut routes = Vec::new();
        for interface in &descriptor.provides {
            for entry in &interface.handlers {
                routes.push(CompiledRoute::new(
                    entry.clone(),
                    Some(interface.interface_type),
                ));
            }
        }
        for entry in &descriptor.filters {
            routes.push(CompiledRoute::new(entry.clone(), None));
        }

        Self {
            descriptor: Arc::new(descriptor),
            routes,
        }
    }

    /// Routes matching the request, in declaration order.
    pub fn matching<'a>(
        &'a self,
        method: &'a Method,
        path: &'a str,
    ) -> impl Iterator<Item = &'a CompiledRoute> + 'a {
        self.routes.iter().filter(move |r| r.matches(method, path))
    }
}
