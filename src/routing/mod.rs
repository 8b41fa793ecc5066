//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registry update:
//!     ModuleDescriptor
//!     → router.rs (compile every handler/filter entry)
//!     → matcher.rs (method set + path prefix or pattern)
//!     → ModuleRoutes, shared through the registry snapshot
//!
//! Incoming Request (method, path, tenant, module override):
//!     → resolver.rs (collect matches of enabled modules)
//!     → sort by level, expand redirects, attach locations
//!     → Vec<PipelineStep>
//! ```
//!
//! # Design Decisions
//! - Entries compiled when descriptors are loaded, immutable at runtime
//! - No regex in hot path (literal prefixes and small token patterns)
//! - Deterministic: same input always yields the same step order

pub mod matcher;
pub mod resolver;
pub mod router;

pub use matcher::Matcher;
pub use resolver::{RouteResolver, MAX_REDIRECTS};
pub use router::{CompiledRoute, ModuleRoutes};
