//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Vec<PipelineStep> (from routing::resolver)
//!     → executor.rs picks a strategy per step
//!     → client.rs forwards to the module instance
//!     → body.rs drains or buffers bodies between hops
//!     → trace.rs records one entry per executed step
//!     → client response (module response, or gateway error) + X-Okapi-Trace
//! ```
//!
//! # Design Decisions
//! - Strictly sequential: a step starts only after the previous one answered
//! - Bodies stream hop to hop; only `request-only` steps buffer
//! - A step list with an unsupported routing type is refused before any I/O

pub mod body;
pub mod client;
pub mod executor;
pub mod step;
pub mod trace;

pub use client::ModuleClient;
pub use executor::{Pipeline, Strategy};
pub use step::PipelineStep;
pub use trace::{Trace, TraceEntry};
