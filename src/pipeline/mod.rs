//! Per-request mechanism pipeline.
//!
//! # Data Flow
//! ```text
//! Context (request abstraction supplied by the boundary)
//!     → authenticators (ordered fallback chain) → Subject
//!     → authorizers (all must pass, in order)
//!     → mutators (render headers/cookies from the Subject)
//!     → on any failure: error handlers (first applicable handles)
//! ```
//!
//! # Design Decisions
//! - One trait per mechanism kind; composites implement the same trait
//! - Prototypes are immutable; `with_config` derives a new instance
//! - Mechanism constructors are registered explicitly in a `MechanismRegistry`
//! - Remote calls run under the request's `AppContext` (deadline + cancellation)

pub mod authenticators;
pub mod authorizers;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod errorhandlers;
pub mod keys;
pub mod mutators;
pub mod prototypes;
pub mod registry;
pub mod subject;
pub mod template;

#[cfg(test)]
pub(crate) mod testsupport;

pub use config::MechanismConfig;
pub use context::{AppContext, Context};
pub use keys::KeyMaterial;
pub use prototypes::PrototypeRepository;
pub use registry::MechanismRegistry;
pub use subject::Subject;
