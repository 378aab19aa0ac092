//! Rules and their reconciliation.
//!
//! # Data Flow
//! ```text
//! Providers (file, ...)
//!     → RuleSetChangedEvent over the shared bounded queue
//!     → Reconciler (single consumer, all-or-nothing validation)
//!     → RuleRepository (atomic swap of an immutable RuleIndex)
//!
//! Request:
//!     → Executor::execute(ctx)
//!     → RuleIndex::find (precedence order, first match)
//!     → Rule::execute (authenticate → authorize → mutate, error handlers)
//!     → Decision or PipelineError
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod executor;
pub mod factory;
pub mod index;
pub mod pattern;
pub mod provider;
pub mod reconciler;
pub mod rule;

pub use config::{MatchConfig, MechanismRef, RuleConfig};
pub use error::{ReconcileError, RuleValidationError};
pub use event::{event_queue, ChangeKind, EventReceiver, EventSender, RuleSetChangedEvent};
pub use executor::{Decision, Executor};
pub use factory::RuleFactory;
pub use index::{RuleIndex, RuleRepository, RuleSet};
pub use pattern::{PathPattern, PatternError};
pub use reconciler::{ProviderStatus, ProviderStatusTable, ReconcileOutcome, Reconciler};
pub use rule::Rule;
