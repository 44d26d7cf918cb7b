//! groundflow Engine
//!
//! The plan/apply core of groundflow: diffs the declared dependency
//! graph against stored state and reconciles the difference through
//! pluggable resource providers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                groundflow CLI                    │
//! │            (ground plan / apply)                 │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │              groundflow-engine                   │
//! │  ┌────────────┐   ┌────────────────────────┐    │
//! │  │  Planner   │──▶│  Executor (frontier)   │    │
//! │  └────────────┘   └───────────┬────────────┘    │
//! │  trait ResourceProvider { create/update/destroy }│
//! └───────┬───────────────────────┼─────────────────┘
//!         │                       │
//! ┌───────▼───────┐       ┌───────▼───────┐
//! │ groundflow-   │       │   provider    │
//! │ state (lock)  │       │ implementations│
//! └───────────────┘       └───────────────┘
//! ```
//!
//! One plan/apply cycle runs under one exclusive lock; within a cycle,
//! independent branches of the DAG execute concurrently.

pub mod change;
pub mod error;
pub mod executor;
pub mod planner;
pub mod provider;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use change::{
    ApplyReport, ChangeEntry, ChangeKind, ChangeSet, NodeOutcome, NodeResult, PlanSummary,
};
pub use error::{EngineError, Result};
pub use executor::{CancelToken, Executor, ExecutorOptions};
pub use planner::{plan, plan_destroy};
pub use provider::{CreatedResource, ProviderRegistry, ResourceProvider};
