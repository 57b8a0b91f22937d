//! Tokio orchestration over the simulation core.
//!
//! A single [`SimulationWorker`] owns the authoritative
//! [`aegis_core::Engine`]; clients drive it through the cloneable
//! [`RuntimeHandle`] (mpsc commands with oneshot replies) and observe it on
//! a broadcast [`SimEvent`] bus. [`AbilityExecutor`] layers the async
//! ability-stage protocol on top: cooperative cancellation via the claim's
//! injection mailbox and exactly-once claim release via [`ClaimGuard`].

mod error;
mod events;
mod executor;
mod handle;
mod runtime;
mod worker;

pub use error::{Result, RuntimeError};
pub use events::SimEvent;
pub use executor::{
    AbilityExecutor, ClaimGuard, ExecutionOutcome, StageContext, StageOutcome, StageTask,
    TargetingContext, TargetingTask,
};
pub use handle::RuntimeHandle;
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use worker::{Command, SimulationWorker};
