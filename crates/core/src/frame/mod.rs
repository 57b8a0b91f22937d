//! Deferred actions and the per-frame summary they feed.
//!
//! The end-of-frame drain loop itself lives in the engine; this module holds
//! the data that flows through it.

mod action;
mod summary;

pub use action::DeferredAction;
pub use summary::{AnalysisWorker, FrameListener, FrameSummary, ImpactRecord, InvalidatedAction};
