//! Pre/post-change hook objects for the modification pipeline.
//!
//! Hooks are registered per attribute and invoked in registration order.
//! Pre-change hooks see the pending change before it lands and may veto it
//! or rewrite it in place; post-change hooks observe the measured result and
//! may only react (typically by enqueuing deferred actions), never alter the
//! already-applied delta.

use std::collections::VecDeque;

use super::contribution::Contribution;
use super::value::{AttributeValue, ModifiedValue};
use crate::frame::DeferredAction;
use crate::types::AttributeId;

/// A modification on its way into an aggregate.
#[derive(Debug)]
pub struct ChangeRequest<'a> {
    pub attribute: AttributeId,
    pub contribution: &'a Contribution,
    /// The pending deltas. Pre-change hooks may rewrite this.
    pub change: ModifiedValue,
}

/// A modification that has landed, with its measured result.
#[derive(Debug)]
pub struct AppliedChange<'a> {
    pub attribute: AttributeId,
    pub contribution: &'a Contribution,
    /// What was asked for (after pre-change hooks ran).
    pub requested: ModifiedValue,
    /// The measured before/after delta, clamping included.
    pub real: ModifiedValue,
    /// Aggregate total after the change.
    pub value: AttributeValue,
}

/// Pre-change stage hook: may veto or mutate a pending change.
pub trait ChangeHook: Send + Sync {
    /// Returning false vetoes the change; nothing is applied.
    fn validate(&self, request: &ChangeRequest<'_>) -> bool {
        let _ = request;
        true
    }

    /// Rewrites the pending change in place.
    fn apply(&self, request: &mut ChangeRequest<'_>) {
        let _ = request;
    }
}

/// Post-change stage hook: observes the applied change and may enqueue
/// deferred follow-up work.
pub trait ChangeObserver: Send + Sync {
    fn observe(&mut self, applied: &AppliedChange<'_>, queue: &mut VecDeque<DeferredAction>);
}
