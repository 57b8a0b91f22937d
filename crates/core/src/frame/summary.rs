//! Per-frame outcome accumulation.

use super::action::DeferredAction;
use crate::attribute::{ModifiedValue, ValueBias};
use crate::state::SimState;
use crate::types::{AttributeId, EntityId};

/// One measured attribute impact: what was asked for and what actually
/// landed after hooks and clamping.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImpactRecord {
    pub source: EntityId,
    pub target: EntityId,
    pub attribute: AttributeId,
    pub requested: ModifiedValue,
    pub real: ModifiedValue,
}

impl ImpactRecord {
    /// Sign classification of the real impact.
    pub fn bias(&self) -> ValueBias {
        self.real.bias()
    }
}

/// A deferred action that could not be resolved, kept for the frame report.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InvalidatedAction {
    pub target: EntityId,
    pub note: String,
}

impl InvalidatedAction {
    pub fn new(target: EntityId, note: impl Into<String>) -> Self {
        Self {
            target,
            note: note.into(),
        }
    }
}

/// Everything that happened in one frame, cleared after frame listeners run.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameSummary {
    pub frame: u64,
    pub impacts: Vec<ImpactRecord>,
    pub deaths: Vec<EntityId>,
    pub invalidated: Vec<InvalidatedAction>,
}

impl FrameSummary {
    pub fn record_impact(&mut self, impact: ImpactRecord) {
        self.impacts.push(impact);
    }

    pub fn record_death(&mut self, entity: EntityId) {
        if !self.deaths.contains(&entity) {
            self.deaths.push(entity);
        }
    }

    pub fn record_invalidated(&mut self, invalidated: InvalidatedAction) {
        self.invalidated.push(invalidated);
    }

    pub fn is_empty(&self) -> bool {
        self.impacts.is_empty() && self.deaths.is_empty() && self.invalidated.is_empty()
    }

    /// Resets the accumulators for the next frame, keeping the frame counter.
    pub fn clear(&mut self) {
        self.impacts.clear();
        self.deaths.clear();
        self.invalidated.clear();
    }
}

/// Receives the completed frame summary before it is cleared.
pub trait FrameListener: Send + Sync {
    fn on_frame(&mut self, summary: &FrameSummary);
}

/// Inspects the frame so far and recommends follow-up actions. Runs in the
/// analysis phase of the end-of-frame pipeline; recommendations are drained
/// before the summary is emitted.
pub trait AnalysisWorker: Send + Sync {
    fn analyze(&mut self, state: &SimState, summary: &FrameSummary) -> Vec<DeferredAction>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deaths_are_deduplicated() {
        let mut summary = FrameSummary::default();
        summary.record_death(EntityId(3));
        summary.record_death(EntityId(3));
        summary.record_death(EntityId(4));

        assert_eq!(summary.deaths, vec![EntityId(3), EntityId(4)]);
    }

    #[test]
    fn clear_keeps_frame_counter() {
        let mut summary = FrameSummary {
            frame: 9,
            ..Default::default()
        };
        summary.record_death(EntityId(1));
        summary.record_invalidated(InvalidatedAction::new(EntityId(1), "no such effect"));
        assert!(!summary.is_empty());

        summary.clear();
        assert!(summary.is_empty());
        assert_eq!(summary.frame, 9);
    }
}
