//! Per-attribute ledger: running total plus per-contributor breakdown.
//!
//! Every mutation updates the ledger entry and the running total by the same
//! delta, so the invariant `value == Σ ledger` holds without recomputation.
//! The one sanctioned exception is clamping, which corrects the total
//! directly (see [`AttributeAggregate::clamp`]).

use std::collections::HashMap;

use super::contribution::Contribution;
use super::value::{AttributeValue, ModifiedValue};

/// Component-wise clamp applied to an aggregate after a modification.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClampPolicy {
    /// No clamping.
    #[default]
    None,
    /// Current is clamped into `[0, base]`; base is untouched. The usual
    /// policy for depletable meters like health.
    ZeroToBase,
    /// Both components clamped into an explicit range.
    Range {
        floor: AttributeValue,
        ceil: AttributeValue,
    },
}

/// Running total and contribution ledger for one attribute on one entity.
#[derive(Debug, Default)]
pub struct AttributeAggregate {
    value: AttributeValue,
    ledger: HashMap<Contribution, AttributeValue>,
}

impl AttributeAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The running total.
    pub fn value(&self) -> AttributeValue {
        self.value
    }

    /// Adds a delta under a contribution key.
    ///
    /// Tracked contributions get a ledger entry (created if absent); folded
    /// contributions only move the total.
    pub fn add(&mut self, contribution: Contribution, delta: AttributeValue) {
        if contribution.is_tracked() {
            let entry = self
                .ledger
                .entry(contribution)
                .or_insert(AttributeValue::ZERO);
            *entry = *entry + delta;
        }
        self.value = self.value + delta;
    }

    /// [`add`](Self::add) with a pending-modification delta pair.
    pub fn add_modified(&mut self, contribution: Contribution, modified: ModifiedValue) {
        self.add(contribution, modified.as_offset());
    }

    /// Overwrites a contribution's ledger entry, moving the total by the
    /// difference. Folded contributions have no previous entry to diff
    /// against, so the new value is applied as a plain delta.
    pub fn set(&mut self, contribution: Contribution, value: AttributeValue) {
        if contribution.is_tracked() {
            let entry = self
                .ledger
                .entry(contribution)
                .or_insert(AttributeValue::ZERO);
            let delta = value - *entry;
            *entry = value;
            self.value = self.value + delta;
        } else {
            self.value = self.value + value;
        }
    }

    /// Removes a contribution, subtracting its ledger entry from the total.
    /// Removing an absent contribution is a no-op; returns whether an entry
    /// was removed.
    pub fn remove(&mut self, contribution: &Contribution) -> bool {
        match self.ledger.remove(contribution) {
            Some(entry) => {
                self.value = self.value - entry;
                true
            }
            None => false,
        }
    }

    /// Clamps the total into `[floor, ceil]` component-wise.
    ///
    /// The correction is a single delta applied to the total; it is not
    /// distributed across ledger entries, so the ledger sum and the total
    /// may diverge after repeated clamping. Use [`reconcile`](Self::reconcile)
    /// to re-normalize when that matters. Returns the correction applied.
    pub fn clamp(&mut self, floor: AttributeValue, ceil: AttributeValue) -> ModifiedValue {
        let clamped = self.value.clamped(floor, ceil);
        let correction = clamped - self.value;
        self.value = clamped;
        ModifiedValue::new(correction.current, correction.base)
    }

    /// Clamps with only an upper bound.
    pub fn clamp_ceiling(&mut self, ceil: AttributeValue) -> ModifiedValue {
        self.clamp(
            AttributeValue::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
            ceil,
        )
    }

    /// Applies a clamp policy after a modification.
    pub fn apply_clamp(&mut self, policy: ClampPolicy) -> ModifiedValue {
        match policy {
            ClampPolicy::None => ModifiedValue::ZERO,
            ClampPolicy::ZeroToBase => {
                let base = self.value.base;
                self.clamp(
                    AttributeValue::new(0.0, f32::NEG_INFINITY),
                    AttributeValue::new(base, f32::INFINITY),
                )
            }
            ClampPolicy::Range { floor, ceil } => self.clamp(floor, ceil),
        }
    }

    /// Purges ledger entries that are exactly zero on both components.
    pub fn clean(&mut self) {
        self.ledger.retain(|_, v| !v.is_zero());
    }

    /// Re-normalizes the total to the ledger sum, undoing accumulated clamp
    /// divergence. Never called implicitly.
    pub fn reconcile(&mut self) {
        self.value = self.ledger_sum();
    }

    /// Sum over all current ledger entries.
    pub fn ledger_sum(&self) -> AttributeValue {
        self.ledger
            .values()
            .fold(AttributeValue::ZERO, |acc, v| acc + *v)
    }

    /// The ledger entry for a contribution, if tracked.
    pub fn contribution_value(&self, contribution: &Contribution) -> Option<AttributeValue> {
        self.ledger.get(contribution).copied()
    }

    /// Iterates the ledger.
    pub fn contributions(&self) -> impl Iterator<Item = (&Contribution, &AttributeValue)> {
        self.ledger.iter()
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }
}
