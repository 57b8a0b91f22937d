//! Per-entity activation-policy enforcement.

use std::collections::{HashMap, VecDeque};

use super::definition::ActivationPolicy;
use crate::types::TagId;

/// Outcome of one activation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GateDecision {
    /// The claim is registered; the ability may start.
    Activated,
    /// Blocked, but appended to the FIFO queue; it will be handed back on
    /// the blocking claim's release.
    Queued,
    /// Blocked and discarded. No state changed.
    Rejected,
}

#[derive(Clone, Copy, Debug)]
struct ActiveEntry {
    ability: usize,
    critical: bool,
    identity_tag: TagId,
}

/// Enforces activation policies across all abilities of one entity.
///
/// Each policy is its own bucket of active entries. A successful request
/// registers the ability's slot index into its bucket and starts an
/// elapsed-time tracker keyed by the ability's identity tag; release removes
/// both and, for the queued policy, pops the next waiting request.
#[derive(Debug, Default)]
pub struct ActivationGate {
    unrestricted: Vec<ActiveEntry>,
    single: Vec<ActiveEntry>,
    queued: Vec<ActiveEntry>,
    queue: VecDeque<usize>,
    elapsed: HashMap<TagId, f32>,
}

impl ActivationGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(&self, policy: ActivationPolicy) -> &Vec<ActiveEntry> {
        match policy {
            ActivationPolicy::Unrestricted => &self.unrestricted,
            ActivationPolicy::SingleActive => &self.single,
            ActivationPolicy::SingleActiveQueued => &self.queued,
        }
    }

    fn bucket_mut(&mut self, policy: ActivationPolicy) -> &mut Vec<ActiveEntry> {
        match policy {
            ActivationPolicy::Unrestricted => &mut self.unrestricted,
            ActivationPolicy::SingleActive => &mut self.single,
            ActivationPolicy::SingleActiveQueued => &mut self.queued,
        }
    }

    fn bucket_has_critical(&self, policy: ActivationPolicy) -> bool {
        self.bucket(policy).iter().any(|entry| entry.critical)
    }

    /// Whether a request would be blocked right now, without changing state.
    fn blocked(&self, policy: ActivationPolicy, critical: bool) -> bool {
        match policy {
            // Only critical abilities contend, and only with each other.
            ActivationPolicy::Unrestricted => critical && self.bucket_has_critical(policy),
            // Any active critical ability blocks the whole bucket.
            ActivationPolicy::SingleActive | ActivationPolicy::SingleActiveQueued => {
                self.bucket_has_critical(policy)
            }
        }
    }

    /// Requests activation of an ability slot. On `Activated` the claim is
    /// registered and its elapsed tracker started; on `Queued` the slot
    /// index waits in FIFO order; on `Rejected` nothing changed.
    pub fn request(
        &mut self,
        ability: usize,
        policy: ActivationPolicy,
        critical: bool,
        identity_tag: TagId,
    ) -> GateDecision {
        if self.is_active(ability) {
            return GateDecision::Rejected;
        }
        if self.blocked(policy, critical) {
            return match policy {
                ActivationPolicy::SingleActiveQueued => {
                    self.queue.push_back(ability);
                    GateDecision::Queued
                }
                _ => GateDecision::Rejected,
            };
        }

        self.bucket_mut(policy).push(ActiveEntry {
            ability,
            critical,
            identity_tag,
        });
        self.elapsed.insert(identity_tag, 0.0);
        GateDecision::Activated
    }

    /// Releases an ability's claim. Returns the next queued slot index when
    /// the release unblocked the queued bucket; the caller is responsible
    /// for re-requesting it.
    pub fn release(&mut self, ability: usize, policy: ActivationPolicy) -> Option<usize> {
        let bucket = self.bucket_mut(policy);
        let position = bucket.iter().position(|entry| entry.ability == ability)?;
        let entry = bucket.remove(position);
        self.elapsed.remove(&entry.identity_tag);

        if policy == ActivationPolicy::SingleActiveQueued
            && !self.bucket_has_critical(ActivationPolicy::SingleActiveQueued)
        {
            return self.queue.pop_front();
        }
        None
    }

    /// Drops a waiting request from the queue (e.g. the entity lost the
    /// ability before its turn came).
    pub fn unqueue(&mut self, ability: usize) -> bool {
        let before = self.queue.len();
        self.queue.retain(|&waiting| waiting != ability);
        self.queue.len() != before
    }

    pub fn is_active(&self, ability: usize) -> bool {
        [&self.unrestricted, &self.single, &self.queued]
            .iter()
            .any(|bucket| bucket.iter().any(|entry| entry.ability == ability))
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Seconds the identified ability has been claimed, if it is.
    pub fn elapsed(&self, identity_tag: TagId) -> Option<f32> {
        self.elapsed.get(&identity_tag).copied()
    }

    /// Advances every running elapsed tracker.
    pub fn advance(&mut self, dt: f32) {
        for tracker in self.elapsed.values_mut() {
            *tracker += dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPRINT: TagId = TagId(10);
    const CLEAVE: TagId = TagId(11);
    const GUARD: TagId = TagId(12);

    #[test]
    fn unrestricted_noncritical_never_block() {
        let mut gate = ActivationGate::new();
        let policy = ActivationPolicy::Unrestricted;

        assert_eq!(gate.request(0, policy, false, SPRINT), GateDecision::Activated);
        assert_eq!(gate.request(1, policy, false, CLEAVE), GateDecision::Activated);
        assert_eq!(gate.request(2, policy, true, GUARD), GateDecision::Activated);
        // second critical contends with the first
        assert_eq!(gate.request(3, policy, true, TagId(13)), GateDecision::Rejected);

        gate.release(2, policy);
        assert_eq!(gate.request(3, policy, true, TagId(13)), GateDecision::Activated);
    }

    #[test]
    fn single_active_critical_blocks_the_bucket() {
        let mut gate = ActivationGate::new();
        let policy = ActivationPolicy::SingleActive;

        assert_eq!(gate.request(0, policy, true, CLEAVE), GateDecision::Activated);
        // even a non-critical request is refused while the critical one runs
        assert_eq!(gate.request(1, policy, false, SPRINT), GateDecision::Rejected);
        assert!(!gate.is_active(1));
        assert_eq!(gate.elapsed(SPRINT), None);

        assert_eq!(gate.release(0, policy), None);
        assert_eq!(gate.request(1, policy, false, SPRINT), GateDecision::Activated);
    }

    #[test]
    fn queued_bucket_hands_back_the_next_waiter() {
        let mut gate = ActivationGate::new();
        let policy = ActivationPolicy::SingleActiveQueued;

        assert_eq!(gate.request(0, policy, true, CLEAVE), GateDecision::Activated);
        assert_eq!(gate.request(1, policy, true, GUARD), GateDecision::Queued);
        assert_eq!(gate.request(2, policy, true, SPRINT), GateDecision::Queued);
        assert_eq!(gate.queue_len(), 2);

        // FIFO: slot 1 comes back first
        assert_eq!(gate.release(0, policy), Some(1));
        assert_eq!(gate.request(1, policy, true, GUARD), GateDecision::Activated);
        assert_eq!(gate.release(1, policy), Some(2));
    }

    #[test]
    fn duplicate_request_is_rejected() {
        let mut gate = ActivationGate::new();
        let policy = ActivationPolicy::Unrestricted;
        assert_eq!(gate.request(0, policy, false, SPRINT), GateDecision::Activated);
        assert_eq!(gate.request(0, policy, false, SPRINT), GateDecision::Rejected);
    }

    #[test]
    fn elapsed_trackers_follow_claims() {
        let mut gate = ActivationGate::new();
        let policy = ActivationPolicy::Unrestricted;
        gate.request(0, policy, false, SPRINT);
        gate.advance(0.5);
        gate.advance(0.25);
        assert_eq!(gate.elapsed(SPRINT), Some(0.75));

        gate.release(0, policy);
        assert_eq!(gate.elapsed(SPRINT), None);
    }
}
