//! Ability claim lifecycle and cooperative cancellation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A cooperative interruption request aimed at a running claim. Observed at
/// stage boundaries and explicit checks, never preemptively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Injection {
    /// Cancel the whole claim; cleanup runs and the claim releases.
    CancelClaim,
    /// Skip the currently running stage.
    SkipStage,
    /// Skip the currently running stage and extend the next one.
    SkipStageExtend,
    /// Stop the most recently started maintained stage.
    StopMaintainedRecent,
    /// Stop every maintained stage.
    StopMaintainedAll,
}

#[derive(Debug, Default)]
struct HandleInner {
    cancelled: AtomicBool,
    injections: Mutex<VecDeque<Injection>>,
}

/// Shared mailbox between a running claim and whoever may interrupt it.
///
/// Cloning shares the mailbox. `CancelClaim` additionally latches the
/// cancelled flag so stage executors can poll it cheaply between
/// suspension points.
#[derive(Clone, Debug, Default)]
pub struct CancellationHandle {
    inner: Arc<HandleInner>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Posts an injection. `CancelClaim` also latches the cancelled flag.
    pub fn inject(&self, injection: Injection) {
        if injection == Injection::CancelClaim {
            self.inner.cancelled.store(true, Ordering::Release);
        }
        if let Ok(mut queue) = self.inner.injections.lock() {
            queue.push_back(injection);
        }
    }

    /// Takes the oldest pending injection, if any.
    pub fn next_injection(&self) -> Option<Injection> {
        self.inner
            .injections
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
    }

    pub fn has_pending(&self) -> bool {
        self.inner
            .injections
            .lock()
            .map(|queue| !queue.is_empty())
            .unwrap_or(false)
    }
}

/// Lifecycle phase of one ability claim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClaimPhase {
    #[default]
    Idle,
    Targeting,
    Active,
}

/// Runtime state for one entity's instance of an ability.
///
/// Phase moves strictly `Idle -> Targeting -> Active -> Idle`, or back to
/// `Idle` from `Targeting` on a pre-commit cancel. The claim is created once
/// per granted ability and reused across activations; each activation cycle
/// gets a fresh cancellation handle so stale cancels cannot leak forward.
#[derive(Debug, Default)]
pub struct AbilityClaim {
    phase: ClaimPhase,
    handle: CancellationHandle,
}

impl AbilityClaim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ClaimPhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == ClaimPhase::Idle
    }

    pub fn is_active(&self) -> bool {
        self.phase == ClaimPhase::Active
    }

    /// The current activation cycle's cancellation handle.
    pub fn cancellation(&self) -> CancellationHandle {
        self.handle.clone()
    }

    /// `Idle -> Targeting`. Issues a fresh cancellation handle for the new
    /// cycle. Returns false from any other phase.
    pub fn begin_targeting(&mut self) -> bool {
        if self.phase != ClaimPhase::Idle {
            return false;
        }
        self.handle = CancellationHandle::new();
        self.phase = ClaimPhase::Targeting;
        true
    }

    /// `Targeting -> Active`. Returns false from any other phase.
    pub fn commit_active(&mut self) -> bool {
        if self.phase != ClaimPhase::Targeting {
            return false;
        }
        self.phase = ClaimPhase::Active;
        true
    }

    /// Back to `Idle` from `Targeting` or `Active`. Idempotent: releasing
    /// an idle claim returns false and changes nothing.
    pub fn release(&mut self) -> bool {
        if self.phase == ClaimPhase::Idle {
            return false;
        }
        self.phase = ClaimPhase::Idle;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_is_strict() {
        let mut claim = AbilityClaim::new();
        assert!(!claim.commit_active());
        assert!(!claim.release());

        assert!(claim.begin_targeting());
        assert!(!claim.begin_targeting());
        assert!(claim.commit_active());
        assert!(claim.is_active());
        assert!(claim.release());
        assert!(claim.is_idle());
    }

    #[test]
    fn targeting_can_release_without_commit() {
        let mut claim = AbilityClaim::new();
        assert!(claim.begin_targeting());
        assert!(claim.release());
        assert!(claim.is_idle());
    }

    #[test]
    fn cancel_latches_and_queues() {
        let claim = {
            let mut claim = AbilityClaim::new();
            claim.begin_targeting();
            claim
        };
        let handle = claim.cancellation();
        assert!(!handle.is_cancelled());

        handle.inject(Injection::SkipStage);
        handle.inject(Injection::CancelClaim);
        assert!(handle.is_cancelled());
        assert_eq!(handle.next_injection(), Some(Injection::SkipStage));
        assert_eq!(handle.next_injection(), Some(Injection::CancelClaim));
        assert_eq!(handle.next_injection(), None);
    }

    #[test]
    fn new_cycle_gets_a_fresh_handle() {
        let mut claim = AbilityClaim::new();
        claim.begin_targeting();
        claim.cancellation().inject(Injection::CancelClaim);
        claim.release();

        claim.begin_targeting();
        assert!(!claim.cancellation().is_cancelled());
        assert!(!claim.cancellation().has_pending());
    }
}
