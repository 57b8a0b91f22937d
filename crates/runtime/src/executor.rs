//! Async ability-stage executor.
//!
//! Drives one activation cycle of an ability: gate request, targeting,
//! commit, then the stage sequence. Cancellation is cooperative: the
//! executor observes the claim's injection mailbox at every stage boundary
//! and the stage tasks poll the cancellation flag themselves. The claim is
//! released exactly once no matter how the cycle ends; [`ClaimGuard`] posts
//! the release from `Drop` on every early-exit path.

use std::sync::Arc;

use aegis_core::{AbilityDefinition, CancellationHandle, EntityId, GateDecision, Injection};
use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::Result;
use crate::handle::RuntimeHandle;

/// How a stage task ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    /// The task observed the cancellation flag and wound itself down.
    Cancelled,
}

/// How a whole activation cycle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed,
    Cancelled,
    /// The gate queued the request; a fresh cycle starts when the worker
    /// activates it.
    Queued,
    Rejected,
    TargetingFailed,
}

/// What a stage task gets to work with. Cloned handles only, so maintained
/// stages can run detached.
pub struct StageContext {
    pub handle: RuntimeHandle,
    pub entity: EntityId,
    pub target: Option<EntityId>,
    /// True when the preceding stage was skipped with
    /// [`Injection::SkipStageExtend`].
    pub extended: bool,
    pub cancellation: CancellationHandle,
    stop: watch::Receiver<bool>,
}

impl StageContext {
    /// Completes when a stop-maintained injection or the end of the claim
    /// stops this stage. Only maintained stages ever observe a stop.
    pub async fn stopped(&mut self) {
        while !*self.stop.borrow() {
            if self.stop.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }
}

/// One stage of gameplay work.
#[async_trait]
pub trait StageTask: Send + Sync {
    async fn run(&self, ctx: &mut StageContext) -> StageOutcome;
}

/// Target selection during the targeting phase.
pub struct TargetingContext {
    pub handle: RuntimeHandle,
    pub entity: EntityId,
    pub cancellation: CancellationHandle,
}

#[async_trait]
pub trait TargetingTask: Send + Sync {
    /// Picks a target, or `None` to abort the cycle before commit.
    async fn select(&self, ctx: &mut TargetingContext) -> Option<EntityId>;
}

/// Posts the claim release to the worker when dropped, unless disarmed by
/// an explicit [`release`](ClaimGuard::release). Both paths send at most
/// once, and the claim itself ignores a second release.
pub struct ClaimGuard {
    entity: EntityId,
    ability: usize,
    releases: mpsc::UnboundedSender<(EntityId, usize)>,
    armed: bool,
}

impl ClaimGuard {
    pub(crate) fn new(
        entity: EntityId,
        ability: usize,
        releases: mpsc::UnboundedSender<(EntityId, usize)>,
    ) -> Self {
        Self {
            entity,
            ability,
            releases,
            armed: true,
        }
    }

    /// Releases the claim now.
    pub fn release(mut self) {
        self.armed = false;
        let _ = self.releases.send((self.entity, self.ability));
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.releases.send((self.entity, self.ability));
        }
    }
}

type MaintainedStage = (watch::Sender<bool>, JoinHandle<StageOutcome>);

/// Drives one activation cycle of one ability slot.
///
/// Stage tasks are attached in order and pair with the definition's stage
/// specs by index; a spec with no task is a timing placeholder and is
/// skipped. Maintained stages are spawned and keep running while the
/// sequence moves on, until a stop injection or the end of the cycle.
pub struct AbilityExecutor {
    handle: RuntimeHandle,
    entity: EntityId,
    ability: usize,
    definition: Arc<AbilityDefinition>,
    targeting: Option<Arc<dyn TargetingTask>>,
    stages: Vec<Arc<dyn StageTask>>,
}

impl AbilityExecutor {
    pub fn new(
        handle: RuntimeHandle,
        entity: EntityId,
        ability: usize,
        definition: Arc<AbilityDefinition>,
    ) -> Self {
        Self {
            handle,
            entity,
            ability,
            definition,
            targeting: None,
            stages: Vec::new(),
        }
    }

    pub fn targeting(mut self, task: impl TargetingTask + 'static) -> Self {
        self.targeting = Some(Arc::new(task));
        self
    }

    pub fn stage(mut self, task: impl StageTask + 'static) -> Self {
        self.stages.push(Arc::new(task));
        self
    }

    /// Runs the cycle to completion.
    pub async fn execute(self) -> Result<ExecutionOutcome> {
        match self.handle.activate_ability(self.entity, self.ability).await? {
            GateDecision::Activated => {}
            GateDecision::Queued => return Ok(ExecutionOutcome::Queued),
            GateDecision::Rejected => return Ok(ExecutionOutcome::Rejected),
        }
        let cancellation = self.handle.cancellation(self.entity, self.ability).await?;
        let guard = self.handle.claim_guard(self.entity, self.ability);

        // Targeting phase; aborting here releases the claim via the guard.
        let target = match &self.targeting {
            Some(task) => {
                let mut ctx = TargetingContext {
                    handle: self.handle.clone(),
                    entity: self.entity,
                    cancellation: cancellation.clone(),
                };
                match task.select(&mut ctx).await {
                    Some(candidate)
                        if self
                            .handle
                            .check_targeting(self.entity, self.ability, candidate)
                            .await? =>
                    {
                        Some(candidate)
                    }
                    _ => return Ok(ExecutionOutcome::TargetingFailed),
                }
            }
            None => None,
        };
        if cancellation.is_cancelled() {
            return Ok(ExecutionOutcome::Cancelled);
        }
        if !self.handle.commit_activation(self.entity, self.ability).await? {
            return Ok(ExecutionOutcome::Rejected);
        }

        let mut maintained: Vec<MaintainedStage> = Vec::new();
        let mut skip_next = false;
        let mut extend_next = false;
        let mut outcome = ExecutionOutcome::Completed;

        'stages: for (index, spec) in self.definition.stages.iter().enumerate() {
            // Injections are observed at stage boundaries only.
            while let Some(injection) = cancellation.next_injection() {
                debug!(entity = %self.entity, ability = self.ability, %injection, "injection");
                match injection {
                    Injection::CancelClaim => {
                        outcome = ExecutionOutcome::Cancelled;
                        break 'stages;
                    }
                    Injection::SkipStage => skip_next = true,
                    Injection::SkipStageExtend => {
                        skip_next = true;
                        extend_next = true;
                    }
                    Injection::StopMaintainedRecent => {
                        if let Some((stop, _)) = maintained.last() {
                            let _ = stop.send(true);
                        }
                    }
                    Injection::StopMaintainedAll => stop_all(&maintained),
                }
            }
            if cancellation.is_cancelled() {
                outcome = ExecutionOutcome::Cancelled;
                break;
            }
            if std::mem::take(&mut skip_next) {
                continue;
            }
            let Some(task) = self.stages.get(index) else {
                continue;
            };

            let (stop_tx, stop_rx) = watch::channel(false);
            let mut ctx = StageContext {
                handle: self.handle.clone(),
                entity: self.entity,
                target,
                extended: std::mem::take(&mut extend_next),
                cancellation: cancellation.clone(),
                stop: stop_rx,
            };

            if spec.is_maintained() {
                let task = Arc::clone(task);
                maintained.push((stop_tx, tokio::spawn(async move { task.run(&mut ctx).await })));
            } else if task.run(&mut ctx).await == StageOutcome::Cancelled {
                outcome = ExecutionOutcome::Cancelled;
                break;
            }
        }

        // Wind down maintained stages before the claim goes back to idle.
        stop_all(&maintained);
        for (_, join) in maintained {
            let _ = join.await;
        }
        guard.release();
        Ok(outcome)
    }
}

fn stop_all(maintained: &[MaintainedStage]) {
    for (stop, _) in maintained {
        let _ = stop.send(true);
    }
}
