//! Client-facing handle to interact with the simulation worker.

use std::sync::Arc;

use aegis_core::{
    AttributeId, AttributeValue, CancellationHandle, ClampPolicy, EffectDefinition, EffectHandle,
    EffectOverview, EntityId, FrameSummary, GateDecision, Injection, ModifiedValue, TagId,
};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::{Result, RuntimeError};
use crate::events::SimEvent;
use crate::executor::ClaimGuard;
use crate::worker::Command;

/// Cloneable façade over the worker's channels. Every gameplay method is a
/// command round trip; errors mean the worker is gone, not that gameplay
/// refused something.
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    release_tx: mpsc::UnboundedSender<(EntityId, usize)>,
    event_tx: broadcast::Sender<SimEvent>,
}

impl RuntimeHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        release_tx: mpsc::UnboundedSender<(EntityId, usize)>,
        event_tx: broadcast::Sender<SimEvent>,
    ) -> Self {
        Self {
            command_tx,
            release_tx,
            event_tx,
        }
    }

    async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Command) -> Result<R> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Applies an effect definition; true when it took hold.
    pub async fn apply_effect(
        &self,
        source: EntityId,
        target: EntityId,
        definition: Arc<EffectDefinition>,
    ) -> Result<bool> {
        self.request(|reply| Command::ApplyEffect {
            source,
            target,
            definition,
            reply,
        })
        .await
    }

    /// Removes an applied effect by handle; true when it existed.
    pub async fn remove_effect(&self, target: EntityId, handle: EffectHandle) -> Result<bool> {
        self.request(|reply| Command::RemoveEffect {
            target,
            handle,
            reply,
        })
        .await
    }

    /// Requests activation of an ability slot.
    pub async fn activate_ability(&self, entity: EntityId, ability: usize) -> Result<GateDecision> {
        self.request(|reply| Command::ActivateAbility {
            entity,
            ability,
            reply,
        })
        .await
    }

    /// Checks the ability's targeting requirement against a candidate.
    pub async fn check_targeting(
        &self,
        entity: EntityId,
        ability: usize,
        target: EntityId,
    ) -> Result<bool> {
        self.request(|reply| Command::CheckTargeting {
            entity,
            ability,
            target,
            reply,
        })
        .await
    }

    /// Commits a targeting claim to active, applying the cost effect.
    pub async fn commit_activation(&self, entity: EntityId, ability: usize) -> Result<bool> {
        self.request(|reply| Command::CommitActivation {
            entity,
            ability,
            reply,
        })
        .await
    }

    /// Posts a cooperative injection at the ability's running claim.
    pub async fn inject(
        &self,
        entity: EntityId,
        ability: usize,
        injection: Injection,
    ) -> Result<bool> {
        self.request(|reply| Command::Inject {
            entity,
            ability,
            injection,
            reply,
        })
        .await
    }

    /// Routes a raw system-level change through the modification pipeline.
    pub async fn modify_attribute(
        &self,
        source: EntityId,
        target: EntityId,
        attribute: AttributeId,
        change: ModifiedValue,
        clamp: ClampPolicy,
    ) -> Result<Option<ModifiedValue>> {
        self.request(|reply| Command::ModifyAttribute {
            source,
            target,
            attribute,
            change,
            clamp,
            reply,
        })
        .await
    }

    /// Advances simulated time and runs the end-of-frame pipeline,
    /// returning the frame summary.
    pub async fn advance_frame(&self, dt: f32) -> Result<FrameSummary> {
        self.request(|reply| Command::AdvanceFrame { dt, reply }).await
    }

    pub async fn attribute(
        &self,
        entity: EntityId,
        attribute: AttributeId,
    ) -> Result<Option<AttributeValue>> {
        self.request(|reply| Command::QueryAttribute {
            entity,
            attribute,
            reply,
        })
        .await
    }

    pub async fn tag_weight(&self, entity: EntityId, tag: TagId) -> Result<u32> {
        self.request(|reply| Command::QueryTagWeight { entity, tag, reply })
            .await
    }

    pub async fn active_effects(&self, entity: EntityId) -> Result<Vec<EffectOverview>> {
        self.request(|reply| Command::QueryEffects { entity, reply })
            .await
    }

    /// Seconds the ability's claim has been held, if it is.
    pub async fn claim_elapsed(&self, entity: EntityId, ability: usize) -> Result<Option<f32>> {
        self.request(|reply| Command::QueryClaimElapsed {
            entity,
            ability,
            reply,
        })
        .await
    }

    /// The cancellation handle of the ability's current claim cycle.
    pub async fn cancellation(
        &self,
        entity: EntityId,
        ability: usize,
    ) -> Result<CancellationHandle> {
        self.request(|reply| Command::QueryCancellation {
            entity,
            ability,
            reply,
        })
        .await?
        .ok_or(RuntimeError::UnknownClaim { entity, ability })
    }

    /// An RAII guard that posts a claim release when dropped.
    pub fn claim_guard(&self, entity: EntityId, ability: usize) -> ClaimGuard {
        ClaimGuard::new(entity, ability, self.release_tx.clone())
    }

    /// Subscribe to simulation events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SimEvent> {
        self.event_tx.subscribe()
    }
}
