//! Simulation worker that owns the authoritative [`Engine`].
//!
//! Receives commands from [`RuntimeHandle`](crate::RuntimeHandle), drives
//! the engine, and publishes [`SimEvent`]s on the broadcast bus. Claim
//! releases arrive on a separate unbounded channel so an RAII guard can
//! post one from a synchronous `Drop`.

use std::sync::Arc;

use aegis_core::{
    AttributeId, AttributeValue, CancellationHandle, ClampPolicy, EffectDefinition, EffectHandle,
    EffectOverview, Engine, EntityId, FrameSummary, GateDecision, Injection, ModifiedValue, TagId,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::events::SimEvent;

/// Commands the worker accepts over the mpsc channel.
pub enum Command {
    ApplyEffect {
        source: EntityId,
        target: EntityId,
        definition: Arc<EffectDefinition>,
        reply: oneshot::Sender<bool>,
    },
    RemoveEffect {
        target: EntityId,
        handle: EffectHandle,
        reply: oneshot::Sender<bool>,
    },
    ActivateAbility {
        entity: EntityId,
        ability: usize,
        reply: oneshot::Sender<GateDecision>,
    },
    CheckTargeting {
        entity: EntityId,
        ability: usize,
        target: EntityId,
        reply: oneshot::Sender<bool>,
    },
    CommitActivation {
        entity: EntityId,
        ability: usize,
        reply: oneshot::Sender<bool>,
    },
    Inject {
        entity: EntityId,
        ability: usize,
        injection: Injection,
        reply: oneshot::Sender<bool>,
    },
    /// Raw system-level attribute modification, outside any effect.
    ModifyAttribute {
        source: EntityId,
        target: EntityId,
        attribute: AttributeId,
        change: ModifiedValue,
        clamp: ClampPolicy,
        reply: oneshot::Sender<Option<ModifiedValue>>,
    },
    /// Advance simulated time, then run the end-of-frame pipeline.
    AdvanceFrame {
        dt: f32,
        reply: oneshot::Sender<FrameSummary>,
    },
    QueryAttribute {
        entity: EntityId,
        attribute: AttributeId,
        reply: oneshot::Sender<Option<AttributeValue>>,
    },
    QueryTagWeight {
        entity: EntityId,
        tag: TagId,
        reply: oneshot::Sender<u32>,
    },
    QueryEffects {
        entity: EntityId,
        reply: oneshot::Sender<Vec<EffectOverview>>,
    },
    QueryClaimElapsed {
        entity: EntityId,
        ability: usize,
        reply: oneshot::Sender<Option<f32>>,
    },
    QueryCancellation {
        entity: EntityId,
        ability: usize,
        reply: oneshot::Sender<Option<CancellationHandle>>,
    },
}

/// Background task that processes gameplay commands against the engine.
pub struct SimulationWorker {
    engine: Engine,
    command_rx: mpsc::Receiver<Command>,
    release_rx: mpsc::UnboundedReceiver<(EntityId, usize)>,
    events: broadcast::Sender<SimEvent>,
}

impl SimulationWorker {
    pub fn new(
        engine: Engine,
        command_rx: mpsc::Receiver<Command>,
        release_rx: mpsc::UnboundedReceiver<(EntityId, usize)>,
        events: broadcast::Sender<SimEvent>,
    ) -> Self {
        info!(entities = engine.state().len(), "simulation worker initialized");
        Self {
            engine,
            command_rx,
            release_rx,
            events,
        }
    }

    /// Main worker loop. Exits when both the command and the release
    /// channels are closed.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => self.handle_command(cmd),
                Some((entity, ability)) = self.release_rx.recv() => {
                    self.handle_release(entity, ability);
                }
                else => break,
            }
        }
        debug!("simulation worker stopped");
    }

    fn emit(&self, event: SimEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.events.send(event);
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::ApplyEffect {
                source,
                target,
                definition,
                reply,
            } => {
                let applied = self.engine.apply_effect(source, target, &definition);
                if applied {
                    self.emit(SimEvent::EffectApplied {
                        source,
                        target,
                        name: definition.name.clone(),
                    });
                }
                if reply.send(applied).is_err() {
                    debug!("ApplyEffect reply channel closed (caller dropped)");
                }
            }

            Command::RemoveEffect {
                target,
                handle,
                reply,
            } => {
                let removed = self.engine.remove_effect(target, handle);
                if removed {
                    self.emit(SimEvent::EffectRemoved { target, handle });
                }
                if reply.send(removed).is_err() {
                    debug!("RemoveEffect reply channel closed (caller dropped)");
                }
            }

            Command::ActivateAbility {
                entity,
                ability,
                reply,
            } => {
                let decision = self.engine.request_activation(entity, ability);
                debug!(%entity, ability, %decision, "activation requested");
                if decision == GateDecision::Activated {
                    self.emit(SimEvent::AbilityStarted { entity, ability });
                }
                if reply.send(decision).is_err() {
                    debug!("ActivateAbility reply channel closed (caller dropped)");
                }
            }

            Command::CheckTargeting {
                entity,
                ability,
                target,
                reply,
            } => {
                let ok = self.engine.check_targeting(entity, ability, target);
                if reply.send(ok).is_err() {
                    debug!("CheckTargeting reply channel closed (caller dropped)");
                }
            }

            Command::CommitActivation {
                entity,
                ability,
                reply,
            } => {
                let committed = self.engine.commit_activation(entity, ability);
                if reply.send(committed).is_err() {
                    debug!("CommitActivation reply channel closed (caller dropped)");
                }
            }

            Command::Inject {
                entity,
                ability,
                injection,
                reply,
            } => {
                let posted = self.engine.inject(entity, ability, injection);
                debug!(%entity, ability, %injection, posted, "injection posted");
                if reply.send(posted).is_err() {
                    debug!("Inject reply channel closed (caller dropped)");
                }
            }

            Command::ModifyAttribute {
                source,
                target,
                attribute,
                change,
                clamp,
                reply,
            } => {
                let real = self
                    .engine
                    .modify_attribute(source, target, attribute, change, clamp);
                if reply.send(real).is_err() {
                    debug!("ModifyAttribute reply channel closed (caller dropped)");
                }
            }

            Command::AdvanceFrame { dt, reply } => {
                self.engine.advance(dt);
                let summary = self.engine.end_frame();
                for impact in &summary.impacts {
                    self.emit(SimEvent::Impact(impact.clone()));
                }
                for &death in &summary.deaths {
                    self.emit(SimEvent::Death(death));
                }
                self.emit(SimEvent::FrameCompleted(summary.clone()));
                if reply.send(summary).is_err() {
                    debug!("AdvanceFrame reply channel closed (caller dropped)");
                }
            }

            Command::QueryAttribute {
                entity,
                attribute,
                reply,
            } => {
                let _ = reply.send(self.engine.attribute_value(entity, attribute));
            }

            Command::QueryTagWeight { entity, tag, reply } => {
                let _ = reply.send(self.engine.tag_weight(entity, tag));
            }

            Command::QueryEffects { entity, reply } => {
                let _ = reply.send(self.engine.active_effects(entity));
            }

            Command::QueryClaimElapsed {
                entity,
                ability,
                reply,
            } => {
                let _ = reply.send(self.engine.claim_elapsed(entity, ability));
            }

            Command::QueryCancellation {
                entity,
                ability,
                reply,
            } => {
                let handle = self
                    .engine
                    .state()
                    .entity(entity)
                    .and_then(|e| e.ability(ability))
                    .map(|slot| slot.claim.cancellation());
                let _ = reply.send(handle);
            }
        }
    }

    /// Releases a claim posted by a [`ClaimGuard`](crate::ClaimGuard). When
    /// the release unblocks a queued request, the follower is activated here
    /// so queued activations never wait for a client round trip.
    fn handle_release(&mut self, entity: EntityId, ability: usize) {
        let was_claimed = self
            .engine
            .state()
            .entity(entity)
            .and_then(|e| e.ability(ability))
            .is_some_and(|slot| !slot.claim.is_idle());

        let next = self.engine.release_claim(entity, ability);
        if was_claimed {
            debug!(%entity, ability, "claim released");
            self.emit(SimEvent::AbilityEnded { entity, ability });
        }

        if let Some(follower) = next
            && self.engine.request_activation(entity, follower) == GateDecision::Activated
        {
            debug!(%entity, follower, "queued follower activated");
            self.emit(SimEvent::AbilityStarted {
                entity,
                ability: follower,
            });
        }
    }
}
