//! Events published by the simulation worker.

use aegis_core::{EffectHandle, EntityId, FrameSummary, ImpactRecord};

/// Broadcast to every subscriber as the worker processes commands and ends
/// frames. Slow subscribers lag and miss events; the simulation never waits
/// for them.
#[derive(Clone, Debug)]
pub enum SimEvent {
    /// The end-of-frame pipeline ran; carries the full frame summary.
    FrameCompleted(FrameSummary),
    /// One attribute change landed this frame.
    Impact(ImpactRecord),
    /// An entity's lethal attribute reached zero.
    Death(EntityId),
    /// An ability claim was activated, directly or from the queue.
    AbilityStarted { entity: EntityId, ability: usize },
    /// An ability claim was released.
    AbilityEnded { entity: EntityId, ability: usize },
    /// An effect definition was successfully applied.
    EffectApplied {
        source: EntityId,
        target: EntityId,
        name: String,
    },
    /// An applied effect was explicitly removed.
    EffectRemoved {
        target: EntityId,
        handle: EffectHandle,
    },
}
