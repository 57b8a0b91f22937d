//! Deferred units of work.

use std::sync::Arc;

use super::summary::InvalidatedAction;
use crate::attribute::{ClampPolicy, ModifiedValue};
use crate::effect::EffectDefinition;
use crate::types::{AttributeId, EffectHandle, EntityId, TagId};

/// One queued side effect, consumed exactly once during an end-of-frame
/// drain. Subsystems that must not retroactively alter the current
/// synchronous pass enqueue these instead of mutating state inline.
#[derive(Clone, Debug)]
pub enum DeferredAction {
    /// Apply an effect definition from source against target.
    ApplyEffect {
        source: EntityId,
        target: EntityId,
        definition: Arc<EffectDefinition>,
    },
    /// Remove one applied effect instance from target.
    RemoveEffect {
        target: EntityId,
        handle: EffectHandle,
    },
    /// Route a raw attribute change through the modification pipeline.
    ModifyAttribute {
        source: EntityId,
        target: EntityId,
        attribute: AttributeId,
        change: ModifiedValue,
        clamp: ClampPolicy,
    },
    /// Increment tag weights on target.
    GrantTags {
        target: EntityId,
        tags: Vec<TagId>,
    },
    /// Decrement tag weights on target.
    RescindTags {
        target: EntityId,
        tags: Vec<TagId>,
    },
    /// Mark an entity for destruction in the frame's final phase.
    MarkDestroyed(EntityId),
    /// Record a failed action in the frame summary.
    Invalidate(InvalidatedAction),
}
