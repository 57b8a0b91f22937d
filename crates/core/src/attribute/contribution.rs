//! Contribution identity: who put a value slice into an attribute.

use crate::types::{AttributeId, EffectHandle, EntityId};

/// Governs whether a contribution is tracked in the aggregate's ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetentionPolicy {
    /// Ledger entry kept per contribution; removable later by key.
    #[default]
    Tracked,
    /// Folded into the running total only; removing a folded contribution
    /// is a no-op.
    Fold,
}

/// Identifies the origin of one slice of an attribute's value.
///
/// The full tuple is the ledger key: `grant` distinguishes repeated
/// applications of the same effect definition, so each application stays
/// individually removable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contribution {
    /// Entity whose action produced the value.
    pub source: EntityId,
    /// Entity whose attribute holds the value.
    pub target: EntityId,
    /// The applied effect (or ability grant) owning this slice.
    pub grant: EffectHandle,
    /// The attribute being contributed to.
    pub attribute: AttributeId,
    /// Whether this slice is individually removable.
    pub retention: RetentionPolicy,
}

impl Contribution {
    pub fn new(
        source: EntityId,
        target: EntityId,
        grant: EffectHandle,
        attribute: AttributeId,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            source,
            target,
            grant,
            attribute,
            retention,
        }
    }

    /// The reserved contribution created when an attribute is registered,
    /// carrying the entity's starting value.
    pub fn origin(owner: EntityId, attribute: AttributeId) -> Self {
        Self::new(
            owner,
            owner,
            EffectHandle::ORIGIN,
            attribute,
            RetentionPolicy::Tracked,
        )
    }

    pub fn is_tracked(&self) -> bool {
        self.retention == RetentionPolicy::Tracked
    }
}
