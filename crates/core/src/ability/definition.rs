//! Authored ability descriptions.

use std::sync::Arc;

use bitflags::bitflags;

use crate::effect::EffectDefinition;
use crate::tag::Requirement;
use crate::types::TagId;

/// How an entity's activation gate treats requests for this ability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActivationPolicy {
    /// Anything may run concurrently, except that two critical-section
    /// abilities under this policy may not overlap.
    #[default]
    Unrestricted,
    /// Requests are refused while a critical-section ability under this
    /// policy is active.
    SingleActive,
    /// Same refusal rule, but refused requests queue FIFO and auto-activate
    /// when the blocking claim releases.
    SingleActiveQueued,
}

bitflags! {
    /// Behavioral markers on one stage of an ability's sequence.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct StageFlags: u8 {
        /// Mutually exclusive with other critical-section abilities in the
        /// same policy bucket.
        const CRITICAL_SECTION = 1 << 0;
        /// Keeps running after the stage sequence moves on, until stopped
        /// by a stop-maintained injection or claim release.
        const MAINTAINED = 1 << 1;
    }
}

/// One step of an ability's stage sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageSpec {
    pub name: String,
    pub flags: StageFlags,
}

impl StageSpec {
    pub fn new(name: impl Into<String>, flags: StageFlags) -> Self {
        Self {
            name: name.into(),
            flags,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.flags.contains(StageFlags::CRITICAL_SECTION)
    }

    pub fn is_maintained(&self) -> bool {
        self.flags.contains(StageFlags::MAINTAINED)
    }
}

/// Static description of one ability.
#[derive(Clone, Debug, Default)]
pub struct AbilityDefinition {
    pub name: String,
    /// Tag keying this ability's elapsed-time tracker in the gate.
    pub identity_tag: TagId,
    pub policy: ActivationPolicy,
    pub stages: Vec<StageSpec>,
    /// Applied to the caster on activation commit.
    pub cost: Option<Arc<EffectDefinition>>,
    /// Applied to the caster on claim release.
    pub cooldown: Option<Arc<EffectDefinition>>,
    /// Gate on the chosen target, checked during the targeting phase.
    pub targeting: Requirement,
}

impl AbilityDefinition {
    pub fn has_critical_section(&self) -> bool {
        self.stages.iter().any(StageSpec::is_critical)
    }

    pub fn has_maintained_stage(&self) -> bool {
        self.stages.iter().any(StageSpec::is_maintained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_definition_keys_the_first_tag() {
        assert_eq!(AbilityDefinition::default().identity_tag, TagId(0));
    }

    #[test]
    fn critical_section_is_any_stage() {
        let mut definition = AbilityDefinition {
            name: "cleave".into(),
            stages: vec![
                StageSpec::new("windup", StageFlags::empty()),
                StageSpec::new("swing", StageFlags::CRITICAL_SECTION),
            ],
            ..Default::default()
        };
        assert!(definition.has_critical_section());

        definition.stages[1].flags = StageFlags::MAINTAINED;
        assert!(!definition.has_critical_section());
        assert!(definition.has_maintained_stage());
    }
}
