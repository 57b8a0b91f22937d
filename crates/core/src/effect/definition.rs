//! Authored effect descriptions.
//!
//! Definitions are immutable, data-only, and `Arc`-shared: the engine only
//! reads them. Runtime state for one application lives in
//! [`EffectInstance`](super::EffectInstance).

use std::sync::Arc;

use super::magnitude::Magnitude;
use crate::attribute::{ClampPolicy, RetentionPolicy};
use crate::tag::Requirement;
use crate::types::TagId;

/// How long an applied effect lives.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DurationPolicy {
    /// Applies its modifiers once and never shelves.
    #[default]
    Instant,
    /// Lives for a fixed number of seconds.
    Durational(f32),
    /// Lives until explicitly removed; never expires from duration.
    Infinite,
}

impl DurationPolicy {
    pub fn is_instant(&self) -> bool {
        matches!(self, Self::Instant)
    }
}

/// Container resolution when a definition is applied while an instance of it
/// already exists on the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReapplyMerge {
    /// The new application is dropped.
    #[default]
    DoNothing,
    /// The existing instance is removed and the new one applied fresh.
    ReplaceExisting,
    /// A second independent instance is shelved alongside the first.
    AppendNew,
    /// The existing instance gains a stack, up to `max_stacks`.
    StackExisting,
}

/// Duration resolution on re-application, orthogonal to the merge axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReapplyDuration {
    /// Remaining duration is untouched.
    #[default]
    DoNothing,
    /// Remaining duration resets to the full authored duration.
    Refresh,
    /// The full authored duration is added on top of what remains.
    Extend,
}

/// Maps the stack count of a stacked instance to a magnitude multiplier.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StackScaling {
    /// Stacks do not change magnitude.
    #[default]
    Single,
    /// Magnitude scales linearly with the stack count.
    Linear,
    /// Authored per-stack multipliers, indexed by `stacks - 1` and clamped
    /// to the last sample.
    Curve(Vec<f32>),
}

impl StackScaling {
    pub fn multiplier(&self, stacks: u32) -> f32 {
        match self {
            Self::Single => 1.0,
            Self::Linear => stacks.max(1) as f32,
            Self::Curve(samples) => {
                if samples.is_empty() {
                    return 1.0;
                }
                let index = (stacks.max(1) as usize - 1).min(samples.len() - 1);
                samples[index]
            }
        }
    }
}

/// Periodic execute-tick schedule.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeriodicPolicy {
    /// Seconds between execute ticks.
    pub interval: f32,
    /// Yield one synchronous execute tick immediately on successful
    /// application, refresh or extend.
    pub tick_on_application: bool,
}

/// Who a definition may legally target relative to its source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AffiliationPolicy {
    #[default]
    Any,
    SelfOnly,
    Allies,
    Enemies,
}

/// Which component(s) of the attribute pair a modifier writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueComponent {
    #[default]
    Current,
    Base,
    Both,
}

/// One attribute change carried by an effect.
#[derive(Clone, Debug)]
pub struct AttributeModifier {
    pub attribute: crate::types::AttributeId,
    pub component: ValueComponent,
    pub magnitude: Magnitude,
    pub clamp: ClampPolicy,
    pub retention: RetentionPolicy,
}

/// Static description of one effect: policies, requirements, modifiers and
/// contained sub-effects.
#[derive(Clone, Debug, Default)]
pub struct EffectDefinition {
    pub name: String,
    pub duration: DurationPolicy,
    pub merge: ReapplyMerge,
    pub duration_interaction: ReapplyDuration,
    pub max_stacks: u32,
    pub stack_scaling: StackScaling,
    pub periodic: Option<PeriodicPolicy>,
    /// Tags held on the target while the instance is applied and ongoing.
    pub granted_tags: Vec<TagId>,
    /// Checked once, at application time.
    pub application_requirement: Requirement,
    /// Re-checked every handling pass; failing it pauses the instance.
    pub ongoing_requirement: Requirement,
    /// Re-checked every handling pass; passing it removes the instance.
    pub removal_requirement: Requirement,
    pub modifiers: Vec<AttributeModifier>,
    /// Sub-effects applied alongside the parent on successful application.
    pub contained: Vec<Arc<EffectDefinition>>,
    pub affiliation: AffiliationPolicy,
}

impl EffectDefinition {
    /// Authored duration in seconds, when durational.
    pub fn authored_duration(&self) -> Option<f32> {
        match self.duration {
            DurationPolicy::Durational(secs) => Some(secs),
            _ => None,
        }
    }

    /// Effective stack ceiling; unstackable definitions cap at one.
    pub fn stack_cap(&self) -> u32 {
        if self.merge == ReapplyMerge::StackExisting {
            self.max_stacks.max(1)
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_scaling_multipliers() {
        assert_eq!(StackScaling::Single.multiplier(5), 1.0);
        assert_eq!(StackScaling::Linear.multiplier(3), 3.0);

        let curve = StackScaling::Curve(vec![1.0, 1.8, 2.4]);
        assert_eq!(curve.multiplier(1), 1.0);
        assert_eq!(curve.multiplier(2), 1.8);
        // past the last sample: clamped
        assert_eq!(curve.multiplier(9), 2.4);
        assert_eq!(StackScaling::Curve(vec![]).multiplier(4), 1.0);
    }

    #[test]
    fn stack_cap_requires_stacking_merge() {
        let mut definition = EffectDefinition {
            max_stacks: 5,
            ..Default::default()
        };
        assert_eq!(definition.stack_cap(), 1);

        definition.merge = ReapplyMerge::StackExisting;
        assert_eq!(definition.stack_cap(), 5);
    }
}
