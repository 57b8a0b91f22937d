//! Magnitude calculation graph.
//!
//! Magnitudes let effect modifiers scale on:
//! - Attribute values of the source or the target
//! - Authoring-time curves sampled by level
//! - Tag-gated branches and threshold splits
//! - Deterministic random draws
//! - Arithmetic combinations (sum, product, min, max)
//!
//! ## Examples
//!
//! ```ignore
//! // 150% of the source's power plus 10 flat
//! Magnitude::Sum(vec![
//!     Magnitude::AttributeBacked {
//!         attribute: power,
//!         from_source: true,
//!         coefficient: 1.5,
//!         pre_add: 0.0,
//!         post_add: 0.0,
//!     },
//!     Magnitude::Constant(10.0),
//! ])
//! ```

use super::rng::PcgStream;
use crate::attribute::AttributeStore;
use crate::tag::{TagMultiset, TagRequirement};
use crate::types::AttributeId;

/// Everything a magnitude may read while evaluating.
pub struct MagnitudeContext<'a> {
    pub source: Option<&'a AttributeStore>,
    pub target: &'a AttributeStore,
    pub target_tags: &'a TagMultiset,
    /// Authored level of the applying effect.
    pub level: u32,
    /// Current stack count of the owning instance; 1 for unstacked.
    pub stacks: u32,
    pub rng: &'a mut PcgStream,
}

/// Recursive calculation tree producing one scalar per evaluation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Magnitude {
    /// Fixed value.
    Constant(f32),

    /// Authored per-level samples; the level indexes in, clamped to the last
    /// sample. Empty curves evaluate to zero.
    CurveByLevel { samples: Vec<f32> },

    /// `(attribute.current + pre_add) * coefficient + post_add`, read from
    /// the source (when available) or the target. An unregistered attribute
    /// reads as zero.
    AttributeBacked {
        attribute: AttributeId,
        from_source: bool,
        coefficient: f32,
        pre_add: f32,
        post_add: f32,
    },

    /// Branch on a tag requirement against the target.
    Conditional {
        requirement: TagRequirement,
        then: Box<Magnitude>,
        otherwise: Box<Magnitude>,
    },

    /// Branch on whether an input magnitude reaches a threshold.
    Thresholded {
        input: Box<Magnitude>,
        threshold: f32,
        below: Box<Magnitude>,
        above: Box<Magnitude>,
    },

    /// Uniform draw in `[min, max)` from the engine's deterministic stream.
    Randomized { min: f32, max: f32 },

    /// Sum of sub-magnitudes.
    Sum(Vec<Magnitude>),

    /// Product of sub-magnitudes; empty evaluates to 1.
    Product(Vec<Magnitude>),

    /// Minimum of sub-magnitudes; empty evaluates to 0.
    Min(Vec<Magnitude>),

    /// Maximum of sub-magnitudes; empty evaluates to 0.
    Max(Vec<Magnitude>),
}

impl Magnitude {
    pub const ZERO: Self = Self::Constant(0.0);

    pub fn evaluate(&self, ctx: &mut MagnitudeContext<'_>) -> f32 {
        match self {
            Self::Constant(value) => *value,

            Self::CurveByLevel { samples } => {
                if samples.is_empty() {
                    return 0.0;
                }
                let index = (ctx.level as usize).min(samples.len() - 1);
                samples[index]
            }

            Self::AttributeBacked {
                attribute,
                from_source,
                coefficient,
                pre_add,
                post_add,
            } => {
                let store = if *from_source {
                    match ctx.source {
                        Some(source) => source,
                        None => return *post_add,
                    }
                } else {
                    ctx.target
                };
                let current = store.current(*attribute).unwrap_or(0.0);
                (current + pre_add) * coefficient + post_add
            }

            Self::Conditional {
                requirement,
                then,
                otherwise,
            } => {
                if requirement.satisfied_by(ctx.target_tags) {
                    then.evaluate(ctx)
                } else {
                    otherwise.evaluate(ctx)
                }
            }

            Self::Thresholded {
                input,
                threshold,
                below,
                above,
            } => {
                if input.evaluate(ctx) >= *threshold {
                    above.evaluate(ctx)
                } else {
                    below.evaluate(ctx)
                }
            }

            Self::Randomized { min, max } => ctx.rng.range_f32(*min, *max),

            Self::Sum(parts) => parts.iter().map(|p| p.evaluate(ctx)).sum(),

            Self::Product(parts) => parts.iter().map(|p| p.evaluate(ctx)).product(),

            Self::Min(parts) => {
                if parts.is_empty() {
                    return 0.0;
                }
                parts
                    .iter()
                    .map(|p| p.evaluate(ctx))
                    .fold(f32::INFINITY, f32::min)
            }

            Self::Max(parts) => {
                if parts.is_empty() {
                    return 0.0;
                }
                parts
                    .iter()
                    .map(|p| p.evaluate(ctx))
                    .fold(f32::NEG_INFINITY, f32::max)
            }
        }
    }
}
