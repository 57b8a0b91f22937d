//! Timed-effect definitions, instances, and per-entity shelving.

mod definition;
mod instance;
mod magnitude;
mod rng;
mod shelf;

pub use definition::{
    AffiliationPolicy, AttributeModifier, DurationPolicy, EffectDefinition, PeriodicPolicy,
    ReapplyDuration, ReapplyMerge, StackScaling, ValueComponent,
};
pub use instance::{EffectInstance, TickReport};
pub use magnitude::{Magnitude, MagnitudeContext};
pub use rng::PcgStream;
pub use shelf::EffectShelf;
