//! Ability definitions, claims, and activation gating.

mod claim;
mod definition;
mod gate;

pub use claim::{AbilityClaim, CancellationHandle, ClaimPhase, Injection};
pub use definition::{AbilityDefinition, ActivationPolicy, StageFlags, StageSpec};
pub use gate::{ActivationGate, GateDecision};
