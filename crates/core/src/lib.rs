//! Deterministic simulation core for the ability/effect/attribute framework.
//!
//! `aegis-core` defines the canonical rules: attribute aggregation and the
//! modification pipeline, the timed-effect state machine, ability claims and
//! activation gating, weighted-tag bookkeeping, and the deferred end-of-frame
//! pipeline. All state mutation flows through [`engine::Engine`]; the crate
//! is pure and synchronous, with orchestration and I/O living in supporting
//! crates that depend on the types re-exported here.

pub mod ability;
pub mod attribute;
pub mod config;
pub mod effect;
pub mod engine;
pub mod frame;
pub mod state;
pub mod tag;
pub mod types;

pub use ability::{
    AbilityClaim, AbilityDefinition, ActivationGate, ActivationPolicy, CancellationHandle,
    ClaimPhase, GateDecision, Injection, StageFlags, StageSpec,
};
pub use attribute::{
    AppliedChange, AttributeAggregate, AttributeStore, AttributeValue, ChangeHook, ChangeObserver,
    ChangeRequest, ClampPolicy, Contribution, ModificationPipeline, ModifiedValue,
    RetentionPolicy, ValueBias,
};
pub use config::SimConfig;
pub use effect::{
    AffiliationPolicy, AttributeModifier, DurationPolicy, EffectDefinition, EffectInstance,
    EffectShelf, Magnitude, MagnitudeContext, PcgStream, PeriodicPolicy, ReapplyDuration,
    ReapplyMerge, StackScaling, TickReport, ValueComponent,
};
pub use engine::{EffectOverview, Engine};
pub use frame::{
    AnalysisWorker, DeferredAction, FrameListener, FrameSummary, ImpactRecord, InvalidatedAction,
};
pub use state::{AbilitySlot, EntityState, SimState};
pub use tag::{
    Predicate, Requirement, RequirementContext, TagMultiset, TagRequirement, TagWorker,
    TagWorkerSet, WorkerContext,
};
pub use types::{
    AttributeId, AttributeInfo, AttributeRegistry, EffectHandle, EntityId, TagId, TagRegistry,
};
