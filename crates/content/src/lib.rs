//! Data-driven content for the simulation core.
//!
//! Attribute sets, effects and abilities are authored in RON, embedded at
//! compile time, and resolved against the interned registries into the
//! `Arc`-shared definitions [`aegis_core::Engine`] consumes. Loading is
//! all-or-nothing: a misspelled attribute, a dangling effect reference or a
//! containment cycle fails the whole catalog with a [`ContentError`].

mod error;
mod library;
mod schema;

pub use error::ContentError;
pub use library::ContentLibrary;
pub use schema::{
    AbilityData, AttributeSeedData, AttributeSet, AttributeSetData, EffectData, MagnitudeData,
    ModifierData, StageData, TagGateData,
};
