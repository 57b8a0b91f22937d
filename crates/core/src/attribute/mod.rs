//! Attribute subsystem: values, contribution ledgers, and the modification
//! pipeline.

mod aggregate;
mod contribution;
mod hooks;
mod pipeline;
mod store;
mod value;

pub use aggregate::{AttributeAggregate, ClampPolicy};
pub use contribution::{Contribution, RetentionPolicy};
pub use hooks::{AppliedChange, ChangeHook, ChangeObserver, ChangeRequest};
pub use pipeline::ModificationPipeline;
pub use store::AttributeStore;
pub use value::{AttributeValue, ModifiedValue, ValueBias};
