//! Weighted-tag bookkeeping, requirement gating, and tag-driven workers.

mod multiset;
mod requirement;
mod worker;

pub use multiset::TagMultiset;
pub use requirement::{Predicate, Requirement, RequirementContext, TagRequirement};
pub use worker::{TagWorker, TagWorkerSet, WorkerContext};
