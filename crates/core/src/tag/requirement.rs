//! Requirement gating for effect application and ability activation.

use std::fmt;
use std::sync::Arc;

use super::multiset::TagMultiset;
use crate::attribute::AttributeStore;
use crate::types::{EntityId, TagId};

/// Tag-based gate: every required tag must be applied and no blocked tag may
/// be applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagRequirement {
    pub required: Vec<TagId>,
    pub blocked: Vec<TagId>,
}

impl TagRequirement {
    pub fn new(required: Vec<TagId>, blocked: Vec<TagId>) -> Self {
        Self { required, blocked }
    }

    pub fn satisfied_by(&self, tags: &TagMultiset) -> bool {
        self.required.iter().all(|&tag| tags.has(tag))
            && self.blocked.iter().all(|&tag| !tags.has(tag))
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.blocked.is_empty()
    }
}

/// What a custom predicate gets to look at: the target entity's state plus
/// the identities of both parties.
pub struct RequirementContext<'a> {
    pub source: EntityId,
    pub target: EntityId,
    pub attributes: &'a AttributeStore,
    pub tags: &'a TagMultiset,
}

/// Authored validation predicate attached to a requirement.
pub trait Predicate: Send + Sync {
    fn check(&self, ctx: &RequirementContext<'_>) -> bool;
}

/// Full requirement: tag gate plus an optional custom predicate. Both must
/// hold.
#[derive(Clone, Default)]
pub struct Requirement {
    pub tags: TagRequirement,
    pub predicate: Option<Arc<dyn Predicate>>,
}

impl Requirement {
    pub fn tags_only(tags: TagRequirement) -> Self {
        Self {
            tags,
            predicate: None,
        }
    }

    pub fn satisfied_by(&self, ctx: &RequirementContext<'_>) -> bool {
        if !self.tags.satisfied_by(ctx.tags) {
            return false;
        }
        match &self.predicate {
            Some(predicate) => predicate.check(ctx),
            None => true,
        }
    }

    /// True when the requirement can never fail.
    pub fn is_vacuous(&self) -> bool {
        self.tags.is_empty() && self.predicate.is_none()
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirement")
            .field("tags", &self.tags)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeValue;
    use crate::types::AttributeId;

    struct CurrentAbove(f32);

    impl Predicate for CurrentAbove {
        fn check(&self, ctx: &RequirementContext<'_>) -> bool {
            ctx.attributes.current(AttributeId(0)).unwrap_or(0.0) > self.0
        }
    }

    fn context<'a>(
        attributes: &'a AttributeStore,
        tags: &'a TagMultiset,
    ) -> RequirementContext<'a> {
        RequirementContext {
            source: EntityId(1),
            target: EntityId(2),
            attributes,
            tags,
        }
    }

    #[test]
    fn blocked_tag_fails_the_gate() {
        let requirement = TagRequirement::new(vec![TagId(0)], vec![TagId(1)]);
        let mut tags = TagMultiset::new();
        tags.add_tags(&[TagId(0)]);
        assert!(requirement.satisfied_by(&tags));

        tags.add_tags(&[TagId(1)]);
        assert!(!requirement.satisfied_by(&tags));
    }

    #[test]
    fn predicate_and_tags_must_both_hold() {
        let mut attributes = AttributeStore::new(EntityId(2));
        attributes.register(AttributeId(0), AttributeValue::uniform(50.0));
        let mut tags = TagMultiset::new();
        tags.add_tags(&[TagId(3)]);

        let requirement = Requirement {
            tags: TagRequirement::new(vec![TagId(3)], vec![]),
            predicate: Some(Arc::new(CurrentAbove(40.0))),
        };
        assert!(requirement.satisfied_by(&context(&attributes, &tags)));

        let strict = Requirement {
            tags: TagRequirement::new(vec![TagId(3)], vec![]),
            predicate: Some(Arc::new(CurrentAbove(60.0))),
        };
        assert!(!strict.satisfied_by(&context(&attributes, &tags)));
    }

    #[test]
    fn empty_requirement_always_passes() {
        let attributes = AttributeStore::new(EntityId(2));
        let tags = TagMultiset::new();
        let requirement = Requirement::default();
        assert!(requirement.is_vacuous());
        assert!(requirement.satisfied_by(&context(&attributes, &tags)));
    }
}
