//! Attribute modification pipeline.
//!
//! Every gameplay-driven attribute change flows through
//! [`ModificationPipeline::modify`]: pre-change hooks run in registration
//! order (each may veto or rewrite the pending change), the change lands on
//! the aggregate keyed by its contribution, the clamp policy is applied, and
//! the **real impact** is measured as the before/after delta of the
//! aggregate total. The real impact, not the nominal request, is what
//! downstream damage/death logic may trust.

use std::collections::{HashMap, VecDeque};

use super::aggregate::ClampPolicy;
use super::contribution::Contribution;
use super::hooks::{AppliedChange, ChangeHook, ChangeObserver, ChangeRequest};
use super::store::AttributeStore;
use super::value::ModifiedValue;
use crate::frame::DeferredAction;
use crate::types::AttributeId;

/// Ordered pre/post hook stages, registered per attribute.
#[derive(Default)]
pub struct ModificationPipeline {
    pre: HashMap<AttributeId, Vec<Box<dyn ChangeHook>>>,
    post: HashMap<AttributeId, Vec<Box<dyn ChangeObserver>>>,
}

impl ModificationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pre-change hook for one attribute. Hooks run in
    /// registration order.
    pub fn register_pre(&mut self, attribute: AttributeId, hook: Box<dyn ChangeHook>) {
        self.pre.entry(attribute).or_default().push(hook);
    }

    /// Registers a post-change observer for one attribute.
    pub fn register_post(&mut self, attribute: AttributeId, observer: Box<dyn ChangeObserver>) {
        self.post.entry(attribute).or_default().push(observer);
    }

    /// Routes one modification through the hook stages and the aggregate.
    ///
    /// Returns the real impact, or `None` when the attribute is not
    /// registered on the store or a pre-change hook vetoed the change.
    pub fn modify(
        &mut self,
        store: &mut AttributeStore,
        attribute: AttributeId,
        contribution: Contribution,
        modified: ModifiedValue,
        clamp: ClampPolicy,
        run_hooks: bool,
        queue: &mut VecDeque<DeferredAction>,
    ) -> Option<ModifiedValue> {
        if !store.is_registered(attribute) {
            return None;
        }

        let mut request = ChangeRequest {
            attribute,
            contribution: &contribution,
            change: modified,
        };

        if run_hooks
            && let Some(hooks) = self.pre.get(&attribute)
        {
            for hook in hooks {
                if !hook.validate(&request) {
                    return None;
                }
                hook.apply(&mut request);
            }
        }
        let requested = request.change;

        let aggregate = store.aggregate_mut(attribute)?;
        let before = aggregate.value();
        aggregate.add_modified(contribution, requested);
        aggregate.apply_clamp(clamp);
        let after = aggregate.value();

        let real = ModifiedValue::new(after.current - before.current, after.base - before.base);

        if run_hooks
            && let Some(observers) = self.post.get_mut(&attribute)
        {
            let applied = AppliedChange {
                attribute,
                contribution: &contribution,
                requested,
                real,
                value: after,
            };
            for observer in observers {
                observer.observe(&applied, queue);
            }
        }

        Some(real)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::contribution::RetentionPolicy;
    use crate::attribute::value::AttributeValue;
    use crate::types::{EffectHandle, EntityId};

    fn contribution(grant: u32, attribute: AttributeId) -> Contribution {
        Contribution::new(
            EntityId(1),
            EntityId(2),
            EffectHandle(grant),
            attribute,
            RetentionPolicy::Tracked,
        )
    }

    struct Halve;

    impl ChangeHook for Halve {
        fn apply(&self, request: &mut ChangeRequest<'_>) {
            request.change = ModifiedValue::new(
                request.change.delta_current / 2.0,
                request.change.delta_base / 2.0,
            );
        }
    }

    struct RejectPositive;

    impl ChangeHook for RejectPositive {
        fn validate(&self, request: &ChangeRequest<'_>) -> bool {
            request.change.delta_current <= 0.0
        }
    }

    #[test]
    fn real_impact_reflects_clamping() {
        let health = AttributeId(0);
        let mut store = AttributeStore::new(EntityId(2));
        store.register(health, AttributeValue::uniform(100.0));
        let mut pipeline = ModificationPipeline::new();
        let mut queue = VecDeque::new();

        // -30 lands in full: (100,100) -> (70,100)
        let real = pipeline
            .modify(
                &mut store,
                health,
                contribution(1, health),
                ModifiedValue::current(-30.0),
                ClampPolicy::ZeroToBase,
                true,
                &mut queue,
            )
            .unwrap();
        assert_eq!(real, ModifiedValue::current(-30.0));
        assert_eq!(store.value(health), Some(AttributeValue::new(70.0, 100.0)));

        // -80 clamps at zero: real impact is -70, not -80.
        let real = pipeline
            .modify(
                &mut store,
                health,
                contribution(2, health),
                ModifiedValue::current(-80.0),
                ClampPolicy::ZeroToBase,
                true,
                &mut queue,
            )
            .unwrap();
        assert_eq!(real, ModifiedValue::current(-70.0));
        assert_eq!(store.value(health), Some(AttributeValue::new(0.0, 100.0)));
    }

    #[test]
    fn pre_hook_can_mutate_the_change() {
        let armor = AttributeId(1);
        let mut store = AttributeStore::new(EntityId(2));
        store.register(armor, AttributeValue::ZERO);
        let mut pipeline = ModificationPipeline::new();
        pipeline.register_pre(armor, Box::new(Halve));
        let mut queue = VecDeque::new();

        let real = pipeline
            .modify(
                &mut store,
                armor,
                contribution(1, armor),
                ModifiedValue::current(10.0),
                ClampPolicy::None,
                true,
                &mut queue,
            )
            .unwrap();
        assert_eq!(real, ModifiedValue::current(5.0));
    }

    #[test]
    fn veto_skips_the_change_entirely() {
        let armor = AttributeId(1);
        let mut store = AttributeStore::new(EntityId(2));
        store.register(armor, AttributeValue::ZERO);
        let mut pipeline = ModificationPipeline::new();
        pipeline.register_pre(armor, Box::new(RejectPositive));
        let mut queue = VecDeque::new();

        let vetoed = pipeline.modify(
            &mut store,
            armor,
            contribution(1, armor),
            ModifiedValue::current(4.0),
            ClampPolicy::None,
            true,
            &mut queue,
        );
        assert!(vetoed.is_none());
        assert_eq!(store.value(armor), Some(AttributeValue::ZERO));
    }

    #[test]
    fn hooks_are_bypassed_on_request() {
        let armor = AttributeId(1);
        let mut store = AttributeStore::new(EntityId(2));
        store.register(armor, AttributeValue::ZERO);
        let mut pipeline = ModificationPipeline::new();
        pipeline.register_pre(armor, Box::new(RejectPositive));
        let mut queue = VecDeque::new();

        let real = pipeline
            .modify(
                &mut store,
                armor,
                contribution(1, armor),
                ModifiedValue::current(4.0),
                ClampPolicy::None,
                false,
                &mut queue,
            )
            .unwrap();
        assert_eq!(real, ModifiedValue::current(4.0));
    }

    #[test]
    fn unregistered_attribute_is_a_noop() {
        let mut store = AttributeStore::new(EntityId(2));
        let mut pipeline = ModificationPipeline::new();
        let mut queue = VecDeque::new();

        let missing = AttributeId(9);
        let result = pipeline.modify(
            &mut store,
            missing,
            contribution(1, missing),
            ModifiedValue::current(1.0),
            ClampPolicy::None,
            true,
            &mut queue,
        );
        assert!(result.is_none());
    }
}
