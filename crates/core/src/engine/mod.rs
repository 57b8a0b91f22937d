//! The authoritative simulation engine.
//!
//! The engine owns the world state, the interned registries, the
//! modification pipeline, and the deferred queue, and exposes the gameplay
//! operations: register attributes, apply/remove effects, drive ability
//! claims, advance time, and run the end-of-frame pipeline. Gameplay
//! failures are boolean/no-op returns, never errors; the only control-flow
//! signal in the whole subsystem is cooperative cancellation, and that is
//! absorbed by the runtime executor above this crate.

mod abilities;
mod effects;
mod frame;

pub use effects::EffectOverview;

use std::collections::VecDeque;

use crate::attribute::{
    ChangeHook, ChangeObserver, ClampPolicy, Contribution, ModificationPipeline, ModifiedValue,
    RetentionPolicy,
};
use crate::config::SimConfig;
use crate::effect::PcgStream;
use crate::frame::{AnalysisWorker, DeferredAction, FrameListener, FrameSummary, ImpactRecord};
use crate::state::SimState;
use crate::tag::TagWorker;
use crate::types::{AttributeId, AttributeRegistry, EffectHandle, EntityId, TagRegistry};

pub struct Engine {
    config: SimConfig,
    attributes: AttributeRegistry,
    tags: TagRegistry,
    state: SimState,
    pipeline: ModificationPipeline,
    deferred: VecDeque<DeferredAction>,
    summary: FrameSummary,
    destroy_requests: Vec<EntityId>,
    analysis: Vec<Box<dyn AnalysisWorker>>,
    listeners: Vec<Box<dyn FrameListener>>,
    rng: PcgStream,
    /// Attribute whose current value reaching zero kills the holder.
    lethal_attribute: Option<AttributeId>,
    /// Delta time of the last `advance`, fed to tag workers in `end_frame`.
    frame_dt: f32,
}

impl Engine {
    pub fn new(config: SimConfig, attributes: AttributeRegistry, tags: TagRegistry) -> Self {
        Self::with_seed(config, attributes, tags, 0)
    }

    pub fn with_seed(
        config: SimConfig,
        attributes: AttributeRegistry,
        tags: TagRegistry,
        seed: u64,
    ) -> Self {
        Self {
            config,
            attributes,
            tags,
            state: SimState::new(),
            pipeline: ModificationPipeline::new(),
            deferred: VecDeque::new(),
            summary: FrameSummary::default(),
            destroy_requests: Vec::new(),
            analysis: Vec::new(),
            listeners: Vec::new(),
            rng: PcgStream::new(seed),
            lethal_attribute: None,
            frame_dt: 0.0,
        }
    }

    // ===== accessors =====

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimState {
        &mut self.state
    }

    pub fn attributes(&self) -> &AttributeRegistry {
        &self.attributes
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub fn summary(&self) -> &FrameSummary {
        &self.summary
    }

    // ===== setup =====

    pub fn spawn(&mut self, team: u32) -> EntityId {
        self.state.spawn(team)
    }

    /// Registers an attribute on an entity with its starting value. No-op
    /// (false) when the entity is missing or the attribute already
    /// registered.
    pub fn register_attribute(
        &mut self,
        entity: EntityId,
        attribute: AttributeId,
        initial: crate::attribute::AttributeValue,
    ) -> bool {
        match self.state.entity_mut(entity) {
            Some(entity) => entity.attributes.register(attribute, initial),
            None => false,
        }
    }

    /// Marks the attribute whose current value hitting zero records a death
    /// and a destruction request.
    pub fn set_lethal_attribute(&mut self, attribute: AttributeId) {
        self.lethal_attribute = Some(attribute);
    }

    pub fn register_pre_hook(&mut self, attribute: AttributeId, hook: Box<dyn ChangeHook>) {
        self.pipeline.register_pre(attribute, hook);
    }

    pub fn register_post_hook(&mut self, attribute: AttributeId, observer: Box<dyn ChangeObserver>) {
        self.pipeline.register_post(attribute, observer);
    }

    /// Attaches a tag worker to one entity. No-op when the entity is
    /// missing.
    pub fn register_tag_worker(&mut self, entity: EntityId, worker: Box<dyn TagWorker>) -> bool {
        match self.state.entity_mut(entity) {
            Some(entity) => {
                entity.workers.register(worker);
                true
            }
            None => false,
        }
    }

    pub fn register_analysis_worker(&mut self, worker: Box<dyn AnalysisWorker>) {
        self.analysis.push(worker);
    }

    pub fn register_frame_listener(&mut self, listener: Box<dyn FrameListener>) {
        self.listeners.push(listener);
    }

    /// Enqueues a deferred action for the next end-of-frame drain.
    pub fn enqueue(&mut self, action: DeferredAction) {
        self.deferred.push_back(action);
    }

    // ===== raw attribute modification =====

    /// Routes a raw system-level change through the pipeline. Raw changes
    /// are folded: they leave no ledger entry and cannot be removed later.
    pub fn modify_attribute(
        &mut self,
        source: EntityId,
        target: EntityId,
        attribute: AttributeId,
        change: ModifiedValue,
        clamp: ClampPolicy,
    ) -> Option<ModifiedValue> {
        let contribution =
            Contribution::new(source, target, EffectHandle::ORIGIN, attribute, RetentionPolicy::Fold);
        self.apply_change(contribution, change, clamp, true)
    }

    /// The one funnel every gameplay-driven change goes through: pipeline,
    /// impact record, death check.
    pub(crate) fn apply_change(
        &mut self,
        contribution: Contribution,
        change: ModifiedValue,
        clamp: ClampPolicy,
        run_hooks: bool,
    ) -> Option<ModifiedValue> {
        let target = contribution.target;
        let attribute = contribution.attribute;
        let entity = self.state.entity_mut(target)?;
        let real = self.pipeline.modify(
            &mut entity.attributes,
            attribute,
            contribution,
            change,
            clamp,
            run_hooks,
            &mut self.deferred,
        )?;

        self.summary.record_impact(ImpactRecord {
            source: contribution.source,
            target,
            attribute,
            requested: change,
            real,
        });
        self.check_lethal(target, attribute);
        Some(real)
    }

    /// Removes a tracked contribution without pipeline involvement.
    pub(crate) fn remove_contribution(&mut self, contribution: &Contribution) -> bool {
        let Some(entity) = self.state.entity_mut(contribution.target) else {
            return false;
        };
        match entity.attributes.aggregate_mut(contribution.attribute) {
            Some(aggregate) => aggregate.remove(contribution),
            None => false,
        }
    }

    fn check_lethal(&mut self, target: EntityId, attribute: AttributeId) {
        let Some(lethal) = self.lethal_attribute else {
            return;
        };
        if attribute != lethal {
            return;
        }
        let dead = self
            .state
            .entity(target)
            .and_then(|entity| entity.attributes.current(lethal))
            .is_some_and(|current| current <= 0.0);
        if dead {
            self.summary.record_death(target);
            self.deferred.push_back(DeferredAction::MarkDestroyed(target));
        }
    }

    pub(crate) fn mark_destroyed(&mut self, entity: EntityId) {
        if !self.destroy_requests.contains(&entity) {
            self.destroy_requests.push(entity);
        }
    }

    // ===== query surface =====

    pub fn attribute_value(
        &self,
        entity: EntityId,
        attribute: AttributeId,
    ) -> Option<crate::attribute::AttributeValue> {
        self.state.entity(entity)?.attributes.value(attribute)
    }

    pub fn tag_weight(&self, entity: EntityId, tag: crate::types::TagId) -> u32 {
        self.state
            .entity(entity)
            .map(|e| e.tags.weight(tag))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ability::{AbilityDefinition, ActivationPolicy, GateDecision, StageFlags, StageSpec};
    use crate::attribute::AttributeValue;
    use crate::effect::{
        AttributeModifier, DurationPolicy, EffectDefinition, Magnitude, PeriodicPolicy,
        ReapplyDuration, ReapplyMerge, StackScaling, ValueComponent,
    };
    use crate::frame::InvalidatedAction;
    use crate::tag::{Requirement, TagRequirement, TagWorker, WorkerContext};
    use crate::types::TagId;

    const FOCUS: TagId = TagId(0);
    const EMPOWERED: TagId = TagId(1);
    const MARKED: TagId = TagId(2);

    fn engine() -> (Engine, EntityId, EntityId, AttributeId) {
        let mut attributes = AttributeRegistry::new();
        let health = attributes.register("health", "hit points");
        attributes.register("power", "outgoing damage scale");
        let mut tags = TagRegistry::new();
        tags.register("state.focus");
        tags.register("state.empowered");
        tags.register("state.marked");

        let mut engine = Engine::new(SimConfig::default(), attributes, tags);
        let hero = engine.spawn(0);
        let ogre = engine.spawn(1);
        engine.register_attribute(hero, health, AttributeValue::uniform(100.0));
        engine.register_attribute(ogre, health, AttributeValue::uniform(100.0));
        (engine, hero, ogre, health)
    }

    fn instant_damage(amount: f32, attribute: AttributeId) -> Arc<EffectDefinition> {
        Arc::new(EffectDefinition {
            name: "strike".into(),
            duration: DurationPolicy::Instant,
            modifiers: vec![AttributeModifier {
                attribute,
                component: ValueComponent::Current,
                magnitude: Magnitude::Constant(-amount),
                clamp: crate::attribute::ClampPolicy::ZeroToBase,
                retention: crate::attribute::RetentionPolicy::Fold,
            }],
            ..Default::default()
        })
    }

    fn critical_ability(name: &str, identity: TagId, policy: ActivationPolicy) -> Arc<AbilityDefinition> {
        Arc::new(AbilityDefinition {
            name: name.into(),
            identity_tag: identity,
            policy,
            stages: vec![StageSpec::new("main", StageFlags::CRITICAL_SECTION)],
            ..Default::default()
        })
    }

    #[test]
    fn instant_damage_reports_clamped_real_impact() {
        let (mut engine, hero, ogre, health) = engine();

        // (100,100) - 30 = (70,100), real impact -30
        assert!(engine.apply_effect(hero, ogre, &instant_damage(30.0, health)));
        assert_eq!(
            engine.attribute_value(ogre, health),
            Some(AttributeValue::new(70.0, 100.0))
        );
        assert_eq!(
            engine.summary().impacts.last().unwrap().real,
            ModifiedValue::current(-30.0)
        );

        // 70 - 80 clamps at 0, real impact -70 not -80
        assert!(engine.apply_effect(hero, ogre, &instant_damage(80.0, health)));
        assert_eq!(
            engine.attribute_value(ogre, health),
            Some(AttributeValue::new(0.0, 100.0))
        );
        let last = engine.summary().impacts.last().unwrap();
        assert_eq!(last.requested, ModifiedValue::current(-80.0));
        assert_eq!(last.real, ModifiedValue::current(-70.0));
    }

    #[test]
    fn durational_buff_unwinds_on_expiry() {
        let (mut engine, hero, _, health) = engine();
        let buff = Arc::new(EffectDefinition {
            name: "stoneskin".into(),
            duration: DurationPolicy::Durational(5.0),
            granted_tags: vec![EMPOWERED],
            modifiers: vec![AttributeModifier {
                attribute: health,
                component: ValueComponent::Both,
                magnitude: Magnitude::Constant(20.0),
                clamp: crate::attribute::ClampPolicy::None,
                retention: crate::attribute::RetentionPolicy::Tracked,
            }],
            ..Default::default()
        });

        assert!(engine.apply_effect(hero, hero, &buff));
        assert_eq!(
            engine.attribute_value(hero, health),
            Some(AttributeValue::new(120.0, 120.0))
        );
        assert_eq!(engine.tag_weight(hero, EMPOWERED), 1);
        assert_eq!(engine.active_effects(hero).len(), 1);

        engine.advance(5.5);
        assert_eq!(
            engine.attribute_value(hero, health),
            Some(AttributeValue::new(100.0, 100.0))
        );
        assert_eq!(engine.tag_weight(hero, EMPOWERED), 0);
        assert!(engine.active_effects(hero).is_empty());
    }

    #[test]
    fn stacking_is_bounded_and_rescales() {
        let (mut engine, hero, _, health) = engine();
        let poison = Arc::new(EffectDefinition {
            name: "weaken".into(),
            duration: DurationPolicy::Durational(30.0),
            merge: ReapplyMerge::StackExisting,
            duration_interaction: ReapplyDuration::Refresh,
            max_stacks: 3,
            stack_scaling: StackScaling::Linear,
            modifiers: vec![AttributeModifier {
                attribute: health,
                component: ValueComponent::Current,
                magnitude: Magnitude::Constant(-10.0),
                clamp: crate::attribute::ClampPolicy::None,
                retention: crate::attribute::RetentionPolicy::Tracked,
            }],
            ..Default::default()
        });

        // 3 + 5 applications never exceed 3 stacks: -10 * 3 = -30
        for _ in 0..8 {
            assert!(engine.apply_effect(hero, hero, &poison));
        }
        let effects = engine.active_effects(hero);
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].stacks, 3);
        assert_eq!(
            engine.attribute_value(hero, health),
            Some(AttributeValue::new(70.0, 100.0))
        );
    }

    #[test]
    fn periodic_catchup_yields_multiple_ticks() {
        let (mut engine, hero, ogre, health) = engine();
        let burn = Arc::new(EffectDefinition {
            name: "burn".into(),
            duration: DurationPolicy::Durational(10.0),
            periodic: Some(PeriodicPolicy {
                interval: 1.0,
                tick_on_application: false,
            }),
            modifiers: vec![AttributeModifier {
                attribute: health,
                component: ValueComponent::Current,
                magnitude: Magnitude::Constant(-5.0),
                clamp: crate::attribute::ClampPolicy::ZeroToBase,
                retention: crate::attribute::RetentionPolicy::Fold,
            }],
            ..Default::default()
        });

        assert!(engine.apply_effect(hero, ogre, &burn));
        // 3.5s over a 1s interval: 3 ticks of -5 = -15
        engine.advance(3.5);
        assert_eq!(
            engine.attribute_value(ogre, health),
            Some(AttributeValue::new(85.0, 100.0))
        );
    }

    #[test]
    fn periodic_ticks_stop_at_expiry() {
        let (mut engine, hero, ogre, health) = engine();
        let burn = Arc::new(EffectDefinition {
            name: "burn".into(),
            duration: DurationPolicy::Durational(1.0),
            periodic: Some(PeriodicPolicy {
                interval: 1.0,
                tick_on_application: false,
            }),
            modifiers: vec![AttributeModifier {
                attribute: health,
                component: ValueComponent::Current,
                magnitude: Magnitude::Constant(-5.0),
                clamp: crate::attribute::ClampPolicy::ZeroToBase,
                retention: crate::attribute::RetentionPolicy::Fold,
            }],
            ..Default::default()
        });

        assert!(engine.apply_effect(hero, ogre, &burn));
        // only the 1.0s boundary falls inside the burn's lifetime: one -5
        engine.advance(3.5);
        assert_eq!(
            engine.attribute_value(ogre, health),
            Some(AttributeValue::new(95.0, 100.0))
        );
        assert!(engine.active_effects(ogre).is_empty());
    }

    #[test]
    fn failing_ongoing_requirement_pauses_without_deleting() {
        let (mut engine, hero, _, health) = engine();
        let blessing = Arc::new(EffectDefinition {
            name: "blessing".into(),
            duration: DurationPolicy::Durational(10.0),
            granted_tags: vec![EMPOWERED],
            ongoing_requirement: Requirement::tags_only(TagRequirement::new(vec![FOCUS], vec![])),
            modifiers: vec![AttributeModifier {
                attribute: health,
                component: ValueComponent::Both,
                magnitude: Magnitude::Constant(25.0),
                clamp: crate::attribute::ClampPolicy::None,
                retention: crate::attribute::RetentionPolicy::Tracked,
            }],
            ..Default::default()
        });

        engine.state_mut().entity_mut(hero).unwrap().tags.add_tags(&[FOCUS]);
        assert!(engine.apply_effect(hero, hero, &blessing));
        assert_eq!(
            engine.attribute_value(hero, health),
            Some(AttributeValue::new(125.0, 125.0))
        );

        // losing focus pauses: contribution and tag gone, instance kept
        engine.state_mut().entity_mut(hero).unwrap().tags.remove_tags(&[FOCUS]);
        engine.advance(2.0);
        assert_eq!(
            engine.attribute_value(hero, health),
            Some(AttributeValue::new(100.0, 100.0))
        );
        assert_eq!(engine.tag_weight(hero, EMPOWERED), 0);
        assert_eq!(engine.active_effects(hero).len(), 1);

        // regaining focus resumes; duration kept running while paused
        engine.state_mut().entity_mut(hero).unwrap().tags.add_tags(&[FOCUS]);
        engine.advance(1.0);
        assert_eq!(
            engine.attribute_value(hero, health),
            Some(AttributeValue::new(125.0, 125.0))
        );
        let overview = &engine.active_effects(hero)[0];
        // 10 - 2 - 1 = 7 seconds left
        assert!((overview.remaining - 7.0).abs() < 1e-4);
    }

    #[test]
    fn queued_policy_hands_back_the_follower() {
        let (mut engine, hero, _, _) = engine();
        let a = critical_ability("cleave", EMPOWERED, ActivationPolicy::SingleActiveQueued);
        let b = critical_ability("guard", MARKED, ActivationPolicy::SingleActiveQueued);
        let slot_a = engine.grant_ability(hero, a).unwrap();
        let slot_b = engine.grant_ability(hero, b).unwrap();

        assert_eq!(engine.request_activation(hero, slot_a), GateDecision::Activated);
        assert_eq!(engine.request_activation(hero, slot_b), GateDecision::Queued);

        // releasing the blocker hands back the queued slot
        assert_eq!(engine.release_claim(hero, slot_a), Some(slot_b));
        assert_eq!(engine.request_activation(hero, slot_b), GateDecision::Activated);
    }

    #[test]
    fn single_active_rejection_changes_nothing() {
        let (mut engine, hero, _, _) = engine();
        let a = critical_ability("cleave", EMPOWERED, ActivationPolicy::SingleActive);
        let b = critical_ability("guard", MARKED, ActivationPolicy::SingleActive);
        let slot_a = engine.grant_ability(hero, a).unwrap();
        let slot_b = engine.grant_ability(hero, b).unwrap();

        assert_eq!(engine.request_activation(hero, slot_a), GateDecision::Activated);
        assert_eq!(engine.request_activation(hero, slot_b), GateDecision::Rejected);

        let entity = engine.state().entity(hero).unwrap();
        assert!(entity.abilities[slot_b].claim.is_idle());
        assert!(!entity.gate.is_active(slot_b));
        assert_eq!(engine.claim_elapsed(hero, slot_b), None);
    }

    #[test]
    fn release_is_exactly_once() {
        let (mut engine, hero, _, _) = engine();
        let a = critical_ability("cleave", EMPOWERED, ActivationPolicy::SingleActiveQueued);
        let slot_a = engine.grant_ability(hero, a).unwrap();

        assert_eq!(engine.request_activation(hero, slot_a), GateDecision::Activated);
        engine.release_claim(hero, slot_a);
        // second release of the same cycle is a no-op
        assert_eq!(engine.release_claim(hero, slot_a), None);
        assert!(!engine.state().entity(hero).unwrap().gate.is_active(slot_a));
    }

    struct MarkOnFocus;

    impl TagWorker for MarkOnFocus {
        fn watched(&self) -> TagId {
            FOCUS
        }

        fn activate(&mut self, ctx: &mut WorkerContext<'_>) {
            ctx.queue.push_back(DeferredAction::GrantTags {
                target: ctx.owner,
                tags: vec![MARKED],
            });
        }

        fn resolve(&mut self, ctx: &mut WorkerContext<'_>) {
            ctx.queue.push_back(DeferredAction::RescindTags {
                target: ctx.owner,
                tags: vec![MARKED],
            });
        }
    }

    #[test]
    fn tag_worker_effects_land_through_the_drain() {
        let (mut engine, hero, _, _) = engine();
        engine.register_tag_worker(hero, Box::new(MarkOnFocus));

        engine.state_mut().entity_mut(hero).unwrap().tags.add_tags(&[FOCUS]);
        engine.advance(0.1);
        // not applied until the end-of-frame drain
        assert_eq!(engine.tag_weight(hero, MARKED), 0);

        engine.end_frame();
        assert_eq!(engine.tag_weight(hero, MARKED), 1);

        engine.state_mut().entity_mut(hero).unwrap().tags.remove_tags(&[FOCUS]);
        engine.advance(0.1);
        engine.end_frame();
        assert_eq!(engine.tag_weight(hero, MARKED), 0);
    }

    #[test]
    fn lethal_damage_records_death_and_destroys_in_final_phase() {
        let (mut engine, hero, ogre, health) = engine();
        engine.set_lethal_attribute(health);

        assert!(engine.apply_effect(hero, ogre, &instant_damage(150.0, health)));
        assert_eq!(
            engine.attribute_value(ogre, health),
            Some(AttributeValue::new(0.0, 100.0))
        );
        // still present until the destruction phase runs
        assert!(engine.state().contains(ogre));

        let summary = engine.end_frame();
        assert_eq!(summary.deaths, vec![ogre]);
        assert!(!engine.state().contains(ogre));
    }

    #[test]
    fn invalidated_actions_are_reported_not_errors() {
        let (mut engine, _, _, _) = engine();
        let ghost = EntityId(999);
        engine.enqueue(DeferredAction::GrantTags {
            target: ghost,
            tags: vec![MARKED],
        });

        let summary = engine.end_frame();
        assert_eq!(summary.invalidated.len(), 1);
        assert_eq!(summary.invalidated[0].target, ghost);
    }

    #[test]
    fn enqueued_invalidations_surface_in_the_summary() {
        let (mut engine, hero, _, _) = engine();
        engine.enqueue(DeferredAction::Invalidate(InvalidatedAction::new(
            hero,
            "interrupted mid-swing",
        )));

        let summary = engine.end_frame();
        assert_eq!(summary.invalidated.len(), 1);
        assert_eq!(summary.invalidated[0].target, hero);
    }
}
