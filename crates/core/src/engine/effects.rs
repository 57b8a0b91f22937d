//! Effect application, re-application, ticking support, and removal.

use std::sync::Arc;

use super::Engine;
use crate::attribute::{Contribution, ModifiedValue, RetentionPolicy};
use crate::effect::{
    AffiliationPolicy, EffectDefinition, MagnitudeContext, ReapplyDuration, ReapplyMerge,
    ValueComponent,
};
use crate::tag::{Requirement, RequirementContext};
use crate::types::{EffectHandle, EntityId};

/// Read-only view of one live effect for the query surface.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectOverview {
    pub handle: EffectHandle,
    pub name: String,
    pub remaining: f32,
    pub total: f32,
    pub stacks: u32,
}

fn component_change(component: ValueComponent, scalar: f32) -> ModifiedValue {
    match component {
        ValueComponent::Current => ModifiedValue::current(scalar),
        ValueComponent::Base => ModifiedValue::base(scalar),
        ValueComponent::Both => ModifiedValue::new(scalar, scalar),
    }
}

impl Engine {
    /// Applies an effect definition from `source` against `target` at level
    /// zero. Returns false when any gate refuses; nothing changes in that
    /// case.
    pub fn apply_effect(
        &mut self,
        source: EntityId,
        target: EntityId,
        definition: &Arc<EffectDefinition>,
    ) -> bool {
        self.apply_effect_at_level(source, target, definition, 0)
    }

    pub fn apply_effect_at_level(
        &mut self,
        source: EntityId,
        target: EntityId,
        definition: &Arc<EffectDefinition>,
        level: u32,
    ) -> bool {
        if !self.state.contains(target) {
            return false;
        }
        if !self.affiliation_allows(definition.affiliation, source, target) {
            return false;
        }
        if !self.requirement_holds(&definition.application_requirement, source, target) {
            return false;
        }

        if definition.duration.is_instant() {
            return self.apply_instant(source, target, definition, level);
        }

        let existing = self
            .state
            .entity(target)
            .and_then(|entity| entity.shelf.find_by_name(&definition.name))
            .map(|fx| fx.handle());
        match existing {
            Some(handle) => self.reapply(source, target, definition, level, handle),
            None => self
                .shelve_fresh(source, target, definition, level)
                .is_some(),
        }
    }

    /// Removes one applied instance: contributions come off the ledgers,
    /// granted tags are rescinded, and the instance leaves the shelf.
    pub fn remove_effect(&mut self, target: EntityId, handle: EffectHandle) -> bool {
        let Some(entity) = self.state.entity(target) else {
            return false;
        };
        let Some(fx) = entity.shelf.get(handle) else {
            return false;
        };
        let definition = Arc::clone(fx.definition());
        let source = fx.source();
        let ongoing = fx.is_ongoing();

        if ongoing {
            self.uninstall_continuous(source, target, &definition, handle);
            if let Some(entity) = self.state.entity_mut(target) {
                entity.tags.remove_tags(&definition.granted_tags);
            }
        }
        if let Some(entity) = self.state.entity_mut(target) {
            if let Some(fx) = entity.shelf.get_mut(handle) {
                fx.mark_removed();
            }
            entity.shelf.unshelve(handle);
        }
        true
    }

    /// Live effects on one entity, in application order.
    pub fn active_effects(&self, entity: EntityId) -> Vec<EffectOverview> {
        let Some(entity) = self.state.entity(entity) else {
            return Vec::new();
        };
        entity
            .shelf
            .iter()
            .map(|fx| EffectOverview {
                handle: fx.handle(),
                name: fx.definition().name.clone(),
                remaining: fx.duration_remaining(),
                total: fx.duration_total(),
                stacks: fx.stacks(),
            })
            .collect()
    }

    // ===== application paths =====

    fn apply_instant(
        &mut self,
        source: EntityId,
        target: EntityId,
        definition: &Arc<EffectDefinition>,
        level: u32,
    ) -> bool {
        let Some(changes) = self.evaluate_modifiers(source, target, level, 1, definition) else {
            return false;
        };
        // Instant applications fold: there is no instance to remove later.
        for (modifier, change) in definition.modifiers.iter().zip(changes) {
            let contribution = Contribution::new(
                source,
                target,
                EffectHandle::ORIGIN,
                modifier.attribute,
                RetentionPolicy::Fold,
            );
            self.apply_change(contribution, change, modifier.clamp, true);
        }
        for sub in &definition.contained {
            self.apply_effect_at_level(source, target, sub, level);
        }
        true
    }

    /// Shelves a fresh instance and installs its presence. Returns the new
    /// handle, or `None` when the shelf is full.
    fn shelve_fresh(
        &mut self,
        source: EntityId,
        target: EntityId,
        definition: &Arc<EffectDefinition>,
        level: u32,
    ) -> Option<EffectHandle> {
        let entity = self.state.entity_mut(target)?;
        let handle = entity.shelf.shelve(Arc::clone(definition), source, level)?;
        entity.tags.add_tags(&definition.granted_tags);

        if let Some(periodic) = definition.periodic {
            if periodic.tick_on_application {
                self.execute_tick(target, handle);
            }
        } else {
            self.install_continuous(source, target, definition, handle, level, 1);
        }

        for sub in &definition.contained {
            self.apply_effect_at_level(source, target, sub, level);
        }
        Some(handle)
    }

    /// Resolves a re-application along the merge axis, then the duration
    /// axis, independently.
    fn reapply(
        &mut self,
        source: EntityId,
        target: EntityId,
        definition: &Arc<EffectDefinition>,
        level: u32,
        existing: EffectHandle,
    ) -> bool {
        let mut fresh = false;
        let surviving = match definition.merge {
            ReapplyMerge::DoNothing => existing,
            ReapplyMerge::ReplaceExisting => {
                self.remove_effect(target, existing);
                fresh = true;
                match self.shelve_fresh(source, target, definition, level) {
                    Some(handle) => handle,
                    None => return false,
                }
            }
            ReapplyMerge::AppendNew => {
                fresh = true;
                match self.shelve_fresh(source, target, definition, level) {
                    Some(handle) => handle,
                    None => return false,
                }
            }
            ReapplyMerge::StackExisting => {
                let stacks = match self
                    .state
                    .entity_mut(target)
                    .and_then(|entity| entity.shelf.get_mut(existing))
                {
                    Some(fx) => fx.stack(),
                    None => return false,
                };
                self.rescale_continuous(target, existing, stacks);
                existing
            }
        };

        let mut clock_moved = false;
        if let Some(entity) = self.state.entity_mut(target)
            && let Some(fx) = entity.shelf.get_mut(surviving)
        {
            match definition.duration_interaction {
                ReapplyDuration::DoNothing => {}
                ReapplyDuration::Refresh => {
                    fx.refresh();
                    clock_moved = true;
                }
                ReapplyDuration::Extend => {
                    fx.extend();
                    clock_moved = true;
                }
            }
        }

        // Fresh shelving already ticked on application; only refresh/extend
        // on a surviving instance owes one here.
        if !fresh
            && clock_moved
            && definition.periodic.is_some_and(|p| p.tick_on_application)
        {
            self.execute_tick(target, surviving);
        }
        true
    }

    // ===== modifier plumbing =====

    /// Evaluates every modifier of a definition against the current state.
    /// Returns `None` when the target is missing.
    fn evaluate_modifiers(
        &mut self,
        source: EntityId,
        target: EntityId,
        level: u32,
        stacks: u32,
        definition: &EffectDefinition,
    ) -> Option<Vec<ModifiedValue>> {
        let target_entity = self.state.entity(target)?;
        let source_store = self.state.entity(source).map(|e| &e.attributes);
        let scale = definition.stack_scaling.multiplier(stacks);

        let mut ctx = MagnitudeContext {
            source: source_store,
            target: &target_entity.attributes,
            target_tags: &target_entity.tags,
            level,
            stacks,
            rng: &mut self.rng,
        };
        Some(
            definition
                .modifiers
                .iter()
                .map(|modifier| {
                    component_change(modifier.component, modifier.magnitude.evaluate(&mut ctx) * scale)
                })
                .collect(),
        )
    }

    /// Applies a durational instance's modifiers as standing contributions.
    pub(crate) fn install_continuous(
        &mut self,
        source: EntityId,
        target: EntityId,
        definition: &Arc<EffectDefinition>,
        handle: EffectHandle,
        level: u32,
        stacks: u32,
    ) {
        let Some(changes) = self.evaluate_modifiers(source, target, level, stacks, definition)
        else {
            return;
        };
        for (modifier, change) in definition.modifiers.iter().zip(changes) {
            let contribution =
                Contribution::new(source, target, handle, modifier.attribute, modifier.retention);
            self.apply_change(contribution, change, modifier.clamp, true);
        }
    }

    /// Takes a durational instance's tracked contributions back off the
    /// ledgers, re-clamping each touched aggregate.
    pub(crate) fn uninstall_continuous(
        &mut self,
        source: EntityId,
        target: EntityId,
        definition: &Arc<EffectDefinition>,
        handle: EffectHandle,
    ) {
        for modifier in &definition.modifiers {
            let contribution =
                Contribution::new(source, target, handle, modifier.attribute, modifier.retention);
            if self.remove_contribution(&contribution)
                && let Some(aggregate) = self
                    .state
                    .entity_mut(target)
                    .and_then(|e| e.attributes.aggregate_mut(modifier.attribute))
            {
                aggregate.apply_clamp(modifier.clamp);
            }
        }
    }

    /// Recomputes a stacked instance's standing contributions at its new
    /// stack count. Folded modifiers cannot be rescaled and are skipped.
    fn rescale_continuous(&mut self, target: EntityId, handle: EffectHandle, stacks: u32) {
        let Some((definition, source, level, periodic)) = self
            .state
            .entity(target)
            .and_then(|entity| entity.shelf.get(handle))
            .map(|fx| {
                (
                    Arc::clone(fx.definition()),
                    fx.source(),
                    fx.level(),
                    fx.definition().periodic.is_some(),
                )
            })
        else {
            return;
        };
        // Periodic instances carry no standing contributions; the stack
        // count scales their future ticks instead.
        if periodic {
            return;
        }
        let Some(changes) = self.evaluate_modifiers(source, target, level, stacks, &definition)
        else {
            return;
        };
        for (modifier, change) in definition.modifiers.iter().zip(changes) {
            if modifier.retention != RetentionPolicy::Tracked {
                continue;
            }
            let contribution =
                Contribution::new(source, target, handle, modifier.attribute, modifier.retention);
            if let Some(aggregate) = self
                .state
                .entity_mut(target)
                .and_then(|e| e.attributes.aggregate_mut(modifier.attribute))
            {
                aggregate.set(contribution, change.as_offset());
                aggregate.apply_clamp(modifier.clamp);
            }
        }
    }

    /// One periodic execute tick: the instance's modifiers land as folded,
    /// irreversible changes scaled by the current stack count.
    pub(crate) fn execute_tick(&mut self, target: EntityId, handle: EffectHandle) -> bool {
        let Some((definition, source, level, stacks)) = self
            .state
            .entity(target)
            .and_then(|entity| entity.shelf.get(handle))
            .filter(|fx| fx.is_ongoing())
            .map(|fx| {
                (
                    Arc::clone(fx.definition()),
                    fx.source(),
                    fx.level(),
                    fx.stacks(),
                )
            })
        else {
            return false;
        };
        let Some(changes) = self.evaluate_modifiers(source, target, level, stacks, &definition)
        else {
            return false;
        };
        for (modifier, change) in definition.modifiers.iter().zip(changes) {
            let contribution = Contribution::new(
                source,
                target,
                handle,
                modifier.attribute,
                RetentionPolicy::Fold,
            );
            self.apply_change(contribution, change, modifier.clamp, true);
        }
        true
    }

    // ===== gates =====

    pub(crate) fn affiliation_allows(
        &self,
        policy: AffiliationPolicy,
        source: EntityId,
        target: EntityId,
    ) -> bool {
        match policy {
            AffiliationPolicy::Any => true,
            AffiliationPolicy::SelfOnly => source == target,
            AffiliationPolicy::Allies => match (self.state.entity(source), self.state.entity(target)) {
                (Some(a), Some(b)) => a.team == b.team,
                _ => false,
            },
            AffiliationPolicy::Enemies => {
                match (self.state.entity(source), self.state.entity(target)) {
                    (Some(a), Some(b)) => a.team != b.team,
                    _ => false,
                }
            }
        }
    }

    pub(crate) fn requirement_holds(
        &self,
        requirement: &Requirement,
        source: EntityId,
        target: EntityId,
    ) -> bool {
        if requirement.is_vacuous() {
            return true;
        }
        let Some(entity) = self.state.entity(target) else {
            return false;
        };
        requirement.satisfied_by(&RequirementContext {
            source,
            target,
            attributes: &entity.attributes,
            tags: &entity.tags,
        })
    }
}
