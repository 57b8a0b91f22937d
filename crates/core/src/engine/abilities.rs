//! Ability claims through the per-entity activation gate.

use std::sync::Arc;

use super::Engine;
use crate::ability::{AbilityDefinition, GateDecision, Injection};
use crate::types::EntityId;

impl Engine {
    /// Grants an ability to an entity, returning its slot index.
    pub fn grant_ability(
        &mut self,
        entity: EntityId,
        definition: Arc<AbilityDefinition>,
    ) -> Option<usize> {
        self.state.entity_mut(entity)?.grant_ability(definition)
    }

    /// Requests activation of an ability slot. On `Activated` the claim
    /// enters targeting; on `Queued` it waits its turn; on `Rejected`
    /// nothing changed.
    pub fn request_activation(&mut self, entity: EntityId, ability: usize) -> GateDecision {
        let Some(entity_state) = self.state.entity_mut(entity) else {
            return GateDecision::Rejected;
        };
        let Some(slot) = entity_state.abilities.get(ability) else {
            return GateDecision::Rejected;
        };
        if !slot.claim.is_idle() {
            return GateDecision::Rejected;
        }
        let policy = slot.definition.policy;
        let critical = slot.definition.has_critical_section();
        let identity_tag = slot.definition.identity_tag;

        let decision = entity_state.gate.request(ability, policy, critical, identity_tag);
        if decision == GateDecision::Activated
            && let Some(slot) = entity_state.abilities.get_mut(ability)
        {
            slot.claim.begin_targeting();
        }
        decision
    }

    /// Checks the ability's targeting requirement against a chosen target.
    pub fn check_targeting(&self, entity: EntityId, ability: usize, target: EntityId) -> bool {
        let Some(slot) = self
            .state
            .entity(entity)
            .and_then(|e| e.ability(ability))
        else {
            return false;
        };
        self.requirement_holds(&slot.definition.targeting, entity, target)
    }

    /// Commits a targeting claim to active and applies the ability's cost
    /// effect to the caster.
    pub fn commit_activation(&mut self, entity: EntityId, ability: usize) -> bool {
        let Some(slot) = self
            .state
            .entity_mut(entity)
            .and_then(|e| e.ability_mut(ability))
        else {
            return false;
        };
        if !slot.claim.commit_active() {
            return false;
        }
        let cost = slot.definition.cost.clone();
        if let Some(cost) = cost {
            self.apply_effect(entity, entity, &cost);
        }
        true
    }

    /// Releases a claim back to idle. Exactly-once: a second release of the
    /// same cycle is a no-op returning `None`. Applies the cooldown effect
    /// and hands back the next queued slot index, if the release unblocked
    /// one.
    pub fn release_claim(&mut self, entity: EntityId, ability: usize) -> Option<usize> {
        let entity_state = self.state.entity_mut(entity)?;
        let slot = entity_state.abilities.get_mut(ability)?;
        if !slot.claim.release() {
            return None;
        }
        let policy = slot.definition.policy;
        let cooldown = slot.definition.cooldown.clone();
        let next = entity_state.gate.release(ability, policy);

        if let Some(cooldown) = cooldown {
            self.apply_effect(entity, entity, &cooldown);
        }
        next
    }

    /// Posts a cooperative injection at a claim. Returns false when the
    /// claim is idle.
    pub fn inject(&mut self, entity: EntityId, ability: usize, injection: Injection) -> bool {
        let Some(slot) = self
            .state
            .entity(entity)
            .and_then(|e| e.ability(ability))
        else {
            return false;
        };
        if slot.claim.is_idle() {
            return false;
        }
        slot.claim.cancellation().inject(injection);
        true
    }

    /// Seconds an ability's claim has been held, keyed by its identity tag.
    pub fn claim_elapsed(&self, entity: EntityId, ability: usize) -> Option<f32> {
        let entity_state = self.state.entity(entity)?;
        let slot = entity_state.ability(ability)?;
        entity_state.gate.elapsed(slot.definition.identity_tag)
    }
}
