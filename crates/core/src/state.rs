//! Simulation state: entities and the subsystems each one owns.

use std::collections::HashMap;
use std::sync::Arc;

use arrayvec::ArrayVec;

use crate::ability::{AbilityClaim, AbilityDefinition, ActivationGate};
use crate::attribute::AttributeStore;
use crate::config::SimConfig;
use crate::effect::EffectShelf;
use crate::tag::{TagMultiset, TagWorkerSet};
use crate::types::EntityId;

/// One granted ability: its authored definition plus the reusable claim.
pub struct AbilitySlot {
    pub definition: Arc<AbilityDefinition>,
    pub claim: AbilityClaim,
}

impl AbilitySlot {
    pub fn new(definition: Arc<AbilityDefinition>) -> Self {
        Self {
            definition,
            claim: AbilityClaim::new(),
        }
    }
}

/// Everything one entity owns. All mutation of an entity routes through its
/// own subsystems; effects targeting another entity call into that entity's
/// state, so no cross-entity locking exists anywhere in the core.
pub struct EntityState {
    pub id: EntityId,
    /// Affiliation group for ally/enemy targeting checks.
    pub team: u32,
    pub attributes: AttributeStore,
    pub tags: TagMultiset,
    pub shelf: EffectShelf,
    pub gate: ActivationGate,
    pub abilities: ArrayVec<AbilitySlot, { SimConfig::MAX_ABILITIES }>,
    pub workers: TagWorkerSet,
}

impl EntityState {
    pub fn new(id: EntityId, team: u32) -> Self {
        Self {
            id,
            team,
            attributes: AttributeStore::new(id),
            tags: TagMultiset::new(),
            shelf: EffectShelf::new(),
            gate: ActivationGate::new(),
            abilities: ArrayVec::new(),
            workers: TagWorkerSet::new(),
        }
    }

    /// Grants an ability, returning its slot index. Returns `None` when the
    /// entity already holds the maximum number of abilities.
    pub fn grant_ability(&mut self, definition: Arc<AbilityDefinition>) -> Option<usize> {
        if self.abilities.is_full() {
            return None;
        }
        self.abilities.push(AbilitySlot::new(definition));
        Some(self.abilities.len() - 1)
    }

    pub fn ability(&self, index: usize) -> Option<&AbilitySlot> {
        self.abilities.get(index)
    }

    pub fn ability_mut(&mut self, index: usize) -> Option<&mut AbilitySlot> {
        self.abilities.get_mut(index)
    }
}

/// All live entities, keyed by id. Ids are issued monotonically and never
/// reused within one state.
#[derive(Default)]
pub struct SimState {
    entities: HashMap<EntityId, EntityState>,
    next_id: u32,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a fresh entity and returns its id.
    pub fn spawn(&mut self, team: u32) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entities.insert(id, EntityState::new(id, team));
        id
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityState> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut EntityState> {
        self.entities.get_mut(&id)
    }

    /// Removes an entity entirely. Returns whether it existed.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        self.entities.remove(&id).is_some()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityState> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_ids_are_unique() {
        let mut state = SimState::new();
        let a = state.spawn(0);
        let b = state.spawn(1);

        assert_ne!(a, b);
        assert!(state.contains(a));
        assert_eq!(state.entity(b).unwrap().team, 1);
    }

    #[test]
    fn despawn_removes_for_good() {
        let mut state = SimState::new();
        let a = state.spawn(0);
        assert!(state.despawn(a));
        assert!(!state.despawn(a));
        assert!(state.entity(a).is_none());

        // the id is not reissued
        let b = state.spawn(0);
        assert_ne!(a, b);
    }

    #[test]
    fn ability_grants_are_bounded() {
        let mut state = SimState::new();
        let id = state.spawn(0);
        let entity = state.entity_mut(id).unwrap();
        let definition = Arc::new(AbilityDefinition::default());

        for expected in 0..SimConfig::MAX_ABILITIES {
            assert_eq!(
                entity.grant_ability(Arc::clone(&definition)),
                Some(expected)
            );
        }
        assert_eq!(entity.grant_ability(definition), None);
    }
}
