//! Per-entity set of active effect instances.

use std::sync::Arc;

use arrayvec::ArrayVec;

use super::definition::EffectDefinition;
use super::instance::EffectInstance;
use crate::config::SimConfig;
use crate::types::{EffectHandle, EntityId};

/// Owns every applied [`EffectInstance`] on one entity and issues their
/// handles. Handles start at 1; 0 is reserved for registration-time
/// contributions.
#[derive(Debug, Default)]
pub struct EffectShelf {
    instances: ArrayVec<EffectInstance, { SimConfig::MAX_ACTIVE_EFFECTS }>,
    next_handle: u32,
}

impl EffectShelf {
    pub fn new() -> Self {
        Self {
            instances: ArrayVec::new(),
            next_handle: 1,
        }
    }

    /// Shelves a fresh instance, issuing its handle. Returns `None` when
    /// the shelf is full.
    pub fn shelve(
        &mut self,
        definition: Arc<EffectDefinition>,
        source: EntityId,
        level: u32,
    ) -> Option<EffectHandle> {
        if self.instances.is_full() {
            return None;
        }
        let handle = EffectHandle(self.next_handle);
        self.next_handle += 1;
        self.instances
            .push(EffectInstance::new(handle, definition, source, level));
        Some(handle)
    }

    pub fn get(&self, handle: EffectHandle) -> Option<&EffectInstance> {
        self.instances.iter().find(|fx| fx.handle() == handle)
    }

    pub fn get_mut(&mut self, handle: EffectHandle) -> Option<&mut EffectInstance> {
        self.instances.iter_mut().find(|fx| fx.handle() == handle)
    }

    /// The most recently shelved live instance of a named definition.
    pub fn find_by_name(&self, name: &str) -> Option<&EffectInstance> {
        self.instances
            .iter()
            .rev()
            .find(|fx| !fx.is_removed() && fx.definition().name == name)
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut EffectInstance> {
        self.instances
            .iter_mut()
            .rev()
            .find(|fx| !fx.is_removed() && fx.definition().name == name)
    }

    /// Takes one instance off the shelf, live or already marked removed.
    pub fn unshelve(&mut self, handle: EffectHandle) -> Option<EffectInstance> {
        let index = self
            .instances
            .iter()
            .position(|fx| fx.handle() == handle)?;
        Some(self.instances.remove(index))
    }

    /// Drops every instance marked removed, returning them for tag
    /// reconciliation.
    pub fn sweep_removed(&mut self) -> Vec<EffectInstance> {
        let mut swept = Vec::new();
        let mut index = 0;
        while index < self.instances.len() {
            if self.instances[index].is_removed() {
                swept.push(self.instances.remove(index));
            } else {
                index += 1;
            }
        }
        swept
    }

    /// Live instances, in application order.
    pub fn iter(&self) -> impl Iterator<Item = &EffectInstance> {
        self.instances.iter().filter(|fx| !fx.is_removed())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EffectInstance> {
        self.instances.iter_mut().filter(|fx| !fx.is_removed())
    }

    /// Handles of live instances, in application order.
    pub fn handles(&self) -> Vec<EffectHandle> {
        self.iter().map(|fx| fx.handle()).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
