//! Per-entity attribute storage.

use std::collections::HashMap;

use super::aggregate::AttributeAggregate;
use super::contribution::Contribution;
use super::value::AttributeValue;
use crate::types::{AttributeId, EntityId};

/// All registered attributes of one entity, keyed by id.
///
/// Registration seeds the aggregate with an origin contribution holding the
/// starting value, so the ledger invariant covers the initial value too.
/// Re-registering a known attribute is a no-op.
#[derive(Debug)]
pub struct AttributeStore {
    owner: EntityId,
    aggregates: HashMap<AttributeId, AttributeAggregate>,
}

impl AttributeStore {
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            aggregates: HashMap::new(),
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Registers an attribute with its starting value. Returns false (and
    /// changes nothing) if the attribute is already registered.
    pub fn register(&mut self, attribute: AttributeId, initial: AttributeValue) -> bool {
        if self.aggregates.contains_key(&attribute) {
            return false;
        }
        let mut aggregate = AttributeAggregate::new();
        aggregate.add(Contribution::origin(self.owner, attribute), initial);
        self.aggregates.insert(attribute, aggregate);
        true
    }

    pub fn is_registered(&self, attribute: AttributeId) -> bool {
        self.aggregates.contains_key(&attribute)
    }

    /// Running total for an attribute, if registered.
    pub fn value(&self, attribute: AttributeId) -> Option<AttributeValue> {
        self.aggregates.get(&attribute).map(|a| a.value())
    }

    /// Current component shortcut for the query surface.
    pub fn current(&self, attribute: AttributeId) -> Option<f32> {
        self.value(attribute).map(|v| v.current)
    }

    /// Base component shortcut for the query surface.
    pub fn base(&self, attribute: AttributeId) -> Option<f32> {
        self.value(attribute).map(|v| v.base)
    }

    pub fn aggregate(&self, attribute: AttributeId) -> Option<&AttributeAggregate> {
        self.aggregates.get(&attribute)
    }

    pub fn aggregate_mut(&mut self, attribute: AttributeId) -> Option<&mut AttributeAggregate> {
        self.aggregates.get_mut(&attribute)
    }

    /// Iterates registered attribute ids.
    pub fn attributes(&self) -> impl Iterator<Item = AttributeId> + '_ {
        self.aggregates.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_is_noop() {
        let mut store = AttributeStore::new(EntityId(7));
        assert!(store.register(AttributeId(0), AttributeValue::uniform(100.0)));
        assert!(!store.register(AttributeId(0), AttributeValue::uniform(50.0)));

        assert_eq!(
            store.value(AttributeId(0)),
            Some(AttributeValue::uniform(100.0))
        );
    }

    #[test]
    fn unregistered_attribute_reads_none() {
        let store = AttributeStore::new(EntityId(7));
        assert_eq!(store.value(AttributeId(3)), None);
        assert_eq!(store.current(AttributeId(3)), None);
    }
}
