//! Identity types and the owned registries that issue them.
//!
//! Attributes and tags are interned: authoring collaborators register names
//! once and every other subsystem passes around cheap `Copy` ids. The
//! registries are explicit owned objects injected into the engine at
//! construction, never ambient global state.

use std::collections::HashMap;
use std::fmt;

/// Unique identifier for any entity tracked by the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl EntityId {
    /// Reserved identifier for system-originated changes (frame pipeline,
    /// built-in hooks). Never assigned to a spawned entity.
    pub const SYSTEM: Self = Self(u32::MAX);

    /// Returns true if this id represents the system actor.
    #[inline]
    pub const fn is_system(self) -> bool {
        self.0 == Self::SYSTEM.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Interned handle to a registered attribute.
///
/// Two attributes are the same attribute exactly when they were registered
/// under the same name; the registry guarantees name → id is injective, so
/// id equality is name equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeId(pub u16);

/// Interned handle to a registered gameplay tag. Defaults to the first
/// registered tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagId(pub u16);

/// Identifies one applied effect (or ability grant) on an entity.
///
/// Handles are issued per entity in application order and are the unit that
/// keys attribute contributions, so repeated applications of the same
/// definition stay individually removable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectHandle(pub u32);

impl EffectHandle {
    /// Reserved handle for the contribution created at attribute
    /// registration (the entity's starting value).
    pub const ORIGIN: Self = Self(0);
}

impl fmt::Display for EffectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fx:{}", self.0)
    }
}

/// Descriptive data held for a registered attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,
    pub description: String,
}

/// Owned registry interning attribute names.
///
/// Registration is idempotent: registering a known name returns the existing
/// id and leaves the description untouched.
#[derive(Debug, Default)]
pub struct AttributeRegistry {
    entries: Vec<AttributeInfo>,
    by_name: HashMap<String, AttributeId>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an attribute name, returning its id.
    pub fn register(&mut self, name: &str, description: &str) -> AttributeId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = AttributeId(self.entries.len() as u16);
        self.entries.push(AttributeInfo {
            name: name.to_owned(),
            description: description.to_owned(),
        });
        self.by_name.insert(name.to_owned(), id);
        id
    }

    /// Looks up a registered attribute by name.
    pub fn lookup(&self, name: &str) -> Option<AttributeId> {
        self.by_name.get(name).copied()
    }

    /// Returns the descriptive data for an id, if registered.
    pub fn info(&self, id: AttributeId) -> Option<&AttributeInfo> {
        self.entries.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates all registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = AttributeId> + '_ {
        (0..self.entries.len()).map(|i| AttributeId(i as u16))
    }
}

/// Owned registry interning gameplay tag names.
#[derive(Debug, Default)]
pub struct TagRegistry {
    names: Vec<String>,
    by_name: HashMap<String, TagId>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tag name, returning its id. Idempotent.
    pub fn register(&mut self, name: &str) -> TagId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = TagId(self.names.len() as u16);
        self.names.push(name.to_owned());
        self.by_name.insert(name.to_owned(), id);
        id
    }

    /// Looks up a registered tag by name.
    pub fn lookup(&self, name: &str) -> Option<TagId> {
        self.by_name.get(name).copied()
    }

    /// Returns the name behind an id, if registered.
    pub fn name(&self, id: TagId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent() {
        let mut registry = AttributeRegistry::new();
        let health = registry.register("health", "hit points");
        let again = registry.register("health", "ignored on re-register");

        assert_eq!(health, again);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.info(health).unwrap().description, "hit points");
    }

    #[test]
    fn distinct_names_get_distinct_ids() {
        let mut registry = TagRegistry::new();
        let burning = registry.register("state.burning");
        let stunned = registry.register("state.stunned");

        assert_ne!(burning, stunned);
        assert_eq!(registry.lookup("state.burning"), Some(burning));
        assert_eq!(registry.name(stunned), Some("state.stunned"));
    }
}
