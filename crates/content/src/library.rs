//! The embedded content catalog.
//!
//! Three RON documents are compiled into the binary: attribute sets,
//! effects, and abilities. Loading resolves them in that order, so effects
//! may reference any attribute a set defines and abilities may reference
//! any effect in the catalog.

use std::collections::HashMap;
use std::sync::Arc;

use aegis_core::{AbilityDefinition, AttributeRegistry, EffectDefinition, TagRegistry};
use serde::de::DeserializeOwned;

use crate::error::ContentError;
use crate::schema::{AbilityData, AttributeSet, AttributeSetData, EffectData};

const ATTRIBUTE_SETS: &str = include_str!("../data/attribute_sets.ron");
const EFFECTS: &str = include_str!("../data/effects.ron");
const ABILITIES: &str = include_str!("../data/abilities.ron");

fn parse<T: DeserializeOwned>(file: &'static str, source: &str) -> Result<Vec<T>, ContentError> {
    ron::from_str(source).map_err(|source| ContentError::Parse { file, source })
}

/// Every resolved definition, indexed by authored name.
pub struct ContentLibrary {
    attribute_sets: HashMap<String, AttributeSet>,
    effects: HashMap<String, Arc<EffectDefinition>>,
    abilities: HashMap<String, Arc<AbilityDefinition>>,
}

impl ContentLibrary {
    /// Loads the embedded catalogs, interning every authored name into the
    /// given registries. The registries are then handed to the engine.
    pub fn load(
        attributes: &mut AttributeRegistry,
        tags: &mut TagRegistry,
    ) -> Result<Self, ContentError> {
        Self::from_sources(
            ("attribute_sets.ron", ATTRIBUTE_SETS),
            ("effects.ron", EFFECTS),
            ("abilities.ron", ABILITIES),
            attributes,
            tags,
        )
    }

    /// Loads caller-supplied RON documents, each tagged with a file name for
    /// error reporting. The embedded catalogs go through this same path.
    pub fn from_sources(
        attribute_sets: (&'static str, &str),
        effects: (&'static str, &str),
        abilities: (&'static str, &str),
        attributes: &mut AttributeRegistry,
        tags: &mut TagRegistry,
    ) -> Result<Self, ContentError> {
        let set_data: Vec<AttributeSetData> = parse(attribute_sets.0, attribute_sets.1)?;
        let effect_data: Vec<EffectData> = parse(effects.0, effects.1)?;
        let ability_data: Vec<AbilityData> = parse(abilities.0, abilities.1)?;

        let mut sets = HashMap::new();
        for data in &set_data {
            let set = data.resolve(attributes);
            if sets.insert(set.name.clone(), set).is_some() {
                return Err(ContentError::Duplicate(data.name.clone()));
            }
        }

        let mut raw = HashMap::new();
        for data in effect_data {
            let name = data.name.clone();
            if raw.insert(name.clone(), data).is_some() {
                return Err(ContentError::Duplicate(name));
            }
        }

        // Contained effects resolve depth-first, so a parent always holds
        // fully resolved children.
        let mut resolved = HashMap::new();
        let mut in_flight = Vec::new();
        for name in raw.keys() {
            resolve_effect(name, &raw, &mut resolved, &mut in_flight, attributes, tags)?;
        }

        let mut abilities_map = HashMap::new();
        for data in ability_data {
            let ability = Arc::new(data.resolve(&resolved, tags)?);
            let name = ability.name.clone();
            if abilities_map.insert(name.clone(), ability).is_some() {
                return Err(ContentError::Duplicate(name));
            }
        }

        Ok(Self {
            attribute_sets: sets,
            effects: resolved,
            abilities: abilities_map,
        })
    }

    pub fn attribute_set(&self, name: &str) -> Option<&AttributeSet> {
        self.attribute_sets.get(name)
    }

    pub fn effect(&self, name: &str) -> Option<&Arc<EffectDefinition>> {
        self.effects.get(name)
    }

    pub fn ability(&self, name: &str) -> Option<&Arc<AbilityDefinition>> {
        self.abilities.get(name)
    }

    pub fn effect_names(&self) -> impl Iterator<Item = &str> {
        self.effects.keys().map(String::as_str)
    }

    pub fn ability_names(&self) -> impl Iterator<Item = &str> {
        self.abilities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attribute_sets.len() + self.effects.len() + self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn resolve_effect(
    name: &str,
    raw: &HashMap<String, EffectData>,
    resolved: &mut HashMap<String, Arc<EffectDefinition>>,
    in_flight: &mut Vec<String>,
    attributes: &AttributeRegistry,
    tags: &mut TagRegistry,
) -> Result<Arc<EffectDefinition>, ContentError> {
    if let Some(done) = resolved.get(name) {
        return Ok(Arc::clone(done));
    }
    if in_flight.iter().any(|pending| pending == name) {
        return Err(ContentError::CyclicContainment(name.to_owned()));
    }
    let data = raw
        .get(name)
        .ok_or_else(|| ContentError::UnknownEffect(name.to_owned()))?;

    in_flight.push(name.to_owned());
    let mut contained = Vec::with_capacity(data.contained.len());
    for child in &data.contained {
        contained.push(resolve_effect(child, raw, resolved, in_flight, attributes, tags)?);
    }
    in_flight.pop();

    let definition = Arc::new(data.resolve(attributes, tags, contained)?);
    resolved.insert(name.to_owned(), Arc::clone(&definition));
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::{
        ActivationPolicy, DurationPolicy, Engine, ReapplyMerge, SimConfig,
    };

    fn load() -> (ContentLibrary, AttributeRegistry, TagRegistry) {
        let mut attributes = AttributeRegistry::new();
        let mut tags = TagRegistry::new();
        let library = ContentLibrary::load(&mut attributes, &mut tags).unwrap();
        (library, attributes, tags)
    }

    #[test]
    fn embedded_catalogs_load() {
        let (library, attributes, tags) = load();

        let warrior = library.attribute_set("warrior").unwrap();
        assert_eq!(warrior.seeds.len(), 4);
        assert!(attributes.lookup("health").is_some());
        assert!(attributes.lookup("power").is_some());

        let burn = library.effect("burn").unwrap();
        assert_eq!(burn.duration, DurationPolicy::Durational(6.0));
        assert_eq!(burn.merge, ReapplyMerge::StackExisting);
        assert_eq!(burn.stack_cap(), 3);
        assert_eq!(burn.periodic.unwrap().interval, 2.0);
        assert!(tags.lookup("state.burning").is_some());

        let cleave = library.ability("cleave").unwrap();
        assert_eq!(cleave.policy, ActivationPolicy::SingleActiveQueued);
        assert!(cleave.has_critical_section());
        assert_eq!(cleave.cost.as_ref().unwrap().name, "cleave_cost");
        assert_eq!(cleave.cooldown.as_ref().unwrap().name, "cleave_cooldown");
    }

    #[test]
    fn contained_effects_resolve_depth_first() {
        let (library, _, _) = load();
        let ignite = library.effect("ignite").unwrap();
        assert_eq!(ignite.contained.len(), 1);
        assert_eq!(ignite.contained[0].name, "burn");
        // the contained entry is the same definition the catalog exposes
        assert!(Arc::ptr_eq(&ignite.contained[0], library.effect("burn").unwrap()));
    }

    #[test]
    fn loaded_effects_apply_through_the_engine() {
        let mut attributes = AttributeRegistry::new();
        let mut tags = TagRegistry::new();
        let library = ContentLibrary::load(&mut attributes, &mut tags).unwrap();
        let health = attributes.lookup("health").unwrap();
        let warrior = library.attribute_set("warrior").unwrap().clone();

        let mut engine = Engine::new(SimConfig::default(), attributes, tags);
        let hero = engine.spawn(0);
        let ogre = engine.spawn(1);
        assert!(warrior.install(&mut engine, hero));
        assert!(warrior.install(&mut engine, ogre));

        // strike: source power 10 * -1.5 = -15 against health 100
        let strike = library.effect("strike").unwrap();
        assert!(engine.apply_effect(hero, ogre, strike));
        assert_eq!(engine.attribute_value(ogre, health).unwrap().current, 85.0);
    }

    #[test]
    fn unknown_attribute_is_an_error() {
        let mut attributes = AttributeRegistry::new();
        let mut tags = TagRegistry::new();
        let result = ContentLibrary::from_sources(
            ("sets.ron", "[]"),
            (
                "fx.ron",
                r#"[(name: "bad", modifiers: [(attribute: "missing", magnitude: Constant(1.0))])]"#,
            ),
            ("abilities.ron", "[]"),
            &mut attributes,
            &mut tags,
        );
        assert!(matches!(result, Err(ContentError::UnknownAttribute(name)) if name == "missing"));
    }

    #[test]
    fn containment_cycles_are_an_error() {
        let mut attributes = AttributeRegistry::new();
        let mut tags = TagRegistry::new();
        let result = ContentLibrary::from_sources(
            ("sets.ron", "[]"),
            (
                "fx.ron",
                r#"[
                    (name: "a", contained: ["b"]),
                    (name: "b", contained: ["a"]),
                ]"#,
            ),
            ("abilities.ron", "[]"),
            &mut attributes,
            &mut tags,
        );
        assert!(matches!(result, Err(ContentError::CyclicContainment(_))));
    }

    #[test]
    fn ability_with_unknown_cost_is_an_error() {
        let mut attributes = AttributeRegistry::new();
        let mut tags = TagRegistry::new();
        let result = ContentLibrary::from_sources(
            ("sets.ron", "[]"),
            ("fx.ron", "[]"),
            (
                "abilities.ron",
                r#"[(name: "kick", cost: Some("missing_fx"))]"#,
            ),
            &mut attributes,
            &mut tags,
        );
        assert!(matches!(result, Err(ContentError::UnknownEffect(name)) if name == "missing_fx"));
    }
}
