//! Raw RON schema and its resolution into engine definitions.
//!
//! Authors write attribute, tag and effect names; resolution interns the
//! names against the registries and produces the `Arc`-shared definitions
//! the engine consumes. Policy enums that carry no names deserialize
//! straight from the core types, so the RON syntax tracks the engine
//! vocabulary one to one.

use std::collections::HashMap;
use std::sync::Arc;

use aegis_core::{
    AbilityDefinition, ActivationPolicy, AffiliationPolicy, AttributeId, AttributeModifier,
    AttributeRegistry, AttributeValue, ClampPolicy, DurationPolicy, EffectDefinition, Engine,
    EntityId, Magnitude, PeriodicPolicy, ReapplyDuration, ReapplyMerge, Requirement,
    RetentionPolicy, StackScaling, StageFlags, StageSpec, TagId, TagRegistry, TagRequirement,
    ValueComponent,
};
use serde::Deserialize;

use crate::error::ContentError;

fn intern(names: &[String], tags: &mut TagRegistry) -> Vec<TagId> {
    names.iter().map(|name| tags.register(name)).collect()
}

/// Tag lists by name. Tags are free-form, so resolution registers any name
/// it has not seen before.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TagGateData {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub blocked: Vec<String>,
}

impl TagGateData {
    fn resolve(&self, tags: &mut TagRegistry) -> TagRequirement {
        TagRequirement::new(intern(&self.required, tags), intern(&self.blocked, tags))
    }

    fn resolve_requirement(&self, tags: &mut TagRegistry) -> Requirement {
        Requirement::tags_only(self.resolve(tags))
    }
}

fn one() -> f32 {
    1.0
}

/// Mirror of [`Magnitude`] with attribute and tag names instead of interned
/// ids. Attributes must already be registered (catalogs load attribute sets
/// first), so a misspelled name is an error rather than a silent zero.
#[derive(Clone, Debug, Deserialize)]
pub enum MagnitudeData {
    Constant(f32),
    CurveByLevel {
        samples: Vec<f32>,
    },
    AttributeBacked {
        attribute: String,
        #[serde(default)]
        from_source: bool,
        #[serde(default = "one")]
        coefficient: f32,
        #[serde(default)]
        pre_add: f32,
        #[serde(default)]
        post_add: f32,
    },
    Conditional {
        requirement: TagGateData,
        then: Box<MagnitudeData>,
        otherwise: Box<MagnitudeData>,
    },
    Thresholded {
        input: Box<MagnitudeData>,
        threshold: f32,
        below: Box<MagnitudeData>,
        above: Box<MagnitudeData>,
    },
    Randomized {
        min: f32,
        max: f32,
    },
    Sum(Vec<MagnitudeData>),
    Product(Vec<MagnitudeData>),
    Min(Vec<MagnitudeData>),
    Max(Vec<MagnitudeData>),
}

impl MagnitudeData {
    fn resolve(
        &self,
        attributes: &AttributeRegistry,
        tags: &mut TagRegistry,
    ) -> Result<Magnitude, ContentError> {
        let resolve_all = |parts: &[MagnitudeData], tags: &mut TagRegistry| {
            parts
                .iter()
                .map(|part| part.resolve(attributes, tags))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(match self {
            Self::Constant(value) => Magnitude::Constant(*value),

            Self::CurveByLevel { samples } => Magnitude::CurveByLevel {
                samples: samples.clone(),
            },

            Self::AttributeBacked {
                attribute,
                from_source,
                coefficient,
                pre_add,
                post_add,
            } => Magnitude::AttributeBacked {
                attribute: lookup_attribute(attribute, attributes)?,
                from_source: *from_source,
                coefficient: *coefficient,
                pre_add: *pre_add,
                post_add: *post_add,
            },

            Self::Conditional {
                requirement,
                then,
                otherwise,
            } => Magnitude::Conditional {
                requirement: requirement.resolve(tags),
                then: Box::new(then.resolve(attributes, tags)?),
                otherwise: Box::new(otherwise.resolve(attributes, tags)?),
            },

            Self::Thresholded {
                input,
                threshold,
                below,
                above,
            } => Magnitude::Thresholded {
                input: Box::new(input.resolve(attributes, tags)?),
                threshold: *threshold,
                below: Box::new(below.resolve(attributes, tags)?),
                above: Box::new(above.resolve(attributes, tags)?),
            },

            Self::Randomized { min, max } => Magnitude::Randomized {
                min: *min,
                max: *max,
            },

            Self::Sum(parts) => Magnitude::Sum(resolve_all(parts, tags)?),
            Self::Product(parts) => Magnitude::Product(resolve_all(parts, tags)?),
            Self::Min(parts) => Magnitude::Min(resolve_all(parts, tags)?),
            Self::Max(parts) => Magnitude::Max(resolve_all(parts, tags)?),
        })
    }
}

fn lookup_attribute(
    name: &str,
    attributes: &AttributeRegistry,
) -> Result<AttributeId, ContentError> {
    attributes
        .lookup(name)
        .ok_or_else(|| ContentError::UnknownAttribute(name.to_owned()))
}

/// One attribute change carried by an effect, by name.
#[derive(Clone, Debug, Deserialize)]
pub struct ModifierData {
    pub attribute: String,
    #[serde(default)]
    pub component: ValueComponent,
    pub magnitude: MagnitudeData,
    #[serde(default)]
    pub clamp: ClampPolicy,
    #[serde(default)]
    pub retention: RetentionPolicy,
}

impl ModifierData {
    fn resolve(
        &self,
        attributes: &AttributeRegistry,
        tags: &mut TagRegistry,
    ) -> Result<AttributeModifier, ContentError> {
        Ok(AttributeModifier {
            attribute: lookup_attribute(&self.attribute, attributes)?,
            component: self.component,
            magnitude: self.magnitude.resolve(attributes, tags)?,
            clamp: self.clamp,
            retention: self.retention,
        })
    }
}

fn one_stack() -> u32 {
    1
}

/// One authored effect. Omitted fields take the engine defaults, so an
/// instant one-modifier effect is a two-field entry.
#[derive(Clone, Debug, Deserialize)]
pub struct EffectData {
    pub name: String,
    #[serde(default)]
    pub duration: DurationPolicy,
    #[serde(default)]
    pub merge: ReapplyMerge,
    #[serde(default)]
    pub duration_interaction: ReapplyDuration,
    #[serde(default = "one_stack")]
    pub max_stacks: u32,
    #[serde(default)]
    pub stack_scaling: StackScaling,
    #[serde(default)]
    pub periodic: Option<PeriodicPolicy>,
    #[serde(default)]
    pub granted_tags: Vec<String>,
    #[serde(default)]
    pub application_requirement: TagGateData,
    #[serde(default)]
    pub ongoing_requirement: TagGateData,
    #[serde(default)]
    pub removal_requirement: TagGateData,
    #[serde(default)]
    pub modifiers: Vec<ModifierData>,
    /// Names of other effects in the same catalog, applied alongside this
    /// one on successful application.
    #[serde(default)]
    pub contained: Vec<String>,
    #[serde(default)]
    pub affiliation: AffiliationPolicy,
}

impl EffectData {
    pub(crate) fn resolve(
        &self,
        attributes: &AttributeRegistry,
        tags: &mut TagRegistry,
        contained: Vec<Arc<EffectDefinition>>,
    ) -> Result<EffectDefinition, ContentError> {
        let modifiers = self
            .modifiers
            .iter()
            .map(|modifier| modifier.resolve(attributes, tags))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EffectDefinition {
            name: self.name.clone(),
            duration: self.duration,
            merge: self.merge,
            duration_interaction: self.duration_interaction,
            max_stacks: self.max_stacks,
            stack_scaling: self.stack_scaling.clone(),
            periodic: self.periodic,
            granted_tags: intern(&self.granted_tags, tags),
            application_requirement: self.application_requirement.resolve_requirement(tags),
            ongoing_requirement: self.ongoing_requirement.resolve_requirement(tags),
            removal_requirement: self.removal_requirement.resolve_requirement(tags),
            modifiers,
            contained,
            affiliation: self.affiliation,
        })
    }
}

/// One stage of an authored ability's sequence.
#[derive(Clone, Debug, Deserialize)]
pub struct StageData {
    pub name: String,
    #[serde(default)]
    pub critical_section: bool,
    #[serde(default)]
    pub maintained: bool,
}

impl StageData {
    fn resolve(&self) -> StageSpec {
        let mut flags = StageFlags::empty();
        if self.critical_section {
            flags |= StageFlags::CRITICAL_SECTION;
        }
        if self.maintained {
            flags |= StageFlags::MAINTAINED;
        }
        StageSpec::new(self.name.clone(), flags)
    }
}

/// One authored ability. Cost and cooldown reference effects in the same
/// library by name.
#[derive(Clone, Debug, Deserialize)]
pub struct AbilityData {
    pub name: String,
    /// Tag keying the elapsed-time tracker; defaults to the ability name.
    #[serde(default)]
    pub identity_tag: Option<String>,
    #[serde(default)]
    pub policy: ActivationPolicy,
    #[serde(default)]
    pub stages: Vec<StageData>,
    #[serde(default)]
    pub cost: Option<String>,
    #[serde(default)]
    pub cooldown: Option<String>,
    #[serde(default)]
    pub targeting: TagGateData,
}

impl AbilityData {
    pub(crate) fn resolve(
        &self,
        effects: &HashMap<String, Arc<EffectDefinition>>,
        tags: &mut TagRegistry,
    ) -> Result<AbilityDefinition, ContentError> {
        let identity = self.identity_tag.as_deref().unwrap_or(&self.name);
        Ok(AbilityDefinition {
            name: self.name.clone(),
            identity_tag: tags.register(identity),
            policy: self.policy,
            stages: self.stages.iter().map(StageData::resolve).collect(),
            cost: self.cost.as_deref().map(|name| effect_ref(name, effects)).transpose()?,
            cooldown: self
                .cooldown
                .as_deref()
                .map(|name| effect_ref(name, effects))
                .transpose()?,
            targeting: self.targeting.resolve_requirement(tags),
        })
    }
}

fn effect_ref(
    name: &str,
    effects: &HashMap<String, Arc<EffectDefinition>>,
) -> Result<Arc<EffectDefinition>, ContentError> {
    effects
        .get(name)
        .cloned()
        .ok_or_else(|| ContentError::UnknownEffect(name.to_owned()))
}

/// One seed value inside an attribute set.
#[derive(Clone, Debug, Deserialize)]
pub struct AttributeSeedData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base: f32,
    /// Starting current value; defaults to the base (full meter).
    #[serde(default)]
    pub current: Option<f32>,
}

/// A named bundle of starting attribute values, as authored.
#[derive(Clone, Debug, Deserialize)]
pub struct AttributeSetData {
    pub name: String,
    pub attributes: Vec<AttributeSeedData>,
}

impl AttributeSetData {
    pub(crate) fn resolve(&self, attributes: &mut AttributeRegistry) -> AttributeSet {
        let seeds = self
            .attributes
            .iter()
            .map(|seed| {
                let id = attributes.register(&seed.name, &seed.description);
                let value = AttributeValue::new(seed.current.unwrap_or(seed.base), seed.base);
                (id, value)
            })
            .collect();
        AttributeSet {
            name: self.name.clone(),
            seeds,
        }
    }
}

/// A resolved attribute set, ready to install on a spawned entity.
#[derive(Clone, Debug)]
pub struct AttributeSet {
    pub name: String,
    pub seeds: Vec<(AttributeId, AttributeValue)>,
}

impl AttributeSet {
    /// Registers every seed attribute on the entity. Returns false when the
    /// entity is missing or any seed attribute was already registered;
    /// earlier seeds stay registered in that case.
    pub fn install(&self, engine: &mut Engine, entity: EntityId) -> bool {
        self.seeds
            .iter()
            .all(|&(attribute, initial)| engine.register_attribute(entity, attribute, initial))
    }
}
