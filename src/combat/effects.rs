//! Status effects system
//!
//! Manages named conditions on combatants like:
//! - Stunned, dazed, prone (negative)
//! - Blessed, hasted, concealed (positive)
//!
//! Definitions come from a read-only [`EffectCatalog`]. Instances never expire
//! on their own: the turn sequencer reports which instances are due and the
//! caller removes them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ConfigError;

/// Whether an effect helps or hinders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Negative,
    Positive,
}

impl FromStr for EffectKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "negative" | "debuff" => Ok(EffectKind::Negative),
            "positive" | "buff" => Ok(EffectKind::Positive),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EffectKind::Negative => "negative",
            EffectKind::Positive => "positive",
        };
        write!(f, "{}", s)
    }
}

/// When an effect instance is due for clearance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationPolicy {
    /// Until a successful saving throw (explicit removal)
    SaveEnds,
    /// At the end of the owner's turn
    EndOfTurn,
    /// When the round wraps
    EndOfRound,
    /// Until the encounter ends
    Encounter,
    /// Until the owner escapes (explicit removal)
    Escape,
    /// Until the owner spends a move action
    MoveAction,
    /// While the owner stays in place
    Positional,
    /// While the source sustains it
    Sustained,
    /// Adjudicated by the DM
    Special,
}

impl FromStr for DurationPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "save_ends" => Ok(DurationPolicy::SaveEnds),
            "end_of_turn" => Ok(DurationPolicy::EndOfTurn),
            "end_of_round" => Ok(DurationPolicy::EndOfRound),
            "encounter" => Ok(DurationPolicy::Encounter),
            "escape" => Ok(DurationPolicy::Escape),
            "move_action" => Ok(DurationPolicy::MoveAction),
            "positional" => Ok(DurationPolicy::Positional),
            "sustained" => Ok(DurationPolicy::Sustained),
            "special" => Ok(DurationPolicy::Special),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DurationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DurationPolicy::SaveEnds => "save_ends",
            DurationPolicy::EndOfTurn => "end_of_turn",
            DurationPolicy::EndOfRound => "end_of_round",
            DurationPolicy::Encounter => "encounter",
            DurationPolicy::Escape => "escape",
            DurationPolicy::MoveAction => "move_action",
            DurationPolicy::Positional => "positional",
            DurationPolicy::Sustained => "sustained",
            DurationPolicy::Special => "special",
        };
        write!(f, "{}", s)
    }
}

/// Catalog entry for a named effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDefinition {
    /// Catalog key, filled from the map key when loading JSON
    #[serde(default)]
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EffectKind,
    #[serde(default)]
    pub description: String,
    pub duration: DurationPolicy,
    /// Stunned-style effects that forbid taking actions
    #[serde(default)]
    pub prevents_action: bool,
}

/// Read-only set of effect definitions keyed by effect key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectCatalog {
    definitions: BTreeMap<String, EffectDefinition>,
}

impl EffectCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard 4e-style condition list
    pub fn standard() -> Self {
        use DurationPolicy::*;
        use EffectKind::*;

        #[rustfmt::skip]
        let entries: [(&str, &str, EffectKind, DurationPolicy, bool, &str); 24] = [
            ("blinded", "Blinded", Negative, SaveEnds, false, "Cannot see. Grants combat advantage to enemies."),
            ("dazed", "Dazed", Negative, SaveEnds, false, "Can take only one action per turn."),
            ("dominated", "Dominated", Negative, SaveEnds, false, "Controlled by enemy. Must use actions as directed."),
            ("grabbed", "Grabbed", Negative, Escape, false, "Cannot move away from grabber."),
            ("helpless", "Helpless", Negative, SaveEnds, true, "Cannot take actions. Grants combat advantage."),
            ("immobilized", "Immobilized", Negative, SaveEnds, false, "Cannot move from current position."),
            ("marked", "Marked", Negative, EndOfTurn, false, "Takes penalty when attacking other targets."),
            ("ongoing_damage", "Ongoing Damage", Negative, SaveEnds, false, "Takes damage at start of each turn."),
            ("petrified", "Petrified", Negative, Special, true, "Turned to stone. Cannot take any actions."),
            ("prone", "Prone", Negative, MoveAction, false, "Lying down. Grants combat advantage to adjacent enemies."),
            ("restrained", "Restrained", Negative, SaveEnds, false, "Cannot move and takes penalty to attacks."),
            ("slowed", "Slowed", Negative, SaveEnds, false, "Speed reduced by half."),
            ("stunned", "Stunned", Negative, SaveEnds, true, "Cannot take actions and grants combat advantage."),
            ("surprised", "Surprised", Negative, EndOfRound, true, "Cannot act during surprise round."),
            ("unconscious", "Unconscious", Negative, SaveEnds, true, "Helpless and unaware of surroundings."),
            ("weakened", "Weakened", Negative, SaveEnds, false, "Damage reduced by half."),
            ("blessed", "Blessed", Positive, Encounter, false, "Bonus to attack rolls and damage."),
            ("concealed", "Concealed", Positive, EndOfTurn, false, "Enemies have penalty to hit."),
            ("cover", "Cover", Positive, Positional, false, "Bonus to AC and Reflex defenses."),
            ("flying", "Flying", Positive, Sustained, false, "Can move through air and over obstacles."),
            ("hasted", "Hasted", Positive, Encounter, false, "Increased speed and extra actions."),
            ("invisible", "Invisible", Positive, SaveEnds, false, "Cannot be seen. Combat advantage on attacks."),
            ("regenerating", "Regenerating", Positive, Encounter, false, "Heals HP at start of each turn."),
            ("shielded", "Shielded", Positive, Encounter, false, "Temporary hit points or damage resistance."),
        ];

        let mut catalog = Self::new();
        for (key, name, kind, duration, prevents_action, description) in entries {
            catalog.insert(EffectDefinition {
                key: key.to_string(),
                name: name.to_string(),
                kind,
                description: description.to_string(),
                duration,
                prevents_action,
            });
        }
        catalog
    }

    /// Parse a JSON object of `key -> definition`
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut catalog: EffectCatalog = serde_json::from_str(json)?;
        for (key, def) in catalog.definitions.iter_mut() {
            def.key = key.clone();
        }
        Ok(catalog)
    }

    /// Load a JSON catalog file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Add or replace a definition
    pub fn insert(&mut self, definition: EffectDefinition) {
        self.definitions.insert(definition.key.clone(), definition);
    }

    pub fn get(&self, key: &str) -> Option<&EffectDefinition> {
        self.definitions.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.definitions.contains_key(key)
    }

    /// Definitions sorted by key
    pub fn iter(&self) -> impl Iterator<Item = &EffectDefinition> {
        self.definitions.values()
    }

    /// Definitions of one kind
    pub fn by_kind(&self, kind: EffectKind) -> impl Iterator<Item = &EffectDefinition> {
        self.definitions.values().filter(move |d| d.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// An application of a named effect to a combatant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffectInstance {
    pub id: Uuid,
    pub key: String,
    pub duration: DurationPolicy,
    pub applied_at: DateTime<Utc>,
    /// Combatant (or other source) that applied it
    pub source: Option<String>,
}

impl StatusEffectInstance {
    /// Instantiate a definition, optionally overriding its duration
    pub fn new(definition: &EffectDefinition, duration: Option<DurationPolicy>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: definition.key.clone(),
            duration: duration.unwrap_or(definition.duration),
            applied_at: Utc::now(),
            source: None,
        }
    }

    /// Set the source of this effect
    pub fn with_source(mut self, source_id: &str) -> Self {
        self.source = Some(source_id.to_string());
        self
    }
}

/// Ordered effect instances on one combatant. Duplicate keys are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusEffects {
    effects: Vec<StatusEffectInstance>,
}

impl StatusEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instance
    pub fn add(&mut self, effect: StatusEffectInstance) {
        self.effects.push(effect);
    }

    /// Remove an instance by id
    pub fn remove(&mut self, instance_id: Uuid) -> Option<StatusEffectInstance> {
        let index = self.effects.iter().position(|e| e.id == instance_id)?;
        Some(self.effects.remove(index))
    }

    /// Check if any instance has this key
    pub fn has(&self, key: &str) -> bool {
        self.effects.iter().any(|e| e.key == key)
    }

    /// Instance ids with the given duration policy, in application order
    pub fn with_duration(&self, duration: DurationPolicy) -> Vec<Uuid> {
        self.effects
            .iter()
            .filter(|e| e.duration == duration)
            .map(|e| e.id)
            .collect()
    }

    /// Check if nothing in the catalog forbids acting
    pub fn can_act(&self, catalog: &EffectCatalog) -> bool {
        !self
            .effects
            .iter()
            .any(|e| catalog.get(&e.key).is_some_and(|d| d.prevents_action))
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffectInstance> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Clear all effects
    pub fn clear(&mut self) {
        self.effects.clear();
    }
}
