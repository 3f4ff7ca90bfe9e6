//! Power definitions
//!
//! Powers are static data: the engine reads them but never mutates them. The
//! per-combatant remaining-use counters live on the combatant.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::combatant::MonsterTemplate;
use super::dice::parse_dice;
use super::grid::MAX_BOARD_SIZE;
use super::effects::EffectCatalog;
use crate::config::ConfigError;
use crate::error::{EngineError, EngineResult};

/// How often a power may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerTier {
    AtWill,
    Encounter,
    Daily,
}

impl fmt::Display for PowerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PowerTier::AtWill => "at_will",
            PowerTier::Encounter => "encounter",
            PowerTier::Daily => "daily",
        };
        write!(f, "{}", s)
    }
}

/// Which part of the turn a power spends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCost {
    Standard,
    Move,
    Minor,
    Free,
}

/// How a power reaches its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackShape {
    Melee,
    Ranged,
    Close,
    Area,
}

/// Area of effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaShape {
    /// Single target
    #[default]
    None,
    /// Square around a centre cell
    Burst,
    /// Line from the actor toward the target cell
    Blast,
}

fn no_damage() -> String {
    "0".to_string()
}

/// A power definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Power {
    pub id: String,
    pub name: String,
    /// Owning class, if any
    #[serde(default)]
    pub class: Option<String>,
    #[serde(alias = "type")]
    pub tier: PowerTier,
    #[serde(alias = "action_type")]
    pub action: ActionCost,
    #[serde(alias = "attack_type")]
    pub attack: AttackShape,
    /// Reach in cells
    #[serde(alias = "range_value")]
    pub range: i32,
    #[serde(default, alias = "area_type")]
    pub area: AreaShape,
    #[serde(default)]
    pub area_size: i32,
    /// Dice expression; "0" means no direct damage
    #[serde(default = "no_damage", alias = "damage_dice")]
    pub damage: String,
    #[serde(default)]
    pub damage_type: String,
    /// Dice expression healed on each affected combatant
    #[serde(default)]
    pub healing: Option<String>,
    /// Status effect key applied to each affected combatant
    #[serde(default)]
    pub effect: Option<String>,
    /// Whether the user may pick themselves as the target
    #[serde(default)]
    pub allows_self: bool,
    /// MP spent per use
    #[serde(default)]
    pub resource_cost: u32,
    #[serde(default)]
    pub description: String,
}

impl Power {
    /// Whether the damage expression rolls anything
    pub fn deals_damage(&self) -> bool {
        let damage = self.damage.trim();
        !damage.is_empty() && damage != "0"
    }

    /// Uses granted at the start of an encounter (`None` = unlimited)
    pub fn initial_uses(&self) -> Option<u32> {
        match self.tier {
            PowerTier::AtWill => None,
            PowerTier::Encounter | PowerTier::Daily => Some(1),
        }
    }

    /// Check dice expressions and the effect key before the power is used
    pub fn validate(&self, effects: &EffectCatalog) -> EngineResult<()> {
        if self.deals_damage() {
            parse_dice(&self.damage)?;
        }
        if let Some(healing) = &self.healing {
            parse_dice(healing)?;
        }
        if let Some(effect) = &self.effect {
            if !effects.contains(effect) {
                return Err(EngineError::UnknownEffect(effect.clone()));
            }
        }
        if !(0..=MAX_BOARD_SIZE).contains(&self.range) || !(0..=MAX_BOARD_SIZE).contains(&self.area_size) {
            return Err(EngineError::illegal(format!(
                "power {} needs range and area size between 0 and {}",
                self.id, MAX_BOARD_SIZE
            )));
        }
        Ok(())
    }
}

/// Read-only set of power definitions keyed by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerCatalog {
    powers: BTreeMap<String, Power>,
}

impl PowerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The starter powers for the four playable classes, plus the basic
    /// attack of every monster template
    pub fn standard() -> Self {
        use ActionCost::*;
        use AreaShape::{Blast, None as Single};
        use AttackShape::*;
        use PowerTier::*;

        struct Row {
            id: &'static str,
            name: &'static str,
            class: &'static str,
            tier: PowerTier,
            action: ActionCost,
            attack: AttackShape,
            range: i32,
            area: AreaShape,
            damage: &'static str,
            damage_type: &'static str,
            healing: Option<&'static str>,
            effect: Option<&'static str>,
            description: &'static str,
        }

        #[rustfmt::skip]
        let rows = [
            Row { id: "cleave", name: "Cleave", class: "fighter", tier: AtWill, action: Standard, attack: Melee, range: 1, area: Single, damage: "1d8+4", damage_type: "physical", healing: None, effect: None, description: "Basic melee attack that can hit adjacent enemies" },
            Row { id: "power_attack", name: "Power Attack", class: "fighter", tier: AtWill, action: Standard, attack: Melee, range: 1, area: Single, damage: "1d8+6", damage_type: "physical", healing: None, effect: None, description: "Heavy attack with increased damage" },
            Row { id: "shield_bash", name: "Shield Bash", class: "fighter", tier: Encounter, action: Standard, attack: Melee, range: 1, area: Single, damage: "2d6+4", damage_type: "physical", healing: None, effect: Some("prone"), description: "Attack that can knock enemies prone" },
            Row { id: "magic_missile", name: "Magic Missile", class: "mage", tier: AtWill, action: Standard, attack: Ranged, range: 10, area: Single, damage: "1d4+4", damage_type: "force", healing: None, effect: None, description: "Unerring bolt of magical energy" },
            Row { id: "ray_of_frost", name: "Ray of Frost", class: "mage", tier: AtWill, action: Standard, attack: Ranged, range: 10, area: Single, damage: "1d6+4", damage_type: "cold", healing: None, effect: Some("slowed"), description: "Icy ray that slows the target" },
            Row { id: "burning_hands", name: "Burning Hands", class: "mage", tier: Encounter, action: Standard, attack: Close, range: 3, area: Blast, damage: "2d6+4", damage_type: "fire", healing: None, effect: None, description: "Gout of fire affecting everything in a line" },
            Row { id: "piercing_strike", name: "Piercing Strike", class: "thief", tier: AtWill, action: Standard, attack: Melee, range: 1, area: Single, damage: "1d4+4", damage_type: "physical", healing: None, effect: None, description: "Precise attack targeting weak points" },
            Row { id: "sly_flourish", name: "Sly Flourish", class: "thief", tier: AtWill, action: Standard, attack: Melee, range: 1, area: Single, damage: "1d6+4", damage_type: "physical", healing: None, effect: None, description: "Deceptive attack with extra damage" },
            Row { id: "dazing_strike", name: "Dazing Strike", class: "thief", tier: Encounter, action: Standard, attack: Melee, range: 1, area: Single, damage: "2d4+4", damage_type: "physical", healing: None, effect: Some("dazed"), description: "Attack that dazes the target" },
            Row { id: "sacred_flame", name: "Sacred Flame", class: "cleric", tier: AtWill, action: Standard, attack: Ranged, range: 5, area: Single, damage: "1d6+4", damage_type: "radiant", healing: None, effect: None, description: "Divine fire that damages undead" },
            Row { id: "blessing_of_battle", name: "Blessing of Battle", class: "cleric", tier: AtWill, action: Minor, attack: Ranged, range: 5, area: Single, damage: "0", damage_type: "", healing: None, effect: Some("blessed"), description: "Grant ally a bonus to attacks" },
            Row { id: "healing_word", name: "Healing Word", class: "cleric", tier: Encounter, action: Minor, attack: Ranged, range: 5, area: Single, damage: "0", damage_type: "", healing: Some("2d6+4"), effect: None, description: "Heal ally for 2d6+4 hit points" },
        ];

        let mut catalog = Self::new();
        for row in rows {
            catalog.insert(Power {
                id: row.id.to_string(),
                name: row.name.to_string(),
                class: Some(row.class.to_string()),
                tier: row.tier,
                action: row.action,
                attack: row.attack,
                range: row.range,
                area: row.area,
                area_size: if row.area == Single { 0 } else { 1 },
                damage: row.damage.to_string(),
                damage_type: row.damage_type.to_string(),
                healing: row.healing.map(str::to_string),
                effect: row.effect.map(str::to_string),
                allows_self: row.healing.is_some(),
                resource_cost: 0,
                description: row.description.to_string(),
            });
        }
        for monster in MonsterTemplate::all() {
            catalog.insert(monster.basic_attack());
        }
        catalog
    }

    /// Parse a JSON array of power definitions
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let powers: Vec<Power> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for power in powers {
            if catalog.contains(&power.id) {
                return Err(ConfigError::Invalid(format!("duplicate power id: {}", power.id)));
            }
            catalog.insert(power);
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

    /// Validate every power against an effect catalog
    pub fn validate(&self, effects: &EffectCatalog) -> EngineResult<()> {
        self.powers.values().try_for_each(|p| p.validate(effects))
    }

    /// Add or replace a power
    pub fn insert(&mut self, power: Power) {
        self.powers.insert(power.id.clone(), power);
    }

    pub fn get(&self, id: &str) -> Option<&Power> {
        self.powers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.powers.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Power> {
        self.powers.values()
    }

    /// Powers owned by a class
    pub fn for_class<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a Power> + 'a {
        self.powers
            .values()
            .filter(move |p| p.class.as_deref() == Some(class))
    }

    pub fn len(&self) -> usize {
        self.powers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }
}
