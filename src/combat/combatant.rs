//! Combatant state
//!
//! A player character or monster instance taking part in an encounter.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::effects::StatusEffects;
use super::grid::{Facing, Position};
use super::power::{ActionCost, AreaShape, AttackShape, Power, PowerTier};

/// Playable class templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterClass {
    Fighter,
    Mage,
    Thief,
    Cleric,
}

/// Base numbers for a freshly created character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseStats {
    pub hp: u32,
    pub mp: u32,
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
}

impl CharacterClass {
    pub fn all() -> &'static [CharacterClass] {
        &[
            CharacterClass::Fighter,
            CharacterClass::Mage,
            CharacterClass::Thief,
            CharacterClass::Cleric,
        ]
    }

    /// Level 1 stats
    pub fn base_stats(&self) -> BaseStats {
        let (hp, mp, attack, defense, speed) = match self {
            CharacterClass::Fighter => (30, 5, 8, 6, 4),
            CharacterClass::Mage => (15, 20, 5, 3, 5),
            CharacterClass::Thief => (20, 10, 6, 4, 7),
            CharacterClass::Cleric => (25, 15, 5, 5, 4),
        };
        BaseStats {
            hp,
            mp,
            attack,
            defense,
            speed,
        }
    }
}

impl FromStr for CharacterClass {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fighter" | "warrior" => Ok(CharacterClass::Fighter),
            "mage" | "wizard" => Ok(CharacterClass::Mage),
            "thief" | "rogue" => Ok(CharacterClass::Thief),
            "cleric" | "priest" => Ok(CharacterClass::Cleric),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CharacterClass::Fighter => "fighter",
            CharacterClass::Mage => "mage",
            CharacterClass::Thief => "thief",
            CharacterClass::Cleric => "cleric",
        };
        write!(f, "{}", s)
    }
}

/// Stock monsters a game master can drop onto the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonsterTemplate {
    GoblinWarrior,
    OrcBerserker,
    SkeletonArcher,
    FireElemental,
    GiantSpider,
}

/// Numbers behind a [`MonsterTemplate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonsterStats {
    pub name: &'static str,
    pub creature_type: &'static str,
    pub level: u32,
    pub hp: u32,
    /// Armour class, used as defense
    pub armor_class: u32,
    pub attack: u32,
    /// Dice for the basic attack
    pub damage: &'static str,
    pub speed: u32,
    /// Experience awarded when it goes down
    pub xp: u32,
    pub description: &'static str,
}

impl MonsterTemplate {
    pub fn all() -> &'static [MonsterTemplate] {
        &[
            MonsterTemplate::GoblinWarrior,
            MonsterTemplate::OrcBerserker,
            MonsterTemplate::SkeletonArcher,
            MonsterTemplate::FireElemental,
            MonsterTemplate::GiantSpider,
        ]
    }

    pub fn stats(&self) -> MonsterStats {
        #[rustfmt::skip]
        let (name, creature_type, level, hp, armor_class, attack, damage, speed, xp, description) = match self {
            MonsterTemplate::GoblinWarrior => ("Goblin Warrior", "humanoid", 1, 15, 14, 3, "1d6+1", 6, 25, "Small, fierce humanoid with crude weapons"),
            MonsterTemplate::OrcBerserker => ("Orc Berserker", "humanoid", 3, 35, 16, 5, "1d8+3", 5, 150, "Large, brutal warrior in a battle rage"),
            MonsterTemplate::SkeletonArcher => ("Skeleton Archer", "undead", 2, 20, 15, 4, "1d6+2", 6, 100, "Animated bones wielding a longbow"),
            MonsterTemplate::FireElemental => ("Fire Elemental", "elemental", 5, 55, 17, 7, "2d6+4", 8, 400, "Living flame that burns everything it touches"),
            MonsterTemplate::GiantSpider => ("Giant Spider", "beast", 2, 25, 14, 4, "1d8+2", 7, 125, "Large arachnid with venomous fangs"),
        };
        MonsterStats {
            name,
            creature_type,
            level,
            hp,
            armor_class,
            attack,
            damage,
            speed,
            xp,
            description,
        }
    }

    /// Id of the at-will attack every monster of this kind carries
    pub fn attack_power_id(&self) -> String {
        format!("{}_attack", self)
    }

    /// The template's basic attack; archers shoot, everything else bites or swings
    pub fn basic_attack(&self) -> Power {
        let stats = self.stats();
        let (attack, range, damage_type) = match self {
            MonsterTemplate::SkeletonArcher => (AttackShape::Ranged, 10, "piercing"),
            MonsterTemplate::FireElemental => (AttackShape::Melee, 1, "fire"),
            MonsterTemplate::GiantSpider => (AttackShape::Melee, 1, "poison"),
            MonsterTemplate::GoblinWarrior | MonsterTemplate::OrcBerserker => {
                (AttackShape::Melee, 1, "physical")
            }
        };
        Power {
            id: self.attack_power_id(),
            name: format!("{} Attack", stats.name),
            class: Some(MONSTER_POWER_CLASS.to_string()),
            tier: PowerTier::AtWill,
            action: ActionCost::Standard,
            attack,
            range,
            area: AreaShape::None,
            area_size: 0,
            damage: stats.damage.to_string(),
            damage_type: damage_type.to_string(),
            healing: None,
            effect: None,
            allows_self: false,
            resource_cost: 0,
            description: stats.description.to_string(),
        }
    }
}

/// Power class tag shared by every monster basic attack
pub const MONSTER_POWER_CLASS: &str = "monster";

impl FromStr for MonsterTemplate {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace([' ', '-'], "_").as_str() {
            "goblin_warrior" | "goblin" => Ok(MonsterTemplate::GoblinWarrior),
            "orc_berserker" | "orc" => Ok(MonsterTemplate::OrcBerserker),
            "skeleton_archer" | "skeleton" => Ok(MonsterTemplate::SkeletonArcher),
            "fire_elemental" => Ok(MonsterTemplate::FireElemental),
            "giant_spider" | "spider" => Ok(MonsterTemplate::GiantSpider),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MonsterTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonsterTemplate::GoblinWarrior => "goblin_warrior",
            MonsterTemplate::OrcBerserker => "orc_berserker",
            MonsterTemplate::SkeletonArcher => "skeleton_archer",
            MonsterTemplate::FireElemental => "fire_elemental",
            MonsterTemplate::GiantSpider => "giant_spider",
        };
        write!(f, "{}", s)
    }
}

/// A participant in combat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: String,
    pub name: String,
    /// NPC or monster rather than player-controlled
    pub hostile: bool,
    pub class: Option<CharacterClass>,
    /// Template a monster was spawned from
    #[serde(default)]
    pub monster: Option<MonsterTemplate>,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub mp: u32,
    pub max_mp: u32,
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
    pub position: Option<Position>,
    pub facing: Facing,
    pub has_moved: bool,
    pub has_acted: bool,
    pub effects: StatusEffects,
    /// Power id -> remaining uses (`None` = at-will)
    pub powers: BTreeMap<String, Option<u32>>,
}

impl Combatant {
    /// Create a combatant with the given hit points and zeroed stats
    pub fn new(id: impl Into<String>, name: impl Into<String>, max_hp: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hostile: false,
            class: None,
            monster: None,
            level: 1,
            hp: max_hp,
            max_hp,
            mp: 0,
            max_mp: 0,
            attack: 0,
            defense: 0,
            speed: 0,
            position: None,
            facing: Facing::default(),
            has_moved: false,
            has_acted: false,
            effects: StatusEffects::new(),
            powers: BTreeMap::new(),
        }
    }

    /// Create a level 1 character from a class template
    pub fn from_class(id: impl Into<String>, name: impl Into<String>, class: CharacterClass) -> Self {
        let base = class.base_stats();
        let mut combatant = Self::new(id, name, base.hp)
            .with_mp(base.mp)
            .with_stats(base.attack, base.defense, base.speed);
        combatant.class = Some(class);
        combatant
    }

    /// Spawn a hostile monster from a template, armed with its basic attack
    pub fn from_monster(
        id: impl Into<String>,
        name: impl Into<String>,
        template: MonsterTemplate,
    ) -> Self {
        let stats = template.stats();
        let mut combatant = Self::new(id, name, stats.hp)
            .hostile()
            .with_stats(stats.attack, stats.armor_class, stats.speed)
            .with_power(&template.basic_attack());
        combatant.level = stats.level;
        combatant.monster = Some(template);
        combatant
    }

    /// Experience for defeating this combatant (monsters only)
    pub fn xp_value(&self) -> u32 {
        self.monster.map_or(0, |m| m.stats().xp)
    }

    /// Mark as a monster / NPC
    pub fn hostile(mut self) -> Self {
        self.hostile = true;
        self
    }

    pub fn with_mp(mut self, max_mp: u32) -> Self {
        self.mp = max_mp;
        self.max_mp = max_mp;
        self
    }

    pub fn with_stats(mut self, attack: u32, defense: u32, speed: u32) -> Self {
        self.attack = attack;
        self.defense = defense;
        self.speed = speed;
        self
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    pub fn facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    /// Grant a power with its tier's starting uses
    pub fn with_power(mut self, power: &Power) -> Self {
        self.powers.insert(power.id.clone(), power.initial_uses());
        self
    }

    /// Grant a power with an explicit use count (`None` = unlimited)
    pub fn with_power_uses(mut self, power_id: impl Into<String>, uses: Option<u32>) -> Self {
        self.powers.insert(power_id.into(), uses);
        self
    }

    /// At 0 HP (dead or unconscious)
    pub fn is_down(&self) -> bool {
        self.hp == 0
    }

    pub fn is_alive(&self) -> bool {
        !self.is_down()
    }

    /// Damage bonus from the attack stat, `floor(attack / 2)`
    pub fn damage_bonus(&self) -> i32 {
        (self.attack / 2) as i32
    }

    /// Initiative modifier derived from speed, `floor((speed - 10) / 2)`
    pub fn initiative_modifier(&self) -> i32 {
        (i32::try_from(self.speed).unwrap_or(i32::MAX) - 10).div_euclid(2)
    }

    /// Remaining uses of a power; outer `None` if not owned
    pub fn uses_remaining(&self, power_id: &str) -> Option<Option<u32>> {
        self.powers.get(power_id).copied()
    }
}
