//! Combat rules
//!
//! Turn-based grid combat with:
//! - Dice rolling (e.g., "2d6+3")
//! - Combatants with HP, MP and a per-round action economy
//! - Class and monster templates
//! - Status effects with duration policies
//! - Initiative order and round tracking
//! - Power targeting (melee, ranged, burst, blast) and resolution

mod combatant;
mod dice;
mod effects;
mod grid;
mod initiative;
mod log;
mod power;
mod resolution;
mod roster;
mod targeting;

pub use combatant::{
    BaseStats, CharacterClass, Combatant, MonsterStats, MonsterTemplate, MONSTER_POWER_CLASS,
};
pub use dice::{
    parse_dice, roll_expression, DiceExpression, DiceGroup, DiceOutcome, DiceSource, GroupRoll,
    RngSource, ScriptedSource, MAX_DICE_PER_GROUP, MAX_DIE_SIDES, MAX_GROUPS, MAX_MODIFIER,
};
pub use effects::{
    DurationPolicy, EffectCatalog, EffectDefinition, EffectKind, StatusEffectInstance, StatusEffects,
};
pub use grid::{Board, Facing, Position, DEFAULT_BOARD_SIZE, MAX_BOARD_SIZE};
pub use initiative::{DueEffect, InitiativeEntry, Phase, Sequencer, TurnAdvance};
pub use log::{CombatEvent, CombatLog, EventKind};
pub use power::{ActionCost, AreaShape, AttackShape, Power, PowerCatalog, PowerTier};
pub use resolution::{check_usable, resolve, Hit, Resolution};
pub use roster::{DamageOutcome, HealOutcome, Roster};
pub use targeting::{affected, legal_targets, Target, TargetingOptions};
