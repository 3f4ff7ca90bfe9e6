//! Scripted encounters
//!
//! A scenario is a TOML document with the combatants of one fight, optional
//! fixed initiative rolls and a list of actions to play out:
//!
//! ```toml
//! name = "Goblin ambush"
//!
//! [[combatants]]
//! id = "fighter"
//! name = "Brann"
//! class = "fighter"
//! position = [5, 5]
//!
//! [[combatants]]
//! id = "goblin"
//! name = "Goblin"
//! monster = "goblin_warrior"
//! position = [5, 6]
//!
//! [initiative]
//! fighter = 15
//!
//! [[actions]]
//! kind = "power"
//! actor = "fighter"
//! power = "cleave"
//! target = "goblin"
//! ```
//!
//! Loading checks every class, monster, power and effect name against the catalogs and
//! turns the loose document into typed [`Combatant`]s and [`ScriptedAction`]s
//! before anything touches an encounter.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use figment::providers::{Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::combat::{
    CharacterClass, Combatant, DurationPolicy, EffectCatalog, Facing, MonsterTemplate, Position,
    PowerCatalog, Target,
};
use crate::config::{ConfigError, EngineConfig};
use crate::encounter::{Encounter, EncounterState};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Deserialize)]
struct ScenarioFile {
    name: String,
    #[serde(default)]
    combatants: Vec<CombatantEntry>,
    #[serde(default)]
    initiative: BTreeMap<String, u32>,
    #[serde(default)]
    actions: Vec<ActionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct CombatantEntry {
    id: String,
    name: String,
    #[serde(default)]
    hostile: bool,
    class: Option<String>,
    /// Monster template; implies hostile
    monster: Option<String>,
    level: Option<u32>,
    hp: Option<u32>,
    mp: Option<u32>,
    attack: Option<u32>,
    defense: Option<u32>,
    speed: Option<u32>,
    position: Option<[i32; 2]>,
    facing: Option<Facing>,
    /// Defaults to the class's powers, or the monster's basic attack
    powers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ActionEntry {
    Move {
        actor: String,
        to: [i32; 2],
    },
    Power {
        actor: String,
        power: String,
        target: Option<String>,
        cell: Option<[i32; 2]>,
        exclude_caster: Option<bool>,
    },
    Effect {
        target: String,
        effect: String,
        duration: Option<DurationPolicy>,
        source: Option<String>,
    },
    EndTurn,
    Delay {
        actor: String,
    },
    EndCombat,
}

/// A validated step of a scenario script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptedAction {
    Move {
        actor: String,
        to: Position,
    },
    Power {
        actor: String,
        power: String,
        target: Target,
        exclude_caster: Option<bool>,
    },
    Effect {
        target: String,
        effect: String,
        duration: Option<DurationPolicy>,
        source: Option<String>,
    },
    EndTurn,
    Delay {
        actor: String,
    },
    EndCombat,
}

impl fmt::Display for ScriptedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptedAction::Move { actor, to } => write!(f, "{} moves to {}", actor, to),
            ScriptedAction::Power {
                actor,
                power,
                target,
                ..
            } => write!(f, "{} uses {} on {}", actor, power, target),
            ScriptedAction::Effect { target, effect, .. } => write!(f, "{} gains {}", target, effect),
            ScriptedAction::EndTurn => write!(f, "end turn"),
            ScriptedAction::Delay { actor } => write!(f, "{} delays", actor),
            ScriptedAction::EndCombat => write!(f, "end combat"),
        }
    }
}

/// A loaded, validated scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub combatants: Vec<Combatant>,
    /// Fixed natural d20 rolls; everyone else rolls
    pub initiative: BTreeMap<String, u32>,
    pub actions: Vec<ScriptedAction>,
}

/// What happened to one scripted action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub action: ScriptedAction,
    /// Error message if the engine rejected the action
    pub rejected: Option<String>,
}

/// Outcome of [`Scenario::run`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    pub state: EncounterState,
}

impl RunReport {
    pub fn rejected(&self) -> usize {
        self.steps.iter().filter(|s| s.rejected.is_some()).count()
    }
}

impl Scenario {
    /// Load a scenario file
    pub fn load(
        path: &Path,
        config: &EngineConfig,
        effects: &EffectCatalog,
        powers: &PowerCatalog,
    ) -> Result<Self, ConfigError> {
        std::fs::metadata(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_figment(Figment::from(Toml::file_exact(path)), config, effects, powers)
    }

    /// Parse a scenario from TOML text
    pub fn from_toml(
        toml: &str,
        config: &EngineConfig,
        effects: &EffectCatalog,
        powers: &PowerCatalog,
    ) -> Result<Self, ConfigError> {
        Self::from_figment(Figment::from(Toml::string(toml)), config, effects, powers)
    }

    fn from_figment(
        figment: Figment,
        config: &EngineConfig,
        effects: &EffectCatalog,
        powers: &PowerCatalog,
    ) -> Result<Self, ConfigError> {
        let file: ScenarioFile = figment.extract().map_err(Box::new)?;

        let mut ids = BTreeSet::new();
        let mut combatants = Vec::with_capacity(file.combatants.len());
        for entry in file.combatants {
            if !ids.insert(entry.id.clone()) {
                return Err(ConfigError::Engine(EngineError::DuplicateCombatant(entry.id)));
            }
            combatants.push(build_combatant(entry, config, powers)?);
        }

        for id in file.initiative.keys() {
            known(&ids, id)?;
        }

        let actions = file
            .actions
            .into_iter()
            .map(|action| build_action(action, &ids, effects, powers))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Loaded scenario {}: {} combatant(s), {} action(s)",
            file.name,
            combatants.len(),
            actions.len()
        );
        Ok(Self {
            name: file.name,
            combatants,
            initiative: file.initiative,
            actions,
        })
    }

    /// Set up `encounter` and play the script.
    ///
    /// Setup errors abort the run; rejected actions are reported and the
    /// script carries on.
    pub fn run(&self, encounter: &mut Encounter) -> EngineResult<RunReport> {
        for combatant in &self.combatants {
            encounter.add_combatant(combatant.clone())?;
        }
        for (id, natural) in &self.initiative {
            if encounter.sequencer().entry(id).is_none() {
                encounter.record_initiative(id, *natural)?;
            }
        }
        encounter.roll_all_initiative()?;
        encounter.start_combat()?;
        info!("Scenario {}: running {} action(s)", self.name, self.actions.len());

        let steps = self
            .actions
            .iter()
            .map(|action| {
                let rejected = perform(encounter, action).err().map(|e| {
                    warn!("Scenario {}: '{}' rejected: {}", self.name, action, e);
                    e.to_string()
                });
                StepReport {
                    action: action.clone(),
                    rejected,
                }
            })
            .collect();

        Ok(RunReport {
            steps,
            state: encounter.state(),
        })
    }
}

fn perform(encounter: &mut Encounter, action: &ScriptedAction) -> EngineResult<()> {
    match action {
        ScriptedAction::Move { actor, to } => encounter.move_combatant(actor, *to).map(|_| ()),
        ScriptedAction::Power {
            actor,
            power,
            target,
            exclude_caster,
        } => encounter
            .use_power(actor, power, target, *exclude_caster)
            .map(|_| ()),
        ScriptedAction::Effect {
            target,
            effect,
            duration,
            source,
        } => encounter
            .apply_effect(target, effect, *duration, source.as_deref())
            .map(|_| ()),
        ScriptedAction::EndTurn => encounter.end_turn().map(|_| ()),
        ScriptedAction::Delay { actor } => encounter.delay(actor).map(|_| ()),
        ScriptedAction::EndCombat => encounter.end_combat(),
    }
}

fn build_combatant(
    entry: CombatantEntry,
    config: &EngineConfig,
    powers: &PowerCatalog,
) -> Result<Combatant, ConfigError> {
    let class = entry
        .class
        .as_deref()
        .map(|name| {
            name.parse::<CharacterClass>().map_err(|_| {
                ConfigError::Invalid(format!("{}: unknown class '{}'", entry.id, name))
            })
        })
        .transpose()?;
    let monster = entry
        .monster
        .as_deref()
        .map(|name| {
            name.parse::<MonsterTemplate>().map_err(|_| {
                ConfigError::Invalid(format!("{}: unknown monster '{}'", entry.id, name))
            })
        })
        .transpose()?;

    let mut combatant = match (class, monster, entry.hp) {
        (Some(_), Some(_), _) => {
            return Err(ConfigError::Invalid(format!(
                "{}: class and monster are mutually exclusive",
                entry.id
            )))
        }
        (Some(class), None, _) => Combatant::from_class(&entry.id, &entry.name, class),
        (None, Some(template), _) => {
            let mut combatant = Combatant::from_monster(&entry.id, &entry.name, template);
            // Catalog powers are granted below
            combatant.powers.clear();
            combatant
        }
        (None, None, Some(hp)) => {
            Combatant::new(&entry.id, &entry.name, hp).with_stats(0, 0, config.default_speed)
        }
        (None, None, None) => {
            return Err(ConfigError::Invalid(format!(
                "{}: needs a class, a monster or hp",
                entry.id
            )))
        }
    };

    if let Some(hp) = entry.hp {
        combatant.hp = hp;
        combatant.max_hp = hp;
    }
    if let Some(mp) = entry.mp {
        combatant = combatant.with_mp(mp);
    }
    combatant.attack = entry.attack.unwrap_or(combatant.attack);
    combatant.defense = entry.defense.unwrap_or(combatant.defense);
    combatant.speed = entry.speed.unwrap_or(combatant.speed);
    combatant.level = entry.level.unwrap_or(combatant.level);
    if entry.hostile {
        combatant = combatant.hostile();
    }
    if let Some([x, y]) = entry.position {
        combatant = combatant.at(x, y);
    }
    if let Some(facing) = entry.facing {
        combatant = combatant.facing(facing);
    }

    let power_ids = match (entry.powers, class, monster) {
        (Some(ids), _, _) => ids,
        (None, Some(class), _) => powers
            .for_class(&class.to_string())
            .map(|p| p.id.clone())
            .collect(),
        (None, None, Some(template)) => vec![template.attack_power_id()],
        (None, None, None) => Vec::new(),
    };
    for power_id in power_ids {
        let power = powers
            .get(&power_id)
            .ok_or_else(|| ConfigError::Engine(EngineError::UnknownPower(power_id.clone())))?;
        combatant = combatant.with_power(power);
    }

    Ok(combatant)
}

fn build_action(
    action: ActionEntry,
    ids: &BTreeSet<String>,
    effects: &EffectCatalog,
    powers: &PowerCatalog,
) -> Result<ScriptedAction, ConfigError> {
    let action = match action {
        ActionEntry::Move { actor, to: [x, y] } => {
            known(ids, &actor)?;
            ScriptedAction::Move {
                actor,
                to: Position::new(x, y),
            }
        }
        ActionEntry::Power {
            actor,
            power,
            target,
            cell,
            exclude_caster,
        } => {
            known(ids, &actor)?;
            if !powers.contains(&power) {
                return Err(ConfigError::Engine(EngineError::UnknownPower(power)));
            }
            let target = match (target, cell) {
                (Some(id), None) => {
                    known(ids, &id)?;
                    Target::Combatant(id)
                }
                (None, Some([x, y])) => Target::cell(x, y),
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "{} using {}: give exactly one of target or cell",
                        actor, power
                    )))
                }
            };
            ScriptedAction::Power {
                actor,
                power,
                target,
                exclude_caster,
            }
        }
        ActionEntry::Effect {
            target,
            effect,
            duration,
            source,
        } => {
            known(ids, &target)?;
            if !effects.contains(&effect) {
                return Err(ConfigError::Engine(EngineError::UnknownEffect(effect)));
            }
            ScriptedAction::Effect {
                target,
                effect,
                duration,
                source,
            }
        }
        ActionEntry::EndTurn => ScriptedAction::EndTurn,
        ActionEntry::Delay { actor } => {
            known(ids, &actor)?;
            ScriptedAction::Delay { actor }
        }
        ActionEntry::EndCombat => ScriptedAction::EndCombat,
    };
    Ok(action)
}

fn known(ids: &BTreeSet<String>, id: &str) -> Result<(), ConfigError> {
    if ids.contains(id) {
        Ok(())
    } else {
        Err(ConfigError::Engine(EngineError::UnknownCombatant(id.to_string())))
    }
}
