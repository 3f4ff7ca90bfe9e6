//! Target selection
//!
//! Works out who a power may be aimed at and who it ends up hitting:
//!
//! - Melee: combatants in the neighbouring cells
//! - Ranged and close single-target: Manhattan distance up to the range
//! - Burst: a square of Chebyshev radius `area_size` around a centre cell
//! - Blast: a line of up to `range` cells from the actor toward a cell
//!
//! Combatants at 0 HP are never targets.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::combatant::Combatant;
use super::grid::Position;
use super::power::{AreaShape, AttackShape, Power};
use super::roster::Roster;
use crate::error::{EngineError, EngineResult};

/// What the caller aimed a power at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// A combatant by id
    Combatant(String),
    /// A grid cell
    Cell(Position),
}

impl Target {
    pub fn combatant(id: impl Into<String>) -> Self {
        Target::Combatant(id.into())
    }

    pub fn cell(x: i32, y: i32) -> Self {
        Target::Cell(Position::new(x, y))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Combatant(id) => write!(f, "{}", id),
            Target::Cell(cell) => write!(f, "{}", cell),
        }
    }
}

/// Options that change how the affected set is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetingOptions {
    /// Leave the actor out of bursts centred on or around them
    pub exclude_caster: bool,
}

impl Default for TargetingOptions {
    fn default() -> Self {
        Self {
            exclude_caster: true,
        }
    }
}

/// Everything `power` may legally be aimed at from the actor's position.
///
/// Single-target powers yield combatants; area powers yield the cells they may
/// be centred on or pointed toward.
pub fn legal_targets(roster: &Roster, actor_id: &str, power: &Power) -> EngineResult<Vec<Target>> {
    let actor = roster.get(actor_id)?;
    let origin = placed(actor)?;
    let board = roster.board();

    let targets = match (power.area, power.attack) {
        (AreaShape::None, _) => single_targets(roster, actor, origin, power)
            .map(|c| Target::Combatant(c.id.clone()))
            .collect(),
        (AreaShape::Burst, AttackShape::Close) => vec![Target::Cell(origin)],
        (AreaShape::Burst, _) => board
            .within_steps(origin, power.range)
            .into_iter()
            .map(Target::Cell)
            .collect(),
        (AreaShape::Blast, _) => board
            .within_steps(origin, power.range)
            .into_iter()
            .filter(|cell| *cell != origin)
            .map(Target::Cell)
            .collect(),
    };
    Ok(targets)
}

/// Ids of the combatants `power` would hit when aimed at `target`, in roster
/// order.
///
/// A target that is not legal yields an empty set rather than an error; only a
/// cell off the board is rejected.
pub fn affected(
    roster: &Roster,
    actor_id: &str,
    power: &Power,
    target: &Target,
    options: TargetingOptions,
) -> EngineResult<Vec<String>> {
    let actor = roster.get(actor_id)?;
    let origin = placed(actor)?;
    let board = roster.board();

    if let Target::Cell(cell) = target {
        if !board.contains(*cell) {
            return Err(EngineError::OutOfBounds(*cell));
        }
    }

    let ids = match power.area {
        AreaShape::None => {
            let Target::Combatant(target_id) = target else {
                return Ok(Vec::new());
            };
            single_targets(roster, actor, origin, power)
                .filter(|c| &c.id == target_id)
                .map(|c| c.id.clone())
                .collect()
        }
        AreaShape::Burst => {
            let center = match power.attack {
                AttackShape::Close => Some(origin),
                _ => target_cell(roster, target)?.filter(|c| c.manhattan(origin) <= power.range),
            };
            let Some(center) = center else {
                return Ok(Vec::new());
            };
            let cells = board.burst(center, power.area_size);
            living_on(roster, &cells)
                .filter(|c| !(options.exclude_caster && c.id == actor.id))
                .map(|c| c.id.clone())
                .collect()
        }
        AreaShape::Blast => {
            let Some(toward) = target_cell(roster, target)? else {
                return Ok(Vec::new());
            };
            let cells = board.line(origin, toward, power.range);
            living_on(roster, &cells).map(|c| c.id.clone()).collect()
        }
    };
    Ok(ids)
}

/// Living combatants a single-target power may hit
fn single_targets<'a>(
    roster: &'a Roster,
    actor: &'a Combatant,
    origin: Position,
    power: &'a Power,
) -> impl Iterator<Item = &'a Combatant> + 'a {
    roster.iter().filter(move |c| {
        if c.is_down() {
            return false;
        }
        if c.id == actor.id {
            return power.allows_self;
        }
        let Some(cell) = c.position else {
            return false;
        };
        match power.attack {
            // The adjacent ring, and only if the range reaches it
            AttackShape::Melee => power.range >= 1 && cell.chebyshev(origin) == 1,
            AttackShape::Ranged | AttackShape::Close | AttackShape::Area => {
                cell.manhattan(origin) <= power.range
            }
        }
    })
}

fn living_on<'a>(roster: &'a Roster, cells: &'a [Position]) -> impl Iterator<Item = &'a Combatant> + 'a {
    roster
        .iter()
        .filter(move |c| c.is_alive() && c.position.is_some_and(|p| cells.contains(&p)))
}

/// Cell a target points at; `None` for an off-board or downed combatant
fn target_cell(roster: &Roster, target: &Target) -> EngineResult<Option<Position>> {
    match target {
        Target::Cell(cell) => Ok(Some(*cell)),
        Target::Combatant(id) => {
            let combatant = roster.get(id)?;
            Ok(combatant.position.filter(|_| combatant.is_alive()))
        }
    }
}

fn placed(actor: &Combatant) -> EngineResult<Position> {
    actor
        .position
        .ok_or_else(|| EngineError::illegal(format!("{} is not on the board", actor.id)))
}
