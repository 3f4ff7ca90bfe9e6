//! Roster and action economy
//!
//! Single owner of every combatant's mutable state for one encounter:
//! - Hit points and resource points, clamped to their maxima
//! - Grid positions (one living combatant per cell)
//! - Has-moved / has-acted flags
//! - Remaining power uses
//! - Active status effects
//!
//! Every operation checks its preconditions before touching anything, so a
//! failed call leaves the roster unchanged.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::combatant::Combatant;
use super::effects::{DurationPolicy, EffectCatalog, StatusEffectInstance};
use super::grid::{Board, Facing, Position};
use super::power::{Power, PowerCatalog, PowerTier};
use crate::error::{EngineError, EngineResult};

/// Result of [`Roster::apply_damage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageOutcome {
    /// HP after the damage
    pub hp: u32,
    /// HP actually removed after clamping at 0
    pub dealt: u32,
    /// HP went from above 0 to 0
    pub just_died: bool,
}

/// Result of [`Roster::apply_healing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealOutcome {
    /// HP after the healing
    pub hp: u32,
    /// HP actually restored after clamping at max
    pub healed: u32,
    /// HP went from 0 to above 0
    pub revived: bool,
}

/// All combatants of one encounter, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    board: Board,
    combatants: Vec<Combatant>,
}

impl Roster {
    /// Create an empty roster on the given board
    pub fn new(board: Board) -> Self {
        Self {
            board,
            combatants: Vec::new(),
        }
    }

    pub fn board(&self) -> Board {
        self.board
    }

    /// Register a combatant
    pub fn add(&mut self, combatant: Combatant) -> EngineResult<()> {
        if self.find(&combatant.id).is_some() {
            return Err(EngineError::DuplicateCombatant(combatant.id));
        }
        if combatant.hp > combatant.max_hp || combatant.mp > combatant.max_mp {
            return Err(EngineError::illegal(format!(
                "{} has vitals above their maximum",
                combatant.id
            )));
        }
        if let Some(cell) = combatant.position {
            self.check_cell(&combatant.id, cell)?;
        }

        debug!("Roster: added {} ({})", combatant.name, combatant.id);
        self.combatants.push(combatant);
        Ok(())
    }

    /// Remove a combatant from the encounter
    pub fn dismiss(&mut self, id: &str) -> EngineResult<Combatant> {
        let index = self.index_of(id)?;
        debug!("Roster: dismissed {}", id);
        Ok(self.combatants.remove(index))
    }

    /// Look up a combatant
    pub fn get(&self, id: &str) -> EngineResult<&Combatant> {
        self.find(id)
            .ok_or_else(|| EngineError::UnknownCombatant(id.to_string()))
    }

    pub fn find(&self, id: &str) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Combatants in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter()
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Living combatant standing on `cell`
    pub fn occupant(&self, cell: Position) -> Option<&Combatant> {
        self.combatants
            .iter()
            .find(|c| c.is_alive() && c.position == Some(cell))
    }

    /// Deal damage, clamping HP at 0
    pub fn apply_damage(&mut self, id: &str, amount: u32) -> EngineResult<DamageOutcome> {
        let combatant = self.get_mut(id)?;
        let before = combatant.hp;
        combatant.hp = before.saturating_sub(amount);

        let outcome = DamageOutcome {
            hp: combatant.hp,
            dealt: before - combatant.hp,
            just_died: before > 0 && combatant.hp == 0,
        };
        debug!("Roster: {} takes {} damage ({} -> {})", id, amount, before, outcome.hp);
        Ok(outcome)
    }

    /// Restore HP, clamping at max.
    ///
    /// A combatant at 0 HP can only be healed when `revive_allowed` is set, and
    /// only while nobody living has taken their cell.
    pub fn apply_healing(
        &mut self,
        id: &str,
        amount: u32,
        revive_allowed: bool,
    ) -> EngineResult<HealOutcome> {
        let combatant = self.get(id)?;
        if combatant.is_down() {
            if !revive_allowed {
                return Err(EngineError::illegal(format!(
                    "{} is down and cannot be healed without a revive",
                    id
                )));
            }
            if let (Some(cell), true) = (combatant.position, amount > 0) {
                self.check_cell(id, cell)?;
            }
        }

        let combatant = self.get_mut(id)?;

        let before = combatant.hp;
        combatant.hp = before.saturating_add(amount).min(combatant.max_hp);

        let outcome = HealOutcome {
            hp: combatant.hp,
            healed: combatant.hp - before,
            revived: before == 0 && combatant.hp > 0,
        };
        debug!("Roster: {} heals {} ({} -> {})", id, amount, before, outcome.hp);
        Ok(outcome)
    }

    /// Spend resource points; fails if not enough are left
    pub fn spend_resource(&mut self, id: &str, amount: u32) -> EngineResult<u32> {
        let combatant = self.get_mut(id)?;
        if combatant.mp < amount {
            return Err(EngineError::illegal(format!(
                "{} needs {} MP but has {}",
                id, amount, combatant.mp
            )));
        }
        combatant.mp -= amount;
        Ok(combatant.mp)
    }

    /// Restore resource points, clamping at max
    pub fn restore_resource(&mut self, id: &str, amount: u32) -> EngineResult<u32> {
        let combatant = self.get_mut(id)?;
        combatant.mp = combatant.mp.saturating_add(amount).min(combatant.max_mp);
        Ok(combatant.mp)
    }

    /// Place a combatant on a cell
    pub fn set_position(&mut self, id: &str, cell: Position, facing: Facing) -> EngineResult<()> {
        self.index_of(id)?;
        self.check_cell(id, cell)?;

        let combatant = self.get_mut(id)?;
        combatant.position = Some(cell);
        combatant.facing = facing;
        Ok(())
    }

    /// Walk to a cell within speed, turning toward the direction of travel.
    ///
    /// Spends the combatant's move for the round.
    pub fn move_to(&mut self, id: &str, cell: Position) -> EngineResult<Facing> {
        let combatant = self.get(id)?;
        if combatant.is_down() {
            return Err(EngineError::illegal(format!("{} is down and cannot move", id)));
        }
        if combatant.has_moved {
            return Err(EngineError::AlreadyConsumed {
                combatant: id.to_string(),
                what: "moved",
            });
        }
        let Some(from) = combatant.position else {
            return Err(EngineError::illegal(format!("{} is not on the board", id)));
        };
        let distance = from.manhattan(cell);
        if i64::from(distance) > i64::from(combatant.speed) {
            return Err(EngineError::illegal(format!(
                "{} cannot reach {} ({} steps, speed {})",
                id, cell, distance, combatant.speed
            )));
        }
        let facing = Facing::toward(from, cell).unwrap_or(combatant.facing);

        self.set_position(id, cell, facing)?;
        self.mark_moved(id)?;
        debug!("Roster: {} moved {} -> {} facing {}", id, from, cell, facing);
        Ok(facing)
    }

    /// Free cells the combatant could move to this round
    pub fn reachable_cells(&self, id: &str) -> EngineResult<Vec<Position>> {
        let combatant = self.get(id)?;
        let Some(from) = combatant.position else {
            return Ok(Vec::new());
        };
        Ok(self
            .board
            .within_steps(from, i32::try_from(combatant.speed).unwrap_or(i32::MAX))
            .into_iter()
            .filter(|&cell| cell != from && self.occupant(cell).is_none())
            .collect())
    }

    /// Record that the combatant moved this round
    pub fn mark_moved(&mut self, id: &str) -> EngineResult<()> {
        let combatant = self.get_mut(id)?;
        if combatant.has_moved {
            return Err(EngineError::AlreadyConsumed {
                combatant: id.to_string(),
                what: "moved",
            });
        }
        combatant.has_moved = true;
        Ok(())
    }

    /// Record that the combatant acted this round
    pub fn mark_acted(&mut self, id: &str) -> EngineResult<()> {
        let combatant = self.get_mut(id)?;
        if combatant.has_acted {
            return Err(EngineError::AlreadyConsumed {
                combatant: id.to_string(),
                what: "acted",
            });
        }
        combatant.has_acted = true;
        Ok(())
    }

    /// Check that a use of `power` is available without spending it
    pub fn check_power_use(&self, id: &str, power: &Power) -> EngineResult<()> {
        let combatant = self.get(id)?;
        let Some(uses) = combatant.uses_remaining(&power.id) else {
            return Err(EngineError::UnknownPower(power.id.clone()));
        };
        if power.tier != PowerTier::AtWill && uses == Some(0) {
            return Err(EngineError::PowerExhausted {
                combatant: id.to_string(),
                power: power.id.clone(),
            });
        }
        Ok(())
    }

    /// Spend one use of a power; at-will powers never run out.
    ///
    /// Returns the uses left (`None` = unlimited).
    pub fn consume_power_use(&mut self, id: &str, power: &Power) -> EngineResult<Option<u32>> {
        self.check_power_use(id, power)?;
        if power.tier == PowerTier::AtWill {
            return Ok(None);
        }

        let combatant = self.get_mut(id)?;
        let uses = combatant.powers.entry(power.id.clone()).or_insert(Some(0));
        let left = uses.map(|n| n.saturating_sub(1));
        *uses = left;
        debug!("Roster: {} used {} ({:?} left)", id, power.id, left);
        Ok(left)
    }

    /// Give a combatant a power with its tier's starting uses
    pub fn grant_power(&mut self, id: &str, power: &Power) -> EngineResult<()> {
        let combatant = self.get_mut(id)?;
        combatant.powers.insert(power.id.clone(), power.initial_uses());
        Ok(())
    }

    /// Restore limited powers after a rest.
    ///
    /// `Encounter` refreshes encounter powers; `Daily` refreshes both daily and
    /// encounter powers. Powers missing from the catalog are left alone.
    pub fn refresh_powers(&mut self, tier: PowerTier, catalog: &PowerCatalog) {
        for combatant in &mut self.combatants {
            for (power_id, uses) in combatant.powers.iter_mut() {
                let Some(power) = catalog.get(power_id) else {
                    continue;
                };
                let refresh = match tier {
                    PowerTier::AtWill => false,
                    PowerTier::Encounter => power.tier == PowerTier::Encounter,
                    PowerTier::Daily => power.tier != PowerTier::AtWill,
                };
                if refresh {
                    *uses = power.initial_uses();
                }
            }
        }
    }

    /// Apply a catalog effect, returning the new instance id
    pub fn apply_effect(
        &mut self,
        id: &str,
        catalog: &EffectCatalog,
        key: &str,
        duration: Option<DurationPolicy>,
        source: Option<&str>,
    ) -> EngineResult<Uuid> {
        let definition = catalog
            .get(key)
            .ok_or_else(|| EngineError::UnknownEffect(key.to_string()))?;
        let combatant = self.get_mut(id)?;

        let mut instance = StatusEffectInstance::new(definition, duration);
        if let Some(source) = source {
            instance = instance.with_source(source);
        }
        let instance_id = instance.id;
        debug!("Roster: {} is now {} ({})", id, key, instance.duration);
        combatant.effects.add(instance);
        Ok(instance_id)
    }

    /// Remove one effect instance
    pub fn remove_effect(&mut self, id: &str, instance_id: Uuid) -> EngineResult<StatusEffectInstance> {
        let combatant = self.get_mut(id)?;
        combatant
            .effects
            .remove(instance_id)
            .ok_or_else(|| EngineError::UnknownEffect(instance_id.to_string()))
    }

    /// Remove every instance with the given duration from one combatant
    pub fn clear_effects(
        &mut self,
        id: &str,
        duration: DurationPolicy,
    ) -> EngineResult<Vec<StatusEffectInstance>> {
        let combatant = self.get_mut(id)?;
        let due = combatant.effects.with_duration(duration);
        Ok(due
            .into_iter()
            .filter_map(|instance_id| combatant.effects.remove(instance_id))
            .collect())
    }

    /// Check if a combatant carries an effect key
    pub fn has_effect(&self, id: &str, key: &str) -> EngineResult<bool> {
        Ok(self.get(id)?.effects.has(key))
    }

    /// Check if a combatant may take actions
    pub fn can_act(&self, id: &str, catalog: &EffectCatalog) -> EngineResult<bool> {
        let combatant = self.get(id)?;
        Ok(combatant.is_alive() && combatant.effects.can_act(catalog))
    }

    /// Clear has-moved / has-acted for everyone
    pub fn reset_round_flags(&mut self) {
        for combatant in &mut self.combatants {
            combatant.has_moved = false;
            combatant.has_acted = false;
        }
    }

    fn get_mut(&mut self, id: &str) -> EngineResult<&mut Combatant> {
        self.combatants
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| EngineError::UnknownCombatant(id.to_string()))
    }

    fn index_of(&self, id: &str) -> EngineResult<usize> {
        self.combatants
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| EngineError::UnknownCombatant(id.to_string()))
    }

    /// Bounds and occupancy check for placing `id` on `cell`
    fn check_cell(&self, id: &str, cell: Position) -> EngineResult<()> {
        if !self.board.contains(cell) {
            return Err(EngineError::OutOfBounds(cell));
        }
        match self.occupant(cell) {
            Some(other) if other.id != id => Err(EngineError::CellOccupied {
                cell,
                occupant: other.id.clone(),
            }),
            _ => Ok(()),
        }
    }
}
