//! Power resolution
//!
//! Checks that a power may be used, rolls its dice and applies the results to
//! the roster. Resolution is all-or-nothing: the work happens on a staged copy
//! of the roster that replaces the live one only once everything succeeded.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::dice::{parse_dice, DiceOutcome, DiceSource};
use super::effects::EffectCatalog;
use super::power::{ActionCost, Power};
use super::roster::Roster;
use super::targeting::{affected, Target, TargetingOptions};
use crate::error::{EngineError, EngineResult};

/// Result of a power on one affected combatant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    pub target_id: String,
    /// Damage roll before the attacker's bonus
    pub damage_roll: Option<DiceOutcome>,
    /// HP actually lost
    pub damage: u32,
    pub healing_roll: Option<DiceOutcome>,
    /// HP actually regained
    pub healed: u32,
    /// Instance id of the applied status effect
    pub effect: Option<Uuid>,
    /// HP after the power resolved
    pub hp: u32,
    pub just_died: bool,
}

/// Report of a resolved power
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub actor_id: String,
    pub power_id: String,
    pub target: Target,
    /// One entry per affected combatant; may be empty
    pub hits: Vec<Hit>,
    /// Uses left afterwards (`None` = at-will)
    pub uses_left: Option<u32>,
}

impl Resolution {
    /// Combatants that dropped to 0 HP
    pub fn downed(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().filter(|h| h.just_died).map(|h| h.target_id.as_str())
    }
}

/// Check everything that must hold before `power` can be used.
///
/// Does not look at the target; see [`affected`] for that.
pub fn check_usable(roster: &Roster, effects: &EffectCatalog, actor_id: &str, power: &Power) -> EngineResult<()> {
    let actor = roster.get(actor_id)?;
    if actor.is_down() {
        return Err(EngineError::illegal(format!("{} is down", actor_id)));
    }
    if !actor.effects.can_act(effects) {
        return Err(EngineError::illegal(format!("{} cannot act", actor_id)));
    }

    roster.check_power_use(actor_id, power)?;

    match power.action {
        ActionCost::Standard if actor.has_acted => {
            return Err(EngineError::illegal(format!(
                "{} has already used their standard action",
                actor_id
            )));
        }
        ActionCost::Move if actor.has_moved => {
            return Err(EngineError::illegal(format!(
                "{} has already used their move action",
                actor_id
            )));
        }
        _ => {}
    }

    if actor.mp < power.resource_cost {
        return Err(EngineError::illegal(format!(
            "{} needs {} MP for {} but has {}",
            actor_id, power.resource_cost, power.id, actor.mp
        )));
    }
    Ok(())
}

/// Use `power` from `actor_id` on `target`.
///
/// On success the use is spent, MP is paid and the action flag for the
/// power's cost is set, even when nothing ends up in the affected area. On
/// failure the roster is untouched.
pub fn resolve(
    roster: &mut Roster,
    effects: &EffectCatalog,
    actor_id: &str,
    power: &Power,
    target: &Target,
    options: TargetingOptions,
    dice: &mut dyn DiceSource,
) -> EngineResult<Resolution> {
    check_usable(roster, effects, actor_id, power)?;
    power.validate(effects)?;

    let targets = affected(roster, actor_id, power, target, options)?;
    let bonus = roster.get(actor_id)?.damage_bonus();
    let damage = power.deals_damage().then(|| parse_dice(&power.damage)).transpose()?;
    let healing = power.healing.as_deref().map(parse_dice).transpose()?;

    let mut staged = roster.clone();
    let uses_left = staged.consume_power_use(actor_id, power)?;
    staged.spend_resource(actor_id, power.resource_cost)?;
    match power.action {
        ActionCost::Standard => staged.mark_acted(actor_id)?,
        ActionCost::Move => staged.mark_moved(actor_id)?,
        ActionCost::Minor | ActionCost::Free => {}
    }

    let mut hits = Vec::with_capacity(targets.len());
    for target_id in targets {
        let mut hit = Hit {
            target_id: target_id.clone(),
            damage_roll: None,
            damage: 0,
            healing_roll: None,
            healed: 0,
            effect: None,
            hp: staged.get(&target_id)?.hp,
            just_died: false,
        };

        if let Some(expression) = &damage {
            let roll = expression.roll(dice);
            let amount = roll.total.saturating_add(bonus).max(0) as u32;
            let outcome = staged.apply_damage(&target_id, amount)?;
            hit.damage = outcome.dealt;
            hit.hp = outcome.hp;
            hit.just_died = outcome.just_died;
            hit.damage_roll = Some(roll);
        }

        if let Some(expression) = &healing {
            let roll = expression.roll(dice);
            // A combatant dropped by this same power stays down
            if staged.get(&target_id)?.is_alive() {
                let outcome = staged.apply_healing(&target_id, roll.total.max(0) as u32, false)?;
                hit.healed = outcome.healed;
                hit.hp = outcome.hp;
            }
            hit.healing_roll = Some(roll);
        }

        if let Some(key) = &power.effect {
            hit.effect = Some(staged.apply_effect(&target_id, effects, key, None, Some(actor_id))?);
        }

        hits.push(hit);
    }

    *roster = staged;
    debug!(
        "Resolution: {} used {} on {} ({} hit)",
        actor_id,
        power.id,
        target,
        hits.len()
    );

    Ok(Resolution {
        actor_id: actor_id.to_string(),
        power_id: power.id.clone(),
        target: target.clone(),
        hits,
        uses_left,
    })
}
