//! Initiative and turn sequencing
//!
//! A small state machine: `Setup -> Rolling -> Active -> Ended`.
//!
//! Turn order is sorted by total (descending), then modifier (descending),
//! then registration order. Combatants at 0 HP keep their slot but are skipped
//! when the turn advances.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::dice::{DiceExpression, DiceSource};
use super::effects::DurationPolicy;
use super::roster::Roster;
use crate::error::{EngineError, EngineResult};

/// Sequencer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Combatants registered, no rolls yet
    #[default]
    Setup,
    /// At least one roll recorded
    Rolling,
    /// Turns are being taken
    Active,
    /// Combat is over
    Ended,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Rolling => "rolling",
            Phase::Active => "active",
            Phase::Ended => "ended",
        }
    }
}

/// One combatant's initiative result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeEntry {
    pub combatant_id: String,
    /// The d20 result
    pub natural: u32,
    pub modifier: i32,
    pub total: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Registration {
    combatant_id: String,
    modifier: i32,
    entry: Option<InitiativeEntry>,
}

/// Effect instance the caller should now clear
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueEffect {
    pub combatant_id: String,
    pub instance_id: Uuid,
    pub duration: DurationPolicy,
}

/// What happened on [`Sequencer::advance_turn`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnAdvance {
    /// Whose turn just ended
    pub ended: String,
    /// Who is up now
    pub current: String,
    pub round: u32,
    /// The order wrapped and a new round began
    pub new_round: bool,
    /// End-of-turn effects of `ended`, plus end-of-round effects on a wrap
    pub due_effects: Vec<DueEffect>,
}

/// Initiative and turn state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequencer {
    phase: Phase,
    registered: Vec<Registration>,
    order: Vec<InitiativeEntry>,
    current: usize,
    round: u32,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self {
            phase: Phase::Setup,
            registered: Vec::new(),
            order: Vec::new(),
            current: 0,
            round: 1,
        }
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current round, starting at 1
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Index of the current entry in the turn order
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Sorted turn order (empty before combat starts)
    pub fn order(&self) -> &[InitiativeEntry] {
        &self.order
    }

    /// Combatant ids in registration order
    pub fn registered(&self) -> impl Iterator<Item = &str> {
        self.registered.iter().map(|r| r.combatant_id.as_str())
    }

    /// Recorded roll for a combatant, if any
    pub fn entry(&self, combatant_id: &str) -> Option<&InitiativeEntry> {
        self.registered
            .iter()
            .find(|r| r.combatant_id == combatant_id)
            .and_then(|r| r.entry.as_ref())
    }

    /// Add a combatant before combat starts
    pub fn register(&mut self, combatant_id: &str, modifier: i32) -> EngineResult<()> {
        self.require("register", &[Phase::Setup, Phase::Rolling])?;
        if self.registered.iter().any(|r| r.combatant_id == combatant_id) {
            return Err(EngineError::DuplicateCombatant(combatant_id.to_string()));
        }
        self.registered.push(Registration {
            combatant_id: combatant_id.to_string(),
            modifier,
            entry: None,
        });
        Ok(())
    }

    /// Roll `1d20 + modifier` for one combatant
    pub fn roll(&mut self, combatant_id: &str, dice: &mut dyn DiceSource) -> EngineResult<InitiativeEntry> {
        self.require("roll", &[Phase::Setup, Phase::Rolling])?;
        let modifier = self.registration(combatant_id)?.modifier;
        let outcome = DiceExpression::new(1, 20, modifier).roll(dice);
        let natural = outcome.groups.first().map_or(1, |g| g.sum() as u32);
        self.record_roll(combatant_id, natural)
    }

    /// Enter a physical d20 result by hand
    pub fn record_roll(&mut self, combatant_id: &str, natural: u32) -> EngineResult<InitiativeEntry> {
        self.require("record_roll", &[Phase::Setup, Phase::Rolling])?;
        if !(1..=20).contains(&natural) {
            return Err(EngineError::illegal(format!(
                "initiative roll {} is not a d20 result",
                natural
            )));
        }

        let registration = self.registration_mut(combatant_id)?;
        if registration.entry.is_some() {
            return Err(EngineError::AlreadyConsumed {
                combatant: combatant_id.to_string(),
                what: "rolled initiative",
            });
        }

        let entry = InitiativeEntry {
            combatant_id: combatant_id.to_string(),
            natural,
            modifier: registration.modifier,
            total: natural as i32 + registration.modifier,
        };
        registration.entry = Some(entry.clone());
        self.phase = Phase::Rolling;

        debug!(
            "Initiative: {} rolled {} ({:+}) = {}",
            combatant_id, natural, entry.modifier, entry.total
        );
        Ok(entry)
    }

    /// Roll for everyone who has not rolled yet
    pub fn roll_all(&mut self, dice: &mut dyn DiceSource) -> EngineResult<Vec<InitiativeEntry>> {
        self.require("roll_all", &[Phase::Setup, Phase::Rolling])?;
        let pending: Vec<String> = self
            .registered
            .iter()
            .filter(|r| r.entry.is_none())
            .map(|r| r.combatant_id.clone())
            .collect();

        pending.iter().map(|id| self.roll(id, dice)).collect()
    }

    /// Sort the rolls and begin round 1
    pub fn start(&mut self) -> EngineResult<&[InitiativeEntry]> {
        self.require("start", &[Phase::Rolling])?;
        let Some(entries) = self
            .registered
            .iter()
            .map(|r| r.entry.clone())
            .collect::<Option<Vec<_>>>()
        else {
            return Err(EngineError::InvalidState {
                operation: "start (missing initiative rolls)",
                phase: self.phase.name(),
            });
        };

        let mut order = entries;
        // Stable: equal total and modifier keep registration order
        order.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| b.modifier.cmp(&a.modifier)));

        self.order = order;
        self.current = 0;
        self.round = 1;
        self.phase = Phase::Active;

        info!(
            "Combat started: {}",
            self.order
                .iter()
                .map(|e| format!("{} ({})", e.combatant_id, e.total))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(&self.order)
    }

    /// Entry whose turn it is
    pub fn current(&self) -> EngineResult<&InitiativeEntry> {
        self.require("current", &[Phase::Active])?;
        self.order.get(self.current).ok_or(EngineError::InvalidState {
            operation: "current (empty turn order)",
            phase: self.phase.name(),
        })
    }

    /// Move to the next living combatant.
    ///
    /// Wrapping past the end starts a new round and clears every combatant's
    /// round flags.
    pub fn advance_turn(&mut self, roster: &mut Roster) -> EngineResult<TurnAdvance> {
        let ended = self.current()?.combatant_id.clone();
        let mut due_effects = due(roster, &ended, DurationPolicy::EndOfTurn);
        let new_round = self.seek_living(roster, false, &mut due_effects);

        let current = self.order[self.current].combatant_id.clone();
        debug!("Initiative: {} -> {} (round {})", ended, current, self.round);

        Ok(TurnAdvance {
            ended,
            current,
            round: self.round,
            new_round,
            due_effects,
        })
    }

    /// Move a combatant to the end of the order.
    ///
    /// Delaying someone before the current entry steps the index back so the
    /// same combatant stays up. Delaying the current combatant hands the turn
    /// to the next living combatant in line and returns that hand-off; the
    /// delayer's end-of-turn effects are not due, as their turn has not ended.
    pub fn delay(
        &mut self,
        combatant_id: &str,
        roster: &mut Roster,
    ) -> EngineResult<Option<TurnAdvance>> {
        self.require("delay", &[Phase::Active])?;
        let index = self.order_index(combatant_id)?;
        let last = self.order.len() - 1;

        let entry = self.order.remove(index);
        self.order.push(entry);
        debug!("Initiative: {} delays", combatant_id);

        if index < self.current {
            self.current -= 1;
            return Ok(None);
        }
        if index > self.current {
            return Ok(None);
        }

        // The slot now holds the next in line, unless the delayer was already last
        let mut due_effects = Vec::new();
        let new_round = self.seek_living(roster, index < last, &mut due_effects);
        let current = self.order[self.current].combatant_id.clone();
        debug!(
            "Initiative: {} hands the turn to {} (round {})",
            combatant_id, current, self.round
        );

        Ok(Some(TurnAdvance {
            ended: combatant_id.to_string(),
            current,
            round: self.round,
            new_round,
            due_effects,
        }))
    }

    /// Drop a combatant from the order.
    ///
    /// Removing the current entry leaves the pointer on its index, so the
    /// combatant that slides into that slot is up next; removing the last
    /// entry while it is current wraps to a new round.
    pub fn remove(&mut self, combatant_id: &str, roster: &mut Roster) -> EngineResult<()> {
        self.require("remove", &[Phase::Setup, Phase::Rolling, Phase::Active])?;

        if self.phase != Phase::Active {
            let index = self
                .registered
                .iter()
                .position(|r| r.combatant_id == combatant_id)
                .ok_or_else(|| EngineError::UnknownCombatant(combatant_id.to_string()))?;
            self.registered.remove(index);
            return Ok(());
        }

        let index = self.order_index(combatant_id)?;
        self.order.remove(index);
        self.registered.retain(|r| r.combatant_id != combatant_id);

        if index < self.current {
            self.current -= 1;
        } else if self.current >= self.order.len() {
            self.current = 0;
            if !self.order.is_empty() {
                self.start_round(roster);
            }
        }
        debug!("Initiative: {} removed from the order", combatant_id);
        Ok(())
    }

    /// Finish combat; no further turn operations are accepted
    pub fn end_combat(&mut self) -> EngineResult<()> {
        self.require("end_combat", &[Phase::Active])?;
        self.phase = Phase::Ended;
        info!("Combat ended after {} round(s)", self.round);
        Ok(())
    }

    /// Step the pointer to the next living combatant, starting at the
    /// pointer itself when `from_current` is set.
    ///
    /// Returns true when the order wrapped; end-of-round effects are appended
    /// to `due_effects`.
    fn seek_living(
        &mut self,
        roster: &mut Roster,
        from_current: bool,
        due_effects: &mut Vec<DueEffect>,
    ) -> bool {
        let len = self.order.len();
        let mut new_round = false;

        for step in 0..len {
            if step > 0 || !from_current {
                self.current += 1;
            }
            if self.current >= len {
                self.current = 0;
                self.start_round(roster);
                new_round = true;
                let everyone: Vec<String> = roster.iter().map(|c| c.id.clone()).collect();
                for id in &everyone {
                    due_effects.extend(due(roster, id, DurationPolicy::EndOfRound));
                }
            }
            let id = &self.order[self.current].combatant_id;
            if roster.find(id).is_some_and(|c| c.is_alive()) {
                break;
            }
            debug!("Initiative: skipping {} (down)", id);
        }
        new_round
    }

    fn start_round(&mut self, roster: &mut Roster) {
        self.round += 1;
        roster.reset_round_flags();
        debug!("Initiative: round {} begins", self.round);
    }

    fn require(&self, operation: &'static str, allowed: &[Phase]) -> EngineResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else if self.phase == Phase::Ended {
            Err(EngineError::EncounterEnded)
        } else {
            Err(EngineError::InvalidState {
                operation,
                phase: self.phase.name(),
            })
        }
    }

    fn registration(&self, combatant_id: &str) -> EngineResult<&Registration> {
        self.registered
            .iter()
            .find(|r| r.combatant_id == combatant_id)
            .ok_or_else(|| EngineError::UnknownCombatant(combatant_id.to_string()))
    }

    fn registration_mut(&mut self, combatant_id: &str) -> EngineResult<&mut Registration> {
        self.registered
            .iter_mut()
            .find(|r| r.combatant_id == combatant_id)
            .ok_or_else(|| EngineError::UnknownCombatant(combatant_id.to_string()))
    }

    fn order_index(&self, combatant_id: &str) -> EngineResult<usize> {
        self.order
            .iter()
            .position(|e| e.combatant_id == combatant_id)
            .ok_or_else(|| EngineError::UnknownCombatant(combatant_id.to_string()))
    }
}

/// Instances on `combatant_id` with the given duration
fn due(roster: &Roster, combatant_id: &str, duration: DurationPolicy) -> Vec<DueEffect> {
    roster
        .find(combatant_id)
        .map(|c| {
            c.effects
                .with_duration(duration)
                .into_iter()
                .map(|instance_id| DueEffect {
                    combatant_id: combatant_id.to_string(),
                    instance_id,
                    duration,
                })
                .collect()
        })
        .unwrap_or_default()
}
