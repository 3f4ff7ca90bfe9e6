//! Encounter facade
//!
//! One [`Encounter`] owns everything a single fight needs: the roster, the turn
//! sequencer, the read-only catalogs, the dice source and the combat log. Every
//! mutating call either succeeds completely or returns an error and leaves the
//! encounter as it was. Callers persist or broadcast [`Encounter::state`] after
//! each successful mutation.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::combat::{
    resolve, CombatLog, Combatant, DiceSource, DurationPolicy, EffectCatalog, EventKind, Facing,
    InitiativeEntry, Phase, Position, PowerCatalog, PowerTier, Resolution, RngSource, Roster,
    Sequencer, Target, TurnAdvance,
};
use crate::config::{ConfigError, EngineConfig};
use crate::error::{EngineError, EngineResult};

/// Snapshot of the turn state, for persistence and broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterState {
    pub id: Uuid,
    pub name: String,
    pub phase: Phase,
    pub round: u32,
    pub current_index: usize,
    pub turn_order: Vec<String>,
    /// Whose turn it is, while combat is active
    pub current: Option<String>,
}

/// A single fight
pub struct Encounter {
    id: Uuid,
    name: String,
    config: EngineConfig,
    effects: EffectCatalog,
    powers: PowerCatalog,
    roster: Roster,
    sequencer: Sequencer,
    log: CombatLog,
    dice: Box<dyn DiceSource + Send>,
}

impl Encounter {
    /// Create an encounter, loading catalogs as the config says
    pub fn new(name: impl Into<String>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (effects, powers) = config.catalogs()?;
        Ok(Self::with_catalogs(name, config, effects, powers))
    }

    /// Create an encounter from catalogs already in hand
    pub fn with_catalogs(
        name: impl Into<String>,
        config: EngineConfig,
        effects: EffectCatalog,
        powers: PowerCatalog,
    ) -> Self {
        let name = name.into();
        let id = Uuid::new_v4();
        info!("Encounter {} ({}) created", name, id);
        Self {
            id,
            name,
            roster: Roster::new(config.board()),
            config,
            effects,
            powers,
            sequencer: Sequencer::new(),
            log: CombatLog::new(),
            dice: Box::new(RngSource::from_entropy()),
        }
    }

    /// Replace the dice source (seeded or scripted dice)
    pub fn with_dice(mut self, dice: impl DiceSource + Send + 'static) -> Self {
        self.dice = Box::new(dice);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn effects(&self) -> &EffectCatalog {
        &self.effects
    }

    pub fn powers(&self) -> &PowerCatalog {
        &self.powers
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn log(&self) -> &CombatLog {
        &self.log
    }

    pub fn phase(&self) -> Phase {
        self.sequencer.phase()
    }

    pub fn round(&self) -> u32 {
        self.sequencer.round()
    }

    /// Current turn state
    pub fn state(&self) -> EncounterState {
        EncounterState {
            id: self.id,
            name: self.name.clone(),
            phase: self.sequencer.phase(),
            round: self.sequencer.round(),
            current_index: self.sequencer.current_index(),
            turn_order: self
                .sequencer
                .order()
                .iter()
                .map(|e| e.combatant_id.clone())
                .collect(),
            current: self.sequencer.current().ok().map(|e| e.combatant_id.clone()),
        }
    }

    // =========================================================================
    // Roster
    // =========================================================================

    /// Add a combatant before combat starts.
    ///
    /// Living combatants are registered for initiative with a modifier derived
    /// from their speed.
    pub fn add_combatant(&mut self, combatant: Combatant) -> EngineResult<()> {
        match self.sequencer.phase() {
            Phase::Setup | Phase::Rolling => {}
            Phase::Active => {
                return Err(EngineError::InvalidState {
                    operation: "add_combatant",
                    phase: Phase::Active.name(),
                })
            }
            Phase::Ended => return Err(EngineError::EncounterEnded),
        }
        for power_id in combatant.powers.keys() {
            if !self.powers.contains(power_id) {
                return Err(EngineError::UnknownPower(power_id.clone()));
            }
        }

        let id = combatant.id.clone();
        let modifier = combatant.initiative_modifier();
        let alive = combatant.is_alive();
        let message = format!("{} joins the encounter", combatant.name);

        self.roster.add(combatant)?;
        if alive {
            self.sequencer.register(&id, modifier)?;
        }
        self.record(Some(&id), EventKind::System, message);
        Ok(())
    }

    /// Take a combatant out of the encounter entirely
    pub fn dismiss(&mut self, id: &str) -> EngineResult<Combatant> {
        self.roster.get(id)?;
        let in_order = self.sequencer.registered().any(|r| r == id);
        if in_order && self.sequencer.phase() != Phase::Ended {
            self.sequencer.remove(id, &mut self.roster)?;
        }

        let combatant = self.roster.dismiss(id)?;
        self.record(Some(id), EventKind::System, format!("{} leaves the encounter", combatant.name));
        Ok(combatant)
    }

    /// Move the current combatant, spending their move for the round.
    ///
    /// Effects that last until the next move action (prone) end here.
    pub fn move_combatant(&mut self, id: &str, cell: Position) -> EngineResult<Facing> {
        let result = self.require_turn(id).and_then(|_| self.roster.move_to(id, cell));
        match result {
            Ok(facing) => {
                let name = self.name_of(id);
                self.record(Some(id), EventKind::Movement, format!("{} moves to {}", name, cell));
                for removed in self.roster.clear_effects(id, DurationPolicy::MoveAction)? {
                    self.record(
                        Some(id),
                        EventKind::Status,
                        format!("{} is no longer {}", name, removed.key),
                    );
                }
                Ok(facing)
            }
            Err(e) => {
                warn!("Rejected move of {} to {}: {}", id, cell, e);
                Err(e)
            }
        }
    }

    /// Cells a combatant could move to right now
    pub fn reachable_cells(&self, id: &str) -> EngineResult<Vec<Position>> {
        self.roster.reachable_cells(id)
    }

    /// Apply a status effect from the catalog
    pub fn apply_effect(
        &mut self,
        id: &str,
        key: &str,
        duration: Option<DurationPolicy>,
        source: Option<&str>,
    ) -> EngineResult<Uuid> {
        self.require_not_ended()?;
        let instance = self.roster.apply_effect(id, &self.effects, key, duration, source)?;
        let name = self.name_of(id);
        self.record(source, EventKind::Status, format!("{} is {}", name, key));
        Ok(instance)
    }

    /// Remove one status effect instance
    pub fn remove_effect(&mut self, id: &str, instance_id: Uuid) -> EngineResult<()> {
        self.require_not_ended()?;
        let removed = self.roster.remove_effect(id, instance_id)?;
        let name = self.name_of(id);
        self.record(
            Some(id),
            EventKind::Status,
            format!("{} is no longer {}", name, removed.key),
        );
        Ok(())
    }

    // =========================================================================
    // Initiative
    // =========================================================================

    pub fn roll_initiative(&mut self, id: &str) -> EngineResult<InitiativeEntry> {
        let entry = self.sequencer.roll(id, self.dice.as_mut())?;
        self.record_entry(&entry);
        Ok(entry)
    }

    /// Enter a physical d20 roll
    pub fn record_initiative(&mut self, id: &str, natural: u32) -> EngineResult<InitiativeEntry> {
        let entry = self.sequencer.record_roll(id, natural)?;
        self.record_entry(&entry);
        Ok(entry)
    }

    pub fn roll_all_initiative(&mut self) -> EngineResult<Vec<InitiativeEntry>> {
        let entries = self.sequencer.roll_all(self.dice.as_mut())?;
        for entry in &entries {
            self.record_entry(entry);
        }
        Ok(entries)
    }

    /// Sort initiative and begin round 1
    pub fn start_combat(&mut self) -> EngineResult<()> {
        self.sequencer.start()?;
        self.roster.reset_round_flags();
        self.record(None, EventKind::System, "Combat begins! Round 1".to_string());
        if let Ok(first) = self.sequencer.current().map(|e| e.combatant_id.clone()) {
            let name = self.name_of(&first);
            self.record(None, EventKind::System, format!("{}'s turn", name));
        }
        info!("Encounter {}: combat started", self.name);
        Ok(())
    }

    pub fn current_combatant(&self) -> EngineResult<&Combatant> {
        let entry = self.sequencer.current()?;
        self.roster.get(&entry.combatant_id)
    }

    /// End the current turn, clear effects that expire and move on
    pub fn end_turn(&mut self) -> EngineResult<TurnAdvance> {
        let advance = self.sequencer.advance_turn(&mut self.roster)?;
        self.settle(&advance);
        Ok(advance)
    }

    /// Push a combatant to the end of the order.
    ///
    /// When the current combatant delays, the turn passes straight to the next
    /// in line and the hand-off is returned.
    pub fn delay(&mut self, id: &str) -> EngineResult<Option<TurnAdvance>> {
        let handoff = self.sequencer.delay(id, &mut self.roster)?;
        let name = self.name_of(id);
        self.record(Some(id), EventKind::System, format!("{} delays their turn", name));
        if let Some(advance) = &handoff {
            self.settle(advance);
        }
        Ok(handoff)
    }

    /// Clear the effects a turn change made due and log who is up
    fn settle(&mut self, advance: &TurnAdvance) {
        for due in &advance.due_effects {
            if let Ok(removed) = self.roster.remove_effect(&due.combatant_id, due.instance_id) {
                let name = self.name_of(&due.combatant_id);
                self.record(
                    Some(&due.combatant_id),
                    EventKind::Status,
                    format!("{} is no longer {}", name, removed.key),
                );
            }
        }
        if advance.new_round {
            self.record(None, EventKind::System, format!("Round {} begins", advance.round));
        }
        let name = self.name_of(&advance.current);
        self.record(None, EventKind::System, format!("{}'s turn", name));
    }

    /// Drop a combatant from the turn order while keeping them on the board
    pub fn remove_from_order(&mut self, id: &str) -> EngineResult<()> {
        self.sequencer.remove(id, &mut self.roster)?;
        let name = self.name_of(id);
        self.record(Some(id), EventKind::System, format!("{} leaves the turn order", name));
        Ok(())
    }

    /// Finish combat.
    ///
    /// Encounter-long effects end, encounter powers come back and the round
    /// flags are cleared.
    pub fn end_combat(&mut self) -> EngineResult<()> {
        self.sequencer.end_combat()?;

        let ids: Vec<String> = self.roster.iter().map(|c| c.id.clone()).collect();
        for id in &ids {
            self.roster.clear_effects(id, DurationPolicy::Encounter)?;
        }
        self.roster.refresh_powers(PowerTier::Encounter, &self.powers);
        self.roster.reset_round_flags();

        let round = self.sequencer.round();
        self.record(
            None,
            EventKind::System,
            format!("Combat ends after {} round(s)", round),
        );
        Ok(())
    }

    /// Tear down an ended combat so the same roster can roll initiative again
    pub fn new_combat(&mut self) -> EngineResult<()> {
        if self.sequencer.phase() != Phase::Ended {
            return Err(EngineError::InvalidState {
                operation: "new_combat",
                phase: self.sequencer.phase().name(),
            });
        }

        let mut sequencer = Sequencer::new();
        for combatant in self.roster.iter().filter(|c| c.is_alive()) {
            sequencer.register(&combatant.id, combatant.initiative_modifier())?;
        }
        self.sequencer = sequencer;
        debug!("Encounter {}: back to setup", self.name);
        Ok(())
    }

    // =========================================================================
    // Powers
    // =========================================================================

    /// Where a power may be aimed from the combatant's position
    pub fn legal_targets(&self, id: &str, power_id: &str) -> EngineResult<Vec<Target>> {
        let power = self
            .powers
            .get(power_id)
            .ok_or_else(|| EngineError::UnknownPower(power_id.to_string()))?;
        crate::combat::legal_targets(&self.roster, id, power)
    }

    /// Use a power on the current combatant's turn.
    ///
    /// `exclude_caster` overrides the configured burst behaviour for this call.
    pub fn use_power(
        &mut self,
        id: &str,
        power_id: &str,
        target: &Target,
        exclude_caster: Option<bool>,
    ) -> EngineResult<Resolution> {
        let result = self.try_use_power(id, power_id, target, exclude_caster);
        match &result {
            Ok(resolution) => self.record_resolution(resolution),
            Err(e) => warn!("Rejected {} using {} on {}: {}", id, power_id, target, e),
        }
        result
    }

    fn try_use_power(
        &mut self,
        id: &str,
        power_id: &str,
        target: &Target,
        exclude_caster: Option<bool>,
    ) -> EngineResult<Resolution> {
        self.require_turn(id)?;
        let power = self
            .powers
            .get(power_id)
            .ok_or_else(|| EngineError::UnknownPower(power_id.to_string()))?;

        let mut options = self.config.targeting();
        if let Some(exclude) = exclude_caster {
            options.exclude_caster = exclude;
        }
        resolve(
            &mut self.roster,
            &self.effects,
            id,
            power,
            target,
            options,
            self.dice.as_mut(),
        )
    }

    fn record_resolution(&mut self, resolution: &Resolution) {
        let actor = resolution.actor_id.as_str();
        let actor_name = self.name_of(actor);
        let power_name = self
            .powers
            .get(&resolution.power_id)
            .map_or_else(|| resolution.power_id.clone(), |p| p.name.clone());

        if resolution.hits.is_empty() {
            self.record(
                Some(actor),
                EventKind::Combat,
                format!("{} uses {}, but there are no targets", actor_name, power_name),
            );
            return;
        }

        self.record(
            Some(actor),
            EventKind::Combat,
            format!("{} uses {} on {}", actor_name, power_name, resolution.target),
        );
        for hit in &resolution.hits {
            let target_name = self.name_of(&hit.target_id);
            if hit.damage_roll.is_some() {
                self.record(
                    Some(actor),
                    EventKind::Damage,
                    format!("{} takes {} damage ({} HP left)", target_name, hit.damage, hit.hp),
                );
            }
            if hit.healing_roll.is_some() {
                self.record(
                    Some(actor),
                    EventKind::Healing,
                    format!("{} recovers {} HP", target_name, hit.healed),
                );
            }
            if hit.effect.is_some() {
                if let Some(key) = self.powers.get(&resolution.power_id).and_then(|p| p.effect.clone()) {
                    self.record(Some(actor), EventKind::Status, format!("{} is {}", target_name, key));
                }
            }
            if hit.just_died {
                self.record(Some(actor), EventKind::Death, format!("{} falls!", target_name));
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Combat is active and it is `id`'s turn
    fn require_turn(&self, id: &str) -> EngineResult<()> {
        let current = self.sequencer.current()?;
        if current.combatant_id != id {
            return Err(EngineError::illegal(format!(
                "it is {}'s turn, not {}'s",
                current.combatant_id, id
            )));
        }
        Ok(())
    }

    fn require_not_ended(&self) -> EngineResult<()> {
        if self.sequencer.phase() == Phase::Ended {
            return Err(EngineError::EncounterEnded);
        }
        Ok(())
    }

    fn name_of(&self, id: &str) -> String {
        self.roster
            .find(id)
            .map_or_else(|| id.to_string(), |c| c.name.clone())
    }

    fn record_entry(&mut self, entry: &InitiativeEntry) {
        let name = self.name_of(&entry.combatant_id);
        self.record(
            Some(&entry.combatant_id),
            EventKind::System,
            format!(
                "{} rolls initiative: {} ({:+}) = {}",
                name, entry.natural, entry.modifier, entry.total
            ),
        );
    }

    fn record(&mut self, actor: Option<&str>, kind: EventKind, message: String) {
        debug!("Encounter {}: {}", self.name, message);
        let round = self.sequencer.round();
        self.log.push(round, actor, kind, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{CharacterClass, ScriptedSource};

    fn encounter() -> Encounter {
        let mut encounter = Encounter::new("Goblin ambush", EngineConfig::default())
            .unwrap()
            .with_dice(ScriptedSource::constant(5));
        let cleave = encounter.powers().get("cleave").unwrap().clone();
        encounter
            .add_combatant(
                Combatant::from_class("fighter", "Brann", CharacterClass::Fighter)
                    .at(5, 5)
                    .with_power(&cleave),
            )
            .unwrap();
        encounter
            .add_combatant(Combatant::new("goblin", "Goblin", 15).hostile().with_stats(4, 2, 6).at(5, 6))
            .unwrap();
        encounter
    }

    #[test]
    fn test_combat_flow() {
        let mut enc = encounter();
        enc.record_initiative("fighter", 15).unwrap();
        enc.record_initiative("goblin", 3).unwrap();
        enc.start_combat().unwrap();

        assert_eq!(enc.current_combatant().unwrap().id, "fighter");
        let result = enc
            .use_power("fighter", "cleave", &Target::combatant("goblin"), None)
            .unwrap();
        assert_eq!(result.hits[0].hp, 2);

        let advance = enc.end_turn().unwrap();
        assert_eq!(advance.current, "goblin");
        assert_eq!(enc.log().filter(EventKind::Damage).count(), 1);
    }

    #[test]
    fn test_out_of_turn_rejected() {
        let mut enc = encounter();
        enc.record_initiative("fighter", 15).unwrap();
        enc.record_initiative("goblin", 3).unwrap();
        enc.start_combat().unwrap();

        let result = enc.move_combatant("goblin", Position::new(5, 8));
        assert!(matches!(result, Err(EngineError::IllegalAction(_))));
        assert_eq!(enc.roster().get("goblin").unwrap().position, Some(Position::new(5, 6)));
    }

    #[test]
    fn test_moving_stands_up() {
        let mut enc = encounter();
        enc.record_initiative("fighter", 15).unwrap();
        enc.record_initiative("goblin", 3).unwrap();
        enc.start_combat().unwrap();
        enc.apply_effect("fighter", "prone", None, Some("goblin")).unwrap();
        enc.apply_effect("fighter", "marked", Some(DurationPolicy::Encounter), Some("goblin"))
            .unwrap();

        enc.move_combatant("fighter", Position::new(4, 5)).unwrap();
        assert!(!enc.roster().has_effect("fighter", "prone").unwrap());
        assert!(enc.roster().has_effect("fighter", "marked").unwrap());
        let last = enc.log().recent(1);
        assert_eq!(last[0].kind, EventKind::Status);
        assert_eq!(last[0].message, "Brann is no longer prone");
    }

    #[test]
    fn test_rejected_move_keeps_prone() {
        let mut enc = encounter();
        enc.record_initiative("fighter", 15).unwrap();
        enc.record_initiative("goblin", 3).unwrap();
        enc.start_combat().unwrap();
        enc.apply_effect("fighter", "prone", None, None).unwrap();

        let result = enc.move_combatant("fighter", Position::new(5, 6));
        assert!(matches!(result, Err(EngineError::CellOccupied { .. })));
        assert!(enc.roster().has_effect("fighter", "prone").unwrap());
    }

    #[test]
    fn test_cannot_join_active_combat() {
        let mut enc = encounter();
        enc.roll_all_initiative().unwrap();
        enc.start_combat().unwrap();
        let late = Combatant::new("orc", "Orc", 20).at(9, 9);
        assert!(matches!(enc.add_combatant(late), Err(EngineError::InvalidState { .. })));
    }

    #[test]
    fn test_end_combat_cleans_up() {
        let mut enc = encounter();
        enc.record_initiative("fighter", 20).unwrap();
        enc.record_initiative("goblin", 1).unwrap();
        enc.start_combat().unwrap();
        enc.apply_effect("goblin", "marked", Some(DurationPolicy::Encounter), Some("fighter"))
            .unwrap();
        enc.use_power("fighter", "cleave", &Target::combatant("goblin"), None)
            .unwrap();

        enc.end_combat().unwrap();
        assert_eq!(enc.phase(), Phase::Ended);
        assert!(!enc.roster().has_effect("goblin", "marked").unwrap());
        assert!(!enc.roster().get("fighter").unwrap().has_acted);
        assert_eq!(enc.end_turn(), Err(EngineError::EncounterEnded));

        enc.new_combat().unwrap();
        assert_eq!(enc.phase(), Phase::Setup);
        assert_eq!(enc.round(), 1);
        assert_eq!(enc.sequencer().registered().count(), 2);
    }

    #[test]
    fn test_dismiss_removes_from_order() {
        let mut enc = encounter();
        enc.roll_all_initiative().unwrap();
        enc.start_combat().unwrap();

        enc.dismiss("goblin").unwrap();
        assert_eq!(enc.state().turn_order, vec!["fighter"]);
        assert!(enc.roster().find("goblin").is_none());
    }
}
