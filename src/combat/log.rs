//! Combat log
//!
//! Append-only record of what happened during an encounter, tagged by kind so
//! a client can filter it (e.g. only damage, only system messages).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Attacks and power use
    Combat,
    Damage,
    Healing,
    /// Status effects applied or removed
    Status,
    Death,
    Movement,
    /// Turn order, rounds, encounter lifecycle
    System,
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "combat" | "attack" => Ok(EventKind::Combat),
            "damage" => Ok(EventKind::Damage),
            "healing" | "heal" => Ok(EventKind::Healing),
            "status" | "effect" => Ok(EventKind::Status),
            "death" => Ok(EventKind::Death),
            "movement" | "move" => Ok(EventKind::Movement),
            "system" => Ok(EventKind::System),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Combat => "combat",
            EventKind::Damage => "damage",
            EventKind::Healing => "healing",
            EventKind::Status => "status",
            EventKind::Death => "death",
            EventKind::Movement => "movement",
            EventKind::System => "system",
        };
        write!(f, "{}", s)
    }
}

/// One log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub round: u32,
    pub timestamp: DateTime<Utc>,
    /// Combatant responsible, if any
    pub actor: Option<String>,
    pub kind: EventKind,
    pub message: String,
}

impl fmt::Display for CombatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[round {}] [{}] {}", self.round, self.kind, self.message)
    }
}

/// Ordered list of combat events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatLog {
    events: Vec<CombatEvent>,
}

impl CombatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event stamped with the current time
    pub fn push(&mut self, round: u32, actor: Option<&str>, kind: EventKind, message: impl Into<String>) {
        self.events.push(CombatEvent {
            round,
            timestamp: Utc::now(),
            actor: actor.map(str::to_string),
            kind,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[CombatEvent] {
        &self.events
    }

    /// Events of one kind, oldest first
    pub fn filter(&self, kind: EventKind) -> impl Iterator<Item = &CombatEvent> {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    /// The last `n` events, oldest first
    pub fn recent(&self, n: usize) -> &[CombatEvent] {
        &self.events[self.events.len().saturating_sub(n)..]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_and_recent() {
        let mut log = CombatLog::new();
        log.push(1, None, EventKind::System, "Combat begins");
        log.push(1, Some("f"), EventKind::Combat, "Brann uses Cleave");
        log.push(1, Some("f"), EventKind::Damage, "Goblin takes 13 damage");
        log.push(2, None, EventKind::System, "Round 2");

        assert_eq!(log.len(), 4);
        assert_eq!(log.filter(EventKind::System).count(), 2);
        let recent = log.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "Goblin takes 13 damage");
        assert_eq!(log.recent(10).len(), 4);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Heal".parse::<EventKind>(), Ok(EventKind::Healing));
        assert_eq!("system".parse::<EventKind>(), Ok(EventKind::System));
        assert!("dialogue".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_display() {
        let mut log = CombatLog::new();
        log.push(3, None, EventKind::Death, "Goblin falls");
        assert_eq!(log.entries()[0].to_string(), "[round 3] [death] Goblin falls");
    }
}
