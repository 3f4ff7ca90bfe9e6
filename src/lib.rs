//! skirmish - grid combat rules engine
//!
//! Rules core for a room-coded multiplayer tabletop RPG played on a square
//! grid: dice, combatants and their action economy, initiative and turns, and
//! power targeting and resolution. The engine performs no I/O; callers persist
//! and broadcast state after each successful mutation.

pub mod combat;
pub mod config;
pub mod encounter;
pub mod error;
pub mod room;
pub mod scenario;

pub use config::{ConfigError, EngineConfig};
pub use encounter::{Encounter, EncounterState};
pub use error::{EngineError, EngineResult};
pub use room::{RoomError, RoomRegistry};
pub use scenario::{RunReport, Scenario, ScriptedAction};
