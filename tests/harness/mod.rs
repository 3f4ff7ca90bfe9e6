//! Integration Test Harness
//!
//! - `TestEncounter` - An encounter with scripted dice and quick setup helpers
//! - `party` - Stock combatants used across scenarios
//!
//! # Example
//!
//! ```rust,ignore
//! use harness::{party, TestEncounter};
//!
//! #[test]
//! fn test_fighter_goes_first() {
//!     let mut test = TestEncounter::new(5);
//!     test.add(party::fighter(5, 5));
//!     test.add(party::goblin(5, 6));
//!     test.start(&[("fighter", 15), ("goblin", 3)]);
//!     assert_eq!(test.current(), "fighter");
//! }
//! ```

pub mod party;

use skirmish::combat::{Combatant, ScriptedSource};
use skirmish::{Encounter, EngineConfig};

/// Encounter wrapper with fixed dice and panicking helpers
pub struct TestEncounter {
    pub encounter: Encounter,
}

impl TestEncounter {
    /// Every die rolls `value` (clamped to the die)
    pub fn new(value: u32) -> Self {
        Self::with_config(EngineConfig::default(), vec![value])
    }

    pub fn with_config(config: EngineConfig, values: Vec<u32>) -> Self {
        let encounter = Encounter::new("test", config)
            .expect("Failed to create encounter")
            .with_dice(ScriptedSource::new(values));
        Self { encounter }
    }

    pub fn add(&mut self, combatant: Combatant) -> &mut Self {
        self.encounter
            .add_combatant(combatant)
            .expect("Failed to add combatant");
        self
    }

    /// Record natural rolls for the listed ids and start combat
    pub fn start(&mut self, rolls: &[(&str, u32)]) -> &mut Self {
        for (id, natural) in rolls {
            self.encounter
                .record_initiative(id, *natural)
                .expect("Failed to record initiative");
        }
        self.encounter.start_combat().expect("Failed to start combat");
        self
    }

    /// Id of the combatant whose turn it is
    pub fn current(&self) -> String {
        self.encounter
            .current_combatant()
            .expect("No current combatant")
            .id
            .clone()
    }

    pub fn hp(&self, id: &str) -> u32 {
        self.encounter.roster().get(id).expect("Unknown combatant").hp
    }

    pub fn combatant(&self, id: &str) -> &Combatant {
        self.encounter.roster().get(id).expect("Unknown combatant")
    }
}
