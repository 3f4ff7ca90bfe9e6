//! File loading scenario tests
//!
//! Tests engine config, custom catalogs and scenario files on disk

use std::io::Write;

use tempfile::{NamedTempFile, TempDir};

use crate::harness::{party, TestEncounter};
use skirmish::combat::{EventKind, Position, Target};
use skirmish::{ConfigError, Encounter, EngineConfig, EngineError, Scenario};

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("Failed to write file");
    path
}

/// Test: A smaller board from the config file bounds movement
#[test]
fn test_config_file_board_size() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "board_size = 8").unwrap();

    let config = EngineConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.board_size, 8);

    let mut test = TestEncounter::with_config(config, vec![1]);
    test.add(party::fighter(6, 6));
    test.start(&[("fighter", 10)]);

    let result = test.encounter.move_combatant("fighter", Position::new(6, 9));
    assert!(matches!(result, Err(EngineError::OutOfBounds(_))));
    assert!(test
        .encounter
        .reachable_cells("fighter")
        .unwrap()
        .iter()
        .all(|c| c.x < 8 && c.y < 8));
}

/// Test: Custom JSON catalogs replace the built-in ones
#[test]
fn test_custom_catalogs() {
    let dir = TempDir::new().unwrap();
    let effects = write(
        &dir,
        "effects.json",
        r#"{
            "frozen": {"name": "Frozen", "type": "negative", "duration": "save_ends",
                       "prevents_action": true, "description": "Encased in ice."}
        }"#,
    );
    let powers = write(
        &dir,
        "powers.json",
        r#"[
            {"id": "frost_touch", "name": "Frost Touch", "class": "mage", "type": "at_will",
             "action_type": "standard", "attack_type": "melee", "range_value": 1,
             "damage_dice": "1d4", "effect": "frozen"}
        ]"#,
    );
    let mut config_file = NamedTempFile::new().unwrap();
    writeln!(
        config_file,
        "effects_catalog = {:?}\npowers_catalog = {:?}",
        effects.display().to_string(),
        powers.display().to_string()
    )
    .unwrap();

    let config = EngineConfig::load(Some(config_file.path())).unwrap();
    let mut encounter = Encounter::new("frost", config).unwrap();
    assert_eq!(encounter.effects().len(), 1);
    assert_eq!(encounter.powers().len(), 1);

    let frost = encounter.powers().get("frost_touch").unwrap().clone();
    encounter
        .add_combatant(party::goblin_named("witch", 2, 2).with_power(&frost))
        .unwrap();
    encounter.add_combatant(party::goblin(2, 3)).unwrap();
    encounter.record_initiative("witch", 20).unwrap();
    encounter.record_initiative("goblin", 1).unwrap();
    encounter.start_combat().unwrap();

    encounter
        .use_power("witch", "frost_touch", &Target::combatant("goblin"), None)
        .unwrap();
    assert!(!encounter
        .roster()
        .can_act("goblin", encounter.effects())
        .unwrap());
}

/// Test: Catalog powers must reference known effects
#[test]
fn test_catalog_mismatch() {
    let dir = TempDir::new().unwrap();
    let powers = write(
        &dir,
        "powers.json",
        r#"[{"id": "hex", "name": "Hex", "tier": "at_will", "action": "standard",
             "attack": "ranged", "range": 5, "effect": "cursed"}]"#,
    );
    let config = EngineConfig {
        powers_catalog: Some(powers),
        ..EngineConfig::default()
    };
    assert!(matches!(
        Encounter::new("hex", config),
        Err(ConfigError::Engine(EngineError::UnknownEffect(_)))
    ));
}

const SCENARIO: &str = r#"
name = "Bridge"

[[combatants]]
id = "fighter"
name = "Brann"
class = "fighter"
position = [3, 3]

[[combatants]]
id = "cleric"
name = "Mira"
class = "cleric"
position = [3, 5]

[[combatants]]
id = "ogre"
name = "Ogre"
hostile = true
hp = 40
attack = 10
speed = 4
position = [4, 4]
powers = ["cleave"]

[initiative]
fighter = 18
cleric = 12
ogre = 2

[[actions]]
kind = "power"
actor = "fighter"
power = "shield_bash"
target = "ogre"

[[actions]]
kind = "end_turn"

[[actions]]
kind = "power"
actor = "cleric"
power = "blessing_of_battle"
target = "fighter"

[[actions]]
kind = "power"
actor = "cleric"
power = "sacred_flame"
target = "ogre"

[[actions]]
kind = "end_turn"

[[actions]]
kind = "power"
actor = "ogre"
power = "cleave"
target = "fighter"

[[actions]]
kind = "end_turn"

[[actions]]
kind = "power"
actor = "fighter"
power = "shield_bash"
target = "ogre"
"#;

/// Test: A scenario file plays out end to end
#[test]
fn test_scenario_file() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "bridge.toml", SCENARIO);

    let config = EngineConfig::default();
    let (effects, powers) = config.catalogs().unwrap();
    let scenario = Scenario::load(&path, &config, &effects, &powers).unwrap();

    let mut test = TestEncounter::with_config(config, vec![2]);
    let report = scenario.run(&mut test.encounter).unwrap();

    // Shield Bash is spent by round 2
    assert_eq!(report.rejected(), 1);
    assert!(report.steps[7].rejected.is_some());
    assert_eq!(report.state.round, 2);
    assert_eq!(report.state.current.as_deref(), Some("fighter"));

    // 2d6+4 +4, then 1d6+4 +2
    assert_eq!(test.hp("ogre"), 40 - 12 - 8);
    // 1d8+4 +5
    assert_eq!(test.hp("fighter"), 30 - 11);
    assert!(test.encounter.roster().has_effect("fighter", "blessed").unwrap());
    assert!(test.encounter.roster().has_effect("ogre", "prone").unwrap());
    assert_eq!(test.encounter.log().filter(EventKind::Damage).count(), 3);
}

/// Test: Missing scenario files are reported with their path
#[test]
fn test_missing_scenario() {
    let config = EngineConfig::default();
    let (effects, powers) = config.catalogs().unwrap();
    let result = Scenario::load(
        std::path::Path::new("/nonexistent/bridge.toml"),
        &config,
        &effects,
        &powers,
    );
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}
