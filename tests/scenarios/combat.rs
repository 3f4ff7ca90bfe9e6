//! Combat scenario tests
//!
//! Tests power use, damage, healing, areas and movement

use crate::harness::{party, TestEncounter};
use skirmish::combat::{
    ActionCost, AreaShape, AttackShape, Board, EffectCatalog, EventKind, Facing, Position, Power,
    PowerCatalog, PowerTier, Roster, ScriptedSource, Target,
};
use skirmish::{Encounter, EngineConfig, EngineError};

fn duel(dice: u32) -> TestEncounter {
    let mut test = TestEncounter::new(dice);
    test.add(party::fighter(5, 5)).add(party::goblin(5, 6));
    test.start(&[("fighter", 15), ("goblin", 3)]);
    test
}

/// Test: Cleave with every die showing 5 deals 5 + 4 + 4
#[test]
fn test_cleave_hits_goblin() {
    let mut test = duel(5);

    let result = test
        .encounter
        .use_power("fighter", "cleave", &Target::combatant("goblin"), None)
        .expect("cleave failed");

    assert_eq!(result.hits.len(), 1);
    assert_eq!(result.hits[0].damage, 13);
    assert!(!result.hits[0].just_died);
    assert_eq!(test.hp("goblin"), 2);
    assert!(test.combatant("fighter").has_acted);
}

/// Test: An exhausted encounter power fails and changes nothing
#[test]
fn test_exhausted_power_is_atomic() {
    let mut test = duel(1);
    let target = Target::combatant("goblin");

    test.encounter
        .use_power("fighter", "shield_bash", &target, None)
        .expect("first shield bash failed");
    assert_eq!(test.hp("goblin"), 5);
    assert!(test.encounter.roster().has_effect("goblin", "prone").unwrap());

    test.encounter.end_turn().unwrap();
    test.encounter.end_turn().unwrap();
    assert_eq!(test.current(), "fighter");
    assert_eq!(test.encounter.round(), 2);

    let before = test.encounter.roster().clone();
    let result = test.encounter.use_power("fighter", "shield_bash", &target, None);
    assert!(matches!(result, Err(EngineError::PowerExhausted { .. })));
    assert_eq!(*test.encounter.roster(), before);
}

/// Test: A prone goblin stays down until it spends its move
#[test]
fn test_prone_until_moved() {
    let mut test = duel(1);
    test.encounter
        .use_power("fighter", "shield_bash", &Target::combatant("goblin"), None)
        .expect("shield bash failed");
    test.encounter.end_turn().unwrap();

    assert_eq!(test.current(), "goblin");
    assert!(test.encounter.roster().has_effect("goblin", "prone").unwrap());

    test.encounter
        .move_combatant("goblin", Position::new(5, 7))
        .expect("goblin move failed");
    assert!(!test.encounter.roster().has_effect("goblin", "prone").unwrap());
    let status: Vec<_> = test.encounter.log().filter(EventKind::Status).collect();
    assert!(status.iter().any(|e| e.message == "Goblin is no longer prone"));
}

fn thunderclap() -> Power {
    Power {
        id: "thunderclap".into(),
        name: "Thunderclap".into(),
        class: Some("mage".into()),
        tier: PowerTier::AtWill,
        action: ActionCost::Standard,
        attack: AttackShape::Area,
        range: 5,
        area: AreaShape::Burst,
        area_size: 1,
        damage: "1d6".into(),
        damage_type: "thunder".into(),
        healing: None,
        effect: None,
        allows_self: false,
        resource_cost: 0,
        description: "Burst of sound".into(),
    }
}

fn burst_encounter() -> Encounter {
    let mut powers = PowerCatalog::standard();
    powers.insert(thunderclap());
    let mut encounter =
        Encounter::with_catalogs("burst", EngineConfig::default(), EffectCatalog::standard(), powers)
            .with_dice(ScriptedSource::constant(1));

    encounter
        .add_combatant(party::mage(5, 5).with_power(&thunderclap()))
        .unwrap();
    encounter.add_combatant(party::goblin_named("a", 5, 6)).unwrap();
    encounter.add_combatant(party::goblin_named("b", 6, 6)).unwrap();
    encounter.add_combatant(party::goblin_named("c", 10, 10)).unwrap();

    encounter.record_initiative("mage", 20).unwrap();
    encounter.roll_all_initiative().unwrap();
    encounter.start_combat().unwrap();
    encounter
}

/// Test: A size 1 burst on (5, 5) catches the neighbours and not the far goblin
#[test]
fn test_burst_excludes_caster_by_default() {
    let mut encounter = burst_encounter();

    let result = encounter
        .use_power("mage", "thunderclap", &Target::cell(5, 5), None)
        .unwrap();
    let hit: Vec<&str> = result.hits.iter().map(|h| h.target_id.as_str()).collect();
    assert_eq!(hit, vec!["a", "b"]);

    // 1 on the die plus floor(5 / 2)
    assert_eq!(encounter.roster().get("a").unwrap().hp, 12);
    assert_eq!(encounter.roster().get("c").unwrap().hp, 15);
    assert_eq!(encounter.roster().get("mage").unwrap().hp, 15);
}

/// Test: The caster can opt into their own burst
#[test]
fn test_burst_including_caster() {
    let mut encounter = burst_encounter();

    let result = encounter
        .use_power("mage", "thunderclap", &Target::cell(5, 5), Some(false))
        .unwrap();
    assert_eq!(result.hits.len(), 3);
    assert_eq!(encounter.roster().get("mage").unwrap().hp, 12);
}

/// Test: Burning Hands hits the first three cells of the line
#[test]
fn test_blast_line() {
    let mut test = TestEncounter::new(1);
    test.add(party::mage(2, 2))
        .add(party::goblin_named("g1", 3, 2))
        .add(party::goblin_named("g2", 5, 2))
        .add(party::goblin_named("g3", 6, 2));
    test.start(&[("mage", 20), ("g1", 1), ("g2", 1), ("g3", 1)]);

    let result = test
        .encounter
        .use_power("mage", "burning_hands", &Target::cell(9, 2), None)
        .unwrap();
    assert_eq!(result.hits.len(), 2);
    // 2d6+4 at 1s plus floor(5 / 2)
    assert_eq!(test.hp("g1"), 7);
    assert_eq!(test.hp("g2"), 7);
    assert_eq!(test.hp("g3"), 15);
    assert_eq!(result.uses_left, Some(0));
}

/// Test: Killing blow logs a death and the fallen are skipped
#[test]
fn test_death_and_turn_skip() {
    let mut test = TestEncounter::new(1);
    test.add(party::fighter(5, 5))
        .add(party::goblin_named("rat", 5, 6))
        .add(party::goblin(8, 8));
    test.start(&[("fighter", 20), ("rat", 10), ("goblin", 5)]);

    // 9 damage per cleave at 1s
    test.encounter
        .use_power("fighter", "cleave", &Target::combatant("rat"), None)
        .unwrap();
    assert_eq!(test.hp("rat"), 6);
    test.encounter.end_turn().unwrap();
    test.encounter.end_turn().unwrap();
    test.encounter.end_turn().unwrap();

    let result = test
        .encounter
        .use_power("fighter", "cleave", &Target::combatant("rat"), None)
        .unwrap();
    assert!(result.hits[0].just_died);
    assert_eq!(test.encounter.log().filter(EventKind::Death).count(), 1);

    let advance = test.encounter.end_turn().unwrap();
    assert_eq!(advance.current, "goblin");
    assert_eq!(test.encounter.state().turn_order.len(), 3);

    // Corpses are not targets
    let targets = test.encounter.legal_targets("fighter", "cleave").unwrap();
    assert!(targets.is_empty());
}

/// Test: Stunned combatants cannot use powers
#[test]
fn test_stunned_cannot_act() {
    let mut test = duel(1);
    test.encounter
        .apply_effect("fighter", "stunned", None, Some("goblin"))
        .unwrap();

    let result = test
        .encounter
        .use_power("fighter", "cleave", &Target::combatant("goblin"), None);
    assert!(matches!(result, Err(EngineError::IllegalAction(_))));
    assert_eq!(test.hp("goblin"), 15);
}

/// Test: Healing Word is a minor action that can target the caster
#[test]
fn test_healing_word() {
    let mut test = TestEncounter::new(3);
    test.add(party::cleric(1, 1)).add(party::goblin(1, 2));
    test.start(&[("cleric", 20), ("goblin", 1)]);

    test.encounter
        .use_power("cleric", "sacred_flame", &Target::combatant("goblin"), None)
        .unwrap();
    let result = test
        .encounter
        .use_power("cleric", "healing_word", &Target::combatant("cleric"), None)
        .unwrap();

    // Already at full HP
    assert_eq!(result.hits[0].healed, 0);
    assert_eq!(test.encounter.log().filter(EventKind::Healing).count(), 1);
}

/// Test: Damage then equal healing restores HP; clamps hold at both ends
#[test]
fn test_damage_and_healing_clamps() {
    let mut roster = Roster::new(Board::default());
    roster.add(party::fighter(1, 1)).unwrap();

    roster.apply_damage("fighter", 12).unwrap();
    let healed = roster.apply_healing("fighter", 12, false).unwrap();
    assert_eq!(healed.hp, 30);

    let overheal = roster.apply_healing("fighter", 50, false).unwrap();
    assert_eq!(overheal.hp, 30);
    assert_eq!(overheal.healed, 0);

    let dropped = roster.apply_damage("fighter", 100).unwrap();
    assert_eq!(dropped.hp, 0);
    assert!(dropped.just_died);
    assert_eq!(dropped.dealt, 30);

    assert!(matches!(
        roster.apply_healing("fighter", 5, false),
        Err(EngineError::IllegalAction(_))
    ));
    let revived = roster.apply_healing("fighter", 5, true).unwrap();
    assert!(revived.revived);
    assert_eq!(revived.hp, 5);
}

/// Test: Movement limits, facing and occupancy
#[test]
fn test_movement() {
    let mut test = duel(1);

    let err = test.encounter.move_combatant("fighter", Position::new(5, 6));
    assert!(matches!(err, Err(EngineError::CellOccupied { .. })));

    let err = test.encounter.move_combatant("fighter", Position::new(0, 0));
    assert!(matches!(err, Err(EngineError::IllegalAction(_))));

    let facing = test
        .encounter
        .move_combatant("fighter", Position::new(2, 4))
        .unwrap();
    assert_eq!(facing, Facing::Left);
    assert!(test.combatant("fighter").has_moved);

    let again = test.encounter.move_combatant("fighter", Position::new(2, 5));
    assert!(matches!(again, Err(EngineError::AlreadyConsumed { .. })));
    assert_eq!(test.encounter.log().filter(EventKind::Movement).count(), 1);
}
