//! Initiative scenario tests
//!
//! Tests turn order, rounds, delaying, effect expiry and the combat lifecycle

use crate::harness::{party, TestEncounter};
use skirmish::combat::{Combatant, EventKind, Phase, Position, Target};
use skirmish::EngineError;

fn runner(id: &str, speed: u32, x: i32) -> Combatant {
    Combatant::new(id, id.to_uppercase(), 10)
        .with_stats(2, 0, speed)
        .at(x, 0)
}

/// Test: Equal totals and modifiers keep registration order
#[test]
fn test_initiative_ties() {
    let mut test = TestEncounter::new(1);
    test.add(runner("a", 14, 0))
        .add(runner("b", 14, 2))
        .add(runner("c", 10, 4));
    test.start(&[("a", 13), ("b", 13), ("c", 18)]);

    let totals: Vec<(String, i32)> = test
        .encounter
        .sequencer()
        .order()
        .iter()
        .map(|e| (e.combatant_id.clone(), e.total))
        .collect();
    assert_eq!(
        totals,
        vec![("c".to_string(), 18), ("a".to_string(), 15), ("b".to_string(), 15)]
    );
}

/// Test: A full lap returns to the first combatant with fresh flags
#[test]
fn test_full_round() {
    let mut test = TestEncounter::new(1);
    test.add(party::fighter(5, 5))
        .add(party::goblin(5, 6))
        .add(party::goblin_named("g2", 9, 9));
    test.start(&[("fighter", 20), ("goblin", 10), ("g2", 5)]);

    test.encounter
        .move_combatant("fighter", Position::new(4, 5))
        .unwrap();
    test.encounter
        .use_power("fighter", "cleave", &Target::combatant("goblin"), None)
        .unwrap();

    let mut new_rounds = 0;
    for _ in 0..3 {
        if test.encounter.end_turn().unwrap().new_round {
            new_rounds += 1;
        }
    }

    assert_eq!(new_rounds, 1);
    assert_eq!(test.encounter.round(), 2);
    assert_eq!(test.current(), "fighter");
    let fighter = test.combatant("fighter");
    assert!(!fighter.has_moved);
    assert!(!fighter.has_acted);
}

/// Test: Delaying pushes the combatant to the back without skipping anyone
#[test]
fn test_delay() {
    let mut test = TestEncounter::new(1);
    test.add(runner("a", 10, 0))
        .add(runner("b", 10, 2))
        .add(runner("c", 10, 4))
        .add(runner("d", 10, 6));
    test.start(&[("a", 20), ("b", 15), ("c", 10), ("d", 5)]);

    test.encounter.end_turn().unwrap();
    assert_eq!(test.current(), "b");

    let handoff = test.encounter.delay("b").unwrap().unwrap();
    assert_eq!(handoff.current, "c");
    assert_eq!(test.encounter.state().turn_order, vec!["a", "c", "d", "b"]);
    assert_eq!(test.current(), "c");

    assert_eq!(test.encounter.end_turn().unwrap().current, "d");
    assert_eq!(test.encounter.end_turn().unwrap().current, "b");
    assert_eq!(test.encounter.round(), 1);
    assert_eq!(test.encounter.end_turn().unwrap().current, "a");
    assert_eq!(test.encounter.round(), 2);
}

/// Test: The first combatant delaying hands the turn to the second
#[test]
fn test_delay_first_in_order() {
    let mut test = TestEncounter::new(1);
    test.add(runner("a", 10, 0))
        .add(runner("b", 10, 2))
        .add(runner("c", 10, 4));
    test.start(&[("a", 20), ("b", 15), ("c", 10)]);

    test.encounter.delay("a").unwrap();
    assert_eq!(test.current(), "b");

    let order: Vec<String> = (0..2)
        .map(|_| test.encounter.end_turn().unwrap().current)
        .collect();
    assert_eq!(order, vec!["c", "a"]);
    assert_eq!(test.encounter.round(), 1);
}

/// Test: Removing the current combatant hands the turn to the next in line
#[test]
fn test_remove_from_order() {
    let mut test = TestEncounter::new(1);
    test.add(runner("a", 10, 0))
        .add(runner("b", 10, 2))
        .add(runner("c", 10, 4));
    test.start(&[("a", 20), ("b", 15), ("c", 10)]);
    test.encounter.end_turn().unwrap();

    test.encounter.remove_from_order("b").unwrap();
    assert_eq!(test.current(), "c");
    // Still on the board
    assert!(test.encounter.roster().find("b").is_some());
    assert!(matches!(
        test.encounter.delay("b"),
        Err(EngineError::UnknownCombatant(_))
    ));
}

/// Test: End-of-turn effects expire on their owner's turn, end-of-round on the wrap
#[test]
fn test_effect_expiry() {
    let mut test = TestEncounter::new(1);
    test.add(party::fighter(5, 5)).add(party::goblin(5, 6));
    test.start(&[("fighter", 20), ("goblin", 1)]);

    test.encounter
        .apply_effect("goblin", "marked", None, Some("fighter"))
        .unwrap();
    test.encounter
        .apply_effect("goblin", "surprised", None, None)
        .unwrap();

    let first = test.encounter.end_turn().unwrap();
    assert!(first.due_effects.is_empty());
    let roster = test.encounter.roster();
    assert!(roster.has_effect("goblin", "marked").unwrap());
    assert!(roster.has_effect("goblin", "surprised").unwrap());

    let second = test.encounter.end_turn().unwrap();
    assert!(second.new_round);
    assert_eq!(second.due_effects.len(), 2);
    let roster = test.encounter.roster();
    assert!(!roster.has_effect("goblin", "marked").unwrap());
    assert!(!roster.has_effect("goblin", "surprised").unwrap());
}

/// Test: Ending combat cleans up and locks the sequencer until torn down
#[test]
fn test_combat_lifecycle() {
    let mut test = TestEncounter::new(1);
    test.add(party::fighter(5, 5)).add(party::goblin(5, 6));
    test.start(&[("fighter", 20), ("goblin", 1)]);

    test.encounter
        .apply_effect("fighter", "blessed", None, None)
        .unwrap();
    let bash = test
        .encounter
        .use_power("fighter", "shield_bash", &Target::combatant("goblin"), None)
        .unwrap();
    assert_eq!(bash.uses_left, Some(0));

    test.encounter.end_combat().unwrap();
    assert_eq!(test.encounter.phase(), Phase::Ended);
    let fighter = test.combatant("fighter");
    assert_eq!(fighter.uses_remaining("shield_bash"), Some(Some(1)));
    assert!(fighter.effects.is_empty());
    assert!(!fighter.has_acted);

    assert_eq!(test.encounter.end_turn(), Err(EngineError::EncounterEnded));
    assert!(matches!(
        test.encounter.use_power("fighter", "cleave", &Target::combatant("goblin"), None),
        Err(EngineError::EncounterEnded)
    ));

    test.encounter.new_combat().unwrap();
    assert_eq!(test.encounter.phase(), Phase::Setup);
    assert_eq!(test.encounter.round(), 1);
    test.start(&[("fighter", 2), ("goblin", 19)]);
    assert_eq!(test.current(), "goblin");
    assert!(test.encounter.log().filter(EventKind::System).count() > 4);
}

/// Test: Turn operations before combat starts are invalid
#[test]
fn test_turns_need_active_combat() {
    let mut test = TestEncounter::new(1);
    test.add(party::fighter(5, 5));

    assert!(matches!(
        test.encounter.end_turn(),
        Err(EngineError::InvalidState { .. })
    ));
    assert!(matches!(
        test.encounter.start_combat(),
        Err(EngineError::InvalidState { .. })
    ));
    assert!(matches!(
        test.encounter.current_combatant(),
        Err(EngineError::InvalidState { .. })
    ));
}
