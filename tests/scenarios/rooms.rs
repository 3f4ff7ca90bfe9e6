//! Room registry scenario tests
//!
//! Tests room codes and per-room serialization of mutations

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use crate::harness::party;
use skirmish::combat::Phase;
use skirmish::room::{RoomRegistry, ROOM_CODE_ALPHABET, ROOM_CODE_LEN};
use skirmish::EngineConfig;

/// Test: Every room gets its own well-formed code
#[test]
fn test_room_codes_are_unique() {
    let registry = RoomRegistry::new(EngineConfig::default());
    let codes: HashSet<String> = (0..20)
        .map(|i| registry.create(&format!("room {}", i)).unwrap().code.clone())
        .collect();

    assert_eq!(codes.len(), 20);
    assert_eq!(registry.len(), 20);
    for code in &codes {
        assert_eq!(code.len(), ROOM_CODE_LEN);
        assert!(code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
    }
}

/// Test: Rooms run independent encounters from several threads
#[test]
fn test_parallel_rooms() {
    let registry = RoomRegistry::shared(EngineConfig::default());
    let first = registry.create("Crypt").unwrap().code.clone();
    let second = registry.create("Keep").unwrap().code.clone();

    let handles: Vec<_> = [first.clone(), second.clone()]
        .into_iter()
        .map(|code| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry
                    .with_room(&code, |enc| {
                        enc.add_combatant(party::fighter(5, 5))?;
                        enc.add_combatant(party::goblin(5, 6))?;
                        enc.roll_all_initiative()?;
                        enc.start_combat()
                    })
                    .expect("room vanished")
                    .expect("setup failed");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    for code in [&first, &second] {
        let state = registry.with_room(code, |enc| enc.state()).unwrap();
        assert_eq!(state.phase, Phase::Active);
        assert_eq!(state.turn_order.len(), 2);
    }

    registry.close(&first);
    assert!(registry.with_room(&first, |enc| enc.round()).is_err());
    assert!(registry.with_room(&second, |enc| enc.round()).is_ok());
}
