//! Stock combatants

use skirmish::combat::{CharacterClass, Combatant, PowerCatalog};

fn with_class_powers(mut combatant: Combatant, class: &str) -> Combatant {
    let catalog = PowerCatalog::standard();
    for power in catalog.for_class(class) {
        combatant = combatant.with_power(power);
    }
    combatant
}

/// Brann: HP 30, ATK 8, SPD 4
pub fn fighter(x: i32, y: i32) -> Combatant {
    let c = Combatant::from_class("fighter", "Brann", CharacterClass::Fighter).at(x, y);
    with_class_powers(c, "fighter")
}

/// Ilsa: HP 15, MP 20, SPD 5
pub fn mage(x: i32, y: i32) -> Combatant {
    let c = Combatant::from_class("mage", "Ilsa", CharacterClass::Mage).at(x, y);
    with_class_powers(c, "mage")
}

/// Mira: HP 25, MP 15
pub fn cleric(x: i32, y: i32) -> Combatant {
    let c = Combatant::from_class("cleric", "Mira", CharacterClass::Cleric).at(x, y);
    with_class_powers(c, "cleric")
}

/// Goblin: HP 15, ATK 4, SPD 6
pub fn goblin(x: i32, y: i32) -> Combatant {
    goblin_named("goblin", x, y)
}

pub fn goblin_named(id: &str, x: i32, y: i32) -> Combatant {
    Combatant::new(id, "Goblin", 15)
        .hostile()
        .with_stats(4, 2, 6)
        .at(x, y)
}
