//! Dice rolling system
//!
//! Parses and rolls dice notation like "2d6+3", "1d8+1d4+2", "4d6-2".
//!
//! An expression is a sequence of terms joined by `+` (or `-` before a flat
//! number). Each term is either `<count>d<sides>` or a bare integer; bare
//! integers accumulate into a single modifier. An expression without any dice
//! term rolls one d20 with the accumulated modifier, so "5" means "1d20+5"
//! (the bare attack roll convenience).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Upper bound on dice in one group
pub const MAX_DICE_PER_GROUP: u32 = 1000;

/// Upper bound on sides per die
pub const MAX_DIE_SIDES: u32 = 1000;

/// Upper bound on dice groups in one expression
pub const MAX_GROUPS: usize = 20;

/// Upper bound on the flat modifier, either sign
pub const MAX_MODIFIER: i32 = 10_000;

static DICE_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d*)d(\d+)$").expect("dice term regex"));
static FLAT_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("flat term regex"));

/// Source of uniformly distributed integers.
///
/// Production code rolls through [`RngSource`]; tests plug in [`ScriptedSource`]
/// to get fixed values.
pub trait DiceSource {
    /// Return a value in `low..=high`
    fn roll_range(&mut self, low: u32, high: u32) -> u32;
}

/// PRNG-backed dice source
#[derive(Debug, Clone)]
pub struct RngSource<R = StdRng> {
    rng: R,
}

impl RngSource<StdRng> {
    /// Seed from the operating system
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible sequence for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RngSource<R> {
    /// Wrap an existing generator
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DiceSource for RngSource<R> {
    fn roll_range(&mut self, low: u32, high: u32) -> u32 {
        self.rng.random_range(low..=high)
    }
}

/// Replays a fixed list of values in a loop.
///
/// Values are clamped into the requested range so a scripted 5 on a d4 reads
/// as 4.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    values: Vec<u32>,
    next: usize,
}

impl ScriptedSource {
    /// Cycle through `values`; an empty list always rolls the minimum
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            next: 0,
        }
    }

    /// Always roll the same number
    pub fn constant(value: u32) -> Self {
        Self::new(vec![value])
    }
}

impl DiceSource for ScriptedSource {
    fn roll_range(&mut self, low: u32, high: u32) -> u32 {
        let Some(&value) = self.values.get(self.next % self.values.len().max(1)) else {
            return low;
        };
        self.next += 1;
        value.clamp(low, high)
    }
}

/// One `<count>d<sides>` group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceGroup {
    /// Number of dice to roll
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
}

/// A parsed dice expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    /// Dice groups in the order they were written
    pub groups: Vec<DiceGroup>,
    /// Flat modifier (sum of all bare integer terms)
    pub modifier: i32,
}

/// Rolled values for one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRoll {
    pub count: u32,
    pub sides: u32,
    pub rolls: Vec<u32>,
}

impl GroupRoll {
    /// Sum of the dice in this group
    pub fn sum(&self) -> i32 {
        saturate(self.rolls.iter().map(|&r| i64::from(r)).sum())
    }
}

/// Result of rolling an expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceOutcome {
    pub groups: Vec<GroupRoll>,
    pub modifier: i32,
    /// Sum of every die plus the modifier
    pub total: i32,
}

impl DiceExpression {
    /// Build a single-group expression
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            groups: vec![DiceGroup { count, sides }],
            modifier,
        }
    }

    /// Plain d20
    pub fn d20() -> Self {
        Self::new(1, 20, 0)
    }

    /// Roll every group against `source`
    pub fn roll(&self, source: &mut dyn DiceSource) -> DiceOutcome {
        let groups: Vec<GroupRoll> = self
            .groups
            .iter()
            .map(|g| GroupRoll {
                count: g.count,
                sides: g.sides,
                rolls: (0..g.count).map(|_| source.roll_range(1, g.sides)).collect(),
            })
            .collect();

        let dice: i64 = groups.iter().map(|g| i64::from(g.sum())).sum();
        let total = saturate(dice + i64::from(self.modifier));

        DiceOutcome {
            groups,
            modifier: self.modifier,
            total,
        }
    }

    /// Get the minimum possible result
    pub fn min(&self) -> i32 {
        let dice: i64 = self.groups.iter().map(|g| i64::from(g.count)).sum();
        saturate(dice + i64::from(self.modifier))
    }

    /// Get the maximum possible result
    pub fn max(&self) -> i32 {
        let dice: i64 = self
            .groups
            .iter()
            .map(|g| i64::from(g.count) * i64::from(g.sides))
            .sum();
        saturate(dice + i64::from(self.modifier))
    }

    /// Get the expected average (rounded down)
    pub fn average(&self) -> i32 {
        let dice: f64 = self
            .groups
            .iter()
            .map(|g| g.count as f64 * (1.0 + g.sides as f64) / 2.0)
            .sum();
        (dice + self.modifier as f64).floor() as i32
    }
}

impl FromStr for DiceExpression {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, g) in self.groups.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{}d{}", g.count, g.sides)?;
        }
        if self.modifier > 0 {
            write!(f, "+{}", self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}", self.modifier)
        } else {
            Ok(())
        }
    }
}

/// Parse a dice notation string like "2d6+3" or "1d8+1d4+2"
pub fn parse_dice(notation: &str) -> EngineResult<DiceExpression> {
    let cleaned: String = notation
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    if cleaned.is_empty() {
        return Err(EngineError::invalid_expression(notation, "empty expression"));
    }

    let mut groups = Vec::new();
    let mut modifier: i32 = 0;

    for (negative, term) in split_terms(&cleaned) {
        if term.is_empty() {
            return Err(EngineError::invalid_expression(notation, "empty term"));
        }

        if let Some(caps) = DICE_TERM.captures(term) {
            if negative {
                return Err(EngineError::invalid_expression(
                    notation,
                    format!("dice group '{}' cannot be subtracted", term),
                ));
            }

            // "d6" means "1d6"
            let count = match &caps[1] {
                "" => 1,
                digits => digits.parse::<u32>().map_err(|_| {
                    EngineError::invalid_expression(notation, format!("invalid dice count: {}", digits))
                })?,
            };
            let sides = caps[2].parse::<u32>().map_err(|_| {
                EngineError::invalid_expression(notation, format!("invalid die sides: {}", &caps[2]))
            })?;

            if count == 0 {
                return Err(EngineError::invalid_expression(notation, "dice count must be at least 1"));
            }
            if count > MAX_DICE_PER_GROUP {
                return Err(EngineError::invalid_expression(
                    notation,
                    format!("at most {} dice per group", MAX_DICE_PER_GROUP),
                ));
            }
            if sides == 0 {
                return Err(EngineError::invalid_expression(notation, "die sides must be at least 1"));
            }
            if sides > MAX_DIE_SIDES {
                return Err(EngineError::invalid_expression(
                    notation,
                    format!("at most {} sides per die", MAX_DIE_SIDES),
                ));
            }

            if groups.len() == MAX_GROUPS {
                return Err(EngineError::invalid_expression(
                    notation,
                    format!("at most {} dice groups", MAX_GROUPS),
                ));
            }
            groups.push(DiceGroup { count, sides });
        } else if FLAT_TERM.is_match(term) {
            let value = term.parse::<i32>().map_err(|_| {
                EngineError::invalid_expression(notation, format!("invalid modifier: {}", term))
            })?;
            modifier = if negative {
                modifier.checked_sub(value)
            } else {
                modifier.checked_add(value)
            }
            .filter(|m| m.abs() <= MAX_MODIFIER)
            .ok_or_else(|| {
                EngineError::invalid_expression(
                    notation,
                    format!("modifier must be between -{0} and {0}", MAX_MODIFIER),
                )
            })?;
        } else {
            return Err(EngineError::invalid_expression(
                notation,
                format!("unrecognized term: {}", term),
            ));
        }
    }

    if groups.is_empty() {
        groups.push(DiceGroup { count: 1, sides: 20 });
    }

    Ok(DiceExpression { groups, modifier })
}

/// Parse and roll in one step
pub fn roll_expression(notation: &str, source: &mut dyn DiceSource) -> EngineResult<DiceOutcome> {
    Ok(parse_dice(notation)?.roll(source))
}

/// Clamp a wide sum back into `i32`
fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Split on `+`/`-`, tagging each term with whether it was subtracted
fn split_terms(expr: &str) -> Vec<(bool, &str)> {
    let mut terms = Vec::new();
    let mut start = 0;
    let mut negative = false;

    for (i, c) in expr.char_indices() {
        if c == '+' || c == '-' {
            terms.push((negative, &expr[start..i]));
            negative = c == '-';
            start = i + 1;
        }
    }
    terms.push((negative, &expr[start..]));
    terms
}
