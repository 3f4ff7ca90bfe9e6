//! Engine error kinds
//!
//! Every engine operation either succeeds or fails with one of these. Mutating
//! operations never leave partial changes behind when they fail.

use thiserror::Error;

use crate::combat::Position;

/// Errors returned by the rules engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid dice expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("cell {0} is outside the board")]
    OutOfBounds(Position),

    #[error("cell {cell} is occupied by {occupant}")]
    CellOccupied { cell: Position, occupant: String },

    #[error("{combatant} has already {what} this round")]
    AlreadyConsumed { combatant: String, what: &'static str },

    #[error("{combatant} has no uses of {power} left")]
    PowerExhausted { combatant: String, power: String },

    #[error("illegal action: {0}")]
    IllegalAction(String),

    #[error("operation '{operation}' is not valid during {phase}")]
    InvalidState {
        operation: &'static str,
        phase: &'static str,
    },

    #[error("the encounter has ended")]
    EncounterEnded,

    #[error("unknown combatant: {0}")]
    UnknownCombatant(String),

    #[error("unknown power: {0}")]
    UnknownPower(String),

    #[error("unknown status effect: {0}")]
    UnknownEffect(String),

    #[error("combatant already present: {0}")]
    DuplicateCombatant(String),
}

impl EngineError {
    pub(crate) fn invalid_expression(expression: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidExpression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn illegal(reason: impl Into<String>) -> Self {
        EngineError::IllegalAction(reason.into())
    }
}

/// Result alias used throughout the engine
pub type EngineResult<T> = Result<T, EngineError>;
