//! Error types shared by the combat core.

use thiserror::Error;
use uuid::Uuid;

/// Raised by [`crate::db::DataStore`] lookups when a slug is unknown.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Lookup failed for unknown {table} '{slug}'.{}", suggestion_text(.suggestions))]
pub struct LookupError {
    pub table: String,
    pub slug: String,
    pub suggestions: Vec<String>,
}

fn suggestion_text(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" Did you mean {}?", suggestions.join(", "))
    }
}

/// Malformed or out-of-range game data. Raised at load time.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DataError {
    #[error("failed to parse {table} data: {message}")]
    Parse { table: String, message: String },
    #[error("{table} '{slug}': {field} = {value} is outside {min}..={max}")]
    OutOfRange {
        table: String,
        slug: String,
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{table} '{slug}': {message}")]
    Invalid {
        table: String,
        slug: String,
        message: String,
    },
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Contract violations detected while setting up or resolving combat.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CombatError {
    #[error("combat with {0} teams is not implemented (at most 2)")]
    NotImplemented(usize),
    #[error("invalid combat context: {0}")]
    InvalidContext(String),
    #[error("no monster {0} in this combat")]
    UnknownMonster(Uuid),
    #[error("monster {0} already chose an action this round")]
    AlreadyDecided(Uuid),
    #[error("monster {0} is not waiting for a decision")]
    NotDeciding(Uuid),
    #[error("technique index {index} out of range ({len} moves)")]
    UnknownTechnique { index: usize, len: usize },
    #[error("{method} cannot be used on monster {target}")]
    ConditionNotMet { method: String, target: Uuid },
    #[error("effect '{effect}' cannot be used by {method}")]
    IncompatibleEffect { effect: String, method: String },
    #[error("{0}")]
    InvalidValue(String),
    #[error("battle is waiting for player input")]
    AwaitingInput,
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

pub type CombatResult<T> = Result<T, CombatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_error_lists_suggestions() {
        let err = LookupError {
            table: "technique".to_string(),
            slug: "ram".to_string(),
            suggestions: vec!["ram_attack".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Lookup failed for unknown technique 'ram'. Did you mean ram_attack?"
        );
    }

    #[test]
    fn lookup_error_without_suggestions() {
        let err = LookupError {
            table: "monster".to_string(),
            slug: "zzz".to_string(),
            suggestions: Vec::new(),
        };
        assert_eq!(err.to_string(), "Lookup failed for unknown monster 'zzz'.");
    }
}
