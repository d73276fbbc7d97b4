//! Usability conditions carried by techniques and items: checks against the
//! monster a move or item would land on.

use crate::error::DataError;
use crate::sim::monster::Monster;
use crate::sim::stats::StatType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Numeric comparison. Accepts the long names and the usual symbols;
/// anything else fails to load.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Comparison {
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Equals,
    NotEquals,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownComparison(pub String);

impl fmt::Display for UnknownComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown comparison operator '{}'", self.0)
    }
}

impl std::error::Error for UnknownComparison {}

impl Comparison {
    pub fn as_str(self) -> &'static str {
        match self {
            Comparison::LessThan => "less_than",
            Comparison::LessOrEqual => "less_or_equal",
            Comparison::GreaterThan => "greater_than",
            Comparison::GreaterOrEqual => "greater_or_equal",
            Comparison::Equals => "equals",
            Comparison::NotEquals => "not_equals",
        }
    }

    pub fn compare<T: PartialOrd>(self, left: T, right: T) -> bool {
        match self {
            Comparison::LessThan => left < right,
            Comparison::LessOrEqual => left <= right,
            Comparison::GreaterThan => left > right,
            Comparison::GreaterOrEqual => left >= right,
            Comparison::Equals => left == right,
            Comparison::NotEquals => left != right,
        }
    }
}

impl FromStr for Comparison {
    type Err = UnknownComparison;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "less_than" | "<" => Ok(Comparison::LessThan),
            "less_or_equal" | "<=" => Ok(Comparison::LessOrEqual),
            "greater_than" | ">" => Ok(Comparison::GreaterThan),
            "greater_or_equal" | ">=" => Ok(Comparison::GreaterOrEqual),
            "equals" | "==" => Ok(Comparison::Equals),
            "not_equals" | "!=" => Ok(Comparison::NotEquals),
            other => Err(UnknownComparison(other.to_string())),
        }
    }
}

impl TryFrom<String> for Comparison {
    type Error = UnknownComparison;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Comparison> for String {
    fn from(comparison: Comparison) -> Self {
        comparison.as_str().to_string()
    }
}

/// Whether a check must hold (`is`) or must fail (`not`).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOperator {
    #[default]
    Is,
    Not,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionCheck {
    /// Current HP as a fraction of maximum HP.
    CurrentHp { comparison: Comparison, value: f64 },
    Level { comparison: Comparison, value: u32 },
    Stat {
        stat: StatType,
        comparison: Comparison,
        value: u32,
    },
    HasStatus { status: String },
    HasType { element: String },
}

impl ConditionCheck {
    pub fn name(&self) -> &'static str {
        match self {
            ConditionCheck::CurrentHp { .. } => "current_hp",
            ConditionCheck::Level { .. } => "level",
            ConditionCheck::Stat { .. } => "stat",
            ConditionCheck::HasStatus { .. } => "has_status",
            ConditionCheck::HasType { .. } => "has_type",
        }
    }

    fn holds(&self, monster: &Monster) -> bool {
        match self {
            ConditionCheck::CurrentHp { comparison, value } => {
                let ratio = if monster.stats.hp == 0 {
                    0.0
                } else {
                    f64::from(monster.current_hp) / f64::from(monster.stats.hp)
                };
                comparison.compare(ratio, *value)
            }
            ConditionCheck::Level { comparison, value } => comparison.compare(monster.level, *value),
            ConditionCheck::Stat { stat, comparison, value } => {
                comparison.compare(monster.return_stat(*stat), *value)
            }
            ConditionCheck::HasStatus { status } => monster.has_status(status),
            ConditionCheck::HasType { element } => monster.types.iter().any(|kind| kind == element),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(flatten)]
    pub check: ConditionCheck,
    #[serde(default)]
    pub operator: ConditionOperator,
}

impl Condition {
    pub fn is(check: ConditionCheck) -> Self {
        Self {
            check,
            operator: ConditionOperator::Is,
        }
    }

    pub fn not(check: ConditionCheck) -> Self {
        Self {
            check,
            operator: ConditionOperator::Not,
        }
    }

    pub fn is_met(&self, monster: &Monster) -> bool {
        let holds = self.check.holds(monster);
        match self.operator {
            ConditionOperator::Is => holds,
            ConditionOperator::Not => !holds,
        }
    }

    pub fn validate(&self, table: &str, slug: &str) -> Result<(), DataError> {
        if let ConditionCheck::CurrentHp { value, .. } = &self.check {
            if !(0.0..=1.0).contains(value) {
                return Err(DataError::OutOfRange {
                    table: table.to_string(),
                    slug: slug.to_string(),
                    field: "conditions.current_hp".to_string(),
                    value: *value,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        Ok(())
    }
}

/// True when every condition holds for `monster`. No conditions, no limits.
pub fn all_met(conditions: &[Condition], monster: &Monster) -> bool {
    conditions.iter().all(|condition| {
        let met = condition.is_met(monster);
        if !met {
            debug!(condition = condition.check.name(), monster = %monster.name, "condition not met");
        }
        met
    })
}
