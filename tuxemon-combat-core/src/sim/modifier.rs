//! Type/tag keyed multipliers and the policies that combine them.

use crate::config::MODIFIER_RANGE;
use crate::error::DataError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierAttribute {
    Type,
    Tag,
    /// Names stats rather than monster traits; only tastes use it.
    Stat,
}

/// A multiplier that applies when a monster has one of `values` as a type
/// (or tag, depending on `attribute`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub attribute: ModifierAttribute,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default = "neutral")]
    pub multiplier: f64,
}

fn neutral() -> f64 {
    1.0
}

impl Modifier {
    pub fn for_types(values: &[&str], multiplier: f64) -> Self {
        Self {
            attribute: ModifierAttribute::Type,
            values: values.iter().map(|v| v.to_string()).collect(),
            multiplier,
        }
    }

    pub fn for_tags(values: &[&str], multiplier: f64) -> Self {
        Self {
            attribute: ModifierAttribute::Tag,
            values: values.iter().map(|v| v.to_string()).collect(),
            multiplier,
        }
    }

    pub fn applies_to(&self, types: &[String], tags: &[String]) -> bool {
        let pool = match self.attribute {
            ModifierAttribute::Type => types,
            ModifierAttribute::Tag => tags,
            ModifierAttribute::Stat => return false,
        };
        pool.iter().any(|entry| self.values.contains(entry))
    }
}

/// Load-time range check shared by every table that carries modifiers.
pub fn validate_modifiers(table: &str, slug: &str, modifiers: &[Modifier]) -> Result<(), DataError> {
    let (min, max) = MODIFIER_RANGE;
    for modifier in modifiers {
        if !(min..=max).contains(&modifier.multiplier) {
            return Err(DataError::OutOfRange {
                table: table.to_string(),
                slug: slug.to_string(),
                field: "modifier.multiplier".to_string(),
                value: modifier.multiplier,
                min,
                max,
            });
        }
    }
    Ok(())
}

/// Which monster traits a modifier set is matched against.
pub trait ModifierTarget {
    fn modifier_types(&self) -> &[String];
    fn modifier_tags(&self) -> &[String];
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    #[default]
    WeakestLink,
    StrongestLink,
    Cumulative,
    Average,
    FirstApplicable,
}

impl AggregationPolicy {
    pub fn apply<T: ModifierTarget + ?Sized>(self, modifiers: &[Modifier], monster: &T) -> f64 {
        match self {
            AggregationPolicy::WeakestLink => weakest_link(modifiers, monster),
            AggregationPolicy::StrongestLink => strongest_link(modifiers, monster),
            AggregationPolicy::Cumulative => cumulative_damage(modifiers, monster),
            AggregationPolicy::Average => average_damage(modifiers, monster),
            AggregationPolicy::FirstApplicable => first_applicable_damage(modifiers, monster),
        }
    }
}

fn matching<'a, T: ModifierTarget + ?Sized>(
    modifiers: &'a [Modifier],
    monster: &'a T,
) -> impl Iterator<Item = f64> + 'a {
    modifiers
        .iter()
        .filter(move |m| m.applies_to(monster.modifier_types(), monster.modifier_tags()))
        .map(|m| m.multiplier)
}

/// Smallest applicable multiplier, never above 1.0.
pub fn weakest_link<T: ModifierTarget + ?Sized>(modifiers: &[Modifier], monster: &T) -> f64 {
    matching(modifiers, monster).fold(1.0, f64::min)
}

pub fn strongest_link<T: ModifierTarget + ?Sized>(modifiers: &[Modifier], monster: &T) -> f64 {
    matching(modifiers, monster).reduce(f64::max).unwrap_or(1.0)
}

pub fn cumulative_damage<T: ModifierTarget + ?Sized>(modifiers: &[Modifier], monster: &T) -> f64 {
    matching(modifiers, monster).product()
}

pub fn average_damage<T: ModifierTarget + ?Sized>(modifiers: &[Modifier], monster: &T) -> f64 {
    let values: Vec<f64> = matching(modifiers, monster).collect();
    if values.is_empty() {
        return 1.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn first_applicable_damage<T: ModifierTarget + ?Sized>(
    modifiers: &[Modifier],
    monster: &T,
) -> f64 {
    matching(modifiers, monster).next().unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Subject {
        types: Vec<String>,
        tags: Vec<String>,
    }

    impl ModifierTarget for Subject {
        fn modifier_types(&self) -> &[String] {
            &self.types
        }
        fn modifier_tags(&self) -> &[String] {
            &self.tags
        }
    }

    fn subject(types: &[&str], tags: &[&str]) -> Subject {
        Subject {
            types: types.iter().map(|t| t.to_string()).collect(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    const ALL: [AggregationPolicy; 5] = [
        AggregationPolicy::WeakestLink,
        AggregationPolicy::StrongestLink,
        AggregationPolicy::Cumulative,
        AggregationPolicy::Average,
        AggregationPolicy::FirstApplicable,
    ];

    #[test]
    fn empty_modifiers_are_neutral() {
        let monster = subject(&["fire"], &[]);
        for policy in ALL {
            assert_eq!(policy.apply(&[], &monster), 1.0, "{policy:?}");
        }
    }

    #[test]
    fn non_matching_modifiers_are_neutral() {
        let monster = subject(&["fire"], &["small"]);
        let modifiers = vec![
            Modifier::for_types(&["water"], 0.5),
            Modifier::for_tags(&["huge"], 1.8),
        ];
        for policy in ALL {
            assert_eq!(policy.apply(&modifiers, &monster), 1.0, "{policy:?}");
        }
    }

    #[test]
    fn policies_combine_matches() {
        let monster = subject(&["fire", "wood"], &["small"]);
        let modifiers = vec![
            Modifier::for_types(&["fire"], 1.5),
            Modifier::for_types(&["wood"], 0.5),
            Modifier::for_tags(&["small"], 2.0),
        ];
        assert_eq!(weakest_link(&modifiers, &monster), 0.5);
        assert_eq!(strongest_link(&modifiers, &monster), 2.0);
        assert_eq!(cumulative_damage(&modifiers, &monster), 1.5);
        assert!((average_damage(&modifiers, &monster) - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(first_applicable_damage(&modifiers, &monster), 1.5);
    }

    #[test]
    fn weakest_link_never_exceeds_neutral() {
        let monster = subject(&["fire"], &[]);
        let modifiers = vec![Modifier::for_types(&["fire"], 1.8)];
        assert_eq!(weakest_link(&modifiers, &monster), 1.0);
    }

    #[test]
    fn multiplier_above_two_is_a_data_error() {
        let modifiers = vec![Modifier::for_types(&["fire"], 2.5)];
        let err = validate_modifiers("technique", "blaze", &modifiers).unwrap_err();
        assert!(matches!(err, DataError::OutOfRange { .. }));
        assert!(validate_modifiers("technique", "blaze", &[Modifier::for_types(&["fire"], 2.0)]).is_ok());
    }

    #[test]
    fn unknown_attribute_is_rejected_when_parsing() {
        let parsed: Result<Modifier, _> =
            serde_json::from_str(r#"{"attribute": "colour", "values": ["red"], "multiplier": 1.2}"#);
        assert!(parsed.is_err());
    }
}
