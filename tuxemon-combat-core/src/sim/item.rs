use crate::error::DataError;
use crate::sim::condition::{all_met, Condition};
use crate::sim::effects::Effect;
use crate::sim::monster::Monster;
use crate::sim::technique::TargetModel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Consumable used from a trainer's inventory during combat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub slug: String,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default = "TargetModel::enemy_monster")]
    pub target: TargetModel,
    /// Capture device strength. Neutral for everything else.
    #[serde(default = "one")]
    pub capture_modifier: f64,
    /// Extra capture multipliers keyed by the target's status slug.
    #[serde(default)]
    pub status_modifiers: HashMap<String, f64>,
    #[serde(default)]
    pub use_success: Option<String>,
    #[serde(default)]
    pub use_failure: Option<String>,
}

fn default_sort() -> String {
    "utility".to_string()
}

fn one() -> f64 {
    1.0
}

impl Item {
    pub fn new(slug: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            sort: sort.into(),
            effects: Vec::new(),
            conditions: Vec::new(),
            target: TargetModel::enemy_monster(),
            capture_modifier: 1.0,
            status_modifiers: HashMap::new(),
            use_success: None,
            use_failure: None,
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn validate_monster(&self, target: &Monster) -> bool {
        all_met(&self.conditions, target)
    }

    /// Base status modifier scaled by every status of the target this item
    /// has an opinion about.
    pub fn status_modifier(&self, base: f64, target: &Monster) -> f64 {
        target
            .status
            .iter()
            .filter_map(|status| self.status_modifiers.get(&status.slug))
            .fold(base, |acc, factor| acc * factor)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        for effect in &self.effects {
            effect.validate("item", &self.slug)?;
        }
        for condition in &self.conditions {
            condition.validate("item", &self.slug)?;
        }
        if self.capture_modifier < 0.0 {
            return Err(DataError::Invalid {
                table: "item".to_string(),
                slug: self.slug.clone(),
                message: "capture_modifier must not be negative".to_string(),
            });
        }
        Ok(())
    }
}
