use crate::config::{ACCURACY_RANGE, POTENCY_RANGE, RECHARGE_RANGE};
use crate::error::DataError;
use crate::sim::condition::{all_met, Condition};
use crate::sim::effects::Effect;
use crate::sim::modifier::{validate_modifiers, AggregationPolicy, Modifier};
use crate::sim::monster::Monster;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const RIDDLE_CORRECT: &str = "riddle_correct";
pub const RIDDLE_INCORRECT: &str = "riddle_incorrect";
pub const SKIP: &str = "skip";
pub const RUN: &str = "run";
pub const FORFEIT: &str = "forfeit";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechSort {
    #[default]
    Damage,
    Meta,
}

impl TechSort {
    pub fn as_str(self) -> &'static str {
        match self {
            TechSort::Damage => "damage",
            TechSort::Meta => "meta",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Range {
    #[default]
    Special,
    Melee,
    Ranged,
    Touch,
    Reach,
    Reliable,
}

impl Range {
    pub fn as_str(self) -> &'static str {
        match self {
            Range::Special => "special",
            Range::Melee => "melee",
            Range::Ranged => "ranged",
            Range::Touch => "touch",
            Range::Reach => "reach",
            Range::Reliable => "reliable",
        }
    }
}

/// Which monsters a technique reaches. Flags are unioned.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetModel {
    pub enemy_monster: bool,
    pub enemy_team: bool,
    pub enemy_trainer: bool,
    pub own_monster: bool,
    pub own_team: bool,
    pub own_trainer: bool,
}

impl TargetModel {
    pub fn enemy_monster() -> Self {
        Self {
            enemy_monster: true,
            ..Self::default()
        }
    }

    pub fn own_monster() -> Self {
        Self {
            own_monster: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Technique {
    pub slug: String,
    #[serde(default)]
    pub sort: TechSort,
    #[serde(default = "one")]
    pub accuracy: f64,
    #[serde(default = "one")]
    pub potency: f64,
    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub is_fast: bool,
    #[serde(default)]
    pub healing_power: f64,
    #[serde(default)]
    pub recharge_length: u32,
    /// Rounds left before the technique can be used again.
    #[serde(default)]
    pub next_use: u32,
    #[serde(default)]
    pub range: Range,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default = "TargetModel::enemy_monster")]
    pub target: TargetModel,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub aggregation: AggregationPolicy,
    #[serde(default)]
    pub effects: Vec<Effect>,
    /// Checks the target must pass for the technique to be usable on it.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub counter: u32,
    #[serde(default)]
    pub use_tech: Option<String>,
    #[serde(default)]
    pub use_success: Option<String>,
    #[serde(default)]
    pub use_failure: Option<String>,
    #[serde(skip)]
    default_power: Option<f64>,
    #[serde(skip)]
    default_potency: Option<f64>,
}

fn one() -> f64 {
    1.0
}

impl Technique {
    pub fn new(slug: impl Into<String>, sort: TechSort, range: Range) -> Self {
        Self {
            slug: slug.into(),
            sort,
            accuracy: 1.0,
            potency: 1.0,
            power: 0.0,
            is_fast: false,
            healing_power: 0.0,
            recharge_length: 0,
            next_use: 0,
            range,
            types: Vec::new(),
            target: TargetModel::enemy_monster(),
            modifiers: Vec::new(),
            aggregation: AggregationPolicy::default(),
            effects: Vec::new(),
            conditions: Vec::new(),
            counter: 0,
            use_tech: None,
            use_success: None,
            use_failure: None,
            default_power: None,
            default_potency: None,
        }
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    pub fn with_types(mut self, types: &[&str]) -> Self {
        self.types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_target(mut self, target: TargetModel) -> Self {
        self.target = target;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Whether `target` passes every condition of this technique.
    pub fn validate_monster(&self, target: &Monster) -> bool {
        all_met(&self.conditions, target)
    }

    /// Remember the loaded power/potency so [`Technique::set_stats`] can
    /// restore them after in-battle changes.
    pub fn freeze_defaults(&mut self) {
        self.default_power = Some(self.power);
        self.default_potency = Some(self.potency);
    }

    pub fn set_stats(&mut self) {
        if let Some(power) = self.default_power {
            self.power = power;
        }
        if let Some(potency) = self.default_potency {
            self.potency = potency;
        }
    }

    pub fn is_recharging(&self) -> bool {
        self.next_use > 0
    }

    pub fn recharge(&mut self, rounds: u32) {
        self.next_use = self.next_use.saturating_sub(rounds);
    }

    pub fn advance_round(&mut self) {
        self.recharge(1);
    }

    pub fn full_recharge(&mut self) {
        self.next_use = 0;
    }

    pub fn mark_used(&mut self) {
        self.next_use = self.recharge_length;
        self.counter = self.counter.saturating_add(1);
    }

    pub fn validate(&self) -> Result<(), DataError> {
        check_range("accuracy", &self.slug, self.accuracy, ACCURACY_RANGE)?;
        check_range("potency", &self.slug, self.potency, POTENCY_RANGE)?;
        let (min_recharge, max_recharge) = RECHARGE_RANGE;
        check_range(
            "recharge_length",
            &self.slug,
            f64::from(self.recharge_length),
            (f64::from(min_recharge), f64::from(max_recharge)),
        )?;
        if self.power < 0.0 {
            return Err(out_of_range("power", &self.slug, self.power, 0.0, f64::MAX));
        }
        for effect in &self.effects {
            effect.validate("technique", &self.slug)?;
        }
        for condition in &self.conditions {
            condition.validate("technique", &self.slug)?;
        }
        validate_modifiers("technique", &self.slug, &self.modifiers)
    }

    pub fn get_state(&self) -> Value {
        json!({
            "slug": self.slug,
            "next_use": self.next_use,
            "counter": self.counter,
        })
    }

    pub fn set_state(&mut self, state: &Value) {
        if let Some(next_use) = state.get("next_use").and_then(Value::as_u64) {
            self.next_use = next_use as u32;
        }
        if let Some(counter) = state.get("counter").and_then(Value::as_u64) {
            self.counter = counter as u32;
        }
    }
}

fn check_range(field: &str, slug: &str, value: f64, (min, max): (f64, f64)) -> Result<(), DataError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(out_of_range(field, slug, value, min, max))
    }
}

fn out_of_range(field: &str, slug: &str, value: f64, min: f64, max: f64) -> DataError {
    DataError::OutOfRange {
        table: "technique".to_string(),
        slug: slug.to_string(),
        field: field.to_string(),
        value,
        min,
        max,
    }
}
