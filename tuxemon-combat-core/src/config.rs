//! Tuning constants and the JSON-backed combat configuration.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const COEFF_STATS: u32 = 7;
pub const COEFF_DAMAGE: u32 = 7;
pub const COEFF_EXP: u32 = 3;
pub const MAX_LEVEL: u32 = 999;
pub const MAX_MOVES: usize = 4;
pub const CATCH_RATE_RANGE: (f64, f64) = (0.0, 100.0);
pub const ACCURACY_RANGE: (f64, f64) = (0.0, 1.0);
pub const POTENCY_RANGE: (f64, f64) = (0.0, 1.0);
pub const RECHARGE_RANGE: (u32, u32) = (0, 5);
pub const MODIFIER_RANGE: (f64, f64) = (0.0, 2.0);

/// Which stat of a monster feeds one side of the damage formula.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatWeight {
    pub stat: String,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeMapEntry {
    pub user_stat: StatWeight,
    pub target_stat: StatWeight,
}

fn range_entry(user: &str, target: &str) -> RangeMapEntry {
    RangeMapEntry {
        user_stat: StatWeight {
            stat: user.to_string(),
            weight: 1.0,
        },
        target_stat: StatWeight {
            stat: target.to_string(),
            weight: 1.0,
        },
    }
}

fn default_range_map() -> HashMap<String, RangeMapEntry> {
    let mut map = HashMap::new();
    map.insert("melee".to_string(), range_entry("melee", "armour"));
    map.insert("ranged".to_string(), range_entry("ranged", "dodge"));
    map.insert("touch".to_string(), range_entry("melee", "dodge"));
    map.insert("reach".to_string(), range_entry("ranged", "armour"));
    map.insert("reliable".to_string(), range_entry("level", "resist"));
    map
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub total_shakes: u32,
    pub shake_constant: f64,
    pub shake_denominator: f64,
    pub shake_divisor: u32,
    pub shake_hp_multiplier: f64,
    pub shake_current_hp_multiplier: f64,
    pub shake_hp_divisor: f64,
    pub status_modifier: f64,
    pub capdev_modifier: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            total_shakes: 4,
            shake_constant: 65536.0,
            shake_denominator: 1.0,
            shake_divisor: 65536,
            shake_hp_multiplier: 3.0,
            shake_current_hp_multiplier: 2.0,
            shake_hp_divisor: 3.0,
            status_modifier: 1.0,
            capdev_modifier: 1.0,
        }
    }
}

/// Riddle tuning values. These are undocumented balance numbers; keep them
/// as data rather than re-deriving them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiddleConfig {
    pub ai_base_rate: f64,
    pub ai_rate_per_level: f64,
    pub ai_base_cap: f64,
    pub ai_min_rate: f64,
    pub ai_max_rate: f64,
    pub easy_modifier: f64,
    pub medium_modifier: f64,
    pub hard_modifier: f64,
    pub easy_max_level: u32,
    pub medium_max_level: u32,
    pub feedback_duration: f32,
    pub max_answer_length: usize,
    /// Power of `riddle_correct` before the riddle multiplier is applied.
    pub correct_base_power: f64,
    /// Fixed self-damage dealt by `riddle_incorrect`.
    pub incorrect_penalty: f64,
}

impl Default for RiddleConfig {
    fn default() -> Self {
        Self {
            ai_base_rate: 0.3,
            ai_rate_per_level: 0.02,
            ai_base_cap: 0.9,
            ai_min_rate: 0.1,
            ai_max_rate: 0.95,
            easy_modifier: 0.2,
            medium_modifier: 0.0,
            hard_modifier: -0.3,
            easy_max_level: 10,
            medium_max_level: 25,
            feedback_duration: 2.0,
            max_answer_length: 50,
            correct_base_power: 50.0,
            incorrect_penalty: 30.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub letter_time: f32,
    pub action_time: f32,
    pub begin_delay: f32,
    /// Element multipliers that produce a message (e.g. 2.0 → super effective).
    pub multiplier_map: Vec<(f64, String)>,
    pub multiplier_range: (f64, f64),
    pub multiplier_speed: f64,
    pub speed_offset: f64,
    pub dodge_modifier: f64,
    pub base_speed_bonus: f64,
    pub min_speed_modifier: f64,
    pub sort_order: Vec<String>,
    pub range_map: HashMap<String, RangeMapEntry>,
    pub capture: CaptureConfig,
    pub riddle: RiddleConfig,
    pub experience_modifier: f64,
    /// Escape formula used by human-controlled teams.
    pub escape_method: String,
    /// Escape formula used by AI-controlled teams.
    pub escape_method_ai: String,
    /// Safety valve for headless runs.
    pub max_turns: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            letter_time: 0.02,
            action_time: 1.0,
            begin_delay: 3.0,
            multiplier_map: vec![
                (0.25, "attack_very_weak".to_string()),
                (0.5, "attack_weak".to_string()),
                (2.0, "attack_strong".to_string()),
                (4.0, "attack_very_strong".to_string()),
            ],
            multiplier_range: (0.25, 4.0),
            multiplier_speed: 1.5,
            speed_offset: 3.0,
            dodge_modifier: 0.01,
            base_speed_bonus: 1.0,
            min_speed_modifier: 1.0,
            sort_order: ["potion", "utility", "quest", "food", "meta", "damage"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            range_map: default_range_map(),
            capture: CaptureConfig::default(),
            riddle: RiddleConfig::default(),
            experience_modifier: 1.0,
            escape_method: "default".to_string(),
            escape_method_ai: "default".to_string(),
            max_turns: 500,
        }
    }
}

impl CombatConfig {
    /// Load a JSON config file; absent fields keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read combat config at {}", path.display()))?;
        let config: CombatConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let (min_range, max_range) = self.multiplier_range;
        if min_range > max_range {
            bail!("multiplier_range {min_range}..{max_range} is empty");
        }
        for (multiplier, _) in &self.multiplier_map {
            if !(min_range..=max_range).contains(multiplier) {
                bail!(
                    "Multiplier {multiplier} is outside the allowed range: ({min_range}, {max_range})"
                );
            }
        }
        if self.sort_order.is_empty() {
            bail!("sort_order must not be empty");
        }
        if self.capture.shake_divisor == 0 || self.capture.shake_hp_divisor == 0.0 {
            bail!("capture divisors must be > 0");
        }
        let riddle = &self.riddle;
        if riddle.ai_min_rate > riddle.ai_max_rate {
            bail!("riddle ai_min_rate must not exceed ai_max_rate");
        }
        if riddle.easy_max_level > riddle.medium_max_level {
            bail!("riddle easy_max_level must not exceed medium_max_level");
        }
        Ok(())
    }

    /// Message slug for an element multiplier, if the map names one.
    pub fn multiplier_message(&self, multiplier: f64) -> Option<&str> {
        self.multiplier_map
            .iter()
            .find(|(value, _)| (value - multiplier).abs() < f64::EPSILON)
            .map(|(_, key)| key.as_str())
    }

    pub fn sort_index(&self, sort: &str) -> usize {
        self.sort_order
            .iter()
            .position(|entry| entry == sort)
            .unwrap_or(self.sort_order.len())
    }
}
