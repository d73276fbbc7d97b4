use crate::config::COEFF_STATS;
use crate::sim::modifier::Modifier;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatType {
    Armour,
    Dodge,
    Hp,
    Melee,
    Ranged,
    Speed,
}

impl StatType {
    pub const ALL: [StatType; 6] = [
        StatType::Armour,
        StatType::Dodge,
        StatType::Hp,
        StatType::Melee,
        StatType::Ranged,
        StatType::Speed,
    ];

    /// Stats that tastes can change. HP is never flavoured.
    pub const TASTED: [StatType; 5] = [
        StatType::Armour,
        StatType::Dodge,
        StatType::Melee,
        StatType::Ranged,
        StatType::Speed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatType::Armour => "armour",
            StatType::Dodge => "dodge",
            StatType::Hp => "hp",
            StatType::Melee => "melee",
            StatType::Ranged => "ranged",
            StatType::Speed => "speed",
        }
    }

    pub fn parse(name: &str) -> Option<StatType> {
        StatType::ALL.into_iter().find(|stat| stat.as_str() == name)
    }
}

/// The six combat stats as a plain block.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    #[serde(default)]
    pub armour: u32,
    #[serde(default)]
    pub dodge: u32,
    #[serde(default)]
    pub hp: u32,
    #[serde(default)]
    pub melee: u32,
    #[serde(default)]
    pub ranged: u32,
    #[serde(default)]
    pub speed: u32,
}

impl StatBlock {
    pub fn get(&self, stat: StatType) -> u32 {
        match stat {
            StatType::Armour => self.armour,
            StatType::Dodge => self.dodge,
            StatType::Hp => self.hp,
            StatType::Melee => self.melee,
            StatType::Ranged => self.ranged,
            StatType::Speed => self.speed,
        }
    }

    pub fn set(&mut self, stat: StatType, value: u32) {
        match stat {
            StatType::Armour => self.armour = value,
            StatType::Dodge => self.dodge = value,
            StatType::Hp => self.hp = value,
            StatType::Melee => self.melee = value,
            StatType::Ranged => self.ranged = value,
            StatType::Speed => self.speed = value,
        }
    }
}

/// Flat additions on top of the shape-derived stats (items, training).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifierStats {
    #[serde(default)]
    pub armour: i32,
    #[serde(default)]
    pub dodge: i32,
    #[serde(default)]
    pub hp: i32,
    #[serde(default)]
    pub melee: i32,
    #[serde(default)]
    pub ranged: i32,
    #[serde(default)]
    pub speed: i32,
}

impl ModifierStats {
    pub fn get(&self, stat: StatType) -> i32 {
        match stat {
            StatType::Armour => self.armour,
            StatType::Dodge => self.dodge,
            StatType::Hp => self.hp,
            StatType::Melee => self.melee,
            StatType::Ranged => self.ranged,
            StatType::Speed => self.speed,
        }
    }
}

/// Base-stat template of a body shape ("dragon", "blob", ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub slug: String,
    pub attributes: StatBlock,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TasteType {
    Warm,
    Cold,
}

/// Flavour trait nudging individual stats by a fixed percentage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Taste {
    pub slug: String,
    pub taste_type: TasteType,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

pub const TASTELESS: &str = "tasteless";

impl Taste {
    pub fn tasteless(taste_type: TasteType) -> Self {
        Self {
            slug: TASTELESS.to_string(),
            taste_type,
            modifiers: Vec::new(),
        }
    }
}

/// stat = shape attribute × (level + COEFF_STATS) + flat modifier.
pub fn calculate_base_stats(shape: &StatBlock, level: u32, modifiers: &ModifierStats) -> StatBlock {
    let multiplier = i64::from(level + COEFF_STATS);
    let mut stats = StatBlock::default();
    for stat in StatType::ALL {
        let value = i64::from(shape.get(stat)) * multiplier + i64::from(modifiers.get(stat));
        stats.set(stat, value.clamp(0, i64::from(u32::MAX)) as u32);
    }
    stats
}

/// Multiply a stat by every taste modifier that names it, then truncate.
pub fn update_stat(stat: StatType, value: u32, tastes: &[&Taste]) -> u32 {
    let mut modified = f64::from(value);
    for taste in tastes {
        for modifier in &taste.modifiers {
            if modifier.values.iter().any(|v| v == stat.as_str()) {
                modified *= modifier.multiplier;
            }
        }
    }
    modified as u32
}

pub fn apply_stat_updates(stats: &mut StatBlock, taste_cold: &Taste, taste_warm: &Taste) {
    let tastes = [taste_cold, taste_warm];
    for stat in StatType::TASTED {
        let value = update_stat(stat, stats.get(stat), &tastes);
        stats.set(stat, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::modifier::{Modifier, ModifierAttribute};

    fn taste(slug: &str, taste_type: TasteType, stat: &str, multiplier: f64) -> Taste {
        Taste {
            slug: slug.to_string(),
            taste_type,
            modifiers: vec![Modifier {
                attribute: ModifierAttribute::Stat,
                values: vec![stat.to_string()],
                multiplier,
            }],
        }
    }

    fn shape() -> StatBlock {
        StatBlock {
            armour: 7,
            dodge: 5,
            hp: 6,
            melee: 6,
            ranged: 4,
            speed: 5,
        }
    }

    #[test]
    fn base_stats_scale_with_level() {
        let stats = calculate_base_stats(&shape(), 10, &ModifierStats::default());
        assert_eq!(stats.armour, 7 * 17);
        assert_eq!(stats.hp, 6 * 17);
        assert_eq!(stats.speed, 5 * 17);
    }

    #[test]
    fn flat_modifiers_are_added() {
        let modifiers = ModifierStats {
            hp: 5,
            melee: -3,
            ..ModifierStats::default()
        };
        let stats = calculate_base_stats(&shape(), 3, &modifiers);
        assert_eq!(stats.hp, 6 * 10 + 5);
        assert_eq!(stats.melee, 6 * 10 - 3);
    }

    #[test]
    fn tastes_apply_ten_percent() {
        let warm = taste("salty", TasteType::Warm, "melee", 1.1);
        let cold = taste("mild", TasteType::Cold, "speed", 0.9);
        let mut stats = calculate_base_stats(&shape(), 13, &ModifierStats::default());
        apply_stat_updates(&mut stats, &cold, &warm);
        assert_eq!(stats.melee, (120.0_f64 * 1.1) as u32);
        assert_eq!(stats.speed, (100.0_f64 * 0.9) as u32);
        assert_eq!(stats.armour, 140);
    }

    #[test]
    fn hp_is_never_tasted() {
        let warm = taste("hearty", TasteType::Warm, "hp", 1.1);
        let cold = Taste::tasteless(TasteType::Cold);
        let mut stats = calculate_base_stats(&shape(), 3, &ModifierStats::default());
        apply_stat_updates(&mut stats, &cold, &warm);
        assert_eq!(stats.hp, 60);
    }

    #[test]
    fn stat_names_round_trip() {
        for stat in StatType::ALL {
            assert_eq!(StatType::parse(stat.as_str()), Some(stat));
        }
        assert_eq!(StatType::parse("luck"), None);
    }
}
