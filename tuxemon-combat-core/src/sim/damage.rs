//! Combat formulas: damage, healing, speed, capture and escape.

use crate::config::{CombatConfig, CATCH_RATE_RANGE, COEFF_DAMAGE};
use crate::db::DataStore;
use crate::sim::element::AETHER;
use crate::sim::monster::Monster;
use crate::sim::stats::StatType;
use crate::sim::technique::Technique;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, error};

const LEVEL_STAT: &str = "level";
const RESIST_STAT: &str = "resist";

fn element_multiplier(db: &dyn DataStore, attack: &str, target: &str) -> f64 {
    match db.lookup_element(attack) {
        Ok(element) => element.lookup_multiplier(target),
        Err(err) => {
            error!(%err, "attack element missing, using 1.0");
            1.0
        }
    }
}

/// Type effectiveness clamped to `multiplier_range`, then scaled by the
/// product of `factors`. Aether on either side never changes the result.
/// With several type pairs the last evaluated pair wins.
pub fn simple_damage_multiplier(
    db: &dyn DataStore,
    config: &CombatConfig,
    attack_types: &[String],
    target_types: &[String],
    factors: &[f64],
) -> f64 {
    let (min_range, max_range) = config.multiplier_range;
    let mut multiplier = 1.0;
    for attack in attack_types {
        for target in target_types {
            if attack == AETHER || target == AETHER {
                continue;
            }
            multiplier = element_multiplier(db, attack, target).clamp(min_range, max_range);
        }
    }
    multiplier * factors.iter().product::<f64>()
}

/// Unclamped product over every type pair.
pub fn calculate_multiplier(db: &dyn DataStore, monster_types: &[String], opponent_types: &[String]) -> f64 {
    let mut multiplier = 1.0;
    for attack in monster_types {
        for target in opponent_types {
            if attack == AETHER || target == AETHER {
                continue;
            }
            multiplier *= element_multiplier(db, attack, target);
        }
    }
    multiplier
}

fn named_stat(monster: &Monster, name: &str) -> f64 {
    StatType::parse(name)
        .map(|stat| f64::from(monster.return_stat(stat)))
        .unwrap_or(0.0)
}

/// Returns `(damage, multiplier)`. Unmapped ranges deal nothing.
pub fn simple_damage_calculate(
    db: &dyn DataStore,
    config: &CombatConfig,
    technique: &Technique,
    user: &Monster,
    target: &Monster,
    factors: &[f64],
) -> (u32, f64) {
    let Some(entry) = config.range_map.get(technique.range.as_str()) else {
        error!(
            technique = %technique.slug,
            range = technique.range.as_str(),
            "unhandled damage range"
        );
        return (0, 0.0);
    };

    let level_factor = f64::from(COEFF_DAMAGE + user.level);
    let user_strength = if entry.user_stat.stat == LEVEL_STAT {
        level_factor * entry.user_stat.weight
    } else {
        named_stat(user, &entry.user_stat.stat) * level_factor * entry.user_stat.weight
    };

    let target_resist = if entry.target_stat.stat == RESIST_STAT {
        entry.target_stat.weight
    } else {
        named_stat(target, &entry.target_stat.stat) * entry.target_stat.weight
    }
    .max(1.0);

    let multiplier = simple_damage_multiplier(db, config, &technique.types, &target.types, factors);
    let damage = (user_strength * technique.power * multiplier / target_resist) as u32;
    debug!(
        technique = %technique.slug,
        user_strength,
        target_resist,
        multiplier,
        damage,
        "damage calculated"
    );
    (damage, multiplier)
}

pub fn simple_heal(technique: &Technique, monster: &Monster, factors: &[f64]) -> u32 {
    let base = f64::from(COEFF_DAMAGE) + f64::from(monster.level) * technique.healing_power;
    (base * factors.iter().product::<f64>()) as u32
}

pub fn simple_recover(target: &Monster, divisor: u32) -> u32 {
    (target.hp() / divisor.max(1)).min(target.missing_hp())
}

/// HP moved from `target` to `user`.
pub fn simple_lifeleech(user: &Monster, target: &Monster, divisor: u32) -> u32 {
    (target.hp() / divisor.max(1))
        .min(target.current_hp)
        .min(user.missing_hp())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HealthChange {
    /// Fraction of max HP.
    Fraction(f64),
    Points(i64),
}

/// Set (or adjust, when `adjust`) current HP, clamped to `[0, hp]`.
/// Reaching 0 faints the monster.
pub fn set_health(monster: &mut Monster, value: HealthChange, adjust: bool) {
    let amount = match value {
        HealthChange::Fraction(fraction) => (f64::from(monster.hp()) * fraction) as i64,
        HealthChange::Points(points) => points,
    };
    let base = if adjust { i64::from(monster.current_hp) } else { 0 };
    monster.current_hp = (base + amount).clamp(0, i64::from(monster.hp())) as u32;
    if monster.current_hp == 0 {
        monster.faint();
    }
}

/// Effective speed used to order damage actions within a round.
pub fn speed_monster<R: Rng + ?Sized>(
    config: &CombatConfig,
    monster: &Monster,
    technique: Option<&Technique>,
    rng: &mut R,
) -> i64 {
    let bonus = match technique {
        Some(tech) if tech.is_fast => config.multiplier_speed,
        _ => config.base_speed_bonus,
    };
    let mut speed = f64::from(monster.stats.speed) * bonus;
    if config.speed_offset > 0.0 {
        speed += rng.gen_range(-config.speed_offset..=config.speed_offset);
    }
    speed = speed.max(config.min_speed_modifier);
    speed += f64::from(monster.stats.dodge) * config.dodge_modifier;
    speed as i64
}

/// Gen III/IV style per-shake threshold.
pub fn shake_check<R: Rng + ?Sized>(
    config: &CombatConfig,
    target: &Monster,
    status_modifier: f64,
    capdev_modifier: f64,
    rng: &mut R,
) -> f64 {
    let capture = &config.capture;
    let hp = f64::from(target.hp().max(1));
    let current = f64::from(target.current_hp);
    let catch_check = ((capture.shake_hp_multiplier * hp - capture.shake_current_hp_multiplier * current)
        * target.catch_rate
        * status_modifier
        * capdev_modifier
        / (capture.shake_hp_divisor * hp))
        .max(f64::MIN_POSITIVE);
    let max_catch_rate = CATCH_RATE_RANGE.1;
    let mut check =
        capture.shake_constant / ((max_catch_rate / catch_check).sqrt().sqrt() * capture.shake_denominator);
    let (low, high) = (
        target.lower_catch_resistance.min(target.upper_catch_resistance),
        target.lower_catch_resistance.max(target.upper_catch_resistance),
    );
    if high > low {
        check *= rng.gen_range(low..=high);
    } else {
        check *= low;
    }
    debug!(catch_check, shake_check = check, "capture check");
    check
}

/// Returns `(captured, shakes)`. Escapes on the first shake whose roll
/// exceeds `shake_check`.
pub fn capture<R: Rng + ?Sized>(config: &CombatConfig, shake_check: f64, rng: &mut R) -> (bool, u32) {
    let total = config.capture.total_shakes;
    for shake in 0..total {
        let roll = rng.gen_range(0..=config.capture.shake_divisor);
        if f64::from(roll) > shake_check.trunc() {
            return (false, shake + 1);
        }
    }
    (true, total)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMethod {
    Default,
    Relative,
    Always,
    Never,
}

impl FromStr for EscapeMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "default" => Ok(EscapeMethod::Default),
            "relative" => Ok(EscapeMethod::Relative),
            "always" => Ok(EscapeMethod::Always),
            "never" => Ok(EscapeMethod::Never),
            other => Err(format!("A formula for {other} doesn't exist.")),
        }
    }
}

pub fn default_escape_chance(user: &Monster, target: &Monster, attempts: u32) -> f64 {
    let advantage = i64::from(attempts) + i64::from(user.level) - i64::from(target.level);
    0.4 + 0.15 * advantage as f64
}

pub fn relative_escape_chance(user: &Monster, target: &Monster) -> f64 {
    let strength = f64::from(target.stats.melee + target.stats.ranged + target.stats.dodge) / 3.0;
    let advantage = i64::from(user.level) - i64::from(target.level);
    (0.2 + 0.1 * advantage as f64 - 0.05 * strength / 10.0 + 0.05 * f64::from(user.stats.speed) / 10.0)
        .clamp(0.0, 1.0)
}

pub fn attempt_escape<R: Rng + ?Sized>(
    method: EscapeMethod,
    user: &Monster,
    target: &Monster,
    attempts: u32,
    rng: &mut R,
) -> bool {
    match method {
        EscapeMethod::Default => rng.gen::<f64>() <= default_escape_chance(user, target, attempts),
        EscapeMethod::Relative => rng.gen::<f64>() <= relative_escape_chance(user, target),
        EscapeMethod::Always => true,
        EscapeMethod::Never => false,
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl StatOp {
    pub fn apply(self, base: f64, value: f64) -> f64 {
        match self {
            StatOp::Add => base + value,
            StatOp::Subtract => base - value,
            StatOp::Multiply => base * value,
            StatOp::Divide if value == 0.0 => base,
            StatOp::Divide => base / value,
        }
    }
}

/// Persistently shift a stat through the monster's flat modifiers, then
/// recompute stats.
pub fn modify_stat(monster: &mut Monster, stat: StatType, value: f64, op: StatOp) {
    let current = f64::from(monster.return_stat(stat));
    let target = op.apply(current, value).max(0.0);
    let delta = (target - current) as i32;
    let slot = match stat {
        StatType::Armour => &mut monster.modifiers.armour,
        StatType::Dodge => &mut monster.modifiers.dodge,
        StatType::Hp => &mut monster.modifiers.hp,
        StatType::Melee => &mut monster.modifiers.melee,
        StatType::Ranged => &mut monster.modifiers.ranged,
        StatType::Speed => &mut monster.modifiers.speed,
    };
    *slot = slot.saturating_add(delta);
    monster.set_stats();
}

/// Experience each attacker earns for defeating `loser` after `hits` hits.
pub fn experience_reward(loser: &Monster, hits: u32, modifier: f64) -> u64 {
    let divisor = u64::from(loser.level.max(1)) * u64::from(hits.max(1));
    ((loser.total_experience / divisor) as f64 * modifier) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::sim::stats::{Taste, TasteType};
    use crate::sim::technique::{Range, TechSort};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn setup() -> (Database, CombatConfig) {
        (Database::builtin().expect("builtin data"), CombatConfig::default())
    }

    fn make_monster(db: &Database, slug: &str, level: u32) -> Monster {
        let mut rng = SmallRng::seed_from_u64(3);
        Monster::spawn(db, slug, level, &mut rng).expect("species exists")
    }

    fn types(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn aether_is_neutral() {
        let (db, config) = setup();
        let value = simple_damage_multiplier(&db, &config, &types(&["aether"]), &types(&["wood"]), &[]);
        assert_eq!(value, 1.0);
        let value = simple_damage_multiplier(&db, &config, &types(&["fire"]), &types(&["aether"]), &[]);
        assert_eq!(value, 1.0);
    }

    #[test]
    fn type_advantage_and_factors() {
        let (db, config) = setup();
        let value = simple_damage_multiplier(&db, &config, &types(&["fire"]), &types(&["wood"]), &[0.5]);
        assert_eq!(value, 1.0);
        let value = calculate_multiplier(&db, &types(&["fire"]), &types(&["wood", "metal"]));
        assert_eq!(value, 2.0 * 0.5);
    }

    #[test]
    fn damage_follows_range_map() {
        let (db, config) = setup();
        let user = make_monster(&db, "rockitten", 10);
        let target = make_monster(&db, "budaye", 10);
        let tech = Technique::new("ram", TechSort::Damage, Range::Melee)
            .with_power(1.0)
            .with_types(&["aether"]);
        let (damage, multiplier) = simple_damage_calculate(&db, &config, &tech, &user, &target, &[]);
        let expected = (f64::from(user.stats.melee) * 17.0 / f64::from(target.stats.armour.max(1))) as u32;
        assert_eq!(multiplier, 1.0);
        assert_eq!(damage, expected);
    }

    #[test]
    fn special_range_deals_nothing() {
        let (db, config) = setup();
        let user = make_monster(&db, "rockitten", 10);
        let tech = Technique::new("glare", TechSort::Damage, Range::Special).with_power(3.0);
        assert_eq!(simple_damage_calculate(&db, &config, &tech, &user, &user, &[]), (0, 0.0));
    }

    #[test]
    fn heal_scales_with_level_and_factors() {
        let (db, _) = setup();
        let monster = make_monster(&db, "rockitten", 10);
        let mut tech = Technique::new("mend", TechSort::Meta, Range::Special);
        tech.healing_power = 2.0;
        assert_eq!(simple_heal(&tech, &monster, &[]), 27);
        assert_eq!(simple_heal(&tech, &monster, &[0.5]), 13);
    }

    #[test]
    fn set_health_faints_at_zero() {
        let (db, _) = setup();
        let mut monster = make_monster(&db, "rockitten", 10);
        set_health(&mut monster, HealthChange::Points(-10_000), true);
        assert!(monster.is_fainted());
        assert!(monster.has_status("faint"));
    }

    #[test]
    fn set_health_fraction() {
        let (db, _) = setup();
        let mut monster = make_monster(&db, "rockitten", 10);
        set_health(&mut monster, HealthChange::Fraction(0.5), false);
        assert_eq!(monster.current_hp, monster.hp() / 2);
    }

    #[test]
    fn fast_techniques_are_quicker_without_offset() {
        let (db, mut config) = setup();
        config.speed_offset = 0.0;
        let monster = make_monster(&db, "rockitten", 10);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut tech = Technique::new("jab", TechSort::Damage, Range::Melee);
        let slow = speed_monster(&config, &monster, Some(&tech), &mut rng);
        tech.is_fast = true;
        let fast = speed_monster(&config, &monster, Some(&tech), &mut rng);
        assert!(fast > slow);
    }

    #[test]
    fn full_health_capture_is_harder() {
        let (db, config) = setup();
        let mut rng = SmallRng::seed_from_u64(9);
        let mut target = make_monster(&db, "budaye", 10);
        let healthy = shake_check(&config, &target, 1.0, 1.0, &mut rng);
        target.current_hp = 1;
        let weak = shake_check(&config, &target, 1.0, 1.0, &mut rng);
        assert!(weak > healthy);
    }

    #[test]
    fn certain_shake_always_captures() {
        let (_, config) = setup();
        let mut rng = SmallRng::seed_from_u64(9);
        let threshold = f64::from(config.capture.shake_divisor);
        assert_eq!(capture(&config, threshold, &mut rng), (true, 4));
    }

    #[test]
    fn escape_methods() {
        let (db, _) = setup();
        let user = make_monster(&db, "rockitten", 10);
        let target = make_monster(&db, "budaye", 10);
        let mut rng = SmallRng::seed_from_u64(5);
        assert!(attempt_escape(EscapeMethod::Always, &user, &target, 0, &mut rng));
        assert!(!attempt_escape(EscapeMethod::Never, &user, &target, 0, &mut rng));
        assert!((default_escape_chance(&user, &target, 2) - 0.7).abs() < 1e-9);
        assert!("sideways".parse::<EscapeMethod>().is_err());
    }

    #[test]
    fn modify_stat_survives_recalculation() {
        let (db, _) = setup();
        let mut monster = make_monster(&db, "rockitten", 10);
        monster.taste_warm = Taste::tasteless(TasteType::Warm);
        monster.taste_cold = Taste::tasteless(TasteType::Cold);
        monster.set_stats();
        let before = monster.stats.speed;
        modify_stat(&mut monster, StatType::Speed, 10.0, StatOp::Add);
        assert_eq!(monster.stats.speed, before + 10);
        monster.set_stats();
        assert_eq!(monster.stats.speed, before + 10);
    }

    #[test]
    fn experience_split_by_hits() {
        let (db, _) = setup();
        let loser = make_monster(&db, "budaye", 10);
        assert_eq!(experience_reward(&loser, 1, 1.0), 100);
        assert_eq!(experience_reward(&loser, 2, 1.0), 50);
        assert_eq!(experience_reward(&loser, 2, 1.5), 75);
    }
}
