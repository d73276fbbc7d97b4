use super::{EffectEnv, EffectResult, Invocation, Objective};
use crate::error::{CombatError, CombatResult};
use crate::sim::damage::{simple_damage_calculate, simple_heal};
use crate::sim::modifier::weakest_link;
use crate::sim::monster::Monster;
use tracing::debug;

/// Extra damage factors: the technique's own modifiers against the target
/// and every status the user carries.
fn damage_factors(call: &Invocation<'_>, user: &Monster, target: &Monster) -> Vec<f64> {
    let mut factors = Vec::new();
    if let Some(tech) = call.method.technique() {
        if !tech.modifiers.is_empty() {
            factors.push(tech.aggregation.apply(&tech.modifiers, target));
        }
    }
    for status in &user.status {
        if !status.modifiers.is_empty() {
            factors.push(weakest_link(&status.modifiers, target));
        }
    }
    factors
}

pub(super) fn damage(env: &mut EffectEnv<'_>, call: &Invocation<'_>) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("damage");
    let (Some(tech), Some(user_id)) = (call.method.technique(), call.user_monster()) else {
        return Ok(result);
    };
    let (Some(user), Some(target)) = (env.ctx.monster(user_id), env.ctx.monster(call.target)) else {
        return Ok(result);
    };
    if !call.hits() {
        debug!(technique = %tech.slug, roll = call.hit_roll, "missed");
        return Ok(result);
    }

    let factors = damage_factors(call, user, target);
    let (amount, multiplier) = simple_damage_calculate(env.db, env.config, tech, user, target, &factors);
    if let Some(target) = env.ctx.monster_mut(call.target) {
        target.current_hp = target.current_hp.saturating_sub(amount);
    }
    env.damage.log(user_id, call.target, amount, env.turn);

    result.success = true;
    result.damage = amount;
    result.element_multiplier = multiplier;
    result.should_tackle = true;
    Ok(result)
}

/// Fixed damage equal to the technique's power. Used by riddle outcomes,
/// so no accuracy roll and no stat scaling.
pub(super) fn power_damage(
    env: &mut EffectEnv<'_>,
    call: &Invocation<'_>,
    objective: Objective,
) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("power_damage");
    let Some(tech) = call.method.technique() else {
        return Ok(result);
    };
    let Some(victim) = call.objective(objective) else {
        return Ok(result);
    };
    let amount = tech.power.max(0.0) as u32;
    let Some(monster) = env.ctx.monster_mut(victim) else {
        return Ok(result);
    };
    monster.current_hp = monster.current_hp.saturating_sub(amount);
    if let Some(user_id) = call.user_monster() {
        if user_id != victim {
            env.damage.log(user_id, victim, amount, env.turn);
        }
    }
    result.success = true;
    result.damage = amount;
    result.should_tackle = amount > 0;
    Ok(result)
}

pub(super) fn healing(
    env: &mut EffectEnv<'_>,
    call: &Invocation<'_>,
    objective: Objective,
) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("healing");
    let Some(tech) = call.method.technique() else {
        return Ok(result);
    };
    let Some(patient) = call.objective(objective) else {
        return Ok(result);
    };
    let Some(monster) = env.ctx.monster_mut(patient) else {
        return Ok(result);
    };
    if monster.missing_hp() == 0 {
        result.extras.push("combat_full_health".to_string());
        return Ok(result);
    }
    if !call.hits() {
        return Ok(result);
    }
    let amount = simple_heal(tech, monster, &[]).min(monster.missing_hp());
    monster.current_hp += amount;
    result.success = amount > 0;
    Ok(result)
}

/// The user gives up its life: the target takes a share of the user's
/// current HP and the user faints.
pub(super) fn sacrifice(
    env: &mut EffectEnv<'_>,
    call: &Invocation<'_>,
    multiplier: f64,
) -> CombatResult<EffectResult> {
    if !(0.0..=1.0).contains(&multiplier) {
        return Err(CombatError::InvalidValue(format!(
            "sacrifice multiplier {multiplier} must be within 0..=1"
        )));
    }
    let mut result = EffectResult::new("sacrifice");
    let Some(user_id) = call.user_monster() else {
        return Ok(result);
    };
    if !call.hits() {
        return Ok(result);
    }
    let Some(user) = env.ctx.monster_mut(user_id) else {
        return Ok(result);
    };
    let amount = (f64::from(user.current_hp) * multiplier) as u32;
    user.faint();
    if let Some(target) = env.ctx.monster_mut(call.target) {
        target.current_hp = target.current_hp.saturating_sub(amount);
        env.damage.log(user_id, call.target, amount, env.turn);
    }
    result.success = true;
    result.damage = amount;
    result.should_tackle = true;
    Ok(result)
}
