use super::{EffectEnv, EffectPhase, EffectResult, Invocation, Objective, StatChange};
use crate::error::CombatResult;
use crate::sim::damage::simple_lifeleech;
use crate::sim::modifier::weakest_link;
use crate::sim::new_instance_id;
use crate::sim::stats::StatType;
use crate::sim::technique::SKIP;
use rand::Rng;
use tracing::{debug, info};

const ALL_STATUSES: &str = "all";

/// Potency and accuracy both have to beat this round's rolls.
fn lands(env: &mut EffectEnv<'_>, call: &Invocation<'_>) -> bool {
    let potency_roll: f64 = env.rng.gen();
    call.method.potency() >= potency_roll && call.hits()
}

pub(super) fn give(
    env: &mut EffectEnv<'_>,
    call: &Invocation<'_>,
    slug: &str,
    objective: Objective,
) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("give");
    let Some(receiver) = call.objective(objective) else {
        return Ok(result);
    };
    if env.ctx.monster(receiver).is_none() || !lands(env, call) {
        return Ok(result);
    }
    let mut status = env.db.lookup_status(slug)?;
    status.link = call.user_monster();
    status.instance_id = new_instance_id(env.rng);
    if let Some(monster) = env.ctx.monster_mut(receiver) {
        monster.apply_status(status);
        result.success = monster.has_status(slug);
    }
    if result.success {
        result.statuses.push(slug.to_string());
    }
    Ok(result)
}

pub(super) fn remove(
    env: &mut EffectEnv<'_>,
    call: &Invocation<'_>,
    slug: &str,
    objective: Objective,
) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("remove");
    let Some(receiver) = call.objective(objective) else {
        return Ok(result);
    };
    if env.ctx.monster(receiver).is_none() || !lands(env, call) {
        return Ok(result);
    }
    if let Some(monster) = env.ctx.monster_mut(receiver) {
        let before = monster.status.len();
        if slug == ALL_STATUSES {
            monster.clear_status();
        } else {
            monster.status.retain(|status| status.slug != slug);
        }
        result.success = monster.status.len() < before;
    }
    Ok(result)
}

/// Temporary stat changes on the status host. Values never drop below 1;
/// `set_stats` at the end of combat restores the real numbers.
pub(super) fn stat_change(
    env: &mut EffectEnv<'_>,
    call: &Invocation<'_>,
    changes: &[StatChange],
) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("statchange");
    if call.phase != EffectPhase::PerformStatus {
        return Ok(result);
    }
    for change in changes {
        let mut value = change.value;
        if change.max_deviation > 0 {
            let deviation = f64::from(change.max_deviation);
            value = env.rng.gen_range((value - deviation)..=(value + deviation)).round();
        }
        let Some(host) = env.ctx.monster_mut(call.target) else {
            return Ok(result);
        };
        if change.stat == StatType::Hp {
            if change.override_to_full {
                host.current_hp = host.hp();
            } else {
                let updated = change.operation.apply(f64::from(host.current_hp), value).max(1.0);
                host.current_hp = (updated as u32).min(host.hp());
            }
        } else {
            let updated = change
                .operation
                .apply(f64::from(host.stats.get(change.stat)), value)
                .max(1.0);
            host.stats.set(change.stat, updated as u32);
        }
        debug!(
            monster = %host.name,
            stat = change.stat.as_str(),
            "stat changed by {}",
            call.method.slug()
        );
        result.success = true;
    }
    Ok(result)
}

pub(super) fn buff(
    env: &mut EffectEnv<'_>,
    call: &Invocation<'_>,
    stat: StatType,
    percentage: f64,
) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("buff");
    let Some(monster) = env.ctx.monster_mut(call.target) else {
        return Ok(result);
    };
    let current = monster.stats.get(stat);
    let bonus = (f64::from(current) * percentage) as i64;
    let updated = (i64::from(current) + bonus).max(1) as u32;
    monster.stats.set(stat, updated);
    if stat == StatType::Hp {
        monster.current_hp = monster.current_hp.min(updated);
    }
    result.success = bonus != 0;
    Ok(result)
}

/// Heal the host each status turn; the status wears off at full HP.
pub(super) fn recover(env: &mut EffectEnv<'_>, call: &Invocation<'_>, divisor: u32) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("recover");
    let slug = call.method.slug().to_string();
    let Some(host) = env.ctx.monster_mut(call.target) else {
        return Ok(result);
    };
    match call.phase {
        EffectPhase::PerformStatus => {
            let heal = (host.hp() / divisor.max(1)).min(host.missing_hp());
            host.current_hp += heal;
            result.success = heal > 0;
        }
        EffectPhase::CheckPartyHp if host.current_hp >= host.hp() => {
            host.status.retain(|status| status.slug != slug);
            result.extras.push("combat_state_recover_failure".to_string());
        }
        _ => {}
    }
    Ok(result)
}

/// Drain HP from the host towards the monster that inflicted the status.
pub(super) fn lifeleech(env: &mut EffectEnv<'_>, call: &Invocation<'_>, divisor: u32) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("lifeleech");
    let Some(status) = call.method.status() else {
        return Ok(result);
    };
    let link_alive = status
        .link
        .and_then(|id| env.ctx.monster(id))
        .map(|link| !link.is_fainted())
        .unwrap_or(false);
    if !link_alive {
        if let Some(host) = env.ctx.monster_mut(call.target) {
            host.status.retain(|existing| existing.slug != status.slug);
        }
        return Ok(result);
    }
    if call.phase != EffectPhase::PerformStatus {
        return Ok(result);
    }
    let Some(link_id) = status.link else {
        return Ok(result);
    };
    let (Some(link), Some(host)) = (env.ctx.monster(link_id), env.ctx.monster(call.target)) else {
        return Ok(result);
    };
    let amount = simple_lifeleech(link, host, divisor);
    if let Some(host) = env.ctx.monster_mut(call.target) {
        host.current_hp = host.current_hp.saturating_sub(amount);
    }
    if let Some(link) = env.ctx.monster_mut(link_id) {
        link.current_hp = (link.current_hp + amount).min(link.hp());
    }
    env.damage.log(link_id, call.target, amount, env.turn);
    result.success = true;
    result.damage = amount;
    Ok(result)
}

pub(super) fn poisoned(env: &mut EffectEnv<'_>, call: &Invocation<'_>, divisor: u32) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("poisoned");
    if call.phase != EffectPhase::PerformStatus {
        return Ok(result);
    }
    let Some(status) = call.method.status() else {
        return Ok(result);
    };
    let Some(host) = env.ctx.monster_mut(call.target) else {
        return Ok(result);
    };
    let amount = f64::from(host.hp()) / f64::from(divisor.max(1)) * weakest_link(&status.modifiers, host);
    if amount > 0.0 {
        let amount = amount as u32;
        host.current_hp = host.current_hp.saturating_sub(amount);
        result.damage = amount;
        result.success = true;
    } else {
        host.clear_status();
        result.extras.push("combat_state_immune".to_string());
    }
    Ok(result)
}

/// Dozing monsters skip their turn. After each skipped turn they may wake
/// up; they always do once the duration has passed.
pub(super) fn nodding_off(env: &mut EffectEnv<'_>, call: &Invocation<'_>, chance: f64) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("noddingoff");
    let Some(status) = call.method.status() else {
        return Ok(result);
    };
    match call.phase {
        EffectPhase::PreChecking => {
            result.replacement = Some(SKIP.to_string());
            result.success = true;
        }
        EffectPhase::PerformTech => {
            let roll: f64 = env.rng.gen();
            let wakes = (status.duration >= status.nr_turn && status.nr_turn > 0 && roll > chance)
                || status.nr_turn > status.duration;
            if wakes {
                if let Some(host) = env.ctx.monster_mut(call.target) {
                    info!(monster = %host.name, "woke up");
                    host.clear_status();
                }
                result.extras.push("combat_state_dozing_end".to_string());
                result.success = true;
            }
        }
        _ => {}
    }
    Ok(result)
}
