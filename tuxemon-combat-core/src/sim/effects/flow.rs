use super::{EffectEnv, EffectResult, Invocation};
use crate::error::{CombatError, CombatResult};
use crate::sim::context::CombatType;
use crate::sim::damage::{attempt_escape, capture as roll_capture, shake_check, EscapeMethod};
use crate::sim::queue::Actor;
use tracing::{info, warn};

pub(super) fn experience(
    env: &mut EffectEnv<'_>,
    call: &Invocation<'_>,
    amount: Option<u64>,
) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("experience");
    let Some(amount) = amount.or(call.riddle_reward) else {
        return Ok(result);
    };
    let Some(user) = call.user_monster().and_then(|id| env.ctx.monster_mut(id)) else {
        return Ok(result);
    };
    let levels = user.give_experience(amount);
    if levels > 0 {
        result.extras.push("combat_level_up".to_string());
    }
    result.success = amount > 0;
    Ok(result)
}

pub(super) fn foresight(call: &Invocation<'_>, turns: u32) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("foresight");
    if turns == 0 {
        return Err(CombatError::InvalidValue("foresight needs at least one turn".to_string()));
    }
    if call.method.technique().is_none() {
        return Ok(result);
    }
    result.success = true;
    result.scheduled_in = Some(turns);
    Ok(result)
}

pub(super) fn capture(env: &mut EffectEnv<'_>, call: &Invocation<'_>) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("capture");
    let Some(item) = call.method.item() else {
        return Ok(result);
    };
    if env.ctx.combat_type() != CombatType::Wild {
        result.extras.push("combat_cant_capture".to_string());
        return Ok(result);
    }
    let captor = match call.user {
        Actor::Trainer(team) => Some(team),
        Actor::Monster(id) => env.ctx.team_of(id),
    };
    let Some(captor) = captor else {
        return Ok(result);
    };
    let Some(target) = env.ctx.monster(call.target) else {
        return Ok(result);
    };
    if env.ctx.team_of(call.target) == Some(captor) {
        return Err(CombatError::InvalidValue(
            "cannot capture a monster from the user's own team".to_string(),
        ));
    }

    let status_modifier = item.status_modifier(env.config.capture.status_modifier, target);
    let capdev_modifier = item.capture_modifier * env.config.capture.capdev_modifier;
    let threshold = shake_check(env.config, target, status_modifier, capdev_modifier, env.rng);
    let (caught, shakes) = roll_capture(env.config, threshold, env.rng);
    result.num_shakes = shakes;
    if !caught {
        return Ok(result);
    }

    let Some(mut monster) = env.ctx.remove_monster(call.target) else {
        return Ok(result);
    };
    if let Some(npc) = env.ctx.team_mut(captor) {
        monster.wild = false;
        monster.owner = Some(npc.slug.clone());
        info!(monster = %monster.name, captor = %npc.slug, shakes, "captured");
        npc.add_monster(monster);
    }
    result.success = true;
    result.captured = Some(call.target);
    Ok(result)
}

pub(super) fn run(env: &mut EffectEnv<'_>, call: &Invocation<'_>) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("run");
    if env.ctx.combat_type() == CombatType::Trainer {
        result.extras.push("combat_can't_run_from_trainer".to_string());
        return Ok(result);
    }
    let Some(user_id) = call.user_monster() else {
        return Ok(result);
    };
    let Some(team) = env.ctx.team_of(user_id) else {
        return Ok(result);
    };
    let (Some(user), Some(target)) = (env.ctx.monster(user_id), env.ctx.monster(call.target)) else {
        return Ok(result);
    };
    let Some(npc) = env.ctx.team(team) else {
        return Ok(result);
    };
    let configured = if npc.is_ai() {
        &env.config.escape_method_ai
    } else {
        &env.config.escape_method
    };
    let method = configured.parse::<EscapeMethod>().unwrap_or_else(|err| {
        warn!(%err, "falling back to default escape");
        EscapeMethod::Default
    });
    let escaped = attempt_escape(method, user, target, npc.run_attempts, env.rng);
    if let Some(npc) = env.ctx.team_mut(team) {
        npc.run_attempts = npc.run_attempts.saturating_add(1);
    }
    result.success = escaped;
    result.escaped = escaped;
    if !escaped {
        result.extras.push("combat_player_run_fail".to_string());
    }
    Ok(result)
}

/// Every monster of the user's party faints; the battle is lost.
pub(super) fn forfeit(env: &mut EffectEnv<'_>, call: &Invocation<'_>) -> CombatResult<EffectResult> {
    let mut result = EffectResult::new("forfeit");
    let team = match call.user {
        Actor::Trainer(team) => Some(team),
        Actor::Monster(id) => env.ctx.team_of(id),
    };
    let Some(npc) = team.and_then(|team| env.ctx.team_mut(team)) else {
        return Ok(result);
    };
    for monster in &mut npc.monsters {
        monster.faint();
    }
    info!(npc = %npc.slug, "forfeited");
    result.success = true;
    result.extras.push("combat_forfeit".to_string());
    Ok(result)
}
