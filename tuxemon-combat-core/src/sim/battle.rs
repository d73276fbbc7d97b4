//! Turn resolution: the phase machine that fills the field, collects one
//! action per monster, orders and executes them and decides the match.
//!
//! The state advances only through [`CombatState::update`]. Human input
//! arrives through [`CombatState::submit_action`],
//! [`CombatState::begin_riddle`] / [`CombatState::riddle_input`] and
//! [`CombatState::choose_replacement`].

use crate::battle_logger::{CombatEvent, CombatLog};
use crate::error::{CombatError, CombatResult};
use crate::i18n::{translate_item, translate_technique};
use crate::npc::{AiKind, Controller};
use crate::records::{Battle, BattleOutcome};
use crate::riddle::{riddle_technique, RiddleAI, RiddleAnswerState, RiddleInput, RiddleTurn};
use crate::session::Session;
use crate::sim::ai::{AiView, BattleAI, Decision, RandomAI, TechniqueAI, TechniqueWeights};
use crate::sim::context::{CombatContext, CombatType};
use crate::sim::damage::speed_monster;
use crate::sim::damage_tracker::DamageTracker;
use crate::sim::effects::{apply_effects, Effect, EffectEnv, EffectPhase, EffectResult, Invocation};
use crate::sim::faint_handler::award_experience;
use crate::sim::item::Item;
use crate::sim::new_instance_id;
use crate::sim::queue::{ActionMethod, ActionQueue, Actor, EnqueuedAction};
use crate::sim::status::{Status, FAINT};
use crate::sim::switching::{can_switch_in, get_awake_monsters, positions_available};
use crate::sim::technique::{Range, TechSort, Technique, FORFEIT, RUN, SKIP};
use crate::ui::{HeadlessUi, UiHost, COMBAT_MESSAGE, MAIN_COMBAT_MENU, MONSTER_MENU, RIDDLE_ANSWER};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const USED_X: &str = "combat_used_x";
const META_SORT: &str = "meta";
const POTION_SORT: &str = "potion";
/// Ordering speed of a trainer using an item.
const TRAINER_SPEED: i64 = 10;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CombatPhase {
    Begin,
    RoundStart,
    CollectActions,
    OrderActions,
    Execute,
    PostAction,
    CheckVictory,
    BattleEnd,
}

impl CombatPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            CombatPhase::Begin => "begin",
            CombatPhase::RoundStart => "round_start",
            CombatPhase::CollectActions => "collect_actions",
            CombatPhase::OrderActions => "order_actions",
            CombatPhase::Execute => "execute",
            CombatPhase::PostAction => "post_action",
            CombatPhase::CheckVictory => "check_victory",
            CombatPhase::BattleEnd => "battle_end",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Winner(usize),
    Draw,
    /// The team escaped a wild battle.
    RanAway(usize),
}

struct PendingRiddle {
    monster: Uuid,
    team: usize,
    state: RiddleAnswerState,
}

fn ai_for(controller: Controller, session: &Session) -> Option<Box<dyn BattleAI>> {
    match controller {
        Controller::Human => None,
        Controller::Ai(AiKind::Technique) => Some(Box::new(TechniqueAI::new(TechniqueWeights::default()))),
        Controller::Ai(AiKind::Random) => Some(Box::new(RandomAI)),
        Controller::Ai(AiKind::Riddle) => Some(Box::new(RiddleAI::new(&session.config().riddle))),
    }
}

pub struct CombatState<'s, U: UiHost = HeadlessUi> {
    session: &'s Session,
    ctx: CombatContext,
    ui: U,
    rng: SmallRng,
    phase: CombatPhase,
    turn: u32,
    /// Seconds spent in the current phase.
    elapsed: f32,
    /// Seconds left before the next action may run.
    wait: f32,
    queue: ActionQueue,
    damage: DamageTracker,
    log: CombatLog,
    ais: Vec<Option<Box<dyn BattleAI>>>,
    in_play: Vec<Vec<Uuid>>,
    /// Human monsters that still owe an action this round, menu order.
    deciding: Vec<Uuid>,
    decided: HashSet<Uuid>,
    awaiting_replacement: Vec<usize>,
    hit_rolls: HashMap<Uuid, f64>,
    riddle: Option<PendingRiddle>,
    run_team: Option<usize>,
    outcome: Option<MatchOutcome>,
}

impl<'s, U: UiHost> CombatState<'s, U> {
    pub fn new(session: &'s Session, ctx: CombatContext, ui: U, seed: u64) -> Self {
        let ais = ctx
            .teams()
            .iter()
            .map(|npc| ai_for(npc.controller, session))
            .collect();
        let team_count = ctx.team_count();
        let mut state = Self {
            session,
            log: CombatLog::new(ctx.graphics()),
            ctx,
            ui,
            rng: SmallRng::seed_from_u64(seed),
            phase: CombatPhase::Begin,
            turn: 0,
            elapsed: 0.0,
            wait: 0.0,
            queue: ActionQueue::new(),
            damage: DamageTracker::new(),
            ais,
            in_play: vec![Vec::new(); team_count],
            deciding: Vec::new(),
            decided: HashSet::new(),
            awaiting_replacement: Vec::new(),
            hit_rolls: HashMap::new(),
            riddle: None,
            run_team: None,
            outcome: None,
        };
        state.announce_start();
        state
    }

    /// Replace the AI driving `team`. The team becomes AI-controlled.
    pub fn with_ai(mut self, team: usize, ai: Box<dyn BattleAI>) -> Self {
        if let Some(slot) = self.ais.get_mut(team) {
            *slot = Some(ai);
        }
        self
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn is_finished(&self) -> bool {
        self.phase == CombatPhase::BattleEnd
    }

    pub fn log(&self) -> &CombatLog {
        &self.log
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn context(&self) -> &CombatContext {
        &self.ctx
    }

    pub fn into_context(self) -> CombatContext {
        self.ctx
    }

    pub fn queue(&self) -> &ActionQueue {
        &self.queue
    }

    pub fn in_play(&self, team: usize) -> &[Uuid] {
        self.in_play.get(team).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Human monsters still waiting for an action, first one is on screen.
    pub fn deciding(&self) -> &[Uuid] {
        &self.deciding
    }

    pub fn awaiting_replacement(&self) -> &[usize] {
        &self.awaiting_replacement
    }

    pub fn riddle(&self) -> Option<&RiddleAnswerState> {
        self.riddle.as_ref().map(|pending| &pending.state)
    }

    /// True while the battle cannot progress without player input.
    pub fn awaiting_input(&self) -> bool {
        !self.is_finished()
            && (!self.deciding.is_empty() || self.riddle.is_some() || !self.awaiting_replacement.is_empty())
    }

    /// Whether the opponents of `team` can still fight.
    pub fn enemy_has_conscious_monsters(&self, team: usize) -> bool {
        self.ctx.has_conscious_monsters(self.ctx.opponent_of(team))
    }

    /// Advance the battle by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.elapsed += dt;
        if let Some(pending) = self.riddle.as_mut() {
            pending.state.update(dt);
        }
        self.resolve_riddle();
        if self.wait > 0.0 {
            self.wait -= dt;
            if self.wait > 0.0 {
                return;
            }
            self.wait = 0.0;
        }
        while self.wait <= 0.0 && self.tick() {}
    }

    fn tick(&mut self) -> bool {
        let progressed = self.update_phase();
        if self.wait > 0.0 {
            return false;
        }
        match self.determine_phase() {
            Some(next) => {
                self.transition_phase(next);
                true
            }
            None => progressed,
        }
    }

    fn update_phase(&mut self) -> bool {
        match self.phase {
            CombatPhase::Execute | CombatPhase::PostAction => self.execute_next(),
            _ => false,
        }
    }

    fn determine_phase(&self) -> Option<CombatPhase> {
        match self.phase {
            CombatPhase::Begin => {
                (self.elapsed >= self.session.config().begin_delay).then_some(CombatPhase::RoundStart)
            }
            CombatPhase::RoundStart => {
                if self.battle_decided() {
                    Some(CombatPhase::CheckVictory)
                } else if self.awaiting_replacement.is_empty() {
                    Some(CombatPhase::CollectActions)
                } else {
                    None
                }
            }
            CombatPhase::CollectActions => {
                (self.deciding.is_empty() && self.riddle.is_none()).then_some(CombatPhase::OrderActions)
            }
            CombatPhase::OrderActions => Some(CombatPhase::Execute),
            CombatPhase::Execute => {
                if self.battle_decided() {
                    Some(CombatPhase::CheckVictory)
                } else if self.queue.is_empty() {
                    Some(CombatPhase::PostAction)
                } else {
                    None
                }
            }
            CombatPhase::PostAction => {
                (self.battle_decided() || self.queue.is_empty()).then_some(CombatPhase::CheckVictory)
            }
            CombatPhase::CheckVictory => Some(if self.outcome.is_some() {
                CombatPhase::BattleEnd
            } else {
                CombatPhase::RoundStart
            }),
            CombatPhase::BattleEnd => None,
        }
    }

    fn transition_phase(&mut self, phase: CombatPhase) {
        debug!(from = self.phase.as_str(), to = phase.as_str(), turn = self.turn, "combat phase");
        self.phase = phase;
        self.elapsed = 0.0;
        match phase {
            CombatPhase::Begin | CombatPhase::Execute => {}
            CombatPhase::RoundStart => self.start_round(),
            CombatPhase::CollectActions => self.collect_actions(),
            CombatPhase::OrderActions => self.order_actions(),
            CombatPhase::PostAction => self.queue_status_actions(),
            CombatPhase::CheckVictory => {
                self.queue.clear_queue();
                self.outcome = self.check_victory();
            }
            CombatPhase::BattleEnd => self.end_combat(),
        }
    }

    fn live_teams(&self) -> Vec<usize> {
        (0..self.ctx.team_count())
            .filter(|team| self.ctx.has_conscious_monsters(*team))
            .collect()
    }

    fn battle_decided(&self) -> bool {
        self.run_team.is_some() || self.live_teams().len() < 2
    }

    fn check_victory(&self) -> Option<MatchOutcome> {
        if let Some(team) = self.run_team {
            return Some(MatchOutcome::RanAway(team));
        }
        let live = self.live_teams();
        match live.as_slice() {
            [] => Some(MatchOutcome::Draw),
            [winner] => Some(MatchOutcome::Winner(*winner)),
            _ if self.turn >= self.session.config().max_turns => {
                warn!(turns = self.turn, "turn limit reached, calling a draw");
                Some(MatchOutcome::Draw)
            }
            _ => None,
        }
    }

    fn is_in_play(&self, monster: Uuid) -> bool {
        self.in_play.iter().any(|team| team.contains(&monster))
    }

    fn opponents_in_play(&self, team: usize) -> Vec<Uuid> {
        let opponent = self.ctx.opponent_of(team);
        self.in_play(opponent)
            .iter()
            .copied()
            .filter(|id| self.ctx.monster(*id).is_some_and(|monster| !monster.is_fainted()))
            .collect()
    }

    fn name_of(&self, monster: Uuid) -> String {
        self.ctx
            .monster(monster)
            .map(|monster| monster.name.clone())
            .unwrap_or_default()
    }

    fn announce(&mut self, key: &str, params: Vec<(&'static str, String)>) -> usize {
        self.announce_hit(key, params, 0, 1.0)
    }

    fn announce_hit(&mut self, key: &str, params: Vec<(&'static str, String)>, damage: u32, multiplier: f64) -> usize {
        let text = self.session.translator().format(key, &params);
        let length = text.chars().count();
        let mut event = CombatEvent::new(self.turn, key, text);
        event.params = params
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        event.damage = damage;
        event.element_multiplier = multiplier;
        self.log.push_event(event);
        length
    }

    fn announce_start(&mut self) {
        let opponent = self.ctx.opponent_of(0);
        let Some(npc) = self.ctx.team(opponent) else {
            return;
        };
        let (key, name) = if npc.is_ai() && self.ctx.combat_type() == CombatType::Wild {
            let name = npc.monsters.first().map(|monster| monster.name.clone()).unwrap_or_default();
            ("combat_wild_appeared", name)
        } else {
            ("combat_trainer_appeared", npc.name.clone())
        };
        info!(
            combat_type = ?self.ctx.combat_type(),
            mode = ?self.ctx.battle_mode(),
            teams = self.ctx.team_count(),
            "battle started"
        );
        self.announce(key, vec![("name", name)]);
    }

    fn start_round(&mut self) {
        self.turn += 1;
        self.log.log_turn(self.turn);
        self.decided.clear();
        self.hit_rolls.clear();
        for team in 0..self.ctx.team_count() {
            self.fill_positions(team);
        }
    }

    fn fill_positions(&mut self, team: usize) {
        let ctx = &self.ctx;
        self.in_play[team].retain(|id| {
            ctx.team_of(*id) == Some(team) && ctx.monster(*id).is_some_and(|monster| !monster.is_fainted())
        });
        let Some(npc) = self.ctx.team(team) else {
            return;
        };
        let open = positions_available(self.ctx.battle_mode(), npc, &self.in_play[team]);
        if open == 0 {
            return;
        }
        if npc.is_ai() || self.turn == 1 {
            let awake = get_awake_monsters(npc, &self.in_play[team]);
            for monster in awake.into_iter().take(open) {
                self.send_out(team, monster);
            }
        } else if !self.awaiting_replacement.contains(&team) {
            let candidates: Vec<String> = get_awake_monsters(npc, &self.in_play[team])
                .iter()
                .map(Uuid::to_string)
                .collect();
            self.awaiting_replacement.push(team);
            self.ui.push_state(
                MONSTER_MENU,
                json!({ "team": team, "open": open, "candidates": candidates }),
            );
        }
    }

    fn send_out(&mut self, team: usize, monster: Uuid) {
        self.in_play[team].push(monster);
        if let Some(entry) = self.ctx.monster(monster) {
            let (name, hp, max) = (entry.name.clone(), entry.current_hp, entry.hp());
            self.log.log_switch(team, &name, hp, max);
            self.announce("combat_call_tuxemon", vec![("name", name)]);
        }
    }

    /// Send `monster` into an open position of a human `team`.
    pub fn choose_replacement(&mut self, team: usize, monster: Uuid) -> CombatResult<()> {
        if !self.awaiting_replacement.contains(&team) {
            return Err(CombatError::InvalidValue(format!("team {team} has no open position")));
        }
        let npc = self
            .ctx
            .team(team)
            .ok_or_else(|| CombatError::InvalidContext(format!("no team {team}")))?;
        if self.ctx.monster(monster).is_none() {
            return Err(CombatError::UnknownMonster(monster));
        }
        if !can_switch_in(npc, &self.in_play[team], monster) {
            return Err(CombatError::InvalidValue(format!(
                "{} cannot be sent out",
                self.name_of(monster)
            )));
        }
        self.send_out(team, monster);
        let npc = self
            .ctx
            .team(team)
            .ok_or_else(|| CombatError::InvalidContext(format!("no team {team}")))?;
        if positions_available(self.ctx.battle_mode(), npc, &self.in_play[team]) == 0 {
            self.awaiting_replacement.retain(|waiting| *waiting != team);
            self.ui.pop_state();
        }
        Ok(())
    }

    fn collect_actions(&mut self) {
        self.deciding.clear();
        for team in 0..self.ctx.team_count() {
            let fielded = self.in_play[team].clone();
            for id in fielded {
                let Some(monster) = self.ctx.monster_mut(id) else {
                    continue;
                };
                if monster.is_fainted() {
                    continue;
                }
                for tech in &mut monster.moves {
                    tech.recharge(1);
                }
                let roll: f64 = self.rng.gen();
                self.hit_rolls.insert(id, roll);
                if self.ais[team].is_some() {
                    self.decide_for(team, id);
                } else {
                    self.deciding.push(id);
                }
            }
        }
        self.show_menu();
    }

    fn show_menu(&mut self) {
        if let Some(&monster) = self.deciding.first() {
            let Some(entry) = self.ctx.monster(monster) else {
                return;
            };
            let moves: Vec<&str> = entry.moves.iter().map(|tech| tech.slug.as_str()).collect();
            let params = json!({
                "monster": monster.to_string(),
                "name": entry.name,
                "moves": moves,
            });
            self.ui.push_state(MAIN_COMBAT_MENU, params);
        }
    }

    fn decide_for(&mut self, team: usize, id: Uuid) {
        let opponents = self.opponents_in_play(team);
        let decision = {
            let Some(monster) = self.ctx.monster(id) else {
                return;
            };
            let view = AiView {
                ctx: &self.ctx,
                monster,
                team,
                opponents,
                riddles: self.session.riddles(),
                db: self.session.db(),
                config: self.session.config(),
                turn: self.turn,
            };
            match self.ais.get_mut(team).and_then(Option::as_mut) {
                Some(ai) => ai.choose_action(&view, &mut self.rng),
                None => return,
            }
        };
        if let Err(err) = self.enqueue_decision(team, id, decision) {
            warn!(%err, monster = %self.name_of(id), "AI decision rejected, skipping");
            if let Err(err) = self.enqueue_decision(team, id, Decision::Skip) {
                error!(%err, "could not queue a skip");
            }
        }
    }

    /// Human `monster` acts this round. Fails if it already decided, is not
    /// on the field, or the decision is not possible.
    pub fn submit_action(&mut self, monster: Uuid, decision: Decision) -> CombatResult<()> {
        if self.ctx.monster(monster).is_none() {
            return Err(CombatError::UnknownMonster(monster));
        }
        if self.decided.contains(&monster) {
            return Err(CombatError::AlreadyDecided(monster));
        }
        if self.phase != CombatPhase::CollectActions || !self.deciding.contains(&monster) {
            return Err(CombatError::NotDeciding(monster));
        }
        let team = self
            .ctx
            .team_of(monster)
            .ok_or(CombatError::UnknownMonster(monster))?;
        self.enqueue_decision(team, monster, decision)?;
        self.finish_decision(monster);
        Ok(())
    }

    fn finish_decision(&mut self, monster: Uuid) {
        let shown = self.deciding.first() == Some(&monster);
        self.deciding.retain(|id| *id != monster);
        if shown && self.ui.get_state_by_name(MAIN_COMBAT_MENU).is_some() {
            self.ui.pop_state();
            self.show_menu();
        }
    }

    fn enqueue_decision(&mut self, team: usize, monster: Uuid, decision: Decision) -> CombatResult<()> {
        let db = self.session.db();
        let user = Actor::Monster(monster);
        let mut reward = None;
        let (actor, method, target) = match decision {
            Decision::Technique { index, target } => {
                let entry = self.ctx.monster(monster).ok_or(CombatError::UnknownMonster(monster))?;
                let tech = entry.moves.get(index).ok_or(CombatError::UnknownTechnique {
                    index,
                    len: entry.moves.len(),
                })?;
                if tech.is_recharging() {
                    return Err(CombatError::InvalidValue(format!(
                        "{} is recharging for {} more rounds",
                        tech.slug, tech.next_use
                    )));
                }
                let victim = self.ctx.monster(target).ok_or(CombatError::UnknownMonster(target))?;
                if !tech.validate_monster(victim) {
                    return Err(CombatError::ConditionNotMet {
                        method: tech.slug.clone(),
                        target,
                    });
                }
                (user, ActionMethod::Technique(tech.clone()), target)
            }
            Decision::Riddle(RiddleTurn { riddle, correct, target }) => {
                let tech = riddle_technique(db, &self.session.config().riddle, &riddle, correct)?;
                let name = self.name_of(monster);
                self.log.log_riddle(&name, &riddle.slug, correct);
                reward = correct.then_some(riddle.experience_reward);
                (user, ActionMethod::Technique(tech), target)
            }
            Decision::Item { slug, target } => {
                let npc = self
                    .ctx
                    .team(team)
                    .ok_or_else(|| CombatError::InvalidContext(format!("no team {team}")))?;
                if npc.item_quantity(&slug) == 0 {
                    return Err(CombatError::InvalidValue(format!("{} has no {slug} left", npc.name)));
                }
                let victim = self.ctx.monster(target).ok_or(CombatError::UnknownMonster(target))?;
                let item = db.lookup_item(&slug)?;
                if !item.validate_monster(victim) {
                    return Err(CombatError::ConditionNotMet { method: slug, target });
                }
                (Actor::Trainer(team), ActionMethod::Item(item), target)
            }
            Decision::Skip => (user, ActionMethod::Technique(db.lookup_technique(SKIP)?), monster),
            Decision::Run => {
                let target = self.opponents_in_play(team).first().copied().unwrap_or(monster);
                (user, ActionMethod::Technique(db.lookup_technique(RUN)?), target)
            }
            Decision::Forfeit => (user, ActionMethod::Technique(db.lookup_technique(FORFEIT)?), monster),
        };

        let mut action = EnqueuedAction::new(actor, method, target, self.turn);
        action.riddle_reward = reward;
        if let ActionMethod::Technique(_) = action.method {
            if let Some(replacement) = self.pre_check(monster) {
                debug!(monster = %self.name_of(monster), replacement = %replacement, "action replaced by status");
                action.method = ActionMethod::Technique(db.lookup_technique(&replacement)?);
                action.target = monster;
                action.riddle_reward = None;
            }
        }
        self.queue.enqueue(action);
        self.decided.insert(monster);
        Ok(())
    }

    /// Technique slug the monster's status forces instead of its choice.
    fn pre_check(&mut self, monster: Uuid) -> Option<String> {
        self.run_status_phase(monster, EffectPhase::PreChecking)
            .and_then(|result| result.replacement)
    }

    /// Show a riddle to human `monster` instead of the technique menu.
    pub fn begin_riddle(&mut self, monster: Uuid) -> CombatResult<()> {
        if self.decided.contains(&monster) {
            return Err(CombatError::AlreadyDecided(monster));
        }
        if self.phase != CombatPhase::CollectActions || !self.deciding.contains(&monster) {
            return Err(CombatError::NotDeciding(monster));
        }
        if self.riddle.is_some() {
            return Err(CombatError::InvalidValue("a riddle is already open".to_string()));
        }
        let team = self
            .ctx
            .team_of(monster)
            .ok_or(CombatError::UnknownMonster(monster))?;
        let entry = self.ctx.monster(monster).ok_or(CombatError::UnknownMonster(monster))?;
        let riddle = self
            .session
            .riddles()
            .get_random_riddle(None, None, Some(entry), &mut self.rng);
        let state = RiddleAnswerState::new(riddle, entry.name.clone(), &self.session.config().riddle);
        self.ui.push_state(
            RIDDLE_ANSWER,
            json!({
                "monster": monster.to_string(),
                "header": state.header(self.session.translator()),
                "question": state.riddle().question,
            }),
        );
        self.riddle = Some(PendingRiddle { monster, team, state });
        Ok(())
    }

    /// Feed a key press to the open riddle. False if nothing changed.
    pub fn riddle_input(&mut self, input: RiddleInput) -> bool {
        let Some(pending) = self.riddle.as_mut() else {
            return false;
        };
        let consumed = pending.state.process_input(input);
        self.resolve_riddle();
        consumed
    }

    fn resolve_riddle(&mut self) {
        let Some(correct) = self.riddle.as_mut().and_then(|pending| pending.state.take_verdict()) else {
            return;
        };
        let Some(pending) = self.riddle.take() else {
            return;
        };
        if self.ui.get_state_by_name(RIDDLE_ANSWER).is_some() {
            self.ui.pop_state();
        }
        let target = if correct {
            self.opponents_in_play(pending.team)
                .first()
                .copied()
                .unwrap_or(pending.monster)
        } else {
            pending.monster
        };
        let turn = RiddleTurn {
            riddle: pending.state.riddle().clone(),
            correct,
            target,
        };
        if let Err(err) = self.enqueue_decision(pending.team, pending.monster, Decision::Riddle(turn)) {
            error!(%err, "riddle outcome could not be queued");
            return;
        }
        self.finish_decision(pending.monster);
    }

    fn order_actions(&mut self) {
        let config = self.session.config();
        let ctx = &self.ctx;
        let rng = &mut self.rng;
        self.queue.sort(|action| {
            let sort = action.method.sort();
            let primary = config.sort_index(sort);
            if sort == META_SORT || sort == POTION_SORT {
                return (primary, 0);
            }
            let speed = match action.user {
                Actor::Trainer(_) => TRAINER_SPEED,
                Actor::Monster(id) => ctx
                    .monster(id)
                    .map(|monster| speed_monster(config, monster, action.method.technique(), &mut *rng))
                    .unwrap_or(0),
            };
            (primary, -speed)
        });
    }

    fn execute_next(&mut self) -> bool {
        let Some(action) = self.queue.pop_next() else {
            return false;
        };
        let message_length = if self.should_skip(&action) {
            debug!(method = action.method.slug(), "skipping action of absent monster");
            0
        } else {
            self.perform_action(&action)
        };
        self.queue.record(action);
        self.check_party_hp();
        let config = self.session.config();
        self.wait = config.action_time + config.letter_time * message_length as f32;
        true
    }

    fn should_skip(&self, action: &EnqueuedAction) -> bool {
        if let Some(user) = action.user.monster() {
            let Some(monster) = self.ctx.monster(user) else {
                return true;
            };
            if monster.is_fainted() || !self.is_in_play(user) {
                return true;
            }
            if let ActionMethod::Status(status) = &action.method {
                if !monster.has_status(&status.slug) {
                    return true;
                }
            }
        }
        !self
            .ctx
            .monster(action.target)
            .is_some_and(|target| !target.is_fainted())
    }

    fn apply(&mut self, call: &Invocation<'_>) -> CombatResult<EffectResult> {
        let mut env = EffectEnv {
            ctx: &mut self.ctx,
            db: self.session.db(),
            config: self.session.config(),
            rng: &mut self.rng,
            damage: &mut self.damage,
            turn: self.turn,
        };
        apply_effects(&mut env, call, call.method.effects())
    }

    /// Run the first status of `monster` for `phase`.
    fn run_status_phase(&mut self, monster: Uuid, phase: EffectPhase) -> Option<EffectResult> {
        let status = self.ctx.monster(monster)?.status.first()?.clone();
        if status.slug == FAINT {
            return None;
        }
        let method = ActionMethod::Status(status);
        let call = Invocation {
            method: &method,
            user: Actor::Monster(monster),
            target: monster,
            hit_roll: 0.0,
            phase,
            riddle_reward: None,
        };
        match self.apply(&call) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(%err, status = method.slug(), "status effect failed");
                None
            }
        }
    }

    /// Returns the length of the text shown for it.
    fn perform_action(&mut self, action: &EnqueuedAction) -> usize {
        let before = self.log.events().len();
        match &action.method {
            ActionMethod::Technique(tech) => self.perform_technique(action, tech),
            ActionMethod::Item(item) => self.perform_item(action, item),
            ActionMethod::Status(status) => self.perform_status(action, status),
        }
        self.log.events()[before..]
            .iter()
            .map(|event| event.text.chars().count())
            .sum()
    }

    /// Which monsters `technique` reaches when `user` aims it at `target`.
    pub fn get_targets(&self, technique: &Technique, user: Uuid, target: Uuid) -> Vec<Uuid> {
        let Some(user_team) = self.ctx.team_of(user) else {
            return Vec::new();
        };
        let target_team = self
            .ctx
            .team_of(target)
            .unwrap_or_else(|| self.ctx.opponent_of(user_team));
        let party = |team: usize| -> Vec<Uuid> {
            self.ctx
                .team(team)
                .map(|npc| npc.conscious_monsters().map(|monster| monster.instance_id).collect())
                .unwrap_or_default()
        };
        let model = technique.target;
        let mut selected = Vec::new();
        if model.enemy_monster {
            selected.push(target);
        }
        if model.enemy_team {
            selected.extend(self.in_play(target_team).iter().copied());
        }
        if model.enemy_trainer {
            selected.extend(party(target_team));
        }
        if model.own_monster {
            selected.push(user);
        }
        if model.own_team {
            selected.extend(self.in_play(user_team).iter().copied());
        }
        if model.own_trainer {
            selected.extend(party(user_team));
        }
        let mut targets = Vec::with_capacity(selected.len());
        for id in selected {
            if !targets.contains(&id) {
                targets.push(id);
            }
        }
        if targets.is_empty() {
            error!(technique = %technique.slug, "target model selects no monster");
        }
        targets
    }

    fn perform_technique(&mut self, action: &EnqueuedAction, tech: &Technique) {
        let Some(user) = action.user.monster() else {
            return;
        };
        let user_name = self.name_of(user);
        let target_name = self.name_of(action.target);
        self.log.log_action(&user_name, &tech.slug, &target_name);

        if !action.scheduled {
            if let Some(monster) = self.ctx.monster_mut(user) {
                if let Some(index) = monster.find_move(&tech.slug) {
                    monster.moves[index].mark_used();
                }
            }
        }
        let hit_roll = match self.hit_rolls.get(&user) {
            Some(roll) => *roll,
            None => self.rng.gen(),
        };

        let mut result = EffectResult::new(tech.slug.clone());
        for target in self.get_targets(tech, user, action.target) {
            let hp_before = self.ctx.monster(target).map(|monster| monster.current_hp);
            let call = Invocation {
                method: &action.method,
                user: action.user,
                target,
                hit_roll,
                phase: EffectPhase::PerformTech,
                riddle_reward: action.riddle_reward,
            };
            match self.apply(&call) {
                Ok(outcome) => {
                    if let Some(turns) = outcome.scheduled_in {
                        self.schedule_foresight(action.user, tech, target, turns);
                    }
                    result.merge(outcome);
                }
                Err(err) => warn!(%err, technique = %tech.slug, "technique effect failed"),
            }
            self.log_hp_change(target, hp_before);
        }
        let status_result = self.run_status_phase(user, EffectPhase::PerformTech);

        let level = self
            .ctx
            .monster(user)
            .map(|monster| monster.level)
            .unwrap_or_default();
        let params = |name: String| {
            vec![
                ("user", user_name.clone()),
                ("target", target_name.clone()),
                ("name", name),
                ("level", level.to_string()),
            ]
        };
        let key = tech.use_tech.as_deref().unwrap_or(USED_X);
        self.announce_hit(
            key,
            params(translate_technique(&tech.slug)),
            result.damage,
            result.element_multiplier,
        );
        if result.success {
            if let Some(key) = &tech.use_success {
                self.announce(key, params(translate_technique(&tech.slug)));
            }
        } else if let Some(key) = &tech.use_failure {
            self.announce(key, params(translate_technique(&tech.slug)));
        } else if tech.sort == TechSort::Damage {
            self.announce("combat_miss", params(translate_technique(&tech.slug)));
        }
        for slug in &result.statuses {
            let message = self
                .session
                .db()
                .lookup_status(slug)
                .ok()
                .and_then(|status| status.use_success);
            if let Some(key) = message {
                self.announce(&key, params(slug.clone()));
            }
        }
        for extra in &result.extras {
            self.announce(extra, params(translate_technique(&tech.slug)));
        }
        if let Some(extras) = status_result.map(|outcome| outcome.extras) {
            for extra in extras {
                self.announce(&extra, vec![("target", user_name.clone())]);
            }
        }
        if tech.range != Range::Special && result.damage > 0 {
            if let Some(key) = self.session.config().multiplier_message(result.element_multiplier) {
                self.announce(key, Vec::new());
            }
        }
        if result.escaped {
            if let Some(team) = self.ctx.team_of(user) {
                info!(monster = %user_name, "escaped from battle");
                self.run_team = Some(team);
            }
        }
    }

    /// Park a copy of `tech` that hits `target` once `turns` more rounds
    /// have started. The copy deals plain damage with power `turns`.
    fn schedule_foresight(&mut self, user: Actor, tech: &Technique, target: Uuid, turns: u32) {
        let mut delayed = tech.clone();
        delayed.power = f64::from(turns);
        delayed.effects = tech
            .effects
            .iter()
            .map(|effect| match effect {
                Effect::Foresight { .. } => Effect::Damage,
                other => other.clone(),
            })
            .collect();
        let due = self.turn + turns;
        debug!(technique = %tech.slug, due, "delayed strike scheduled");
        let mut pending = EnqueuedAction::new(user, ActionMethod::Technique(delayed), target, due);
        pending.scheduled = true;
        self.queue.add_pending(pending);
    }

    fn perform_item(&mut self, action: &EnqueuedAction, item: &Item) {
        let team = match action.user {
            Actor::Trainer(team) => Some(team),
            Actor::Monster(id) => self.ctx.team_of(id),
        };
        let Some(team) = team else {
            return;
        };
        let Some(npc) = self.ctx.team_mut(team) else {
            return;
        };
        if !npc.take_item(&item.slug) {
            warn!(npc = %npc.slug, item = %item.slug, "item no longer in inventory");
            return;
        }
        let user_name = npc.name.clone();
        let target_name = self.name_of(action.target);
        self.log.log_action(&user_name, &item.slug, &target_name);
        let hp_before = self.ctx.monster(action.target).map(|monster| monster.current_hp);
        let call = Invocation {
            method: &action.method,
            user: action.user,
            target: action.target,
            hit_roll: 0.0,
            phase: EffectPhase::PerformItem,
            riddle_reward: None,
        };
        let result = match self.apply(&call) {
            Ok(result) => result,
            Err(err) => {
                warn!(%err, item = %item.slug, "item effect failed");
                EffectResult::new(item.slug.clone())
            }
        };
        self.log_hp_change(action.target, hp_before);

        let params = vec![
            ("user", user_name),
            ("name", translate_item(&item.slug)),
            ("target", target_name),
            ("shakes", result.num_shakes.to_string()),
        ];
        self.announce("item_used", params.clone());
        let follow_up = if result.success {
            item.use_success.as_deref()
        } else {
            item.use_failure.as_deref()
        };
        if let Some(key) = follow_up {
            self.announce(key, params.clone());
        }
        for extra in &result.extras {
            self.announce(extra, params.clone());
        }
        if let Some(captured) = result.captured {
            for fielded in &mut self.in_play {
                fielded.retain(|id| *id != captured);
            }
            self.queue.remove_monster(captured);
            self.damage.remove_monster(captured);
        }
    }

    fn perform_status(&mut self, action: &EnqueuedAction, status: &Status) {
        let host = action.target;
        let hp_before = self.ctx.monster(host).map(|monster| monster.current_hp);
        let call = Invocation {
            method: &action.method,
            user: action.user,
            target: host,
            hit_roll: 0.0,
            phase: EffectPhase::PerformStatus,
            riddle_reward: None,
        };
        let result = match self.apply(&call) {
            Ok(result) => result,
            Err(err) => {
                warn!(%err, status = %status.slug, "status effect failed");
                return;
            }
        };
        self.log_hp_change(host, hp_before);
        let host_name = self.name_of(host);
        for extra in &result.extras {
            self.announce(extra, vec![("target", host_name.clone())]);
        }

        let expired = self.ctx.monster_mut(host).is_some_and(|monster| {
            let expired = monster
                .status
                .iter()
                .any(|current| current.slug == status.slug && current.has_reached_duration());
            if expired {
                monster.status.retain(|current| current.slug != status.slug);
            }
            expired
        });
        if expired {
            debug!(monster = %host_name, status = %status.slug, "status wore off");
            if let Some(key) = &status.use_failure {
                self.announce(key, vec![("target", host_name)]);
            }
        }
    }

    fn log_hp_change(&mut self, target: Uuid, before: Option<u32>) {
        let (Some(before), Some(monster)) = (before, self.ctx.monster(target)) else {
            return;
        };
        let (name, hp, max) = (monster.name.clone(), monster.current_hp, monster.hp());
        if hp < before {
            self.log.log_damage(&name, hp, max);
        } else if hp > before {
            self.log.log_heal(&name, hp, max);
        }
    }

    /// Sweep the field after an action: statuses react, fainted monsters
    /// are defeated.
    fn check_party_hp(&mut self) {
        let fielded: Vec<Uuid> = self.in_play.iter().flatten().copied().collect();
        for id in fielded {
            let Some(monster) = self.ctx.monster(id) else {
                for team in &mut self.in_play {
                    team.retain(|fielded| *fielded != id);
                }
                continue;
            };
            if !monster.is_fainted() {
                let name = monster.name.clone();
                if let Some(result) = self.run_status_phase(id, EffectPhase::CheckPartyHp) {
                    for extra in result.extras {
                        self.announce(&extra, vec![("target", name.clone())]);
                    }
                }
            }
            if self.ctx.monster(id).is_some_and(|monster| monster.is_fainted()) {
                self.defeat(id);
            }
        }
    }

    fn defeat(&mut self, id: Uuid) {
        self.queue.remove_monster(id);
        let Some(monster) = self.ctx.monster_mut(id) else {
            return;
        };
        monster.faint();
        let name = monster.name.clone();
        info!(monster = %name, turn = self.turn, "fainted");
        self.log.log_faint(&name);
        self.announce("combat_fainted", vec![("name", name)]);

        let modifier = self.session.config().experience_modifier;
        for award in award_experience(&mut self.ctx, &mut self.damage, id, modifier) {
            self.announce(
                "combat_gain_exp",
                vec![("name", award.name.clone()), ("xp", award.experience.to_string())],
            );
            if award.levels > 0 {
                self.announce(
                    "combat_level_up",
                    vec![("user", award.name), ("level", award.level.to_string())],
                );
            }
        }
        for team in &mut self.in_play {
            team.retain(|fielded| *fielded != id);
        }
    }

    fn queue_status_actions(&mut self) {
        let turn = self.turn;
        let ctx = &self.ctx;
        let alive = |id: Uuid| ctx.monster(id).is_some_and(|monster| !monster.is_fainted());
        self.queue.release_pending(turn, |action| {
            action.user.monster().map_or(true, alive) && alive(action.target)
        });

        let fielded: Vec<Uuid> = self.in_play.iter().flatten().copied().collect();
        for id in fielded {
            let Some(monster) = self.ctx.monster_mut(id) else {
                continue;
            };
            if monster.is_fainted() {
                continue;
            }
            for status in monster.status.iter_mut().filter(|status| status.slug != FAINT) {
                status.nr_turn += 1;
                let action = EnqueuedAction::new(Actor::Monster(id), ActionMethod::Status(status.clone()), id, turn);
                self.queue.enqueue(action);
            }
        }
    }

    fn end_combat(&mut self) {
        let outcome = self.outcome.unwrap_or(MatchOutcome::Draw);
        self.record_battles(outcome);
        self.clean_combat();
        for name in [RIDDLE_ANSWER, MAIN_COMBAT_MENU, MONSTER_MENU] {
            while self.ui.get_state_by_name(name).is_some() {
                if self.ui.pop_state().is_none() {
                    break;
                }
            }
        }

        let name = match outcome {
            MatchOutcome::Winner(team) | MatchOutcome::RanAway(team) => self
                .ctx
                .team(team)
                .map(|npc| npc.name.clone())
                .unwrap_or_default(),
            MatchOutcome::Draw => String::new(),
        };
        let text = match outcome {
            MatchOutcome::Winner(_) => {
                self.log.log_win(&name);
                self.announce("combat_victory", vec![("name", name)]);
                self.log.events().last().map(|event| event.text.clone())
            }
            MatchOutcome::Draw => {
                self.log.log_tie();
                self.announce("combat_draw", Vec::new());
                self.log.events().last().map(|event| event.text.clone())
            }
            MatchOutcome::RanAway(_) => {
                self.log.log_run(&name);
                None
            }
        };
        self.ui.push_state(
            COMBAT_MESSAGE,
            json!({ "text": text.unwrap_or_default(), "turns": self.turn }),
        );
        info!(outcome = ?outcome, turns = self.turn, "battle finished");
    }

    /// Every participant remembers the battle. Running away counts as a
    /// draw for both sides.
    fn record_battles(&mut self, outcome: MatchOutcome) {
        for team in 0..self.ctx.team_count() {
            let opponent = self.ctx.opponent_of(team);
            let opponent_slug = self
                .ctx
                .team(opponent)
                .map(|npc| npc.slug.clone())
                .unwrap_or_default();
            let result = match outcome {
                MatchOutcome::Winner(winner) if winner == team => BattleOutcome::Won,
                MatchOutcome::Winner(_) => BattleOutcome::Lost,
                MatchOutcome::Draw | MatchOutcome::RanAway(_) => BattleOutcome::Draw,
            };
            let id = new_instance_id(&mut self.rng);
            if let Some(npc) = self.ctx.team_mut(team) {
                let battle = Battle::new(id, npc.slug.clone(), opponent_slug, result, npc.steps);
                npc.battles.add_battle(battle);
            }
        }
    }

    /// Undo temporary battle changes and forget round state.
    fn clean_combat(&mut self) {
        for monster in self.ctx.all_monsters_mut() {
            monster.set_stats();
            monster.end_combat();
            for tech in &mut monster.moves {
                tech.set_stats();
            }
        }
        self.queue.clear();
        self.damage.clear();
        self.deciding.clear();
        self.awaiting_replacement.clear();
        self.riddle = None;
        for team in &mut self.in_play {
            team.clear();
        }
    }
}
