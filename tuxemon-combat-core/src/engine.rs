//! High-level battle engine wrapper for step-based and batch simulations.

use crate::battle_logger::CombatEvent;
use crate::error::{CombatError, CombatResult};
use crate::session::Session;
use crate::sim::battle::{CombatPhase, CombatState, MatchOutcome};
use crate::sim::context::CombatContext;
use crate::ui::HeadlessUi;

/// Seconds simulated per step when nobody is watching.
pub const FAST_FORWARD: f32 = 60.0;

/// Result of a single engine step.
#[derive(Clone, Debug)]
pub struct StepResult {
    /// Events produced during this step.
    pub events: Vec<CombatEvent>,
    /// Phase before the step.
    pub before: CombatPhase,
    /// Phase after the step.
    pub after: CombatPhase,
    /// Terminal outcome if the battle ended.
    pub outcome: Option<MatchOutcome>,
}

/// Drives a [`CombatState`] without a game loop: tests, the CLI and batch
/// runs.
pub struct CombatEngine<'s> {
    state: CombatState<'s, HeadlessUi>,
    seen: usize,
}

impl<'s> CombatEngine<'s> {
    pub fn new(session: &'s Session, ctx: CombatContext, seed: u64) -> Self {
        Self {
            state: CombatState::new(session, ctx, HeadlessUi::new(), seed),
            seen: 0,
        }
    }

    /// Advance the battle by `dt` seconds.
    pub fn step(&mut self, dt: f32) -> StepResult {
        let before = self.state.phase();
        self.state.update(dt);
        let events = self.state.log().events()[self.seen..].to_vec();
        self.seen = self.state.log().events().len();
        StepResult {
            events,
            before,
            after: self.state.phase(),
            outcome: self.state.outcome().filter(|_| self.state.is_finished()),
        }
    }

    /// Fast-forward until the battle ends. Fails when a human team has to
    /// decide something.
    pub fn run_to_end(&mut self) -> CombatResult<MatchOutcome> {
        let limit = self.step_limit();
        for _ in 0..limit {
            if self.state.is_finished() {
                break;
            }
            if self.state.awaiting_input() {
                return Err(CombatError::AwaitingInput);
            }
            self.step(FAST_FORWARD);
        }
        match self.state.outcome() {
            Some(outcome) if self.state.is_finished() => Ok(outcome),
            _ => Err(CombatError::InvalidValue(format!(
                "battle did not finish within {limit} steps"
            ))),
        }
    }

    fn step_limit(&self) -> usize {
        let monsters = self.state.context().all_monsters().count().max(1);
        let turns = self.state.session().config().max_turns as usize + 1;
        turns.saturating_mul(monsters * 4 + 4)
    }

    /// Returns true if the battle has ended.
    pub fn is_terminal(&self) -> bool {
        self.state.is_finished()
    }

    pub fn state(&self) -> &CombatState<'s, HeadlessUi> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CombatState<'s, HeadlessUi> {
        &mut self.state
    }

    pub fn into_context(self) -> CombatContext {
        self.state.into_context()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npc::{AiKind, Controller, Npc};
    use crate::sim::context::{BattleMode, CombatType};
    use crate::sim::monster::Monster;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn context(session: &Session, controller: Controller) -> CombatContext {
        let mut rng = SmallRng::seed_from_u64(21);
        let mut red = Npc::new("red", "Red").with_controller(controller);
        red.add_monster(Monster::spawn(session.db(), "rockitten", 10, &mut rng).expect("species"));
        let mut blue = Npc::new("blue", "Blue").with_controller(Controller::Ai(AiKind::Random));
        blue.add_monster(Monster::spawn(session.db(), "budaye", 10, &mut rng).expect("species"));
        CombatContext::new(vec![red, blue], CombatType::Trainer, "", BattleMode::Single).expect("valid")
    }

    #[test]
    fn same_seed_same_battle() {
        let session = Session::builtin().expect("builtin data");
        let mut first = CombatEngine::new(&session, context(&session, Controller::Ai(AiKind::Technique)), 42);
        let mut second = CombatEngine::new(&session, context(&session, Controller::Ai(AiKind::Technique)), 42);
        let a = first.run_to_end().expect("finishes");
        let b = second.run_to_end().expect("finishes");
        assert_eq!(a, b);
        assert_eq!(first.state().log().log_lines(), second.state().log().log_lines());
    }

    #[test]
    fn human_teams_need_input() {
        let session = Session::builtin().expect("builtin data");
        let mut engine = CombatEngine::new(&session, context(&session, Controller::Human), 1);
        assert_eq!(engine.run_to_end(), Err(CombatError::AwaitingInput));
        assert!(!engine.is_terminal());
    }

    #[test]
    fn steps_report_new_events_only() {
        let session = Session::builtin().expect("builtin data");
        let mut engine = CombatEngine::new(&session, context(&session, Controller::Ai(AiKind::Random)), 9);
        let first = engine.step(FAST_FORWARD);
        assert_eq!(first.before, CombatPhase::Begin);
        assert!(!first.events.is_empty());
        let second = engine.step(FAST_FORWARD);
        let total = engine.state().log().events().len();
        assert!(second.events.len() < total);
    }
}
