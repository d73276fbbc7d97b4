use crate::model::Roster;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tuxemon_combat_core::prelude::*;

#[derive(Debug, Eq, PartialEq)]
pub enum BattleResult {
    AWins,
    BWins,
    Tie,
}

impl From<MatchOutcome> for BattleResult {
    fn from(outcome: MatchOutcome) -> Self {
        match outcome {
            MatchOutcome::Winner(0) => BattleResult::AWins,
            MatchOutcome::Winner(_) => BattleResult::BWins,
            MatchOutcome::Draw | MatchOutcome::RanAway(_) => BattleResult::Tie,
        }
    }
}

/// Spawn `roster` as an AI trainer. Species and levels come from the
/// roster; tastes and moves are rolled from `rng`.
pub fn build_npc(
    session: &Session,
    roster: &Roster,
    slug: &str,
    ai: AiKind,
    rng: &mut SmallRng,
) -> anyhow::Result<Npc> {
    let mut npc = Npc::new(slug, &roster.name).with_controller(Controller::Ai(ai));
    for entry in &roster.monsters {
        npc.add_monster(Monster::spawn(session.db(), &entry.species, entry.level, rng)?);
    }
    Ok(npc)
}

/// One trainer battle between `a` and `b`, fully determined by `seed`.
pub fn simulate_battle(
    session: &Session,
    a: &Roster,
    b: &Roster,
    ai: AiKind,
    seed: u64,
) -> anyhow::Result<BattleResult> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let teams = vec![
        build_npc(session, a, "roster_a", ai, &mut rng)?,
        build_npc(session, b, "roster_b", ai, &mut rng)?,
    ];
    let ctx = CombatContext::new(teams, CombatType::Trainer, "", BattleMode::Single)?;
    let mut engine = CombatEngine::new(session, ctx, seed);
    let outcome = engine.run_to_end()?;
    Ok(outcome.into())
}
