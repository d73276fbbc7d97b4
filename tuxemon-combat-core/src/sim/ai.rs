use crate::config::CombatConfig;
use crate::db::DataStore;
use crate::riddle::{RiddleAI, RiddleManager, RiddleTurn};
use crate::sim::context::{CombatContext, CombatType};
use crate::sim::damage::simple_damage_multiplier;
use crate::sim::monster::Monster;
use crate::sim::technique::{Range, Technique};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Upper bound of technique power, used to normalise it for scoring.
pub const POWER_RANGE_MAX: f64 = 3.0;

/// What an AI-controlled monster sees when it has to decide.
pub struct AiView<'a> {
    pub ctx: &'a CombatContext,
    pub monster: &'a Monster,
    pub team: usize,
    /// Conscious opponents currently on the field.
    pub opponents: Vec<Uuid>,
    pub riddles: &'a RiddleManager,
    pub db: &'a dyn DataStore,
    pub config: &'a CombatConfig,
    pub turn: u32,
}

impl AiView<'_> {
    fn opponent_monsters(&self) -> impl Iterator<Item = &Monster> {
        self.opponents.iter().filter_map(|id| self.ctx.monster(*id))
    }

    /// Every (move index, opponent) pair whose technique is ready and whose
    /// conditions that opponent meets.
    pub fn valid_moves(&self) -> Vec<(usize, Uuid)> {
        let mut valid = Vec::new();
        for (index, tech) in self.monster.moves.iter().enumerate() {
            if tech.is_recharging() {
                continue;
            }
            for opponent in self.opponent_monsters() {
                if tech.validate_monster(opponent) {
                    valid.push((index, opponent.instance_id));
                }
            }
        }
        valid
    }
}

/// One monster's action for a round, chosen by a player or an AI.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// Index into the monster's moves.
    Technique { index: usize, target: Uuid },
    Riddle(RiddleTurn),
    /// The owning trainer uses an item from its inventory.
    Item { slug: String, target: Uuid },
    Skip,
    Run,
    Forfeit,
}

pub trait BattleAI: Send {
    fn choose_action(&mut self, view: &AiView<'_>, rng: &mut SmallRng) -> Decision;
}

/// Picks any ready technique against any opponent.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomAI;

impl BattleAI for RandomAI {
    fn choose_action(&mut self, view: &AiView<'_>, rng: &mut SmallRng) -> Decision {
        view.valid_moves()
            .choose(rng)
            .map(|(index, target)| Decision::Technique {
                index: *index,
                target: *target,
            })
            .unwrap_or(Decision::Skip)
    }
}

/// Scoring weights for [`TechniqueAI`]. Absent weights contribute nothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechniqueWeights {
    pub range_bonus: BTreeMap<Range, f64>,
    pub power_weight: f64,
    pub accuracy_weight: f64,
    pub elemental_multiplier_weight: f64,
    /// Effectiveness is scaled by `elemental_health_scaling` while the
    /// opponent's HP is above this fraction.
    pub elemental_health_threshold: Option<f64>,
    pub elemental_health_scaling: Option<f64>,
    pub health_priority_threshold: Option<f64>,
    pub healing_weight: f64,
    pub healing_penalty_threshold: Option<f64>,
    pub healing_penalty_weight: f64,
}

impl Default for TechniqueWeights {
    fn default() -> Self {
        Self {
            range_bonus: BTreeMap::from([(Range::Melee, 0.2), (Range::Reliable, 0.1)]),
            power_weight: 1.0,
            accuracy_weight: 0.5,
            elemental_multiplier_weight: 1.0,
            elemental_health_threshold: None,
            elemental_health_scaling: None,
            health_priority_threshold: Some(0.3),
            healing_weight: 1.5,
            healing_penalty_threshold: Some(0.8),
            healing_penalty_weight: 1.0,
        }
    }
}

/// When a trainer's AI reaches for an item instead of a technique.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemRule {
    pub hp_below: Option<f64>,
    pub hp_above: Option<f64>,
    pub status_effects: Vec<String>,
}

impl ItemRule {
    pub fn matches(&self, monster: &Monster) -> bool {
        let ratio = hp_ratio(monster);
        if self.hp_below.is_some_and(|below| ratio >= below) {
            return false;
        }
        if self.hp_above.is_some_and(|above| ratio <= above) {
            return false;
        }
        self.status_effects.is_empty() || self.status_effects.iter().any(|slug| monster.has_status(slug))
    }
}

pub fn hp_ratio(monster: &Monster) -> f64 {
    if monster.hp() == 0 {
        return 0.0;
    }
    f64::from(monster.current_hp) / f64::from(monster.hp())
}

pub fn technique_score(
    db: &dyn DataStore,
    config: &CombatConfig,
    weights: &TechniqueWeights,
    user: &Monster,
    technique: &Technique,
    opponent: &Monster,
) -> f64 {
    let mut effectiveness = simple_damage_multiplier(db, config, &technique.types, &opponent.types, &[])
        * weights.elemental_multiplier_weight;
    if let (Some(threshold), Some(scaling)) =
        (weights.elemental_health_threshold, weights.elemental_health_scaling)
    {
        if f64::from(opponent.current_hp) > f64::from(opponent.hp()) * threshold {
            effectiveness *= scaling;
        }
    }
    let range_bonus = weights.range_bonus.get(&technique.range).copied().unwrap_or(0.0);
    let power = technique.power / POWER_RANGE_MAX * weights.power_weight;
    let accuracy = technique.accuracy * weights.accuracy_weight;

    let heals = technique.healing_power > 0.0 || technique.power == 0.0;
    let ratio = hp_ratio(user);
    let mut healing = 0.0;
    if heals {
        if weights.health_priority_threshold.is_some_and(|threshold| ratio < threshold) {
            healing = technique.healing_power * weights.healing_weight;
        }
        if weights.healing_penalty_threshold.is_some_and(|threshold| ratio > threshold) {
            healing = -technique.healing_power * weights.healing_penalty_weight;
        }
    }

    let total = effectiveness + range_bonus + power + accuracy + healing;
    debug!(
        technique = %technique.slug,
        opponent = %opponent.slug,
        effectiveness,
        range_bonus,
        power,
        accuracy,
        healing,
        total,
        "technique scored"
    );
    total
}

/// Scores every ready technique against every opponent and plays the best.
/// In trainer battles it first checks the trainer's items.
#[derive(Clone, Debug, Default)]
pub struct TechniqueAI {
    weights: TechniqueWeights,
    items: BTreeMap<String, ItemRule>,
}

impl TechniqueAI {
    pub fn new(weights: TechniqueWeights) -> Self {
        let items = BTreeMap::from([(
            "antidote".to_string(),
            ItemRule {
                status_effects: vec!["poison".to_string()],
                ..ItemRule::default()
            },
        )]);
        Self { weights, items }
    }

    pub fn with_item_rule(mut self, slug: impl Into<String>, rule: ItemRule) -> Self {
        self.items.insert(slug.into(), rule);
        self
    }

    fn pick_item(&self, view: &AiView<'_>) -> Option<String> {
        if view.ctx.combat_type() != CombatType::Trainer {
            return None;
        }
        let npc = view.ctx.team(view.team)?;
        npc.inventory
            .iter()
            .filter(|(_, quantity)| **quantity > 0)
            .find(|(slug, _)| {
                self.items
                    .get(slug.as_str())
                    .is_some_and(|rule| rule.matches(view.monster))
                    && view
                        .db
                        .lookup_item(slug)
                        .is_ok_and(|item| item.validate_monster(view.monster))
            })
            .map(|(slug, _)| slug.clone())
    }
}

impl BattleAI for TechniqueAI {
    fn choose_action(&mut self, view: &AiView<'_>, rng: &mut SmallRng) -> Decision {
        if let Some(slug) = self.pick_item(view) {
            return Decision::Item {
                slug,
                target: view.monster.instance_id,
            };
        }
        let valid = view.valid_moves();
        if valid.is_empty() {
            return Decision::Skip;
        }

        let mut best: Option<(usize, Uuid)> = None;
        let mut highest = 0.0;
        for (index, target) in &valid {
            let Some(opponent) = view.opponent_monsters().find(|m| m.instance_id == *target) else {
                continue;
            };
            let score = technique_score(
                view.db,
                view.config,
                &self.weights,
                view.monster,
                &view.monster.moves[*index],
                opponent,
            );
            if score > highest {
                highest = score;
                best = Some((*index, *target));
            }
        }
        let (index, target) = match best {
            Some(choice) => choice,
            None => *valid.choose(rng).unwrap_or(&valid[0]),
        };
        Decision::Technique { index, target }
    }
}

impl BattleAI for RiddleAI {
    fn choose_action(&mut self, view: &AiView<'_>, rng: &mut SmallRng) -> Decision {
        Decision::Riddle(self.take_riddle_turn(view.riddles, view.monster, &view.opponents, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiddleConfig;
    use crate::db::Database;
    use crate::npc::Npc;
    use crate::sim::context::BattleMode;
    use rand::SeedableRng;

    fn make_monster(db: &Database, slug: &str, level: u32) -> Monster {
        let mut rng = SmallRng::seed_from_u64(8);
        Monster::spawn(db, slug, level, &mut rng).expect("species exists")
    }

    fn context(db: &Database, combat_type: CombatType) -> CombatContext {
        let mut a = Npc::new("trainer_a", "A");
        a.add_monster(make_monster(db, "budaye", 10));
        let mut b = Npc::new("trainer_b", "B");
        b.add_monster(make_monster(db, "djinnbo", 10));
        CombatContext::new(vec![a, b], combat_type, "", BattleMode::Single).expect("valid")
    }

    fn view<'a>(
        ctx: &'a CombatContext,
        db: &'a Database,
        config: &'a CombatConfig,
        riddles: &'a RiddleManager,
    ) -> AiView<'a> {
        AiView {
            ctx,
            monster: &ctx.teams()[0].monsters[0],
            team: 0,
            opponents: vec![ctx.teams()[1].monsters[0].instance_id],
            riddles,
            db,
            config,
            turn: 1,
        }
    }

    #[test]
    fn random_ai_skips_when_everything_recharges() {
        let db = Database::builtin().expect("builtin data");
        let config = CombatConfig::default();
        let riddles = RiddleManager::new(&db, &config.riddle);
        let mut ctx = context(&db, CombatType::Wild);
        let id = ctx.teams()[0].monsters[0].instance_id;
        if let Some(monster) = ctx.monster_mut(id) {
            for tech in &mut monster.moves {
                tech.next_use = 2;
            }
        }
        let mut rng = SmallRng::seed_from_u64(1);
        let decision = RandomAI.choose_action(&view(&ctx, &db, &config, &riddles), &mut rng);
        assert_eq!(decision, Decision::Skip);
    }

    #[test]
    fn conditional_moves_wait_for_a_weakened_opponent() {
        let db = Database::builtin().expect("builtin data");
        let config = CombatConfig::default();
        let riddles = RiddleManager::new(&db, &config.riddle);
        let mut ctx = context(&db, CombatType::Wild);
        let id = ctx.teams()[0].monsters[0].instance_id;
        let foe = ctx.teams()[1].monsters[0].instance_id;
        let finisher = db.lookup_technique("finishing_blow").expect("technique");
        if let Some(monster) = ctx.monster_mut(id) {
            monster.moves = vec![finisher];
        }
        assert!(view(&ctx, &db, &config, &riddles).valid_moves().is_empty());
        let mut rng = SmallRng::seed_from_u64(6);
        let decision = RandomAI.choose_action(&view(&ctx, &db, &config, &riddles), &mut rng);
        assert_eq!(decision, Decision::Skip);

        if let Some(monster) = ctx.monster_mut(foe) {
            monster.current_hp = monster.stats.hp / 5;
        }
        assert_eq!(view(&ctx, &db, &config, &riddles).valid_moves(), vec![(0, foe)]);
    }

    #[test]
    fn antidote_is_kept_for_poisoned_monsters() {
        let db = Database::builtin().expect("builtin data");
        let config = CombatConfig::default();
        let riddles = RiddleManager::new(&db, &config.riddle);
        let mut ctx = context(&db, CombatType::Trainer);
        if let Some(npc) = ctx.team_mut(0) {
            npc.add_item("antidote", 1);
        }
        // An unconditional rule would pick it; the item's own condition refuses.
        let ai = TechniqueAI::new(TechniqueWeights::default()).with_item_rule("antidote", ItemRule::default());
        assert_eq!(ai.pick_item(&view(&ctx, &db, &config, &riddles)), None);
    }

    #[test]
    fn technique_ai_prefers_effective_moves() {
        let db = Database::builtin().expect("builtin data");
        let config = CombatConfig::default();
        let weights = TechniqueWeights::default();
        let user = make_monster(&db, "bigfin", 10);
        let fire = make_monster(&db, "djinnbo", 10);
        let jet = db.lookup_technique("water_jet").expect("technique");
        let jab = db.lookup_technique("quick_jab").expect("technique");
        let strong = technique_score(&db, &config, &weights, &user, &jet, &fire);
        let neutral = technique_score(&db, &config, &weights, &user, &jab, &fire);
        assert!(strong > neutral);
    }

    #[test]
    fn healing_is_penalised_at_full_health() {
        let db = Database::builtin().expect("builtin data");
        let config = CombatConfig::default();
        let weights = TechniqueWeights::default();
        let mut user = make_monster(&db, "nudimind", 10);
        let opponent = make_monster(&db, "rockitten", 10);
        let first_aid = db.lookup_technique("first_aid").expect("technique");
        let healthy = technique_score(&db, &config, &weights, &user, &first_aid, &opponent);
        user.current_hp = 1;
        let hurt = technique_score(&db, &config, &weights, &user, &first_aid, &opponent);
        assert!(hurt > healthy);
    }

    #[test]
    fn technique_ai_targets_an_opponent() {
        let db = Database::builtin().expect("builtin data");
        let config = CombatConfig::default();
        let riddles = RiddleManager::new(&db, &config.riddle);
        let ctx = context(&db, CombatType::Wild);
        let mut ai = TechniqueAI::new(TechniqueWeights::default());
        let mut rng = SmallRng::seed_from_u64(2);
        let view = view(&ctx, &db, &config, &riddles);
        match ai.choose_action(&view, &mut rng) {
            Decision::Technique { index, target } => {
                assert!(index < view.monster.moves.len());
                assert_eq!(target, view.opponents[0]);
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn poisoned_trainer_monster_uses_antidote() {
        let db = Database::builtin().expect("builtin data");
        let config = CombatConfig::default();
        let riddles = RiddleManager::new(&db, &config.riddle);
        let mut ctx = context(&db, CombatType::Trainer);
        let id = ctx.teams()[0].monsters[0].instance_id;
        let poison = db.lookup_status("poison").expect("status");
        if let Some(monster) = ctx.monster_mut(id) {
            monster.apply_status(poison);
        }
        if let Some(npc) = ctx.team_mut(0) {
            npc.add_item("antidote", 1);
        }
        let mut ai = TechniqueAI::new(TechniqueWeights::default());
        let mut rng = SmallRng::seed_from_u64(3);
        let decision = ai.choose_action(&view(&ctx, &db, &config, &riddles), &mut rng);
        assert_eq!(
            decision,
            Decision::Item {
                slug: "antidote".to_string(),
                target: id
            }
        );
    }

    #[test]
    fn riddle_ai_answers_riddles() {
        let db = Database::builtin().expect("builtin data");
        let config = CombatConfig::default();
        let riddles = RiddleManager::new(&db, &config.riddle);
        let ctx = context(&db, CombatType::Wild);
        let mut ai = RiddleAI::new(&RiddleConfig::default());
        let mut rng = SmallRng::seed_from_u64(4);
        let decision = ai.choose_action(&view(&ctx, &db, &config, &riddles), &mut rng);
        assert!(matches!(decision, Decision::Riddle(_)));
    }
}
