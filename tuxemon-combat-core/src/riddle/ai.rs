use super::manager::{difficulty_for_level, RiddleManager};
use super::model::Riddle;
use crate::config::RiddleConfig;
use crate::sim::monster::Monster;
use phf::phf_map;
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

/// Success bonus per riddle category, keyed by the monster's primary type.
static CATEGORY_AFFINITY: phf::Map<&'static str, &'static [(&'static str, f64)]> = phf_map! {
    "math" => &[("metal", 0.15), ("earth", 0.1)],
    "logic" => &[("aether", 0.15), ("water", 0.1)],
    "wordplay" => &[("wood", 0.15), ("fire", 0.1)],
};

pub fn category_modifier(category: &str, primary_type: Option<&str>) -> f64 {
    let (Some(bonuses), Some(primary)) = (CATEGORY_AFFINITY.get(category), primary_type) else {
        return 0.0;
    };
    bonuses
        .iter()
        .find(|(element, _)| *element == primary)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0.0)
}

/// Result of an AI riddle attempt, ready to be queued as
/// `riddle_correct` / `riddle_incorrect`.
#[derive(Clone, Debug, PartialEq)]
pub struct RiddleTurn {
    pub riddle: Riddle,
    pub correct: bool,
    pub target: Uuid,
}

/// Answers riddles for AI monsters with a level- and type-dependent
/// success rate.
#[derive(Clone, Debug, Default)]
pub struct RiddleAI {
    config: RiddleConfig,
}

impl RiddleAI {
    pub fn new(config: &RiddleConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn difficulty_modifier(&self, difficulty: &str) -> f64 {
        match difficulty {
            "easy" => self.config.easy_modifier,
            "medium" => self.config.medium_modifier,
            "hard" => self.config.hard_modifier,
            _ => 0.0,
        }
    }

    /// Always within `[ai_min_rate, ai_max_rate]`.
    pub fn calculate_success_rate(&self, monster: &Monster, riddle: &Riddle) -> f64 {
        let config = &self.config;
        let base = (config.ai_base_rate + f64::from(monster.level) * config.ai_rate_per_level)
            .min(config.ai_base_cap);
        let rate = base
            + self.difficulty_modifier(&riddle.difficulty)
            + category_modifier(&riddle.category, monster.primary_type());
        rate.clamp(config.ai_min_rate, config.ai_max_rate)
    }

    pub fn get_riddle_difficulty_preference(&self, monster: &Monster) -> &'static str {
        difficulty_for_level(&self.config, monster.level)
    }

    /// Roll an answer: the correct one on success, a wrong guess otherwise.
    pub fn simulate_riddle_answer<R: Rng + ?Sized>(
        &self,
        monster: &Monster,
        riddle: &Riddle,
        rng: &mut R,
    ) -> (String, bool) {
        let correct = rng.gen::<f64>() < self.calculate_success_rate(monster, riddle);
        let answer = if correct {
            riddle.answer.clone()
        } else {
            "i don't know".to_string()
        };
        (answer, correct)
    }

    /// Pick a riddle for `monster` and try it. A correct answer targets the
    /// first opponent (the monster itself when there is none), a wrong one
    /// always targets the monster.
    pub fn take_riddle_turn<R: Rng + ?Sized>(
        &self,
        manager: &RiddleManager,
        monster: &Monster,
        opponents: &[Uuid],
        rng: &mut R,
    ) -> RiddleTurn {
        let riddle = manager.get_random_riddle(None, None, Some(monster), rng);
        let (_, correct) = self.simulate_riddle_answer(monster, &riddle, rng);
        let target = if correct {
            opponents.first().copied().unwrap_or(monster.instance_id)
        } else {
            monster.instance_id
        };
        debug!(
            monster = %monster.name,
            riddle = %riddle.slug,
            correct,
            "AI answered riddle"
        );
        RiddleTurn {
            riddle,
            correct,
            target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn make_monster(slug: &str, level: u32) -> Monster {
        let db = Database::builtin().expect("builtin data");
        let mut rng = SmallRng::seed_from_u64(21);
        Monster::spawn(&db, slug, level, &mut rng).expect("species exists")
    }

    fn riddle(category: &str, difficulty: &str) -> Riddle {
        Riddle {
            category: category.to_string(),
            difficulty: difficulty.to_string(),
            ..Riddle::fallback()
        }
    }

    #[test]
    fn metal_monsters_like_math() {
        let ai = RiddleAI::new(&RiddleConfig::default());
        let metal = make_monster("cardiling", 10);
        // 0.3 + 0.2 base, + 0.15 affinity, + 0 medium
        let rate = ai.calculate_success_rate(&metal, &riddle("math", "medium"));
        assert!((rate - 0.65).abs() < 1e-9);
        let rate = ai.calculate_success_rate(&metal, &riddle("wordplay", "medium"));
        assert!((rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rate_is_clamped() {
        let ai = RiddleAI::new(&RiddleConfig::default());
        let veteran = make_monster("cardiling", 80);
        assert_eq!(ai.calculate_success_rate(&veteran, &riddle("math", "easy")), 0.95);
        let rookie = make_monster("bigfin", 1);
        assert!((ai.calculate_success_rate(&rookie, &riddle("math", "hard")) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn preference_follows_level() {
        let ai = RiddleAI::new(&RiddleConfig::default());
        assert_eq!(ai.get_riddle_difficulty_preference(&make_monster("bigfin", 4)), "easy");
        assert_eq!(ai.get_riddle_difficulty_preference(&make_monster("bigfin", 20)), "medium");
        assert_eq!(ai.get_riddle_difficulty_preference(&make_monster("bigfin", 40)), "hard");
    }

    #[test]
    fn simulated_answer_matches_verdict() {
        let ai = RiddleAI::new(&RiddleConfig::default());
        let monster = make_monster("nudimind", 30);
        let riddle = Riddle::fallback();
        let mut rng = SmallRng::seed_from_u64(4);
        for _ in 0..20 {
            let (answer, correct) = ai.simulate_riddle_answer(&monster, &riddle, &mut rng);
            assert_eq!(riddle.check_text(&answer), correct);
        }
    }

    #[test]
    fn wrong_answers_target_self() {
        let db = Database::builtin().expect("builtin data");
        let manager = RiddleManager::new(&db, &RiddleConfig::default());
        let ai = RiddleAI::new(&RiddleConfig::default());
        let monster = make_monster("bigfin", 12);
        let opponent = Uuid::from_u128(77);
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..30 {
            let turn = ai.take_riddle_turn(&manager, &monster, &[opponent], &mut rng);
            let expected = if turn.correct { opponent } else { monster.instance_id };
            assert_eq!(turn.target, expected);
        }
        let alone = ai.take_riddle_turn(&manager, &monster, &[], &mut rng);
        assert_eq!(alone.target, monster.instance_id);
    }
}
