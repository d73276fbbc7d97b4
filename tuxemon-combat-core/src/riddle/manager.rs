use super::model::Riddle;
use crate::config::RiddleConfig;
use crate::db::DataStore;
use crate::sim::monster::Monster;
use crate::sim::new_instance_id;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

const RANDOM_CATEGORIES: [&str; 3] = ["math", "logic", "wordplay"];

/// Difficulty suited to a monster of `level`.
pub fn difficulty_for_level(config: &RiddleConfig, level: u32) -> &'static str {
    if level <= config.easy_max_level {
        "easy"
    } else if level <= config.medium_max_level {
        "medium"
    } else {
        "hard"
    }
}

/// Category suited to the monster's primary element.
pub fn category_for_monster<R: Rng + ?Sized>(monster: &Monster, rng: &mut R) -> String {
    match monster.primary_type() {
        Some("metal") | Some("earth") => "math".to_string(),
        Some("aether") | Some("wood") => "logic".to_string(),
        _ => RANDOM_CATEGORIES
            .choose(rng)
            .copied()
            .unwrap_or("math")
            .to_string(),
    }
}

/// Picks riddles by category and difficulty. Riddle slugs are cached under
/// `"{category}_{difficulty}"` keys.
#[derive(Clone, Debug, Default)]
pub struct RiddleManager {
    config: RiddleConfig,
    cache: BTreeMap<String, Vec<String>>,
    riddles: BTreeMap<String, Riddle>,
}

impl RiddleManager {
    pub fn new(db: &dyn DataStore, config: &RiddleConfig) -> Self {
        let mut manager = Self {
            config: config.clone(),
            ..Self::default()
        };
        manager.reload_riddles(db);
        manager
    }

    pub fn reload_riddles(&mut self, db: &dyn DataStore) {
        self.cache.clear();
        self.riddles.clear();
        let riddles = db.riddles();
        if riddles.is_empty() {
            warn!("no riddle data found, using fallback cache");
            self.cache = fallback_cache();
            return;
        }
        for riddle in riddles {
            let key = format!("{}_{}", riddle.category, riddle.difficulty);
            self.cache.entry(key).or_default().push(riddle.slug.clone());
            self.riddles.insert(riddle.slug.clone(), riddle);
        }
        info!(
            categories = self.cache.len(),
            riddles = self.riddles.len(),
            "riddle cache loaded"
        );
    }

    pub fn cache_keys(&self) -> Vec<&str> {
        self.cache.keys().map(String::as_str).collect()
    }

    pub fn riddle_count(&self) -> usize {
        self.cache.values().map(Vec::len).sum()
    }

    /// Never fails: widens the search when nothing matches and finally
    /// serves [`Riddle::fallback`]. Missing criteria are inferred from
    /// `monster` when given.
    pub fn get_random_riddle<R: Rng + ?Sized>(
        &self,
        category: Option<&str>,
        difficulty: Option<&str>,
        monster: Option<&Monster>,
        rng: &mut R,
    ) -> Riddle {
        let difficulty = difficulty
            .map(str::to_string)
            .or_else(|| monster.map(|m| difficulty_for_level(&self.config, m.level).to_string()));
        let category = category
            .map(str::to_string)
            .or_else(|| monster.map(|m| category_for_monster(m, rng)));

        let mut available = self.available(category.as_deref(), difficulty.as_deref());
        if available.is_empty() {
            warn!(?category, ?difficulty, "no riddles found");
            available = self.all_slugs();
        }
        let Some(slug) = available.choose(rng) else {
            error!("no riddles available at all, serving the fallback riddle");
            return self.stamped(Riddle::fallback(), rng);
        };
        match self.riddles.get(slug.as_str()) {
            Some(riddle) => self.stamped(riddle.clone(), rng),
            None => {
                error!(slug = %slug, "failed to create riddle, serving the fallback riddle");
                self.stamped(Riddle::fallback(), rng)
            }
        }
    }

    pub fn get_riddle_by_difficulty<R: Rng + ?Sized>(&self, difficulty: &str, rng: &mut R) -> Riddle {
        self.get_random_riddle(None, Some(difficulty), None, rng)
    }

    pub fn get_riddle_by_category<R: Rng + ?Sized>(&self, category: &str, rng: &mut R) -> Riddle {
        self.get_random_riddle(Some(category), None, None, rng)
    }

    /// Riddle matched to the first conscious monster of `party`, or to the
    /// first monster when all have fainted.
    pub fn get_riddle_for_battle<R: Rng + ?Sized>(&self, party: &[Monster], rng: &mut R) -> Riddle {
        let active = party
            .iter()
            .find(|monster| !monster.is_fainted())
            .or_else(|| party.first());
        self.get_random_riddle(None, None, active, rng)
    }

    fn available(&self, category: Option<&str>, difficulty: Option<&str>) -> Vec<String> {
        match (category, difficulty) {
            (Some(category), Some(difficulty)) => self
                .cache
                .get(&format!("{category}_{difficulty}"))
                .cloned()
                .unwrap_or_default(),
            (Some(category), None) => {
                let prefix = format!("{category}_");
                self.collect(|key| key.starts_with(&prefix))
            }
            (None, Some(difficulty)) => {
                let suffix = format!("_{difficulty}");
                self.collect(|key| key.ends_with(&suffix))
            }
            (None, None) => self.all_slugs(),
        }
    }

    fn collect<F: Fn(&str) -> bool>(&self, keep: F) -> Vec<String> {
        self.cache
            .iter()
            .filter(|(key, _)| keep(key))
            .flat_map(|(_, slugs)| slugs.iter().cloned())
            .collect()
    }

    fn all_slugs(&self) -> Vec<String> {
        self.collect(|_| true)
    }

    fn stamped<R: Rng + ?Sized>(&self, mut riddle: Riddle, rng: &mut R) -> Riddle {
        riddle.instance_id = new_instance_id(rng);
        riddle
    }
}

/// Slugs served when the data store holds no riddles. They resolve to the
/// fallback riddle unless the store is reloaded with real data.
fn fallback_cache() -> BTreeMap<String, Vec<String>> {
    let entries: [(&str, &[&str]); 6] = [
        ("math_easy", &["math_easy_01", "math_easy_02"]),
        ("logic_easy", &["logic_easy_01"]),
        ("wordplay_easy", &["wordplay_easy_01"]),
        ("color_hard", &["color_hard_01"]),
        ("sequence_medium", &["sequence_medium_01"]),
        ("time_easy", &["time_easy_01"]),
    ];
    entries
        .iter()
        .map(|(key, slugs)| (key.to_string(), slugs.iter().map(|s| s.to_string()).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::riddle::model::FALLBACK_RIDDLE;
    use std::collections::BTreeSet;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn manager() -> (Database, RiddleManager) {
        let db = Database::builtin().expect("builtin data");
        let manager = RiddleManager::new(&db, &RiddleConfig::default());
        (db, manager)
    }

    fn monster(db: &Database, slug: &str, level: u32) -> Monster {
        let mut rng = SmallRng::seed_from_u64(8);
        Monster::spawn(db, slug, level, &mut rng).expect("species")
    }

    #[test]
    fn difficulty_thresholds() {
        let config = RiddleConfig::default();
        assert_eq!(difficulty_for_level(&config, 1), "easy");
        assert_eq!(difficulty_for_level(&config, 10), "easy");
        assert_eq!(difficulty_for_level(&config, 11), "medium");
        assert_eq!(difficulty_for_level(&config, 25), "medium");
        assert_eq!(difficulty_for_level(&config, 26), "hard");
    }

    #[test]
    fn metal_and_earth_get_math() {
        let (db, manager) = manager();
        let mut rng = SmallRng::seed_from_u64(1);
        let kitten = monster(&db, "rockitten", 30);
        for _ in 0..10 {
            let riddle = manager.get_random_riddle(None, None, Some(&kitten), &mut rng);
            assert_eq!(riddle.category, "math");
            assert_eq!(riddle.difficulty, "hard");
        }
    }

    #[test]
    fn wood_gets_logic() {
        let (db, _) = manager();
        let mut rng = SmallRng::seed_from_u64(1);
        let plant = monster(&db, "budaye", 5);
        assert_eq!(category_for_monster(&plant, &mut rng), "logic");
    }

    #[test]
    fn explicit_criteria_filter() {
        let (_, manager) = manager();
        let mut rng = SmallRng::seed_from_u64(2);
        let riddle = manager.get_random_riddle(Some("wordplay"), Some("medium"), None, &mut rng);
        assert_eq!(riddle.slug, "wordplay_medium_01");
        let riddle = manager.get_riddle_by_category("logic", &mut rng);
        assert_eq!(riddle.category, "logic");
        let riddle = manager.get_riddle_by_difficulty("hard", &mut rng);
        assert_eq!(riddle.difficulty, "hard");
    }

    #[test]
    fn unmatched_criteria_widen_to_everything() {
        let (_, manager) = manager();
        let mut rng = SmallRng::seed_from_u64(3);
        let riddle = manager.get_random_riddle(Some("astronomy"), Some("hard"), None, &mut rng);
        assert_ne!(riddle.slug, FALLBACK_RIDDLE);
    }

    #[test]
    fn exact_key_miss_skips_category_only_step() {
        let (_, manager) = manager();
        let categories: BTreeSet<String> = (0..64)
            .map(|seed| {
                let mut rng = SmallRng::seed_from_u64(seed);
                manager
                    .get_random_riddle(Some("math"), Some("legendary"), None, &mut rng)
                    .category
            })
            .collect();
        assert!(categories.len() > 1, "drew only {categories:?}");
    }

    #[test]
    fn empty_store_serves_fallback() {
        let db = Database::default();
        let manager = RiddleManager::new(&db, &RiddleConfig::default());
        assert!(manager.cache_keys().contains(&"math_easy"));
        let mut rng = SmallRng::seed_from_u64(4);
        let riddle = manager.get_random_riddle(None, None, None, &mut rng);
        assert_eq!(riddle.slug, FALLBACK_RIDDLE);
        assert_eq!(riddle.question, "What is 2 + 2?");
    }

    #[test]
    fn battle_riddle_uses_first_conscious_monster() {
        let (db, manager) = manager();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut fainted = monster(&db, "rockitten", 40);
        fainted.faint();
        let awake = monster(&db, "cardiling", 5);
        let riddle = manager.get_riddle_for_battle(&[fainted, awake], &mut rng);
        assert_eq!(riddle.category, "math");
        assert_eq!(riddle.difficulty, "easy");
        let none = manager.get_riddle_for_battle(&[], &mut rng);
        assert!(!none.slug.is_empty());
    }

    #[test]
    fn riddles_get_fresh_instance_ids() {
        let (_, manager) = manager();
        let mut rng = SmallRng::seed_from_u64(6);
        let first = manager.get_random_riddle(None, None, None, &mut rng);
        let second = manager.get_random_riddle(None, None, None, &mut rng);
        assert_ne!(first.instance_id, second.instance_id);
    }
}
