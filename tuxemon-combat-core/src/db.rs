//! Typed game-data lookups.
//!
//! [`Database`] holds every table in memory. The built-in tables are JSON
//! files embedded at compile time; [`Database::load_dir`] reads the same
//! layout from disk. All records are validated on load so combat never has
//! to deal with malformed data.

use crate::error::{DataError, LookupError};
use crate::riddle::Riddle;
use crate::sim::effects::Effect;
use crate::sim::element::Element;
use crate::sim::item::Item;
use crate::sim::modifier::validate_modifiers;
use crate::sim::monster::MonsterTemplate;
use crate::sim::stats::{Shape, Taste, TasteType};
use crate::sim::status::Status;
use crate::sim::technique::Technique;
use crate::config::CATCH_RATE_RANGE;
use anyhow::Context;
use strsim::normalized_levenshtein;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

pub const TABLES: [&str; 8] = [
    "element", "shape", "taste", "technique", "status", "monster", "riddle", "item",
];

const BUILTIN: [(&str, &str); 8] = [
    ("element", include_str!("../data/element.json")),
    ("shape", include_str!("../data/shape.json")),
    ("taste", include_str!("../data/taste.json")),
    ("technique", include_str!("../data/technique.json")),
    ("status", include_str!("../data/status.json")),
    ("monster", include_str!("../data/monster.json")),
    ("riddle", include_str!("../data/riddle.json")),
    ("item", include_str!("../data/item.json")),
];

const MAX_SUGGESTIONS: usize = 3;
const SUGGESTION_CUTOFF: f64 = 0.6;

/// Read access to game data. Lookups hand out owned copies so callers can
/// mutate them freely (a technique instance per monster, a status per host).
pub trait DataStore: Send + Sync {
    fn lookup_element(&self, slug: &str) -> Result<Element, LookupError>;
    fn lookup_shape(&self, slug: &str) -> Result<Shape, LookupError>;
    fn lookup_taste(&self, slug: &str) -> Result<Taste, LookupError>;
    fn lookup_technique(&self, slug: &str) -> Result<Technique, LookupError>;
    fn lookup_status(&self, slug: &str) -> Result<Status, LookupError>;
    fn lookup_monster(&self, slug: &str) -> Result<MonsterTemplate, LookupError>;
    fn lookup_riddle(&self, slug: &str) -> Result<Riddle, LookupError>;
    fn lookup_item(&self, slug: &str) -> Result<Item, LookupError>;
    /// Every riddle, ordered by slug.
    fn riddles(&self) -> Vec<Riddle>;
    /// Every taste of one kind, ordered by slug.
    fn tastes_of(&self, taste_type: TasteType) -> Vec<Taste>;
}

#[derive(Clone, Debug, Default)]
pub struct Database {
    elements: BTreeMap<String, Element>,
    shapes: BTreeMap<String, Shape>,
    tastes: BTreeMap<String, Taste>,
    techniques: BTreeMap<String, Technique>,
    statuses: BTreeMap<String, Status>,
    monsters: BTreeMap<String, MonsterTemplate>,
    riddles: BTreeMap<String, Riddle>,
    items: BTreeMap<String, Item>,
}

impl Database {
    /// The tables shipped with the crate.
    pub fn builtin() -> Result<Self, DataError> {
        Self::from_sources(BUILTIN.iter().map(|(table, raw)| (*table, (*raw).to_string())))
    }

    /// Load `<table>.json` files from `dir`. Missing files leave the table
    /// empty.
    pub fn load_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut sources = Vec::new();
        for table in TABLES {
            let path = dir.join(format!("{table}.json"));
            if !path.exists() {
                debug!(table, path = %path.display(), "table file missing, leaving it empty");
                continue;
            }
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {table} data at {}", path.display()))?;
            sources.push((table, raw));
        }
        let db = Self::from_sources(sources)
            .with_context(|| format!("Invalid game data in {}", dir.display()))?;
        Ok(db)
    }

    fn from_sources<'a, I>(sources: I) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        let mut db = Database::default();
        for (table, raw) in sources {
            match table {
                "element" => db.elements = keyed(table, parse_table::<Element>(table, &raw)?, |e| &e.slug)?,
                "shape" => db.shapes = keyed(table, parse_table::<Shape>(table, &raw)?, |s| &s.slug)?,
                "taste" => db.tastes = keyed(table, parse_table::<Taste>(table, &raw)?, |t| &t.slug)?,
                "technique" => {
                    db.techniques = keyed(table, parse_table::<Technique>(table, &raw)?, |t| &t.slug)?
                }
                "status" => db.statuses = keyed(table, parse_table::<Status>(table, &raw)?, |s| &s.slug)?,
                "monster" => {
                    db.monsters = keyed(table, parse_table::<MonsterTemplate>(table, &raw)?, |m| &m.slug)?
                }
                "riddle" => db.riddles = keyed(table, parse_table::<Riddle>(table, &raw)?, |r| &r.slug)?,
                "item" => db.items = keyed(table, parse_table::<Item>(table, &raw)?, |i| &i.slug)?,
                other => {
                    return Err(DataError::Parse {
                        table: other.to_string(),
                        message: "unknown table".to_string(),
                    })
                }
            }
        }
        db.validate()?;
        info!(
            techniques = db.techniques.len(),
            monsters = db.monsters.len(),
            riddles = db.riddles.len(),
            "game data loaded"
        );
        Ok(db)
    }

    /// Per-record checks plus cross-table references.
    fn validate(&self) -> Result<(), DataError> {
        for taste in self.tastes.values() {
            validate_modifiers("taste", &taste.slug, &taste.modifiers)?;
        }
        for tech in self.techniques.values() {
            tech.validate()?;
            self.check_status_refs("technique", &tech.slug, &tech.effects)?;
        }
        for status in self.statuses.values() {
            status.validate()?;
        }
        for item in self.items.values() {
            item.validate()?;
            self.check_status_refs("item", &item.slug, &item.effects)?;
        }
        for riddle in self.riddles.values() {
            riddle.validate()?;
        }
        for monster in self.monsters.values() {
            let (min, max) = CATCH_RATE_RANGE;
            if !(min..=max).contains(&monster.catch_rate) {
                return Err(DataError::OutOfRange {
                    table: "monster".to_string(),
                    slug: monster.slug.clone(),
                    field: "catch_rate".to_string(),
                    value: monster.catch_rate,
                    min,
                    max,
                });
            }
            self.lookup_shape(&monster.shape)?;
            for entry in &monster.moveset {
                self.lookup_technique(&entry.technique)?;
            }
            for taste in [&monster.taste_warm, &monster.taste_cold].into_iter().flatten() {
                if taste != crate::sim::stats::TASTELESS {
                    self.lookup_taste(taste)?;
                }
            }
            for element in &monster.types {
                self.lookup_element(element)?;
            }
        }
        Ok(())
    }

    fn check_status_refs(&self, table: &str, slug: &str, effects: &[Effect]) -> Result<(), DataError> {
        for effect in effects {
            if let Effect::Give { status, .. } = effect {
                self.lookup_status(status).map_err(|err| DataError::Invalid {
                    table: table.to_string(),
                    slug: slug.to_string(),
                    message: err.to_string(),
                })?;
            }
        }
        Ok(())
    }

    /// Slugs of one table, sorted. Unknown tables are empty.
    pub fn slugs(&self, table: &str) -> Vec<String> {
        fn keys<T>(map: &BTreeMap<String, T>) -> Vec<String> {
            map.keys().cloned().collect()
        }
        match table {
            "element" => keys(&self.elements),
            "shape" => keys(&self.shapes),
            "taste" => keys(&self.tastes),
            "technique" => keys(&self.techniques),
            "status" => keys(&self.statuses),
            "monster" => keys(&self.monsters),
            "riddle" => keys(&self.riddles),
            "item" => keys(&self.items),
            _ => Vec::new(),
        }
    }
}

impl DataStore for Database {
    fn lookup_element(&self, slug: &str) -> Result<Element, LookupError> {
        find("element", &self.elements, slug)
    }

    fn lookup_shape(&self, slug: &str) -> Result<Shape, LookupError> {
        find("shape", &self.shapes, slug)
    }

    fn lookup_taste(&self, slug: &str) -> Result<Taste, LookupError> {
        find("taste", &self.tastes, slug)
    }

    fn lookup_technique(&self, slug: &str) -> Result<Technique, LookupError> {
        let mut tech = find("technique", &self.techniques, slug)?;
        tech.freeze_defaults();
        Ok(tech)
    }

    fn lookup_status(&self, slug: &str) -> Result<Status, LookupError> {
        find("status", &self.statuses, slug)
    }

    fn lookup_monster(&self, slug: &str) -> Result<MonsterTemplate, LookupError> {
        find("monster", &self.monsters, slug)
    }

    fn lookup_riddle(&self, slug: &str) -> Result<Riddle, LookupError> {
        find("riddle", &self.riddles, slug)
    }

    fn lookup_item(&self, slug: &str) -> Result<Item, LookupError> {
        find("item", &self.items, slug)
    }

    fn riddles(&self) -> Vec<Riddle> {
        self.riddles.values().cloned().collect()
    }

    fn tastes_of(&self, taste_type: TasteType) -> Vec<Taste> {
        self.tastes
            .values()
            .filter(|taste| taste.taste_type == taste_type)
            .cloned()
            .collect()
    }
}

fn parse_table<T: DeserializeOwned>(table: &str, raw: &str) -> Result<Vec<T>, DataError> {
    serde_json::from_str(raw).map_err(|err| DataError::Parse {
        table: table.to_string(),
        message: err.to_string(),
    })
}

fn keyed<T, F>(table: &str, records: Vec<T>, slug: F) -> Result<BTreeMap<String, T>, DataError>
where
    F: Fn(&T) -> &String,
{
    let mut map = BTreeMap::new();
    for record in records {
        let key = slug(&record).clone();
        if map.contains_key(&key) {
            return Err(DataError::Invalid {
                table: table.to_string(),
                slug: key,
                message: "duplicate slug".to_string(),
            });
        }
        map.insert(key, record);
    }
    Ok(map)
}

fn find<T: Clone>(table: &str, map: &BTreeMap<String, T>, slug: &str) -> Result<T, LookupError> {
    map.get(slug).cloned().ok_or_else(|| LookupError {
        table: table.to_string(),
        slug: slug.to_string(),
        suggestions: close_matches(slug, map.keys()),
    })
}

/// Up to three known slugs that look like `slug`, best first.
fn close_matches<'a, I>(slug: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut scored: Vec<(f64, &String)> = candidates
        .into_iter()
        .map(|candidate| (normalized_levenshtein(slug, candidate), candidate))
        .filter(|(score, _)| *score >= SUGGESTION_CUTOFF)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, candidate)| candidate.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_load() {
        let db = Database::builtin().expect("builtin data is valid");
        for table in TABLES {
            assert!(!db.slugs(table).is_empty(), "{table} table is empty");
        }
    }

    #[test]
    fn lookup_miss_suggests_close_slugs() {
        let db = Database::builtin().expect("builtin data");
        let err = db.lookup_technique("rm").expect_err("unknown");
        assert_eq!(err.table, "technique");
        let err = db.lookup_monster("rockiten").expect_err("typo");
        assert_eq!(err.suggestions.first().map(String::as_str), Some("rockitten"));
    }

    #[test]
    fn technique_lookups_are_independent_copies() {
        let db = Database::builtin().expect("builtin data");
        let mut first = db.lookup_technique("ram").expect("ram exists");
        first.power = 99.0;
        first.set_stats();
        let second = db.lookup_technique("ram").expect("ram exists");
        assert_eq!(first.power, second.power);
    }

    #[test]
    fn out_of_range_accuracy_fails_fast() {
        let sources = vec![(
            "technique",
            r#"[{"slug": "wild_swing", "accuracy": 1.5}]"#.to_string(),
        )];
        let err = Database::from_sources(sources).expect_err("accuracy > 1");
        assert!(matches!(err, DataError::OutOfRange { .. }));
    }

    #[test]
    fn unknown_status_reference_fails_fast() {
        let sources = vec![(
            "technique",
            r#"[{"slug": "curse", "effects": [{"type": "give", "status": "doom"}]}]"#.to_string(),
        )];
        assert!(Database::from_sources(sources).is_err());
    }

    #[test]
    fn unknown_condition_operator_is_a_parse_error() {
        let sources = vec![(
            "technique",
            r#"[{"slug": "gamble", "conditions": [{"type": "level", "comparison": "about", "value": 5}]}]"#
                .to_string(),
        )];
        match Database::from_sources(sources) {
            Err(DataError::Parse { table, message }) => {
                assert_eq!(table, "technique");
                assert!(message.contains("unknown comparison operator 'about'"), "{message}");
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn close_matches_rank_and_cap() {
        let known: Vec<String> = ["ram", "rams", "ramp", "rampage", "water_jet"]
            .iter()
            .map(|slug| slug.to_string())
            .collect();
        let matches = close_matches("ram", known.iter());
        assert_eq!(matches, vec!["ram", "ramp", "rams"]);
        assert!(close_matches("zzz", known.iter()).is_empty());
    }
}
