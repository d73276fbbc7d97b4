use crate::config::{COEFF_EXP, MAX_LEVEL, MAX_MOVES};
use crate::db::DataStore;
use crate::error::DataError;
use crate::sim::modifier::ModifierTarget;
use crate::sim::new_instance_id;
use crate::sim::stats::{
    apply_stat_updates, calculate_base_stats, ModifierStats, Shape, StatBlock, StatType, Taste,
    TasteType, TASTELESS,
};
use crate::sim::status::{ResponseStatus, Status, StatusCategory, FAINT};
use crate::sim::technique::Technique;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovesetEntry {
    pub technique: String,
    #[serde(default = "first_level")]
    pub level_learned: u32,
}

fn first_level() -> u32 {
    1
}

fn full_catch_rate() -> f64 {
    100.0
}

fn neutral() -> f64 {
    1.0
}

/// Species record from the data store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonsterTemplate {
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    pub types: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub shape: String,
    #[serde(default = "full_catch_rate")]
    pub catch_rate: f64,
    #[serde(default = "neutral")]
    pub lower_catch_resistance: f64,
    #[serde(default = "neutral")]
    pub upper_catch_resistance: f64,
    #[serde(default)]
    pub moveset: Vec<MovesetEntry>,
    #[serde(default)]
    pub taste_warm: Option<String>,
    #[serde(default)]
    pub taste_cold: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Monster {
    pub instance_id: Uuid,
    pub slug: String,
    pub name: String,
    pub level: u32,
    pub total_experience: u64,
    pub current_hp: u32,
    /// Derived stats; `stats.hp` is the maximum HP.
    pub stats: StatBlock,
    pub types: Vec<String>,
    pub tags: Vec<String>,
    pub status: Vec<Status>,
    pub moves: Vec<Technique>,
    pub shape: Shape,
    pub taste_warm: Taste,
    pub taste_cold: Taste,
    pub modifiers: ModifierStats,
    pub catch_rate: f64,
    pub lower_catch_resistance: f64,
    pub upper_catch_resistance: f64,
    pub bond: u32,
    pub steps: u32,
    pub wild: bool,
    pub owner: Option<String>,
}

impl Monster {
    /// Build a monster from its species template at `level`, learning the
    /// last [`MAX_MOVES`] techniques available at that level.
    pub fn spawn<R: Rng + ?Sized>(
        db: &dyn DataStore,
        slug: &str,
        level: u32,
        rng: &mut R,
    ) -> Result<Self, DataError> {
        let template = db.lookup_monster(slug)?;
        let shape = db.lookup_shape(&template.shape)?;
        let taste_warm = pick_taste(db, template.taste_warm.as_deref(), TasteType::Warm, rng)?;
        let taste_cold = pick_taste(db, template.taste_cold.as_deref(), TasteType::Cold, rng)?;
        let level = level.clamp(1, MAX_LEVEL);

        let learned: Vec<&MovesetEntry> = template
            .moveset
            .iter()
            .filter(|entry| entry.level_learned <= level)
            .collect();
        let skip = learned.len().saturating_sub(MAX_MOVES);
        let mut moves = Vec::with_capacity(MAX_MOVES);
        for entry in learned.into_iter().skip(skip) {
            moves.push(db.lookup_technique(&entry.technique)?);
        }

        let mut monster = Self {
            instance_id: new_instance_id(rng),
            slug: template.slug.clone(),
            name: template.name.clone().unwrap_or_else(|| template.slug.clone()),
            level,
            total_experience: 0,
            current_hp: 0,
            stats: StatBlock::default(),
            types: template.types.clone(),
            tags: template.tags.clone(),
            status: Vec::new(),
            moves,
            shape,
            taste_warm,
            taste_cold,
            modifiers: ModifierStats::default(),
            catch_rate: template.catch_rate,
            lower_catch_resistance: template.lower_catch_resistance,
            upper_catch_resistance: template.upper_catch_resistance,
            bond: 0,
            steps: 0,
            wild: false,
            owner: None,
        };
        monster.set_level(level);
        monster.current_hp = monster.stats.hp;
        Ok(monster)
    }

    pub fn hp(&self) -> u32 {
        self.stats.hp
    }

    pub fn is_fainted(&self) -> bool {
        self.current_hp == 0
    }

    pub fn missing_hp(&self) -> u32 {
        self.stats.hp.saturating_sub(self.current_hp)
    }

    pub fn return_stat(&self, stat: StatType) -> u32 {
        self.stats.get(stat)
    }

    pub fn primary_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }

    /// Recompute stats from shape, level, flat modifiers and tastes.
    pub fn set_stats(&mut self) {
        let mut stats = calculate_base_stats(&self.shape.attributes, self.level, &self.modifiers);
        apply_stat_updates(&mut stats, &self.taste_cold, &self.taste_warm);
        self.stats = stats;
        self.current_hp = self.current_hp.min(self.stats.hp);
    }

    pub fn experience_required(&self, level_ofs: i32) -> u64 {
        let level = (i64::from(self.level) + i64::from(level_ofs)).max(0) as u64;
        level.pow(COEFF_EXP)
    }

    /// Add experience and level up as often as it allows. Returns the number
    /// of levels gained.
    pub fn give_experience(&mut self, amount: u64) -> u32 {
        self.total_experience = self.total_experience.saturating_add(amount);
        let mut levels = 0;
        while self.level < MAX_LEVEL && self.total_experience >= self.experience_required(1) {
            self.level_up();
            levels += 1;
        }
        levels
    }

    pub fn level_up(&mut self) {
        info!(monster = %self.name, from = self.level, to = self.level + 1, "levelling up");
        self.level = (self.level + 1).min(MAX_LEVEL);
        self.set_stats();
    }

    pub fn set_level(&mut self, level: u32) {
        self.level = level.clamp(1, MAX_LEVEL);
        self.total_experience = self.experience_required(0);
        self.set_stats();
    }

    pub fn has_status(&self, slug: &str) -> bool {
        self.status.iter().any(|status| status.slug == slug)
    }

    pub fn clear_status(&mut self) {
        self.status.clear();
    }

    /// Add `status`, resolving conflicts with the current first status by
    /// the category responses declared on the incoming status.
    pub fn apply_status(&mut self, mut status: Status) {
        if self.status.is_empty() {
            self.status.push(status);
            return;
        }
        if self.has_status(&status.slug) {
            return;
        }

        self.status[0].nr_turn = 0;
        status.nr_turn = 1;
        let existing = self.status[0].category;
        debug!(
            monster = %self.name,
            incoming = %status.slug,
            existing = %self.status[0].slug,
            "resolving status conflict"
        );
        match existing {
            StatusCategory::Positive | StatusCategory::Negative => match status.response_to(existing) {
                Some(ResponseStatus::Replaced) => self.status = vec![status],
                Some(ResponseStatus::Removed) => self.status.clear(),
                None => {}
            },
            StatusCategory::Neutral => self.status = vec![status],
        }
    }

    pub fn faint(&mut self) {
        self.current_hp = 0;
        self.status.clear();
        self.apply_status(Status::faint());
    }

    pub fn end_combat(&mut self) {
        for tech in &mut self.moves {
            tech.full_recharge();
        }
        if self.has_status(FAINT) {
            self.faint();
        } else {
            self.status.clear();
        }
    }

    pub fn find_move(&self, slug: &str) -> Option<usize> {
        self.moves.iter().position(|tech| tech.slug == slug)
    }

    pub fn get_state(&self) -> Value {
        json!({
            "slug": self.slug,
            "name": self.name,
            "instance_id": self.instance_id.to_string(),
            "level": self.level,
            "total_experience": self.total_experience,
            "current_hp": self.current_hp,
            "taste_warm": self.taste_warm.slug,
            "taste_cold": self.taste_cold.slug,
            "modifiers": self.modifiers,
            "catch_rate": self.catch_rate,
            "bond": self.bond,
            "steps": self.steps,
            "wild": self.wild,
            "owner": self.owner,
            "moves": self.moves.iter().map(Technique::get_state).collect::<Vec<_>>(),
            "status": self.status.iter().map(Status::get_state).collect::<Vec<_>>(),
        })
    }

    /// Restore a saved mapping on top of this monster. Stats are recomputed;
    /// saved HP is clamped to the recomputed maximum.
    pub fn set_state(&mut self, state: &Value, db: &dyn DataStore) -> Result<(), DataError> {
        let parse_error = |message: String| DataError::Parse {
            table: "monster".to_string(),
            message,
        };
        if let Some(name) = state.get("name").and_then(Value::as_str) {
            self.name = name.to_string();
        }
        if let Some(raw) = state.get("instance_id").and_then(Value::as_str) {
            self.instance_id =
                Uuid::parse_str(raw).map_err(|err| parse_error(format!("instance_id: {err}")))?;
        }
        if let Some(level) = state.get("level").and_then(Value::as_u64) {
            self.level = level.clamp(1, u64::from(MAX_LEVEL)) as u32;
        }
        if let Some(total) = state.get("total_experience").and_then(Value::as_u64) {
            self.total_experience = total;
        }
        if let Some(slug) = state.get("taste_warm").and_then(Value::as_str) {
            self.taste_warm = named_taste(db, slug, TasteType::Warm)?;
        }
        if let Some(slug) = state.get("taste_cold").and_then(Value::as_str) {
            self.taste_cold = named_taste(db, slug, TasteType::Cold)?;
        }
        if let Some(raw) = state.get("modifiers") {
            self.modifiers = serde_json::from_value(raw.clone())
                .map_err(|err| parse_error(format!("modifiers: {err}")))?;
        }
        if let Some(rate) = state.get("catch_rate").and_then(Value::as_f64) {
            self.catch_rate = rate;
        }
        if let Some(bond) = state.get("bond").and_then(Value::as_u64) {
            self.bond = saturate(bond);
        }
        if let Some(steps) = state.get("steps").and_then(Value::as_u64) {
            self.steps = saturate(steps);
        }
        if let Some(wild) = state.get("wild").and_then(Value::as_bool) {
            self.wild = wild;
        }
        self.owner = state
            .get("owner")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(moves) = state.get("moves").and_then(Value::as_array) {
            self.moves.clear();
            for saved in moves.iter().take(MAX_MOVES) {
                let slug = saved
                    .get("slug")
                    .and_then(Value::as_str)
                    .ok_or_else(|| parse_error("move without slug".to_string()))?;
                let mut tech = db.lookup_technique(slug)?;
                tech.set_state(saved);
                self.moves.push(tech);
            }
        }
        if let Some(statuses) = state.get("status").and_then(Value::as_array) {
            self.status.clear();
            for saved in statuses {
                let slug = saved
                    .get("slug")
                    .and_then(Value::as_str)
                    .ok_or_else(|| parse_error("status without slug".to_string()))?;
                let mut status = if slug == FAINT {
                    Status::faint()
                } else {
                    db.lookup_status(slug)?
                };
                status.set_state(saved);
                self.status.push(status);
            }
        }

        let saved_hp = state
            .get("current_hp")
            .and_then(Value::as_u64)
            .map(saturate);
        self.current_hp = u32::MAX;
        self.set_stats();
        if let Some(hp) = saved_hp {
            self.current_hp = hp.min(self.stats.hp);
        }
        Ok(())
    }
}

impl ModifierTarget for Monster {
    fn modifier_types(&self) -> &[String] {
        &self.types
    }

    fn modifier_tags(&self) -> &[String] {
        &self.tags
    }
}

fn named_taste(db: &dyn DataStore, slug: &str, taste_type: TasteType) -> Result<Taste, DataError> {
    if slug == TASTELESS {
        Ok(Taste::tasteless(taste_type))
    } else {
        Ok(db.lookup_taste(slug)?)
    }
}

fn pick_taste<R: Rng + ?Sized>(
    db: &dyn DataStore,
    fixed: Option<&str>,
    taste_type: TasteType,
    rng: &mut R,
) -> Result<Taste, DataError> {
    if let Some(slug) = fixed {
        return named_taste(db, slug, taste_type);
    }
    let candidates = db.tastes_of(taste_type);
    Ok(candidates
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| Taste::tasteless(taste_type)))
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
