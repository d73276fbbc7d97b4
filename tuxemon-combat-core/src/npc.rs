//! Battle participants: a trainer (or a wild monster's stand-in) with a
//! roster, an inventory and a battle history.

use crate::db::DataStore;
use crate::error::DataError;
use crate::records::BattlesHandler;
use crate::sim::monster::Monster;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Which AI picks actions for an AI-controlled team.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiKind {
    #[default]
    Technique,
    Random,
    Riddle,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Controller {
    Human,
    Ai(AiKind),
}

#[derive(Clone, Debug)]
pub struct Npc {
    pub slug: String,
    pub name: String,
    pub monsters: Vec<Monster>,
    pub battles: BattlesHandler,
    pub controller: Controller,
    pub steps: u32,
    pub run_attempts: u32,
    pub inventory: BTreeMap<String, u32>,
}

impl Npc {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            monsters: Vec::new(),
            battles: BattlesHandler::new(),
            controller: Controller::Ai(AiKind::default()),
            steps: 0,
            run_attempts: 0,
            inventory: BTreeMap::new(),
        }
    }

    pub fn human(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            controller: Controller::Human,
            ..Self::new(slug, name)
        }
    }

    pub fn with_controller(mut self, controller: Controller) -> Self {
        self.controller = controller;
        self
    }

    pub fn is_ai(&self) -> bool {
        matches!(self.controller, Controller::Ai(_))
    }

    pub fn ai_kind(&self) -> Option<AiKind> {
        match self.controller {
            Controller::Ai(kind) => Some(kind),
            Controller::Human => None,
        }
    }

    pub fn add_monster(&mut self, mut monster: Monster) {
        monster.owner = Some(self.slug.clone());
        self.monsters.push(monster);
    }

    pub fn remove_monster(&mut self, id: Uuid) -> Option<Monster> {
        let index = self
            .monsters
            .iter()
            .position(|monster| monster.instance_id == id)?;
        Some(self.monsters.remove(index))
    }

    pub fn conscious_monsters(&self) -> impl Iterator<Item = &Monster> {
        self.monsters.iter().filter(|monster| !monster.is_fainted())
    }

    pub fn add_item(&mut self, slug: impl Into<String>, quantity: u32) {
        *self.inventory.entry(slug.into()).or_insert(0) += quantity;
    }

    pub fn item_quantity(&self, slug: &str) -> u32 {
        self.inventory.get(slug).copied().unwrap_or(0)
    }

    /// Consume one `slug`; false if none left.
    pub fn take_item(&mut self, slug: &str) -> bool {
        match self.inventory.get_mut(slug) {
            Some(quantity) if *quantity > 0 => {
                *quantity -= 1;
                if *quantity == 0 {
                    self.inventory.remove(slug);
                }
                true
            }
            _ => false,
        }
    }

    pub fn get_state(&self) -> Value {
        json!({
            "slug": self.slug,
            "name": self.name,
            "controller": self.controller,
            "steps": self.steps,
            "inventory": self.inventory,
            "monsters": self.monsters.iter().map(Monster::get_state).collect::<Vec<_>>(),
            "battles": self.battles.encode(),
        })
    }

    pub fn set_state(&mut self, state: &Value, db: &dyn DataStore) -> Result<(), DataError> {
        let parse_error = |message: String| DataError::Parse {
            table: "npc".to_string(),
            message,
        };
        if let Some(name) = state.get("name").and_then(Value::as_str) {
            self.name = name.to_string();
        }
        if let Some(raw) = state.get("controller") {
            self.controller = serde_json::from_value(raw.clone())
                .map_err(|err| parse_error(format!("controller: {err}")))?;
        }
        if let Some(steps) = state.get("steps").and_then(Value::as_u64) {
            self.steps = steps as u32;
        }
        if let Some(raw) = state.get("inventory") {
            self.inventory = serde_json::from_value(raw.clone())
                .map_err(|err| parse_error(format!("inventory: {err}")))?;
        }
        if let Some(saved) = state.get("monsters").and_then(Value::as_array) {
            let mut rng = rand::thread_rng();
            self.monsters.clear();
            for entry in saved {
                let slug = entry
                    .get("slug")
                    .and_then(Value::as_str)
                    .ok_or_else(|| parse_error("monster without slug".to_string()))?;
                let level = entry.get("level").and_then(Value::as_u64).unwrap_or(1) as u32;
                let mut monster = Monster::spawn(db, slug, level, &mut rng)?;
                monster.set_state(entry, db)?;
                self.monsters.push(monster);
            }
        }
        self.battles.decode(state);
        Ok(())
    }
}
