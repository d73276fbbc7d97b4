//! Screens the combat state asks its host to show.

use serde_json::Value;

pub const MAIN_COMBAT_MENU: &str = "MainCombatMenuState";
pub const MONSTER_MENU: &str = "MonsterMenuState";
pub const RIDDLE_ANSWER: &str = "RiddleAnswerState";
pub const COMBAT_MESSAGE: &str = "CombatMessage";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct UiStateId(pub u64);

/// State stack of the embedding game. Rendering is the host's business.
pub trait UiHost {
    fn push_state(&mut self, name: &str, params: Value) -> UiStateId;
    fn pop_state(&mut self) -> Option<UiStateId>;
    fn get_state_by_name(&self, name: &str) -> Option<UiStateId>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct UiEntry {
    pub id: UiStateId,
    pub name: String,
    pub params: Value,
}

/// Keeps the stack in memory. Used by tests, the CLI and batch runs.
#[derive(Clone, Debug, Default)]
pub struct HeadlessUi {
    next_id: u64,
    stack: Vec<UiEntry>,
    pushed: Vec<String>,
}

impl HeadlessUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack(&self) -> &[UiEntry] {
        &self.stack
    }

    pub fn top(&self) -> Option<&UiEntry> {
        self.stack.last()
    }

    /// Names of every state ever pushed, oldest first.
    pub fn pushed(&self) -> &[String] {
        &self.pushed
    }
}

impl UiHost for HeadlessUi {
    fn push_state(&mut self, name: &str, params: Value) -> UiStateId {
        self.next_id += 1;
        let id = UiStateId(self.next_id);
        self.stack.push(UiEntry {
            id,
            name: name.to_string(),
            params,
        });
        self.pushed.push(name.to_string());
        id
    }

    fn pop_state(&mut self) -> Option<UiStateId> {
        self.stack.pop().map(|entry| entry.id)
    }

    fn get_state_by_name(&self, name: &str) -> Option<UiStateId> {
        self.stack
            .iter()
            .rev()
            .find(|entry| entry.name == name)
            .map(|entry| entry.id)
    }
}
