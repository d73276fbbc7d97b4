use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

/// One thing the player should be told about, in display order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CombatEvent {
    pub turn: u32,
    /// Message slug, translated into `text` by the combat's translator.
    pub message: String,
    pub params: BTreeMap<String, String>,
    pub text: String,
    pub damage: u32,
    pub element_multiplier: f64,
}

impl CombatEvent {
    pub fn new(turn: u32, message: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            turn,
            message: message.into(),
            params: BTreeMap::new(),
            text: text.into(),
            damage: 0,
            element_multiplier: 1.0,
        }
    }
}

/// Transcript of a battle: compact protocol lines plus the translated
/// events shown to the player.
#[derive(Clone, Debug, Default)]
pub struct CombatLog {
    graphics: String,
    log: Vec<String>,
    events: Vec<CombatEvent>,
}

impl CombatLog {
    pub fn new(graphics: impl Into<String>) -> Self {
        Self {
            graphics: graphics.into(),
            log: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn log_turn(&mut self, turn: u32) {
        self.log.push(format!("|turn|{turn}"));
    }

    pub fn log_action(&mut self, user: &str, method: &str, target: &str) {
        self.log.push(format!("|move|{user}|{method}|{target}"));
    }

    pub fn log_damage(&mut self, target: &str, hp: u32, max_hp: u32) {
        self.log.push(format!("|-damage|{target}|{hp}/{max_hp}"));
    }

    pub fn log_heal(&mut self, target: &str, hp: u32, max_hp: u32) {
        self.log.push(format!("|-heal|{target}|{hp}/{max_hp}"));
    }

    pub fn log_status(&mut self, target: &str, status: &str) {
        self.log.push(format!("|-status|{target}|{status}"));
    }

    pub fn log_riddle(&mut self, monster: &str, riddle: &str, correct: bool) {
        let verdict = if correct { "correct" } else { "incorrect" };
        self.log.push(format!("|riddle|{monster}|{riddle}|{verdict}"));
    }

    pub fn log_faint(&mut self, monster: &str) {
        self.log.push(format!("|faint|{monster}"));
    }

    pub fn log_switch(&mut self, team: usize, monster: &str, hp: u32, max_hp: u32) {
        self.log.push(format!("|switch|{}|{monster}|{hp}/{max_hp}", side_ident(team)));
    }

    pub fn log_win(&mut self, winner: &str) {
        self.log.push(format!("|win|{winner}"));
    }

    pub fn log_tie(&mut self) {
        self.log.push("|tie|".to_string());
    }

    pub fn log_run(&mut self, npc: &str) {
        self.log.push(format!("|run|{npc}"));
    }

    pub fn push_event(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "graphics": self.graphics,
            "log": self.log,
            "events": self.events,
        })
    }
}

pub fn side_ident(team: usize) -> &'static str {
    if team == 0 {
        "p1"
    } else {
        "p2"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_export_keeps_order() {
        let mut log = CombatLog::new("gfx/combat/forest");
        log.log_turn(1);
        log.log_action("Rockitten", "ram", "Budaye");
        log.log_damage("Budaye", 10, 40);
        log.push_event(CombatEvent::new(1, "combat_used_x", "Rockitten used Ram!"));
        let exported = log.to_json();
        assert_eq!(exported["log"][0], "|turn|1");
        assert_eq!(exported["log"][2], "|-damage|Budaye|10/40");
        assert_eq!(exported["events"][0]["message"], "combat_used_x");
        assert_eq!(exported["graphics"], "gfx/combat/forest");
    }
}
