//! Battle history kept per NPC.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::error;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleOutcome {
    Won,
    Lost,
    #[default]
    Draw,
}

impl BattleOutcome {
    pub const ALL: [BattleOutcome; 3] = [BattleOutcome::Won, BattleOutcome::Lost, BattleOutcome::Draw];

    pub fn as_str(self) -> &'static str {
        match self {
            BattleOutcome::Won => "won",
            BattleOutcome::Lost => "lost",
            BattleOutcome::Draw => "draw",
        }
    }
}

impl fmt::Display for BattleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BattleOutcome {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "won" => Ok(BattleOutcome::Won),
            "lost" => Ok(BattleOutcome::Lost),
            "draw" => Ok(BattleOutcome::Draw),
            other => Err(format!("'{other}' isn't a valid battle outcome.")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    #[serde(default = "Uuid::new_v4")]
    pub instance_id: Uuid,
    #[serde(default)]
    pub fighter: String,
    #[serde(default)]
    pub opponent: String,
    #[serde(default)]
    pub outcome: BattleOutcome,
    #[serde(default)]
    pub steps: u32,
}

impl Battle {
    pub fn new(
        instance_id: Uuid,
        fighter: impl Into<String>,
        opponent: impl Into<String>,
        outcome: BattleOutcome,
        steps: u32,
    ) -> Self {
        Self {
            instance_id,
            fighter: fighter.into(),
            opponent: opponent.into(),
            outcome,
            steps,
        }
    }

    pub fn get_state(&self) -> Value {
        json!({
            "instance_id": self.instance_id.simple().to_string(),
            "fighter": self.fighter,
            "opponent": self.opponent,
            "outcome": self.outcome,
            "steps": self.steps,
        })
    }

    pub fn set_state(&mut self, state: &Value) {
        if let Some(id) = state
            .get("instance_id")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
        {
            self.instance_id = id;
        }
        if let Some(fighter) = state.get("fighter").and_then(Value::as_str) {
            self.fighter = fighter.to_string();
        }
        if let Some(opponent) = state.get("opponent").and_then(Value::as_str) {
            self.opponent = opponent.to_string();
        }
        if let Some(outcome) = state
            .get("outcome")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
        {
            self.outcome = outcome;
        }
        if let Some(steps) = state.get("steps").and_then(Value::as_u64) {
            self.steps = steps as u32;
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct OutcomeSummary {
    pub total: u32,
    pub won: u32,
    pub lost: u32,
    pub draw: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BattlesHandler {
    battles: Vec<Battle>,
}

impl BattlesHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_battle(&mut self, battle: Battle) {
        self.battles.push(battle);
    }

    pub fn get_battles(&self) -> &[Battle] {
        &self.battles
    }

    pub fn clear_battles(&mut self) {
        self.battles.clear();
    }

    /// Whether `fighter` ever met `opponent` with this outcome. Unknown
    /// outcome names log an error and never match.
    pub fn has_fought_and_outcome(&self, fighter: &str, outcome: &str, opponent: &str) -> bool {
        let outcome = match outcome.parse::<BattleOutcome>() {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("{err}");
                return false;
            }
        };
        self.battles.iter().rev().any(|battle| {
            battle.fighter == fighter && battle.opponent == opponent && battle.outcome == outcome
        })
    }

    pub fn get_last_battle(&self) -> Option<&Battle> {
        self.battles.last()
    }

    pub fn get_last_battle_outcome(&self, fighter: &str, opponent: &str) -> Option<BattleOutcome> {
        self.battles
            .iter()
            .rev()
            .find(|battle| battle.fighter == fighter && battle.opponent == opponent)
            .map(|battle| battle.outcome)
    }

    pub fn get_battle_outcome_stats(&self, fighter: &str) -> BTreeMap<BattleOutcome, u32> {
        let mut stats: BTreeMap<BattleOutcome, u32> =
            BattleOutcome::ALL.iter().map(|outcome| (*outcome, 0)).collect();
        for battle in self.battles.iter().filter(|battle| battle.fighter == fighter) {
            *stats.entry(battle.outcome).or_insert(0) += 1;
        }
        stats
    }

    pub fn get_battle_outcome_summary(&self, fighter: &str) -> OutcomeSummary {
        let stats = self.get_battle_outcome_stats(fighter);
        let count = |outcome| stats.get(&outcome).copied().unwrap_or(0);
        OutcomeSummary {
            total: stats.values().sum(),
            won: count(BattleOutcome::Won),
            lost: count(BattleOutcome::Lost),
            draw: count(BattleOutcome::Draw),
        }
    }

    pub fn encode(&self) -> Vec<Value> {
        self.battles.iter().map(Battle::get_state).collect()
    }

    /// Replace the history with the `battles` list of a saved mapping.
    pub fn decode(&mut self, state: &Value) {
        let Some(saved) = state.get("battles").and_then(Value::as_array) else {
            return;
        };
        self.battles = saved
            .iter()
            .map(|entry| {
                let mut battle = Battle::new(Uuid::nil(), "", "", BattleOutcome::Draw, 0);
                battle.set_state(entry);
                battle
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> BattlesHandler {
        let mut handler = BattlesHandler::new();
        handler.add_battle(Battle::new(Uuid::from_u128(1), "player", "rival", BattleOutcome::Lost, 10));
        handler.add_battle(Battle::new(Uuid::from_u128(2), "player", "rival", BattleOutcome::Won, 25));
        handler.add_battle(Battle::new(Uuid::from_u128(3), "player", "wild", BattleOutcome::Draw, 30));
        handler.add_battle(Battle::new(Uuid::from_u128(4), "rival", "player", BattleOutcome::Won, 10));
        handler
    }

    #[test]
    fn fought_and_outcome() {
        let handler = handler();
        assert!(handler.has_fought_and_outcome("player", "lost", "rival"));
        assert!(!handler.has_fought_and_outcome("player", "draw", "rival"));
        assert!(!handler.has_fought_and_outcome("player", "victory", "rival"));
    }

    #[test]
    fn last_outcome_is_most_recent() {
        let handler = handler();
        assert_eq!(handler.get_last_battle_outcome("player", "rival"), Some(BattleOutcome::Won));
        assert_eq!(handler.get_last_battle_outcome("wild", "player"), None);
        assert_eq!(handler.get_last_battle().map(|b| b.fighter.as_str()), Some("rival"));
    }

    #[test]
    fn summary_counts_only_fighter() {
        let summary = handler().get_battle_outcome_summary("player");
        assert_eq!(
            summary,
            OutcomeSummary {
                total: 3,
                won: 1,
                lost: 1,
                draw: 1
            }
        );
    }

    #[test]
    fn encode_then_decode_keeps_history() {
        let original = handler();
        let saved = json!({ "battles": original.encode() });
        let mut restored = BattlesHandler::new();
        restored.decode(&saved);
        assert_eq!(restored, original);
    }
}
