use serde::Deserialize;
use std::collections::HashMap;

pub const MAX_PARTY_SIZE: usize = 6;

fn default_level() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    pub species: String,
    #[serde(default = "default_level")]
    pub level: u32,
}

/// A named party that fights every other party in the matrix.
#[derive(Debug, Clone, Deserialize)]
pub struct Roster {
    pub name: String,
    pub monsters: Vec<RosterEntry>,
}

#[derive(Debug, Deserialize)]
pub struct RostersFile {
    pub rosters: Vec<Roster>,
    #[serde(flatten, default)]
    pub extras: HashMap<String, serde_json::Value>,
}
