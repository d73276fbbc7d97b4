//! Riddle battles: monsters attack by answering riddles instead of picking
//! a technique.

pub mod ai;
pub mod manager;
pub mod model;
pub mod state;

pub use ai::{RiddleAI, RiddleTurn};
pub use manager::RiddleManager;
pub use model::{AnswerInput, Riddle, FALLBACK_RIDDLE};
pub use state::{RiddleAnswerState, RiddleInput, RiddlePhase};

use crate::config::RiddleConfig;
use crate::db::DataStore;
use crate::error::LookupError;
use crate::sim::technique::{Technique, RIDDLE_CORRECT, RIDDLE_INCORRECT};

/// The technique a riddle outcome turns into. A correct answer hits for the
/// base power scaled by the riddle; a wrong one costs a fixed penalty.
pub fn riddle_technique(
    db: &dyn DataStore,
    config: &RiddleConfig,
    riddle: &Riddle,
    correct: bool,
) -> Result<Technique, LookupError> {
    let mut technique = if correct {
        let mut tech = db.lookup_technique(RIDDLE_CORRECT)?;
        tech.power = config.correct_base_power * riddle.get_damage_multiplier();
        tech
    } else {
        let mut tech = db.lookup_technique(RIDDLE_INCORRECT)?;
        tech.power = config.incorrect_penalty;
        tech
    };
    technique.full_recharge();
    Ok(technique)
}
