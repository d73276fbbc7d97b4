//! Turn-based monster combat: data tables, the phase-driven battle state
//! machine, technique/item/status effects and riddle battles.
//!
//! Most callers build a [`session::Session`] once and drive battles through
//! [`engine::CombatEngine`]. Interactive front-ends talk to
//! [`sim::battle::CombatState`] directly.

pub mod battle_logger;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod i18n;
pub mod npc;
pub mod records;
pub mod riddle;
pub mod session;
pub mod sim;
pub mod ui;

/// Commonly used exports for external consumers.
pub mod prelude {
    pub use crate::battle_logger::{CombatEvent, CombatLog};
    pub use crate::config::CombatConfig;
    pub use crate::db::{DataStore, Database};
    pub use crate::engine::{CombatEngine, StepResult, FAST_FORWARD};
    pub use crate::error::{CombatError, CombatResult, DataError, LookupError};
    pub use crate::npc::{AiKind, Controller, Npc};
    pub use crate::records::{Battle, BattleOutcome};
    pub use crate::riddle::{Riddle, RiddleAnswerState, RiddleInput, RiddleManager};
    pub use crate::session::Session;
    pub use crate::sim::ai::{BattleAI, Decision};
    pub use crate::sim::battle::{CombatPhase, CombatState, MatchOutcome};
    pub use crate::sim::context::{BattleMode, CombatContext, CombatType};
    pub use crate::sim::{Monster, Technique};
    pub use crate::ui::{HeadlessUi, UiHost};
}
