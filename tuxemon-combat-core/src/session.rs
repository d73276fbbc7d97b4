//! Everything a battle reads but never owns: game data, tuning, riddles and
//! the message translator. Built once and shared by reference, across
//! threads in batch runs.

use crate::config::CombatConfig;
use crate::db::{DataStore, Database};
use crate::error::DataError;
use crate::i18n::{JsonTranslator, Translator};
use crate::riddle::RiddleManager;

pub struct Session {
    db: Box<dyn DataStore>,
    config: CombatConfig,
    riddles: RiddleManager,
    translator: Box<dyn Translator>,
}

impl Session {
    pub fn new(db: Box<dyn DataStore>, config: CombatConfig, translator: Box<dyn Translator>) -> Self {
        let riddles = RiddleManager::new(db.as_ref(), &config.riddle);
        Self {
            db,
            config,
            riddles,
            translator,
        }
    }

    /// Built-in data, default tuning and English messages.
    pub fn builtin() -> Result<Self, DataError> {
        Ok(Self::new(
            Box::new(Database::builtin()?),
            CombatConfig::default(),
            Box::new(JsonTranslator),
        ))
    }

    pub fn with_config(mut self, config: CombatConfig) -> Self {
        self.riddles = RiddleManager::new(self.db.as_ref(), &config.riddle);
        self.config = config;
        self
    }

    pub fn db(&self) -> &dyn DataStore {
        self.db.as_ref()
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn riddles(&self) -> &RiddleManager {
        &self.riddles
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_session_has_riddles() {
        let session = Session::builtin().expect("builtin data");
        assert!(session.riddles().riddle_count() > 0);
        assert!(session.db().lookup_technique("ram").is_ok());
        assert_eq!(session.config().max_turns, 500);
    }

    #[test]
    fn config_swap_rebuilds_riddles() {
        let mut config = CombatConfig::default();
        config.max_turns = 20;
        let session = Session::builtin().expect("builtin data").with_config(config);
        assert_eq!(session.config().max_turns, 20);
        assert!(session.riddles().riddle_count() > 0);
    }
}
