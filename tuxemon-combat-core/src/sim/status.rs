use crate::error::DataError;
use crate::sim::effects::Effect;
use crate::sim::modifier::Modifier;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

pub const FAINT: &str = "faint";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    Positive,
    Negative,
    #[default]
    Neutral,
}

/// What a newly applied status does to an existing one of a given category.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Replaced,
    Removed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub slug: String,
    #[serde(default)]
    pub category: StatusCategory,
    #[serde(default)]
    pub on_positive_status: Option<ResponseStatus>,
    #[serde(default)]
    pub on_negative_status: Option<ResponseStatus>,
    /// Number of status turns before expiry. 0 never expires.
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub nr_turn: u32,
    #[serde(default)]
    pub counter: u32,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default = "default_sort")]
    pub sort: String,
    /// Monster that inflicted the status (lifeleech drains towards it).
    #[serde(default)]
    pub link: Option<Uuid>,
    #[serde(default)]
    pub instance_id: Uuid,
    #[serde(default)]
    pub use_success: Option<String>,
    #[serde(default)]
    pub use_failure: Option<String>,
}

fn default_sort() -> String {
    "meta".to_string()
}

impl Status {
    pub fn new(slug: impl Into<String>, category: StatusCategory) -> Self {
        Self {
            slug: slug.into(),
            category,
            on_positive_status: None,
            on_negative_status: None,
            duration: 0,
            nr_turn: 0,
            counter: 0,
            effects: Vec::new(),
            modifiers: Vec::new(),
            sort: default_sort(),
            link: None,
            instance_id: Uuid::nil(),
            use_success: None,
            use_failure: None,
        }
    }

    /// Marker status left on fainted monsters.
    pub fn faint() -> Self {
        Self::new(FAINT, StatusCategory::Neutral)
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    pub fn has_reached_duration(&self) -> bool {
        self.duration > 0 && self.nr_turn >= self.duration
    }

    /// True when one of the effects swaps the host's chosen action for a skip.
    pub fn replaces_action(&self) -> bool {
        self.effects
            .iter()
            .any(|effect| matches!(effect, Effect::NoddingOff { .. }))
    }

    pub fn response_to(&self, existing: StatusCategory) -> Option<ResponseStatus> {
        match existing {
            StatusCategory::Positive => self.on_positive_status,
            StatusCategory::Negative => self.on_negative_status,
            StatusCategory::Neutral => Some(ResponseStatus::Replaced),
        }
    }

    pub fn validate(&self) -> Result<(), DataError> {
        for effect in &self.effects {
            effect.validate("status", &self.slug)?;
        }
        crate::sim::modifier::validate_modifiers("status", &self.slug, &self.modifiers)
    }

    pub fn get_state(&self) -> Value {
        json!({
            "slug": self.slug,
            "nr_turn": self.nr_turn,
            "counter": self.counter,
            "link": self.link.map(|id| id.to_string()),
            "instance_id": self.instance_id.to_string(),
        })
    }

    pub fn set_state(&mut self, state: &Value) {
        if let Some(nr_turn) = state.get("nr_turn").and_then(Value::as_u64) {
            self.nr_turn = nr_turn as u32;
        }
        if let Some(counter) = state.get("counter").and_then(Value::as_u64) {
            self.counter = counter as u32;
        }
        self.link = state
            .get("link")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok());
        if let Some(id) = state
            .get("instance_id")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
        {
            self.instance_id = id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_duration_never_expires() {
        let mut status = Status::new("focused", StatusCategory::Positive);
        status.nr_turn = 40;
        assert!(!status.has_reached_duration());
    }

    #[test]
    fn duration_reached_on_last_turn() {
        let mut status = Status::new("poison", StatusCategory::Negative).with_duration(3);
        status.nr_turn = 2;
        assert!(!status.has_reached_duration());
        status.nr_turn = 3;
        assert!(status.has_reached_duration());
    }

    #[test]
    fn neutral_existing_is_always_replaced() {
        let incoming = Status::new("poison", StatusCategory::Negative);
        assert_eq!(
            incoming.response_to(StatusCategory::Neutral),
            Some(ResponseStatus::Replaced)
        );
        assert_eq!(incoming.response_to(StatusCategory::Positive), None);
    }

    #[test]
    fn state_restores_link_and_turns() {
        let mut status = Status::new("lifeleech", StatusCategory::Negative);
        status.nr_turn = 2;
        status.link = Some(Uuid::from_u128(7));
        let saved = status.get_state();

        let mut restored = Status::new("lifeleech", StatusCategory::Negative);
        restored.set_state(&saved);
        assert_eq!(restored.nr_turn, 2);
        assert_eq!(restored.link, Some(Uuid::from_u128(7)));
    }
}
