use crate::error::DataError;
use phf::phf_map;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

pub const FALLBACK_RIDDLE: &str = "fallback_riddle";

static DIFFICULTY_FACTORS: phf::Map<&'static str, f64> = phf_map! {
    "easy" => 1.0,
    "medium" => 1.5,
    "hard" => 2.0,
};

/// A player's (or simulated) answer. Numbers are compared by their text.
#[derive(Clone, Debug, PartialEq)]
pub enum AnswerInput {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl AnswerInput {
    fn normalized(&self) -> String {
        match self {
            AnswerInput::Text(text) => text.trim().to_lowercase(),
            AnswerInput::Integer(value) => value.to_string(),
            AnswerInput::Float(value) => format!("{value:?}"),
        }
    }
}

impl From<&str> for AnswerInput {
    fn from(text: &str) -> Self {
        AnswerInput::Text(text.to_string())
    }
}

impl From<String> for AnswerInput {
    fn from(text: String) -> Self {
        AnswerInput::Text(text)
    }
}

impl From<i64> for AnswerInput {
    fn from(value: i64) -> Self {
        AnswerInput::Integer(value)
    }
}

impl From<f64> for AnswerInput {
    fn from(value: f64) -> Self {
        AnswerInput::Float(value)
    }
}

fn one() -> f64 {
    1.0
}

fn default_reward() -> u64 {
    10
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Riddle {
    #[serde(default)]
    pub riddle_id: u32,
    pub slug: String,
    pub category: String,
    pub difficulty: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub alternate_answers: Vec<String>,
    #[serde(default)]
    pub hint: String,
    #[serde(default = "one")]
    pub damage_multiplier: f64,
    #[serde(default = "default_reward")]
    pub experience_reward: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip)]
    pub instance_id: Uuid,
}

impl Riddle {
    /// Served when no riddle can be found at all.
    pub fn fallback() -> Self {
        Self {
            riddle_id: 999,
            slug: FALLBACK_RIDDLE.to_string(),
            category: "math".to_string(),
            difficulty: "easy".to_string(),
            question: "What is 2 + 2?".to_string(),
            answer: "4".to_string(),
            alternate_answers: vec!["four".to_string()],
            hint: "Count on your fingers!".to_string(),
            damage_multiplier: 1.0,
            experience_reward: 5,
            tags: vec!["fallback".to_string(), "math".to_string()],
            name: "Simple Math".to_string(),
            description: "A simple addition problem".to_string(),
            instance_id: Uuid::nil(),
        }
    }

    /// Case- and whitespace-insensitive match against the answer and its
    /// alternates. No input and empty input never match.
    pub fn check_answer(&self, input: Option<&AnswerInput>) -> bool {
        let Some(input) = input else {
            return false;
        };
        let given = input.normalized();
        if given.is_empty() {
            return false;
        }
        std::iter::once(&self.answer)
            .chain(self.alternate_answers.iter())
            .any(|candidate| candidate.trim().to_lowercase() == given)
    }

    pub fn check_text(&self, answer: &str) -> bool {
        self.check_answer(Some(&AnswerInput::from(answer)))
    }

    pub fn difficulty_factor(&self) -> f64 {
        DIFFICULTY_FACTORS
            .get(self.difficulty.as_str())
            .copied()
            .unwrap_or(1.0)
    }

    pub fn get_damage_multiplier(&self) -> f64 {
        self.damage_multiplier * self.difficulty_factor()
    }

    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("Riddle #{}", self.riddle_id)
        } else {
            self.name.clone()
        }
    }

    pub fn validate(&self) -> Result<(), DataError> {
        let invalid = |message: &str| DataError::Invalid {
            table: "riddle".to_string(),
            slug: self.slug.clone(),
            message: message.to_string(),
        };
        if self.answer.trim().is_empty() {
            return Err(invalid("answer must not be empty"));
        }
        if self.category.is_empty() || self.difficulty.is_empty() {
            return Err(invalid("category and difficulty are required"));
        }
        if !(self.damage_multiplier.is_finite() && self.damage_multiplier >= 0.0) {
            return Err(DataError::OutOfRange {
                table: "riddle".to_string(),
                slug: self.slug.clone(),
                field: "damage_multiplier".to_string(),
                value: self.damage_multiplier,
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(())
    }

    pub fn get_state(&self) -> Value {
        json!({
            "slug": self.slug,
            "riddle_id": self.riddle_id,
            "category": self.category,
            "difficulty": self.difficulty,
            "question": self.question,
            "answer": self.answer,
            "alternate_answers": self.alternate_answers,
            "hint": self.hint,
            "damage_multiplier": self.damage_multiplier,
            "experience_reward": self.experience_reward,
            "name": self.name,
            "description": self.description,
            "tags": self.tags,
            "instance_id": self.instance_id.simple().to_string(),
        })
    }

    pub fn set_state(&mut self, state: &Value) {
        let text = |key: &str| state.get(key).and_then(Value::as_str).map(str::to_string);
        let list = |key: &str| {
            state.get(key).and_then(Value::as_array).map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
        };
        if let Some(slug) = text("slug") {
            self.slug = slug;
        }
        if let Some(id) = state.get("riddle_id").and_then(Value::as_u64) {
            self.riddle_id = id as u32;
        }
        if let Some(category) = text("category") {
            self.category = category;
        }
        if let Some(difficulty) = text("difficulty") {
            self.difficulty = difficulty;
        }
        if let Some(question) = text("question") {
            self.question = question;
        }
        if let Some(answer) = text("answer") {
            self.answer = answer;
        }
        if let Some(alternates) = list("alternate_answers") {
            self.alternate_answers = alternates;
        }
        if let Some(hint) = text("hint") {
            self.hint = hint;
        }
        if let Some(multiplier) = state.get("damage_multiplier").and_then(Value::as_f64) {
            self.damage_multiplier = multiplier;
        }
        if let Some(reward) = state.get("experience_reward").and_then(Value::as_u64) {
            self.experience_reward = reward;
        }
        if let Some(name) = text("name") {
            self.name = name;
        }
        if let Some(description) = text("description") {
            self.description = description;
        }
        if let Some(tags) = list("tags") {
            self.tags = tags;
        }
        if let Some(id) = text("instance_id").and_then(|raw| Uuid::parse_str(&raw).ok()) {
            self.instance_id = id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_riddle() -> Riddle {
        Riddle {
            question: "What is 7+5?".to_string(),
            answer: "12".to_string(),
            alternate_answers: vec!["twelve".to_string()],
            ..Riddle::fallback()
        }
    }

    #[test]
    fn accepts_answer_and_alternates_in_any_case() {
        let riddle = sum_riddle();
        for answer in ["12", "twelve", " 12 ", "TWELVE"] {
            assert!(riddle.check_text(answer), "{answer:?} should be accepted");
        }
        assert!(!riddle.check_text("11"));
        assert!(!riddle.check_text(""));
        assert!(!riddle.check_answer(None));
    }

    #[test]
    fn numbers_are_compared_as_text() {
        let riddle = sum_riddle();
        assert!(riddle.check_answer(Some(&AnswerInput::Integer(12))));
        assert!(!riddle.check_answer(Some(&AnswerInput::Float(12.5))));
        let half = Riddle {
            answer: "0.5".to_string(),
            ..Riddle::fallback()
        };
        assert!(half.check_answer(Some(&AnswerInput::Float(0.5))));
    }

    #[test]
    fn difficulty_scales_multiplier() {
        let mut riddle = Riddle::fallback();
        riddle.damage_multiplier = 2.0;
        riddle.difficulty = "hard".to_string();
        assert_eq!(riddle.get_damage_multiplier(), 4.0);
        riddle.difficulty = "medium".to_string();
        assert_eq!(riddle.get_damage_multiplier(), 3.0);
        riddle.difficulty = "legendary".to_string();
        assert_eq!(riddle.get_damage_multiplier(), 2.0);
    }

    #[test]
    fn fallback_is_the_documented_riddle() {
        let riddle = Riddle::fallback();
        assert_eq!(riddle.riddle_id, 999);
        assert!(riddle.check_text("four"));
        assert_eq!(riddle.experience_reward, 5);
    }

    #[test]
    fn state_restores_fields() {
        let mut original = sum_riddle();
        original.instance_id = Uuid::from_u128(42);
        let mut restored = Riddle::fallback();
        restored.set_state(&original.get_state());
        assert_eq!(restored, original);
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let riddle = Riddle {
            name: String::new(),
            riddle_id: 7,
            ..Riddle::fallback()
        };
        assert_eq!(riddle.display_name(), "Riddle #7");
    }
}
