//! Answer entry for a human player facing a riddle.
//!
//! The state advances on [`RiddleAnswerState::process_input`] and
//! [`RiddleAnswerState::update`]; once resolved, the verdict is handed out
//! exactly once through [`RiddleAnswerState::take_verdict`].

use super::model::Riddle;
use crate::config::RiddleConfig;
use crate::i18n::Translator;
use tracing::debug;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RiddlePhase {
    Presented,
    AnsweredCorrect,
    AnsweredIncorrect,
    Cancelled,
    Feedback,
    Resolved,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RiddleInput {
    Char(char),
    Backspace,
    ToggleHint,
    Submit,
    Cancel,
    /// Skip the rest of the feedback window.
    Confirm,
}

#[derive(Clone, Debug)]
pub struct RiddleAnswerState {
    riddle: Riddle,
    monster_name: String,
    phase: RiddlePhase,
    answer_input: String,
    show_hint: bool,
    answer_correct: bool,
    feedback_timer: f32,
    feedback_duration: f32,
    max_answer_length: usize,
    verdict_taken: bool,
}

fn title(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

impl RiddleAnswerState {
    pub fn new(riddle: Riddle, monster_name: impl Into<String>, config: &RiddleConfig) -> Self {
        Self {
            riddle,
            monster_name: monster_name.into(),
            phase: RiddlePhase::Presented,
            answer_input: String::new(),
            show_hint: false,
            answer_correct: false,
            feedback_timer: 0.0,
            feedback_duration: config.feedback_duration,
            max_answer_length: config.max_answer_length,
            verdict_taken: false,
        }
    }

    pub fn riddle(&self) -> &Riddle {
        &self.riddle
    }

    pub fn phase(&self) -> RiddlePhase {
        self.phase
    }

    pub fn answer_input(&self) -> &str {
        &self.answer_input
    }

    pub fn is_hint_shown(&self) -> bool {
        self.show_hint
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.phase, RiddlePhase::Resolved | RiddlePhase::Cancelled)
    }

    pub fn header(&self, translator: &dyn Translator) -> String {
        translator.format(
            "riddle_header",
            &[
                ("name", self.monster_name.clone()),
                ("difficulty", title(&self.riddle.difficulty)),
                ("category", title(&self.riddle.category)),
            ],
        )
    }

    pub fn question_text(&self, translator: &dyn Translator) -> String {
        format!("{}\n\n{}", self.header(translator), self.riddle.question)
    }

    pub fn hint_text(&self, translator: &dyn Translator) -> Option<String> {
        self.show_hint
            .then(|| translator.format("riddle_hint", &[("hint", self.riddle.hint.clone())]))
    }

    pub fn input_text(&self, translator: &dyn Translator) -> String {
        match self.feedback_text(translator) {
            Some(feedback) => format!("{feedback}\n\n{}", translator.translate("riddle_continue")),
            None => translator.format("riddle_input", &[("answer", self.answer_input.clone())]),
        }
    }

    /// Feedback shown once an answer was submitted.
    pub fn feedback_text(&self, translator: &dyn Translator) -> Option<String> {
        if !matches!(
            self.phase,
            RiddlePhase::AnsweredCorrect | RiddlePhase::AnsweredIncorrect | RiddlePhase::Feedback
        ) {
            return None;
        }
        let params = [
            ("answer", self.riddle.answer.clone()),
            ("name", self.monster_name.clone()),
        ];
        let text = if self.answer_correct {
            let mut text = translator.format("riddle_feedback_correct", &params);
            if self.riddle.experience_reward > 0 {
                text.push('\n');
                text.push_str(&translator.format(
                    "riddle_feedback_xp",
                    &[("xp", self.riddle.experience_reward.to_string())],
                ));
            }
            text
        } else {
            translator.format("riddle_feedback_incorrect", &params)
        };
        Some(text)
    }

    /// Returns false when the input has no effect in the current phase.
    pub fn process_input(&mut self, input: RiddleInput) -> bool {
        match self.phase {
            RiddlePhase::Presented => self.process_answer_input(input),
            RiddlePhase::AnsweredCorrect | RiddlePhase::AnsweredIncorrect | RiddlePhase::Feedback => {
                if input == RiddleInput::Confirm || input == RiddleInput::Submit {
                    self.finish();
                    true
                } else {
                    false
                }
            }
            RiddlePhase::Cancelled | RiddlePhase::Resolved => false,
        }
    }

    fn process_answer_input(&mut self, input: RiddleInput) -> bool {
        match input {
            RiddleInput::Char(ch) if !ch.is_control() => {
                if self.answer_input.chars().count() >= self.max_answer_length {
                    return false;
                }
                self.answer_input.extend(ch.to_lowercase());
                true
            }
            RiddleInput::Char(_) | RiddleInput::Confirm => false,
            RiddleInput::Backspace => self.answer_input.pop().is_some(),
            RiddleInput::ToggleHint => {
                if self.riddle.hint.is_empty() {
                    return false;
                }
                self.show_hint = !self.show_hint;
                true
            }
            RiddleInput::Submit => {
                self.answer_correct = self.riddle.check_text(&self.answer_input);
                self.phase = if self.answer_correct {
                    RiddlePhase::AnsweredCorrect
                } else {
                    RiddlePhase::AnsweredIncorrect
                };
                debug!(riddle = %self.riddle.slug, correct = self.answer_correct, "riddle answered");
                true
            }
            RiddleInput::Cancel => {
                self.answer_correct = false;
                self.phase = RiddlePhase::Cancelled;
                debug!(riddle = %self.riddle.slug, "riddle cancelled");
                true
            }
        }
    }

    /// Advance the feedback timer; feedback ends by itself after the
    /// configured duration.
    pub fn update(&mut self, dt: f32) {
        match self.phase {
            RiddlePhase::AnsweredCorrect | RiddlePhase::AnsweredIncorrect => {
                self.phase = RiddlePhase::Feedback;
                self.feedback_timer = dt;
            }
            RiddlePhase::Feedback => self.feedback_timer += dt,
            _ => return,
        }
        if self.feedback_timer >= self.feedback_duration {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.phase = RiddlePhase::Resolved;
    }

    /// The verdict, once, after resolution. Cancelling counts as wrong.
    pub fn take_verdict(&mut self) -> Option<bool> {
        if !self.is_resolved() || self.verdict_taken {
            return None;
        }
        self.verdict_taken = true;
        Some(self.answer_correct)
    }
}
