use serde::{Deserialize, Serialize};
use tracing::error;

/// Element slug that neutralises type multipliers on either side.
pub const AETHER: &str = "aether";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementMultiplier {
    pub against: String,
    pub multiplier: f64,
}

/// An elemental type and its attack multipliers against other elements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub slug: String,
    #[serde(default)]
    pub types: Vec<ElementMultiplier>,
}

impl Element {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            types: Vec::new(),
        }
    }

    pub fn with_multiplier(mut self, against: &str, multiplier: f64) -> Self {
        self.types.push(ElementMultiplier {
            against: against.to_string(),
            multiplier,
        });
        self
    }

    /// Multiplier of this element attacking `target`. Missing entries are a
    /// data gap, not a failure: they log and fall back to neutral.
    pub fn lookup_multiplier(&self, target: &str) -> f64 {
        match self.types.iter().find(|entry| entry.against == target) {
            Some(entry) => entry.multiplier,
            None => {
                error!(
                    element = %self.slug,
                    target = %target,
                    "no multiplier defined, using 1.0"
                );
                1.0
            }
        }
    }
}
