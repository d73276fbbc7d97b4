//! English message templates and the translation seam used by combat.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::error;

#[derive(Default, Deserialize)]
struct Translations {
    messages: HashMap<String, String>,
    techniques: HashMap<String, String>,
    monsters: HashMap<String, String>,
    items: HashMap<String, String>,
}

static TRANSLATIONS: Lazy<Translations> = Lazy::new(|| {
    let json_str = include_str!("../translations/en.json");
    serde_json::from_str(json_str).unwrap_or_else(|err| {
        error!(%err, "failed to parse translations/en.json");
        Translations::default()
    })
});

/// Turns message slugs into player-facing text.
pub trait Translator: Send + Sync {
    fn translate(&self, key: &str) -> String;

    /// Substitute `{name}` placeholders in the translated template of `key`.
    fn format(&self, key: &str, params: &[(&str, String)]) -> String {
        let mut text = self.translate(key);
        for (name, value) in params {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

/// Serves the embedded English templates. Unknown keys come back verbatim.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonTranslator;

impl Translator for JsonTranslator {
    fn translate(&self, key: &str) -> String {
        TRANSLATIONS
            .messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

pub fn translate_technique(slug: &str) -> String {
    TRANSLATIONS
        .techniques
        .get(slug)
        .cloned()
        .unwrap_or_else(|| slug.to_string())
}

pub fn translate_monster(slug: &str) -> String {
    TRANSLATIONS
        .monsters
        .get(slug)
        .cloned()
        .unwrap_or_else(|| slug.to_string())
}

pub fn translate_item(slug: &str) -> String {
    TRANSLATIONS
        .items
        .get(slug)
        .cloned()
        .unwrap_or_else(|| slug.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_placeholders() {
        let text = JsonTranslator.format(
            "combat_used_x",
            &[("user", "Rockitten".to_string()), ("name", translate_technique("ram"))],
        );
        assert_eq!(text, "Rockitten used Ram!");
    }

    #[test]
    fn unknown_keys_fall_back() {
        assert_eq!(JsonTranslator.translate("no_such_message"), "no_such_message");
        assert_eq!(translate_monster("missingno"), "missingno");
        assert_eq!(translate_item("tuxeball"), "Tuxeball");
    }
}
