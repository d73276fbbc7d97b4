use anyhow::Result;
use std::io::{self, Write};
use tuxemon_combat_core::battle_logger::CombatEvent;
use tuxemon_combat_core::i18n::Translator;
use tuxemon_combat_core::riddle::RiddleAnswerState;
use tuxemon_combat_core::sim::Monster;

pub const HINT_COMMAND: &str = ":hint";
pub const QUIT_COMMAND: &str = ":quit";

pub fn print_monster(monster: &Monster, display_name: &str) {
    println!(
        "Found monster: {} ({}) Lv.{} Types: {}",
        display_name,
        monster.slug,
        monster.level,
        monster.types.join(" / ")
    );
    println!(
        "Shape: {}  Tastes: {} (warm) / {} (cold)",
        monster.shape.slug, monster.taste_warm.slug, monster.taste_cold.slug
    );
    let stats = monster.stats;
    println!(
        "Stats - HP: {}, Melee: {}, Ranged: {}, Armour: {}, Dodge: {}, Speed: {}",
        stats.hp, stats.melee, stats.ranged, stats.armour, stats.dodge, stats.speed
    );
    let moves: Vec<&str> = monster.moves.iter().map(|tech| tech.slug.as_str()).collect();
    println!("Techniques: {}", moves.join(", "));
}

/// Question, optional hint and the answer typed so far.
pub fn print_riddle(state: &RiddleAnswerState, translator: &dyn Translator) {
    println!();
    println!("=== {} ===", state.header(translator));
    println!("{}", state.riddle().question);
    if let Some(hint) = state.hint_text(translator) {
        println!("{hint}");
    }
    println!("(type {HINT_COMMAND} for a hint, {QUIT_COMMAND} to give up)");
}

pub fn print_events(events: &[CombatEvent]) {
    for event in events {
        if event.text.is_empty() {
            continue;
        }
        if event.damage > 0 {
            println!("  {} (-{})", event.text, event.damage);
        } else {
            println!("  {}", event.text);
        }
    }
}

pub fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    read_line()
}

fn read_line() -> Result<String> {
    let mut buf = String::new();
    io::stdout().flush()?;
    io::stdin().read_line(&mut buf)?;
    Ok(buf.trim_end_matches(['\r', '\n']).to_string())
}
