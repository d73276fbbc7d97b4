mod ui;

use anyhow::{anyhow, Context};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::env;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use tuxemon_combat_core::engine::FAST_FORWARD;
use tuxemon_combat_core::i18n::{translate_monster, translate_technique};
use tuxemon_combat_core::prelude::*;
use tuxemon_combat_core::riddle::manager::difficulty_for_level;
use tuxemon_combat_core::riddle::RiddlePhase;

const RIDDLE_ERROR_LOG: &str = "riddle_errors.log";
const DEFAULT_LEVEL: u32 = 10;
const DEFAULT_SEED: u64 = 0xBADC0DE;

fn main() -> anyhow::Result<()> {
    let _guard = setup_logging()?;
    let session = Session::builtin()?;
    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("check-monster") => {
            let slug = args
                .next()
                .ok_or_else(|| anyhow!("Usage: cargo run -- check-monster <slug> [level]"))?;
            let level = match args.next() {
                Some(level) => level.parse().context("level must be a number")?,
                None => DEFAULT_LEVEL,
            };
            check_monster(&session, &slug, level)
        }
        Some("check-technique") => {
            let slug = args
                .next()
                .ok_or_else(|| anyhow!("Usage: cargo run -- check-technique <slug>"))?;
            check_technique(&session, &slug)
        }
        Some("riddle") => {
            let mut category = None;
            let mut difficulty = None;
            let mut level = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--category" => category = args.next(),
                    "--difficulty" => difficulty = args.next(),
                    "--level" => {
                        let value = args.next().ok_or_else(|| anyhow!("--level requires a number"))?;
                        level = Some(value.parse::<u32>().context("level must be a number")?);
                    }
                    other => return Err(anyhow!("Unknown arg '{}' for riddle", other)),
                }
            }
            play_riddle(&session, category, difficulty, level)
        }
        Some("run-battle") => {
            let mut seed = DEFAULT_SEED;
            let mut out_path: Option<String> = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--seed" => {
                        let value = args.next().ok_or_else(|| anyhow!("--seed requires a number"))?;
                        seed = value.parse().context("seed must be a number")?;
                    }
                    "--log-json" => out_path = args.next(),
                    other => return Err(anyhow!("Unknown arg '{}' for run-battle", other)),
                }
            }
            run_battle(&session, seed, out_path.as_deref())
        }
        Some(cmd) => Err(anyhow!("Unknown command '{}'", cmd)),
        None => run_battle(&session, DEFAULT_SEED, None),
    }
}

/// Diagnostics go to stderr; riddle failures are also kept in a file next
/// to the working directory.
fn setup_logging() -> anyhow::Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::never(".", RIDDLE_ERROR_LOG);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);
    let riddle_targets = Targets::new()
        .with_target("tuxemon_combat_core::riddle", LevelFilter::ERROR);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(riddle_targets);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to install logging: {e}"))?;
    Ok(guard)
}

fn check_monster(session: &Session, slug: &str, level: u32) -> anyhow::Result<()> {
    let mut rng = SmallRng::seed_from_u64(DEFAULT_SEED);
    let monster = Monster::spawn(session.db(), slug, level, &mut rng)
        .with_context(|| format!("Monster '{}' not found", slug))?;
    ui::print_monster(&monster, &translate_monster(slug));
    Ok(())
}

fn check_technique(session: &Session, slug: &str) -> anyhow::Result<()> {
    let tech = session
        .db()
        .lookup_technique(slug)
        .with_context(|| format!("Technique '{}' not found", slug))?;
    println!(
        "Found technique: {} ({}) sort: {}, range: {}, types: {}",
        translate_technique(slug),
        tech.slug,
        tech.sort.as_str(),
        tech.range.as_str(),
        tech.types.join(" / ")
    );
    println!(
        "Power: {}, accuracy: {}, potency: {}, recharge: {}",
        tech.power, tech.accuracy, tech.potency, tech.recharge_length
    );
    let effects: Vec<&str> = tech.effects.iter().map(|effect| effect.name()).collect();
    println!("Effects: {}", effects.join(", "));
    Ok(())
}

fn play_riddle(
    session: &Session,
    category: Option<String>,
    difficulty: Option<String>,
    level: Option<u32>,
) -> anyhow::Result<()> {
    let mut rng = SmallRng::from_entropy();
    let config = &session.config().riddle;
    let difficulty = difficulty.or_else(|| level.map(|lvl| difficulty_for_level(config, lvl).to_string()));
    let riddle = session
        .riddles()
        .get_random_riddle(category.as_deref(), difficulty.as_deref(), None, &mut rng);
    let mut state = RiddleAnswerState::new(riddle, "You", config);

    while state.phase() == RiddlePhase::Presented {
        ui::print_riddle(&state, session.translator());
        let line = ui::prompt("> ")?;
        match line.trim() {
            ui::HINT_COMMAND => {
                state.process_input(RiddleInput::ToggleHint);
            }
            ui::QUIT_COMMAND => {
                state.process_input(RiddleInput::Cancel);
            }
            answer => {
                for ch in answer.chars() {
                    state.process_input(RiddleInput::Char(ch));
                }
                state.process_input(RiddleInput::Submit);
            }
        }
    }
    if state.phase() == RiddlePhase::Cancelled {
        println!("Given up. The answer was '{}'.", state.riddle().answer);
        return Ok(());
    }
    if let Some(feedback) = state.feedback_text(session.translator()) {
        println!("{feedback}");
    }
    state.update(config.feedback_duration);
    let solved = state.take_verdict().unwrap_or(false);
    tracing::debug!(riddle = %state.riddle().slug, solved, "riddle finished");
    Ok(())
}

fn random_trainer(session: &Session, slug: &str, name: &str, rng: &mut SmallRng) -> anyhow::Result<Npc> {
    const SPECIES: [&str; 6] = ["rockitten", "budaye", "bigfin", "djinnbo", "nudimind", "cardiling"];
    let mut npc = Npc::new(slug, name).with_controller(Controller::Ai(AiKind::Technique));
    let picks: Vec<&str> = SPECIES.choose_multiple(rng, 2).copied().collect();
    for species in picks {
        npc.add_monster(Monster::spawn(session.db(), species, DEFAULT_LEVEL, rng)?);
    }
    Ok(npc)
}

fn run_battle(session: &Session, seed: u64, out_path: Option<&str>) -> anyhow::Result<()> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let teams = vec![
        random_trainer(session, "team_a", "Team A", &mut rng)?,
        random_trainer(session, "team_b", "Team B", &mut rng)?,
    ];
    let ctx = CombatContext::new(teams, CombatType::Trainer, "", BattleMode::Single)?;
    let mut engine = CombatEngine::new(session, ctx, seed);

    println!("=== Tuxemon battle (seed {seed}) ===");
    while !engine.is_terminal() {
        let step = engine.step(FAST_FORWARD);
        ui::print_events(&step.events);
        if engine.state().awaiting_input() {
            return Err(anyhow!("battle is waiting for input it will never get"));
        }
    }
    let outcome = engine.state().outcome().unwrap_or(MatchOutcome::Draw);
    let winner = match outcome {
        MatchOutcome::Winner(team) => engine
            .state()
            .context()
            .team(team)
            .map(|npc| npc.name.clone())
            .unwrap_or_default(),
        MatchOutcome::Draw | MatchOutcome::RanAway(_) => "nobody".to_string(),
    };
    println!("\nWinner: {} after {} turns", winner, engine.state().turn());

    if let Some(path) = out_path {
        let log = engine.state().log().to_json();
        fs::write(path, serde_json::to_string_pretty(&log)? + "\n")
            .with_context(|| format!("failed to write {}", path))?;
        println!("Wrote battle log to {path}");
    }
    Ok(())
}
