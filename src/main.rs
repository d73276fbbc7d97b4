use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tuxemon_battle_matrix::{run, CliOptions};
use tuxemon_combat_core::npc::AiKind;

fn usage() -> ! {
    eprintln!(
        "Usage: cargo run --release -- [--rosters rosters.json] [--sims-per-cell N] [--seed SEED] \
[--output matrix.csv] [--ai technique|riddle]"
    );
    std::process::exit(1);
}

fn parse_args() -> anyhow::Result<CliOptions> {
    let mut rosters_path = PathBuf::from("rosters.json");
    let mut sims_per_cell = 100usize;
    let mut seed = 0u64;
    let mut output_path = PathBuf::from("matrix.csv");
    let mut ai = AiKind::Technique;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--rosters" => {
                rosters_path = args.next().map(PathBuf::from).ok_or_else(|| {
                    anyhow::anyhow!("--rosters requires a path (e.g. --rosters rosters.json)")
                })?;
            }
            "--sims-per-cell" => {
                let val = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--sims-per-cell requires a number"))?;
                sims_per_cell = val.parse()?;
            }
            "--seed" => {
                let val = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--seed requires a number"))?;
                seed = val.parse()?;
            }
            "--output" => {
                output_path = args.next().map(PathBuf::from).ok_or_else(|| {
                    anyhow::anyhow!("--output requires a path (e.g. --output matrix.csv)")
                })?;
            }
            "--ai" => {
                let val = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--ai requires technique or riddle"))?;
                ai = match val.to_ascii_lowercase().as_str() {
                    "technique" => AiKind::Technique,
                    "riddle" => AiKind::Riddle,
                    other => anyhow::bail!("Unknown AI {other} (use technique or riddle)"),
                };
            }
            "--help" | "-h" => usage(),
            other => return Err(anyhow::anyhow!("Unknown argument {other}")),
        }
    }

    Ok(CliOptions {
        rosters_path,
        sims_per_cell,
        seed,
        output_path,
        ai,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let opts = parse_args()?;
    run(opts)
}
