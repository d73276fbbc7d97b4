pub mod battle;
pub mod matrix;
pub mod model;

use crate::matrix::{compute_matrix, validate_rosters};
use crate::model::RostersFile;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::info;
use tuxemon_combat_core::prelude::*;

#[derive(Debug, Clone)]
pub struct CliOptions {
    pub rosters_path: PathBuf,
    pub sims_per_cell: usize,
    pub seed: u64,
    pub output_path: PathBuf,
    pub ai: AiKind,
}

pub fn load_rosters(session: &Session, path: &Path) -> anyhow::Result<RostersFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rosters file at {}", path.display()))?;
    let parsed: RostersFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
    validate_rosters(session, &parsed)?;
    Ok(parsed)
}

pub fn run(opts: CliOptions) -> anyhow::Result<()> {
    if opts.sims_per_cell == 0 {
        anyhow::bail!("--sims-per-cell must be > 0");
    }
    let session = Session::builtin()?;
    let rosters = load_rosters(&session, &opts.rosters_path)?;
    info!(
        rosters = rosters.rosters.len(),
        sims_per_cell = opts.sims_per_cell,
        ai = ?opts.ai,
        "computing matrix"
    );
    let matrix = compute_matrix(&session, &rosters, opts.sims_per_cell, opts.seed, opts.ai)?;
    let names: Vec<String> = rosters.rosters.iter().map(|r| r.name.clone()).collect();
    matrix::write_csv(&names, &matrix, &opts.output_path)?;
    println!(
        "Wrote {}x{} matrix to {}",
        matrix.len(),
        matrix.first().map(|r| r.len()).unwrap_or(0),
        opts.output_path.display()
    );
    Ok(())
}
