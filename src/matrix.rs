use crate::battle::{simulate_battle, BattleResult};
use crate::model::{RostersFile, MAX_PARTY_SIZE};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;
use tuxemon_combat_core::prelude::*;

/// Win rate of row roster against column roster, ties counting half.
pub fn compute_matrix(
    session: &Session,
    rosters: &RostersFile,
    sims_per_cell: usize,
    seed: u64,
    ai: AiKind,
) -> anyhow::Result<Vec<Vec<f64>>> {
    let count = rosters.rosters.len();
    let tasks: Vec<(usize, usize)> = (0..count)
        .flat_map(|a| (0..count).map(move |b| (a, b)))
        .collect();
    let cell_results = tasks
        .par_iter()
        .map(|&(a_idx, b_idx)| -> anyhow::Result<CellResult> {
            let mut cell_rng = SmallRng::seed_from_u64(seed ^ ((a_idx as u64) << 32) ^ (b_idx as u64));
            let a = &rosters.rosters[a_idx];
            let b = &rosters.rosters[b_idx];
            let mut a_wins = 0u64;
            let mut ties = 0u64;
            for _ in 0..sims_per_cell {
                let battle_seed = cell_rng.gen();
                match simulate_battle(session, a, b, ai, battle_seed)? {
                    BattleResult::AWins => a_wins += 1,
                    BattleResult::BWins => {}
                    BattleResult::Tie => ties += 1,
                }
            }
            let win_rate = (a_wins as f64 + 0.5 * ties as f64) / sims_per_cell as f64;
            debug!(a = %a.name, b = %b.name, win_rate, "cell done");
            Ok(CellResult {
                a_idx,
                b_idx,
                win_rate,
            })
        })
        .collect::<anyhow::Result<Vec<CellResult>>>()?;

    let mut matrix = vec![vec![0.0; count]; count];
    for cell in cell_results {
        matrix[cell.a_idx][cell.b_idx] = cell.win_rate;
    }
    Ok(matrix)
}

/// Header row of roster names, then one labelled row per roster.
pub fn to_csv(names: &[String], matrix: &[Vec<f64>]) -> String {
    let mut out = String::from("roster");
    for name in names {
        out.push(',');
        out.push_str(name);
    }
    for (name, row) in names.iter().zip(matrix) {
        out.push('\n');
        out.push_str(name);
        for value in row {
            out.push_str(&format!(",{value:.4}"));
        }
    }
    out.push('\n');
    out
}

pub fn write_csv(names: &[String], matrix: &[Vec<f64>], path: &std::path::Path) -> anyhow::Result<()> {
    std::fs::write(path, to_csv(names, matrix))?;
    Ok(())
}

struct CellResult {
    a_idx: usize,
    b_idx: usize,
    win_rate: f64,
}

pub fn validate_rosters(session: &Session, rosters: &RostersFile) -> anyhow::Result<()> {
    if rosters.rosters.len() < 2 {
        anyhow::bail!("Expected at least 2 rosters");
    }
    for roster in &rosters.rosters {
        if roster.monsters.is_empty() || roster.monsters.len() > MAX_PARTY_SIZE {
            anyhow::bail!(
                "Roster {} must have between 1 and {MAX_PARTY_SIZE} monsters",
                roster.name
            );
        }
        if roster.name.contains(',') {
            anyhow::bail!("Roster name {:?} must not contain commas", roster.name);
        }
        for entry in &roster.monsters {
            session.db().lookup_monster(&entry.species)?;
        }
    }
    Ok(())
}
