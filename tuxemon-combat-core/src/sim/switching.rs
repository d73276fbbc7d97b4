use crate::npc::Npc;
use crate::sim::context::BattleMode;
use uuid::Uuid;

/// Positions `npc` should hold on the field: two in double battles while at
/// least two of its monsters can fight, one otherwise.
pub fn max_positions(mode: BattleMode, npc: &Npc) -> usize {
    let conscious = npc.conscious_monsters().count();
    mode.positions().min(conscious.max(1))
}

/// Empty positions `npc` still has to fill.
pub fn positions_available(mode: BattleMode, npc: &Npc, in_play: &[Uuid]) -> usize {
    if npc.conscious_monsters().next().is_none() {
        return 0;
    }
    max_positions(mode, npc).saturating_sub(in_play.len())
}

/// Conscious monsters of `npc` that are not on the field yet, roster order.
pub fn get_awake_monsters(npc: &Npc, in_play: &[Uuid]) -> Vec<Uuid> {
    npc.conscious_monsters()
        .filter(|monster| !in_play.contains(&monster.instance_id))
        .map(|monster| monster.instance_id)
        .collect()
}

/// Whether `monster` may be sent out as a replacement.
pub fn can_switch_in(npc: &Npc, in_play: &[Uuid], monster: Uuid) -> bool {
    npc.monsters
        .iter()
        .any(|candidate| candidate.instance_id == monster && !candidate.is_fainted())
        && !in_play.contains(&monster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::sim::monster::Monster;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn make_npc(species: &[&str]) -> Npc {
        let db = Database::builtin().expect("builtin data");
        let mut rng = SmallRng::seed_from_u64(12);
        let mut npc = Npc::new("npc", "Npc");
        for slug in species {
            npc.add_monster(Monster::spawn(&db, slug, 5, &mut rng).expect("species exists"));
        }
        npc
    }

    #[test]
    fn double_battle_shrinks_to_one_position() {
        let mut npc = make_npc(&["rockitten", "budaye"]);
        assert_eq!(max_positions(BattleMode::Double, &npc), 2);
        assert_eq!(max_positions(BattleMode::Single, &npc), 1);
        npc.monsters[1].faint();
        assert_eq!(max_positions(BattleMode::Double, &npc), 1);
    }

    #[test]
    fn awake_monsters_skip_fainted_and_fielded() {
        let mut npc = make_npc(&["rockitten", "budaye", "bigfin"]);
        npc.monsters[1].faint();
        let first = npc.monsters[0].instance_id;
        let awake = get_awake_monsters(&npc, &[first]);
        assert_eq!(awake, vec![npc.monsters[2].instance_id]);
        assert_eq!(positions_available(BattleMode::Single, &npc, &[first]), 0);
        assert!(!can_switch_in(&npc, &[first], npc.monsters[1].instance_id));
        assert!(can_switch_in(&npc, &[first], npc.monsters[2].instance_id));
    }

    #[test]
    fn defeated_team_has_no_positions() {
        let mut npc = make_npc(&["rockitten"]);
        npc.monsters[0].faint();
        assert_eq!(positions_available(BattleMode::Single, &npc, &[]), 0);
    }
}
