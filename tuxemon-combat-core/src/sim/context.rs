//! Per-battle configuration and ownership of the participating teams.

use crate::error::{CombatError, CombatResult};
use crate::npc::Npc;
use crate::sim::monster::Monster;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatType {
    #[default]
    Wild,
    Trainer,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleMode {
    #[default]
    Single,
    Double,
}

impl BattleMode {
    /// Battlefield positions per team.
    pub fn positions(self) -> usize {
        match self {
            BattleMode::Single => 1,
            BattleMode::Double => 2,
        }
    }
}

/// Teams, combat type, graphics and mode of one battle. Only the teams'
/// monsters change after construction.
#[derive(Clone, Debug)]
pub struct CombatContext {
    teams: Vec<Npc>,
    combat_type: CombatType,
    graphics: String,
    battle_mode: BattleMode,
}

impl CombatContext {
    pub fn new(
        teams: Vec<Npc>,
        combat_type: CombatType,
        graphics: impl Into<String>,
        battle_mode: BattleMode,
    ) -> CombatResult<Self> {
        if teams.len() > 2 {
            return Err(CombatError::NotImplemented(teams.len()));
        }
        if teams.len() < 2 {
            return Err(CombatError::InvalidContext(format!(
                "a battle needs two teams, got {}",
                teams.len()
            )));
        }
        if let Some(empty) = teams.iter().find(|npc| npc.monsters.is_empty()) {
            return Err(CombatError::InvalidContext(format!(
                "{} has no monsters",
                empty.slug
            )));
        }
        Ok(Self {
            teams,
            combat_type,
            graphics: graphics.into(),
            battle_mode,
        })
    }

    pub fn combat_type(&self) -> CombatType {
        self.combat_type
    }

    pub fn graphics(&self) -> &str {
        &self.graphics
    }

    pub fn battle_mode(&self) -> BattleMode {
        self.battle_mode
    }

    pub fn teams(&self) -> &[Npc] {
        &self.teams
    }

    pub fn team(&self, index: usize) -> Option<&Npc> {
        self.teams.get(index)
    }

    pub fn team_mut(&mut self, index: usize) -> Option<&mut Npc> {
        self.teams.get_mut(index)
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn opponent_of(&self, team: usize) -> usize {
        (team + 1) % self.teams.len()
    }

    /// Index of the team owning `monster`.
    pub fn team_of(&self, monster: Uuid) -> Option<usize> {
        self.teams.iter().position(|npc| {
            npc.monsters
                .iter()
                .any(|candidate| candidate.instance_id == monster)
        })
    }

    pub fn monster(&self, id: Uuid) -> Option<&Monster> {
        self.teams
            .iter()
            .flat_map(|npc| npc.monsters.iter())
            .find(|monster| monster.instance_id == id)
    }

    pub fn monster_mut(&mut self, id: Uuid) -> Option<&mut Monster> {
        self.teams
            .iter_mut()
            .flat_map(|npc| npc.monsters.iter_mut())
            .find(|monster| monster.instance_id == id)
    }

    /// Take `id` out of its owner's roster.
    pub fn remove_monster(&mut self, id: Uuid) -> Option<Monster> {
        let team = self.team_of(id)?;
        self.teams[team].remove_monster(id)
    }

    pub fn all_monsters(&self) -> impl Iterator<Item = &Monster> {
        self.teams.iter().flat_map(|npc| npc.monsters.iter())
    }

    pub fn all_monsters_mut(&mut self) -> impl Iterator<Item = &mut Monster> {
        self.teams.iter_mut().flat_map(|npc| npc.monsters.iter_mut())
    }

    pub fn has_conscious_monsters(&self, team: usize) -> bool {
        self.teams
            .get(team)
            .map(|npc| npc.monsters.iter().any(|monster| !monster.is_fainted()))
            .unwrap_or(false)
    }

    pub fn into_teams(self) -> Vec<Npc> {
        self.teams
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn npc_with(slug: &str, species: &[&str]) -> Npc {
        let db = Database::builtin().expect("builtin data");
        let mut rng = SmallRng::seed_from_u64(5);
        let mut npc = Npc::new(slug, slug);
        for name in species {
            let monster = Monster::spawn(&db, name, 5, &mut rng).expect("species");
            npc.add_monster(monster);
        }
        npc
    }

    #[test]
    fn three_teams_are_not_implemented() {
        let teams = vec![
            npc_with("a", &["rockitten"]),
            npc_with("b", &["budaye"]),
            npc_with("c", &["budaye"]),
        ];
        let err = CombatContext::new(teams, CombatType::Trainer, "", BattleMode::Single)
            .expect_err("three teams");
        assert!(matches!(err, CombatError::NotImplemented(3)));
    }

    #[test]
    fn empty_team_is_invalid() {
        let teams = vec![npc_with("a", &["rockitten"]), npc_with("b", &[])];
        let err = CombatContext::new(teams, CombatType::Trainer, "", BattleMode::Single)
            .expect_err("empty team");
        assert!(matches!(err, CombatError::InvalidContext(_)));
    }

    #[test]
    fn single_team_is_invalid() {
        let err = CombatContext::new(vec![npc_with("a", &["rockitten"])], CombatType::Wild, "", BattleMode::Single)
            .expect_err("one team");
        assert!(matches!(err, CombatError::InvalidContext(_)));
    }

    #[test]
    fn monsters_resolve_to_their_team() {
        let teams = vec![npc_with("a", &["rockitten"]), npc_with("b", &["budaye", "budaye"])];
        let ctx = CombatContext::new(teams, CombatType::Wild, "gfx/background.png", BattleMode::Double)
            .expect("valid");
        let id = ctx.teams()[1].monsters[1].instance_id;
        assert_eq!(ctx.team_of(id), Some(1));
        assert_eq!(ctx.opponent_of(1), 0);
        assert_eq!(ctx.graphics(), "gfx/background.png");
        assert_eq!(ctx.battle_mode().positions(), 2);
    }

    #[test]
    fn removed_monster_leaves_roster() {
        let teams = vec![npc_with("a", &["rockitten"]), npc_with("b", &["budaye", "budaye"])];
        let mut ctx = CombatContext::new(teams, CombatType::Wild, "", BattleMode::Single).expect("valid");
        let id = ctx.teams()[1].monsters[0].instance_id;
        assert!(ctx.remove_monster(id).is_some());
        assert_eq!(ctx.teams()[1].monsters.len(), 1);
        assert!(ctx.monster(id).is_none());
    }
}
