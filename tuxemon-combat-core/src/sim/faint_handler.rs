use crate::sim::context::CombatContext;
use crate::sim::damage::experience_reward;
use crate::sim::damage_tracker::DamageTracker;
use tracing::info;
use uuid::Uuid;

/// Experience one attacker earned from a defeated monster.
#[derive(Clone, Debug, PartialEq)]
pub struct ExperienceAward {
    pub winner: Uuid,
    pub name: String,
    pub experience: u64,
    pub levels: u32,
    pub level: u32,
}

/// Share out experience for `loser` to every monster that damaged it, then
/// forget the loser in the damage map. Fainted or departed attackers get
/// nothing.
pub fn award_experience(
    ctx: &mut CombatContext,
    damage: &mut DamageTracker,
    loser: Uuid,
    modifier: f64,
) -> Vec<ExperienceAward> {
    let Some(defeated) = ctx.monster(loser).cloned() else {
        damage.remove_monster(loser);
        return Vec::new();
    };
    let mut awards = Vec::new();
    for attacker in damage.get_attackers(loser) {
        let hits = damage.count_hits(attacker, loser);
        let experience = experience_reward(&defeated, hits, modifier);
        let Some(winner) = ctx.monster_mut(attacker) else {
            continue;
        };
        if winner.is_fainted() || experience == 0 {
            continue;
        }
        let levels = winner.give_experience(experience);
        info!(winner = %winner.name, loser = %defeated.name, experience, levels, "experience awarded");
        awards.push(ExperienceAward {
            winner: attacker,
            name: winner.name.clone(),
            experience,
            levels,
            level: winner.level,
        });
    }
    damage.remove_monster(loser);
    awards
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::npc::Npc;
    use crate::sim::context::{BattleMode, CombatType};
    use crate::sim::monster::Monster;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn context() -> CombatContext {
        let db = Database::builtin().expect("builtin data");
        let mut rng = SmallRng::seed_from_u64(31);
        let mut a = Npc::new("a", "A");
        a.add_monster(Monster::spawn(&db, "rockitten", 5, &mut rng).expect("species exists"));
        let mut b = Npc::new("b", "B");
        b.add_monster(Monster::spawn(&db, "budaye", 20, &mut rng).expect("species exists"));
        CombatContext::new(vec![a, b], CombatType::Wild, "", BattleMode::Single).expect("valid")
    }

    #[test]
    fn attackers_share_experience() {
        let mut ctx = context();
        let winner = ctx.teams()[0].monsters[0].instance_id;
        let loser = ctx.teams()[1].monsters[0].instance_id;
        let before = ctx.teams()[0].monsters[0].total_experience;
        let mut damage = DamageTracker::new();
        damage.log(winner, loser, 12, 1);
        damage.log(winner, loser, 9, 2);

        let awards = award_experience(&mut ctx, &mut damage, loser, 1.0);
        assert_eq!(awards.len(), 1);
        // 20^3 / (20 * 2)
        assert_eq!(awards[0].experience, 200);
        assert!(awards[0].levels > 0);
        let after = ctx.monster(winner).expect("winner").total_experience;
        assert_eq!(after, before + 200);
        assert!(damage.get_attackers(loser).is_empty());
    }

    #[test]
    fn fainted_attackers_get_nothing() {
        let mut ctx = context();
        let winner = ctx.teams()[0].monsters[0].instance_id;
        let loser = ctx.teams()[1].monsters[0].instance_id;
        if let Some(monster) = ctx.monster_mut(winner) {
            monster.faint();
        }
        let mut damage = DamageTracker::new();
        damage.log(winner, loser, 12, 1);
        assert!(award_experience(&mut ctx, &mut damage, loser, 1.0).is_empty());
        assert!(damage.is_empty());
    }
}
