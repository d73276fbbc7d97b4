use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tuxemon_combat_core::prelude::*;
use tuxemon_combat_core::sim::damage::{experience_reward, simple_damage_multiplier};
use tuxemon_combat_core::sim::element::AETHER;
use tuxemon_combat_core::sim::modifier::{AggregationPolicy, Modifier};

const ELEMENTS: [&str; 6] = ["aether", "earth", "fire", "metal", "water", "wood"];
const SPECIES: [&str; 6] = ["rockitten", "budaye", "bigfin", "djinnbo", "nudimind", "cardiling"];
const POLICIES: [AggregationPolicy; 5] = [
    AggregationPolicy::WeakestLink,
    AggregationPolicy::StrongestLink,
    AggregationPolicy::Cumulative,
    AggregationPolicy::Average,
    AggregationPolicy::FirstApplicable,
];

fn spawn(session: &Session, species: &str, level: u32, seed: u64) -> Monster {
    let mut rng = SmallRng::seed_from_u64(seed);
    Monster::spawn(session.db(), species, level, &mut rng).expect("species exists")
}

#[test]
fn fire_beats_wood_within_the_clamp() {
    let session = Session::builtin().expect("builtin data");
    let config = session.config();
    let multiplier = simple_damage_multiplier(
        session.db(),
        config,
        &["fire".to_string()],
        &["wood".to_string()],
        &[],
    );
    let (low, high) = config.multiplier_range;
    assert!(multiplier > 1.0);
    assert!((low..=high).contains(&multiplier));
}

#[test]
fn policies_ignore_modifiers_that_do_not_apply() {
    let session = Session::builtin().expect("builtin data");
    let monster = spawn(&session, "budaye", 10, 1);
    let unrelated = vec![Modifier::for_types(&["metal"], 0.5), Modifier::for_tags(&["ghost"], 2.0)];
    for policy in POLICIES {
        assert_eq!(policy.apply(&[], &monster), 1.0, "{policy:?} on empty input");
        assert_eq!(policy.apply(&unrelated, &monster), 1.0, "{policy:?} on non-matching input");
    }
}

#[test]
fn policies_combine_matching_modifiers() {
    let session = Session::builtin().expect("builtin data");
    let monster = spawn(&session, "budaye", 10, 1);
    let modifiers = vec![Modifier::for_types(&["wood"], 0.5), Modifier::for_types(&["wood"], 2.0)];
    assert_eq!(AggregationPolicy::WeakestLink.apply(&modifiers, &monster), 0.5);
    assert_eq!(AggregationPolicy::StrongestLink.apply(&modifiers, &monster), 2.0);
    assert_eq!(AggregationPolicy::Cumulative.apply(&modifiers, &monster), 1.0);
    assert_eq!(AggregationPolicy::Average.apply(&modifiers, &monster), 1.25);
    assert_eq!(AggregationPolicy::FirstApplicable.apply(&modifiers, &monster), 0.5);
}

#[test]
fn experience_shrinks_with_more_hits() {
    let session = Session::builtin().expect("builtin data");
    let loser = spawn(&session, "bigfin", 20, 4);
    let one = experience_reward(&loser, 1, 1.0);
    let two = experience_reward(&loser, 2, 1.0);
    assert!(one > two);
    assert_eq!(experience_reward(&loser, 1, 2.0), one * 2);
}

proptest! {
    #[test]
    fn aether_is_always_neutral(other in prop::sample::select(ELEMENTS.to_vec()), aether_attacks in any::<bool>()) {
        let session = Session::builtin().expect("builtin data");
        let aether = vec![AETHER.to_string()];
        let other = vec![other.to_string()];
        let (attack, target) = if aether_attacks { (&aether, &other) } else { (&other, &aether) };
        let multiplier = simple_damage_multiplier(session.db(), session.config(), attack, target, &[]);
        prop_assert_eq!(multiplier, 1.0);
    }

    #[test]
    fn set_stats_is_idempotent(species in prop::sample::select(SPECIES.to_vec()), level in 1u32..60, seed in any::<u64>()) {
        let session = Session::builtin().expect("builtin data");
        let mut monster = spawn(&session, species, level, seed);
        monster.set_stats();
        let once = monster.stats;
        let hp = monster.current_hp;
        monster.set_stats();
        prop_assert_eq!(monster.stats, once);
        prop_assert_eq!(monster.current_hp, hp);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn damage_never_exceeds_what_the_target_had(
        attacker in prop::sample::select(SPECIES.to_vec()),
        defender in prop::sample::select(SPECIES.to_vec()),
        seed in any::<u64>(),
    ) {
        let session = Session::builtin().expect("builtin data");
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut a = Npc::new("a", "A").with_controller(Controller::Ai(AiKind::Random));
        a.add_monster(Monster::spawn(session.db(), attacker, 15, &mut rng).expect("species"));
        let mut b = Npc::new("b", "B").with_controller(Controller::Ai(AiKind::Random));
        b.add_monster(Monster::spawn(session.db(), defender, 15, &mut rng).expect("species"));
        let ctx = CombatContext::new(vec![a, b], CombatType::Trainer, "", BattleMode::Single).expect("valid");
        let mut engine = CombatEngine::new(&session, ctx, seed);
        let outcome = engine.run_to_end();
        prop_assert!(outcome.is_ok());
        for monster in engine.state().context().all_monsters() {
            prop_assert!(monster.current_hp <= monster.hp());
        }
    }
}
