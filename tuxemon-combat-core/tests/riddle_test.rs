use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tuxemon_combat_core::config::RiddleConfig;
use tuxemon_combat_core::prelude::*;
use tuxemon_combat_core::riddle::{riddle_technique, AnswerInput, RiddleAI, RiddleTurn};

fn quick_sum(session: &Session) -> Riddle {
    session.db().lookup_riddle("math_easy_01").expect("riddle exists")
}

#[test]
fn sum_riddle_accepts_words_and_digits() {
    let session = Session::builtin().expect("builtin data");
    let riddle = quick_sum(&session);
    assert_eq!(riddle.question, "What is 7 + 5?");
    for answer in ["12", "twelve", " 12 ", "TWELVE"] {
        assert!(riddle.check_text(answer), "{answer:?} should be accepted");
    }
    for answer in ["11", ""] {
        assert!(!riddle.check_text(answer), "{answer:?} should be rejected");
    }
    assert!(riddle.check_answer(Some(&AnswerInput::Integer(12))));
    assert!(!riddle.check_answer(None));
}

#[test]
fn hard_riddle_outcomes() {
    let session = Session::builtin().expect("builtin data");
    let riddle = Riddle {
        difficulty: "hard".to_string(),
        damage_multiplier: 2.0,
        ..quick_sum(&session)
    };
    let mut config = RiddleConfig::default();
    config.correct_base_power = 50.0;
    let hit = riddle_technique(session.db(), &config, &riddle, true).expect("technique");
    assert_eq!(hit.power, 200.0);
    let miss = riddle_technique(session.db(), &config, &riddle, false).expect("technique");
    assert_eq!(miss.power, config.incorrect_penalty);
    assert!(miss.target.own_monster);

    // Played through a battle, the solved riddle takes exactly 200 HP.
    assert_eq!(session.config().riddle.correct_base_power, 50.0);
    let mut rng = SmallRng::seed_from_u64(6);
    let mut red = Npc::new("red", "Red").with_controller(Controller::Human);
    red.add_monster(Monster::spawn(session.db(), "rockitten", 10, &mut rng).expect("species"));
    let mut blue = Npc::new("blue", "Blue").with_controller(Controller::Human);
    blue.add_monster(Monster::spawn(session.db(), "budaye", 100, &mut rng).expect("species"));
    let ctx = CombatContext::new(vec![red, blue], CombatType::Trainer, "", BattleMode::Single)
        .expect("two teams");
    let mut state = CombatState::new(&session, ctx, HeadlessUi::new(), 4);
    advance(&mut state);
    let striker = state.in_play(0)[0];
    let target = state.in_play(1)[0];
    let before = state.context().monster(target).expect("target").current_hp;
    assert!(before > 200);

    let turn = RiddleTurn {
        riddle,
        correct: true,
        target,
    };
    state.submit_action(striker, Decision::Riddle(turn)).expect("valid");
    state.submit_action(target, Decision::Skip).expect("valid");
    advance(&mut state);
    let after = state.context().monster(target).expect("target").current_hp;
    assert_eq!(before - after, 200);
}

fn advance(state: &mut CombatState<'_>) {
    for _ in 0..1_000 {
        if state.awaiting_input() || state.is_finished() {
            return;
        }
        state.update(5.0);
    }
}

#[test]
fn answer_state_walks_through_feedback() {
    let session = Session::builtin().expect("builtin data");
    let config = &session.config().riddle;
    let mut state = RiddleAnswerState::new(quick_sum(&session), "Rockitten", config);
    for c in "twelve".chars() {
        state.process_input(RiddleInput::Char(c));
    }
    assert!(state.process_input(RiddleInput::Submit));
    assert_eq!(state.take_verdict(), None);
    state.update(config.feedback_duration + 0.1);
    assert_eq!(state.take_verdict(), Some(true));
    assert_eq!(state.take_verdict(), None);
}

#[test]
fn manager_falls_back_when_nothing_matches() {
    let session = Session::builtin().expect("builtin data");
    let mut rng = SmallRng::seed_from_u64(2);
    let riddle = session
        .riddles()
        .get_random_riddle(Some("astronomy"), Some("hard"), None, &mut rng);
    assert!(!riddle.question.is_empty());
    assert!(riddle.check_text(&riddle.answer));
}

fn any_answer() -> impl Strategy<Value = String> {
    prop_oneof![Just("12".to_string()), Just("twelve".to_string()), "[a-z0-9 ]{0,12}"]
}

proptest! {
    #[test]
    fn answers_ignore_case_and_padding(answer in any_answer(), pad in " {0,3}") {
        let session = Session::builtin().expect("builtin data");
        let riddle = quick_sum(&session);
        let expected = riddle.check_text(&answer);
        prop_assert_eq!(riddle.check_text(&answer.to_uppercase()), expected);
        prop_assert_eq!(riddle.check_text(&format!("{pad}{answer}{pad}")), expected);
    }

    #[test]
    fn damage_multiplier_is_pure(multiplier in 0.1f64..5.0, difficulty in prop_oneof![Just("easy"), Just("medium"), Just("hard"), Just("weird")]) {
        let riddle = Riddle {
            difficulty: difficulty.to_string(),
            damage_multiplier: multiplier,
            ..Riddle::fallback()
        };
        let copy = riddle.clone();
        prop_assert_eq!(riddle.get_damage_multiplier(), copy.get_damage_multiplier());
        prop_assert!(riddle.get_damage_multiplier() >= multiplier);
    }

    #[test]
    fn success_rate_grows_with_level(level in 1u32..99, species in prop_oneof![Just("rockitten"), Just("nudimind"), Just("cardiling")], seed in any::<u64>()) {
        let session = Session::builtin().expect("builtin data");
        let ai = RiddleAI::new(&session.config().riddle);
        let riddle = quick_sum(&session);
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut monster = Monster::spawn(session.db(), species, level, &mut rng).expect("species");
        let low = ai.calculate_success_rate(&monster, &riddle);
        monster.set_level(level + 1);
        let high = ai.calculate_success_rate(&monster, &riddle);
        prop_assert!(low <= high);
        prop_assert!((0.1..=0.95).contains(&low));
        prop_assert!((0.1..=0.95).contains(&high));
    }
}
