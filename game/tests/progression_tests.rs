use std::sync::Arc;

use zombie_farm::catalog::StageCatalog;
use zombie_farm::config::RulesConfig;
use zombie_farm::events::{DefeatCause, EngineEvent, GameOutcome, Severity};
use zombie_farm::progression::{
    AnswerOutcome, CollectOutcome, GameState, IntentError, Phase, ProgressionEngine,
    StageAdvance, TickOutcome,
};

fn engine() -> ProgressionEngine {
    let catalog = StageCatalog::builtin().expect("builtin catalog");
    ProgressionEngine::new(Arc::new(catalog), RulesConfig::default())
}

fn started(engine: &ProgressionEngine) -> GameState {
    let mut state = engine.idle_state();
    engine.start(&mut state);
    state.take_events();
    state
}

fn answer_of(engine: &ProgressionEngine, stage: u32) -> String {
    engine.catalog().stage(stage).expect("stage").answer.clone()
}

#[test]
fn each_correct_answer_advances_one_stage_and_accumulates_points() {
    let engine = engine();
    for target in 1..=13u32 {
        let mut state = started(&engine);
        for stage in 1..target {
            let outcome = engine
                .submit_answer(&mut state, &answer_of(&engine, stage))
                .expect("answer accepted");
            assert!(outcome.is_correct());
        }
        let expected_score: u32 = engine
            .catalog()
            .iter()
            .filter(|s| s.index < target)
            .map(|s| s.points)
            .sum();
        assert_eq!(state.stage(), target);
        assert_eq!(state.score(), expected_score);
        assert_eq!(state.phase(), Phase::Active);
    }
}

#[test]
fn empty_answers_are_rejected_without_side_effects() {
    let engine = engine();
    let mut state = started(&engine);
    engine
        .submit_answer(&mut state, &answer_of(&engine, 1))
        .unwrap();
    let before = state.clone();

    for blank in ["", "   ", "\t\n"] {
        assert_eq!(
            engine.submit_answer(&mut state, blank),
            Err(IntentError::EmptyAnswerSubmitted)
        );
    }
    assert_eq!(state.score(), before.score());
    assert_eq!(state.stage(), before.stage());
    assert_eq!(state.lives(), before.lives());
}

#[test]
fn answers_ignore_case_and_whitespace() {
    let engine = engine();
    let mut exact = started(&engine);
    let mut sloppy = started(&engine);

    let a = engine.submit_answer(&mut exact, "ЗАРАЖЕНИЕ_2024").unwrap();
    let b = engine.submit_answer(&mut sloppy, "зараж ение_2024").unwrap();
    assert_eq!(a, b);
    assert_eq!(
        a,
        AnswerOutcome::Correct {
            points: 100,
            advance: StageAdvance::NextStage { stage: 2 }
        }
    );
}

#[test]
fn collecting_the_same_symbol_twice_is_a_no_op() {
    let engine = engine();
    let mut state = started(&engine);
    engine
        .submit_answer(&mut state, &answer_of(&engine, 1))
        .unwrap();

    assert!(matches!(
        engine.collect_symbol(&mut state, 'Ω'),
        Ok(CollectOutcome::Collected { collected: 1, .. })
    ));
    assert_eq!(
        engine.collect_symbol(&mut state, 'Ω'),
        Ok(CollectOutcome::AlreadyCollected { symbol: 'Ω' })
    );
    assert_eq!(state.collected_symbols(), &['Ω']);
}

#[test]
fn fifth_symbol_announces_code_in_collection_order_once() {
    let engine = engine();
    let mut state = started(&engine);
    engine
        .submit_answer(&mut state, &answer_of(&engine, 1))
        .unwrap();
    state.take_events();

    for symbol in ['§', '¤', '∞', '†'] {
        engine.collect_symbol(&mut state, symbol).unwrap();
    }
    assert!(
        !state
            .pending_events()
            .iter()
            .any(|e| matches!(e, EngineEvent::AllSymbolsCollected { .. }))
    );

    let outcome = engine.collect_symbol(&mut state, 'Ω').unwrap();
    assert_eq!(
        outcome,
        CollectOutcome::Completed {
            code: "§¤∞†Ω".to_string()
        }
    );
    let announced = state
        .take_events()
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::AllSymbolsCollected { .. }))
        .count();
    assert_eq!(announced, 1);

    assert_eq!(
        engine.collect_symbol(&mut state, '§'),
        Ok(CollectOutcome::AlreadyCollected { symbol: '§' })
    );
    assert!(state.take_events().is_empty());
}

#[test]
fn symbols_outside_the_stage_are_rejected() {
    let engine = engine();
    let mut state = started(&engine);
    assert_eq!(
        engine.collect_symbol(&mut state, 'Ω'),
        Err(IntentError::SymbolNotInStage {
            symbol: 'Ω',
            stage: 1
        })
    );
}

#[test]
fn stage_transition_clears_collected_symbols() {
    let engine = engine();
    let mut state = started(&engine);
    engine
        .submit_answer(&mut state, &answer_of(&engine, 1))
        .unwrap();
    for symbol in "Ω†∞¤§".chars() {
        engine.collect_symbol(&mut state, symbol).unwrap();
    }
    engine.submit_answer(&mut state, "Ω†∞¤§").unwrap();
    assert_eq!(state.stage(), 3);
    assert!(state.collected_symbols().is_empty());
}

#[test]
fn three_wrong_answers_defeat_and_freeze_score() {
    let engine = engine();
    let mut state = started(&engine);
    engine
        .submit_answer(&mut state, &answer_of(&engine, 1))
        .unwrap();

    let first = engine.submit_answer(&mut state, "wrong").unwrap();
    let second = engine.submit_answer(&mut state, "wrong").unwrap();
    let third = engine.submit_answer(&mut state, "wrong").unwrap();

    assert_eq!(
        first,
        AnswerOutcome::Incorrect {
            lives_left: 2,
            defeated: false
        }
    );
    assert!(!second.is_terminal());
    assert_eq!(
        third,
        AnswerOutcome::Incorrect {
            lives_left: 0,
            defeated: true
        }
    );
    assert!(third.is_terminal());
    assert_eq!(state.phase(), Phase::Defeat);
    assert!(state.pending_events().contains(&EngineEvent::GameOver {
        outcome: GameOutcome::Defeat,
        cause: Some(DefeatCause::OutOfLives),
        final_score: 100,
    }));

    let score = state.score();
    assert_eq!(
        engine.submit_answer(&mut state, &answer_of(&engine, 2)),
        Err(IntentError::GameOver)
    );
    assert_eq!(state.score(), score);
}

#[test]
fn countdown_defeats_exactly_when_time_runs_out() {
    let engine = engine();
    let mut state = started(&engine);

    for call in 1..=2700u32 {
        let outcome = engine.tick(&mut state);
        if call < 2700 {
            assert_eq!(
                outcome,
                TickOutcome::Counting {
                    remaining_secs: 2700 - call
                }
            );
            assert_eq!(state.phase(), Phase::Active);
        } else {
            assert_eq!(outcome, TickOutcome::Expired);
        }
    }
    assert_eq!(state.phase(), Phase::Defeat);
    assert_eq!(state.lives(), 3);
    assert_eq!(state.time_left_secs(), 0);
    assert_eq!(engine.tick(&mut state), TickOutcome::NotRunning);
}

#[test]
fn warnings_fire_once_per_threshold() {
    let engine = engine();
    let mut state = started(&engine);
    engine.tick_by(&mut state, 2400);
    let warnings: Vec<u32> = state
        .take_events()
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::TimeWarning { remaining_secs } => Some(remaining_secs),
            _ => None,
        })
        .collect();
    assert_eq!(warnings, vec![300]);

    for _ in 0..300 {
        engine.tick(&mut state);
    }
    let warnings = state
        .take_events()
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::TimeWarning { .. }))
        .count();
    // The 60 s mark, then expiry replaces any further warning.
    assert_eq!(warnings, 1);
    assert_eq!(state.phase(), Phase::Defeat);
}

#[test]
fn paused_engine_does_not_count_down_or_accept_answers() {
    let engine = engine();
    let mut state = started(&engine);
    engine.pause(&mut state).unwrap();

    assert_eq!(engine.tick_by(&mut state, 100), TickOutcome::NotRunning);
    assert_eq!(state.time_left_secs(), 2700);
    assert_eq!(
        engine.submit_answer(&mut state, &answer_of(&engine, 1)),
        Err(IntentError::Paused)
    );

    engine.resume(&mut state).unwrap();
    assert_eq!(
        engine.tick(&mut state),
        TickOutcome::Counting {
            remaining_secs: 2699
        }
    );
}

#[test]
fn victory_adds_time_bonus() {
    let engine = engine();
    let mut state = started(&engine);
    engine.tick_by(&mut state, 2700 - 120);
    assert_eq!(state.time_left_secs(), 120);

    let mut last = None;
    for stage in 1..=13 {
        last = Some(
            engine
                .submit_answer(&mut state, &answer_of(&engine, stage))
                .unwrap(),
        );
    }

    let last = last.expect("thirteen answers");
    assert_eq!(
        last,
        AnswerOutcome::Correct {
            points: 500,
            advance: StageAdvance::Victory { time_bonus: 12 }
        }
    );
    assert!(last.is_terminal());
    assert_eq!(state.phase(), Phase::Victory);
    assert_eq!(state.stage(), 14);
    assert_eq!(state.score(), engine.catalog().total_points() + 12);
    assert!(
        state
            .pending_events()
            .iter()
            .filter_map(EngineEvent::as_notification)
            .any(|n| n.severity == Severity::Success && n.message.contains("+12"))
    );
}

#[test]
fn zero_time_bonus_divisor_is_sanitized_before_victory() {
    let catalog = StageCatalog::builtin().expect("builtin catalog");
    let rules = RulesConfig {
        time_bonus_divisor: 0,
        ..RulesConfig::default()
    };
    let engine = ProgressionEngine::new(Arc::new(catalog), rules);
    assert_eq!(engine.rules().time_bonus_divisor, 1);

    let mut state = started(&engine);
    engine.tick_by(&mut state, 2700 - 120);
    for stage in 1..=13 {
        engine
            .submit_answer(&mut state, &answer_of(&engine, stage))
            .unwrap();
    }
    assert_eq!(state.phase(), Phase::Victory);
    assert_eq!(state.score(), engine.catalog().total_points() + 120);
}

#[test]
fn paused_engine_rejects_symbols_and_hints() {
    let engine = engine();
    let mut state = started(&engine);
    engine.submit_answer(&mut state, &answer_of(&engine, 1)).unwrap();
    engine.collect_symbol(&mut state, 'Ω').unwrap();
    engine.pause(&mut state).unwrap();
    state.take_events();

    assert_eq!(
        engine.collect_symbol(&mut state, '†'),
        Err(IntentError::Paused)
    );
    assert_eq!(engine.request_hint(&mut state), Err(IntentError::Paused));
    assert_eq!(state.collected_symbols(), &['Ω']);
    assert!(state.pending_events().is_empty());

    engine.resume(&mut state).unwrap();
    assert_eq!(
        engine.collect_symbol(&mut state, '†'),
        Ok(CollectOutcome::Collected {
            symbol: '†',
            collected: 2
        })
    );
}

#[test]
fn reset_returns_to_idle_defaults() {
    let engine = engine();
    let mut state = started(&engine);
    engine.submit_answer(&mut state, "wrong").unwrap();
    engine.tick_by(&mut state, 10);

    engine.reset(&mut state);
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(state.stage(), 1);
    assert_eq!(state.lives(), 3);
    assert_eq!(state.time_left_secs(), 2700);
    assert!(!state.is_active());
}

#[test]
fn start_mid_game_restarts() {
    let engine = engine();
    let mut state = started(&engine);
    engine
        .submit_answer(&mut state, &answer_of(&engine, 1))
        .unwrap();
    engine.start(&mut state);
    assert_eq!(state.stage(), 1);
    assert_eq!(state.score(), 0);
}
