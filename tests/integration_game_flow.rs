mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{guess_response, ScriptedBackend};
use prodle::protocol::Difficulty;
use prodle::runtime::perform;
use prodle::session::{Completion, GameSession, NoticeKind, Request};
use prodle::timer::Timer;
use prodle::{GameError, Phase};

/// Runs every queued request against `backend` and feeds the result straight back.
fn settle(session: &mut GameSession, backend: &ScriptedBackend) {
    loop {
        let requests = session.take_requests();
        if requests.is_empty() {
            break;
        }
        for request in requests {
            let completion = perform(backend, request);
            session.apply(completion);
        }
    }
}

fn started(backend: &ScriptedBackend, seconds: u32) -> GameSession {
    let mut session = GameSession::new(Timer::new(seconds), 20, Difficulty::Difficile);
    session.begin();
    settle(&mut session, backend);
    session.advance(Duration::from_secs(3));
    assert_eq!(session.phase(), Phase::Active);
    session
}

fn guess(session: &mut GameSession, backend: &ScriptedBackend, name: &str) {
    session.submit_guess(name).unwrap();
    settle(session, backend);
}

#[test]
fn score_never_decreases_and_index_moves_by_one() {
    let backend = ScriptedBackend::with_guesses(vec![
        Ok(guess_response("Caps", false, 0, false)),
        Ok(guess_response("Faker", true, 900, false)),
        Ok(guess_response("Chovy", true, 1700, false)),
        Ok(guess_response("Zeus", false, 1700, false)),
    ]);
    let mut session = started(&backend, 120);

    let mut last_score = 0;
    let mut last_index = session.progress().current_target_index;
    for name in ["Caps", "Faker", "Chovy", "Zeus"] {
        guess(&mut session, &backend, name);
        assert!(session.progress().score >= last_score);
        last_score = session.progress().score;

        // let any transition run out
        session.advance(Duration::from_millis(3500));
        let index = session.progress().current_target_index;
        assert!(index == last_index || index == last_index + 1);
        last_index = index;
    }
    assert_eq!(session.progress().targets_found, 2);
    assert_eq!(session.progress().current_target_index, 3);
    assert_eq!(session.progress().score, 1700);
}

#[test]
fn full_clock_ends_the_game_exactly_once() {
    let backend = ScriptedBackend::default();
    let mut session = started(&backend, 120);

    for second in 1..=119 {
        session.advance(Duration::from_secs(1));
        assert_eq!(session.timer().seconds_left(), 120 - second);
        assert_eq!(session.phase(), Phase::Active);
    }
    session.advance(Duration::from_secs(1));
    assert_eq!(session.phase(), Phase::Ended);
    settle(&mut session, &backend);

    for _ in 0..5 {
        session.advance(Duration::from_secs(1));
    }
    session.end();
    settle(&mut session, &backend);

    let ends = backend
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("end:"))
        .count();
    assert_eq!(ends, 1);
    assert_eq!(session.missed_target().map(|p| p.player_username.as_str()), Some("Chovy"));
}

#[test]
fn empty_guess_sends_nothing() {
    let backend = ScriptedBackend::default();
    let mut session = started(&backend, 120);

    let err = session.submit_guess("   ").unwrap_err();
    assert_matches!(err, GameError::Validation(_));
    assert!(session.take_requests().is_empty());
    assert_eq!(session.notice().map(|n| n.kind), Some(NoticeKind::Error));
    assert!(backend.calls().iter().all(|c| !c.starts_with("guess:")));
}

#[test]
fn server_error_leaves_progress_untouched() {
    let backend = ScriptedBackend::with_guesses(vec![Err(GameError::Transport(
        "server returned 500".into(),
    ))]);
    let mut session = started(&backend, 120);
    guess(&mut session, &backend, "Faker");

    assert_eq!(session.progress().score, 0);
    assert_eq!(session.progress().current_target_index, 1);
    assert!(session.history().is_empty());
    assert!(session.accepts_guesses());
    assert_eq!(session.notice().map(|n| n.kind), Some(NoticeKind::Error));
}

#[test]
fn second_submit_while_pending_is_refused() {
    let backend = ScriptedBackend::with_guesses(vec![Ok(guess_response(
        "Faker", false, 0, false,
    ))]);
    let mut session = started(&backend, 120);

    session.submit_guess("Faker").unwrap();
    assert_matches!(
        session.submit_guess("Faker"),
        Err(GameError::InputLocked(Phase::Active))
    );
    let requests = session.take_requests();
    assert_eq!(requests.len(), 1);
    assert_matches!(&requests[0], Request::Guess { player_name, .. } if player_name == "Faker");
}

#[test]
fn stale_guess_response_is_ignored_after_game_end() {
    let backend = ScriptedBackend::default();
    let mut session = started(&backend, 120);

    session.submit_guess("Faker").unwrap();
    let pending = session.take_requests();
    let token = match &pending[0] {
        Request::Guess { token, .. } => *token,
        other => panic!("unexpected request {other:?}"),
    };

    session.end();
    settle(&mut session, &backend);
    let score = session.progress().score;

    session.apply(Completion::Guess {
        token,
        result: Ok(guess_response("Faker", true, 5000, false)),
    });
    assert_eq!(session.phase(), Phase::Ended);
    assert_eq!(session.progress().score, score);
    assert!(session.history().is_empty());
}

#[test]
fn game_over_on_correct_guess_goes_to_score_form() {
    let backend = ScriptedBackend::with_guesses(vec![Ok(guess_response(
        "Faker", true, 1000, true,
    ))]);
    let mut session = started(&backend, 120);
    guess(&mut session, &backend, "Faker");

    assert_eq!(session.phase(), Phase::Transitioning);
    assert!(!session.accepts_guesses());

    session.advance(Duration::from_millis(3500));
    assert_eq!(session.phase(), Phase::Transitioning);
    assert_eq!(session.progress().current_target_index, 1);

    session.advance(Duration::from_millis(500));
    assert_eq!(session.phase(), Phase::Ended);
    settle(&mut session, &backend);

    session.submit_score("  Ada  ").unwrap();
    settle(&mut session, &backend);
    assert_eq!(session.phase(), Phase::Submitted);
    assert_eq!(session.score_form().username.as_deref(), Some("Ada"));
    assert_eq!(session.score_form().rank, Some(3));
}

#[test]
fn restart_after_submission_starts_a_fresh_session() {
    let backend = ScriptedBackend::default();
    let mut session = started(&backend, 5);
    session.advance(Duration::from_secs(5));
    assert_eq!(session.phase(), Phase::Ended);
    settle(&mut session, &backend);
    session.submit_score("Ada").unwrap();
    settle(&mut session, &backend);

    session.restart();
    assert_eq!(session.phase(), Phase::Setup);
    settle(&mut session, &backend);
    assert_eq!(session.phase(), Phase::Countdown);
    assert_eq!(session.progress().score, 0);
    assert_eq!(session.timer().seconds_left(), 5);
    assert!(session.missed_target().is_none());

    let starts = backend
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("start:"))
        .count();
    assert_eq!(starts, 2);
}
