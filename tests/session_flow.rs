mod common;

use std::time::Duration;

use chrono::Utc;
use tokio::time::{sleep, Instant};

use termexam::error::ServiceError;
use termexam::session::{Command, SessionConfig, SessionOutcome, SessionState};

use common::{answers, snapshot, start, FakeService, HostCall};

#[tokio::test(start_paused = true)]
async fn test_expiry_submits_automatically() {
    let begun = Instant::now();
    let mut h = start(FakeService::with_attempt(snapshot(3, 1)), SessionConfig::default());

    let view = h.wait_for_state(SessionState::Active).await;
    assert_eq!(view.question_count, 3);
    assert_eq!(view.total_points, 6);
    h.answer("q1", 2).await;

    let outcome = h.task.await.unwrap();

    assert_eq!(outcome, SessionOutcome::Submitted);
    let elapsed = begun.elapsed();
    assert!(elapsed >= Duration::from_secs(60), "submitted after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(61), "submitted after {:?}", elapsed);
    assert_eq!(h.service.submits(), vec![answers(&[("q1", 2)])]);
    assert_eq!(h.service.submit_attempt_ids(), vec!["att-1".to_string()]);
    assert_eq!(
        h.host.calls(),
        vec![HostCall::InvalidateResults, HostCall::OpenResults]
    );
    assert_eq!(
        h.host.states(),
        vec![
            SessionState::Loading,
            SessionState::Active,
            SessionState::Submitting,
            SessionState::Terminal,
        ]
    );

    let last = h.view.borrow().clone();
    assert_eq!(last.state, SessionState::Terminal);
    assert!(last.expired);
    assert_eq!(last.remaining_secs, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_expiry_during_manual_submit_sends_once() {
    let mut h = start(FakeService::with_attempt(snapshot(2, 1)), SessionConfig::default());
    h.service.set_submit_delay(Duration::from_secs(10));
    h.wait_for_state(SessionState::Active).await;

    sleep(Duration::from_secs(55)).await;
    h.send(Command::Submit).await;
    h.send(Command::Submit).await;
    h.wait_for_state(SessionState::Submitting).await;

    let outcome = h.task.await.unwrap();

    assert_eq!(outcome, SessionOutcome::Submitted);
    assert_eq!(h.service.submits().len(), 1);
    assert_eq!(
        h.host.calls(),
        vec![HostCall::InvalidateResults, HostCall::OpenResults]
    );
}

#[tokio::test(start_paused = true)]
async fn test_submit_and_expiry_in_the_same_tick_send_once() {
    let mut h = start(FakeService::with_attempt(snapshot(2, 1)), SessionConfig::default());
    h.service.set_submit_delay(Duration::from_millis(5));
    h.wait_for_state(SessionState::Active).await;
    h.answer("q2", 1).await;

    sleep(Duration::from_millis(59_999)).await;
    h.send(Command::Submit).await;

    let outcome = h.task.await.unwrap();

    assert_eq!(outcome, SessionOutcome::Submitted);
    assert_eq!(h.service.submits(), vec![answers(&[("q2", 1)])]);
    let submitting = h
        .host
        .states()
        .into_iter()
        .filter(|s| *s == SessionState::Submitting)
        .count();
    assert_eq!(submitting, 1);
    assert_eq!(
        h.host.calls(),
        vec![HostCall::InvalidateResults, HostCall::OpenResults]
    );
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_commands_is_not_dropped() {
    let mut h = start(FakeService::with_attempt(snapshot(3, 30)), SessionConfig::default());
    h.wait_for_state(SessionState::Active).await;

    for _ in 0..200 {
        h.commands.send(Command::Next).unwrap();
    }
    h.commands.send(Command::Choose(2)).unwrap();
    h.commands.send(Command::Submit).unwrap();

    assert_eq!(h.task.await.unwrap(), SessionOutcome::Submitted);
    assert_eq!(h.service.submits(), vec![answers(&[("q3", 2)])]);
}

#[tokio::test(start_paused = true)]
async fn test_resumed_attempt_restores_answers_and_deadline() {
    let mut snap = snapshot(3, 30);
    snap.started_at = Some(Utc::now() - chrono::Duration::minutes(5));
    snap.answers = Some(answers(&[("q1", 3), ("q2", 1), ("q99", 4)]));
    let mut h = start(FakeService::with_attempt(snap), SessionConfig::default());

    let view = h.wait_for_state(SessionState::Active).await;
    assert_eq!(view.answered_count, 2);
    assert_eq!(view.answered, vec![true, true, false]);
    assert_eq!(view.current_answer, Some(3));

    let view = h.wait_for(|v| v.remaining_secs.is_some()).await;
    let remaining = view.remaining_secs.unwrap_or_default();
    assert!((1495..=1500).contains(&remaining), "remaining {}", remaining);
    assert!(!view.low_time);

    h.send(Command::Quit).await;
    assert_eq!(h.task.await.unwrap(), SessionOutcome::Abandoned);
    assert!(h.service.submits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_already_completed_redirects_to_results() {
    let begun = Instant::now();
    let mut h = start(
        FakeService::failing_acquire(ServiceError::AlreadyCompleted(
            "You have already taken this exam".to_string(),
        )),
        SessionConfig::default(),
    );

    let view = h.wait_for_state(SessionState::Error).await;
    assert!(view.redirecting);
    assert_eq!(view.error.as_deref(), Some("You have already taken this exam"));
    assert!(h.host.calls().is_empty());

    let outcome = h.task.await.unwrap();

    assert_eq!(outcome, SessionOutcome::RedirectedToResults);
    assert!(begun.elapsed() >= Duration::from_millis(2000));
    assert_eq!(h.host.calls(), vec![HostCall::OpenResults]);
    assert!(h.service.submits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_other_start_failure_waits_for_back() {
    let mut h = start(
        FakeService::failing_acquire(ServiceError::Rejected {
            status: 404,
            message: "Exam not found".to_string(),
        }),
        SessionConfig::default(),
    );

    let view = h.wait_for_state(SessionState::Error).await;
    assert!(!view.redirecting);
    assert_eq!(view.error.as_deref(), Some("Exam not found"));

    sleep(Duration::from_secs(30)).await;
    assert!(h.host.calls().is_empty());

    h.send(Command::Back).await;
    assert_eq!(h.task.await.unwrap(), SessionOutcome::Failed);
    assert_eq!(h.host.calls(), vec![HostCall::GoBack]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_submit_returns_to_active_and_can_be_retried() {
    let mut h = start(FakeService::with_attempt(snapshot(2, 30)), SessionConfig::default());
    h.service.fail_next_submits(1);
    h.wait_for_state(SessionState::Active).await;

    h.answer("q2", 4).await;
    h.send(Command::Submit).await;
    let view = h.wait_for(|v| v.state == SessionState::Active && v.error.is_some()).await;
    assert_eq!(view.error.as_deref(), Some("Service unavailable"));
    assert_eq!(view.current_answer, None);
    assert_eq!(h.service.submits().len(), 1);
    assert!(h.host.calls().is_empty());

    // Answers stay editable after a failed submission.
    h.answer("q1", 1).await;
    h.wait_for(|v| v.answered_count == 2).await;

    h.send(Command::Submit).await;
    assert_eq!(h.task.await.unwrap(), SessionOutcome::Submitted);
    assert_eq!(
        h.service.submits(),
        vec![answers(&[("q2", 4)]), answers(&[("q1", 1), ("q2", 4)])]
    );
    assert_eq!(
        h.host.calls(),
        vec![HostCall::InvalidateResults, HostCall::OpenResults]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_submit_after_expiry_is_retried_automatically() {
    let begun = Instant::now();
    let mut h = start(FakeService::with_attempt(snapshot(2, 1)), SessionConfig::default());
    h.service.fail_next_submits(2);
    h.wait_for_state(SessionState::Active).await;
    h.answer("q1", 3).await;

    let outcome = h.task.await.unwrap();

    assert_eq!(outcome, SessionOutcome::Submitted);
    let submits = h.service.submits();
    assert_eq!(submits.len(), 3);
    assert!(submits.iter().all(|s| *s == answers(&[("q1", 3)])));
    let elapsed = begun.elapsed();
    assert!(elapsed >= Duration::from_secs(62), "submitted after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(63), "submitted after {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_submission_stops_autosave() {
    let mut h = start(FakeService::with_attempt(snapshot(2, 30)), SessionConfig::default());
    h.service.set_submit_delay(Duration::from_secs(10));
    h.wait_for_state(SessionState::Active).await;

    h.answer("q1", 1).await;
    h.send(Command::Submit).await;

    assert_eq!(h.task.await.unwrap(), SessionOutcome::Submitted);
    assert!(h.service.saves().is_empty());
    assert_eq!(h.service.submits(), vec![answers(&[("q1", 1)])]);
}

#[tokio::test(start_paused = true)]
async fn test_answers_are_autosaved_while_active() {
    let mut h = start(FakeService::with_attempt(snapshot(2, 30)), SessionConfig::default());
    h.wait_for_state(SessionState::Active).await;

    h.answer("q1", 2).await;
    h.send(Command::Next).await;
    h.send(Command::Choose(4)).await;

    let view = h
        .wait_for(|v| matches!(v.save_status, termexam::autosave::SaveStatus::Saved { .. }))
        .await;
    assert_eq!(view.current_index, 1);
    assert_eq!(view.current_answer, Some(4));
    assert_eq!(h.service.saves(), vec![answers(&[("q1", 2), ("q2", 4)])]);

    h.send(Command::Quit).await;
    assert_eq!(h.task.await.unwrap(), SessionOutcome::Abandoned);
}

#[tokio::test(start_paused = true)]
async fn test_answers_after_expiry_are_ignored() {
    let mut h = start(FakeService::with_attempt(snapshot(3, 1)), SessionConfig::default());
    h.service.fail_next_submits(usize::MAX);
    h.wait_for_state(SessionState::Active).await;
    h.answer("q1", 1).await;

    h.wait_for(|v| v.expired).await;
    h.answer("q2", 2).await;
    h.send(Command::Choose(3)).await;
    h.send(Command::Jump(2)).await;
    let view = h.wait_for(|v| v.current_index == 2).await;
    assert_eq!(view.answered_count, 1);
    assert_eq!(view.current_answer, None);

    sleep(Duration::from_secs(10)).await;
    let submits = h.service.submits();
    assert!(submits.len() >= 2);
    assert!(submits.iter().all(|s| *s == answers(&[("q1", 1)])));

    h.send(Command::Quit).await;
    assert_eq!(h.task.await.unwrap(), SessionOutcome::Abandoned);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_stays_in_range() {
    let mut h = start(FakeService::with_attempt(snapshot(3, 30)), SessionConfig::default());
    h.wait_for_state(SessionState::Active).await;

    h.send(Command::Previous).await;
    h.settle().await;
    assert_eq!(h.view.borrow().current_index, 0);

    for _ in 0..5 {
        h.send(Command::Next).await;
    }
    let view = h.wait_for(|v| v.current_index == 2).await;
    assert!(view.is_last_question());
    h.settle().await;
    assert_eq!(h.view.borrow().current_index, 2);

    h.send(Command::Jump(7)).await;
    h.settle().await;
    assert_eq!(h.view.borrow().current_index, 2);

    h.send(Command::Jump(1)).await;
    let view = h.wait_for(|v| v.current_index == 1).await;
    assert_eq!(view.current.map(|q| q.id), Some("q2".to_string()));

    h.send(Command::Quit).await;
    assert_eq!(h.task.await.unwrap(), SessionOutcome::Abandoned);
}
