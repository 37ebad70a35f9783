mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, sleep};

use termexam::answers::AnswerStore;
use termexam::autosave::{Autosave, SaveStatus};
use termexam::clock::MonotonicClock;
use termexam::model::{AnswerMap, QuestionId};

use common::{answers, FakeService};

const DEBOUNCE: Duration = Duration::from_millis(2000);

struct Rig {
    service: Arc<FakeService>,
    store: AnswerStore,
    armed: watch::Sender<bool>,
    status: watch::Receiver<SaveStatus>,
    autosave: Autosave,
}

fn rig(questions: usize) -> Rig {
    let ids: Vec<QuestionId> = common::questions(questions).into_iter().map(|q| q.id).collect();
    let store = AnswerStore::new(&ids);
    let service = Arc::new(FakeService::default());
    let (armed, armed_rx) = watch::channel(true);
    let (autosave, status) = Autosave::spawn(
        service.clone(),
        Arc::new(MonotonicClock::new()),
        "att-1".to_string(),
        store.subscribe(),
        armed_rx,
        DEBOUNCE,
    );
    Rig {
        service,
        store,
        armed,
        status,
        autosave,
    }
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_changes_coalesces_into_one_save() {
    let mut rig = rig(10);

    for n in 1..=10 {
        rig.store.set_answer(&format!("q{}", n), n as i64 % 4 + 1).unwrap();
        time::advance(Duration::from_millis(100)).await;
    }
    sleep(Duration::from_secs(5)).await;

    let saves = rig.service.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0], rig.store.snapshot());
    assert_eq!(saves[0].len(), 10);
    assert!(matches!(
        *rig.status.borrow(),
        SaveStatus::Saved { answered: 10, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_change_inside_window_restarts_it() {
    let mut rig = rig(3);

    rig.store.set_answer("q1", 2).unwrap();
    time::advance(Duration::from_millis(1000)).await;
    rig.store.set_answer("q2", 3).unwrap();

    // The first change alone would have been saved by now.
    time::advance(Duration::from_millis(1500)).await;
    assert!(rig.service.saves().is_empty());

    sleep(Duration::from_secs(3)).await;
    assert_eq!(rig.service.saves(), vec![answers(&[("q1", 2), ("q2", 3)])]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_is_retried() {
    let mut rig = rig(2);
    rig.service.fail_next_saves(1);

    rig.store.set_answer("q1", 1).unwrap();
    sleep(Duration::from_secs(3)).await;
    assert_eq!(rig.service.saves().len(), 1);
    assert!(rig.status.borrow().is_unsaved());

    sleep(Duration::from_secs(10)).await;
    let saves = rig.service.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1], answers(&[("q1", 1)]));
    assert!(matches!(
        *rig.status.borrow(),
        SaveStatus::Saved { answered: 1, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_disarmed_coordinator_holds_changes() {
    let mut rig = rig(2);
    rig.armed.send_replace(false);

    rig.store.set_answer("q1", 4).unwrap();
    sleep(Duration::from_secs(10)).await;
    assert!(rig.service.saves().is_empty());

    rig.armed.send_replace(true);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(rig.service.saves(), vec![answers(&[("q1", 4)])]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_and_unchanged_snapshots_are_not_sent() {
    let mut rig = rig(2);

    rig.store.merge_prior(&AnswerMap::new());
    sleep(Duration::from_secs(5)).await;
    assert!(rig.service.saves().is_empty());

    rig.store.set_answer("q1", 1).unwrap();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(rig.service.saves().len(), 1);

    rig.store.set_answer("q1", 2).unwrap();
    rig.store.set_answer("q1", 1).unwrap();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(rig.service.saves().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_discards_pending_save() {
    let mut rig = rig(2);

    rig.store.set_answer("q2", 2).unwrap();
    time::advance(Duration::from_millis(500)).await;
    rig.autosave.dispose();

    sleep(Duration::from_secs(10)).await;
    assert!(rig.service.saves().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_revert_after_failed_save_is_still_sent() {
    let mut rig = rig(2);

    rig.store.set_answer("q1", 1).unwrap();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(rig.service.saves(), vec![answers(&[("q1", 1)])]);

    rig.service.fail_next_saves(1);
    rig.store.set_answer("q1", 2).unwrap();
    sleep(Duration::from_secs(3)).await;
    assert_eq!(rig.service.saves().len(), 2);
    assert!(rig.status.borrow().is_unsaved());

    // Back to the last acknowledged value; the failed write may have been applied.
    rig.store.set_answer("q1", 1).unwrap();
    sleep(Duration::from_secs(60)).await;

    let saves = rig.service.saves();
    assert_eq!(saves.len(), 3);
    assert_eq!(saves.last(), Some(&answers(&[("q1", 1)])));
    assert!(matches!(
        *rig.status.borrow(),
        SaveStatus::Saved { answered: 1, .. }
    ));
}
