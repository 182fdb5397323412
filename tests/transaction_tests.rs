//! Commit, rollback, audit and dispatch behaviour of the transaction runner.

mod common;

use chrono::{TimeZone, Utc};
use common::{EventLog, Widget, runner_with_log, seeded_store, widget_not_found};
use rstest::{fixture, rstest};
use storefront::prelude::*;

fn rename(id: u32, name: &'static str) -> Pipeline<MemoryContext, Widget> {
    get_update_entity(
        move |widget: &Widget| widget.id == id,
        widget_not_found(),
        QueryOptions::new(),
        [Transition::pure(move |widget: Widget| widget.rename(name))],
    )
}

#[fixture]
fn store() -> MemoryStore {
    seeded_store(3)
}

// =============================================================================
// Rollback
// =============================================================================

#[rstest]
#[tokio::test]
async fn failing_save_leaves_store_and_event_log_unchanged(store: MemoryStore) {
    let (runner, log) = runner_with_log();
    let before: Vec<String> = store.snapshot::<Widget>().into_iter().map(|w| w.name).collect();

    let failing = rename(1, "renamed").and_then(|_| rename(2, ""));
    let error = runner
        .run_save(failing, store.context(), CancellationToken::new())
        .await
        .unwrap_err();

    let after: Vec<String> = store.snapshot::<Widget>().into_iter().map(|w| w.name).collect();
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(before, after);
    assert_eq!(store.commit_count(), 0);
    assert!(log.entries().is_empty());
}

#[rstest]
#[tokio::test]
async fn read_only_run_never_commits(store: MemoryStore) {
    let (runner, log) = runner_with_log();
    let renamed = runner
        .run(rename(1, "ghost"), store.context(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(renamed.name, "ghost");
    assert_eq!(store.find::<Widget>(&1).unwrap().name, "widget-1");
    assert_eq!(store.commit_count(), 0);
    assert!(log.entries().is_empty());
}

#[rstest]
#[tokio::test]
async fn commit_conflict_rolls_back_everything(store: MemoryStore) {
    let (runner, log) = runner_with_log();
    let pipeline = add_entity(Widget::new(10, "ten"))
        .and_then(|_| add_entity(Widget::new(2, "duplicate of two")));

    let error = runner
        .run_save(pipeline, store.context(), CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Conflict);
    assert!(store.find::<Widget>(&10).is_none());
    assert!(log.entries().is_empty());
}

// =============================================================================
// Commit and dispatch
// =============================================================================

#[rstest]
#[tokio::test]
async fn successful_save_commits_once_and_dispatches_in_raise_order(store: MemoryStore) {
    let (runner, log) = runner_with_log();
    let pipeline = get_update_entity(
        |widget: &Widget| widget.id == 3,
        widget_not_found(),
        QueryOptions::new(),
        [
            Transition::pure(|widget: Widget| widget.rename("first")),
            Transition::pure(|widget: Widget| widget.restock(5)),
            Transition::pure(|widget: Widget| widget.rename("second")),
        ],
    )
    .and_then(|_| rename(1, "other"));

    runner
        .run_save(pipeline, store.context(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(store.commit_count(), 1);
    assert_eq!(
        log.entries(),
        vec![
            "widget.renamed:widget-3->first",
            "widget.restocked",
            "widget.renamed:first->second",
            "widget.renamed:widget-1->other",
        ]
    );
    assert!(store.find::<Widget>(&3).unwrap().events.is_empty());
}

#[rstest]
#[tokio::test]
async fn every_subscriber_sees_each_event_once(store: MemoryStore) {
    let first = EventLog::default();
    let second = EventLog::default();
    let runner = TransactionRunner::default()
        .with_subscriber(first.clone())
        .with_subscriber(second.clone());

    runner
        .run_save(rename(2, "twice"), store.context(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.entries(), vec!["widget.renamed:widget-2->twice"]);
    assert_eq!(second.entries(), first.entries());
}

#[rstest]
#[tokio::test]
async fn failing_subscriber_does_not_roll_back(store: MemoryStore) {
    let log = EventLog::default();
    let runner = TransactionRunner::default()
        .with_subscriber(|_: &EventRecord| Effect::fail(ErrorInfo::bad_gateway("bus down")))
        .with_subscriber(log.clone());

    let result = runner
        .run_save(rename(1, "kept"), store.context(), CancellationToken::new())
        .await;

    assert!(result.is_ok());
    assert_eq!(store.find::<Widget>(&1).unwrap().name, "kept");
    assert_eq!(log.entries().len(), 1);
}

#[rstest]
#[tokio::test]
async fn panicking_subscriber_is_reported_not_propagated(store: MemoryStore) {
    let log = EventLog::default();
    let runner = TransactionRunner::default()
        .with_subscriber(|_: &EventRecord| -> Effect<Fin<()>> { panic!("subscriber crashed") })
        .with_subscriber(log.clone());

    let outcome = tokio::spawn(async move {
        runner
            .run_save(rename(1, "survived"), store.context(), CancellationToken::new())
            .await
            .map(|widget| widget.name)
    })
    .await
    .unwrap();

    assert_eq!(outcome, Ok("survived".to_owned()));
    assert_eq!(log.entries(), vec!["widget.renamed:widget-1->survived"]);
}

// =============================================================================
// Audit
// =============================================================================

#[rstest]
#[case::known_actor(ActorSource::fixed("alice"), "alice")]
#[case::anonymous(ActorSource::anonymous(), "system")]
#[tokio::test]
async fn audit_fields_are_stamped_before_commit(
    store: MemoryStore,
    #[case] actor: ActorSource,
    #[case] expected: &str,
) {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let runner = TransactionRunner::default()
        .with_actor_source(actor)
        .with_clock(Clock::fixed(at));

    let pipeline = add_entity(Widget::new(9, "new")).and_then(|_| rename(1, "changed"));
    runner
        .run_save(pipeline, store.context(), CancellationToken::new())
        .await
        .unwrap();

    let created = store.find::<Widget>(&9).unwrap();
    assert_eq!(created.audit.created_by.as_deref(), Some(expected));
    assert_eq!(created.audit.created_at, Some(at));

    let updated = store.find::<Widget>(&1).unwrap();
    assert_eq!(updated.audit.updated_by.as_deref(), Some(expected));
    assert_eq!(updated.audit.created_by, None);
}

// =============================================================================
// Post-commit hook
// =============================================================================

#[rstest]
#[tokio::test]
async fn hook_runs_only_after_a_successful_commit(store: MemoryStore) {
    let runner = TransactionRunner::default();

    let committed = runner
        .run_save_and_raise(rename(1, "hooked"), store.context(), CancellationToken::new(), |widget| {
            let name = widget.name.clone();
            Effect::lift_sync(move || {
                if name == "hooked" {
                    Err(ErrorInfo::bad_gateway("publish failed"))
                } else {
                    Ok(())
                }
            })
        })
        .await
        .unwrap();

    assert_eq!(committed.value.name, "hooked");
    assert_eq!(committed.post_commit.unwrap_err().kind(), ErrorKind::BadGateway);
    assert_eq!(store.find::<Widget>(&1).unwrap().name, "hooked");

    let failed = runner
        .run_save_and_raise(rename(1, ""), store.context(), CancellationToken::new(), |_| {
            panic!("hook must not run after a failed commit")
        })
        .await;
    assert!(failed.is_err());
}

#[rstest]
#[tokio::test]
async fn panicking_hook_becomes_a_post_commit_failure(store: MemoryStore) {
    let runner = TransactionRunner::default();
    let context = store.context();

    let committed = tokio::spawn(async move {
        runner
            .run_save_and_raise(rename(1, "kept"), context, CancellationToken::new(), |_| {
                panic!("hook crashed")
            })
            .await
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(committed.value.name, "kept");
    let failure = committed.post_commit.unwrap_err();
    assert_eq!(failure.kind(), ErrorKind::Internal);
    assert!(failure.message().contains("hook crashed"));
    assert_eq!(store.find::<Widget>(&1).unwrap().name, "kept");
}
