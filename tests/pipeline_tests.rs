//! Short-circuiting and composition of persistence-bound pipelines.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use common::{Widget, seeded_store, widget_not_found};
use rstest::rstest;
use storefront::prelude::*;

fn never_called(flag: &Arc<AtomicBool>) -> Pipeline<MemoryContext, i32> {
    let flag = Arc::clone(flag);
    Pipeline::lift_query(move |_, _| async move {
        flag.store(true, Ordering::SeqCst);
        Ok(0)
    })
}

// =============================================================================
// Short-circuiting
// =============================================================================

#[rstest]
#[case::validation(ErrorInfo::validation("bad input"))]
#[case::not_found(ErrorInfo::not_found("missing"))]
#[case::bad_gateway(ErrorInfo::bad_gateway("upstream down"))]
#[tokio::test]
async fn failure_prevents_later_steps(#[case] failure: ErrorInfo) {
    let reached = Arc::new(AtomicBool::new(false));
    let pure_reached = Arc::new(AtomicBool::new(false));
    let pure_flag = Arc::clone(&pure_reached);
    let next = never_called(&reached);
    let expected = failure.clone();

    let composed: Pipeline<MemoryContext, i32> = pipeline! {
        value <= Pipeline::succeed(1);
        _ <= Pipeline::<MemoryContext, ()>::fail(failure.clone());
        _ <= Pipeline::lift_pure(move |_| pure_flag.store(true, Ordering::SeqCst));
        later <= next;
        Pipeline::succeed(value + later)
    };

    let result = composed
        .run(seeded_store(0).context())
        .run(CancellationToken::new())
        .await;

    assert_eq!(result, Err(expected));
    assert!(!reached.load(Ordering::SeqCst));
    assert!(!pure_reached.load(Ordering::SeqCst));
}

#[rstest]
#[tokio::test]
async fn failed_lookup_stops_the_chain() {
    let reached = Arc::new(AtomicBool::new(false));
    let next = never_called(&reached);

    let composed = get_entity(
        |widget: &Widget| widget.id == 99,
        widget_not_found(),
        QueryOptions::new(),
    )
    .and_then(move |_| next);

    let result = composed
        .run(seeded_store(3).context())
        .run(CancellationToken::new())
        .await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    assert!(!reached.load(Ordering::SeqCst));
}

#[rstest]
#[tokio::test]
async fn cancelled_token_fails_queries_promptly() {
    let token = CancellationToken::new();
    token.cancel();

    let result = get_entities(|_: &Widget| true, QueryOptions::new())
        .run(seeded_store(3).context())
        .run(token)
        .await;

    assert_eq!(result.unwrap_err(), ErrorInfo::cancelled());
}

// =============================================================================
// Composition
// =============================================================================

#[rstest]
#[tokio::test]
async fn combine_invokes_both_sides() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = |id: u32| {
        let calls = Arc::clone(&calls);
        get_entity(move |widget: &Widget| widget.id == id, widget_not_found(), QueryOptions::new())
            .map(move |widget| {
                calls.fetch_add(1, Ordering::SeqCst);
                widget.name
            })
    };

    let names = counted(1)
        .combine(counted(2), |first, second| format!("{first}+{second}"))
        .run(seeded_store(2).context())
        .run(CancellationToken::new())
        .await;

    assert_eq!(names, Ok("widget-1+widget-2".to_owned()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[rstest]
#[tokio::test]
async fn combine_reports_leftmost_failure() {
    let left = get_entity(|widget: &Widget| widget.id == 40, widget_not_found(), QueryOptions::new());
    let right = Pipeline::<MemoryContext, Widget>::fail(ErrorInfo::conflict("right"));

    let error = left
        .combine(right, |a, b| (a, b))
        .run(seeded_store(1).context())
        .run(CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(error, widget_not_found());
}

#[rstest]
#[tokio::test]
async fn or_else_is_an_explicit_fallback() {
    let fallback = get_entity(|widget: &Widget| widget.id == 7, widget_not_found(), QueryOptions::new())
        .or_else(|error| {
            if error.is(ErrorKind::NotFound) {
                Pipeline::succeed(Widget::new(0, "placeholder"))
            } else {
                Pipeline::fail(error)
            }
        });

    let widget = fallback
        .run(seeded_store(1).context())
        .run(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(widget.name, "placeholder");
}
