//! Property-based tests for `Effect` and `Pipeline` laws.
//!
//! - Left Identity: pure(a).flat_map(f) == f(a)
//! - Right Identity: m.flat_map(pure) == m
//! - Associativity: m.flat_map(f).flat_map(g) == m.flat_map(|x| f(x).flat_map(g))
//! - combine2 returns the leftmost failure

use proptest::prelude::*;
use storefront::prelude::*;

fn block_on<A>(effect: Effect<A>) -> A
where
    A: Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    runtime.block_on(effect.run(CancellationToken::new()))
}

// =============================================================================
// Effect monad laws
// =============================================================================

proptest! {
    #[test]
    fn prop_effect_left_identity(value: i32) {
        let function = |n: i32| Effect::lift_sync(move || n.wrapping_mul(3));
        prop_assert_eq!(
            block_on(Effect::pure(value).flat_map(function)),
            block_on(function(value))
        );
    }

    #[test]
    fn prop_effect_right_identity(value: i32) {
        let deferred = Effect::lift_sync(move || value);
        prop_assert_eq!(block_on(deferred.flat_map(Effect::pure)), value);
    }

    #[test]
    fn prop_effect_associativity(value: i32) {
        let f = |n: i32| Effect::lift_sync(move || n.wrapping_add(7));
        let g = |n: i32| Effect::lift_async(move |_| async move { n.wrapping_mul(2) });

        let left = Effect::lift_sync(move || value).flat_map(f).flat_map(g);
        let right = Effect::lift_sync(move || value).flat_map(move |x| f(x).flat_map(g));
        prop_assert_eq!(block_on(left), block_on(right));
    }
}

// =============================================================================
// Pipeline laws
// =============================================================================

proptest! {
    #[test]
    fn prop_pipeline_left_identity(value: i64) {
        let function = |n: i64| Pipeline::<(), i64>::lift_pure(move |()| n.wrapping_sub(1));
        let left = Pipeline::succeed(value).and_then(function).run(());
        let right = function(value).run(());
        prop_assert_eq!(block_on(left), block_on(right));
    }

    #[test]
    fn prop_pipeline_failure_is_absorbing(message in "[a-z]{1,12}", value: i64) {
        let failed = Pipeline::<(), i64>::fail(ErrorInfo::conflict(message.clone()))
            .and_then(move |_| Pipeline::succeed(value))
            .map(|n| n + 1);
        let error = block_on(failed.run(())).unwrap_err();
        prop_assert_eq!(error.message(), message.as_str());
    }
}

// =============================================================================
// combine / accumulate
// =============================================================================

proptest! {
    #[test]
    fn prop_combine_picks_leftmost_failure(left_fails: bool, right_fails: bool) {
        let left: Fin<i32> = if left_fails { fail(ErrorInfo::validation("left")) } else { succeed(1) };
        let right: Fin<i32> = if right_fails { fail(ErrorInfo::conflict("right")) } else { succeed(2) };

        let combined = combine2(left, right, |a, b| a + b);
        match (left_fails, right_fails) {
            (false, false) => prop_assert_eq!(combined, Ok(3)),
            (true, _) => {
                let error = combined.unwrap_err();
                prop_assert_eq!(error.message(), "left");
            }
            (false, true) => {
                let error = combined.unwrap_err();
                prop_assert_eq!(error.message(), "right");
            }
        }
    }

    #[test]
    fn prop_accumulate_keeps_every_message(messages in prop::collection::vec("[a-z]{1,8}", 2..6)) {
        let error = accumulate(messages.iter().map(|message| fail(ErrorInfo::validation(message.clone()))))
            .unwrap_err();
        prop_assert_eq!(error.kind(), ErrorKind::Validation);
        prop_assert_eq!(error.details(), messages.as_slice());
        prop_assert_eq!(error.message(), messages.join("; "));
    }
}
