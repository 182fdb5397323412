//! `Effect` - deferred, cancellable asynchronous work.
//!
//! An [`Effect<A>`] *describes* a computation that produces an `A`, possibly
//! suspending at I/O boundaries. Nothing runs until [`Effect::run`] is called
//! with a [`CancellationToken`], and `run` consumes the effect, so each
//! description is evaluated at most once.
//!
//! # Evaluation Semantics
//!
//! ## Pure Values: Immediate Evaluation
//!
//! `Effect::pure(value)` holds an already computed value. `fmap` and
//! `flat_map` on a pure effect apply their function at composition time:
//!
//! ```rust
//! use storefront::effect::Effect;
//!
//! let effect = Effect::pure(10).fmap(|x| x * 2);
//! assert!(effect.is_pure());
//! ```
//!
//! ## Deferred Execution
//!
//! Anything that touches the outside world goes through
//! [`Effect::lift_sync`] or [`Effect::lift_async`]; those closures run only when
//! the effect is run.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use storefront::effect::Effect;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let executed = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&executed);
//! let effect = Effect::lift_sync(move || {
//!     flag.store(true, Ordering::SeqCst);
//!     42
//! });
//!
//! assert!(!executed.load(Ordering::SeqCst));
//! assert_eq!(effect.run(CancellationToken::new()).await, 42);
//! assert!(executed.load(Ordering::SeqCst));
//! # });
//! ```
//!
//! # Cancellation
//!
//! Every asynchronous lift receives the token. Honouring it is the lifted
//! function's job (see [`ensure_active`]); running an effect never aborts
//! in-flight work on its own.
//!
//! # Concurrency
//!
//! Effects are never parallelised implicitly. [`Effect::zip`] is the explicit
//! join: it invokes both effects and lets the executor interleave them.

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use tokio_util::sync::CancellationToken;

use crate::error::ErrorInfo;
use crate::outcome::Fin;

type Thunk<A> = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, A> + Send>;

enum EffectState<A> {
    Pure(A),
    Deferred(Thunk<A>),
}

/// A lazily described unit of asynchronous work producing an `A`.
///
/// # Monad Laws
///
/// 1. **Left Identity**: `Effect::pure(a).flat_map(f) == f(a)`
/// 2. **Right Identity**: `m.flat_map(Effect::pure) == m`
/// 3. **Associativity**: `m.flat_map(f).flat_map(g) == m.flat_map(|x| f(x).flat_map(g))`
pub struct Effect<A> {
    state: EffectState<A>,
}

impl<A> Effect<A>
where
    A: Send + 'static,
{
    /// Wraps an already computed value.
    pub const fn pure(value: A) -> Self {
        Self {
            state: EffectState::Pure(value),
        }
    }

    /// Defers a synchronous function until the effect is run.
    pub fn lift_sync<F>(function: F) -> Self
    where
        F: FnOnce() -> A + Send + 'static,
    {
        Self::deferred(move |_| async move { function() }.boxed())
    }

    /// Defers an asynchronous function until the effect is run.
    ///
    /// The function receives the run's cancellation token.
    pub fn lift_async<F, Fut>(function: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = A> + Send + 'static,
    {
        Self::deferred(move |token| function(token).boxed())
    }

    fn deferred<F>(thunk: F) -> Self
    where
        F: FnOnce(CancellationToken) -> BoxFuture<'static, A> + Send + 'static,
    {
        Self {
            state: EffectState::Deferred(Box::new(thunk)),
        }
    }

    /// Returns `true` when the effect holds an already computed value.
    pub const fn is_pure(&self) -> bool {
        matches!(self.state, EffectState::Pure(_))
    }

    /// Maps a function over the produced value.
    #[must_use]
    pub fn fmap<B, F>(self, function: F) -> Effect<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        match self.state {
            EffectState::Pure(value) => Effect::pure(function(value)),
            EffectState::Deferred(thunk) => {
                Effect::deferred(move |token| thunk(token).map(function).boxed())
            }
        }
    }

    /// Sequences another effect after this one (monadic bind).
    #[must_use]
    pub fn flat_map<B, F>(self, function: F) -> Effect<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Effect<B> + Send + 'static,
    {
        match self.state {
            EffectState::Pure(value) => function(value),
            EffectState::Deferred(thunk) => Effect::deferred(move |token| {
                async move {
                    let value = thunk(token.clone()).await;
                    function(value).run(token).await
                }
                .boxed()
            }),
        }
    }

    /// Invokes both effects and joins their results.
    ///
    /// Both effects always run to completion; no ordering between their
    /// suspension points is guaranteed.
    #[must_use]
    pub fn zip<B>(self, other: Effect<B>) -> Effect<(A, B)>
    where
        B: Send + 'static,
    {
        Effect::deferred(move |token| {
            future::join(self.run(token.clone()), other.run(token)).boxed()
        })
    }

    /// Runs the effect, consuming it.
    pub fn run(self, token: CancellationToken) -> BoxFuture<'static, A> {
        match self.state {
            EffectState::Pure(value) => future::ready(value).boxed(),
            EffectState::Deferred(thunk) => thunk(token),
        }
    }
}

impl<A> Effect<Fin<A>>
where
    A: Send + 'static,
{
    /// A successful effect.
    pub const fn succeed(value: A) -> Self {
        Self::pure(Ok(value))
    }

    /// A failed effect.
    pub const fn fail(error: ErrorInfo) -> Self {
        Self::pure(Err(error))
    }
}

impl<A> fmt::Debug for Effect<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            EffectState::Pure(_) => "Pure",
            EffectState::Deferred(_) => "Deferred",
        };
        formatter.debug_struct("Effect").field("state", &state).finish()
    }
}

/// Fails with [`ErrorInfo::cancelled`] once `token` has been cancelled.
///
/// Lifted steps call this at their suspension points.
///
/// # Errors
///
/// Returns an `Internal` failure when the token is cancelled.
pub fn ensure_active(token: &CancellationToken) -> Fin<()> {
    if token.is_cancelled() {
        Err(ErrorInfo::cancelled())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[rstest]
    #[tokio::test]
    async fn pure_returns_value() {
        assert_eq!(Effect::pure(7).run(CancellationToken::new()).await, 7);
    }

    #[rstest]
    #[tokio::test]
    async fn lift_async_receives_token() {
        let token = CancellationToken::new();
        token.cancel();
        let effect = Effect::lift_async(|token: CancellationToken| async move {
            ensure_active(&token)
        });
        let result = effect.run(token).await;
        assert_eq!(result, Err(ErrorInfo::cancelled()));
    }

    #[rstest]
    #[tokio::test]
    async fn deferred_work_runs_once_per_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&counter);
        let effect = Effect::lift_sync(move || counted.fetch_add(1, Ordering::SeqCst))
            .fmap(|previous| previous + 10)
            .flat_map(|value| Effect::lift_sync(move || value * 2));

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(effect.run(CancellationToken::new()).await, 20);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn zip_runs_both_effects() {
        let left = Effect::lift_sync(|| 1);
        let right = Effect::lift_async(|_| async { "two" });
        assert_eq!(left.zip(right).run(CancellationToken::new()).await, (1, "two"));
    }

    #[rstest]
    #[tokio::test]
    async fn associativity_holds_for_deferred_effects() {
        let f = |x: i32| Effect::lift_sync(move || x + 1);
        let g = |x: i32| Effect::lift_sync(move || x * 3);

        let left = Effect::lift_sync(|| 4).flat_map(f).flat_map(g);
        let right = Effect::lift_sync(|| 4).flat_map(move |x| f(x).flat_map(g));

        let token = CancellationToken::new();
        assert_eq!(left.run(token.clone()).await, right.run(token).await);
    }

    #[rstest]
    fn debug_shows_state() {
        assert!(format!("{:?}", Effect::pure(1)).contains("Pure"));
        assert!(format!("{:?}", Effect::lift_sync(|| 1)).contains("Deferred"));
    }
}
