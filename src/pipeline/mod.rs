//! `Pipeline` - effects bound to a persistence context.
//!
//! A [`Pipeline<C, T>`] is a function from a context handle `C` to an
//! [`Effect`] producing a [`Fin<T>`]. Composition carries the failure
//! channel: once a step yields `Err`, no later step is constructed or run.
//!
//! # Lifting
//!
//! | Constructor | Wraps |
//! |-------------|-------|
//! | [`Pipeline::lift_pure`] | a synchronous step that cannot fail |
//! | [`Pipeline::lift_fallible`] | a synchronous step returning `Fin<T>` |
//! | [`Pipeline::lift_query`] | an asynchronous step against the context |
//! | [`Pipeline::lift_effect`] | an arbitrary `Effect<Fin<T>>` |
//! | [`Pipeline::from_result`] | an already computed outcome |
//!
//! # Examples
//!
//! ```rust
//! use storefront::error::ErrorInfo;
//! use storefront::pipeline::Pipeline;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let pipeline = Pipeline::<(), i32>::succeed(20)
//!     .and_then(|value| Pipeline::lift_pure(move |_| value + 1))
//!     .map(|value| value * 2);
//! assert_eq!(pipeline.run(()).run(CancellationToken::new()).await, Ok(42));
//!
//! let failed = Pipeline::<(), i32>::fail(ErrorInfo::not_found("missing"))
//!     .and_then(|value| Pipeline::lift_pure(move |_| value + 1));
//! let error = failed.run(()).run(CancellationToken::new()).await.unwrap_err();
//! assert_eq!(error.message(), "missing");
//! # });
//! ```

mod pipeline_macro;

use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::effect::Effect;
use crate::error::ErrorInfo;
use crate::outcome::{Fin, combine2};

type Step<C, T> = Box<dyn FnOnce(C) -> Effect<Fin<T>> + Send>;

/// A deferred, fallible computation over a context handle `C`.
///
/// # Monad Laws
///
/// With `and_then` as bind and `succeed` as return:
///
/// 1. **Left Identity**: `Pipeline::succeed(a).and_then(f) == f(a)`
/// 2. **Right Identity**: `m.and_then(Pipeline::succeed) == m`
/// 3. **Associativity**: `m.and_then(f).and_then(g) == m.and_then(|x| f(x).and_then(g))`
pub struct Pipeline<C, T> {
    step: Step<C, T>,
}

impl<C, T> Pipeline<C, T>
where
    C: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    /// Wraps a raw step.
    pub fn new<F>(step: F) -> Self
    where
        F: FnOnce(C) -> Effect<Fin<T>> + Send + 'static,
    {
        Self {
            step: Box::new(step),
        }
    }

    /// A pipeline that succeeds with `value` without touching the context.
    pub fn succeed(value: T) -> Self {
        Self::from_result(Ok(value))
    }

    /// A pipeline that fails with `error` without touching the context.
    pub fn fail(error: ErrorInfo) -> Self {
        Self::from_result(Err(error))
    }

    /// Lifts an already computed outcome.
    pub fn from_result(result: Fin<T>) -> Self {
        Self::new(move |_| Effect::pure(result))
    }

    /// Lifts a synchronous step over the context, e.g. staging a change.
    pub fn lift_pure<F>(function: F) -> Self
    where
        F: FnOnce(&C) -> T + Send + 'static,
    {
        Self::new(move |context| Effect::lift_sync(move || Ok(function(&context))))
    }

    /// Lifts a synchronous fallible step over the context.
    pub fn lift_fallible<F>(function: F) -> Self
    where
        F: FnOnce(&C) -> Fin<T> + Send + 'static,
    {
        Self::new(move |context| Effect::lift_sync(move || function(&context)))
    }

    /// Lifts an asynchronous step over the context.
    ///
    /// The step receives a clone of the context and the run's cancellation
    /// token.
    pub fn lift_query<F, Fut>(function: F) -> Self
    where
        F: FnOnce(C, CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Fin<T>> + Send + 'static,
    {
        Self::new(move |context| Effect::lift_async(move |token| function(context, token)))
    }

    /// Lifts an effect that does not need the context.
    pub fn lift_effect(effect: Effect<Fin<T>>) -> Self {
        Self::new(move |_| effect)
    }

    /// Sequences another pipeline after this one (monadic bind).
    ///
    /// `function` is never invoked when this pipeline fails.
    #[must_use]
    pub fn and_then<U, F>(self, function: F) -> Pipeline<C, U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Pipeline<C, U> + Send + 'static,
    {
        Pipeline::new(move |context: C| {
            let next = context.clone();
            (self.step)(context).flat_map(move |result| match result {
                Ok(value) => function(value).run(next),
                Err(error) => Effect::fail(error),
            })
        })
    }

    /// Maps the success value.
    #[must_use]
    pub fn map<U, F>(self, function: F) -> Pipeline<C, U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        Pipeline::new(move |context| (self.step)(context).fmap(move |result| result.map(function)))
    }

    /// Maps the failure.
    #[must_use]
    pub fn map_err<F>(self, function: F) -> Self
    where
        F: FnOnce(ErrorInfo) -> ErrorInfo + Send + 'static,
    {
        Self::new(move |context| (self.step)(context).fmap(move |result| result.map_err(function)))
    }

    /// Chains a synchronous fallible function of the success value.
    #[must_use]
    pub fn bind_result<U, F>(self, function: F) -> Pipeline<C, U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Fin<U> + Send + 'static,
    {
        Pipeline::new(move |context| {
            (self.step)(context).fmap(move |result| result.and_then(function))
        })
    }

    /// Runs an alternative pipeline when this one fails.
    ///
    /// This is the only recovery combinator; nothing recovers implicitly.
    #[must_use]
    pub fn or_else<F>(self, function: F) -> Self
    where
        F: FnOnce(ErrorInfo) -> Self + Send + 'static,
    {
        Self::new(move |context: C| {
            let next = context.clone();
            (self.step)(context).flat_map(move |result| match result {
                Ok(value) => Effect::succeed(value),
                Err(error) => function(error).run(next),
            })
        })
    }

    /// Runs both pipelines and combines their values.
    ///
    /// Both are invoked before either failure is reported; when both fail
    /// the failure of `self` wins.
    #[must_use]
    pub fn combine<U, R, F>(self, other: Pipeline<C, U>, combinator: F) -> Pipeline<C, R>
    where
        U: Send + 'static,
        R: Send + 'static,
        F: FnOnce(T, U) -> R + Send + 'static,
    {
        Pipeline::new(move |context: C| {
            let left = (self.step)(context.clone());
            let right = other.run(context);
            left.zip(right)
                .fmap(move |(left, right)| combine2(left, right, combinator))
        })
    }

    /// Runs pipelines in order, collecting their values.
    ///
    /// Stops at the first failure; later pipelines are not run.
    #[must_use]
    pub fn sequence<I>(pipelines: I) -> Pipeline<C, Vec<T>>
    where
        I: IntoIterator<Item = Self>,
    {
        pipelines
            .into_iter()
            .fold(Pipeline::succeed(Vec::new()), |collected, next| {
                collected.and_then(move |mut values| {
                    next.map(move |value| {
                        values.push(value);
                        values
                    })
                })
            })
    }

    /// Binds the pipeline to a context, producing the effect to run.
    pub fn run(self, context: C) -> Effect<Fin<T>> {
        (self.step)(context)
    }
}

impl<C, T> fmt::Debug for Pipeline<C, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Pipeline").finish_non_exhaustive()
    }
}
