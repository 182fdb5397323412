//! The transaction runner.
//!
//! [`TransactionRunner`] evaluates a [`Pipeline`] against a request context
//! and decides what happens to the staged changes:
//!
//! - [`TransactionRunner::run`] is read-only: staged changes are discarded.
//! - [`TransactionRunner::run_save`] commits on success. Before the commit
//!   every staged insert and update is stamped with the audit actor and time;
//!   after it, pending domain events are drained and dispatched.
//! - [`TransactionRunner::run_save_and_raise`] additionally runs a
//!   post-commit hook whose failure is reported, not rolled back.
//!
//! On any failure nothing is committed and nothing is dispatched. Panics in
//! pipeline steps, subscribers and post-commit hooks are caught and become
//! `Internal` failures.
//!
//! Each run goes through a [`Transaction`], whose [`RunState`] moves
//! `NotStarted -> Executing -> CommittedAndDispatched | Completed | Failed`.
//! There is no retry loop.

mod audit;
mod dispatch;

pub use audit::{ActorSource, Clock};
pub use dispatch::{DispatchFailure, DispatchReport, EventDispatcher, EventSubscriber};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::effect::Effect;
use crate::error::ErrorInfo;
use crate::outcome::Fin;
use crate::persistence::{AuditStamp, DataContext};
use crate::pipeline::Pipeline;
use crate::status::StatusValue;

crate::status_machine! {
    /// Lifecycle of one [`Transaction`].
    pub enum RunState: "transaction state" {
        unknown: Unknown = 0,
        /// Created, not yet run.
        NotStarted = 1, "NotStarted" => [Executing],
        /// The pipeline is being evaluated.
        Executing = 2, "Executing" => [CommittedAndDispatched, Completed, Failed],
        /// Changes committed and events dispatched.
        CommittedAndDispatched = 3, "CommittedAndDispatched" => [],
        /// A read-only run finished successfully.
        Completed = 4, "Completed" => [],
        /// The pipeline or the commit failed; nothing was written.
        Failed = 5, "Failed" => [],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    ReadOnly,
    Save,
}

impl Mode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read",
            Self::Save => "save",
        }
    }
}

/// The value of a committed transaction and the outcome of its post-commit
/// hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    /// The pipeline's value.
    pub value: T,
    /// The hook's outcome. A failure here did not roll anything back.
    pub post_commit: Fin<()>,
}

/// Runs pipelines as transactions.
///
/// The runner is cheap to clone and shared by every request; each run
/// receives its own context.
#[derive(Clone, Debug)]
pub struct TransactionRunner {
    dispatcher: EventDispatcher,
    actor: ActorSource,
    clock: Clock,
    config: Arc<PipelineConfig>,
}

impl TransactionRunner {
    /// A runner with no subscribers, no actor and the system clock.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            dispatcher: EventDispatcher::new(),
            actor: ActorSource::anonymous(),
            clock: Clock::system(),
            config: Arc::new(config),
        }
    }

    /// Adds an event subscriber.
    #[must_use]
    pub fn with_subscriber<S>(mut self, subscriber: S) -> Self
    where
        S: EventSubscriber + 'static,
    {
        self.dispatcher.subscribe(subscriber);
        self
    }

    /// Sets the audit actor source.
    #[must_use]
    pub fn with_actor_source(mut self, actor: ActorSource) -> Self {
        self.actor = actor;
        self
    }

    /// Sets the audit clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The runner's configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Opens a transaction over `context`.
    #[must_use]
    pub fn begin<C>(&self, context: C) -> Transaction<C>
    where
        C: DataContext,
    {
        Transaction {
            id: Uuid::new_v4(),
            context,
            state: RunState::NotStarted,
            runner: self.clone(),
            report: None,
        }
    }

    /// Evaluates a read-only pipeline. Nothing is committed.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's failure unchanged, or `Internal` for a panic.
    pub async fn run<C, T>(&self, pipeline: Pipeline<C, T>, context: C, token: CancellationToken) -> Fin<T>
    where
        C: DataContext,
        T: Send + 'static,
    {
        self.begin(context).run(pipeline, token).await
    }

    /// Evaluates a pipeline and commits its staged changes on success.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's failure unchanged, the commit's failure, or
    /// `Internal` for a panic. Nothing is committed in any of these cases.
    pub async fn run_save<C, T>(&self, pipeline: Pipeline<C, T>, context: C, token: CancellationToken) -> Fin<T>
    where
        C: DataContext,
        T: Send + 'static,
    {
        self.begin(context).run_save(pipeline, token).await
    }

    /// As [`TransactionRunner::run_save`], then runs `hook` on the committed
    /// value.
    ///
    /// # Errors
    ///
    /// As [`TransactionRunner::run_save`]. The hook's own failure is returned
    /// inside [`Committed::post_commit`].
    pub async fn run_save_and_raise<C, T, H>(
        &self,
        pipeline: Pipeline<C, T>,
        context: C,
        token: CancellationToken,
        hook: H,
    ) -> Fin<Committed<T>>
    where
        C: DataContext,
        T: Send + 'static,
        H: FnOnce(&T) -> Effect<Fin<()>> + Send,
    {
        let value = self.run_save(pipeline, context, token.clone()).await?;
        let post_commit = guarded(|| hook(&value)).run(token).await;
        if let Err(failure) = &post_commit {
            warn!(
                kind = %failure.kind(),
                message = failure.message(),
                "post-commit hook failed"
            );
        }
        Ok(Committed { value, post_commit })
    }
}

impl Default for TransactionRunner {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

/// One execution of a pipeline against one context.
#[derive(Debug)]
pub struct Transaction<C> {
    id: Uuid,
    context: C,
    state: RunState,
    runner: TransactionRunner,
    report: Option<DispatchReport>,
}

impl<C> Transaction<C>
where
    C: DataContext,
{
    /// The transaction id, also recorded on its tracing span.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// What the event dispatch after the commit delivered, once it ran.
    #[must_use]
    pub const fn dispatch_report(&self) -> Option<&DispatchReport> {
        self.report.as_ref()
    }

    /// Evaluates a read-only pipeline.
    ///
    /// # Errors
    ///
    /// As [`TransactionRunner::run`], plus `InvalidOperation` when this
    /// transaction already ran.
    pub async fn run<T>(&mut self, pipeline: Pipeline<C, T>, token: CancellationToken) -> Fin<T>
    where
        T: Send + 'static,
    {
        self.execute(pipeline, token, Mode::ReadOnly).await
    }

    /// Evaluates a pipeline and commits on success.
    ///
    /// # Errors
    ///
    /// As [`TransactionRunner::run_save`], plus `InvalidOperation` when this
    /// transaction already ran.
    pub async fn run_save<T>(&mut self, pipeline: Pipeline<C, T>, token: CancellationToken) -> Fin<T>
    where
        T: Send + 'static,
    {
        self.execute(pipeline, token, Mode::Save).await
    }

    async fn execute<T>(&mut self, pipeline: Pipeline<C, T>, token: CancellationToken, mode: Mode) -> Fin<T>
    where
        T: Send + 'static,
    {
        if self.state != RunState::NotStarted {
            return Err(ErrorInfo::invalid_operation(format!(
                "Transaction {} has already run.",
                self.id
            )));
        }

        let span = info_span!("transaction", id = %self.id, mode = mode.as_str());
        async {
            self.advance(RunState::Executing)?;
            let outcome = self.evaluate(pipeline, token.clone()).await;
            match (mode, outcome) {
                (_, Err(failure)) => Err(self.fail(failure)),
                (Mode::ReadOnly, Ok(value)) => {
                    self.context.discard_changes();
                    self.advance(RunState::Completed)?;
                    Ok(value)
                }
                (Mode::Save, Ok(value)) => self.commit(&token).await.map(|()| value),
            }
        }
        .instrument(span)
        .await
    }

    async fn evaluate<T>(&self, pipeline: Pipeline<C, T>, token: CancellationToken) -> Fin<T>
    where
        T: Send + 'static,
    {
        let context = self.context.clone();
        AssertUnwindSafe(async move { pipeline.run(context).run(token).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ErrorInfo::from_panic(panic.as_ref())))
    }

    async fn commit(&mut self, token: &CancellationToken) -> Fin<()> {
        let config = &self.runner.config;
        let actor = self
            .runner
            .actor
            .current()
            .unwrap_or_else(|| config.system_actor.clone());
        let stamp = AuditStamp::new(actor, self.runner.clock.now());
        let stamped = self.context.stamp_audit(&stamp);

        let summary = match self.context.save_changes().await {
            Ok(summary) => summary,
            Err(failure) => return Err(self.fail(failure)),
        };

        let records = self.context.drain_events();
        info!(
            actor = %stamp.actor,
            stamped,
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            events = records.len(),
            "transaction committed"
        );

        let report = self.runner.dispatcher.dispatch(&records, token).await;
        if !report.is_clean() {
            warn!(failures = report.failures.len(), "event dispatch reported failures");
        }
        self.report = Some(report);
        self.advance(RunState::CommittedAndDispatched)
    }

    fn fail(&mut self, failure: ErrorInfo) -> ErrorInfo {
        self.context.discard_changes();
        if let Ok(next) = self.state.transition_to(RunState::Failed) {
            self.state = next;
        }
        if failure.is_expected() {
            debug!(kind = %failure.kind(), message = failure.message(), "transaction failed");
        } else {
            error!(kind = %failure.kind(), message = failure.message(), "transaction failed");
        }
        failure
    }

    fn advance(&mut self, target: RunState) -> Fin<()> {
        let next = self.state.transition_to(target)?;
        debug!(from = %self.state, to = %next, "transaction state changed");
        self.state = next;
        Ok(())
    }
}

// Panics while building or running the effect become `Internal` failures.
fn guarded<T, F>(build: F) -> Effect<Fin<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Effect<Fin<T>>,
{
    match panic::catch_unwind(AssertUnwindSafe(build)) {
        Ok(effect) => Effect::lift_async(move |token| {
            AssertUnwindSafe(effect.run(token))
                .catch_unwind()
                .map(|outcome| outcome.unwrap_or_else(|panic| Err(ErrorInfo::from_panic(panic.as_ref()))))
        }),
        Err(panic) => Effect::fail(ErrorInfo::from_panic(panic.as_ref())),
    }
}
