//! Reusable entity-access pipelines.
//!
//! These combinators cover the read / validate / mutate idiom every write
//! handler follows:
//!
//! - [`get_entity`] / [`get_entities`] / [`get_entities_with_pagination`]
//!   read rows shaped by [`QueryOptions`]
//! - [`add_entity`] / [`add_entity_with`] stage inserts
//! - [`get_update_entity`] loads one row and folds [`Transition`]s over it
//! - [`delete_entity`] and [`ensure_absent`] cover deletes and uniqueness
//!
//! Every asynchronous step checks the cancellation token before touching the
//! context. Nothing here commits; that is the transaction runner's job.
//!
//! # Examples
//!
//! ```rust
//! use storefront::prelude::*;
//!
//! #[derive(Debug, Clone)]
//! struct Counter {
//!     id: u32,
//!     value: i64,
//! }
//!
//! impl Entity for Counter {
//!     type Id = u32;
//!     const NAME: &'static str = "Counter";
//!
//!     fn id(&self) -> u32 {
//!         self.id
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = MemoryStore::new();
//! store.seed([Counter { id: 1, value: 0 }]);
//!
//! let increment = get_update_entity(
//!     |counter: &Counter| counter.id == 1,
//!     ErrorInfo::not_found("Counter was not found."),
//!     QueryOptions::new(),
//!     [Transition::pure(|mut counter: Counter| {
//!         counter.value += 1;
//!         Ok(counter)
//!     })],
//! );
//!
//! let runner = TransactionRunner::new(PipelineConfig::default());
//! let updated = runner
//!     .run_save(increment, store.context(), CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert_eq!(updated.value, 1);
//! assert_eq!(store.find::<Counter>(&1).unwrap().value, 1);
//! # });
//! ```

use std::fmt;

use crate::effect::{Effect, ensure_active};
use crate::error::ErrorInfo;
use crate::outcome::Fin;
use crate::persistence::{DataContext, Entity};
use crate::pipeline::Pipeline;
use crate::query::{Page, PageRequest, QueryOptions};

/// An effect run against an entity right after its insert is staged.
pub type AfterInsert<E> = Box<dyn FnOnce(E) -> Effect<Fin<E>> + Send>;

// =============================================================================
// Reads
// =============================================================================

/// Loads the first row matching `predicate` under the options' ordering.
///
/// # Errors
///
/// The pipeline fails with `not_found` when no row matches.
pub fn get_entity<C, E, P>(predicate: P, not_found: ErrorInfo, options: QueryOptions<E>) -> Pipeline<C, E>
where
    C: DataContext,
    E: Entity,
    P: Fn(&E) -> bool + Send + Sync + 'static,
{
    let options = options.add_filter(predicate).with_limit(1);
    Pipeline::lift_query(move |context: C, token| async move {
        ensure_active(&token)?;
        let rows = context.query(options).await?;
        rows.into_iter().next().ok_or(not_found)
    })
}

/// Loads every row matching `predicate`. No match is an empty `Vec`.
pub fn get_entities<C, E, P>(predicate: P, options: QueryOptions<E>) -> Pipeline<C, Vec<E>>
where
    C: DataContext,
    E: Entity,
    P: Fn(&E) -> bool + Send + Sync + 'static,
{
    let options = options.add_filter(predicate);
    Pipeline::lift_query(move |context: C, token| async move {
        ensure_active(&token)?;
        context.query(options).await
    })
}

/// Loads one page of rows matching `predicate` and projects each row.
///
/// The page slice and the filtered total come from one grouped query. An
/// empty result is an empty page with a total of zero.
pub fn get_entities_with_pagination<C, E, R, P, F>(
    predicate: P,
    options: QueryOptions<E>,
    request: PageRequest,
    projector: F,
) -> Pipeline<C, Page<R>>
where
    C: DataContext,
    E: Entity,
    R: Send + 'static,
    P: Fn(&E) -> bool + Send + Sync + 'static,
    F: FnMut(E) -> R + Send + 'static,
{
    let options = options.add_filter(predicate).add_pagination(request);
    Pipeline::lift_query(move |context: C, token| async move {
        ensure_active(&token)?;
        let slice = context.query_slice(options).await?;
        Ok(Page::new(slice.items, slice.total, request).map(projector))
    })
}

/// Fails with `conflict` when any row matches `predicate`.
///
/// Used for uniqueness checks before an insert.
pub fn ensure_absent<C, E, P>(predicate: P, conflict: ErrorInfo) -> Pipeline<C, ()>
where
    C: DataContext,
    E: Entity,
    P: Fn(&E) -> bool + Send + Sync + 'static,
{
    let options = QueryOptions::<E>::new()
        .add_filter(predicate)
        .with_limit(1)
        .as_no_tracking();
    Pipeline::lift_query(move |context: C, token| async move {
        ensure_active(&token)?;
        let rows = context.query(options).await?;
        if rows.is_empty() { Ok(()) } else { Err(conflict) }
    })
}

// =============================================================================
// Writes
// =============================================================================

/// Stages `entity` for insertion.
pub fn add_entity<C, E>(entity: E) -> Pipeline<C, E>
where
    C: DataContext,
    E: Entity,
{
    Pipeline::lift_fallible(move |context: &C| {
        context.stage_insert(entity.clone())?;
        Ok(entity)
    })
}

/// Builds an entity with `factory`, stages it, then runs `after_insert`.
///
/// A failing factory stages nothing. Each after-insert effect receives the
/// staged entity and its result replaces the staged version, in order.
///
/// # Examples
///
/// ```rust
/// use storefront::access::AfterInsert;
/// use storefront::prelude::*;
///
/// #[derive(Debug, Clone)]
/// struct Banner {
///     id: u32,
///     image_url: Option<String>,
/// }
///
/// impl Entity for Banner {
///     type Id = u32;
///     const NAME: &'static str = "Banner";
///
///     fn id(&self) -> u32 {
///         self.id
///     }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let upload: AfterInsert<Banner> = Box::new(|mut banner: Banner| {
///     Effect::lift_sync(move || {
///         banner.image_url = Some(format!("https://cdn.example/{}.png", banner.id));
///         Ok(banner)
///     })
/// });
///
/// let store = MemoryStore::new();
/// let runner = TransactionRunner::new(PipelineConfig::default());
/// let pipeline = add_entity_with(7, |id| Ok(Banner { id, image_url: None }), vec![upload]);
/// runner.run_save(pipeline, store.context(), CancellationToken::new()).await.unwrap();
///
/// let stored = store.find::<Banner>(&7).unwrap();
/// assert_eq!(stored.image_url.as_deref(), Some("https://cdn.example/7.png"));
/// # });
/// ```
pub fn add_entity_with<C, E, D, F>(dto: D, factory: F, after_insert: Vec<AfterInsert<E>>) -> Pipeline<C, E>
where
    C: DataContext,
    E: Entity,
    D: Send + 'static,
    F: FnOnce(D) -> Fin<E> + Send + 'static,
{
    Pipeline::lift_fallible(move |_: &C| factory(dto))
        .and_then(add_entity::<C, E>)
        .and_then(move |entity| {
            after_insert
                .into_iter()
                .fold(Pipeline::succeed(entity), |staged, effect| {
                    staged.and_then(move |current| {
                        Pipeline::lift_effect(effect(current)).and_then(restage::<C, E>)
                    })
                })
        })
}

/// A step of [`get_update_entity`]: a pure or effectful domain transition.
pub enum Transition<E> {
    /// A synchronous transition.
    Pure(Box<dyn FnOnce(E) -> Fin<E> + Send>),
    /// An asynchronous transition, e.g. one that calls another module.
    Effect(Box<dyn FnOnce(E) -> Effect<Fin<E>> + Send>),
}

impl<E> Transition<E>
where
    E: Send + 'static,
{
    /// Wraps a synchronous transition.
    pub fn pure<F>(transition: F) -> Self
    where
        F: FnOnce(E) -> Fin<E> + Send + 'static,
    {
        Self::Pure(Box::new(transition))
    }

    /// Wraps an asynchronous transition.
    pub fn effect<F>(transition: F) -> Self
    where
        F: FnOnce(E) -> Effect<Fin<E>> + Send + 'static,
    {
        Self::Effect(Box::new(transition))
    }

    fn apply(self, entity: E) -> Effect<Fin<E>> {
        match self {
            Self::Pure(transition) => Effect::pure(transition(entity)),
            Self::Effect(transition) => transition(entity),
        }
    }
}

impl<E> fmt::Debug for Transition<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pure(_) => formatter.write_str("Transition::Pure"),
            Self::Effect(_) => formatter.write_str("Transition::Effect"),
        }
    }
}

/// Loads one row, folds `transitions` over it and stages the result.
///
/// Transitions run left to right; the first failure stops the fold and
/// nothing is staged.
///
/// # Errors
///
/// The pipeline fails with `not_found` when no row matches, or with the
/// first failing transition's error.
pub fn get_update_entity<C, E, P, I>(
    predicate: P,
    not_found: ErrorInfo,
    options: QueryOptions<E>,
    transitions: I,
) -> Pipeline<C, E>
where
    C: DataContext,
    E: Entity,
    P: Fn(&E) -> bool + Send + Sync + 'static,
    I: IntoIterator<Item = Transition<E>>,
{
    let transitions: Vec<Transition<E>> = transitions.into_iter().collect();
    get_entity(predicate, not_found, options).and_then(move |entity| {
        let folded = transitions
            .into_iter()
            .fold(Effect::succeed(entity), |current, transition| {
                current.flat_map(move |result| match result {
                    Ok(entity) => transition.apply(entity),
                    Err(error) => Effect::fail(error),
                })
            });
        Pipeline::lift_effect(folded).and_then(restage::<C, E>)
    })
}

/// [`get_update_entity`] with only asynchronous transitions.
///
/// # Errors
///
/// As [`get_update_entity`].
pub fn get_update_entity_async<C, E, P, I, F>(
    predicate: P,
    not_found: ErrorInfo,
    options: QueryOptions<E>,
    transitions: I,
) -> Pipeline<C, E>
where
    C: DataContext,
    E: Entity,
    P: Fn(&E) -> bool + Send + Sync + 'static,
    I: IntoIterator<Item = F>,
    F: FnOnce(E) -> Effect<Fin<E>> + Send + 'static,
{
    get_update_entity(
        predicate,
        not_found,
        options,
        transitions.into_iter().map(Transition::effect),
    )
}

/// Loads one row and stages its deletion.
///
/// # Errors
///
/// The pipeline fails with `not_found` when no row matches.
pub fn delete_entity<C, E, P>(predicate: P, not_found: ErrorInfo) -> Pipeline<C, E>
where
    C: DataContext,
    E: Entity,
    P: Fn(&E) -> bool + Send + Sync + 'static,
{
    get_entity(predicate, not_found, QueryOptions::new()).and_then(|entity| {
        Pipeline::lift_fallible(move |context: &C| {
            context.stage_delete(entity.clone())?;
            Ok(entity)
        })
    })
}

fn restage<C, E>(entity: E) -> Pipeline<C, E>
where
    C: DataContext,
    E: Entity,
{
    Pipeline::lift_fallible(move |context: &C| {
        context.stage_update(entity.clone())?;
        Ok(entity)
    })
}
