//! Query-shaping options.
//!
//! [`QueryOptions<E>`] is an immutable descriptor of how to load rows of `E`:
//! which navigations to eager-load, which predicates to apply, how to order
//! and page the result, and whether the loaded rows are tracked for updates.
//!
//! Every builder method borrows the receiver and returns a new value, so a
//! base set of options can be shared between handlers and extended per call:
//!
//! ```rust
//! use storefront::query::{PageRequest, QueryOptions};
//!
//! #[derive(Debug, Clone)]
//! struct Row {
//!     name: String,
//!     price: i64,
//! }
//!
//! let base = QueryOptions::<Row>::new()
//!     .add_include("variants")
//!     .add_order_by("price", |row| row.price.into());
//!
//! let cheap = base.add_filter(|row| row.price < 10).as_no_tracking();
//!
//! assert_eq!(base.filter_count(), 0);
//! assert_eq!(cheap.filter_count(), 1);
//! assert!(base.is_tracking());
//! assert!(!cheap.is_tracking());
//! ```
//!
//! # Determinism
//!
//! [`QueryOptions::evaluate`] filters, stable-sorts by the order key, counts
//! the filtered set and then pages it. Rows with equal keys keep their
//! storage order. Paging without an order key returns storage order, which
//! callers should not rely on.

mod include;
mod order;
mod page;

pub use include::IncludeRegistry;
pub use order::{SortDirection, SortKey};
pub use page::{Page, PageRequest};

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use crate::persistence::Entity;

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
type KeyFn<E> = Arc<dyn Fn(&E) -> SortKey + Send + Sync>;

struct OrderBy<E> {
    name: &'static str,
    key: KeyFn<E>,
}

impl<E> Clone for OrderBy<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            key: Arc::clone(&self.key),
        }
    }
}

/// Immutable description of a query over rows of `E`.
pub struct QueryOptions<E> {
    includes: Vec<String>,
    filters: Vec<Predicate<E>>,
    order: Option<OrderBy<E>>,
    direction: SortDirection,
    page: Option<PageRequest>,
    limit: Option<usize>,
    no_tracking: bool,
    split_query: bool,
}

impl<E> QueryOptions<E> {
    /// Options with no shaping: every row, storage order, tracked.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            includes: Vec::new(),
            filters: Vec::new(),
            order: None,
            direction: SortDirection::Ascending,
            page: None,
            limit: None,
            no_tracking: false,
            split_query: false,
        }
    }

    /// Adds an eager-load path. Repeated calls accumulate.
    #[must_use]
    pub fn add_include(&self, path: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.includes.push(path.into());
        next
    }

    /// Adds several eager-load paths in order.
    #[must_use]
    pub fn add_includes<I, S>(&self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.includes.extend(paths.into_iter().map(Into::into));
        next
    }

    /// Adds a predicate, ANDed with the existing ones.
    #[must_use]
    pub fn add_filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.filters.push(Arc::new(predicate));
        next
    }

    /// Sets the order key, replacing any previous one.
    ///
    /// `name` identifies the key in the [`QueryPlan`].
    #[must_use]
    pub fn add_order_by<K>(&self, name: &'static str, key: K) -> Self
    where
        K: Fn(&E) -> SortKey + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.order = Some(OrderBy {
            name,
            key: Arc::new(key),
        });
        next
    }

    /// Orders ascending.
    #[must_use]
    pub fn add_sort_asc(&self) -> Self {
        let mut next = self.clone();
        next.direction = SortDirection::Ascending;
        next
    }

    /// Orders descending.
    #[must_use]
    pub fn add_sort_desc(&self) -> Self {
        let mut next = self.clone();
        next.direction = SortDirection::Descending;
        next
    }

    /// Restricts the result to one page.
    #[must_use]
    pub fn add_pagination(&self, request: PageRequest) -> Self {
        let mut next = self.clone();
        next.page = Some(request);
        next
    }

    /// Caps the number of rows returned after paging.
    #[must_use]
    pub fn with_limit(&self, limit: usize) -> Self {
        let mut next = self.clone();
        next.limit = Some(limit);
        next
    }

    /// Loads rows without registering them with the change tracker.
    #[must_use]
    pub fn as_no_tracking(&self) -> Self {
        let mut next = self.clone();
        next.no_tracking = true;
        next
    }

    /// Hints that includes should be loaded with separate queries.
    #[must_use]
    pub fn as_split_query(&self) -> Self {
        let mut next = self.clone();
        next.split_query = true;
        next
    }

    /// The eager-load paths, in the order they were added.
    #[must_use]
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Number of predicates.
    #[must_use]
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// The sort direction.
    #[must_use]
    pub const fn direction(&self) -> SortDirection {
        self.direction
    }

    /// The page request, if any.
    #[must_use]
    pub const fn page(&self) -> Option<PageRequest> {
        self.page
    }

    /// Whether loaded rows are tracked.
    #[must_use]
    pub const fn is_tracking(&self) -> bool {
        !self.no_tracking
    }

    /// Whether the split-query hint is set.
    #[must_use]
    pub const fn is_split_query(&self) -> bool {
        self.split_query
    }

    /// Returns `true` when `row` satisfies every predicate.
    pub fn matches(&self, row: &E) -> bool {
        self.filters.iter().all(|predicate| predicate(row))
    }

    /// Applies filters, ordering, paging and limit to `rows`.
    ///
    /// `rows` must be in storage order. The returned total counts the
    /// filtered rows before paging and limiting.
    #[must_use]
    pub fn evaluate(&self, rows: Vec<E>) -> Slice<E> {
        let mut filtered: Vec<E> = rows.into_iter().filter(|row| self.matches(row)).collect();

        if let Some(order) = &self.order {
            match self.direction {
                SortDirection::Ascending => filtered.sort_by_cached_key(|row| (order.key)(row)),
                SortDirection::Descending => {
                    filtered.sort_by_cached_key(|row| Reverse((order.key)(row)));
                }
            }
        }

        let total = filtered.len();
        let skipped = self.page.map_or(0, |page| page.offset());
        let taken = match (self.page, self.limit) {
            (Some(page), Some(limit)) => (page.size() as usize).min(limit),
            (Some(page), None) => page.size() as usize,
            (None, Some(limit)) => limit,
            (None, None) => usize::MAX,
        };

        let items = filtered.into_iter().skip(skipped).take(taken).collect();
        Slice { items, total }
    }
}

impl<E> QueryOptions<E>
where
    E: Entity,
{
    /// Describes the query these options generate.
    ///
    /// The same options always produce an equal plan.
    #[must_use]
    pub fn plan(&self) -> QueryPlan {
        QueryPlan {
            entity: E::NAME,
            includes: self.includes.clone(),
            filters: self.filters.len(),
            order: self.order.as_ref().map(|order| (order.name, self.direction)),
            page: self.page,
            limit: self.limit,
            tracking: self.is_tracking(),
            split_query: self.split_query,
        }
    }
}

impl<E> Clone for QueryOptions<E> {
    fn clone(&self) -> Self {
        Self {
            includes: self.includes.clone(),
            filters: self.filters.clone(),
            order: self.order.clone(),
            direction: self.direction,
            page: self.page,
            limit: self.limit,
            no_tracking: self.no_tracking,
            split_query: self.split_query,
        }
    }
}

impl<E> Default for QueryOptions<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for QueryOptions<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("QueryOptions")
            .field("includes", &self.includes)
            .field("filters", &self.filters.len())
            .field("order", &self.order.as_ref().map(|order| order.name))
            .field("direction", &self.direction)
            .field("page", &self.page)
            .field("limit", &self.limit)
            .field("no_tracking", &self.no_tracking)
            .field("split_query", &self.split_query)
            .finish()
    }
}

/// The rows selected by [`QueryOptions::evaluate`] and the filtered total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice<E> {
    /// The selected rows, ordered and paged.
    pub items: Vec<E>,
    /// Rows matching the filters before paging.
    pub total: usize,
}

/// A comparable description of the query generated from [`QueryOptions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// [`Entity::NAME`] of the queried rows.
    pub entity: &'static str,
    /// Eager-load paths.
    pub includes: Vec<String>,
    /// Number of predicates.
    pub filters: usize,
    /// Order key name and direction.
    pub order: Option<(&'static str, SortDirection)>,
    /// Page request.
    pub page: Option<PageRequest>,
    /// Row cap.
    pub limit: Option<usize>,
    /// Whether rows are tracked.
    pub tracking: bool,
    /// Split-query hint.
    pub split_query: bool,
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "SELECT {}", self.entity)?;
        if !self.includes.is_empty() {
            write!(formatter, " INCLUDE {}", self.includes.join(", "))?;
        }
        if self.filters > 0 {
            write!(formatter, " WHERE <{} predicates>", self.filters)?;
        }
        if let Some((name, direction)) = self.order {
            write!(formatter, " ORDER BY {name} {direction}")?;
        }
        if let Some(page) = self.page {
            write!(formatter, " OFFSET {} FETCH {}", page.offset(), page.size())?;
        }
        if let Some(limit) = self.limit {
            write!(formatter, " LIMIT {limit}")?;
        }
        if !self.tracking {
            formatter.write_str(" NO TRACKING")?;
        }
        if self.split_query {
            formatter.write_str(" SPLIT")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: u32,
        group: i64,
    }

    impl Entity for Row {
        type Id = u32;
        const NAME: &'static str = "Row";

        fn id(&self) -> u32 {
            self.id
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 1, group: 2 },
            Row { id: 2, group: 1 },
            Row { id: 3, group: 2 },
            Row { id: 4, group: 1 },
            Row { id: 5, group: 3 },
        ]
    }

    fn ids(slice: &Slice<Row>) -> Vec<u32> {
        slice.items.iter().map(|row| row.id).collect()
    }

    #[rstest]
    fn builders_do_not_mutate_receiver() {
        let base = QueryOptions::<Row>::new().add_include("a");
        let extended = base.add_include("b").add_filter(|row| row.id > 1).as_split_query();

        assert_eq!(base.includes(), ["a"]);
        assert_eq!(extended.includes(), ["a", "b"]);
        assert_eq!(base.filter_count(), 0);
        assert!(!base.is_split_query());
    }

    #[rstest]
    fn filters_are_conjunctive() {
        let options = QueryOptions::<Row>::new()
            .add_filter(|row| row.group == 2)
            .add_filter(|row| row.id > 1);
        assert_eq!(ids(&options.evaluate(rows())), vec![3]);
    }

    #[rstest]
    fn equal_keys_keep_storage_order() {
        let ascending = QueryOptions::<Row>::new().add_order_by("group", |row| row.group.into());
        assert_eq!(ids(&ascending.evaluate(rows())), vec![2, 4, 1, 3, 5]);

        let descending = ascending.add_sort_desc();
        assert_eq!(ids(&descending.evaluate(rows())), vec![5, 1, 3, 2, 4]);
    }

    #[rstest]
    fn total_counts_filtered_rows_before_paging() {
        let options = QueryOptions::<Row>::new()
            .add_filter(|row| row.id != 5)
            .add_order_by("id", |row| row.id.into())
            .add_pagination(PageRequest::new(2, 3).unwrap());
        let slice = options.evaluate(rows());
        assert_eq!(slice.total, 4);
        assert_eq!(ids(&slice), vec![4]);
    }

    #[rstest]
    fn page_past_the_end_is_empty() {
        let options = QueryOptions::<Row>::new().add_pagination(PageRequest::new(9, 10).unwrap());
        let slice = options.evaluate(rows());
        assert!(slice.items.is_empty());
        assert_eq!(slice.total, 5);
    }

    #[rstest]
    fn plan_is_stable_and_reflects_options() {
        let options = QueryOptions::<Row>::new()
            .add_include("children")
            .add_order_by("group", |row| row.group.into())
            .add_sort_desc()
            .as_no_tracking();

        assert_eq!(options.plan(), options.plan());
        assert_eq!(options.plan(), options.clone().plan());
        assert_eq!(
            options.plan().to_string(),
            "SELECT Row INCLUDE children ORDER BY group DESC NO TRACKING"
        );
        assert_ne!(options.plan(), options.add_sort_asc().plan());
    }
}
