//! String-keyed include resolution.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ErrorInfo;
use crate::outcome::Fin;

use super::QueryOptions;

type Shaper<E> = Arc<dyn Fn(QueryOptions<E>) -> QueryOptions<E> + Send + Sync>;

/// Maps the include keys a caller may request to typed option builders.
///
/// Unknown keys are rejected rather than ignored.
///
/// # Examples
///
/// ```rust
/// use storefront::query::{IncludeRegistry, QueryOptions};
///
/// #[derive(Debug, Clone)]
/// struct Product;
///
/// let registry = IncludeRegistry::<Product>::new()
///     .with_path("variants", "variants")
///     .with_path("images", "images");
///
/// let options = registry.apply(QueryOptions::new(), "variants, images").unwrap();
/// assert_eq!(options.includes(), ["variants", "images"]);
///
/// let error = registry.apply(QueryOptions::new(), "variants,reviews").unwrap_err();
/// assert_eq!(error.message(), "Unknown include: reviews");
/// ```
pub struct IncludeRegistry<E> {
    entries: BTreeMap<String, Shaper<E>>,
}

impl<E> IncludeRegistry<E> {
    /// An empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registers `key` with an arbitrary options builder.
    #[must_use]
    pub fn with<F>(mut self, key: impl Into<String>, shaper: F) -> Self
    where
        F: Fn(QueryOptions<E>) -> QueryOptions<E> + Send + Sync + 'static,
    {
        self.entries.insert(key.into(), Arc::new(shaper));
        self
    }

    /// Registers `key` as a plain eager-load of `path`.
    #[must_use]
    pub fn with_path(self, key: impl Into<String>, path: &'static str) -> Self
    where
        E: 'static,
    {
        self.with(key, move |options| options.add_include(path))
    }

    /// The registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Applies every key of a comma-separated list, in order.
    ///
    /// Blank segments are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Validation("Unknown include: <key>")` for the first key that
    /// is not registered.
    pub fn apply(&self, options: QueryOptions<E>, requested: &str) -> Fin<QueryOptions<E>> {
        requested
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .try_fold(options, |options, key| {
                self.entries
                    .get(key)
                    .map(|shaper| shaper(options))
                    .ok_or_else(|| ErrorInfo::validation(format!("Unknown include: {key}")))
            })
    }
}

impl<E> Default for IncludeRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for IncludeRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<E> fmt::Debug for IncludeRegistry<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("IncludeRegistry")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
