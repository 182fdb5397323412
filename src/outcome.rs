//! Railway-oriented outcomes.
//!
//! [`Fin<T>`] is `Result<T, ErrorInfo>`: either a success value or a typed
//! failure, never both. Sequencing with [`FinExt::bind`] (or `?`)
//! short-circuits on the first failure.
//!
//! Two ways of combining independent outcomes are provided and they are not
//! interchangeable:
//!
//! - [`combine2`] .. [`combine5`] ("combine independent"): every input is
//!   already materialised; if any failed, the **leftmost** failure is
//!   returned unchanged. This is the only combination used for pipeline
//!   composition.
//! - [`accumulate`], [`accumulate2`], [`accumulate3`] ("accumulate mode"):
//!   every failure is merged into one aggregate `Validation` failure. Use it
//!   only for independent field validation.
//!
//! # Examples
//!
//! ```rust
//! use storefront::error::ErrorInfo;
//! use storefront::outcome::{Fin, FinExt, combine3, fail, succeed};
//!
//! let first: Fin<i32> = succeed(1);
//! let second: Fin<i32> = fail(ErrorInfo::not_found("second"));
//! let third: Fin<i32> = fail(ErrorInfo::conflict("third"));
//!
//! let combined = combine3(first, second, third, |a, b, c| a + b + c);
//! assert_eq!(combined.unwrap_err().message(), "second");
//!
//! let doubled = succeed(21).bind(|value| succeed(value * 2));
//! assert_eq!(doubled, Ok(42));
//! ```

use crate::error::ErrorInfo;

/// The outcome of a fallible step.
pub type Fin<T> = Result<T, ErrorInfo>;

/// Lifts a value into a successful outcome.
#[inline]
pub const fn succeed<T>(value: T) -> Fin<T> {
    Ok(value)
}

/// Lifts a failure into an outcome.
#[inline]
pub const fn fail<T>(error: ErrorInfo) -> Fin<T> {
    Err(error)
}

/// Combinators on [`Fin`] that `Result` does not name directly.
pub trait FinExt<T>: Sized {
    /// Chains a fallible function; `function` is never invoked on a failure.
    ///
    /// # Errors
    ///
    /// Returns the receiver's failure, or the failure produced by `function`.
    fn bind<U, F>(self, function: F) -> Fin<U>
    where
        F: FnOnce(T) -> Fin<U>;

    /// Folds both cases into one value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use storefront::outcome::{FinExt, succeed};
    ///
    /// let rendered = succeed(3).match_with(|n| format!("ok {n}"), |e| e.to_string());
    /// assert_eq!(rendered, "ok 3");
    /// ```
    fn match_with<R, S, F>(self, on_success: S, on_failure: F) -> R
    where
        S: FnOnce(T) -> R,
        F: FnOnce(ErrorInfo) -> R;

    /// Fails with `error` unless `predicate` holds for the success value.
    ///
    /// # Errors
    ///
    /// Returns the receiver's failure, or `error(&value)` when the predicate
    /// rejects the value.
    fn ensure<P, F>(self, predicate: P, error: F) -> Fin<T>
    where
        P: FnOnce(&T) -> bool,
        F: FnOnce(&T) -> ErrorInfo;

    /// Observes a failure without changing the outcome.
    #[must_use]
    fn tap_failure<F>(self, observer: F) -> Self
    where
        F: FnOnce(&ErrorInfo);
}

impl<T> FinExt<T> for Fin<T> {
    #[inline]
    fn bind<U, F>(self, function: F) -> Fin<U>
    where
        F: FnOnce(T) -> Fin<U>,
    {
        match self {
            Ok(value) => function(value),
            Err(error) => Err(error),
        }
    }

    #[inline]
    fn match_with<R, S, F>(self, on_success: S, on_failure: F) -> R
    where
        S: FnOnce(T) -> R,
        F: FnOnce(ErrorInfo) -> R,
    {
        match self {
            Ok(value) => on_success(value),
            Err(error) => on_failure(error),
        }
    }

    fn ensure<P, F>(self, predicate: P, error: F) -> Fin<T>
    where
        P: FnOnce(&T) -> bool,
        F: FnOnce(&T) -> ErrorInfo,
    {
        match self {
            Ok(value) if predicate(&value) => Ok(value),
            Ok(value) => Err(error(&value)),
            Err(failure) => Err(failure),
        }
    }

    fn tap_failure<F>(self, observer: F) -> Self
    where
        F: FnOnce(&ErrorInfo),
    {
        if let Err(error) = &self {
            observer(error);
        }
        self
    }
}

// =============================================================================
// Combine independent (leftmost failure wins)
// =============================================================================

macro_rules! define_combine {
    ($(#[$meta:meta])* $name:ident => $($value:ident : $type:ident),+) => {
        $(#[$meta])*
        ///
        /// # Errors
        ///
        /// Returns the leftmost failing input unchanged.
        pub fn $name<$($type,)+ R, F>($($value: Fin<$type>,)+ combinator: F) -> Fin<R>
        where
            F: FnOnce($($type),+) -> R,
        {
            Ok(combinator($($value?),+))
        }
    };
}

define_combine!(
    /// Combines two independent outcomes.
    combine2 => first: A, second: B
);
define_combine!(
    /// Combines three independent outcomes.
    combine3 => first: A, second: B, third: C
);
define_combine!(
    /// Combines four independent outcomes.
    combine4 => first: A, second: B, third: C, fourth: D
);
define_combine!(
    /// Combines five independent outcomes.
    combine5 => first: A, second: B, third: C, fourth: D, fifth: G
);

// =============================================================================
// Accumulate mode (field validation only)
// =============================================================================

/// Merges every failure of `results` into one outcome.
///
/// A single failure is returned unchanged; several are merged with
/// [`ErrorInfo::merge`] in input order.
///
/// # Errors
///
/// Returns the merged failure when at least one input failed.
///
/// # Examples
///
/// ```rust
/// use storefront::error::ErrorInfo;
/// use storefront::outcome::{accumulate, fail, succeed};
///
/// let outcome = accumulate([
///     succeed(()),
///     fail(ErrorInfo::validation("Name is required.")),
///     fail(ErrorInfo::validation("Postcode is required.")),
/// ]);
/// assert_eq!(outcome.unwrap_err().details().len(), 2);
/// ```
pub fn accumulate<I>(results: I) -> Fin<()>
where
    I: IntoIterator<Item = Fin<()>>,
{
    merge_failures(results.into_iter().filter_map(Result::err)).map_or(Ok(()), Err)
}

/// Applies `combinator` when both outcomes succeed, otherwise merges failures.
///
/// # Errors
///
/// Returns every failure merged into one `Validation` failure.
pub fn accumulate2<A, B, R, F>(first: Fin<A>, second: Fin<B>, combinator: F) -> Fin<R>
where
    F: FnOnce(A, B) -> R,
{
    match (first, second) {
        (Ok(first), Ok(second)) => Ok(combinator(first, second)),
        (first, second) => Err(merged_or_internal([first.err(), second.err()])),
    }
}

/// Applies `combinator` when all three outcomes succeed, otherwise merges failures.
///
/// # Errors
///
/// Returns every failure merged into one `Validation` failure.
pub fn accumulate3<A, B, C, R, F>(
    first: Fin<A>,
    second: Fin<B>,
    third: Fin<C>,
    combinator: F,
) -> Fin<R>
where
    F: FnOnce(A, B, C) -> R,
{
    match (first, second, third) {
        (Ok(first), Ok(second), Ok(third)) => Ok(combinator(first, second, third)),
        (first, second, third) => Err(merged_or_internal([
            first.err(),
            second.err(),
            third.err(),
        ])),
    }
}

fn merge_failures<I>(failures: I) -> Option<ErrorInfo>
where
    I: IntoIterator<Item = ErrorInfo>,
{
    failures.into_iter().reduce(ErrorInfo::merge)
}

// Only reached when at least one slot holds a failure.
fn merged_or_internal<const N: usize>(failures: [Option<ErrorInfo>; N]) -> ErrorInfo {
    merge_failures(failures.into_iter().flatten())
        .unwrap_or_else(|| ErrorInfo::internal("accumulate reached with no failure"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;
    use std::cell::Cell;

    #[rstest]
    fn bind_does_not_invoke_function_on_failure() {
        let called = Cell::new(false);
        let result: Fin<i32> = fail::<i32>(ErrorInfo::not_found("missing")).bind(|value| {
            called.set(true);
            succeed(value)
        });
        assert!(!called.get());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[rstest]
    fn combine_returns_leftmost_failure() {
        let result = combine4(
            succeed(1),
            fail::<i32>(ErrorInfo::conflict("second")),
            succeed(3),
            fail::<i32>(ErrorInfo::validation("fourth")),
            |a, b, c, d| a + b + c + d,
        );
        assert_eq!(result.unwrap_err().message(), "second");
    }

    #[rstest]
    fn combine5_applies_combinator_when_all_succeed() {
        let result = combine5(
            succeed(1),
            succeed(2),
            succeed(3),
            succeed(4),
            succeed(5),
            |a, b, c, d, e| a + b + c + d + e,
        );
        assert_eq!(result, Ok(15));
    }

    #[rstest]
    fn accumulate_keeps_single_failure_unchanged() {
        let failure = ErrorInfo::invalid_operation("only one");
        let result = accumulate([succeed(()), Err(failure.clone())]);
        assert_eq!(result, Err(failure));
    }

    #[rstest]
    fn accumulate2_merges_both_failures() {
        let result: Fin<(i32, i32)> = accumulate2(
            fail(ErrorInfo::validation("left")),
            fail(ErrorInfo::validation("right")),
            |a, b| (a, b),
        );
        let error = result.unwrap_err();
        assert_eq!(error.details(), ["left", "right"]);
    }

    #[rstest]
    fn accumulate3_succeeds_when_all_succeed() {
        assert_eq!(
            accumulate3(succeed(1), succeed(2), succeed(3), |a, b, c| a * b * c),
            Ok(6)
        );
    }

    #[rstest]
    fn ensure_rejects_with_value_dependent_error() {
        let result = succeed(3).ensure(
            |value| *value > 5,
            |value| ErrorInfo::validation(format!("{value} is too small")),
        );
        assert_eq!(result.unwrap_err().message(), "3 is too small");
    }

    #[rstest]
    fn tap_failure_observes_without_changing() {
        let seen = Cell::new(None);
        let result = fail::<()>(ErrorInfo::forbidden("no")).tap_failure(|e| seen.set(Some(e.kind())));
        assert_eq!(seen.get(), Some(ErrorKind::Forbidden));
        assert!(result.is_err());
    }
}
