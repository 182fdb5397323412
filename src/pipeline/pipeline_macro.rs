//! Do-notation for [`Pipeline`](super::Pipeline).
//!
//! ```text
//! pipeline! {
//!     pattern <= pipeline_expression;   // bind: runs the pipeline, short-circuits on Err
//!     let pattern = expression;         // pure let binding
//!     ...
//!     pipeline_expression               // final expression: must be a Pipeline
//! }
//! ```
//!
//! `<=` stands in for `<-`, which macro patterns cannot match.

/// Do-notation macro for [`Pipeline`](crate::pipeline::Pipeline).
///
/// Each bind is an [`and_then`](crate::pipeline::Pipeline::and_then), so a
/// failing step prevents every later step from being built or run.
///
/// # Syntax
///
/// - `pattern <= pipeline;` - Bind the success value
/// - `(a, b) <= pipeline;` - Bind with a tuple pattern
/// - `_ <= pipeline;` - Run for its effect only
/// - `let pattern = expr;` - Pure let binding
/// - `pipeline` - Final expression
///
/// # Examples
///
/// ```rust
/// use storefront::pipeline;
/// use storefront::pipeline::Pipeline;
/// use tokio_util::sync::CancellationToken;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let composed: Pipeline<(), i32> = pipeline! {
///     price <= Pipeline::succeed(20);
///     (quantity, discount) <= Pipeline::succeed((3, 10));
///     let gross = price * quantity;
///     Pipeline::succeed(gross - discount)
/// };
///
/// assert_eq!(composed.run(()).run(CancellationToken::new()).await, Ok(50));
/// # });
/// ```
#[macro_export]
macro_rules! pipeline {
    // Terminal case: single expression (must be a Pipeline)
    ($result:expr) => {
        $result
    };

    // Bind with identifier pattern: `identifier <= pipeline; rest`
    ($pattern:ident <= $step:expr ; $($rest:tt)+) => {
        $crate::pipeline::Pipeline::and_then($step, move |$pattern| {
            $crate::pipeline!($($rest)+)
        })
    };

    // Bind with tuple pattern: `(pattern1, pattern2) <= pipeline; rest`
    (($($pattern:tt)*) <= $step:expr ; $($rest:tt)+) => {
        $crate::pipeline::Pipeline::and_then($step, move |($($pattern)*)| {
            $crate::pipeline!($($rest)+)
        })
    };

    // Bind with wildcard pattern: `_ <= pipeline; rest`
    (_ <= $step:expr ; $($rest:tt)+) => {
        $crate::pipeline::Pipeline::and_then($step, move |_| {
            $crate::pipeline!($($rest)+)
        })
    };

    // Pure let binding with identifier: `let identifier = expr; rest`
    (let $pattern:ident = $expr:expr ; $($rest:tt)+) => {
        {
            let $pattern = $expr;
            $crate::pipeline!($($rest)+)
        }
    };

    // Pure let binding with tuple pattern: `let (a, b) = expr; rest`
    (let ($($pattern:tt)*) = $expr:expr ; $($rest:tt)+) => {
        {
            let ($($pattern)*) = $expr;
            $crate::pipeline!($($rest)+)
        }
    };

    // Pure let binding with type annotation: `let identifier: Type = expr; rest`
    (let $pattern:ident : $ty:ty = $expr:expr ; $($rest:tt)+) => {
        {
            let $pattern: $ty = $expr;
            $crate::pipeline!($($rest)+)
        }
    };
}
