//! Sort keys and directions.

use std::fmt;

use chrono::{DateTime, Utc};

/// Direction of an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortDirection {
    /// Smallest key first.
    #[default]
    Ascending,
    /// Largest key first.
    Descending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => formatter.write_str("ASC"),
            Self::Descending => formatter.write_str("DESC"),
        }
    }
}

/// A totally ordered projection of a row used for sorting.
///
/// Keys of different variants compare by variant order; order keys should
/// therefore always produce the same variant.
///
/// # Examples
///
/// ```rust
/// use storefront::query::SortKey;
///
/// assert!(SortKey::from(1_i64) < SortKey::from(2_i64));
/// assert!(SortKey::from("apple") < SortKey::from("banana"));
/// assert!(
///     SortKey::Composite(vec![SortKey::from(1_i64), SortKey::from("b")])
///         > SortKey::Composite(vec![SortKey::from(1_i64), SortKey::from("a")])
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SortKey {
    /// Signed integers.
    Int(i64),
    /// Unsigned integers.
    UInt(u64),
    /// Text, compared lexicographically.
    Text(String),
    /// Instants.
    Time(DateTime<Utc>),
    /// Lexicographic combination of keys, for multi-column ordering.
    Composite(Vec<SortKey>),
}

impl From<i64> for SortKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SortKey {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for SortKey {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<u32> for SortKey {
    fn from(value: u32) -> Self {
        Self::UInt(u64::from(value))
    }
}

impl From<&str> for SortKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SortKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for SortKey {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value)
    }
}

impl From<Vec<Self>> for SortKey {
    fn from(value: Vec<Self>) -> Self {
        Self::Composite(value)
    }
}
