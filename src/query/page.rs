//! Page requests and paged results.

use crate::error::ErrorInfo;
use crate::outcome::Fin;

/// A validated, one-based page request.
///
/// Construction rejects non-positive numbers and sizes; nothing downstream
/// clamps them.
///
/// # Examples
///
/// ```rust
/// use storefront::query::PageRequest;
///
/// let request = PageRequest::new(3, 10).unwrap();
/// assert_eq!(request.offset(), 20);
///
/// assert!(PageRequest::new(1, 0).is_err());
/// assert!(PageRequest::bounded(1, 500, 100).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageRequest {
    number: u32,
    size: u32,
}

impl PageRequest {
    /// Validates a page number and size.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when either value is not positive or does not
    /// fit in `u32`.
    pub fn new(number: i64, size: i64) -> Fin<Self> {
        let number = positive(number, "Page number")?;
        let size = positive(size, "Page size")?;
        Ok(Self { number, size })
    }

    /// Validates a page request and additionally caps the size.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when [`PageRequest::new`] would, or when `size`
    /// exceeds `max_size`.
    pub fn bounded(number: i64, size: i64, max_size: u32) -> Fin<Self> {
        let request = Self::new(number, size)?;
        if request.size > max_size {
            return Err(ErrorInfo::validation(format!(
                "Page size must not exceed {max_size}."
            )));
        }
        Ok(request)
    }

    /// The one-based page number.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// The page size.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of rows preceding this page.
    #[must_use]
    pub const fn offset(&self) -> usize {
        (self.number as usize - 1) * self.size as usize
    }
}

fn positive(value: i64, label: &str) -> Fin<u32> {
    if value <= 0 {
        return Err(ErrorInfo::validation(format!(
            "{label} must be greater than zero."
        )));
    }
    u32::try_from(value).map_err(|_| ErrorInfo::validation(format!("{label} is too large.")))
}

/// One page of projected results plus the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Page<R> {
    /// The rows on this page.
    pub items: Vec<R>,
    /// Rows matching the filters before paging.
    pub total_count: usize,
    /// The one-based page number.
    pub page_number: u32,
    /// The requested page size.
    pub page_size: u32,
}

impl<R> Page<R> {
    /// Assembles a page for `request`.
    #[must_use]
    pub const fn new(items: Vec<R>, total_count: usize, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            page_number: request.number,
            page_size: request.size,
        }
    }

    /// Total number of pages; zero for an empty set.
    #[must_use]
    pub const fn total_pages(&self) -> usize {
        self.total_count.div_ceil(self.page_size as usize)
    }

    /// Whether a later page exists.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        (self.page_number as usize) < self.total_pages()
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub const fn has_previous_page(&self) -> bool {
        self.page_number > 1
    }

    /// Projects every item, keeping the paging metadata.
    #[must_use]
    pub fn map<U, F>(self, function: F) -> Page<U>
    where
        F: FnMut(R) -> U,
    {
        Page {
            items: self.items.into_iter().map(function).collect(),
            total_count: self.total_count,
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}
