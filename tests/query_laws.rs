//! Property-based tests for query shaping.
//!
//! - Pages of a fixed ordering are disjoint and concatenate to the full
//!   ordered result.
//! - Evaluating the same options twice on unchanged data yields the same
//!   plan and the same slice.

mod common;

use common::Widget;
use proptest::prelude::*;
use storefront::prelude::*;

fn widgets(stocks: &[u32]) -> Vec<Widget> {
    stocks
        .iter()
        .enumerate()
        .map(|(index, stock)| {
            let mut widget = Widget::new(u32::try_from(index).unwrap_or(u32::MAX), "w");
            widget.stock = *stock;
            widget
        })
        .collect()
}

fn ids(rows: &[Widget]) -> Vec<u32> {
    rows.iter().map(|widget| widget.id).collect()
}

fn by_stock() -> QueryOptions<Widget> {
    QueryOptions::new().add_order_by("stock", |widget: &Widget| widget.stock.into())
}

// =============================================================================
// Pagination
// =============================================================================

proptest! {
    /// Concatenating every page reproduces the full ordered result, and no
    /// row appears on two pages.
    #[test]
    fn prop_pages_concatenate_to_ordered_set(
        stocks in prop::collection::vec(0_u32..20, 0..60),
        size in 1_i64..15,
    ) {
        let rows = widgets(&stocks);
        let full = ids(&by_stock().evaluate(rows.clone()).items);

        let mut concatenated = Vec::new();
        let mut number = 1;
        loop {
            let request = PageRequest::new(number, size).unwrap();
            let slice = by_stock().add_pagination(request).evaluate(rows.clone());
            prop_assert_eq!(slice.total, rows.len());
            if slice.items.is_empty() {
                break;
            }
            concatenated.extend(ids(&slice.items));
            number += 1;
        }

        let mut unique = concatenated.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), concatenated.len());
        prop_assert_eq!(concatenated, full);
    }

    /// Page 2 after page 1 (size 10) is the second block of ten rows.
    #[test]
    fn prop_first_two_pages_cover_first_twenty(stocks in prop::collection::vec(0_u32..5, 20..40)) {
        let rows = widgets(&stocks);
        let full = ids(&by_stock().evaluate(rows.clone()).items);
        let page = |number| {
            ids(&by_stock()
                .add_pagination(PageRequest::new(number, 10).unwrap())
                .evaluate(rows.clone())
                .items)
        };

        let first = page(1);
        let second = page(2);
        prop_assert!(first.iter().all(|id| !second.contains(id)));
        prop_assert_eq!([first, second].concat(), full[..20].to_vec());
    }

    /// The same options always produce the same plan and the same slice.
    #[test]
    fn prop_options_are_referentially_transparent(
        stocks in prop::collection::vec(0_u32..10, 0..30),
        threshold in 0_u32..10,
        descending in any::<bool>(),
    ) {
        let rows = widgets(&stocks);
        let base = by_stock().add_filter(move |widget: &Widget| widget.stock >= threshold);
        let options = if descending { base.add_sort_desc() } else { base };

        prop_assert_eq!(options.plan(), options.clone().plan());
        let first = options.evaluate(rows.clone());
        let second = options.evaluate(rows);
        prop_assert_eq!(first.total, second.total);
        prop_assert_eq!(ids(&first.items), ids(&second.items));
    }
}

proptest! {
    /// Non-positive page sizes are always rejected, never clamped.
    #[test]
    fn prop_non_positive_sizes_are_rejected(number in 1_i64..100, size in -100_i64..=0) {
        let error = PageRequest::new(number, size).unwrap_err();
        prop_assert_eq!(error.kind(), ErrorKind::Validation);
    }
}
