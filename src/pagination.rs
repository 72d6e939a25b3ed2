//! Client-side page slicing over a full search result list
//!
//! Pagination is applied after the provider returns its result set, not
//! pushed down as a provider-side offset: page `p` with `count` items per
//! page covers the index range `[(p-1)*count, p*count)`.

/// Slice one page out of the full result list
///
/// `count` and `page` are both 1-based positive values; a page beyond the
/// end of the list yields an empty slice rather than an error.
pub fn slice_page<T>(items: &[T], count: usize, page: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(count).min(items.len());
    let end = page.saturating_mul(count).min(items.len());
    &items[start..end]
}

#[cfg(test)]
mod tests {
    use super::slice_page;

    #[test]
    fn third_page_of_25_items_covers_the_last_five() {
        let items: Vec<usize> = (0..25).collect();
        let page = slice_page(&items, 10, 3);
        assert_eq!(page, &[20, 21, 22, 23, 24]);
    }

    #[test]
    fn page_beyond_the_end_is_empty() {
        let items: Vec<usize> = (0..25).collect();
        assert!(slice_page(&items, 10, 4).is_empty());
    }

    #[test]
    fn first_page_larger_than_the_list_returns_everything() {
        let items = vec!["a", "b", "c"];
        assert_eq!(slice_page(&items, 10, 1), &["a", "b", "c"]);
    }

    #[test]
    fn exact_page_boundary_splits_cleanly() {
        let items: Vec<usize> = (0..20).collect();
        assert_eq!(slice_page(&items, 10, 1).len(), 10);
        assert_eq!(slice_page(&items, 10, 2), &items[10..20]);
        assert!(slice_page(&items, 10, 3).is_empty());
    }
}
