//! Assembles a full result set from an API that caps records per call.
//!
//! Windows advance by the page ceiling. Collection stops at the first page
//! shorter than the ceiling, at a page fetch that yields `None`, or once the
//! requested range is covered. A total that is an exact multiple of the
//! ceiling costs one extra (empty) fetch.

use tracing::debug;

use crate::error::ApiError;

/// Collect records in `[start, end)` by calling `fetch(window_start, window_end)`
/// repeatedly.
///
/// Pages are concatenated as returned; a server that over-delivers for a
/// window is not truncated.
pub fn collect_pages<T, F>(page_size: usize, start: usize, end: usize, mut fetch: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(usize, usize) -> Result<Option<Vec<T>>, ApiError>,
{
    if page_size == 0 {
        return Err(ApiError::Config("page size must be at least 1".into()));
    }
    let wanted = end.saturating_sub(start);
    let mut records = Vec::new();
    let mut window_start = start;

    while window_start < end {
        let window_end = end.min(window_start.saturating_add(page_size));
        debug!(window_start, window_end, "fetching page");
        let Some(page) = fetch(window_start, window_end)? else {
            break;
        };
        let short = page.len() < page_size;
        records.extend(page);
        if short || records.len() >= wanted {
            break;
        }
        window_start = window_start.saturating_add(page_size);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    type Calls = Rc<RefCell<Vec<(usize, usize)>>>;

    /// Serves up to `sizes[i]` records on the i-th call, never more than the
    /// window asks for, and records every window.
    fn stub(sizes: Vec<usize>) -> (impl FnMut(usize, usize) -> Result<Option<Vec<usize>>, ApiError>, Calls) {
        let calls = Calls::default();
        let seen = calls.clone();
        let mut sizes = sizes.into_iter();
        let fetch = move |s: usize, e: usize| {
            seen.borrow_mut().push((s, e));
            Ok(sizes.next().map(|n| (s..s + n.min(e - s)).collect()))
        };
        (fetch, calls)
    }

    #[test]
    fn stops_at_short_page() {
        let (fetch, calls) = stub(vec![3, 3, 2]);
        let records = collect_pages(3, 0, 100, fetch).unwrap();
        assert_eq!(records.len(), 8);
        assert_eq!(*calls.borrow(), vec![(0, 3), (3, 6), (6, 9)]);
    }

    #[test]
    fn none_on_first_call_is_empty() {
        let (fetch, calls) = stub(vec![]);
        let records = collect_pages(3, 0, 100, fetch).unwrap();
        assert!(records.is_empty());
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn narrow_range_is_a_single_clamped_call() {
        let (fetch, calls) = stub(vec![1]);
        let records = collect_pages(3, 0, 1, fetch).unwrap();
        assert_eq!(records, vec![0]);
        assert_eq!(*calls.borrow(), vec![(0, 1)]);
    }

    #[test]
    fn over_delivery_is_kept() {
        let mut calls = 0;
        let records = collect_pages(3, 0, 1, |_, _| {
            calls += 1;
            Ok(Some(vec!["a", "b"]))
        })
        .unwrap();
        assert_eq!(records, vec!["a", "b"]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn stops_when_range_is_covered() {
        let (fetch, calls) = stub(vec![3, 3, 3, 3]);
        let records = collect_pages(3, 0, 6, fetch).unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(*calls.borrow(), vec![(0, 3), (3, 6)]);
    }

    #[test]
    fn exact_multiple_costs_one_empty_fetch() {
        let (fetch, calls) = stub(vec![3, 3, 0]);
        let records = collect_pages(3, 0, 100, fetch).unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(calls.borrow().len(), 3);
    }

    #[test]
    fn offset_start_advances_from_start() {
        let (fetch, calls) = stub(vec![3, 1]);
        let records = collect_pages(3, 10, 20, fetch).unwrap();
        assert_eq!(records, vec![10, 11, 12, 13]);
        assert_eq!(*calls.borrow(), vec![(10, 13), (13, 16)]);
    }

    #[test]
    fn last_window_is_clamped_to_end() {
        let (fetch, calls) = stub(vec![3, 3, 3]);
        let records = collect_pages(3, 0, 7, fetch).unwrap();
        assert_eq!(records.len(), 7);
        assert_eq!(*calls.borrow(), vec![(0, 3), (3, 6), (6, 7)]);
    }

    #[test]
    fn empty_range_makes_no_calls() {
        let (fetch, calls) = stub(vec![3]);
        let records = collect_pages(3, 5, 5, fetch).unwrap();
        assert!(records.is_empty());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn errors_propagate() {
        let result: Result<Vec<u8>, _> = collect_pages(3, 0, 10, |_, _| {
            Err(ApiError::Transport {
                status: 503,
                body: "busy".to_string(),
            })
        });
        assert!(matches!(result, Err(ApiError::Transport { status: 503, .. })));
    }
}
