//! Bounded-concurrency parallel mapping.
//!
//! Image loading reads whole frames into memory; running every path through
//! rayon at once would hold all decoded frames and file handles in flight.
//! [`try_par_map_limited`] processes items in windows of at most
//! `max_in_flight`.

use rayon::prelude::*;

/// Maps `f` over `items` in parallel, with at most `max_in_flight` items
/// being processed at once. Output order matches input order.
///
/// Stops after the first window that produced an error and returns one of
/// that window's errors.
///
/// # Panics
///
/// Panics if `max_in_flight` is 0.
pub fn try_par_map_limited<T, R, E, F>(items: &[T], max_in_flight: usize, f: F) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync,
{
    assert!(max_in_flight > 0, "max_in_flight must be > 0");

    let mut results = Vec::with_capacity(items.len());
    for window in items.chunks(max_in_flight) {
        let window_results: Result<Vec<R>, E> = window.par_iter().map(&f).collect();
        results.extend(window_results?);
    }
    Ok(results)
}
