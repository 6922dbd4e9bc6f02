//! Windowed minimum / maximum in O(width * height) for any radius.
//!
//! Square windows are separable: a monotonic-deque pass over every row is
//! followed by the same pass over every column (run as rows of the
//! transposed buffer). Windows are clamped at the image border.
//!
//! The deque only evicts strictly dominated entries, so among equal values
//! the earliest one in scan order stays at the front.

#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use rayon::prelude::*;

use crate::common::Buffer2;

/// Windowed minimum and maximum of an image.
#[derive(Debug, Clone)]
pub struct WindowExtrema {
    pub min: Buffer2<u16>,
    pub max: Buffer2<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Min,
    Max,
}

impl Extremum {
    /// True when `candidate` evicts `held` from the back of the deque.
    #[inline]
    fn dominates(self, candidate: u16, held: u16) -> bool {
        match self {
            Extremum::Min => candidate < held,
            Extremum::Max => candidate > held,
        }
    }
}

/// Minimum and maximum over the `(2r+1) x (2r+1)` window around every pixel.
pub fn window_extrema(image: &Buffer2<u16>, radius: usize) -> WindowExtrema {
    let (min, max) = rayon::join(
        || separable(image, radius, Extremum::Min),
        || separable(image, radius, Extremum::Max),
    );
    WindowExtrema { min, max }
}

/// Windowed minimum only.
pub fn window_min(image: &Buffer2<u16>, radius: usize) -> Buffer2<u16> {
    separable(image, radius, Extremum::Min)
}

/// Windowed maximum only.
pub fn window_max(image: &Buffer2<u16>, radius: usize) -> Buffer2<u16> {
    separable(image, radius, Extremum::Max)
}

fn separable(image: &Buffer2<u16>, radius: usize, kind: Extremum) -> Buffer2<u16> {
    if image.is_empty() || radius == 0 {
        return image.clone();
    }
    let rows = rows_pass(image, radius, kind);
    let cols = rows_pass(&rows.transposed(), radius, kind);
    cols.transposed()
}

fn rows_pass(image: &Buffer2<u16>, radius: usize, kind: Extremum) -> Buffer2<u16> {
    let width = image.width();
    let mut out = Buffer2::new_default(width, image.height());

    out.pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each_init(
            || VecDeque::with_capacity(2 * radius + 1),
            |deque, (y, dst)| extremum_pass(image.row(y), radius, kind, dst, deque),
        );

    out
}

/// One monotonic-deque sweep over a line.
///
/// The deque holds indices whose values are monotonic (non-increasing for
/// max, non-decreasing for min); the front is the extremum of the window.
fn extremum_pass(
    src: &[u16],
    radius: usize,
    kind: Extremum,
    dst: &mut [u16],
    deque: &mut VecDeque<usize>,
) {
    deque.clear();
    let n = src.len();
    let mut next = 0;

    for i in 0..n {
        let hi = (i + radius).min(n - 1);
        while next <= hi {
            while let Some(&back) = deque.back() {
                if kind.dominates(src[next], src[back]) {
                    deque.pop_back();
                } else {
                    break;
                }
            }
            deque.push_back(next);
            next += 1;
        }

        let lo = i.saturating_sub(radius);
        while let Some(&front) = deque.front() {
            if front < lo {
                deque.pop_front();
            } else {
                break;
            }
        }

        dst[i] = src[deque[0]];
    }
}
