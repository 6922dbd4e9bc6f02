//! Discrete distance transform.
//!
//! Multi-source breadth-first search over the 8-neighborhood. Seeds are the
//! pixels with a strictly lower neighbor; they get distance 1 and every ring
//! reached through equal-valued pixels adds 1. Pixels the search never
//! reaches keep 0.
//!
//! On a binary image this is the chessboard distance of each foreground
//! pixel to the nearest background pixel, which is all the watershed needs.
//! It is not a Euclidean distance.


use std::collections::VecDeque;

use crate::common::{BitBuffer2, Buffer2};

/// 8-neighborhood offsets, clockwise starting at north.
pub(crate) const NEIGHBORS_8: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Linear index of the neighbor of `(x, y)` at `offset`, if inside the image.
#[inline]
pub(crate) fn neighbor_index(
    x: usize,
    y: usize,
    (dx, dy): (i32, i32),
    width: usize,
    height: usize,
) -> Option<usize> {
    let nx = x as i64 + dx as i64;
    let ny = y as i64 + dy as i64;
    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
        return None;
    }
    Some(ny as usize * width + nx as usize)
}

/// Distance of every pixel to its nearest strictly lower neighbor region.
pub fn distance_transform(image: &Buffer2<u16>) -> Buffer2<u32> {
    plateau_distance(image, None)
}

/// Geodesic distance, inside each equal-valued plateau, to the plateau's
/// lower boundary.
///
/// When `region` is given, pixels outside it are ignored entirely: they are
/// neither seeds nor neighbors.
pub(crate) fn plateau_distance<T: Copy + Ord>(
    values: &Buffer2<T>,
    region: Option<&BitBuffer2>,
) -> Buffer2<u32> {
    let width = values.width();
    let height = values.height();
    let in_region = |idx: usize| region.is_none_or(|r| r.get(idx));

    let mut dist: Buffer2<u32> = Buffer2::new_default(width, height);
    let mut frontier = VecDeque::new();

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if !in_region(idx) {
                continue;
            }
            let value = values[idx];
            let has_lower = NEIGHBORS_8.iter().any(|&offset| {
                neighbor_index(x, y, offset, width, height)
                    .is_some_and(|n| in_region(n) && values[n] < value)
            });
            if has_lower {
                dist[idx] = 1;
                frontier.push_back(idx);
            }
        }
    }

    while let Some(idx) = frontier.pop_front() {
        let (x, y) = (idx % width, idx / width);
        let next = dist[idx] + 1;
        for &offset in &NEIGHBORS_8 {
            let Some(n) = neighbor_index(x, y, offset, width, height) else {
                continue;
            };
            if dist[n] == 0 && in_region(n) && values[n] == values[idx] {
                dist[n] = next;
                frontier.push_back(n);
            }
        }
    }

    dist
}
