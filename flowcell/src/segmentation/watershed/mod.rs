//! Watershed splitting of merged blobs.
//!
//! The surface is the inverted distance map of one labeled object, so every
//! blob core is a basin and the narrow neck between two touching clusters is
//! a ridge. Each basin becomes a separate object.
//!
//! 1. **Lower completion**: every pixel of a non-minimum plateau is raised by
//!    its geodesic distance (inside the plateau) to the plateau's lower
//!    boundary. Afterwards every pixel that is not part of a minimum has a
//!    strictly lower neighbor.
//! 2. **Forest**: pixels are visited in ascending lower-complete order.
//!    Minima become roots (equal neighbors of a minimum plateau share one
//!    root). Every other pixel is linked to *all* neighbors at its lowest
//!    lower level, collected clockwise from north, so a pixel can have
//!    several parents.
//! 3. **Resolution**: a pixel whose parents lead to exactly one distinct root
//!    belongs to that basin; anything else is a ridge and drops out.
//!
//! Resolution walks the forest with an explicit stack and memoises the root
//! set of every pixel, so deep forests on large tiles cannot overflow the
//! call stack.

#[cfg(test)]
mod tests;

use hashbrown::HashMap;

use crate::common::{BitBuffer2, Buffer2};
use crate::segmentation::distance::{distance_transform, neighbor_index, plateau_distance, NEIGHBORS_8};
use crate::segmentation::labeling::{label_regions, rasterize, ImageObject, Run, UnionFind};
use crate::segmentation::threshold::render_binary;

/// Basin labels for a region. 0 marks ridges and pixels outside the region.
#[derive(Debug, Clone)]
pub struct Watershed {
    pub labels: Buffer2<u32>,
    pub num_basins: usize,
}

/// Split one labeled object along the ridges of its distance map.
///
/// The object is rasterised into a local frame covering its bounding box plus
/// a one-pixel background border, so memory stays proportional to the object
/// rather than the image. Every basin becomes its own object; ridge pixels
/// are dropped. Runs of the result are in image coordinates.
pub fn split_object(object: &ImageObject, foreground: u16) -> Vec<ImageObject> {
    let runs = object.runs();
    let (Some(first), Some(last)) = (runs.first(), runs.last()) else {
        return Vec::new();
    };
    let x0 = runs.iter().map(|r| r.x).min().unwrap_or(first.x);
    let x1 = runs.iter().map(Run::end).max().unwrap_or(first.end());
    let (y0, y1) = (first.y, last.y + 1);

    // Local coordinates are shifted by one for the border.
    let local: Vec<Run> = runs
        .iter()
        .map(|r| Run::new(r.x - x0 + 1, r.y - y0 + 1, r.len))
        .collect();
    let width = (x1 - x0) as usize + 2;
    let height = (y1 - y0) as usize + 2;
    let mask = rasterize(&local, width, height);

    let distance = distance_transform(&render_binary(&mask, foreground));
    let peak = local
        .iter()
        .flat_map(|r| r.xs().map(move |x| (x as usize, r.y as usize)))
        .map(|xy| distance[xy])
        .max()
        .unwrap_or(0);
    let surface = distance.map(|&d| peak.saturating_sub(d));

    let result = watershed(&surface, &mask);
    let parts: Vec<ImageObject> = label_regions(&result.labels)
        .into_iter()
        .map(|part| {
            ImageObject::from_runs(
                part.into_runs()
                    .into_iter()
                    .map(|r| Run::new(r.x + x0 - 1, r.y + y0 - 1, r.len))
                    .collect(),
            )
        })
        .collect();

    tracing::trace!(
        basins = result.num_basins,
        parts = parts.len(),
        ridge_pixels = object.area() - parts.iter().map(ImageObject::area).sum::<usize>(),
        "watershed split"
    );
    parts
}

/// Flood `surface` inside `region` and label its basins `1..=num_basins`.
///
/// An all-flat region is a single basin without ridges.
pub fn watershed(surface: &Buffer2<u32>, region: &BitBuffer2) -> Watershed {
    let width = surface.width();
    let height = surface.height();

    let lower = lower_complete(surface, region);
    let forest = build_forest(&lower, region);
    let roots = resolve_roots(forest);

    let mut labels: Buffer2<u32> = Buffer2::new_default(width, height);
    let mut basin_of_root: HashMap<u32, u32> = HashMap::new();
    for idx in 0..width * height {
        if let RootSet::One(root) = roots[idx] {
            let next = basin_of_root.len() as u32 + 1;
            labels[idx] = *basin_of_root.entry(root).or_insert(next);
        }
    }

    Watershed {
        labels,
        num_basins: basin_of_root.len(),
    }
}

// ============================================================================
// Lower completion
// ============================================================================

/// Raise non-minimum plateaus so that only minima lack a lower neighbor.
fn lower_complete(surface: &Buffer2<u32>, region: &BitBuffer2) -> Buffer2<u64> {
    let plateau = plateau_distance(surface, Some(region));
    let scale = plateau.pixels().iter().copied().max().unwrap_or(0) as u64 + 1;
    Buffer2::from_fn(surface.width(), surface.height(), |x, y| {
        surface[(x, y)] as u64 * scale + plateau[(x, y)] as u64
    })
}

// ============================================================================
// Forest
// ============================================================================

/// Multi-parent forest over pixel indices.
///
/// `parents[idx]` is empty for roots and for pixels outside the region.
/// Roots of the same minimum plateau are merged in `minima`.
struct Forest {
    parents: Vec<Vec<u32>>,
    is_root: Vec<bool>,
    minima: UnionFind,
}

fn build_forest(lower: &Buffer2<u64>, region: &BitBuffer2) -> Forest {
    let width = lower.width();
    let height = lower.height();
    let len = width * height;

    let mut order: Vec<u32> = (0..len as u32).filter(|&i| region.get(i as usize)).collect();
    order.sort_unstable_by_key(|&i| (lower[i as usize], i));

    let mut forest = Forest {
        parents: vec![Vec::new(); len],
        is_root: vec![false; len],
        minima: UnionFind::new(len),
    };

    for &id in &order {
        let idx = id as usize;
        let (x, y) = (idx % width, idx / width);
        let level = lower[idx];

        let neighbors = NEIGHBORS_8
            .iter()
            .filter_map(|&offset| neighbor_index(x, y, offset, width, height))
            .filter(|&n| region.get(n));

        let lowest = neighbors.clone().map(|n| lower[n]).filter(|&v| v < level).min();

        match lowest {
            None => {
                forest.is_root[idx] = true;
                for n in neighbors {
                    if forest.is_root[n] && lower[n] == level {
                        forest.minima.union(id, n as u32);
                    }
                }
            }
            Some(lowest) => {
                forest.parents[idx] = neighbors
                    .filter(|&n| lower[n] == lowest)
                    .map(|n| n as u32)
                    .collect();
            }
        }
    }

    forest
}

// ============================================================================
// Root resolution
// ============================================================================

/// Memoised set of distinct roots reachable from a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootSet {
    Unresolved,
    /// Outside the region.
    Empty,
    One(u32),
    Many,
}

impl RootSet {
    fn merge(self, other: RootSet) -> RootSet {
        match (self, other) {
            (RootSet::Empty, s) | (s, RootSet::Empty) => s,
            (RootSet::One(a), RootSet::One(b)) if a == b => RootSet::One(a),
            _ => RootSet::Many,
        }
    }
}

fn resolve_roots(forest: Forest) -> Vec<RootSet> {
    let Forest {
        parents,
        is_root,
        mut minima,
    } = forest;
    let len = parents.len();
    let mut memo = vec![RootSet::Unresolved; len];

    for idx in 0..len {
        if is_root[idx] {
            memo[idx] = RootSet::One(minima.find(idx as u32));
        } else if parents[idx].is_empty() {
            memo[idx] = RootSet::Empty;
        }
    }

    let mut stack: Vec<u32> = Vec::new();
    for start in 0..len as u32 {
        if memo[start as usize] != RootSet::Unresolved {
            continue;
        }
        stack.push(start);

        while let Some(&top) = stack.last() {
            if memo[top as usize] != RootSet::Unresolved {
                stack.pop();
                continue;
            }
            let links = &parents[top as usize];
            // Parents sit strictly lower, so the walk always terminates.
            let mut pushed = false;
            for &p in links {
                if memo[p as usize] == RootSet::Unresolved {
                    stack.push(p);
                    pushed = true;
                }
            }

            if !pushed {
                memo[top as usize] = links
                    .iter()
                    .fold(RootSet::Empty, |acc, &p| acc.merge(memo[p as usize]));
                stack.pop();
            }
        }
    }

    memo
}
