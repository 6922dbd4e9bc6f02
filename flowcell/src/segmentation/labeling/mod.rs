//! Run-length encoding and connected component labeling.
//!
//! Foreground pixels are first collapsed into horizontal [`Run`]s, scanning
//! packed mask words with trailing-zero counts to skip background. Runs on
//! consecutive rows whose column ranges overlap are then merged with a
//! single-parent union-find, and every surviving root becomes one
//! [`ImageObject`].
//!
//! Connectivity is run-to-run column overlap across adjacent rows. Pixels
//! that only touch diagonally are not connected. [`label_regions`] applies
//! the same rule to a basin map, joining only runs of equal label.


use hashbrown::HashMap;

use crate::common::{BitBuffer2, Buffer2};

// ============================================================================
// Run-Length Encoding
// ============================================================================

/// A maximal horizontal run of foreground pixels on row `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Run {
    pub y: u32,
    pub x: u32,
    pub len: u32,
}

impl Run {
    pub fn new(x: u32, y: u32, len: u32) -> Self {
        debug_assert!(len >= 1, "runs cover at least one pixel");
        Self { y, x, len }
    }

    /// One past the last covered column.
    #[inline]
    pub fn end(&self) -> u32 {
        self.x + self.len
    }

    #[inline]
    pub fn xs(&self) -> std::ops::Range<u32> {
        self.x..self.end()
    }
}

/// Encode every row of `mask` into runs, row-major, left to right.
pub fn encode_runs(mask: &BitBuffer2) -> Vec<Run> {
    let mut runs = Vec::new();
    for y in 0..mask.height() {
        extract_runs_from_row(mask.row_words(y), y as u32, mask.width() as u32, &mut runs);
    }
    runs
}

/// Paint runs back into a mask of the given size.
pub fn rasterize(runs: &[Run], width: usize, height: usize) -> BitBuffer2 {
    let mut mask = BitBuffer2::new_default(width, height);
    for run in runs {
        for x in run.xs() {
            mask.set_xy(x as usize, run.y as usize, true);
        }
    }
    mask
}

/// Extract the runs of one row from its packed words.
///
/// Whole-zero and whole-one words are handled without bit scanning; mixed
/// words jump between transitions with trailing-zero counts.
fn extract_runs_from_row(words: &[u64], y: u32, width: u32, runs: &mut Vec<Run>) {
    let mut run_start: Option<u32> = None;

    for (word_idx, &word) in words.iter().enumerate() {
        let base_x = word_idx as u32 * 64;
        let word_end = (base_x + 64).min(width);

        if word == 0 {
            if let Some(start) = run_start.take() {
                runs.push(Run::new(start, y, base_x - start));
            }
            continue;
        }
        if word == !0u64 {
            run_start.get_or_insert(base_x);
            continue;
        }

        let mut pos = base_x;
        while pos < word_end {
            let shifted = word >> (pos - base_x);
            match run_start {
                Some(start) => {
                    // Next clear bit ends the run.
                    let ones = (!shifted).trailing_zeros();
                    let end = pos + ones;
                    if end >= word_end {
                        break;
                    }
                    runs.push(Run::new(start, y, end - start));
                    run_start = None;
                    pos = end;
                }
                None => {
                    if shifted == 0 {
                        break;
                    }
                    let start = pos + shifted.trailing_zeros();
                    if start >= word_end {
                        break;
                    }
                    run_start = Some(start);
                    pos = start;
                }
            }
        }
    }

    if let Some(start) = run_start {
        runs.push(Run::new(start, y, width - start));
    }
}

// ============================================================================
// Image objects
// ============================================================================

/// One connected blob: the runs that make it up, in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageObject {
    runs: Vec<Run>,
}

impl ImageObject {
    pub fn from_runs(mut runs: Vec<Run>) -> Self {
        runs.sort_unstable();
        Self { runs }
    }

    #[inline]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn into_runs(self) -> Vec<Run> {
        self.runs
    }

    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        self.runs.iter().map(|r| r.len as usize).sum()
    }

    /// Iterate covered pixels as `(x, y)`.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.runs
            .iter()
            .flat_map(|r| r.xs().map(move |x| (x as usize, r.y as usize)))
    }
}

// ============================================================================
// Labeling
// ============================================================================

/// Label a binary mask into objects.
pub fn label_mask(mask: &BitBuffer2) -> Vec<ImageObject> {
    let runs = encode_runs(mask);
    label_runs(&runs, mask.width(), mask.height())
}

/// Group runs into connected objects.
///
/// A dense lookup maps every covered pixel to its run index. For each run
/// and each covered column, the run owning the pixel directly above (if any)
/// is unioned with it. Objects come out in order of their first run in
/// `runs`; the partition itself does not depend on the order of `runs`.
pub fn label_runs(runs: &[Run], width: usize, height: usize) -> Vec<ImageObject> {
    group_runs(runs, width, height, |_, _| true)
}

/// Label a basin map into objects, one per connected area of equal label.
///
/// Label 0 is background. Two areas that touch but carry different labels
/// stay separate objects.
pub fn label_regions(labels: &Buffer2<u32>) -> Vec<ImageObject> {
    let width = labels.width();
    let mut runs = Vec::new();
    let mut run_labels = Vec::new();

    for y in 0..labels.height() {
        let row = labels.row(y);
        let mut x = 0;
        while x < row.len() {
            let label = row[x];
            let start = x;
            while x < row.len() && row[x] == label {
                x += 1;
            }
            if label != 0 {
                runs.push(Run::new(start as u32, y as u32, (x - start) as u32));
                run_labels.push(label);
            }
        }
    }

    group_runs(&runs, width, labels.height(), |a, b| run_labels[a] == run_labels[b])
}

/// Union vertically overlapping runs for which `connects(a, b)` holds.
fn group_runs(
    runs: &[Run],
    width: usize,
    height: usize,
    connects: impl Fn(usize, usize) -> bool,
) -> Vec<ImageObject> {
    if runs.is_empty() {
        return Vec::new();
    }

    // Run index + 1 per pixel; 0 is background.
    let mut lookup: Buffer2<u32> = Buffer2::new_default(width, height);
    for (i, run) in runs.iter().enumerate() {
        let row = run.y as usize * width;
        for x in run.xs() {
            lookup[row + x as usize] = i as u32 + 1;
        }
    }

    let mut uf = UnionFind::new(runs.len());
    for (i, run) in runs.iter().enumerate() {
        if run.y == 0 {
            continue;
        }
        let above_row = (run.y as usize - 1) * width;
        let mut last_above = 0u32;
        for x in run.xs() {
            let above = lookup[above_row + x as usize];
            // Consecutive columns usually hit the same run above.
            if above != 0 && above != last_above && connects(i, above as usize - 1) {
                uf.union(i as u32, above - 1);
            }
            last_above = above;
        }
    }

    let mut slot_of_root: HashMap<u32, usize> = HashMap::new();
    let mut groups: Vec<Vec<Run>> = Vec::new();
    for (i, run) in runs.iter().enumerate() {
        let root = uf.find(i as u32);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(*run);
    }

    groups
        .into_iter()
        .map(ImageObject::from_runs)
        .collect()
}

// ============================================================================
// Union-Find
// ============================================================================

/// Single-parent disjoint set over dense `u32` ids with path compression.
///
/// Unions attach the larger root under the smaller one, so the canonical
/// root of a set is its smallest id.
#[derive(Debug, Clone)]
pub(crate) struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            parent: (0..len as u32).collect(),
        }
    }

    /// Find root with iterative two-pass path compression.
    #[inline]
    pub(crate) fn find(&mut self, id: u32) -> u32 {
        let mut root = id;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        let mut current = id;
        while current != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }

        root
    }

    #[inline]
    pub(crate) fn union(&mut self, a: u32, b: u32) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            let (smaller, larger) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent[larger as usize] = smaller;
        }
    }
}
