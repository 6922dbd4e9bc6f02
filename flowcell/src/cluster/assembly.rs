//! Merging per-image objects into clusters.
//!
//! Every object of every thresholded `(channel, cycle)` image is painted into
//! one occupancy grid. Painting over a pixel owned by another object unions
//! the two, so objects that share any pixel end up in one group. Each group
//! becomes one cluster whose footprint is the union of its members.

use hashbrown::HashMap;

use crate::cluster::Cluster;
use crate::common::Buffer2;
use crate::segmentation::labeling::{ImageObject, Run, UnionFind};

/// Build clusters from objects found in a `width` x `height` frame.
///
/// Clusters are ordered by their first footprint run (row, then column) and
/// numbered from 0 in that order.
pub fn assemble(objects: &[ImageObject], width: usize, height: usize) -> Vec<Cluster> {
    if objects.is_empty() {
        return Vec::new();
    }

    // Object index + 1 per pixel; 0 is unowned.
    let mut owner: Buffer2<u32> = Buffer2::new_default(width, height);
    let mut uf = UnionFind::new(objects.len());
    for (i, object) in objects.iter().enumerate() {
        let id = i as u32 + 1;
        for (x, y) in object.pixels() {
            let slot = &mut owner[(x, y)];
            if *slot != 0 && *slot != id {
                uf.union(*slot - 1, i as u32);
            }
            *slot = id;
        }
    }

    let mut slot_of_root: HashMap<u32, usize> = HashMap::new();
    let mut groups: Vec<Vec<Run>> = Vec::new();
    for (i, object) in objects.iter().enumerate() {
        let root = uf.find(i as u32);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].extend_from_slice(object.runs());
    }

    let mut footprints: Vec<Vec<Run>> = groups.into_iter().map(normalize_runs).collect();
    footprints.sort_unstable_by_key(|runs| runs.first().map(|r| (r.y, r.x)));

    let clusters: Vec<Cluster> = footprints
        .into_iter()
        .enumerate()
        .map(|(id, footprint)| Cluster::new(id, footprint))
        .collect();

    tracing::debug!(
        objects = objects.len(),
        clusters = clusters.len(),
        "assembled clusters"
    );
    clusters
}

/// Merge overlapping or touching runs into maximal runs, row-major.
pub(crate) fn normalize_runs(mut runs: Vec<Run>) -> Vec<Run> {
    runs.sort_unstable();
    let mut merged: Vec<Run> = Vec::with_capacity(runs.len());
    for run in runs {
        match merged.last_mut() {
            Some(last) if last.y == run.y && run.x <= last.end() => {
                last.len = last.len.max(run.end() - last.x);
            }
            _ => merged.push(run),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_runs_merges_overlap_and_touch() {
        let runs = vec![
            Run::new(5, 0, 3),
            Run::new(0, 0, 2),
            Run::new(1, 0, 2),
            Run::new(8, 0, 1),
            Run::new(0, 1, 1),
        ];
        assert_eq!(
            normalize_runs(runs),
            vec![Run::new(0, 0, 3), Run::new(5, 0, 4), Run::new(0, 1, 1)]
        );
    }

    #[test]
    fn test_normalize_runs_contained_run() {
        let runs = vec![Run::new(2, 3, 10), Run::new(4, 3, 2)];
        assert_eq!(normalize_runs(runs), vec![Run::new(2, 3, 10)]);
    }

    #[test]
    fn test_overlapping_objects_become_one_cluster() {
        let a = ImageObject::from_runs(vec![Run::new(2, 2, 3), Run::new(2, 3, 3)]);
        let b = ImageObject::from_runs(vec![Run::new(4, 3, 3), Run::new(4, 4, 3)]);
        let clusters = assemble(&[a, b], 10, 10);

        assert_eq!(clusters.len(), 1);
        assert_eq!(
            clusters[0].footprint(),
            &[Run::new(2, 2, 3), Run::new(2, 3, 5), Run::new(4, 4, 3)]
        );
    }

    #[test]
    fn test_touching_objects_stay_separate() {
        let a = ImageObject::from_runs(vec![Run::new(0, 0, 2)]);
        let b = ImageObject::from_runs(vec![Run::new(2, 0, 2)]);
        assert_eq!(assemble(&[a, b], 4, 1).len(), 2);
    }

    #[test]
    fn test_chain_of_overlaps_is_transitive() {
        let a = ImageObject::from_runs(vec![Run::new(0, 0, 3)]);
        let b = ImageObject::from_runs(vec![Run::new(5, 0, 3)]);
        // Bridges a and b.
        let c = ImageObject::from_runs(vec![Run::new(2, 0, 4)]);
        let clusters = assemble(&[a, b, c], 10, 1);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].footprint(), &[Run::new(0, 0, 8)]);
    }

    #[test]
    fn test_clusters_sorted_by_first_run() {
        let lower = ImageObject::from_runs(vec![Run::new(1, 7, 2)]);
        let right = ImageObject::from_runs(vec![Run::new(6, 2, 2)]);
        let left = ImageObject::from_runs(vec![Run::new(1, 2, 2)]);
        let clusters = assemble(&[lower, right, left], 10, 10);

        let firsts: Vec<Run> = clusters.iter().map(|c| c.footprint()[0]).collect();
        assert_eq!(firsts, vec![Run::new(1, 2, 2), Run::new(6, 2, 2), Run::new(1, 7, 2)]);
        let ids: Vec<usize> = clusters.iter().map(Cluster::id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_no_objects_no_clusters() {
        assert!(assemble(&[], 10, 10).is_empty());
    }
}
