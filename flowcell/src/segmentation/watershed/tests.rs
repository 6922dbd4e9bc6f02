use super::*;
use crate::segmentation::labeling::label_mask;

/// Inverted distance map of two overlapping disks centred at (12, 12) and
/// (24, 12): each pixel holds the squared distance to the nearer centre.
fn two_disks_surface() -> Buffer2<u32> {
    Buffer2::from_fn(37, 25, |x, y| {
        let d = |cx: i32, cy: i32| {
            let dx = x as i32 - cx;
            let dy = y as i32 - cy;
            (dx * dx + dy * dy) as u32
        };
        d(12, 12).min(d(24, 12))
    })
}

#[test]
fn test_equidistant_column_is_ridge_between_cones() {
    let surface = two_disks_surface();
    let region = BitBuffer2::new_filled(37, 25, true);
    let result = watershed(&surface, &region);

    assert_eq!(result.num_basins, 2);

    let left = result.labels[(12, 12)];
    let right = result.labels[(24, 12)];
    assert_ne!(left, 0);
    assert_ne!(right, 0);
    assert_ne!(left, right);

    for y in 0..25 {
        // Equidistant column is the ridge.
        assert_eq!(result.labels[(18, y)], 0, "neck pixel (18, {y})");
        for x in 0..18 {
            assert_eq!(result.labels[(x, y)], left, "pixel ({x}, {y})");
        }
        for x in 19..37 {
            assert_eq!(result.labels[(x, y)], right, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn test_flat_surface_is_one_basin() {
    let surface = Buffer2::new_filled(9, 7, 3u32);
    let region = BitBuffer2::new_filled(9, 7, true);
    let result = watershed(&surface, &region);

    assert_eq!(result.num_basins, 1);
    assert!(result.labels.pixels().iter().all(|&l| l == 1));
}

#[test]
fn test_single_cone_has_no_ridges() {
    let surface = Buffer2::from_fn(15, 15, |x, y| {
        let dx = x as i32 - 7;
        let dy = y as i32 - 7;
        (dx * dx + dy * dy) as u32
    });
    let region = BitBuffer2::new_filled(15, 15, true);
    let result = watershed(&surface, &region);

    assert_eq!(result.num_basins, 1);
    assert!(result.labels.pixels().iter().all(|&l| l == 1));
}

#[test]
fn test_outside_region_is_unlabeled() {
    let surface = Buffer2::new_filled(6, 6, 0u32);
    let region = BitBuffer2::from_fn(6, 6, |x, y| x < 3 && y < 3);
    let result = watershed(&surface, &region);

    assert_eq!(result.num_basins, 1);
    assert_eq!(result.labels[(1, 1)], 1);
    assert_eq!(result.labels[(4, 4)], 0);
}

#[test]
fn test_separate_regions_get_separate_basins() {
    let surface = Buffer2::new_filled(10, 3, 0u32);
    let region = BitBuffer2::from_fn(10, 3, |x, _| x < 3 || x > 6);
    let result = watershed(&surface, &region);

    assert_eq!(result.num_basins, 2);
    assert_ne!(result.labels[(0, 1)], result.labels[(9, 1)]);
}

/// The single object labeled from `mask`.
fn only_object(mask: &BitBuffer2) -> ImageObject {
    let mut objects = label_mask(mask);
    assert_eq!(objects.len(), 1, "mask is one connected blob");
    objects.remove(0)
}

/// Two filled disks of radius `r` on one row, `sep` pixels apart.
fn two_disks_mask(r: i32, sep: i32) -> BitBuffer2 {
    let width = (2 * r + sep + 8) as usize;
    let height = (2 * r + 8) as usize;
    let (cx, cy) = (r + 4, r + 4);
    BitBuffer2::from_fn(width, height, |x, y| {
        let inside = |c: i32| {
            let dx = x as i32 - c;
            let dy = y as i32 - cy;
            dx * dx + dy * dy <= r * r
        };
        inside(cx) || inside(cx + sep)
    })
}

#[test]
fn test_overlapping_disks_split_for_even_and_odd_separation() {
    for (r, sep) in [(8, 14), (8, 15), (8, 16), (10, 16), (10, 17)] {
        let mask = two_disks_mask(r, sep);
        let parts = split_object(&only_object(&mask), 1);
        assert_eq!(parts.len(), 2, "r = {r}, sep = {sep}");

        let (cx, cy) = ((r + 4) as usize, (r + 4) as usize);
        let right = cx + sep as usize;
        let owner = |px: usize| parts.iter().position(|p| p.pixels().any(|q| q == (px, cy)));
        assert!(owner(cx).is_some());
        assert!(owner(right).is_some());
        assert_ne!(owner(cx), owner(right), "r = {r}, sep = {sep}");
        for part in &parts {
            assert!(part.pixels().all(|(x, y)| mask.get_xy(x, y)));
        }
    }
}

#[test]
fn test_split_object_cuts_bridge_between_squares() {
    // Two 9x9 squares joined by a one pixel high bridge on row 6.
    let mask = BitBuffer2::from_fn(25, 13, |x, y| {
        let in_square = (2..=10).contains(&y) && ((2..=10).contains(&x) || (14..=22).contains(&x));
        let in_bridge = y == 6 && (11..=13).contains(&x);
        in_square || in_bridge
    });
    let parts = split_object(&only_object(&mask), 1);

    assert_eq!(parts.len(), 2);
    let covered: Vec<(usize, usize)> = parts.iter().flat_map(|p| p.pixels()).collect();
    assert!(!covered.contains(&(12, 6)), "bridge centre is a ridge");
    assert!(covered.contains(&(11, 6)));
    assert!(covered.contains(&(13, 6)));
    assert_eq!(covered.len(), mask.count_ones() - 1);
}

#[test]
fn test_split_object_separates_basins_without_ridge_pixels() {
    // A bridge four pixels wide has no single equidistant column, so the two
    // basins meet directly with no ridge between them.
    let mask = BitBuffer2::from_fn(26, 13, |x, y| {
        let in_square = (2..=10).contains(&y) && ((2..=10).contains(&x) || (15..=23).contains(&x));
        let in_bridge = (5..=7).contains(&y) && (11..=14).contains(&x);
        in_square || in_bridge
    });
    let parts = split_object(&only_object(&mask), 1);

    assert_eq!(parts.len(), 2);
    assert_eq!(parts.iter().map(ImageObject::area).sum::<usize>(), mask.count_ones());
    let left = parts.iter().position(|p| p.pixels().any(|q| q == (2, 2)));
    let right = parts.iter().position(|p| p.pixels().any(|q| q == (23, 10)));
    assert_ne!(left, right);
}

#[test]
fn test_split_object_keeps_single_blob() {
    let mask = BitBuffer2::from_fn(12, 12, |x, y| (2..=9).contains(&x) && (3..=8).contains(&y));
    let object = only_object(&mask);
    let parts = split_object(&object, 1);

    assert_eq!(parts, vec![object]);
}

#[test]
fn test_split_object_at_image_origin() {
    // Object touching the top-left corner; the border is local, not clipped.
    let mask = BitBuffer2::from_fn(6, 4, |x, y| x < 4 && y < 3);
    let object = only_object(&mask);
    let parts = split_object(&object, 1);

    assert_eq!(parts, vec![object]);
}
