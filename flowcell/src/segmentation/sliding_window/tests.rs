//! Tests for sliding-window extrema.

use rand::prelude::*;

use super::*;

/// O(r^2)-per-pixel reference with the same border clamping.
fn brute_force(image: &Buffer2<u16>, radius: usize) -> (Buffer2<u16>, Buffer2<u16>) {
    let w = image.width();
    let h = image.height();
    let mut min = Buffer2::new_default(w, h);
    let mut max = Buffer2::new_default(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut lo = u16::MAX;
            let mut hi = 0u16;
            for yy in y.saturating_sub(radius)..=(y + radius).min(h - 1) {
                for xx in x.saturating_sub(radius)..=(x + radius).min(w - 1) {
                    lo = lo.min(image[(xx, yy)]);
                    hi = hi.max(image[(xx, yy)]);
                }
            }
            min[(x, y)] = lo;
            max[(x, y)] = hi;
        }
    }
    (min, max)
}

fn random_image(rng: &mut StdRng, width: usize, height: usize, levels: u16) -> Buffer2<u16> {
    Buffer2::from_fn(width, height, |_, _| rng.random_range(0..levels))
}

#[test]
fn test_matches_brute_force_on_random_images() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..40 {
        let width = rng.random_range(1..24);
        let height = rng.random_range(1..24);
        // Few levels force many ties.
        let levels = if rng.random_bool(0.5) { 4 } else { 60_000 };
        let image = random_image(&mut rng, width, height, levels);

        for radius in [0, 1, 2, 5] {
            let extrema = window_extrema(&image, radius);
            let (min, max) = brute_force(&image, radius);
            assert_eq!(extrema.min, min, "min mismatch {width}x{height} r={radius}");
            assert_eq!(extrema.max, max, "max mismatch {width}x{height} r={radius}");
        }
    }
}

#[test]
fn test_radius_larger_than_image() {
    let image = Buffer2::new(3, 2, vec![5, 1, 9, 4, 7, 2]);
    let extrema = window_extrema(&image, 10);
    assert!(extrema.min.pixels().iter().all(|&v| v == 1));
    assert!(extrema.max.pixels().iter().all(|&v| v == 9));
}

#[test]
fn test_radius_zero_is_identity() {
    let image = Buffer2::new(2, 2, vec![3, 1, 4, 1]);
    assert_eq!(window_min(&image, 0), image);
    assert_eq!(window_max(&image, 0), image);
}

#[test]
fn test_single_row_pass() {
    let src = [3u16, 1, 4, 1, 5, 9, 2, 6];
    let mut dst = [0u16; 8];
    let mut deque = VecDeque::new();
    extremum_pass(&src, 1, Extremum::Max, &mut dst, &mut deque);
    assert_eq!(dst, [3, 4, 4, 5, 9, 9, 9, 6]);
    extremum_pass(&src, 1, Extremum::Min, &mut dst, &mut deque);
    assert_eq!(dst, [1, 1, 1, 1, 1, 2, 2, 2]);
}

#[test]
fn test_keeps_first_of_equal_extrema() {
    // Equal values never evict each other, so the front index is the first
    // maximal value in the window.
    let src = [7u16, 7, 3, 7];
    let mut deque = VecDeque::new();
    let mut dst = [0u16; 4];
    extremum_pass(&src, 3, Extremum::Max, &mut dst, &mut deque);
    assert_eq!(deque.front(), Some(&0));
    assert_eq!(dst, [7, 7, 7, 7]);
}

#[test]
fn test_empty_image() {
    let image: Buffer2<u16> = Buffer2::new(0, 0, Vec::new());
    let extrema = window_extrema(&image, 3);
    assert!(extrema.min.is_empty());
}
