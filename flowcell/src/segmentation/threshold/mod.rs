//! Local-contrast adaptive thresholding.
//!
//! A pixel is foreground when it rises above its window minimum by more than
//! `fraction` of the window's range:
//!
//! ```text
//! value - lo > fraction * (hi - lo)
//! ```
//!
//! The test is written with subtractions only. A flat window (`hi == lo`)
//! reduces to `0 > 0` and is never foreground.
//!
//! Window extrema come from [`window_extrema`] (exhaustive) or, when
//! `samples > 0`, from seeded random samples inside the clamped window.


use rand::prelude::*;
use rayon::prelude::*;

use crate::common::{BitBuffer2, Buffer2};
use crate::config::ThresholdConfig;
use crate::segmentation::sliding_window::{window_extrema, WindowExtrema};

/// Thresholded mask plus the local background estimate, when requested.
#[derive(Debug, Clone)]
pub struct ThresholdResult {
    pub mask: BitBuffer2,
    /// Windowed minimum, the local background level.
    pub background: Option<Buffer2<u16>>,
}

/// Adaptive binariser configured once per run.
#[derive(Debug, Clone)]
pub struct Thresholder {
    config: ThresholdConfig,
}

impl Thresholder {
    pub fn new(config: ThresholdConfig) -> Self {
        config.validate();
        Self { config }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Binarise `image` into a foreground mask.
    pub fn threshold(&self, image: &Buffer2<u16>) -> BitBuffer2 {
        self.run(image, false).mask
    }

    /// Binarise and also return the windowed minimum as local background.
    pub fn threshold_with_background(&self, image: &Buffer2<u16>) -> ThresholdResult {
        self.run(image, true)
    }

    fn run(&self, image: &Buffer2<u16>, keep_background: bool) -> ThresholdResult {
        let width = image.width();
        let height = image.height();
        let mut mask = BitBuffer2::new_default(width, height);
        if width == 0 || height == 0 {
            return ThresholdResult {
                mask,
                background: keep_background.then(|| image.clone()),
            };
        }

        if self.config.samples == 0 {
            let WindowExtrema { min, max } = window_extrema(image, self.config.window);
            fill_mask(&mut mask, |y, x| {
                let idx = y * width + x;
                is_foreground(image[idx], min[idx], max[idx], self.config.fraction)
            });
            ThresholdResult {
                mask,
                background: keep_background.then_some(min),
            }
        } else {
            let (lo, hi) = sampled_extrema(image, &self.config);
            fill_mask(&mut mask, |y, x| {
                let idx = y * width + x;
                is_foreground(image[idx], lo[idx], hi[idx], self.config.fraction)
            });
            ThresholdResult {
                mask,
                background: keep_background.then_some(lo),
            }
        }
    }
}

/// Render a mask as an image with `foreground` on set pixels and 0 elsewhere.
pub fn render_binary(mask: &BitBuffer2, foreground: u16) -> Buffer2<u16> {
    Buffer2::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_xy(x, y) {
            foreground
        } else {
            0
        }
    })
}

#[inline]
fn is_foreground(value: u16, lo: u16, hi: u16, fraction: f32) -> bool {
    let above = value as i32 - lo as i32;
    let range = hi as i32 - lo as i32;
    above as f32 > fraction * range as f32
}

/// Fill mask rows in parallel from a per-pixel predicate `f(y, x)`.
fn fill_mask(mask: &mut BitBuffer2, f: impl Fn(usize, usize) -> bool + Sync) {
    let width = mask.width();
    let words_per_row = mask.words_per_row();
    mask.words_mut()
        .par_chunks_mut(words_per_row)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                if f(y, x) {
                    row[x / 64] |= 1u64 << (x % 64);
                }
            }
        });
}

/// Estimate window extrema from random samples.
///
/// Each row draws from its own generator seeded from `(seed, y)`, so the
/// result does not depend on how rows are scheduled across threads. The
/// centre pixel always takes part, which keeps `lo <= value <= hi`.
fn sampled_extrema(image: &Buffer2<u16>, config: &ThresholdConfig) -> (Buffer2<u16>, Buffer2<u16>) {
    let width = image.width();
    let height = image.height();
    let radius = config.window;
    let mut lo = Buffer2::new_default(width, height);
    let mut hi = Buffer2::new_default(width, height);

    lo.pixels_mut()
        .par_chunks_mut(width)
        .zip(hi.pixels_mut().par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (lo_row, hi_row))| {
            let mut rng = StdRng::seed_from_u64(row_seed(config.seed, y));
            let y0 = y.saturating_sub(radius);
            let y1 = (y + radius).min(height - 1);
            for x in 0..width {
                let x0 = x.saturating_sub(radius);
                let x1 = (x + radius).min(width - 1);
                let mut min = image[(x, y)];
                let mut max = min;
                for _ in 0..config.samples {
                    let v = image[(rng.random_range(x0..=x1), rng.random_range(y0..=y1))];
                    min = min.min(v);
                    max = max.max(v);
                }
                lo_row[x] = min;
                hi_row[x] = max;
            }
        });

    (lo, hi)
}

#[inline]
fn row_seed(seed: u64, y: usize) -> u64 {
    seed ^ (y as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
