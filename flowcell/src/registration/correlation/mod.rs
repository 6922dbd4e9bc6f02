//! Integer-offset registration by normalised cross-correlation.
//!
//! The reference is the per-pixel maximum over all channels of the
//! reference cycle (optionally several consecutive cycles). A centred square
//! window of the reference is compared with every image at each integer
//! offset in `[-search_radius, search_radius]^2`; the offset with the
//! highest zero-mean normalised cross-correlation wins. Ties keep the first
//! offset in scan order (rows of `dy`, then `dx`).


use rayon::prelude::*;

use crate::common::Buffer2;
use crate::config::CorrelationConfig;
use crate::image::{Image, PixelTransform};
use crate::pipeline::CycleBatch;
use crate::registration::Registrar;

/// Best offset found for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationPeak {
    pub dx: i32,
    pub dy: i32,
    /// Zero-mean normalised cross-correlation at the peak, in `[-1, 1]`.
    pub score: f64,
}

/// Square window of the reference used for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    x0: usize,
    y0: usize,
    size: usize,
}

/// Reference pixels of the window with their mean and centred energy.
struct ReferencePatch {
    window: Window,
    values: Vec<f64>,
    mean: f64,
    energy: f64,
}

#[derive(Debug, Clone)]
pub struct CorrelationRegistrar {
    config: CorrelationConfig,
}

impl CorrelationRegistrar {
    pub fn new(config: CorrelationConfig) -> Self {
        config.validate();
        Self { config }
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    /// Search the best offset of `image` against `reference`.
    ///
    /// Returns `None` when the window does not fit or the reference window
    /// is flat.
    pub fn correlate(&self, reference: &Buffer2<u16>, image: &Image) -> Option<CorrelationPeak> {
        let window = self.window(reference.width(), reference.height())?;
        let patch = ReferencePatch::new(reference, window)?;
        Some(self.search(&patch, image))
    }

    fn window(&self, width: usize, height: usize) -> Option<Window> {
        let margin = 2 * self.config.search_radius;
        let size = self
            .config
            .subimage
            .min(width.saturating_sub(margin))
            .min(height.saturating_sub(margin));
        if size == 0 {
            return None;
        }
        let radius = self.config.search_radius;
        Some(Window {
            x0: radius + (width - margin - size) / 2,
            y0: radius + (height - margin - size) / 2,
            size,
        })
    }

    fn search(&self, patch: &ReferencePatch, image: &Image) -> CorrelationPeak {
        let radius = self.config.search_radius as i32;
        let mut best = CorrelationPeak {
            dx: 0,
            dy: 0,
            score: f64::NEG_INFINITY,
        };
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let score = patch.score(image, dx, dy);
                if score > best.score {
                    best = CorrelationPeak { dx, dy, score };
                }
            }
        }
        best
    }
}

impl ReferencePatch {
    fn new(reference: &Buffer2<u16>, window: Window) -> Option<Self> {
        let Window { x0, y0, size } = window;
        let values: Vec<f64> = (y0..y0 + size)
            .flat_map(|y| (x0..x0 + size).map(move |x| (x, y)))
            .map(|(x, y)| reference[(x, y)] as f64)
            .collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let energy: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        if energy <= 0.0 {
            return None;
        }
        Some(Self {
            window,
            values,
            mean,
            energy,
        })
    }

    /// ZNCC of the window against `image` read at `(x + dx, y + dy)`.
    /// A flat target window scores 0.
    fn score(&self, image: &Image, dx: i32, dy: i32) -> f64 {
        let Window { x0, y0, size } = self.window;
        let n = self.values.len() as f64;

        let mut sum_t = 0.0;
        let mut sum_tt = 0.0;
        let mut sum_rt = 0.0;
        let mut i = 0;
        for y in y0..y0 + size {
            let sy = (y as i64 + dy as i64) as usize;
            for x in x0..x0 + size {
                let sx = (x as i64 + dx as i64) as usize;
                let t = image.sample(sx, sy).unwrap_or(0) as f64;
                sum_t += t;
                sum_tt += t * t;
                sum_rt += (self.values[i] - self.mean) * t;
                i += 1;
            }
        }

        let target_energy = sum_tt - sum_t * sum_t / n;
        if target_energy <= 0.0 {
            return 0.0;
        }
        sum_rt / (self.energy * target_energy).sqrt()
    }
}

impl Registrar for CorrelationRegistrar {
    fn register(&self, batch: &CycleBatch, reference_cycle: usize) -> Vec<Vec<PixelTransform>> {
        let reference = batch.aggregate(reference_cycle, self.config.aggregate_cycles);
        let num_cycles = batch.num_cycles();

        let patch = self
            .window(reference.width(), reference.height())
            .and_then(|window| ReferencePatch::new(&reference, window));
        let Some(patch) = patch else {
            tracing::warn!(
                cycle = batch.first_cycle() + reference_cycle,
                "reference window is empty or flat, using zero offsets"
            );
            return vec![vec![PixelTransform::IDENTITY; num_cycles]; batch.num_channels()];
        };

        let jobs: Vec<(usize, usize)> = (0..batch.num_channels())
            .flat_map(|ch| (0..num_cycles).map(move |cy| (ch, cy)))
            .collect();

        let offsets: Vec<PixelTransform> = jobs
            .par_iter()
            .map(|&(ch, cy)| {
                let peak = self.search(&patch, batch.image(ch, cy));
                let cycle = batch.first_cycle() + cy;
                if peak.score < self.config.min_correlation as f64 {
                    tracing::warn!(
                        channel = ch,
                        cycle,
                        score = peak.score,
                        "correlation peak below threshold, using zero offset"
                    );
                    PixelTransform::IDENTITY
                } else {
                    tracing::debug!(
                        channel = ch,
                        cycle,
                        dx = peak.dx,
                        dy = peak.dy,
                        score = peak.score,
                        "registered"
                    );
                    PixelTransform::from_offset(peak.dx, peak.dy)
                }
            })
            .collect();

        offsets
            .chunks(num_cycles)
            .map(<[PixelTransform]>::to_vec)
            .collect()
    }
}
