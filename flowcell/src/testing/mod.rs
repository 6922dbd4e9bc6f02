//! Testing utilities for flowcell.

#![allow(dead_code)]

use std::path::PathBuf;

use crate::common::Buffer2;
use crate::image::source::{FileLists, MemoryImageSource};

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A bright square spot: `size` x `size` pixels at `level` with its top-left
/// corner at `(x, y)`, plus a single `peak` pixel in its centre.
#[derive(Debug, Clone, Copy)]
pub struct Spot {
    pub x: usize,
    pub y: usize,
    pub size: usize,
    pub level: u16,
    pub peak: u16,
}

impl Spot {
    pub fn new(x: usize, y: usize, size: usize, level: u16) -> Self {
        Self {
            x,
            y,
            size,
            level,
            peak: level,
        }
    }

    pub fn with_peak(mut self, peak: u16) -> Self {
        self.peak = peak;
        self
    }

    pub fn centre(&self) -> (usize, usize) {
        (self.x + self.size / 2, self.y + self.size / 2)
    }
}

/// Render spots over a flat background. Later spots overwrite earlier ones.
pub fn render_spots(width: usize, height: usize, background: u16, spots: &[Spot]) -> Buffer2<u16> {
    let mut image = Buffer2::new_filled(width, height, background);
    for spot in spots {
        for y in spot.y..(spot.y + spot.size).min(height) {
            for x in spot.x..(spot.x + spot.size).min(width) {
                image[(x, y)] = spot.level;
            }
        }
        let (cx, cy) = spot.centre();
        if cx < width && cy < height {
            image[(cx, cy)] = spot.peak;
        }
    }
    image
}

/// Register `[channel][cycle]` images in a memory source under synthetic
/// paths and return the matching file lists.
pub fn memory_run(images: Vec<Vec<Buffer2<u16>>>) -> (MemoryImageSource, FileLists) {
    let mut source = MemoryImageSource::new();
    let mut lists = Vec::with_capacity(images.len());
    for (ch, cycles) in images.into_iter().enumerate() {
        let mut paths = Vec::with_capacity(cycles.len());
        for (cy, image) in cycles.into_iter().enumerate() {
            let path = PathBuf::from(format!("mem/ch{ch}/cycle{cy:03}.tif"));
            source.insert(path.clone(), image);
            paths.push(path);
        }
        lists.push(paths);
    }
    let files = FileLists::new(lists).unwrap();
    (source, files)
}
