//! Local background subtraction.

use rayon::prelude::*;

use crate::common::Buffer2;
use crate::segmentation::sliding_window::window_min;

/// Subtract the windowed minimum from every pixel, saturating at 0.
pub fn subtract_background(image: &Buffer2<u16>, radius: usize) -> Buffer2<u16> {
    let background = window_min(image, radius);
    let pixels: Vec<u16> = image
        .pixels()
        .par_iter()
        .zip(background.pixels().par_iter())
        .map(|(&value, &bg)| value.saturating_sub(bg))
        .collect();
    Buffer2::new(image.width(), image.height(), pixels)
}
