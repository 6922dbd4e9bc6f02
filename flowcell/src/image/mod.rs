//! Intensity images with a lazily applied pixel transform.
//!
//! Registration never rewrites pixel data: an [`Image`] shares its decoded
//! buffer and carries a [`PixelTransform`] that is applied on every read.
//! The same buffer is sampled for every cycle pass over the clusters.

pub mod source;


use std::sync::Arc;

use glam::{IVec2, Vec2};

use crate::common::Buffer2;
use crate::config::Crop;

/// Maps frame coordinates to source-buffer coordinates.
///
/// `source = p + offset + round(slope * p)` per axis. Transforms compose by
/// value with [`PixelTransform::then`]; they are never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelTransform {
    pub offset: IVec2,
    pub slope: Vec2,
}

impl PixelTransform {
    pub const IDENTITY: Self = Self {
        offset: IVec2::ZERO,
        slope: Vec2::ZERO,
    };

    pub fn from_offset(dx: i32, dy: i32) -> Self {
        Self {
            offset: IVec2::new(dx, dy),
            slope: Vec2::ZERO,
        }
    }

    /// Combine with a transform applied after this one.
    #[must_use]
    pub fn then(self, other: PixelTransform) -> Self {
        Self {
            offset: self.offset + other.offset,
            slope: self.slope + other.slope,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.offset == IVec2::ZERO && self.slope == Vec2::ZERO
    }

    #[inline]
    pub fn apply(&self, x: usize, y: usize) -> (i64, i64) {
        let sx = x as i64 + self.offset.x as i64 + (self.slope.x * x as f32).round() as i64;
        let sy = y as i64 + self.offset.y as i64 + (self.slope.y * y as f32).round() as i64;
        (sx, sy)
    }
}

/// A single-channel 16-bit image in a registered frame.
#[derive(Debug, Clone)]
pub struct Image {
    pixels: Arc<Buffer2<u16>>,
    transform: PixelTransform,
}

impl Image {
    pub fn new(pixels: Buffer2<u16>) -> Self {
        Self {
            pixels: Arc::new(pixels),
            transform: PixelTransform::IDENTITY,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    #[inline]
    pub fn transform(&self) -> PixelTransform {
        self.transform
    }

    /// Untransformed source buffer.
    #[inline]
    pub fn buffer(&self) -> &Buffer2<u16> {
        &self.pixels
    }

    /// Same pixel buffer viewed through `self.transform` followed by `transform`.
    #[must_use]
    pub fn transformed(&self, transform: PixelTransform) -> Self {
        Self {
            pixels: Arc::clone(&self.pixels),
            transform: self.transform.then(transform),
        }
    }

    /// Read the pixel at frame position `(x, y)`; `None` when the transformed
    /// position falls outside the source buffer.
    #[inline]
    pub fn sample(&self, x: usize, y: usize) -> Option<u16> {
        let (sx, sy) = self.transform.apply(x, y);
        self.pixels.get_checked(sx, sy).copied()
    }

    /// Materialise the transformed view; unreadable pixels become 0.
    pub fn resample(&self) -> Buffer2<u16> {
        if self.transform.is_identity() {
            return (*self.pixels).clone();
        }
        Buffer2::from_fn(self.width(), self.height(), |x, y| {
            self.sample(x, y).unwrap_or(0)
        })
    }

    /// Copy out the crop rectangle, clamped to the image bounds.
    pub fn crop(&self, crop: &Crop) -> Self {
        let x0 = crop.x.min(self.width());
        let y0 = crop.y.min(self.height());
        let width = crop.width.min(self.width() - x0);
        let height = crop.height.min(self.height() - y0);
        let pixels = Buffer2::from_fn(width, height, |x, y| self.pixels[(x0 + x, y0 + y)]);
        Self {
            pixels: Arc::new(pixels),
            transform: self.transform,
        }
    }
}
