//! Cycle-to-cycle registration.
//!
//! A [`Registrar`] is asked once per loaded batch for the transform of every
//! `(channel, cycle)` image relative to a reference cycle. The driver
//! composes the results into the images; pixel buffers are never shifted.

pub mod correlation;

pub use correlation::CorrelationRegistrar;

use crate::image::PixelTransform;
use crate::pipeline::CycleBatch;

/// Resolves per-image transforms for a batch.
pub trait Registrar: Sync {
    /// Returns `[channel][cycle]` transforms mapping the batch frame onto the
    /// frame of `reference_cycle`.
    fn register(&self, batch: &CycleBatch, reference_cycle: usize) -> Vec<Vec<PixelTransform>>;
}

/// Registrar for pre-aligned imagery: every offset is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRegistrar;

impl Registrar for IdentityRegistrar {
    fn register(&self, batch: &CycleBatch, _reference_cycle: usize) -> Vec<Vec<PixelTransform>> {
        vec![vec![PixelTransform::IDENTITY; batch.num_cycles()]; batch.num_channels()]
    }
}
