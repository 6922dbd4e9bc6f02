//! Persistent clusters and their per-cycle signals.
//!
//! Clusters are created once, from the objects of the initial segmentation
//! cycles, and afterwards only grow their signals. Downstream filters mark
//! them invalid instead of removing them, so ids stay dense.

mod assembly;


pub use assembly::assemble;

use glam::{Vec2, Vec4};
use hashbrown::HashMap;

use crate::image::Image;
use crate::segmentation::labeling::Run;

/// Name of the signal holding raw per-cycle intensities.
pub const RAW_SIGNAL: &str = "RAW";

/// A cluster with a fixed footprint and named per-cycle signal streams.
///
/// Each reading is one [`Vec4`] with one lane per channel; lanes of absent
/// channels are 0.
#[derive(Debug, Clone)]
pub struct Cluster {
    id: usize,
    footprint: Vec<Run>,
    valid: bool,
    signals: HashMap<String, Vec<Vec4>>,
}

impl Cluster {
    pub fn new(id: usize, footprint: Vec<Run>) -> Self {
        let mut signals = HashMap::new();
        signals.insert(RAW_SIGNAL.to_string(), Vec::new());
        Self {
            id,
            footprint,
            valid: true,
            signals,
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Founding footprint, row-major, as maximal runs.
    #[inline]
    pub fn footprint(&self) -> &[Run] {
        &self.footprint
    }

    pub fn area(&self) -> usize {
        self.footprint.iter().map(|r| r.len as usize).sum()
    }

    /// Mean pixel position of the footprint.
    pub fn centroid(&self) -> Vec2 {
        let area = self.area();
        if area == 0 {
            return Vec2::ZERO;
        }
        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;
        for run in &self.footprint {
            let len = run.len as f64;
            // Sum of x over the run is len * (first + last) / 2.
            sum_x += len * (run.x as f64 + (run.end() - 1) as f64) / 2.0;
            sum_y += len * run.y as f64;
        }
        Vec2::new((sum_x / area as f64) as f32, (sum_y / area as f64) as f32)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Ordered readings of a signal, one per cycle.
    pub fn signal(&self, name: &str) -> Option<&[Vec4]> {
        self.signals.get(name).map(Vec::as_slice)
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.signals.keys().map(String::as_str)
    }

    /// Append a reading to a signal, creating the signal when missing.
    pub fn push_reading(&mut self, name: &str, reading: Vec4) {
        match self.signals.get_mut(name) {
            Some(readings) => readings.push(reading),
            None => {
                self.signals.insert(name.to_string(), vec![reading]);
            }
        }
    }

    /// Peak value under the footprint in every channel image of one cycle.
    ///
    /// Pixels the transform maps outside an image are skipped; a channel
    /// with no readable pixel reads 0.
    pub fn read(&self, channels: &[&Image]) -> Vec4 {
        debug_assert!(channels.len() <= 4);
        let mut reading = [0.0f32; 4];
        for (lane, image) in reading.iter_mut().zip(channels) {
            let peak = self
                .footprint
                .iter()
                .flat_map(|run| run.xs().map(move |x| (x as usize, run.y as usize)))
                .filter_map(|(x, y)| image.sample(x, y))
                .max()
                .unwrap_or(0);
            *lane = peak as f32;
        }
        Vec4::from_array(reading)
    }
}
