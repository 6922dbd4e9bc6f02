//! Configuration types for the segmentation pipeline.
//!
//! [`Config`] is constructed once and handed to the driver; nothing reads
//! configuration from global state. All parameters are grouped by concern.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Thresholding
// ============================================================================

/// Local-contrast adaptive thresholding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Window radius in pixels; the window spans `2 * window + 1` pixels per axis.
    pub window: usize,
    /// A pixel is foreground when `value - lo > fraction * (hi - lo)`.
    pub fraction: f32,
    /// Value written for foreground pixels when a binary image is rendered.
    pub foreground: u16,
    /// Random samples per window to estimate lo/hi. 0 = exhaustive.
    pub samples: usize,
    /// Seed for the sampling mode.
    pub seed: u64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            window: 6,
            fraction: 0.7,
            foreground: 1,
            samples: 0,
            seed: 0x5eed,
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) {
        assert!(
            self.fraction > 0.0 && self.fraction < 1.0,
            "threshold fraction must be in (0, 1), got {}",
            self.fraction
        );
        assert!(self.foreground > 0, "foreground value must be non-zero");
    }
}

// ============================================================================
// Background subtraction
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub enabled: bool,
    /// Radius of the windowed minimum used as the background estimate.
    pub window: usize,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 12,
        }
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Correlation registration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Offsets are searched in `[-search_radius, search_radius]` on both axes.
    pub search_radius: usize,
    /// Side length of the centred square used for correlation.
    /// Clamped to the image size.
    pub subimage: usize,
    /// Peaks below this normalised correlation fall back to a zero offset.
    pub min_correlation: f32,
    /// Number of consecutive cycles, starting at the reference cycle,
    /// max-aggregated into the reference image.
    pub aggregate_cycles: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            search_radius: 8,
            subimage: 256,
            min_correlation: 0.2,
            aggregate_cycles: 1,
        }
    }
}

impl CorrelationConfig {
    pub fn validate(&self) {
        assert!(self.subimage > 0, "correlation subimage must be positive");
        assert!(
            (-1.0..=1.0).contains(&self.min_correlation),
            "min_correlation must be in [-1, 1], got {}",
            self.min_correlation
        );
        assert!(
            self.aggregate_cycles > 0,
            "aggregate_cycles must be at least 1"
        );
    }
}

// ============================================================================
// Crop
// ============================================================================

/// Rectangle applied to every image at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub threshold: ThresholdConfig,
    pub background: BackgroundConfig,
    pub correlation: CorrelationConfig,
    pub crop: Option<Crop>,

    /// Leading cycles thresholded to create clusters.
    pub segment_cycles: usize,
    /// Cycles loaded per batch; trades memory for fewer re-registrations.
    pub load_cycle: usize,
    /// Fewer clusters than this is a failed segmentation.
    pub min_clusters: usize,
    /// More clusters than this trips the resource guard.
    pub max_clusters: usize,
    /// Cycle (within the first batch) that defines the registration frame.
    pub reference_cycle: usize,
    /// Split merged blobs with the distance transform + watershed.
    pub watershed: bool,
    /// Images decoded concurrently while loading a batch.
    pub max_concurrent_loads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: ThresholdConfig::default(),
            background: BackgroundConfig::default(),
            correlation: CorrelationConfig::default(),
            crop: None,
            segment_cycles: 4,
            load_cycle: 20,
            min_clusters: 1000,
            max_clusters: 2_000_000,
            reference_cycle: 0,
            watershed: true,
            max_concurrent_loads: 8,
        }
    }
}

impl Config {
    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config =
            serde_yml::from_str(yaml).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate();
        Ok(config)
    }

    pub fn validate(&self) {
        self.threshold.validate();
        self.correlation.validate();
        assert!(self.segment_cycles > 0, "segment_cycles must be at least 1");
        assert!(
            self.load_cycle >= self.segment_cycles,
            "load_cycle ({}) must be >= segment_cycles ({})",
            self.load_cycle,
            self.segment_cycles
        );
        assert!(
            self.reference_cycle < self.load_cycle,
            "reference_cycle ({}) must fall inside the first batch of {} cycles",
            self.reference_cycle,
            self.load_cycle
        );
        assert!(
            self.min_clusters <= self.max_clusters,
            "min_clusters ({}) must be <= max_clusters ({})",
            self.min_clusters,
            self.max_clusters
        );
        assert!(
            self.max_concurrent_loads > 0,
            "max_concurrent_loads must be positive"
        );
        if let Some(crop) = &self.crop {
            assert!(
                crop.width > 0 && crop.height > 0,
                "crop rectangle must be non-empty"
            );
        }
    }
}
