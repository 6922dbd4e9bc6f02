//! Flowcell - cluster segmentation and registration for sequencing imagery.
//!
//! Reduces per-cycle, per-channel flow-cell micrographs into clusters and,
//! per cluster, a multi-cycle series of channel intensities:
//! - Adaptive local-contrast thresholding over sliding-window extrema
//! - Run-length encoded connected component labeling (union-find)
//! - Distance transform + multi-parent watershed splitting of merged blobs
//! - Correlation-based registration applied lazily on image access
//! - Cluster assembly and per-cycle signal extension across batches
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use flowcell::{Config, CorrelationRegistrar, FileLists, Pipeline};
//!
//! let lists = FileLists::from_list_files(&["a.txt", "c.txt", "g.txt", "t.txt"])?;
//! let config = Config::default();
//! let registrar = CorrelationRegistrar::new(config.correlation.clone());
//! let clusters = Pipeline::new(config, lists, &my_loader, &registrar).run()?;
//!
//! for cluster in &clusters {
//!     let raw = cluster.signal(flowcell::RAW_SIGNAL).unwrap();
//!     println!("cluster {} has {} cycles", cluster.id(), raw.len());
//! }
//! ```

pub(crate) mod common;
pub mod cluster;
pub mod config;
mod error;
pub mod image;
pub mod pipeline;
pub mod registration;
pub mod segmentation;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Core types
// ============================================================================

pub use error::{Error, Result};
pub use image::source::{FileLists, ImageSource, MemoryImageSource};
pub use image::{Image, PixelTransform};

// ============================================================================
// Configuration
// ============================================================================

pub use config::{BackgroundConfig, Config, CorrelationConfig, Crop, ThresholdConfig};

// ============================================================================
// Segmentation
// ============================================================================

pub use segmentation::labeling::{ImageObject, Run};

// ============================================================================
// Registration
// ============================================================================

pub use registration::{CorrelationRegistrar, IdentityRegistrar, Registrar};

// ============================================================================
// Clusters and driver
// ============================================================================

pub use cluster::{Cluster, RAW_SIGNAL};
pub use pipeline::{CycleBatch, Pipeline, Stage};
