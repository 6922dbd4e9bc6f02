//! Error types for the segmentation pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fatal conditions of a pipeline run.
///
/// None of these are retried: a failed run must be re-invoked from scratch.
#[derive(Debug, Error)]
pub enum Error {
    #[error("No image paths listed for channel {channel}")]
    EmptyFileList { channel: usize },

    #[error("Failed to read file list '{path}': {source}")]
    FileList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Channel {channel} lists {actual} cycles, expected {expected}")]
    ChannelLengthMismatch {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to load image '{path}': {reason}")]
    ImageLoad { path: PathBuf, reason: String },

    #[error("Image '{path}' is {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        path: PathBuf,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Segmentation failed: found {found} clusters, need at least {min}")]
    TooFewClusters { found: usize, min: usize },

    #[error("Found {found} clusters, exceeding the ceiling of {max}")]
    TooManyClusters { found: usize, max: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Distinct process exit status for each fatal condition.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::EmptyFileList { .. } => 2,
            Error::FileList { .. } => 3,
            Error::ChannelLengthMismatch { .. } => 4,
            Error::ImageLoad { .. } => 5,
            Error::DimensionMismatch { .. } => 6,
            Error::TooFewClusters { .. } => 10,
            Error::TooManyClusters { .. } => 11,
            Error::InvalidConfig(_) => 12,
        }
    }
}
