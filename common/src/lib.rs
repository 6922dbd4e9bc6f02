//! Containers and helpers shared across the flowcell workspace.

pub mod bit_buffer2;
pub mod buffer2;
pub mod parallel;
