//! Shared containers re-exported from the `common` crate.

pub use common::bit_buffer2::BitBuffer2;
pub use common::buffer2::Buffer2;
pub use common::parallel::try_par_map_limited;
