//! Read and update operations on raw node containers.

pub mod get;
pub mod slice;
pub mod update;
