//! Conversion of multi-page TIFF stacks into multi-resolution OME-Zarr
//! pyramids.

pub mod convert;
pub mod dataset;
pub mod error;
pub mod ngff;
pub mod pyramid;
pub mod rescale;
pub mod stack;
pub mod voxel;

pub use convert::{run, ConvertArgs, Summary};
pub use error::{Error, Result};
