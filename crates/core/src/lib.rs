//! # EmberGis Core
//!
//! Core types for the EmberGis burn-severity analysis library.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`: Coordinate Reference System handling
//! - `Mask`: Per-pixel validity grid
//! - `MultiBandImage` / `Scene` / `ImageCollection`: the multispectral
//!   data model consumed by the pipeline
//! - `Region`: rectangular area of interest

pub mod crs;
pub mod error;
pub mod image;
pub mod raster;
pub mod region;

pub use crs::CRS;
pub use error::{Error, Result};
pub use image::{band, ImageCollection, MultiBandImage, Scene};
pub use raster::{GeoTransform, Mask, Raster, RasterElement};
pub use region::Region;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::image::{band, ImageCollection, MultiBandImage, Scene};
    pub use crate::raster::{GeoTransform, Mask, Raster, RasterElement};
    pub use crate::region::Region;
}
