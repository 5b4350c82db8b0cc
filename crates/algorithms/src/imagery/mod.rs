//! Imagery analysis algorithms
//!
//! The burn-severity pipeline stages:
//! - Masking: validity masks from the scene classification band
//! - Compositing: robust median composites per analysis period
//! - Indices: the spectral-index formula registry
//! - Change: pre/post deltas and relativized burn ratios
//! - Sigma: the kNDVI scale estimate
//! - Stack: ordered, type-normalized band stacks for export

mod change;
mod composite;
mod indices;
mod masking;
mod sigma;
mod stack;

pub use change::{index_delta, relative_dnbr, relativized_burn_ratio};
pub use composite::{ensure_valid, median_composite};
pub use indices::{compute_index, compute_suite, IndexParams, SpectralIndex};
pub use masking::{
    apply_mask, class_code, clip_to_region, prepare_collection, prepare_scene, region_mask,
    scene_mask, MaskConfig, REFLECTANCE_SCALE,
};
pub use sigma::estimate_sigma;
pub use stack::{stack, ExportRequest, ExportSink, RasterFormat};
