//! # EmberGis Algorithms
//!
//! Burn-severity and vegetation analysis over multi-temporal
//! multispectral imagery:
//!
//! - **imagery**: scene-classification masking, median temporal
//!   composites, the spectral-index registry (NBR, NBR2, NDVI, NDWI,
//!   VARI, MSAVI, BAIS2, MIRBI, CSI, kNDVI), pre/post change metrics
//!   (dNBR, RBR, RdNBR), sigma estimation for kNDVI, and band stacking
//!   for export.
//! - **pipeline**: explicit configuration, the catalog/export
//!   collaborator boundaries, and the synchronous per-period run loop.

pub mod imagery;
pub mod pipeline;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        apply_mask, compute_index, compute_suite, ensure_valid, estimate_sigma, index_delta,
        median_composite, prepare_collection, relative_dnbr, relativized_burn_ratio, scene_mask,
        stack, ExportRequest, ExportSink, IndexParams, MaskConfig, RasterFormat, SpectralIndex,
    };
    pub use crate::pipeline::{
        BurnSeverityPipeline, DateRange, ExportSettings, Period, PipelineConfig, SceneCatalog,
        SceneQuery,
    };
    pub use embergis_core::prelude::*;
}
