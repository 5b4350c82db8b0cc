//! Pipeline orchestration
//!
//! Threads explicit configuration through the whole data flow: catalog
//! query → scene preparation → median composite → region clip → sigma →
//! index suite → change metrics → stacked export. Everything the original
//! analysis assumed from its surrounding environment (area of interest,
//! date windows, output parameters) arrives here as a configuration
//! object passed by the caller.
//!
//! Periods run as a synchronous loop over a materialized list; retries,
//! cancellation and timeouts belong to the collaborators driving the
//! catalog and export services, not to this core.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use embergis_core::{band, ImageCollection, MultiBandImage, Region, Result, CRS};

use crate::imagery::{
    clip_to_region, compute_index, compute_suite, ensure_valid, estimate_sigma, index_delta,
    median_composite, prepare_collection, relative_dnbr, relativized_burn_ratio, stack,
    ExportRequest, ExportSink, IndexParams, MaskConfig, RasterFormat, SpectralIndex,
};

/// ISO-8601 date range, inclusive start, exclusive end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// One named analysis period (e.g. "pre_fire", "post_fire")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub label: String,
    pub range: DateRange,
}

impl Period {
    pub fn new(label: impl Into<String>, range: DateRange) -> Self {
        Self {
            label: label.into(),
            range,
        }
    }
}

/// Query handed to the imagery catalog collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneQuery {
    /// Spatial bound of the search
    pub region: Region,
    /// Acquisition date range
    pub range: DateRange,
    /// Maximum scene-level cloud cover percentage, if filtering
    pub max_cloud_cover: Option<f64>,
}

impl SceneQuery {
    pub fn new(region: Region, range: DateRange) -> Self {
        Self {
            region,
            range,
            max_cloud_cover: None,
        }
    }

    /// Set the scene-level cloud cover ceiling
    pub fn max_cloud_cover(mut self, percent: f64) -> Self {
        self.max_cloud_cover = Some(percent);
        self
    }
}

/// The imagery catalog collaborator.
///
/// Returns scenes carrying reflectance bands at a fixed ground resolution
/// plus one categorical classification band. Pagination, caching and
/// retry live behind this trait.
pub trait SceneCatalog {
    fn search(&self, query: &SceneQuery) -> Result<ImageCollection>;
}

/// Fixed output parameters shared by every export of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Output resolution in ground units
    pub scale: f64,
    /// Output coordinate reference system
    pub crs: CRS,
    /// Destination folder at the export service
    pub folder: String,
    /// Output raster format
    pub format: RasterFormat,
    /// Upper bound on output pixels the service will accept
    pub max_pixels: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            scale: 10.0,
            crs: CRS::wgs84(),
            folder: "embergis".to_string(),
            format: RasterFormat::GeoTiff,
            max_pixels: 10_u64.pow(13),
        }
    }
}

/// Complete pipeline configuration, passed by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Area of interest
    pub region: Region,
    /// Baseline period before the disturbance
    pub pre: Period,
    /// Assessment period after the disturbance
    pub post: Period,
    /// Scene-level cloud cover ceiling for catalog queries
    pub max_cloud_cover: f64,
    /// Classification mask policy shared by every stage
    pub mask: MaskConfig,
    /// Output parameters
    pub export: ExportSettings,
}

impl PipelineConfig {
    /// Configuration with the reference deployment's defaults: cloud
    /// ceiling 40%, scale 10 ground units, WGS84, GeoTIFF.
    pub fn new(region: Region, pre: Period, post: Period) -> Self {
        Self {
            region,
            pre,
            post,
            max_cloud_cover: 40.0,
            mask: MaskConfig::default(),
            export: ExportSettings::default(),
        }
    }
}

/// Names of the change-metric bands in the burn-severity stack
const DNBR: &str = "dNBR";
const DBAIS2: &str = "dBAIS2";
const RBR: &str = "RBR";
const RDNBR: &str = "RdNBR";

/// The full analysis: one spectral-index suite per period, then the
/// pre/post burn-severity stack.
pub struct BurnSeverityPipeline {
    config: PipelineConfig,
}

impl BurnSeverityPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the analysis-ready composite for one period, along with the
    /// prepared (masked, reflectance-scaled) collection it came from.
    pub fn period_composite<C: SceneCatalog>(
        &self,
        catalog: &C,
        period: &Period,
    ) -> Result<(MultiBandImage, ImageCollection)> {
        let query = SceneQuery::new(self.config.region, period.range.clone())
            .max_cloud_cover(self.config.max_cloud_cover);
        let raw = catalog.search(&query)?;
        info!(
            period = %period.label,
            scenes = raw.len(),
            "catalog query resolved"
        );

        let prepared = prepare_collection(&raw, &self.config.mask, &band::ALL)?;
        let composite = median_composite(&prepared, &band::ALL)?;
        let composite = clip_to_region(&composite, &self.config.region)?;
        ensure_valid(&composite, &period.label)?;

        Ok((composite, prepared))
    }

    /// Evaluate the whole index registry on one period's composite.
    ///
    /// The sigma estimate is the one blocking dependency: kNDVI cannot be
    /// evaluated until the temporal-then-spatial reduction has finished.
    pub fn period_suite(
        &self,
        composite: &MultiBandImage,
        collection: &ImageCollection,
        label: &str,
    ) -> Result<MultiBandImage> {
        let sigma = estimate_sigma(collection)?;
        debug!(period = label, sigma, "sigma estimate complete");

        let params = IndexParams {
            kndvi_sigma: Some(sigma),
        };
        stack(compute_suite(composite, &params)?)
    }

    /// Derive the burn-severity stack (dNBR, dBAIS2, RBR, RdNBR) from the
    /// pre and post composites. Both NBR and BAIS2 come out of the shared
    /// formula registry.
    pub fn burn_severity(
        &self,
        pre: &MultiBandImage,
        post: &MultiBandImage,
    ) -> Result<MultiBandImage> {
        let params = IndexParams::default();

        let nbr_pre = compute_index(pre, SpectralIndex::Nbr, &params)?;
        let nbr_post = compute_index(post, SpectralIndex::Nbr, &params)?;
        let bais2_pre = compute_index(pre, SpectralIndex::Bais2, &params)?;
        let bais2_post = compute_index(post, SpectralIndex::Bais2, &params)?;

        let dnbr = index_delta(&nbr_pre, &nbr_post)?;
        let dbais2 = index_delta(&bais2_pre, &bais2_post)?;
        let rbr = relativized_burn_ratio(&dnbr, &nbr_pre)?;
        let rdnbr = relative_dnbr(&dnbr, &nbr_pre)?;

        stack(vec![
            (DNBR.to_string(), dnbr),
            (DBAIS2.to_string(), dbais2),
            (RBR.to_string(), rbr),
            (RDNBR.to_string(), rdnbr),
        ])
    }

    /// Run the whole analysis against the collaborators: per-period index
    /// suites, then the pre/post burn-severity product.
    pub fn run<C: SceneCatalog, E: ExportSink>(&self, catalog: &C, sink: &mut E) -> Result<()> {
        let mut composites = Vec::with_capacity(2);

        for period in [&self.config.pre, &self.config.post] {
            let (composite, prepared) = self.period_composite(catalog, period)?;
            let suite = self.period_suite(&composite, &prepared, &period.label)?;

            let request = self.export_request(&format!("indices_{}", period.label));
            sink.export(&suite, &request)?;
            info!(
                period = %period.label,
                bands = suite.band_count(),
                "period index suite exported"
            );

            composites.push(composite);
        }

        let severity = self.burn_severity(&composites[0], &composites[1])?;
        let request = self.export_request("burn_severity");
        sink.export(&severity, &request)?;
        info!(bands = severity.band_count(), "burn severity stack exported");

        Ok(())
    }

    fn export_request(&self, description: &str) -> ExportRequest {
        ExportRequest {
            description: description.to_string(),
            folder: self.config.export.folder.clone(),
            file_name: None,
            scale: self.config.export.scale,
            crs: self.config.export.crs.clone(),
            region: self.config.region,
            format: self.config.export.format,
            max_pixels: self.config.export.max_pixels,
        }
    }
}
