//! Multi-band images, acquisition scenes and temporal collections

use crate::error::{Error, Result};
use crate::raster::Raster;

/// Logical band names used throughout the pipeline.
///
/// Formulas address bands by these names; the imagery-catalog collaborator
/// maps physical detector bands onto them (for Sentinel-2 L2A: B3, B4, B6,
/// B7, B8, B8A, B11, B12 in the listed order).
pub mod band {
    pub const GREEN: &str = "GREEN";
    /// Red edge (detector band 6)
    pub const RE2: &str = "RE2";
    /// Red edge (detector band 7)
    pub const RE3: &str = "RE3";
    pub const RED: &str = "RED";
    pub const NIR: &str = "NIR";
    /// Narrow NIR / red edge 4 (detector band 8A)
    pub const NIR2: &str = "NIR2";
    pub const SWIR1: &str = "SWIR1";
    pub const SWIR2: &str = "SWIR2";

    /// Every reflectance band the pipeline can consume
    pub const ALL: [&str; 8] = [GREEN, RED, RE2, RE3, NIR, NIR2, SWIR1, SWIR2];
}

/// An ordered set of named, grid-aligned raster bands.
///
/// All bands share one grid: identical dimensions and transform, equivalent
/// CRS. Invalid pixels are NaN. Band order is preserved, which matters for
/// stacked export products.
#[derive(Debug, Clone, Default)]
pub struct MultiBandImage {
    bands: Vec<(String, Raster<f32>)>,
}

impl MultiBandImage {
    /// Create an empty image
    pub fn new() -> Self {
        Self { bands: Vec::new() }
    }

    /// Create an image from named bands, enforcing grid agreement
    pub fn from_bands(bands: Vec<(String, Raster<f32>)>) -> Result<Self> {
        let mut image = Self::new();
        for (name, raster) in bands {
            image.push_band(name, raster)?;
        }
        Ok(image)
    }

    /// Append a band, enforcing grid agreement with the bands already present
    pub fn push_band(&mut self, name: impl Into<String>, raster: Raster<f32>) -> Result<()> {
        let name = name.into();
        if self.band(&name).is_some() {
            return Err(Error::Algorithm(format!(
                "duplicate band name '{}'",
                name
            )));
        }
        if let Some((_, first)) = self.bands.first() {
            if first.shape() != raster.shape() {
                let (er, ec) = first.shape();
                let (ar, ac) = raster.shape();
                return Err(Error::SizeMismatch { er, ec, ar, ac });
            }
            if !first.grid_matches(&raster) {
                let a = first.crs().map(|c| c.identifier()).unwrap_or_default();
                let b = raster.crs().map(|c| c.identifier()).unwrap_or_default();
                return Err(Error::CrsMismatch(a, b));
            }
        }
        self.bands.push((name, raster));
        Ok(())
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Whether the image has no bands
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Band names in order
    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Look up a band by name
    pub fn band(&self, name: &str) -> Option<&Raster<f32>> {
        self.bands
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    /// Look up a band by name, or fail with a structural error
    pub fn require_band(&self, name: &str) -> Result<&Raster<f32>> {
        self.band(name).ok_or_else(|| Error::MissingBand {
            band: name.to_string(),
            available: self.band_names().iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Iterate over (name, raster) pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Raster<f32>)> {
        self.bands.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Select a subset of bands by name, preserving the requested order
    pub fn select(&self, names: &[&str]) -> Result<MultiBandImage> {
        let mut out = MultiBandImage::new();
        for &name in names {
            out.push_band(name, self.require_band(name)?.clone())?;
        }
        Ok(out)
    }

    /// Grid dimensions as (rows, cols); (0, 0) for an empty image
    pub fn shape(&self) -> (usize, usize) {
        self.bands
            .first()
            .map(|(_, r)| r.shape())
            .unwrap_or((0, 0))
    }

    /// The first band, carrying the grid metadata shared by all bands
    pub fn template(&self) -> Option<&Raster<f32>> {
        self.bands.first().map(|(_, r)| r)
    }

    /// Whether every pixel of every band is invalid
    pub fn is_fully_invalid(&self) -> bool {
        self.bands.iter().all(|(_, r)| r.valid_count() == 0)
    }

    /// Consume the image and return its bands in order
    pub fn into_bands(self) -> Vec<(String, Raster<f32>)> {
        self.bands
    }
}

/// One satellite acquisition: reflectance bands plus the categorical
/// scene classification band and scene-level metadata.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Scene identifier from the catalog
    pub id: String,
    /// ISO-8601 acquisition timestamp
    pub datetime: String,
    /// Scene-level cloud cover percentage (0-100)
    pub cloud_cover: f64,
    /// Categorical scene classification band
    pub classification: Raster<u8>,
    /// Reflectance bands
    pub image: MultiBandImage,
}

impl Scene {
    pub fn new(
        id: impl Into<String>,
        datetime: impl Into<String>,
        cloud_cover: f64,
        classification: Raster<u8>,
        image: MultiBandImage,
    ) -> Self {
        Self {
            id: id.into(),
            datetime: datetime.into(),
            cloud_cover,
            classification,
            image,
        }
    }
}

/// An ordered sequence of scenes over one analysis period
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    scenes: Vec<Scene>,
}

impl ImageCollection {
    /// Create a collection from scenes
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self { scenes }
    }

    /// Create an empty collection
    pub fn empty() -> Self {
        Self { scenes: Vec::new() }
    }

    /// Append a scene
    pub fn push(&mut self, scene: Scene) {
        self.scenes.push(scene);
    }

    /// Number of scenes
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Whether the collection has no scenes
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Iterate over scenes in acquisition order
    pub fn iter(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter()
    }

    /// The scenes in acquisition order
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Drop scenes whose scene-level cloud cover exceeds the threshold
    pub fn filter_cloud_cover(self, max_percent: f64) -> Self {
        Self {
            scenes: self
                .scenes
                .into_iter()
                .filter(|s| s.cloud_cover < max_percent)
                .collect(),
        }
    }
}
