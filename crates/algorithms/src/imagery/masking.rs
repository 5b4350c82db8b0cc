//! Scene classification masking
//!
//! Builds per-pixel validity masks from the categorical scene
//! classification band and prepares raw scenes for compositing: band
//! selection, reflectance scaling, mask application, region clipping.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;
use embergis_core::raster::{Mask, Raster};
use embergis_core::{Error, ImageCollection, MultiBandImage, Region, Result, Scene};

/// Scene classification codes (Sentinel-2 L2A scheme, codes 0-11).
pub mod class_code {
    pub const CLOUD_SHADOW: u8 = 3;
    pub const CLOUD_LOW: u8 = 7;
    pub const CLOUD_MEDIUM: u8 = 8;
    pub const CLOUD_HIGH: u8 = 9;
    pub const THIN_CIRRUS: u8 = 10;
    /// Highest code in the classification scheme
    pub const MAX: u8 = 11;
}

/// Digital numbers divide by this to become [0,1] reflectance.
///
/// Applied exactly once, during scene preparation; every index formula
/// downstream assumes already-scaled inputs.
pub const REFLECTANCE_SCALE: f32 = 10_000.0;

/// Which classification codes invalidate a pixel.
///
/// One shared value configures every mask the pipeline builds. Call sites
/// re-deriving "cloudy" independently drift apart as soon as the
/// classification scheme changes, so nothing outside this config may
/// enumerate codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskConfig {
    /// Codes treated as unusable
    pub invalid_codes: Vec<u8>,
    /// Highest code of the classification scheme in use
    pub max_code: u8,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            invalid_codes: vec![
                class_code::CLOUD_SHADOW,
                class_code::CLOUD_LOW,
                class_code::CLOUD_MEDIUM,
                class_code::CLOUD_HIGH,
                class_code::THIN_CIRRUS,
            ],
            max_code: class_code::MAX,
        }
    }
}

impl MaskConfig {
    /// Whether a classification code marks a pixel unusable
    pub fn is_invalid(&self, code: u8) -> bool {
        self.invalid_codes.contains(&code)
    }

    /// Check the config is self-consistent with its declared scheme
    pub fn validate(&self) -> Result<()> {
        for &code in &self.invalid_codes {
            if code > self.max_code {
                return Err(Error::InvalidParameter {
                    name: "invalid_codes",
                    value: code.to_string(),
                    reason: format!("exceeds scheme maximum {}", self.max_code),
                });
            }
        }
        Ok(())
    }
}

/// Derive a validity mask from a scene classification band.
///
/// A pixel is valid iff its code is absent from the configured
/// invalid-code set. Any code outside the configured scheme fails fast:
/// it means the catalog delivered a different classification schema than
/// the one the invalid-code set was written against, and masking with it
/// would silently corrupt every downstream stage.
pub fn scene_mask(classification: &Raster<u8>, config: &MaskConfig) -> Result<Mask> {
    config.validate()?;

    let (rows, cols) = classification.shape();
    let mut data = Array2::from_elem((rows, cols), true);

    for row in 0..rows {
        for col in 0..cols {
            let code = unsafe { classification.get_unchecked(row, col) };
            if code > config.max_code {
                return Err(Error::MaskSchemaMismatch {
                    code,
                    max_code: config.max_code,
                });
            }
            data[(row, col)] = !config.is_invalid(code);
        }
    }

    Ok(Mask::from_array(data))
}

/// Derive a validity mask from the area of interest: pixels whose centers
/// fall outside the region are invalid.
pub fn region_mask(template: &Raster<f32>, region: &Region) -> Mask {
    let (rows, cols) = template.shape();
    let mut data = Array2::from_elem((rows, cols), false);

    for row in 0..rows {
        for col in 0..cols {
            let (x, y) = template.pixel_to_geo(col, row);
            data[(row, col)] = region.contains(x, y);
        }
    }

    Mask::from_array(data)
}

/// Apply a mask to every band of an image: masked-out pixels become NaN.
///
/// Already-invalid (NaN) pixels stay invalid regardless of the mask, so
/// masking is idempotent and masks compose.
pub fn apply_mask(image: &MultiBandImage, mask: &Mask) -> Result<MultiBandImage> {
    let (rows, cols) = image.shape();
    if mask.shape() != (rows, cols) {
        let (ar, ac) = mask.shape();
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar,
            ac,
        });
    }

    let mut out = MultiBandImage::new();
    for (name, raster) in image.iter() {
        let data: Vec<f32> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                let mut row_data = vec![f32::NAN; cols];
                for col in 0..cols {
                    if unsafe { mask.is_valid_unchecked(row, col) } {
                        row_data[col] = unsafe { raster.get_unchecked(row, col) };
                    }
                }
                row_data
            })
            .collect();

        let mut band = raster.with_same_meta::<f32>(rows, cols);
        band.set_nodata(Some(f32::NAN));
        *band.data_mut() = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        out.push_band(name, band)?;
    }

    Ok(out)
}

/// Clip an image to the area of interest
pub fn clip_to_region(image: &MultiBandImage, region: &Region) -> Result<MultiBandImage> {
    match image.template() {
        Some(template) => apply_mask(image, &region_mask(template, region)),
        None => Ok(MultiBandImage::new()),
    }
}

/// Prepare one scene for compositing: select the requested reflectance
/// bands, scale digital numbers to [0,1] reflectance, and apply the
/// classification mask.
pub fn prepare_scene(scene: &Scene, config: &MaskConfig, bands: &[&str]) -> Result<Scene> {
    let mask = scene_mask(&scene.classification, config)?;

    let selected = scene.image.select(bands)?;
    let mut scaled = MultiBandImage::new();
    for (name, raster) in selected.iter() {
        let mut band = raster.clone();
        band.data_mut().mapv_inplace(|v| v / REFLECTANCE_SCALE);
        band.set_nodata(Some(f32::NAN));
        scaled.push_band(name, band)?;
    }

    Ok(Scene::new(
        scene.id.clone(),
        scene.datetime.clone(),
        scene.cloud_cover,
        scene.classification.clone(),
        apply_mask(&scaled, &mask)?,
    ))
}

/// Prepare every scene of a collection with one shared mask policy.
///
/// A schema mismatch in any scene aborts the whole preparation before any
/// composite work starts.
pub fn prepare_collection(
    collection: &ImageCollection,
    config: &MaskConfig,
    bands: &[&str],
) -> Result<ImageCollection> {
    let mut prepared = ImageCollection::empty();
    for scene in collection.iter() {
        prepared.push(prepare_scene(scene, config, bands)?);
    }
    Ok(prepared)
}
