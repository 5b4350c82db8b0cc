//! Temporal compositing
//!
//! Reduces a masked image collection into one robust multi-band composite
//! per analysis period. Median is the reduction: it resists residual cloud
//! and shadow values that survive classification masking.

use ndarray::Array2;

use crate::maybe_rayon::*;
use embergis_core::raster::Raster;
use embergis_core::{Error, ImageCollection, MultiBandImage, Result};

/// Median across valid contributions, per band, per pixel.
///
/// A composite pixel is invalid (NaN) exactly when zero images contribute
/// a valid value there. Only the requested bands are reduced.
///
/// A collection with zero scenes is a structural error: there is no grid
/// to allocate. An all-masked but non-empty collection composites to an
/// all-invalid image instead; [`ensure_valid`] surfaces that case before
/// index computation.
pub fn median_composite(
    collection: &ImageCollection,
    bands: &[&str],
) -> Result<MultiBandImage> {
    if collection.is_empty() {
        return Err(Error::EmptyCollection(
            "no scenes to composite".to_string(),
        ));
    }
    if bands.is_empty() {
        return Err(Error::Algorithm("no bands requested".to_string()));
    }

    let template = collection.scenes()[0].image.require_band(bands[0])?;
    let (rows, cols) = template.shape();

    let mut composite = MultiBandImage::new();
    for &name in bands {
        // One column of rasters across time for this band
        let mut stack: Vec<&Raster<f32>> = Vec::with_capacity(collection.len());
        for scene in collection.iter() {
            let raster = scene.image.require_band(name)?;
            if raster.shape() != (rows, cols) {
                let (ar, ac) = raster.shape();
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar,
                    ac,
                });
            }
            stack.push(raster);
        }

        let data: Vec<f32> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                let mut row_data = vec![f32::NAN; cols];
                let mut values: Vec<f32> = Vec::with_capacity(stack.len());
                for (col, out) in row_data.iter_mut().enumerate() {
                    values.clear();
                    for raster in &stack {
                        let v = unsafe { raster.get_unchecked(row, col) };
                        if !v.is_nan() {
                            values.push(v);
                        }
                    }
                    if !values.is_empty() {
                        *out = median(&mut values);
                    }
                }
                row_data
            })
            .collect();

        let mut band = template.with_same_meta::<f32>(rows, cols);
        band.set_nodata(Some(f32::NAN));
        *band.data_mut() = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        composite.push_band(name, band)?;
    }

    Ok(composite)
}

/// Median of a non-empty slice; averages the middle pair for even counts
fn median(values: &mut [f32]) -> f32 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}

/// Surface an all-invalid composite as an explicit empty-result condition.
///
/// Downstream stages must not attempt index arithmetic on a composite with
/// no valid pixels; every pipeline calls this between compositing and
/// index evaluation.
pub fn ensure_valid(composite: &MultiBandImage, context: &str) -> Result<()> {
    if composite.is_empty() || composite.is_fully_invalid() {
        return Err(Error::EmptyCollection(format!(
            "composite for '{}' has no valid pixels",
            context
        )));
    }
    Ok(())
}
