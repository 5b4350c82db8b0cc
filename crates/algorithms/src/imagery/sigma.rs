//! Sigma estimation for kNDVI
//!
//! Estimates the kernel scale parameter from a reflectance-scaled
//! collection: per image the per-pixel |NIR - RED|, then the mean across
//! the time dimension per pixel, then the mean over the area of interest
//! to one scalar. The temporal-then-spatial order is part of the
//! statistic's definition; the spatial-first alternative is a different
//! number and must not be substituted. kNDVI evaluation for a period
//! cannot start until this scalar exists.

use ndarray::Array2;

use embergis_core::{band, Error, ImageCollection, Result};

/// Estimate the kNDVI sigma scalar for one analysis period.
///
/// Errors structurally when the collection is empty or no pixel has a
/// valid |NIR - RED| observation in any image.
pub fn estimate_sigma(collection: &ImageCollection) -> Result<f64> {
    if collection.is_empty() {
        return Err(Error::EmptyCollection(
            "sigma estimate over empty collection".to_string(),
        ));
    }

    let first = collection.scenes()[0].image.require_band(band::NIR)?;
    let (rows, cols) = first.shape();

    // Temporal reduction first: running sum and count of |NIR - RED|
    // per pixel across the collection
    let mut sum = Array2::<f64>::zeros((rows, cols));
    let mut count = Array2::<u32>::zeros((rows, cols));

    for scene in collection.iter() {
        let nir = scene.image.require_band(band::NIR)?;
        let red = scene.image.require_band(band::RED)?;

        if nir.shape() != (rows, cols) || red.shape() != (rows, cols) {
            let (ar, ac) = nir.shape();
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar,
                ac,
            });
        }

        for row in 0..rows {
            for col in 0..cols {
                let n = unsafe { nir.get_unchecked(row, col) };
                let r = unsafe { red.get_unchecked(row, col) };
                if n.is_nan() || r.is_nan() {
                    continue;
                }
                sum[(row, col)] += (n as f64 - r as f64).abs();
                count[(row, col)] += 1;
            }
        }
    }

    // Then the spatial reduction of the temporal means to one scalar
    let mut total = 0.0;
    let mut pixels = 0usize;
    for row in 0..rows {
        for col in 0..cols {
            let c = count[(row, col)];
            if c > 0 {
                total += sum[(row, col)] / c as f64;
                pixels += 1;
            }
        }
    }

    if pixels == 0 {
        return Err(Error::EmptyCollection(
            "no valid pixels for sigma estimate".to_string(),
        ));
    }

    Ok(total / pixels as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use embergis_core::{MultiBandImage, Raster, Scene};

    fn scene(nir: Vec<f32>, red: Vec<f32>, rows: usize, cols: usize) -> Scene {
        let mut image = MultiBandImage::new();
        let mut nir_r = Raster::from_vec(nir, rows, cols).unwrap();
        nir_r.set_nodata(Some(f32::NAN));
        let mut red_r = Raster::from_vec(red, rows, cols).unwrap();
        red_r.set_nodata(Some(f32::NAN));
        image.push_band(band::NIR, nir_r).unwrap();
        image.push_band(band::RED, red_r).unwrap();
        Scene::new("s", "2024-01-15T10:56:21Z", 5.0, Raster::new(rows, cols), image)
    }

    #[test]
    fn test_single_pixel_two_images() {
        // |NIR - RED| per image: 0.4 and 0.6; temporal mean 0.5; the
        // spatial mean of one pixel is that same 0.5
        let collection = ImageCollection::new(vec![
            scene(vec![0.5], vec![0.1], 1, 1),
            scene(vec![0.7], vec![0.1], 1, 1),
        ]);

        let sigma = estimate_sigma(&collection).unwrap();
        assert_relative_eq!(sigma, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_temporal_then_spatial_order_is_load_bearing() {
        // Two pixels, two images; pixel 1 is masked in image 1, so the
        // two aggregation orders disagree:
        //   temporal means: px0 = (0.2 + 0.4) / 2 = 0.3, px1 = 0.8
        //   spatial of temporal = (0.3 + 0.8) / 2 = 0.55
        //   spatial means per image: 0.2 and (0.4 + 0.8) / 2 = 0.6
        //   temporal of spatial = 0.4
        let collection = ImageCollection::new(vec![
            scene(vec![0.3, f32::NAN], vec![0.1, 0.1], 1, 2),
            scene(vec![0.5, 0.9], vec![0.1, 0.1], 1, 2),
        ]);

        let sigma = estimate_sigma(&collection).unwrap();
        assert_relative_eq!(sigma, 0.55, epsilon = 1e-6);

        // The spatial-first statistic, computed by hand above
        let spatial_first = (0.2 + 0.6) / 2.0;
        assert!((sigma - spatial_first).abs() > 0.1);
    }

    #[test]
    fn test_masked_observations_are_excluded() {
        let collection = ImageCollection::new(vec![
            scene(vec![f32::NAN], vec![0.1], 1, 1),
            scene(vec![0.7], vec![0.1], 1, 1),
        ]);

        let sigma = estimate_sigma(&collection).unwrap();
        assert_relative_eq!(sigma, 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_collection_errors() {
        let err = estimate_sigma(&ImageCollection::empty()).unwrap_err();
        assert!(matches!(err, Error::EmptyCollection(_)));
    }

    #[test]
    fn test_all_masked_errors() {
        let collection =
            ImageCollection::new(vec![scene(vec![f32::NAN], vec![0.1], 1, 1)]);
        let err = estimate_sigma(&collection).unwrap_err();
        assert!(matches!(err, Error::EmptyCollection(_)));
    }
}
