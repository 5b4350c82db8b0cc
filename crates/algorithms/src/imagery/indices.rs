//! Spectral index registry
//!
//! Every index formula the pipeline evaluates lives in this one table,
//! addressed by name. Single-period suites and pre/post change products
//! both resolve formulas here, so no product can drift from another.
//!
//! All formulas assume reflectance already scaled to [0,1] (done once, at
//! scene preparation). Per-pixel arithmetic runs in f64; outputs are
//! stored single-precision. Division by (near-)zero and negative square
//! root arguments invalidate that pixel only, never the computation.

use ndarray::Array2;

use crate::maybe_rayon::*;
use embergis_core::raster::Raster;
use embergis_core::{band, Error, MultiBandImage, Result};

/// Denominators closer to zero than this mark the pixel invalid
const DIV_EPS: f64 = 1e-10;

/// Stabilizing constant in the VARI denominator
const VARI_EPS: f64 = 1e-4;

/// The registered spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralIndex {
    /// Normalized Burn Ratio: (NIR - SWIR2) / (NIR + SWIR2)
    Nbr,
    /// Normalized Burn Ratio 2: (NIR2 - SWIR2) / (NIR2 + SWIR2)
    Nbr2,
    /// Normalized Difference Vegetation Index: (NIR - RED) / (NIR + RED)
    Ndvi,
    /// Normalized Difference Water Index: (NIR - SWIR1) / (NIR + SWIR1)
    Ndwi,
    /// Visible Atmospherically Resistant Index: (GREEN - RED) / (GREEN + RED + eps)
    Vari,
    /// Modified Soil Adjusted Vegetation Index
    Msavi,
    /// Burned Area Index for Sentinel-2
    Bais2,
    /// Mid-Infrared Burn Index: 10 + SWIR2 + 9.8 * SWIR1
    Mirbi,
    /// Char Soil Index: NIR / SWIR1
    Csi,
    /// Kernel NDVI: tanh((NIR - RED)^2 / (2 * sigma^2))
    Kndvi,
}

/// Evaluation parameters shared by the registry
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexParams {
    /// Per-period sigma scalar for kNDVI, from the sigma estimator.
    /// Required before kNDVI can be evaluated.
    pub kndvi_sigma: Option<f64>,
}

impl SpectralIndex {
    /// Every registered index, in suite order
    pub const ALL: [SpectralIndex; 10] = [
        SpectralIndex::Nbr,
        SpectralIndex::Nbr2,
        SpectralIndex::Ndvi,
        SpectralIndex::Ndwi,
        SpectralIndex::Vari,
        SpectralIndex::Msavi,
        SpectralIndex::Bais2,
        SpectralIndex::Mirbi,
        SpectralIndex::Csi,
        SpectralIndex::Kndvi,
    ];

    /// The index's product name
    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::Nbr => "NBR",
            SpectralIndex::Nbr2 => "NBR2",
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Ndwi => "NDWI",
            SpectralIndex::Vari => "VARI",
            SpectralIndex::Msavi => "MSAVI",
            SpectralIndex::Bais2 => "BAIS2",
            SpectralIndex::Mirbi => "MIRBI",
            SpectralIndex::Csi => "CSI",
            SpectralIndex::Kndvi => "kNDVI",
        }
    }

    /// Look up an index by product name
    pub fn from_name(name: &str) -> Option<SpectralIndex> {
        Self::ALL
            .into_iter()
            .find(|idx| idx.name().eq_ignore_ascii_case(name))
    }

    /// The logical bands the formula reads, in evaluation order
    pub fn required_bands(&self) -> &'static [&'static str] {
        match self {
            SpectralIndex::Nbr => &[band::NIR, band::SWIR2],
            SpectralIndex::Nbr2 => &[band::NIR2, band::SWIR2],
            SpectralIndex::Ndvi => &[band::NIR, band::RED],
            SpectralIndex::Ndwi => &[band::NIR, band::SWIR1],
            SpectralIndex::Vari => &[band::GREEN, band::RED],
            SpectralIndex::Msavi => &[band::NIR, band::RED],
            SpectralIndex::Bais2 => {
                &[band::RED, band::RE2, band::RE3, band::NIR2, band::SWIR2]
            }
            SpectralIndex::Mirbi => &[band::SWIR1, band::SWIR2],
            SpectralIndex::Csi => &[band::NIR, band::SWIR1],
            SpectralIndex::Kndvi => &[band::NIR, band::RED],
        }
    }

    /// Evaluate the formula at one pixel. `v` holds the band values in
    /// `required_bands` order; any NaN among them has already invalidated
    /// the pixel before this is called.
    fn eval(&self, v: &[f64], params: &IndexParams) -> f64 {
        match self {
            SpectralIndex::Nbr
            | SpectralIndex::Nbr2
            | SpectralIndex::Ndvi
            | SpectralIndex::Ndwi => normalized_difference(v[0], v[1]),
            SpectralIndex::Vari => {
                let (g, r) = (v[0], v[1]);
                safe_div(g - r, g + r + VARI_EPS)
            }
            SpectralIndex::Msavi => {
                let (n, r) = (v[0], v[1]);
                let s = 2.0 * n + 1.0;
                // s*s - 8*(n - r) == (2n-1)^2 + 8r, non-negative for
                // reflectance inputs; the clamp absorbs float rounding
                let arg = (s * s - 8.0 * (n - r)).max(0.0);
                (s - arg.sqrt()) / 2.0
            }
            SpectralIndex::Bais2 => {
                let (red, re2, re3, nir2, swir2) = (v[0], v[1], v[2], v[3], v[4]);
                let ratio = safe_sqrt(safe_div(re2 * re3 * nir2, red));
                let slope = safe_div(swir2 - nir2, safe_sqrt(swir2 + nir2));
                (1.0 - ratio) * (slope + 1.0)
            }
            SpectralIndex::Mirbi => {
                let (swir1, swir2) = (v[0], v[1]);
                10.0 + swir2 + 9.8 * swir1
            }
            SpectralIndex::Csi => safe_div(v[0], v[1]),
            SpectralIndex::Kndvi => {
                // compute_index refuses to run without the sigma barrier,
                // so the parameter is present here
                let sigma = params.kndvi_sigma.unwrap_or(f64::NAN);
                let d = v[0] - v[1];
                safe_div(d * d, 2.0 * sigma * sigma).tanh()
            }
        }
    }
}

/// (a - b) / (a + b), invalid when the denominator vanishes.
///
/// Bounded to [-1, 1] whenever both operands are non-negative; that bound
/// is a tested property, not something the arithmetic here relies on.
fn normalized_difference(a: f64, b: f64) -> f64 {
    safe_div(a - b, a + b)
}

fn safe_div(num: f64, den: f64) -> f64 {
    if den.abs() < DIV_EPS {
        f64::NAN
    } else {
        num / den
    }
}

fn safe_sqrt(v: f64) -> f64 {
    if v < 0.0 {
        f64::NAN
    } else {
        v.sqrt()
    }
}

/// Evaluate one registered index against a composite's bands.
///
/// Errors structurally if a required band is missing or kNDVI is requested
/// without its sigma parameter; numeric edge cases stay per-pixel NaN.
pub fn compute_index(
    image: &MultiBandImage,
    index: SpectralIndex,
    params: &IndexParams,
) -> Result<Raster<f32>> {
    if index == SpectralIndex::Kndvi && params.kndvi_sigma.is_none() {
        return Err(Error::InvalidParameter {
            name: "kndvi_sigma",
            value: "None".to_string(),
            reason: "kNDVI needs the period's sigma estimate".to_string(),
        });
    }

    let rasters: Vec<&Raster<f32>> = index
        .required_bands()
        .iter()
        .map(|name| image.require_band(name))
        .collect::<Result<_>>()?;

    let template = rasters[0];
    let (rows, cols) = template.shape();
    let n_bands = rasters.len();

    let data: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f32::NAN; cols];
            let mut values = vec![0.0f64; n_bands];
            'pixel: for (col, out) in row_data.iter_mut().enumerate() {
                for (slot, raster) in values.iter_mut().zip(&rasters) {
                    let v = unsafe { raster.get_unchecked(row, col) };
                    if v.is_nan() {
                        continue 'pixel;
                    }
                    *slot = v as f64;
                }
                *out = index.eval(&values, params) as f32;
            }
            row_data
        })
        .collect();

    let mut output = template.with_same_meta::<f32>(rows, cols);
    output.set_nodata(Some(f32::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Evaluate the whole registry against one composite, in suite order
pub fn compute_suite(
    image: &MultiBandImage,
    params: &IndexParams,
) -> Result<Vec<(String, Raster<f32>)>> {
    let mut suite = Vec::with_capacity(SpectralIndex::ALL.len());
    for index in SpectralIndex::ALL {
        suite.push((index.name().to_string(), compute_index(image, index, params)?));
    }
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn image(bands: &[(&'static str, Vec<f32>)], rows: usize, cols: usize) -> MultiBandImage {
        let mut image = MultiBandImage::new();
        for (name, data) in bands {
            let mut raster = Raster::from_vec(data.clone(), rows, cols).unwrap();
            raster.set_nodata(Some(f32::NAN));
            image.push_band(*name, raster).unwrap();
        }
        image
    }

    fn single_pixel(bands: &[(&'static str, f32)]) -> MultiBandImage {
        image(
            &bands
                .iter()
                .map(|(n, v)| (*n, vec![*v]))
                .collect::<Vec<_>>(),
            1,
            1,
        )
    }

    #[test]
    fn test_registry_names_round_trip() {
        for index in SpectralIndex::ALL {
            assert_eq!(SpectralIndex::from_name(index.name()), Some(index));
        }
        assert_eq!(SpectralIndex::from_name("nbr"), Some(SpectralIndex::Nbr));
        assert_eq!(SpectralIndex::from_name("no-such-index"), None);
    }

    #[test]
    fn test_ndvi_value() {
        let img = single_pixel(&[(band::NIR, 0.5), (band::RED, 0.1)]);
        let ndvi = compute_index(&img, SpectralIndex::Ndvi, &IndexParams::default()).unwrap();

        let expected = (0.5 - 0.1) / (0.5 + 0.1);
        assert_relative_eq!(ndvi.get(0, 0).unwrap() as f64, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_normalized_difference_bounded_on_unit_reflectance() {
        // Gradients across [0,1] on both operands
        let n = 64;
        let a: Vec<f32> = (0..n).map(|i| i as f32 / (n - 1) as f32).collect();
        let b: Vec<f32> = (0..n).map(|i| 1.0 - i as f32 / (n - 1) as f32).collect();

        for index in [
            SpectralIndex::Nbr,
            SpectralIndex::Nbr2,
            SpectralIndex::Ndvi,
            SpectralIndex::Ndwi,
        ] {
            let bands = index.required_bands();
            let img = image(&[(bands[0], a.clone()), (bands[1], b.clone())], 1, n);
            let result = compute_index(&img, index, &IndexParams::default()).unwrap();

            for col in 0..n {
                let v = result.get(0, col).unwrap();
                if !v.is_nan() {
                    assert!(
                        (-1.0..=1.0).contains(&v),
                        "{} out of range: {} at col {}",
                        index.name(),
                        v,
                        col
                    );
                }
            }
        }
    }

    #[test]
    fn test_vari_epsilon_stabilizes_zero_bands() {
        let img = single_pixel(&[(band::GREEN, 0.0), (band::RED, 0.0)]);
        let vari = compute_index(&img, SpectralIndex::Vari, &IndexParams::default()).unwrap();
        let v = vari.get(0, 0).unwrap();
        assert!(v.is_finite());
        assert_relative_eq!(v as f64, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_msavi_sqrt_argument_clamped() {
        // (2n-1)^2 + 8r hits exactly zero at n = 0.5, r = 0
        let img = single_pixel(&[(band::NIR, 0.5), (band::RED, 0.0)]);
        let msavi = compute_index(&img, SpectralIndex::Msavi, &IndexParams::default()).unwrap();
        assert_relative_eq!(msavi.get(0, 0).unwrap() as f64, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_msavi_known_value() {
        let img = single_pixel(&[(band::NIR, 0.5), (band::RED, 0.1)]);
        let msavi = compute_index(&img, SpectralIndex::Msavi, &IndexParams::default()).unwrap();

        let s: f64 = 2.0 * 0.5 + 1.0;
        let expected = (s - (s * s - 8.0 * (0.5 - 0.1)).sqrt()) / 2.0;
        assert_relative_eq!(msavi.get(0, 0).unwrap() as f64, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_bais2_worked_example() {
        let img = single_pixel(&[
            (band::RED, 0.10),
            (band::RE2, 0.20),
            (band::RE3, 0.20),
            (band::NIR2, 0.15),
            (band::SWIR2, 0.30),
        ]);
        let bais2 = compute_index(&img, SpectralIndex::Bais2, &IndexParams::default()).unwrap();

        let ratio = (0.20f64 * 0.20 * 0.15 / 0.10).sqrt();
        let slope = (0.30 - 0.15) / (0.30f64 + 0.15).sqrt();
        let expected = (1.0 - ratio) * (slope + 1.0);
        assert_relative_eq!(bais2.get(0, 0).unwrap() as f64, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_bais2_zero_red_is_invalid_pixel() {
        let img = single_pixel(&[
            (band::RED, 0.0),
            (band::RE2, 0.20),
            (band::RE3, 0.20),
            (band::NIR2, 0.15),
            (band::SWIR2, 0.30),
        ]);
        let bais2 = compute_index(&img, SpectralIndex::Bais2, &IndexParams::default()).unwrap();
        assert!(bais2.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_mirbi_linear() {
        let img = single_pixel(&[(band::SWIR1, 0.2), (band::SWIR2, 0.3)]);
        let mirbi = compute_index(&img, SpectralIndex::Mirbi, &IndexParams::default()).unwrap();
        assert_relative_eq!(
            mirbi.get(0, 0).unwrap() as f64,
            10.0 + 0.3 + 9.8 * 0.2,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_csi_zero_denominator_is_invalid_pixel() {
        let img = single_pixel(&[(band::NIR, 0.4), (band::SWIR1, 0.0)]);
        let csi = compute_index(&img, SpectralIndex::Csi, &IndexParams::default()).unwrap();
        assert!(csi.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_singularity_is_per_pixel_not_structural() {
        let img = image(
            &[
                (band::NIR, vec![0.4, 0.4]),
                (band::SWIR1, vec![0.0, 0.2]),
            ],
            1,
            2,
        );
        let csi = compute_index(&img, SpectralIndex::Csi, &IndexParams::default()).unwrap();
        assert!(csi.get(0, 0).unwrap().is_nan());
        assert_relative_eq!(csi.get(0, 1).unwrap() as f64, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_kndvi_requires_sigma() {
        let img = single_pixel(&[(band::NIR, 0.6), (band::RED, 0.1)]);
        let err = compute_index(&img, SpectralIndex::Kndvi, &IndexParams::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "kndvi_sigma", .. }));
    }

    #[test]
    fn test_kndvi_value() {
        let img = single_pixel(&[(band::NIR, 0.6), (band::RED, 0.1)]);
        let params = IndexParams {
            kndvi_sigma: Some(0.5),
        };
        let kndvi = compute_index(&img, SpectralIndex::Kndvi, &params).unwrap();

        let expected = (0.5f64 * 0.5 / (2.0 * 0.25)).tanh();
        assert_relative_eq!(kndvi.get(0, 0).unwrap() as f64, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_masked_input_stays_masked() {
        let img = single_pixel(&[(band::NIR, f32::NAN), (band::RED, 0.1)]);
        let ndvi = compute_index(&img, SpectralIndex::Ndvi, &IndexParams::default()).unwrap();
        assert!(ndvi.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_missing_band_is_structural() {
        let img = single_pixel(&[(band::NIR, 0.5)]);
        let err = compute_index(&img, SpectralIndex::Ndvi, &IndexParams::default()).unwrap_err();
        assert!(matches!(err, Error::MissingBand { .. }));
    }

    #[test]
    fn test_suite_covers_registry_in_order() {
        let img = single_pixel(&[
            (band::GREEN, 0.12),
            (band::RED, 0.10),
            (band::RE2, 0.20),
            (band::RE3, 0.20),
            (band::NIR, 0.50),
            (band::NIR2, 0.15),
            (band::SWIR1, 0.20),
            (band::SWIR2, 0.30),
        ]);
        let params = IndexParams {
            kndvi_sigma: Some(0.4),
        };
        let suite = compute_suite(&img, &params).unwrap();

        let names: Vec<&str> = suite.iter().map(|(n, _)| n.as_str()).collect();
        let expected: Vec<&str> = SpectralIndex::ALL.iter().map(|i| i.name()).collect();
        assert_eq!(names, expected);
    }
}
