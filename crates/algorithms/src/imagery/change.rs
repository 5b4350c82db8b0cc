//! Pre/post change metrics
//!
//! Deltas and relativized ratios between same-named indices evaluated on
//! two composites. The sign convention follows disturbance analysis:
//! vegetation-sensitive indices drop after a burn, so deltas are
//! pre minus post and a positive delta indicates loss.

use ndarray::Array2;

use crate::maybe_rayon::*;
use embergis_core::raster::Raster;
use embergis_core::{Error, Result};

/// dIndex = pre - post. NaN in either input invalidates the pixel.
pub fn index_delta(pre: &Raster<f32>, post: &Raster<f32>) -> Result<Raster<f32>> {
    binary_metric(pre, post, |pre, post| pre - post)
}

/// RBR = dNBR / (NBR_pre + 1.001).
///
/// The 1.001 offset keeps the denominator away from the singularity at
/// NBR_pre = -1, the theoretical minimum of a normalized difference, so
/// the denominator is strictly positive over the whole valid range and
/// never invalidates a pixel.
pub fn relativized_burn_ratio(dnbr: &Raster<f32>, nbr_pre: &Raster<f32>) -> Result<Raster<f32>> {
    binary_metric(dnbr, nbr_pre, |d, pre| d / (pre + 1.001))
}

/// RdNBR = dNBR / sqrt(|NBR_pre|).
///
/// The absolute value is taken before the square root; a signed square
/// root is a different (and wrong) statistic. The pixel is invalid
/// exactly when NBR_pre == 0, the one zero of the denominator.
pub fn relative_dnbr(dnbr: &Raster<f32>, nbr_pre: &Raster<f32>) -> Result<Raster<f32>> {
    binary_metric(dnbr, nbr_pre, |d, pre| {
        if pre == 0.0 {
            f64::NAN
        } else {
            d / pre.abs().sqrt()
        }
    })
}

/// Shared two-raster pixel loop for change metrics
fn binary_metric<F>(a: &Raster<f32>, b: &Raster<f32>, f: F) -> Result<Raster<f32>>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }

    let (rows, cols) = a.shape();

    let data: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f32::NAN; cols];
            for col in 0..cols {
                let va = unsafe { a.get_unchecked(row, col) };
                let vb = unsafe { b.get_unchecked(row, col) };

                if va.is_nan() || vb.is_nan() {
                    continue;
                }

                row_data[col] = f(va as f64, vb as f64) as f32;
            }
            row_data
        })
        .collect();

    let mut output = a.with_same_meta::<f32>(rows, cols);
    output.set_nodata(Some(f32::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
