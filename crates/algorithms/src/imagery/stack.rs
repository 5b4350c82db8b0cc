//! Band stacking and the export hand-off
//!
//! Assembles named bands into one ordered, type-normalized multi-band
//! image and pairs it with the descriptive metadata the external export
//! service needs. Purely assembles; performs no I/O.

use serde::{Deserialize, Serialize};

use embergis_core::raster::{Raster, RasterElement};
use embergis_core::{Error, MultiBandImage, Region, Result, CRS};

/// Output raster format understood by the export collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RasterFormat {
    #[default]
    GeoTiff,
}

/// Everything the export collaborator needs besides the pixels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Human-readable product description, also the default file name
    pub description: String,
    /// Destination folder at the export service
    pub folder: String,
    /// Explicit file name; defaults to the description when absent
    pub file_name: Option<String>,
    /// Output resolution in ground units
    pub scale: f64,
    /// Output coordinate reference system
    pub crs: CRS,
    /// Export region
    pub region: Region,
    /// Output raster format
    pub format: RasterFormat,
    /// Upper bound on output pixels the service will accept
    pub max_pixels: u64,
}

/// Concatenate named bands, in order, into one multi-band image with
/// every band cast to single precision.
///
/// All bands must share one grid; order is preserved exactly as given.
pub fn stack<T: RasterElement>(bands: Vec<(String, Raster<T>)>) -> Result<MultiBandImage> {
    if bands.is_empty() {
        return Err(Error::Algorithm("no bands to stack".to_string()));
    }

    let mut out = MultiBandImage::new();
    for (name, raster) in bands {
        out.push_band(name, raster.cast::<f32>())?;
    }
    Ok(out)
}

/// The external persistence collaborator.
///
/// The core's only obligation is a correctly stacked, correctly typed
/// image and matching metadata; retries and storage details live behind
/// this trait.
pub trait ExportSink {
    fn export(&mut self, image: &MultiBandImage, request: &ExportRequest) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named<T: RasterElement>(name: &str, raster: Raster<T>) -> (String, Raster<T>) {
        (name.to_string(), raster)
    }

    #[test]
    fn test_stack_preserves_order() {
        let stacked = stack(vec![
            named("dNBR", Raster::<f32>::filled(2, 2, 0.3)),
            named("dBAIS2", Raster::<f32>::filled(2, 2, 0.1)),
            named("RBR", Raster::<f32>::filled(2, 2, 0.2)),
            named("RdNBR", Raster::<f32>::filled(2, 2, 0.4)),
        ])
        .unwrap();

        assert_eq!(stacked.band_names(), vec!["dNBR", "dBAIS2", "RBR", "RdNBR"]);
    }

    #[test]
    fn test_stack_casts_to_single_precision() {
        let mut band = Raster::<f64>::filled(1, 2, 0.25);
        band.set_nodata(Some(f64::NAN));
        band.set(0, 1, f64::NAN).unwrap();

        let stacked = stack(vec![named("NBR", band)]).unwrap();
        let out = stacked.band("NBR").unwrap();

        assert_eq!(out.get(0, 0).unwrap(), 0.25f32);
        assert!(out.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn test_stack_rejects_grid_mismatch() {
        let result = stack(vec![
            named("NBR", Raster::<f32>::filled(2, 2, 0.3)),
            named("NDVI", Raster::<f32>::filled(2, 3, 0.1)),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_stack_rejects_empty_input() {
        let result = stack(Vec::<(String, Raster<f32>)>::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_export_request_round_trips_through_serde() {
        let request = ExportRequest {
            description: "burn_severity_2024".to_string(),
            folder: "burn_products".to_string(),
            file_name: None,
            scale: 10.0,
            crs: CRS::wgs84(),
            region: Region::new(-3.95, 40.22, -2.84, 41.21),
            format: RasterFormat::GeoTiff,
            max_pixels: 10_u64.pow(13),
        };

        let json = serde_json::to_string(&request).unwrap();
        let back: ExportRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.description, request.description);
        assert_eq!(back.scale, request.scale);
        assert_eq!(back.crs, request.crs);
        assert_eq!(back.max_pixels, request.max_pixels);
    }
}
