//! Stream network extraction
//!
//! Turns a D8 flow direction raster and a flow accumulation raster into
//! a vector stream network: cells at or above an accumulation threshold
//! form the stream grid, Strahler orders are assigned over it, and
//! junction-to-junction runs of cells become LineString segments.

mod stream_raster;
mod strahler;
mod vectorize;

pub use stream_raster::stream_raster;
pub use strahler::strahler_order;
pub use vectorize::vectorize_streams;

use hydrotrace_core::raster::Raster;
use hydrotrace_core::vector::StreamNetwork;
use hydrotrace_core::{Algorithm, Error, Result};

/// Tolerance for comparing geotransform coefficients of paired inputs
const TRANSFORM_EPSILON: f64 = 1e-9;

/// Counters from the extraction stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Cells at or above the accumulation threshold
    pub stream_cells: usize,
    /// Isolated single-cell channels dropped during vectorization
    pub degenerate_dropped: usize,
}

/// Verify that two input rasters describe the same grid.
///
/// Flow direction and flow accumulation must come from the same DEM:
/// same shape, same geotransform (within a small tolerance) and, when
/// both carry one, an equivalent CRS. A missing CRS on either side is
/// accepted.
pub fn check_alignment(flow_dir: &Raster<u8>, flow_acc: &Raster<f64>) -> Result<()> {
    let (er, ec) = flow_dir.shape();
    let (ar, ac) = flow_acc.shape();
    if (er, ec) != (ar, ac) {
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }

    if !flow_dir
        .transform()
        .approx_eq(flow_acc.transform(), TRANSFORM_EPSILON)
    {
        return Err(Error::TransformMismatch(
            format!("{:?}", flow_dir.transform()),
            format!("{:?}", flow_acc.transform()),
        ));
    }

    if let (Some(a), Some(b)) = (flow_dir.crs(), flow_acc.crs()) {
        if !a.is_equivalent(b) {
            return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
        }
    }

    Ok(())
}

/// Extract a raw stream network at a single accumulation threshold.
///
/// Runs the full extraction stage: alignment check, accumulation
/// thresholding, Strahler ordering and vectorization. The returned
/// network is at the raw stage, with geometry, order and threshold
/// populated and all derived attributes unset.
pub fn extract_network(
    flow_dir: &Raster<u8>,
    flow_acc: &Raster<f64>,
    threshold: u32,
) -> Result<(StreamNetwork, ExtractionStats)> {
    check_alignment(flow_dir, flow_acc)?;

    let streams = stream_raster(flow_acc, threshold)?;
    let order = strahler_order(flow_dir, &streams)?;
    let (segments, stats) = vectorize_streams(flow_dir, &streams, &order, threshold)?;

    Ok((StreamNetwork::with_segments(threshold, segments), stats))
}

/// Stream extraction algorithm
#[derive(Debug, Clone, Default)]
pub struct ExtractStreams;

/// Parameters for stream extraction
#[derive(Debug, Clone)]
pub struct ExtractionParams {
    /// Flow accumulation threshold in cells.
    /// Cells with accumulation >= this value become stream cells.
    /// Default: 1000
    pub threshold: u32,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self { threshold: 1000 }
    }
}

impl Algorithm for ExtractStreams {
    type Input = (Raster<u8>, Raster<f64>);
    type Output = (StreamNetwork, ExtractionStats);
    type Params = ExtractionParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Stream Extraction"
    }

    fn description(&self) -> &'static str {
        "Threshold flow accumulation and vectorize Strahler-ordered stream segments"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        extract_network(&input.0, &input.1, params.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrotrace_core::{GeoTransform, CRS};

    fn raster_pair() -> (Raster<u8>, Raster<f64>) {
        let mut dir: Raster<u8> = Raster::new(4, 4);
        dir.set_transform(GeoTransform::new(0.0, 40.0, 10.0, -10.0));
        let mut acc: Raster<f64> = Raster::new(4, 4);
        acc.set_transform(GeoTransform::new(0.0, 40.0, 10.0, -10.0));
        (dir, acc)
    }

    #[test]
    fn test_alignment_accepts_matching_grids() {
        let (dir, acc) = raster_pair();
        assert!(check_alignment(&dir, &acc).is_ok());
    }

    #[test]
    fn test_alignment_rejects_size_mismatch() {
        let (dir, _) = raster_pair();
        let acc: Raster<f64> = Raster::new(4, 5);
        match check_alignment(&dir, &acc) {
            Err(Error::SizeMismatch { er: 4, ec: 4, ar: 4, ac: 5 }) => {}
            other => panic!("Expected size mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_alignment_rejects_shifted_transform() {
        let (dir, mut acc) = raster_pair();
        acc.set_transform(GeoTransform::new(5.0, 40.0, 10.0, -10.0));
        assert!(matches!(
            check_alignment(&dir, &acc),
            Err(Error::TransformMismatch(_, _))
        ));
    }

    #[test]
    fn test_alignment_rejects_crs_mismatch() {
        let (mut dir, mut acc) = raster_pair();
        dir.set_crs(Some(CRS::from_epsg(32633)));
        acc.set_crs(Some(CRS::from_epsg(4326)));
        assert!(matches!(
            check_alignment(&dir, &acc),
            Err(Error::CrsMismatch(_, _))
        ));
    }

    #[test]
    fn test_alignment_allows_one_missing_crs() {
        let (mut dir, acc) = raster_pair();
        dir.set_crs(Some(CRS::from_epsg(32633)));
        assert!(check_alignment(&dir, &acc).is_ok());
    }
}
