//! Drainage area sampling
//!
//! Contributing drainage area comes from the flow accumulation raster:
//! both segment endpoints are sampled and the larger value wins, since
//! the downstream end of a junction-to-junction segment carries the
//! whole upstream count.

use crate::d8::downstream;
use crate::geometry::KM_PER_DEGREE;
use hydrotrace_core::raster::{GeoTransform, Raster};
use geo_types::LineString;

/// Accumulation sample chosen for a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DrainageSample {
    pub row: usize,
    pub col: usize,
    /// Upstream cell count at the sampled cell
    pub cells: f64,
}

/// Convert an upstream cell count to square kilometers.
///
/// Projected grids multiply by the metric cell area. Geographic grids
/// convert degree spans to kilometers, shrinking the east-west span by
/// the cosine of the given latitude.
pub fn cells_to_sqkm(cells: f64, transform: &GeoTransform, geographic: bool, lat_deg: f64) -> f64 {
    if geographic {
        let width_km =
            transform.pixel_width.abs() * KM_PER_DEGREE * lat_deg.to_radians().cos();
        let height_km = transform.pixel_height.abs() * KM_PER_DEGREE;
        cells * width_km * height_km
    } else {
        cells * transform.pixel_width.abs() * transform.pixel_height.abs() / 1e6
    }
}

/// Sample flow accumulation at a segment's endpoints.
///
/// Returns the chosen sample and a boundary artifact flag. Endpoints
/// that fall outside the grid or on nodata cells are invalid; with one
/// valid endpoint that one is used, with none the segment is marked as
/// a boundary artifact. Equal samples are tied by stepping each
/// endpoint's cell one D8 move: the endpoint that flows onto the other
/// wins, the last vertex breaking any remaining tie.
pub(crate) fn sample_drainage(
    line: &LineString<f64>,
    flow_dir: &Raster<u8>,
    flow_acc: &Raster<f64>,
) -> (Option<DrainageSample>, bool) {
    let (rows, cols) = flow_acc.shape();

    let sample_at = |x: f64, y: f64| -> Option<DrainageSample> {
        let (col_f, row_f) = flow_acc.geo_to_pixel(x, y);
        if !col_f.is_finite() || !row_f.is_finite() {
            return None;
        }
        let (row_f, col_f) = (row_f.floor(), col_f.floor());
        if row_f < 0.0 || col_f < 0.0 {
            return None;
        }
        let (row, col) = (row_f as usize, col_f as usize);
        if row >= rows || col >= cols {
            return None;
        }
        let cells = unsafe { flow_acc.get_unchecked(row, col) };
        if flow_acc.is_nodata(cells) {
            return None;
        }
        Some(DrainageSample { row, col, cells })
    };

    let (Some(first), Some(last)) = (line.0.first(), line.0.last()) else {
        return (None, true);
    };

    match (sample_at(first.x, first.y), sample_at(last.x, last.y)) {
        (Some(a), Some(b)) => {
            let chosen = if a.cells > b.cells {
                a
            } else if b.cells > a.cells {
                b
            } else {
                let step = |s: &DrainageSample| {
                    let dir = unsafe { flow_dir.get_unchecked(s.row, s.col) };
                    downstream(s.row, s.col, dir, rows, cols)
                };
                if step(&a) == Some((b.row, b.col)) {
                    a
                } else {
                    b
                }
            };
            (Some(chosen), false)
        }
        (Some(a), None) => (Some(a), false),
        (None, Some(b)) => (Some(b), false),
        (None, None) => (None, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::line_string;
    use hydrotrace_core::GeoTransform;

    #[test]
    fn test_projected_area() {
        let gt = GeoTransform::new(0.0, 1000.0, 10.0, -10.0);
        // 1000 cells of 100 square meters
        assert_relative_eq!(cells_to_sqkm(1000.0, &gt, false, 0.0), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_geographic_area_at_midlatitude() {
        // 500 cells of 0.0001 degree pixels near 40N comes to about
        // 0.0475 square kilometers
        let gt = GeoTransform::new(10.0, 40.0, 0.0001, -0.0001);
        let area = cells_to_sqkm(500.0, &gt, true, 40.0);
        assert_relative_eq!(area, 0.0475, epsilon = 1e-4);
    }

    fn strip() -> (Raster<u8>, Raster<f64>) {
        let mut dir: Raster<u8> = Raster::new(1, 5);
        let mut acc: Raster<f64> = Raster::new(1, 5);
        let gt = GeoTransform::new(0.0, 10.0, 10.0, -10.0);
        dir.set_transform(gt);
        acc.set_transform(gt);
        for col in 0..5 {
            dir.set(0, col, 1).unwrap();
            acc.set(0, col, col as f64).unwrap();
        }
        (dir, acc)
    }

    #[test]
    fn test_larger_endpoint_wins() {
        let (dir, acc) = strip();
        // Cell centers of (0,0) and (0,4)
        let line = line_string![(x: 5.0, y: 5.0), (x: 45.0, y: 5.0)];

        let (sample, artifact) = sample_drainage(&line, &dir, &acc);
        let sample = sample.unwrap();

        assert!(!artifact);
        assert_eq!((sample.row, sample.col), (0, 4));
        assert_eq!(sample.cells, 4.0);
    }

    #[test]
    fn test_single_valid_endpoint_used() {
        let (dir, acc) = strip();
        // First vertex is west of the grid
        let line = line_string![(x: -25.0, y: 5.0), (x: 25.0, y: 5.0)];

        let (sample, artifact) = sample_drainage(&line, &dir, &acc);

        assert!(!artifact);
        assert_eq!(sample.unwrap().cells, 2.0);
    }

    #[test]
    fn test_no_valid_endpoint_is_boundary_artifact() {
        let (dir, acc) = strip();
        let line = line_string![(x: -25.0, y: 5.0), (x: 999.0, y: 5.0)];

        let (sample, artifact) = sample_drainage(&line, &dir, &acc);

        assert!(artifact);
        assert_eq!(sample, None);
    }

    #[test]
    fn test_nodata_endpoint_invalid() {
        let (dir, mut acc) = strip();
        acc.set(0, 4, f64::NAN).unwrap();
        let line = line_string![(x: 5.0, y: 5.0), (x: 45.0, y: 5.0)];

        let (sample, artifact) = sample_drainage(&line, &dir, &acc);

        assert!(!artifact);
        assert_eq!(sample.unwrap().cells, 0.0);
    }

    #[test]
    fn test_tie_prefers_endpoint_flowing_onto_other() {
        let (dir, mut acc) = strip();
        acc.set(0, 0, 7.0).unwrap();
        acc.set(0, 1, 7.0).unwrap();
        // Adjacent cells with equal accumulation; (0,0) flows east onto (0,1)
        let line = line_string![(x: 5.0, y: 5.0), (x: 15.0, y: 5.0)];

        let (sample, _) = sample_drainage(&line, &dir, &acc);

        assert_eq!((sample.unwrap().row, sample.unwrap().col), (0, 0));
    }
}
