//! Watershed delineation
//!
//! Delineates the upstream area draining to a pour point by tracing the
//! D8 flow direction grid against the flow. The pour point can first be
//! snapped to the highest-accumulation cell in a small window, which
//! forgives outlet coordinates digitized slightly off the channel.

use std::collections::VecDeque;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::attribute::cells_to_sqkm;
use crate::d8::{opposite_dir, D8_OFFSETS};
use crate::extraction::check_alignment;
use hydrotrace_core::raster::Raster;
use hydrotrace_core::{Algorithm, Error, Result};

/// Parameters for watershed delineation
#[derive(Debug, Clone)]
pub struct WatershedParams {
    /// Pour point as (row, col)
    pub outlet: (usize, usize),
    /// Snap search radius in cells; 0 disables snapping
    pub snap_radius: usize,
}

impl Default for WatershedParams {
    fn default() -> Self {
        Self {
            outlet: (0, 0),
            snap_radius: 0,
        }
    }
}

/// Size of a delineated watershed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatershedStats {
    /// Cells inside the watershed
    pub cells: usize,
    /// Watershed area in km²
    pub area_sqkm: f64,
}

/// Mask plus the outlet it was grown from
#[derive(Debug, Clone)]
pub struct WatershedOutcome {
    /// 1 inside the watershed, 0 (nodata) outside
    pub mask: Raster<u8>,
    /// Outlet after snapping
    pub outlet: (usize, usize),
    pub stats: WatershedStats,
}

/// Snap a pour point to the highest-accumulation cell within `radius`.
///
/// Ties keep the first candidate in row-major order. If every cell in
/// the window is nodata the input coordinates come back unchanged.
pub fn snap_pour_point(
    flow_acc: &Raster<f64>,
    row: usize,
    col: usize,
    radius: usize,
) -> (usize, usize) {
    let (rows, cols) = flow_acc.shape();
    if rows == 0 || cols == 0 {
        return (row, col);
    }

    let lo_r = row.saturating_sub(radius);
    let hi_r = (row + radius).min(rows - 1);
    let lo_c = col.saturating_sub(radius);
    let hi_c = (col + radius).min(cols - 1);

    let mut best = (row, col);
    let mut best_acc = f64::NEG_INFINITY;
    for r in lo_r..=hi_r {
        for c in lo_c..=hi_c {
            let acc = unsafe { flow_acc.get_unchecked(r, c) };
            if flow_acc.is_nodata(acc) || !acc.is_finite() {
                continue;
            }
            if acc > best_acc {
                best_acc = acc;
                best = (r, c);
            }
        }
    }
    best
}

/// Delineate the watershed draining to `outlet`.
///
/// Breadth-first search upstream: a neighbor belongs to the watershed
/// when its own flow direction points back at the cell being expanded.
/// Returns a mask raster with 1 inside the watershed and 0 (nodata)
/// outside.
pub fn delineate_watershed(flow_dir: &Raster<u8>, outlet: (usize, usize)) -> Result<Raster<u8>> {
    let (rows, cols) = flow_dir.shape();
    let (orow, ocol) = outlet;
    if orow >= rows || ocol >= cols {
        return Err(Error::IndexOutOfBounds {
            row: orow,
            col: ocol,
            rows,
            cols,
        });
    }

    let mut mask = Array2::<u8>::zeros((rows, cols));
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    mask[(orow, ocol)] = 1;
    queue.push_back((orow, ocol));

    while let Some((row, col)) = queue.pop_front() {
        for (idx, &(dr, dc)) in D8_OFFSETS.iter().enumerate() {
            let nr = row as isize + dr;
            let nc = col as isize + dc;
            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            if mask[(nr, nc)] != 0 {
                continue;
            }

            let neighbor_dir = unsafe { flow_dir.get_unchecked(nr, nc) };
            if neighbor_dir == 0 {
                continue;
            }

            // The neighbor sits at direction idx+1 from here; it drains
            // into this cell only if it points straight back.
            if neighbor_dir == opposite_dir((idx + 1) as u8) {
                mask[(nr, nc)] = 1;
                queue.push_back((nr, nc));
            }
        }
    }

    let mut output = flow_dir.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(0));
    *output.data_mut() = mask;
    Ok(output)
}

/// Count cells and area of a watershed mask.
///
/// On geographic grids the cell area shrinks with latitude, so the area
/// is accumulated row by row at each row's own latitude.
pub fn watershed_statistics(mask: &Raster<u8>) -> WatershedStats {
    let (rows, cols) = mask.shape();
    let geographic = mask.is_geographic();

    let mut cells = 0usize;
    let mut area_sqkm = 0.0f64;
    for row in 0..rows {
        let mut row_cells = 0usize;
        for col in 0..cols {
            if unsafe { mask.get_unchecked(row, col) } == 1 {
                row_cells += 1;
            }
        }
        if row_cells > 0 {
            let (_, lat) = mask.pixel_to_geo(0, row);
            area_sqkm += cells_to_sqkm(row_cells as f64, mask.transform(), geographic, lat);
            cells += row_cells;
        }
    }

    WatershedStats { cells, area_sqkm }
}

/// Snap the outlet, delineate upstream, and measure the result.
pub fn delineate_from_outlet(
    flow_dir: &Raster<u8>,
    flow_acc: &Raster<f64>,
    params: &WatershedParams,
) -> Result<WatershedOutcome> {
    check_alignment(flow_dir, flow_acc)?;

    let (row, col) = params.outlet;
    let outlet = snap_pour_point(flow_acc, row, col, params.snap_radius);
    let mask = delineate_watershed(flow_dir, outlet)?;
    let stats = watershed_statistics(&mask);

    Ok(WatershedOutcome {
        mask,
        outlet,
        stats,
    })
}

/// Watershed delineation algorithm
#[derive(Debug, Clone, Default)]
pub struct WatershedDelineation;

impl Algorithm for WatershedDelineation {
    type Input = (Raster<u8>, Raster<f64>);
    type Output = WatershedOutcome;
    type Params = WatershedParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Watershed Delineation"
    }

    fn description(&self) -> &'static str {
        "Delineate the upstream area draining to a pour point"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (flow_dir, flow_acc) = input;
        delineate_from_outlet(&flow_dir, &flow_acc, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hydrotrace_core::{GeoTransform, CRS};

    /// 5x5 valley: outer columns drain toward col 2, which drains south
    /// to the outlet at (4, 2)
    fn valley() -> (Raster<u8>, Raster<f64>) {
        let gt = GeoTransform::new(0.0, 50.0, 10.0, -10.0);
        let mut dir: Raster<u8> = Raster::new(5, 5);
        dir.set_transform(gt);
        let mut acc: Raster<f64> = Raster::new(5, 5);
        acc.set_transform(gt);

        for row in 0..5 {
            for col in 0..5 {
                let d = match col {
                    0 | 1 => 1, // east
                    2 => 7,     // south
                    _ => 5,     // west
                };
                dir.set(row, col, d).unwrap();
                acc.set(row, col, (row * 5 + col) as f64).unwrap();
            }
        }
        acc.set(4, 2, 25.0).unwrap();

        (dir, acc)
    }

    #[test]
    fn test_snap_finds_max_in_window() {
        let (_, acc) = valley();
        assert_eq!(snap_pour_point(&acc, 4, 1, 1), (4, 2));
        assert_eq!(snap_pour_point(&acc, 4, 1, 0), (4, 1));
    }

    #[test]
    fn test_snap_skips_nodata() {
        let (_, mut acc) = valley();
        acc.set_nodata(Some(25.0));
        // The former maximum is now the sentinel, so the next-best cell
        // in the window wins.
        assert_eq!(snap_pour_point(&acc, 4, 2, 1), (4, 3));
    }

    #[test]
    fn test_whole_valley_drains_to_outlet() {
        let (dir, _) = valley();
        let mask = delineate_watershed(&dir, (4, 2)).unwrap();

        for row in 0..5 {
            for col in 0..5 {
                assert_eq!(
                    mask.get(row, col).unwrap(),
                    1,
                    "cell ({}, {}) should drain to the outlet",
                    row,
                    col
                );
            }
        }
        assert_eq!(mask.nodata(), Some(0));
    }

    #[test]
    fn test_non_contributing_outlet_is_alone() {
        let (dir, _) = valley();
        // Nothing flows into (0, 0); its east neighbor drains away east.
        let mask = delineate_watershed(&dir, (0, 0)).unwrap();

        let inside: usize = (0..5)
            .flat_map(|r| (0..5).map(move |c| (r, c)))
            .filter(|&(r, c)| mask.get(r, c).unwrap() == 1)
            .count();
        assert_eq!(inside, 1);
    }

    #[test]
    fn test_off_grid_outlet_rejected() {
        let (dir, _) = valley();
        let err = delineate_watershed(&dir, (9, 9));
        assert!(matches!(err, Err(Error::IndexOutOfBounds { .. })));
    }

    #[test]
    fn test_statistics_projected() {
        let (dir, _) = valley();
        let mask = delineate_watershed(&dir, (4, 2)).unwrap();
        let stats = watershed_statistics(&mask);

        assert_eq!(stats.cells, 25);
        // 25 cells of 10 m x 10 m.
        assert_relative_eq!(stats.area_sqkm, 0.0025, epsilon = 1e-12);
    }

    #[test]
    fn test_statistics_geographic_shrink_with_latitude() {
        let gt = GeoTransform::new(0.0, 60.0, 0.5, -0.5);

        let mut top: Raster<u8> = Raster::new(2, 2);
        top.set_transform(gt);
        top.set_crs(Some(CRS::wgs84()));
        top.set(0, 0, 1).unwrap();
        top.set(0, 1, 1).unwrap();

        let mut bottom: Raster<u8> = Raster::new(2, 2);
        bottom.set_transform(gt);
        bottom.set_crs(Some(CRS::wgs84()));
        bottom.set(1, 0, 1).unwrap();
        bottom.set(1, 1, 1).unwrap();

        let top_stats = watershed_statistics(&top);
        let bottom_stats = watershed_statistics(&bottom);

        assert_eq!(top_stats.cells, 2);
        assert_eq!(bottom_stats.cells, 2);
        // The higher-latitude row covers less ground east-west.
        assert!(top_stats.area_sqkm < bottom_stats.area_sqkm);
    }

    #[test]
    fn test_delineate_from_outlet_snaps_first() {
        let (dir, acc) = valley();
        let params = WatershedParams {
            outlet: (4, 1),
            snap_radius: 1,
        };

        let outcome = delineate_from_outlet(&dir, &acc, &params).unwrap();

        assert_eq!(outcome.outlet, (4, 2));
        assert_eq!(outcome.stats.cells, 25);
    }
}
