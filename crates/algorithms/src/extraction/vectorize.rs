//! Stream vectorization
//!
//! Converts the stream cell grid into junction-to-junction LineString
//! segments. Segment starts are headwater cells (no stream inflow) and
//! break cells (junctions, or cells where the Strahler order changes).
//! Each walk follows flow directions downstream, pushing cell centers
//! as vertices, and stops after pushing a break cell so that adjacent
//! segments share the junction vertex.

use crate::d8::downstream;
use crate::extraction::ExtractionStats;
use crate::maybe_rayon::*;
use geo_types::LineString;
use hydrotrace_core::raster::Raster;
use hydrotrace_core::vector::StreamSegment;
use hydrotrace_core::{Error, Result};

enum Walk {
    Segment(StreamSegment),
    /// Single stream cell with no upstream and no stream downstream
    Isolated,
    /// Junction cell whose geometry is already carried by upstream walks
    Covered,
}

/// Vectorize stream cells into ordered segments.
///
/// Segments are emitted in row-major order of their start cells, so
/// output is deterministic regardless of thread count. The returned
/// stats carry the stream cell total and the count of isolated cells
/// that could not form a two-vertex geometry.
///
/// # Arguments
/// * `flow_dir` - D8 flow direction raster
/// * `streams` - Binary stream cell raster
/// * `order` - Strahler order raster from `strahler_order`
/// * `threshold` - Accumulation threshold to stamp on each segment
pub fn vectorize_streams(
    flow_dir: &Raster<u8>,
    streams: &Raster<u8>,
    order: &Raster<u32>,
    threshold: u32,
) -> Result<(Vec<StreamSegment>, ExtractionStats)> {
    let (rows, cols) = flow_dir.shape();
    for other in [streams.shape(), order.shape()] {
        if other != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: other.0,
                ac: other.1,
            });
        }
    }

    let is_stream = |row: usize, col: usize| unsafe { streams.get_unchecked(row, col) } == 1;

    // Count stream inflows per cell and remember the order delivered by
    // the (sole) upstream neighbor for the single-inflow case
    let mut inflow = vec![0u8; rows * cols];
    let mut up_order = vec![0u32; rows * cols];
    let mut stream_cells = 0usize;

    for row in 0..rows {
        for col in 0..cols {
            if !is_stream(row, col) {
                continue;
            }
            stream_cells += 1;

            let dir = unsafe { flow_dir.get_unchecked(row, col) };
            if let Some((nr, nc)) = downstream(row, col, dir, rows, cols) {
                if is_stream(nr, nc) {
                    let idx = nr * cols + nc;
                    inflow[idx] += 1;
                    up_order[idx] = unsafe { order.get_unchecked(row, col) };
                }
            }
        }
    }

    // A break cell ends the segment passing through it and starts the
    // next one: junctions, and the order-change guard for the single
    // inflow case
    let mut is_break = vec![false; rows * cols];
    let mut heads: Vec<(usize, usize)> = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            if !is_stream(row, col) {
                continue;
            }
            let idx = row * cols + col;
            let own = unsafe { order.get_unchecked(row, col) };
            is_break[idx] =
                inflow[idx] >= 2 || (inflow[idx] == 1 && up_order[idx] != own);

            if inflow[idx] == 0 || is_break[idx] {
                heads.push((row, col));
            }
        }
    }

    let inflow = &inflow;
    let is_break = &is_break;

    let walks: Vec<Walk> = heads
        .into_par_iter()
        .map(|(head_row, head_col)| {
            let mut vertices: Vec<(f64, f64)> = Vec::new();
            let mut cells: Vec<(usize, usize)> = Vec::new();

            vertices.push(flow_dir.pixel_to_geo(head_col, head_row));
            cells.push((head_row, head_col));

            let (mut row, mut col) = (head_row, head_col);
            // Bounded by the stream cell total to survive direction cycles
            for _ in 0..stream_cells {
                let dir = unsafe { flow_dir.get_unchecked(row, col) };
                let Some((nr, nc)) = downstream(row, col, dir, rows, cols) else {
                    break;
                };
                if !is_stream(nr, nc) {
                    break;
                }

                vertices.push(flow_dir.pixel_to_geo(nc, nr));
                cells.push((nr, nc));

                if is_break[nr * cols + nc] {
                    break;
                }
                (row, col) = (nr, nc);
            }

            if vertices.len() < 2 {
                return if inflow[head_row * cols + head_col] == 0 {
                    Walk::Isolated
                } else {
                    Walk::Covered
                };
            }

            // Sample the order away from the junction cell at the end
            let (or, oc) = cells[(cells.len() - 1) / 2];
            let segment_order = unsafe { order.get_unchecked(or, oc) };

            Walk::Segment(StreamSegment {
                geometry: LineString::from(vertices),
                order: segment_order,
                flow_accum_threshold: threshold,
                length_m: 0.0,
                length_km: 0.0,
                drainage_area_sqkm: None,
                sinuosity: None,
                stream_type: None,
                confidence_score: None,
                boundary_artifact: false,
            })
        })
        .collect();

    let mut segments = Vec::new();
    let mut degenerate_dropped = 0usize;
    for walk in walks {
        match walk {
            Walk::Segment(segment) => segments.push(segment),
            Walk::Isolated => degenerate_dropped += 1,
            Walk::Covered => {}
        }
    }

    Ok((
        segments,
        ExtractionStats {
            stream_cells,
            degenerate_dropped,
        },
    ))
}
