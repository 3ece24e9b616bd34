//! Strahler stream ordering
//!
//! Assigns Strahler orders over the stream-cell subgraph of the D8
//! flow directions with a topological sweep. Headwater stream cells
//! get order 1. Where two or more upstream neighbors share the
//! maximum incoming order, the receiving cell takes that order plus
//! one; otherwise the maximum carries through unchanged.

use crate::d8::downstream;
use hydrotrace_core::raster::Raster;
use hydrotrace_core::{Error, Result};
use ndarray::Array2;

/// Assign Strahler orders to stream cells.
///
/// Non-stream cells are left at 0, which is also the nodata value of
/// the output raster. Cells on a flow direction cycle never drain and
/// keep order 0.
///
/// # Arguments
/// * `flow_dir` - D8 flow direction raster
/// * `streams` - Binary stream cell raster from `stream_raster`
///
/// # Returns
/// Raster<u32> of Strahler orders, 0 outside the network
pub fn strahler_order(flow_dir: &Raster<u8>, streams: &Raster<u8>) -> Result<Raster<u32>> {
    let (rows, cols) = flow_dir.shape();
    let (sr, sc) = streams.shape();
    if (rows, cols) != (sr, sc) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: sr,
            ac: sc,
        });
    }

    let is_stream = |row: usize, col: usize| unsafe { streams.get_unchecked(row, col) } == 1;

    // In-degree within the stream subgraph
    let mut in_deg = vec![0u32; rows * cols];
    for row in 0..rows {
        for col in 0..cols {
            if !is_stream(row, col) {
                continue;
            }
            let dir = unsafe { flow_dir.get_unchecked(row, col) };
            if let Some((nr, nc)) = downstream(row, col, dir, rows, cols) {
                if is_stream(nr, nc) {
                    in_deg[nr * cols + nc] += 1;
                }
            }
        }
    }

    let mut order = Array2::<u32>::zeros((rows, cols));

    // Per-cell maximum incoming order and how many upstream neighbors
    // delivered it
    let mut max_in = vec![0u32; rows * cols];
    let mut max_count = vec![0u32; rows * cols];

    // Headwater stream cells start at order 1
    let mut queue: Vec<(usize, usize)> = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            if is_stream(row, col) && in_deg[row * cols + col] == 0 {
                order[(row, col)] = 1;
                queue.push((row, col));
            }
        }
    }

    while let Some((row, col)) = queue.pop() {
        let current = order[(row, col)];
        let dir = unsafe { flow_dir.get_unchecked(row, col) };

        let Some((nr, nc)) = downstream(row, col, dir, rows, cols) else {
            continue;
        };
        if !is_stream(nr, nc) {
            continue;
        }

        let idx = nr * cols + nc;
        if current > max_in[idx] {
            max_in[idx] = current;
            max_count[idx] = 1;
        } else if current == max_in[idx] {
            max_count[idx] += 1;
        }

        in_deg[idx] -= 1;
        if in_deg[idx] == 0 {
            order[(nr, nc)] = if max_count[idx] >= 2 {
                max_in[idx] + 1
            } else {
                max_in[idx]
            };
            queue.push((nr, nc));
        }
    }

    let mut output = flow_dir.with_same_meta::<u32>(rows, cols);
    output.set_nodata(Some(0));
    *output.data_mut() = order;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Y-shaped network on a 5x3 grid: two headwaters join at (1,1)
    /// and drain south along column 1.
    fn y_network() -> (Raster<u8>, Raster<u8>) {
        let mut dir: Raster<u8> = Raster::new(5, 3);
        let mut streams: Raster<u8> = Raster::new(5, 3);

        dir.set(0, 0, 8).unwrap(); // SE into (1,1)
        dir.set(0, 2, 6).unwrap(); // SW into (1,1)
        dir.set(1, 1, 7).unwrap(); // S
        dir.set(2, 1, 7).unwrap();
        dir.set(3, 1, 7).unwrap();
        // (4,1) stays 0: outlet pit

        for (row, col) in [(0, 0), (0, 2), (1, 1), (2, 1), (3, 1), (4, 1)] {
            streams.set(row, col, 1).unwrap();
        }

        (dir, streams)
    }

    #[test]
    fn test_equal_order_junction_increments() {
        let (dir, streams) = y_network();
        let order = strahler_order(&dir, &streams).unwrap();

        assert_eq!(order.get(0, 0).unwrap(), 1);
        assert_eq!(order.get(0, 2).unwrap(), 1);
        assert_eq!(order.get(1, 1).unwrap(), 2, "Two order-1 inflows make order 2");
        assert_eq!(order.get(2, 1).unwrap(), 2);
        assert_eq!(order.get(4, 1).unwrap(), 2, "Order carries to the outlet");
    }

    #[test]
    fn test_mixed_order_junction_keeps_max() {
        let (mut dir, mut streams) = y_network();

        // Add an order-1 tributary entering the order-2 trunk at (2,1)
        dir.set(2, 0, 1).unwrap(); // E into (2,1)
        streams.set(2, 0, 1).unwrap();

        let order = strahler_order(&dir, &streams).unwrap();

        assert_eq!(order.get(2, 0).unwrap(), 1);
        assert_eq!(
            order.get(2, 1).unwrap(),
            2,
            "An order-1 inflow must not raise an order-2 trunk"
        );
    }

    #[test]
    fn test_triple_junction_increments_once() {
        // Three order-1 headwaters converge on (1,1)
        let mut dir: Raster<u8> = Raster::new(3, 3);
        let mut streams: Raster<u8> = Raster::new(3, 3);

        dir.set(0, 0, 8).unwrap();
        dir.set(0, 1, 7).unwrap();
        dir.set(0, 2, 6).unwrap();
        dir.set(1, 1, 7).unwrap();

        for (row, col) in [(0, 0), (0, 1), (0, 2), (1, 1), (2, 1)] {
            streams.set(row, col, 1).unwrap();
        }

        let order = strahler_order(&dir, &streams).unwrap();

        assert_eq!(order.get(1, 1).unwrap(), 2, "Three same-order inflows still add just one");
        assert_eq!(order.get(2, 1).unwrap(), 2);
    }

    #[test]
    fn test_non_stream_cells_stay_zero() {
        let (dir, streams) = y_network();
        let order = strahler_order(&dir, &streams).unwrap();

        assert_eq!(order.get(0, 1).unwrap(), 0);
        assert_eq!(order.get(4, 0).unwrap(), 0);
        assert_eq!(order.nodata(), Some(0));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let dir: Raster<u8> = Raster::new(5, 3);
        let streams: Raster<u8> = Raster::new(3, 5);
        assert!(matches!(
            strahler_order(&dir, &streams),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
