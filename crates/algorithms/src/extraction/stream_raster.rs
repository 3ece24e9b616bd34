//! Accumulation thresholding
//!
//! Classifies cells with flow accumulation at or above a threshold as
//! stream cells. The output is a binary raster (1 = stream, 0 = not).

use hydrotrace_core::raster::Raster;
use hydrotrace_core::Result;
use ndarray::Array2;

/// Threshold a flow accumulation raster into a stream cell grid.
///
/// Nodata and NaN accumulation cells never become stream cells.
///
/// # Arguments
/// * `flow_acc` - Flow accumulation raster in upstream cell counts
/// * `threshold` - Minimum accumulation (cells) for a stream cell
///
/// # Returns
/// Raster<u8> with 1 = stream cell, 0 = non-stream cell
pub fn stream_raster(flow_acc: &Raster<f64>, threshold: u32) -> Result<Raster<u8>> {
    let (rows, cols) = flow_acc.shape();
    let cutoff = threshold as f64;

    let mut output_data = Array2::<u8>::zeros((rows, cols));

    for row in 0..rows {
        for col in 0..cols {
            let acc = unsafe { flow_acc.get_unchecked(row, col) };
            if !flow_acc.is_nodata(acc) && acc >= cutoff {
                output_data[(row, col)] = 1;
            }
        }
    }

    let mut output = flow_acc.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(0));
    *output.data_mut() = output_data;

    Ok(output)
}
