//! Network attribution
//!
//! Populates the derived attributes of a raw network: channel length,
//! sinuosity and contributing drainage area. Geometry problems never
//! abort the stage; they leave the affected attribute unset or flag
//! the segment, and the filter stage decides what to drop.

mod drainage;

pub use drainage::cells_to_sqkm;

use crate::extraction::check_alignment;
use crate::geometry::{centroid_lat_deg, segment_length_m, sinuosity, straight_line_m};
use crate::maybe_rayon::*;
use drainage::sample_drainage;
use hydrotrace_core::raster::Raster;
use hydrotrace_core::vector::{NetworkStage, StreamNetwork, StreamSegment};
use hydrotrace_core::{Algorithm, Error, Result};

/// Attribute every segment of a network.
///
/// Consumes the input network and returns it at the attributed stage.
/// Segments are processed independently and in parallel when the
/// `parallel` feature is on; output order matches input order.
pub fn attribute_network(
    network: StreamNetwork,
    flow_dir: &Raster<u8>,
    flow_acc: &Raster<f64>,
) -> Result<StreamNetwork> {
    check_alignment(flow_dir, flow_acc)?;

    let geographic = flow_acc.is_geographic();

    let segments: Vec<StreamSegment> = network
        .segments
        .into_par_iter()
        .map(|segment| attribute_segment(segment, flow_dir, flow_acc, geographic))
        .collect();

    Ok(StreamNetwork {
        threshold: network.threshold,
        stage: NetworkStage::Attributed,
        segments,
    })
}

fn attribute_segment(
    mut segment: StreamSegment,
    flow_dir: &Raster<u8>,
    flow_acc: &Raster<f64>,
    geographic: bool,
) -> StreamSegment {
    segment.length_m = segment_length_m(&segment.geometry, geographic);
    segment.length_km = segment.length_m / 1000.0;

    let straight = straight_line_m(&segment.geometry, geographic);
    segment.sinuosity = sinuosity(segment.length_m, straight);

    let (sample, artifact) = sample_drainage(&segment.geometry, flow_dir, flow_acc);
    segment.drainage_area_sqkm = Some(match sample {
        Some(s) => {
            // Cell width varies along the segment on geographic grids;
            // the centroid latitude is the representative one
            let lat = centroid_lat_deg(&segment.geometry);
            cells_to_sqkm(s.cells, flow_acc.transform(), geographic, lat)
        }
        None => 0.0,
    });
    segment.boundary_artifact = artifact;

    segment
}

/// Network attribution algorithm
#[derive(Debug, Clone, Default)]
pub struct AttributeNetwork;

impl Algorithm for AttributeNetwork {
    type Input = (StreamNetwork, Raster<u8>, Raster<f64>);
    type Output = StreamNetwork;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Network Attribution"
    }

    fn description(&self) -> &'static str {
        "Compute length, sinuosity and contributing drainage area per segment"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        let (network, flow_dir, flow_acc) = input;
        attribute_network(network, &flow_dir, &flow_acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::extract_network;
    use approx::assert_relative_eq;
    use geo_types::line_string;
    use hydrotrace_core::vector::StreamType;
    use hydrotrace_core::{GeoTransform, Raster, CRS};

    /// Y-shaped network with realistic accumulation on a 10 m grid
    fn y_basin() -> (Raster<u8>, Raster<f64>) {
        let gt = GeoTransform::new(0.0, 50.0, 10.0, -10.0);
        let mut dir: Raster<u8> = Raster::new(5, 3);
        dir.set_transform(gt);
        let mut acc: Raster<f64> = Raster::new(5, 3);
        acc.set_transform(gt);

        dir.set(0, 0, 8).unwrap();
        dir.set(0, 2, 6).unwrap();
        dir.set(1, 1, 7).unwrap();
        dir.set(2, 1, 7).unwrap();
        dir.set(3, 1, 7).unwrap();

        for ((row, col), cells) in [
            ((0, 0), 120.0),
            ((0, 2), 150.0),
            ((1, 1), 400.0),
            ((2, 1), 420.0),
            ((3, 1), 440.0),
            ((4, 1), 460.0),
        ] {
            acc.set(row, col, cells).unwrap();
        }

        (dir, acc)
    }

    #[test]
    fn test_attribution_fills_lengths_and_drainage() {
        let (dir, acc) = y_basin();
        let (network, _) = extract_network(&dir, &acc, 100).unwrap();
        let network = attribute_network(network, &dir, &acc).unwrap();

        assert_eq!(network.stage, NetworkStage::Attributed);
        assert_eq!(network.len(), 3);

        // Diagonal headwater segment: one 10 m step on the diagonal
        let head = &network.segments[0];
        assert_relative_eq!(head.length_m, 200.0_f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(head.length_km, head.length_m / 1000.0, epsilon = 1e-12);
        assert_eq!(head.sinuosity, Some(1.0));
        // Junction end carries 400 cells of 100 square meters
        assert_relative_eq!(head.drainage_area_sqkm.unwrap(), 0.04, epsilon = 1e-12);

        // Trunk runs three cells south from the junction
        let trunk = &network.segments[2];
        assert_relative_eq!(trunk.length_m, 30.0, epsilon = 1e-9);
        assert_eq!(trunk.sinuosity, Some(1.0));
        assert_relative_eq!(trunk.drainage_area_sqkm.unwrap(), 0.046, epsilon = 1e-12);
        assert!(!trunk.boundary_artifact);
    }

    #[test]
    fn test_geographic_lengths_use_degree_conversion() {
        let gt = GeoTransform::new(10.0, 40.0, 0.0001, -0.0001);
        let mut dir: Raster<u8> = Raster::new(1, 3);
        dir.set_transform(gt);
        dir.set_crs(Some(CRS::wgs84()));
        let mut acc: Raster<f64> = Raster::new(1, 3);
        acc.set_transform(gt);
        acc.set_crs(Some(CRS::wgs84()));

        dir.set(0, 0, 1).unwrap();
        dir.set(0, 1, 1).unwrap();
        acc.set(0, 0, 500.0).unwrap();
        acc.set(0, 1, 520.0).unwrap();
        acc.set(0, 2, 540.0).unwrap();

        let (network, _) = extract_network(&dir, &acc, 100).unwrap();
        let network = attribute_network(network, &dir, &acc).unwrap();

        assert_eq!(network.len(), 1);
        let segment = &network.segments[0];

        // Two 0.0001 degree east-west steps at ~40N, about 8.5 m each
        let expected_step = 0.0001 * 111.32 * 1000.0 * 40.0_f64.to_radians().cos();
        assert_relative_eq!(segment.length_m, 2.0 * expected_step, epsilon = 0.01);

        // 540 cells at the downstream end
        let area = segment.drainage_area_sqkm.unwrap();
        assert_relative_eq!(area, 0.0475 * 540.0 / 500.0, epsilon = 1e-4);
    }

    #[test]
    fn test_off_grid_segment_flagged_not_failed() {
        let (dir, acc) = y_basin();

        let stray = StreamSegment {
            geometry: line_string![(x: -500.0, y: -500.0), (x: -400.0, y: -500.0)],
            order: 1,
            flow_accum_threshold: 100,
            length_m: 0.0,
            length_km: 0.0,
            drainage_area_sqkm: None,
            sinuosity: None,
            stream_type: Some(StreamType::Ephemeral),
            confidence_score: None,
            boundary_artifact: false,
        };
        let network = StreamNetwork::with_segments(100, vec![stray]);

        let network = attribute_network(network, &dir, &acc).unwrap();
        let segment = &network.segments[0];

        assert!(segment.boundary_artifact);
        assert_eq!(segment.drainage_area_sqkm, Some(0.0));
        assert_relative_eq!(segment.length_m, 100.0, epsilon = 1e-9);
    }
}
