//! Segment geometry measurements

use geo::{Centroid, Euclidean, Length};
use geo_types::LineString;

/// Kilometers per degree of latitude (and of longitude at the equator)
pub const KM_PER_DEGREE: f64 = 111.32;

/// Channel length in meters along the vertex chain.
///
/// Projected coordinates are measured with the Euclidean metric and
/// assumed to be in meters. Geographic coordinates use a per-pair
/// equirectangular approximation: longitude spans shrink with the
/// cosine of the pair's mean latitude.
pub fn segment_length_m(line: &LineString<f64>, geographic: bool) -> f64 {
    if geographic {
        line.0
            .windows(2)
            .map(|pair| degree_pair_m(pair[0].x, pair[0].y, pair[1].x, pair[1].y))
            .sum()
    } else {
        line.length::<Euclidean>()
    }
}

/// Straight-line distance in meters between the first and last vertex.
///
/// Returns 0.0 for degenerate geometries with fewer than two vertices.
pub fn straight_line_m(line: &LineString<f64>, geographic: bool) -> f64 {
    if line.0.len() < 2 {
        return 0.0;
    }
    let first = line.0[0];
    let last = line.0[line.0.len() - 1];

    if geographic {
        degree_pair_m(first.x, first.y, last.x, last.y)
    } else {
        let dx = last.x - first.x;
        let dy = last.y - first.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Sinuosity: channel length over straight-line distance, floored at 1.0.
///
/// A closed or single-vertex segment has no straight-line distance and
/// yields `None`.
pub fn sinuosity(length_m: f64, straight_m: f64) -> Option<f64> {
    if straight_m == 0.0 {
        return None;
    }
    Some((length_m / straight_m).max(1.0))
}

/// Latitude of the segment centroid in degrees.
///
/// Cell width under a geographic CRS depends on where along the segment
/// it is measured; the centroid is the representative point. Geometries
/// too degenerate for a length-weighted centroid fall back to the
/// vertex mean.
pub fn centroid_lat_deg(line: &LineString<f64>) -> f64 {
    if let Some(c) = line.centroid() {
        return c.y();
    }
    if line.0.is_empty() {
        return 0.0;
    }
    line.0.iter().map(|p| p.y).sum::<f64>() / line.0.len() as f64
}

fn degree_pair_m(x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    let mean_lat = ((y0 + y1) / 2.0).to_radians();
    let dx_m = (x1 - x0) * KM_PER_DEGREE * 1000.0 * mean_lat.cos();
    let dy_m = (y1 - y0) * KM_PER_DEGREE * 1000.0;
    (dx_m * dx_m + dy_m * dy_m).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::line_string;

    #[test]
    fn test_projected_length() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 4.0)];
        assert_relative_eq!(segment_length_m(&line, false), 5.0, epsilon = 1e-10);
    }

    #[test]
    fn test_geographic_length_shrinks_with_latitude() {
        // 0.0001 degrees of longitude at 60N, where cos(lat) = 0.5
        let line = line_string![(x: 10.0, y: 60.0), (x: 10.0001, y: 60.0)];
        assert_relative_eq!(segment_length_m(&line, true), 5.566, epsilon = 1e-6);

        // a degree of latitude is 111.32 km everywhere
        let meridian = line_string![(x: 10.0, y: 0.0), (x: 10.0, y: 0.001)];
        assert_relative_eq!(segment_length_m(&meridian, true), 111.32, epsilon = 1e-9);
    }

    #[test]
    fn test_straight_line_degenerate() {
        let single = line_string![(x: 5.0, y: 5.0)];
        assert_eq!(straight_line_m(&single, false), 0.0);
        assert_eq!(straight_line_m(&LineString::new(vec![]), false), 0.0);
    }

    #[test]
    fn test_sinuosity_floor() {
        // Floating point can make length come out a hair under the chord
        assert_eq!(sinuosity(9.999999999, 10.0), Some(1.0));
        let s = sinuosity(15.0, 10.0);
        assert_relative_eq!(s.unwrap(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_sinuosity_closed_loop() {
        assert_eq!(sinuosity(25.0, 0.0), None);
    }

    #[test]
    fn test_centroid_latitude() {
        let line = line_string![(x: 10.0, y: 40.0), (x: 10.0, y: 41.0)];
        assert_relative_eq!(centroid_lat_deg(&line), 40.5, epsilon = 1e-12);

        // Uneven vertex spacing weights by length, not vertex count
        let bent = line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 1.0), (x: 0.0, y: 4.0)];
        assert_relative_eq!(centroid_lat_deg(&bent), 2.0, epsilon = 1e-12);
    }
}
