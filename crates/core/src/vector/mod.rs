//! Vector data model for extracted stream networks

use geo_types::LineString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flow persistence class assigned from contributing drainage area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Perennial,
    Intermittent,
    Ephemeral,
}

impl StreamType {
    /// Lowercase label used in output attributes
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Perennial => "perennial",
            StreamType::Intermittent => "intermittent",
            StreamType::Ephemeral => "ephemeral",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing stage a network has reached.
///
/// Stages advance monotonically: raw extraction output, then attributed
/// with geometry and drainage metrics, then filtered of artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStage {
    Raw,
    Attributed,
    Filtered,
}

/// A single stream segment from junction to junction.
///
/// Geometry vertices are cell centers in the CRS of the source rasters.
/// Attribute fields start as `None` after extraction and are populated
/// by the attribution and classification stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSegment {
    /// Segment centerline, ordered upstream to downstream
    pub geometry: LineString<f64>,
    /// Strahler order
    pub order: u32,
    /// Flow accumulation threshold (cells) the segment was extracted at
    pub flow_accum_threshold: u32,
    /// Length in meters
    pub length_m: f64,
    /// Length in kilometers
    pub length_km: f64,
    /// Contributing drainage area in square kilometers
    pub drainage_area_sqkm: Option<f64>,
    /// Channel length / straight-line distance, floored at 1.0
    pub sinuosity: Option<f64>,
    /// Persistence class derived from drainage area
    pub stream_type: Option<StreamType>,
    /// Composite confidence score in [0, 1]
    pub confidence_score: Option<f64>,
    /// Set when drainage area sampling fell outside the grid
    pub boundary_artifact: bool,
}

/// An extracted stream network at a single accumulation threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamNetwork {
    /// Threshold (cells) this network was extracted at
    pub threshold: u32,
    /// Stage of processing reached
    pub stage: NetworkStage,
    /// Member segments
    pub segments: Vec<StreamSegment>,
}

impl StreamNetwork {
    /// Create an empty raw network
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            stage: NetworkStage::Raw,
            segments: Vec::new(),
        }
    }

    /// Create a raw network from extracted segments
    pub fn with_segments(threshold: u32, segments: Vec<StreamSegment>) -> Self {
        Self {
            threshold,
            stage: NetworkStage::Raw,
            segments,
        }
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the network has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iterate over segments
    pub fn iter(&self) -> impl Iterator<Item = &StreamSegment> {
        self.segments.iter()
    }

    /// Total channel length in kilometers
    pub fn total_length_km(&self) -> f64 {
        self.segments.iter().map(|s| s.length_km).sum()
    }

    /// Highest Strahler order present, or 0 for an empty network
    pub fn max_order(&self) -> u32 {
        self.segments.iter().map(|s| s.order).max().unwrap_or(0)
    }
}

impl IntoIterator for StreamNetwork {
    type Item = StreamSegment;
    type IntoIter = std::vec::IntoIter<StreamSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::line_string;

    fn segment(order: u32, length_m: f64) -> StreamSegment {
        StreamSegment {
            geometry: line_string![(x: 0.0, y: 0.0), (x: length_m, y: 0.0)],
            order,
            flow_accum_threshold: 100,
            length_m,
            length_km: length_m / 1000.0,
            drainage_area_sqkm: None,
            sinuosity: None,
            stream_type: None,
            confidence_score: None,
            boundary_artifact: false,
        }
    }

    #[test]
    fn test_network_totals() {
        let network = StreamNetwork::with_segments(100, vec![segment(1, 500.0), segment(2, 1500.0)]);
        assert_eq!(network.len(), 2);
        assert_eq!(network.stage, NetworkStage::Raw);
        assert_eq!(network.max_order(), 2);
        assert!((network.total_length_km() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_stream_type_labels() {
        assert_eq!(StreamType::Perennial.as_str(), "perennial");
        assert_eq!(StreamType::Intermittent.to_string(), "intermittent");

        let json = serde_json::to_string(&StreamType::Ephemeral).unwrap();
        assert_eq!(json, "\"ephemeral\"");
    }

    #[test]
    fn test_empty_network() {
        let network = StreamNetwork::new(500);
        assert!(network.is_empty());
        assert_eq!(network.max_order(), 0);
        assert_eq!(network.total_length_km(), 0.0);
    }
}
