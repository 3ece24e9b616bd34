//! Persistence classification
//!
//! Assigns each segment a flow-persistence class (perennial, intermittent,
//! ephemeral) from its contributing drainage area. Class boundaries are
//! inclusive at the lower edge: exactly 5.0 km² is perennial and exactly
//! 0.5 km² is intermittent.

use hydrotrace_core::vector::{StreamNetwork, StreamType};
use hydrotrace_core::{Algorithm, Error, Result};

/// Minimum drainage area for a perennial stream, in km²
pub const PERENNIAL_MIN_SQKM: f64 = 5.0;

/// Minimum drainage area for an intermittent stream, in km²
pub const INTERMITTENT_MIN_SQKM: f64 = 0.5;

/// Classify a drainage area into a persistence class.
///
/// Total over all inputs: a missing or non-finite area falls through to
/// [`StreamType::Ephemeral`], the most conservative class.
pub fn classify_drainage_area(drainage_area_sqkm: Option<f64>) -> StreamType {
    match drainage_area_sqkm {
        Some(area) if area >= PERENNIAL_MIN_SQKM => StreamType::Perennial,
        Some(area) if area >= INTERMITTENT_MIN_SQKM => StreamType::Intermittent,
        _ => StreamType::Ephemeral,
    }
}

/// Set the persistence class on every segment of a network.
///
/// Returns a new network at the same stage; classification adds an
/// attribute and never changes which segments are present.
pub fn classify_network(network: StreamNetwork) -> StreamNetwork {
    let StreamNetwork {
        threshold,
        stage,
        segments,
    } = network;

    let segments = segments
        .into_iter()
        .map(|mut segment| {
            segment.stream_type = Some(classify_drainage_area(segment.drainage_area_sqkm));
            segment
        })
        .collect();

    StreamNetwork {
        threshold,
        stage,
        segments,
    }
}

/// Persistence classification algorithm
#[derive(Debug, Clone, Default)]
pub struct ClassifyPersistence;

impl Algorithm for ClassifyPersistence {
    type Input = StreamNetwork;
    type Output = StreamNetwork;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Persistence Classification"
    }

    fn description(&self) -> &'static str {
        "Classify segments as perennial, intermittent or ephemeral from drainage area"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        Ok(classify_network(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::line_string;
    use hydrotrace_core::vector::{NetworkStage, StreamSegment, StreamType};

    fn segment(drainage: Option<f64>) -> StreamSegment {
        StreamSegment {
            geometry: line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)],
            order: 1,
            flow_accum_threshold: 100,
            length_m: 100.0,
            length_km: 0.1,
            drainage_area_sqkm: drainage,
            sinuosity: Some(1.0),
            stream_type: None,
            confidence_score: None,
            boundary_artifact: false,
        }
    }

    #[test]
    fn test_class_boundaries_inclusive() {
        assert_eq!(classify_drainage_area(Some(5.0)), StreamType::Perennial);
        assert_eq!(classify_drainage_area(Some(12.0)), StreamType::Perennial);
        assert_eq!(
            classify_drainage_area(Some(4.999)),
            StreamType::Intermittent
        );
        assert_eq!(classify_drainage_area(Some(0.5)), StreamType::Intermittent);
        assert_eq!(classify_drainage_area(Some(0.499)), StreamType::Ephemeral);
        assert_eq!(classify_drainage_area(Some(0.0)), StreamType::Ephemeral);
    }

    #[test]
    fn test_missing_or_invalid_area_is_ephemeral() {
        assert_eq!(classify_drainage_area(None), StreamType::Ephemeral);
        assert_eq!(classify_drainage_area(Some(f64::NAN)), StreamType::Ephemeral);
    }

    #[test]
    fn test_classify_network_covers_every_segment() {
        let network = StreamNetwork {
            threshold: 250,
            stage: NetworkStage::Filtered,
            segments: vec![segment(Some(7.2)), segment(Some(1.0)), segment(None)],
        };

        let classified = classify_network(network);

        assert_eq!(classified.stage, NetworkStage::Filtered);
        assert_eq!(classified.threshold, 250);
        let types: Vec<_> = classified
            .segments
            .iter()
            .map(|s| s.stream_type)
            .collect();
        assert_eq!(
            types,
            vec![
                Some(StreamType::Perennial),
                Some(StreamType::Intermittent),
                Some(StreamType::Ephemeral),
            ]
        );
    }
}
