//! Confidence scoring
//!
//! Scores each segment on how likely it is to trace a real channel rather
//! than a DEM artifact. Drainage area and length carry the weight of the
//! score; sinuosity and stream order contribute smaller capped bonuses.

use hydrotrace_core::vector::{StreamNetwork, StreamSegment};
use hydrotrace_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weight of the drainage-area component
const DRAINAGE_WEIGHT: f64 = 0.4;
/// Weight of the length component
const LENGTH_WEIGHT: f64 = 0.4;
/// Drainage area at which the area component saturates, in km²
const DRAINAGE_CAP_SQKM: f64 = 10.0;
/// Length at which the length component saturates, in meters
const LENGTH_CAP_M: f64 = 1000.0;
/// Sinuosity below this earns no bonus
const SINUOSITY_BONUS_FLOOR: f64 = 1.1;
/// Bonus per unit of sinuosity above 1.0
const SINUOSITY_BONUS_RATE: f64 = 0.15;
/// Cap on the sinuosity bonus
const SINUOSITY_BONUS_MAX: f64 = 0.3;
/// Bonus per stream order above 1
const ORDER_BONUS_RATE: f64 = 0.05;
/// Cap on the order bonus
const ORDER_BONUS_MAX: f64 = 0.2;

/// Interpretation band for a confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    /// [0.7, 1.0]
    VeryHigh,
    /// [0.5, 0.7)
    High,
    /// [0.3, 0.5)
    Medium,
    /// [0.0, 0.3)
    Low,
}

impl ConfidenceBand {
    /// Band a score falls into. Non-finite scores land in `Low`.
    pub fn for_score(score: f64) -> Self {
        if score >= 0.7 {
            ConfidenceBand::VeryHigh
        } else if score >= 0.5 {
            ConfidenceBand::High
        } else if score >= 0.3 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::VeryHigh => "very high",
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
        }
    }
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Score a single segment in `[0.0, 1.0]`.
///
/// `score = 0.4 × da_score + 0.4 × length_score + sinuosity_bonus + order_bonus`
/// where `da_score = min(area / 10 km², 1)`, `length_score = min(length / 1 km, 1)`,
/// `sinuosity_bonus = min((sinuosity − 1) × 0.15, 0.3)` once sinuosity reaches 1.1,
/// and `order_bonus = min((order − 1) × 0.05, 0.2)`.
///
/// The components can sum to 1.3; the total is clamped to `[0.0, 1.0]`.
/// Missing or non-finite attributes contribute zero.
pub fn confidence_score(segment: &StreamSegment) -> f64 {
    // f64::min returns the non-NaN operand, so NaN needs an explicit guard
    let da_score = match segment.drainage_area_sqkm {
        Some(area) if area.is_finite() => (area / DRAINAGE_CAP_SQKM).min(1.0),
        _ => 0.0,
    };

    let length_score = if segment.length_m.is_finite() {
        (segment.length_m / LENGTH_CAP_M).min(1.0)
    } else {
        0.0
    };

    let sinuosity_bonus = match segment.sinuosity {
        Some(s) if s.is_finite() && s >= SINUOSITY_BONUS_FLOOR => {
            ((s - 1.0) * SINUOSITY_BONUS_RATE).min(SINUOSITY_BONUS_MAX)
        }
        _ => 0.0,
    };

    let order_bonus =
        (f64::from(segment.order.saturating_sub(1)) * ORDER_BONUS_RATE).min(ORDER_BONUS_MAX);

    (DRAINAGE_WEIGHT * da_score + LENGTH_WEIGHT * length_score + sinuosity_bonus + order_bonus)
        .clamp(0.0, 1.0)
}

/// Set the confidence score on every segment of a network.
///
/// Returns a new network at the same stage.
pub fn score_network(network: StreamNetwork) -> StreamNetwork {
    let StreamNetwork {
        threshold,
        stage,
        segments,
    } = network;

    let segments = segments
        .into_iter()
        .map(|mut segment| {
            segment.confidence_score = Some(confidence_score(&segment));
            segment
        })
        .collect();

    StreamNetwork {
        threshold,
        stage,
        segments,
    }
}

/// Confidence scoring algorithm
#[derive(Debug, Clone, Default)]
pub struct ScoreConfidence;

impl Algorithm for ScoreConfidence {
    type Input = StreamNetwork;
    type Output = StreamNetwork;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Confidence Scoring"
    }

    fn description(&self) -> &'static str {
        "Score each segment on drainage area, length, sinuosity and order"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        Ok(score_network(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo_types::line_string;
    use hydrotrace_core::vector::NetworkStage;

    fn segment(
        order: u32,
        length_m: f64,
        drainage: Option<f64>,
        sinuosity: Option<f64>,
    ) -> StreamSegment {
        StreamSegment {
            geometry: line_string![(x: 0.0, y: 0.0), (x: length_m, y: 0.0)],
            order,
            flow_accum_threshold: 100,
            length_m,
            length_km: length_m / 1000.0,
            drainage_area_sqkm: drainage,
            sinuosity,
            stream_type: None,
            confidence_score: None,
            boundary_artifact: false,
        }
    }

    #[test]
    fn test_saturated_da_and_length() {
        // Both weighted components at their caps, plus both bonuses.
        let seg = segment(3, 1200.0, Some(10.0), Some(1.4));
        let score = confidence_score(&seg);
        assert_abs_diff_eq!(score, 0.4 + 0.4 + 0.06 + 0.1, epsilon = 1e-12);
        assert_eq!(ConfidenceBand::for_score(score), ConfidenceBand::VeryHigh);
    }

    #[test]
    fn test_midrange_drainage_area() {
        // 6 km² is below the 10 km² cap, so da_score = 0.6, not 1.0.
        let seg = segment(3, 1200.0, Some(6.0), Some(1.4));
        assert_abs_diff_eq!(
            confidence_score(&seg),
            0.4 * 0.6 + 0.4 + 0.06 + 0.1,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_components_cap_independently() {
        let huge_area = segment(1, 100.0, Some(1.0e9), None);
        let modest_area = segment(1, 100.0, Some(10.0), None);
        assert_abs_diff_eq!(
            confidence_score(&huge_area),
            confidence_score(&modest_area),
            epsilon = 1e-12
        );

        let huge_order = segment(40, 100.0, None, None);
        let order_five = segment(5, 100.0, None, None);
        assert_abs_diff_eq!(
            confidence_score(&huge_order),
            confidence_score(&order_five),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_total_is_clamped_to_one() {
        // Components alone would sum to 1.3 here.
        let seg = segment(10, 5000.0, Some(100.0), Some(3.5));
        assert_abs_diff_eq!(confidence_score(&seg), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_straight_segments_earn_no_sinuosity_bonus() {
        let below_floor = segment(1, 500.0, None, Some(1.05));
        let missing = segment(1, 500.0, None, None);
        assert_abs_diff_eq!(
            confidence_score(&below_floor),
            confidence_score(&missing),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_non_finite_attributes_contribute_zero() {
        let nan_area = segment(1, 500.0, Some(f64::NAN), None);
        let no_area = segment(1, 500.0, None, None);
        assert_abs_diff_eq!(
            confidence_score(&nan_area),
            confidence_score(&no_area),
            epsilon = 1e-12
        );

        let nan_sinuosity = segment(1, 500.0, None, Some(f64::NAN));
        assert_abs_diff_eq!(
            confidence_score(&nan_sinuosity),
            confidence_score(&no_area),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(ConfidenceBand::for_score(1.0), ConfidenceBand::VeryHigh);
        assert_eq!(ConfidenceBand::for_score(0.7), ConfidenceBand::VeryHigh);
        assert_eq!(ConfidenceBand::for_score(0.69), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::for_score(0.5), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::for_score(0.49), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::for_score(0.3), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::for_score(0.29), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::for_score(0.0), ConfidenceBand::Low);
    }

    #[test]
    fn test_score_network_fills_every_segment() {
        let network = StreamNetwork {
            threshold: 500,
            stage: NetworkStage::Filtered,
            segments: vec![
                segment(1, 50.0, Some(0.2), Some(1.0)),
                segment(2, 800.0, Some(4.0), Some(1.3)),
            ],
        };

        let scored = score_network(network);

        assert_eq!(scored.stage, NetworkStage::Filtered);
        for seg in &scored.segments {
            let score = seg.confidence_score.unwrap();
            assert!(
                (0.0..=1.0).contains(&score),
                "score {score} outside [0, 1]"
            );
        }
    }
}
