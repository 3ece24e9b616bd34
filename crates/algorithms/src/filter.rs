//! Artifact filtering
//!
//! Drops segments that are more likely raster artifacts than channels:
//! too short, draining too little area, geometrically degenerate, or
//! suspiciously straight at short length. Every drop is recorded with
//! its reason so QA can audit what the thresholds removed.

use hydrotrace_core::vector::{NetworkStage, StreamNetwork, StreamSegment};
use hydrotrace_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Filter thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Minimum channel length in meters
    pub min_length_m: f64,
    /// Minimum contributing drainage area in square kilometers
    pub min_drainage_area_sqkm: f64,
    /// Segments below this sinuosity are straight enough to suspect
    pub sinuosity_threshold: f64,
    /// Straightness only matters below this length in meters
    pub sinuosity_length_cap_m: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_length_m: 25.0,
            min_drainage_area_sqkm: 0.01,
            sinuosity_threshold: 1.1,
            sinuosity_length_cap_m: 100.0,
        }
    }
}

impl FilterConfig {
    /// Check that every threshold is usable
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("min_length_m", self.min_length_m),
            ("min_drainage_area_sqkm", self.min_drainage_area_sqkm),
            ("sinuosity_length_cap_m", self.sinuosity_length_cap_m),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidParameter {
                    name,
                    value: value.to_string(),
                    reason: "must be a finite non-negative number".to_string(),
                });
            }
        }

        if !self.sinuosity_threshold.is_finite() || self.sinuosity_threshold < 1.0 {
            return Err(Error::InvalidParameter {
                name: "sinuosity_threshold",
                value: self.sinuosity_threshold.to_string(),
                reason: "sinuosity is floored at 1.0, so the threshold must be at least 1.0"
                    .to_string(),
            });
        }

        Ok(())
    }
}

/// Why a segment was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    LengthTooShort,
    DrainageAreaTooSmall,
    Degenerate,
    TooStraight,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::LengthTooShort => "length_too_short",
            DropReason::DrainageAreaTooSmall => "drainage_area_too_small",
            DropReason::Degenerate => "degenerate",
            DropReason::TooStraight => "too_straight",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A removed segment and the rule that removed it
#[derive(Debug, Clone)]
pub struct DroppedSegment {
    pub segment: StreamSegment,
    pub reason: DropReason,
}

/// Filtered network plus the audit trail of removals
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub network: StreamNetwork,
    pub dropped: Vec<DroppedSegment>,
}

fn drop_reason(segment: &StreamSegment, config: &FilterConfig) -> Option<DropReason> {
    if segment.length_m < config.min_length_m {
        return Some(DropReason::LengthTooShort);
    }

    let area = segment.drainage_area_sqkm.unwrap_or(0.0);
    if segment.boundary_artifact || area < config.min_drainage_area_sqkm {
        return Some(DropReason::DrainageAreaTooSmall);
    }

    let Some(sinuosity) = segment.sinuosity else {
        return Some(DropReason::Degenerate);
    };

    if sinuosity < config.sinuosity_threshold && segment.length_m < config.sinuosity_length_cap_m
    {
        return Some(DropReason::TooStraight);
    }

    None
}

/// Filter an attributed network.
///
/// Rules apply in a fixed order (length, drainage area, degeneracy,
/// straightness) and the first match wins, so audit counts are
/// unambiguous. Kept segments preserve their input order.
pub fn filter_network(network: StreamNetwork, config: &FilterConfig) -> Result<FilterOutcome> {
    config.validate()?;

    if network.stage == NetworkStage::Raw {
        return Err(Error::Other(
            "cannot filter a raw network: run attribution first".to_string(),
        ));
    }

    let threshold = network.threshold;
    let mut kept = Vec::new();
    let mut dropped = Vec::new();

    for segment in network {
        match drop_reason(&segment, config) {
            Some(reason) => dropped.push(DroppedSegment { segment, reason }),
            None => kept.push(segment),
        }
    }

    Ok(FilterOutcome {
        network: StreamNetwork {
            threshold,
            stage: NetworkStage::Filtered,
            segments: kept,
        },
        dropped,
    })
}

/// Artifact filtering algorithm
#[derive(Debug, Clone, Default)]
pub struct ArtifactFilter;

impl Algorithm for ArtifactFilter {
    type Input = StreamNetwork;
    type Output = FilterOutcome;
    type Params = FilterConfig;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Artifact Filter"
    }

    fn description(&self) -> &'static str {
        "Remove spurious segments from an attributed stream network"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        filter_network(input, &params)
    }
}
