//! Multi-threshold pipeline
//!
//! Runs the full extraction, attribution, filtering, classification and
//! scoring chain once per accumulation threshold, then aggregates the
//! results into a QA report. Thresholds are independent and run in
//! parallel; each sees the same immutable rasters and filter settings.

use serde::{Deserialize, Serialize};

use crate::attribute::attribute_network;
use crate::confidence::score_network;
use crate::extraction::{check_alignment, extract_network, ExtractionStats};
use crate::filter::{filter_network, DroppedSegment, FilterConfig};
use crate::maybe_rayon::*;
use crate::persistence::classify_network;
use crate::qa::{qa_report, QaReport};
use hydrotrace_core::raster::Raster;
use hydrotrace_core::vector::StreamNetwork;
use hydrotrace_core::{Algorithm, Error, Result};

/// Thresholds and filter settings for a full run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Accumulation thresholds to extract, in cells
    pub thresholds: Vec<u32>,
    /// Artifact filter settings shared by every threshold
    pub filter: FilterConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![100, 250, 500, 1000],
            filter: FilterConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check the configuration before any raster work starts
    pub fn validate(&self) -> Result<()> {
        if self.thresholds.is_empty() {
            return Err(Error::InvalidParameter {
                name: "thresholds",
                value: "[]".to_string(),
                reason: "at least one extraction threshold is required".to_string(),
            });
        }
        if self.thresholds.contains(&0) {
            return Err(Error::InvalidParameter {
                name: "thresholds",
                value: "0".to_string(),
                reason: "thresholds are positive cell counts".to_string(),
            });
        }
        self.filter.validate()
    }
}

/// Everything produced for one threshold
#[derive(Debug, Clone)]
pub struct ThresholdRun {
    pub threshold: u32,
    /// Filtered, classified and scored network
    pub network: StreamNetwork,
    /// Segments removed by the filter, with reasons
    pub dropped: Vec<DroppedSegment>,
    pub stats: ExtractionStats,
}

/// Output of a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// One run per threshold, ascending
    pub runs: Vec<ThresholdRun>,
    pub report: QaReport,
}

/// Run the full pipeline over every configured threshold.
///
/// Thresholds run in ascending order with duplicates ignored. Raster
/// alignment is checked once up front so a mismatch fails before any
/// threshold starts. A threshold that yields no stream cells produces
/// an empty network, not an error.
pub fn run_pipeline(
    flow_dir: &Raster<u8>,
    flow_acc: &Raster<f64>,
    config: &PipelineConfig,
) -> Result<PipelineRun> {
    config.validate()?;
    check_alignment(flow_dir, flow_acc)?;

    let mut thresholds = config.thresholds.clone();
    thresholds.sort_unstable();
    thresholds.dedup();

    let runs = thresholds
        .into_par_iter()
        .map(|threshold| run_threshold(flow_dir, flow_acc, threshold, &config.filter))
        .collect::<Result<Vec<ThresholdRun>>>()?;

    let report = qa_report(&runs);
    Ok(PipelineRun { runs, report })
}

fn run_threshold(
    flow_dir: &Raster<u8>,
    flow_acc: &Raster<f64>,
    threshold: u32,
    filter: &FilterConfig,
) -> Result<ThresholdRun> {
    let (raw, stats) = extract_network(flow_dir, flow_acc, threshold)?;
    let attributed = attribute_network(raw, flow_dir, flow_acc)?;
    let outcome = filter_network(attributed, filter)?;
    let network = score_network(classify_network(outcome.network));

    Ok(ThresholdRun {
        threshold,
        network,
        dropped: outcome.dropped,
        stats,
    })
}

/// Full multi-threshold pipeline algorithm
#[derive(Debug, Clone, Default)]
pub struct StreamPipeline;

impl Algorithm for StreamPipeline {
    type Input = (Raster<u8>, Raster<f64>);
    type Output = PipelineRun;
    type Params = PipelineConfig;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Stream Pipeline"
    }

    fn description(&self) -> &'static str {
        "Extract, attribute, filter, classify and score stream networks over a set of thresholds"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (flow_dir, flow_acc) = input;
        run_pipeline(&flow_dir, &flow_acc, &params)
    }
}
