//! QA reporting
//!
//! Aggregates one or more threshold runs into a read-only report: totals,
//! per-order breakdown, drainage-area and confidence histograms,
//! persistence breakdown, sinuosity statistics, data-quality counts, and
//! rule-triggered recommendations. The report is regenerated on demand
//! and never treated as authoritative state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceBand;
use crate::filter::{DropReason, DroppedSegment};
use crate::pipeline::ThresholdRun;
use hydrotrace_core::vector::{StreamSegment, StreamType};

/// Drainage-area histogram bin edges, in km²
const DRAINAGE_BIN_EDGES: [f64; 5] = [0.1, 0.5, 1.0, 5.0, 10.0];
/// Labels for the six drainage bins
const DRAINAGE_BIN_LABELS: [&str; 6] = ["<0.1", "0.1-0.5", "0.5-1.0", "1.0-5.0", "5.0-10.0", ">10.0"];
/// Sinuosity below this counts as suspiciously straight
const STRAIGHT_SINUOSITY: f64 = 1.1;
/// Low-confidence proportion above this triggers a recommendation
const LOW_CONFIDENCE_ALERT: f64 = 0.2;
/// Straight-segment proportion above this triggers a recommendation
const STRAIGHT_ALERT: f64 = 0.5;

/// Per-order count and length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order: u32,
    pub count: usize,
    pub length_km: f64,
}

/// Drainage-area statistics and histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainageSummary {
    /// Segments carrying a drainage area
    pub with_area: usize,
    pub mean_sqkm: f64,
    pub median_sqkm: f64,
    pub min_sqkm: f64,
    pub max_sqkm: f64,
    /// Counts per bin: <0.1, 0.1-0.5, 0.5-1, 1-5, 5-10, >10 km²
    pub histogram: [usize; 6],
}

/// Count and length per persistence class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceSummary {
    pub stream_type: StreamType,
    pub count: usize,
    pub length_km: f64,
}

/// Segment counts per confidence band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BandCounts {
    pub very_high: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Confidence-score statistics and band histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSummary {
    /// Segments carrying a confidence score
    pub scored: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub bands: BandCounts,
    /// Proportion of scored segments below 0.3
    pub low_fraction: f64,
}

/// Sinuosity statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinuositySummary {
    /// Segments carrying a sinuosity
    pub with_sinuosity: usize,
    pub mean: f64,
    pub median: f64,
    /// Segments with sinuosity below 1.1
    pub straight: usize,
    pub straight_fraction: f64,
}

/// Data-quality counters: what was lost before and during filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataQuality {
    /// Degenerate geometries dropped during vectorization
    pub degenerate_geometries: usize,
    /// Segments whose drainage sample fell off the grid or on nodata
    pub boundary_artifacts: usize,
    pub dropped_total: usize,
    pub dropped_length_too_short: usize,
    pub dropped_drainage_area_too_small: usize,
    pub dropped_too_straight: usize,
    pub dropped_degenerate: usize,
}

/// A rule-triggered recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    /// Too many low-confidence segments survived filtering
    RaiseFilterThresholds { low_confidence_fraction: f64 },
    /// The network is dominated by near-straight segments
    CheckDemQuality { straight_fraction: f64 },
    /// No segment drains enough area for intermittent or perennial flow
    AllEphemeral,
}

impl Recommendation {
    /// Human-readable message for the Markdown report
    pub fn message(&self) -> String {
        match self {
            Recommendation::RaiseFilterThresholds {
                low_confidence_fraction,
            } => format!(
                "**High artifact rate:** {:.1}% of segments score below 0.3 \
                 confidence. Raise `min_length_m` or `min_drainage_area_sqkm`, \
                 or extract at a coarser threshold.",
                low_confidence_fraction * 100.0
            ),
            Recommendation::CheckDemQuality { straight_fraction } => format!(
                "**Over-straight network:** {:.1}% of segments have sinuosity \
                 below 1.1. Check DEM quality or tighten the geometric filters.",
                straight_fraction * 100.0
            ),
            Recommendation::AllEphemeral => "**All segments ephemeral:** no segment drains \
                 enough area for intermittent or perennial flow. Expected at fine \
                 thresholds; use a coarser threshold for perennial-flow mapping."
                .to_string(),
        }
    }
}

/// Summary of one network (or of all networks combined)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    /// Extraction threshold in cells; `None` for the combined summary
    pub threshold: Option<u32>,
    pub segment_count: usize,
    pub total_length_km: f64,
    pub mean_length_m: f64,
    pub median_length_m: f64,
    pub orders: Vec<OrderSummary>,
    pub drainage: DrainageSummary,
    pub persistence: Vec<PersistenceSummary>,
    pub confidence: ConfidenceSummary,
    pub sinuosity: SinuositySummary,
    pub quality: DataQuality,
    pub recommendations: Vec<Recommendation>,
}

/// Full report: one summary per threshold plus a combined summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaReport {
    pub networks: Vec<NetworkSummary>,
    pub overall: NetworkSummary,
}

/// Build a report over a set of threshold runs.
pub fn qa_report(runs: &[ThresholdRun]) -> QaReport {
    let networks = runs
        .iter()
        .map(|run| {
            let segments: Vec<&StreamSegment> = run.network.segments.iter().collect();
            let dropped: Vec<&DroppedSegment> = run.dropped.iter().collect();
            summarize(
                Some(run.threshold),
                &segments,
                &dropped,
                run.stats.degenerate_dropped,
            )
        })
        .collect();

    let all_segments: Vec<&StreamSegment> = runs
        .iter()
        .flat_map(|run| run.network.segments.iter())
        .collect();
    let all_dropped: Vec<&DroppedSegment> =
        runs.iter().flat_map(|run| run.dropped.iter()).collect();
    let degenerate = runs.iter().map(|run| run.stats.degenerate_dropped).sum();
    let overall = summarize(None, &all_segments, &all_dropped, degenerate);

    QaReport { networks, overall }
}

fn summarize(
    threshold: Option<u32>,
    segments: &[&StreamSegment],
    dropped: &[&DroppedSegment],
    degenerate_geometries: usize,
) -> NetworkSummary {
    let segment_count = segments.len();
    let total_length_km: f64 = segments.iter().map(|s| s.length_km).sum();

    let mut lengths: Vec<f64> = segments.iter().map(|s| s.length_m).collect();
    let mean_length_m = mean(&lengths);
    let median_length_m = median(&mut lengths);

    let mut per_order: BTreeMap<u32, (usize, f64)> = BTreeMap::new();
    for seg in segments {
        let entry = per_order.entry(seg.order).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += seg.length_km;
    }
    let orders = per_order
        .into_iter()
        .map(|(order, (count, length_km))| OrderSummary {
            order,
            count,
            length_km,
        })
        .collect();

    let drainage = summarize_drainage(segments);
    let persistence = summarize_persistence(segments);
    let confidence = summarize_confidence(segments);
    let sinuosity = summarize_sinuosity(segments);
    let quality = count_quality(segments, dropped, degenerate_geometries);

    let mut recommendations = Vec::new();
    if confidence.scored > 0 && confidence.low_fraction > LOW_CONFIDENCE_ALERT {
        recommendations.push(Recommendation::RaiseFilterThresholds {
            low_confidence_fraction: confidence.low_fraction,
        });
    }
    if sinuosity.with_sinuosity > 0 && sinuosity.straight_fraction > STRAIGHT_ALERT {
        recommendations.push(Recommendation::CheckDemQuality {
            straight_fraction: sinuosity.straight_fraction,
        });
    }
    if segment_count > 0
        && segments
            .iter()
            .all(|s| s.stream_type == Some(StreamType::Ephemeral))
    {
        recommendations.push(Recommendation::AllEphemeral);
    }

    NetworkSummary {
        threshold,
        segment_count,
        total_length_km,
        mean_length_m,
        median_length_m,
        orders,
        drainage,
        persistence,
        confidence,
        sinuosity,
        quality,
        recommendations,
    }
}

fn summarize_drainage(segments: &[&StreamSegment]) -> DrainageSummary {
    let mut areas: Vec<f64> = segments
        .iter()
        .filter_map(|s| s.drainage_area_sqkm)
        .filter(|a| a.is_finite())
        .collect();

    let mut histogram = [0usize; 6];
    for area in &areas {
        histogram[drainage_bin(*area)] += 1;
    }

    DrainageSummary {
        with_area: areas.len(),
        mean_sqkm: mean(&areas),
        median_sqkm: median(&mut areas),
        min_sqkm: fold_min(&areas),
        max_sqkm: fold_max(&areas),
        histogram,
    }
}

fn drainage_bin(area: f64) -> usize {
    DRAINAGE_BIN_EDGES
        .iter()
        .position(|edge| area < *edge)
        .unwrap_or(DRAINAGE_BIN_EDGES.len())
}

fn summarize_persistence(segments: &[&StreamSegment]) -> Vec<PersistenceSummary> {
    [
        StreamType::Perennial,
        StreamType::Intermittent,
        StreamType::Ephemeral,
    ]
    .into_iter()
    .map(|stream_type| {
        let matching = segments
            .iter()
            .filter(|s| s.stream_type == Some(stream_type));
        let (count, length_km) = matching.fold((0usize, 0.0f64), |(c, l), s| {
            (c + 1, l + s.length_km)
        });
        PersistenceSummary {
            stream_type,
            count,
            length_km,
        }
    })
    .collect()
}

fn summarize_confidence(segments: &[&StreamSegment]) -> ConfidenceSummary {
    let mut scores: Vec<f64> = segments
        .iter()
        .filter_map(|s| s.confidence_score)
        .filter(|c| c.is_finite())
        .collect();

    let mut bands = BandCounts::default();
    for score in &scores {
        match ConfidenceBand::for_score(*score) {
            ConfidenceBand::VeryHigh => bands.very_high += 1,
            ConfidenceBand::High => bands.high += 1,
            ConfidenceBand::Medium => bands.medium += 1,
            ConfidenceBand::Low => bands.low += 1,
        }
    }

    let scored = scores.len();
    let low_fraction = if scored == 0 {
        0.0
    } else {
        bands.low as f64 / scored as f64
    };

    ConfidenceSummary {
        scored,
        mean: mean(&scores),
        median: median(&mut scores),
        min: fold_min(&scores),
        max: fold_max(&scores),
        bands,
        low_fraction,
    }
}

fn summarize_sinuosity(segments: &[&StreamSegment]) -> SinuositySummary {
    let mut values: Vec<f64> = segments
        .iter()
        .filter_map(|s| s.sinuosity)
        .filter(|s| s.is_finite())
        .collect();

    let straight = values.iter().filter(|s| **s < STRAIGHT_SINUOSITY).count();
    let with_sinuosity = values.len();
    let straight_fraction = if with_sinuosity == 0 {
        0.0
    } else {
        straight as f64 / with_sinuosity as f64
    };

    SinuositySummary {
        with_sinuosity,
        mean: mean(&values),
        median: median(&mut values),
        straight,
        straight_fraction,
    }
}

fn count_quality(
    segments: &[&StreamSegment],
    dropped: &[&DroppedSegment],
    degenerate_geometries: usize,
) -> DataQuality {
    let boundary_artifacts = segments.iter().filter(|s| s.boundary_artifact).count()
        + dropped
            .iter()
            .filter(|d| d.segment.boundary_artifact)
            .count();

    let mut quality = DataQuality {
        degenerate_geometries,
        boundary_artifacts,
        dropped_total: dropped.len(),
        ..DataQuality::default()
    };
    for d in dropped {
        match d.reason {
            DropReason::LengthTooShort => quality.dropped_length_too_short += 1,
            DropReason::DrainageAreaTooSmall => quality.dropped_drainage_area_too_small += 1,
            DropReason::TooStraight => quality.dropped_too_straight += 1,
            DropReason::Degenerate => quality.dropped_degenerate += 1,
        }
    }
    quality
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn fold_min(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

fn fold_max(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn pct_f(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

/// Render a report as Markdown.
///
/// One section per threshold; the combined section is added when the
/// report covers more than one threshold.
pub fn render_markdown(report: &QaReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# Stream Network QA Report".to_string());
    lines.push(String::new());

    for summary in &report.networks {
        render_summary(&mut lines, summary);
    }
    if report.networks.len() > 1 {
        render_summary(&mut lines, &report.overall);
    }

    lines.push("---".to_string());
    lines.push("*Generated by hydrotrace*".to_string());
    lines.push(String::new());
    lines.join("\n")
}

fn render_summary(lines: &mut Vec<String>, s: &NetworkSummary) {
    match s.threshold {
        Some(t) => lines.push(format!("## Threshold {t} cells")),
        None => lines.push("## All thresholds combined".to_string()),
    }
    lines.push(String::new());

    lines.push(format!("- **Total stream segments:** {}", s.segment_count));
    lines.push(format!(
        "- **Total stream length:** {:.2} km ({:.2} mi)",
        s.total_length_km,
        s.total_length_km * 0.621371
    ));

    if s.segment_count == 0 {
        lines.push("- No stream segments survived filtering.".to_string());
        lines.push(String::new());
        render_quality(lines, s);
        render_recommendations(lines, s);
        return;
    }

    lines.push(format!("- **Mean segment length:** {:.1} m", s.mean_length_m));
    lines.push(format!(
        "- **Median segment length:** {:.1} m",
        s.median_length_m
    ));
    lines.push(String::new());

    lines.push("### Stream Order Distribution".to_string());
    lines.push(String::new());
    lines.push("| Order | Count | % of Total | Total Length (km) | % of Length |".to_string());
    lines.push("|-------|-------|------------|-------------------|-------------|".to_string());
    for o in &s.orders {
        lines.push(format!(
            "| {} | {} | {:.1}% | {:.2} | {:.1}% |",
            o.order,
            o.count,
            pct(o.count, s.segment_count),
            o.length_km,
            pct_f(o.length_km, s.total_length_km),
        ));
    }
    lines.push(String::new());

    lines.push("### Drainage Area Distribution".to_string());
    lines.push(String::new());
    lines.push(format!(
        "- **Segments with drainage area:** {} ({:.1}%)",
        s.drainage.with_area,
        pct(s.drainage.with_area, s.segment_count)
    ));
    lines.push(format!("- **Mean drainage area:** {:.3} km²", s.drainage.mean_sqkm));
    lines.push(format!(
        "- **Median drainage area:** {:.3} km²",
        s.drainage.median_sqkm
    ));
    lines.push(format!("- **Min drainage area:** {:.3} km²", s.drainage.min_sqkm));
    lines.push(format!("- **Max drainage area:** {:.3} km²", s.drainage.max_sqkm));
    lines.push(String::new());
    lines.push("| Range (km²) | Count | % of Total |".to_string());
    lines.push("|-------------|-------|------------|".to_string());
    for (label, count) in DRAINAGE_BIN_LABELS.iter().zip(s.drainage.histogram.iter()) {
        lines.push(format!(
            "| {} | {} | {:.1}% |",
            label,
            count,
            pct(*count, s.drainage.with_area)
        ));
    }
    lines.push(String::new());

    lines.push("### Flow Persistence Classification".to_string());
    lines.push(String::new());
    lines.push("| Stream Type | Count | % of Total | Total Length (km) | % of Length |".to_string());
    lines.push("|-------------|-------|------------|-------------------|-------------|".to_string());
    for p in &s.persistence {
        lines.push(format!(
            "| {:?} | {} | {:.1}% | {:.2} | {:.1}% |",
            p.stream_type,
            p.count,
            pct(p.count, s.segment_count),
            p.length_km,
            pct_f(p.length_km, s.total_length_km),
        ));
    }
    lines.push(String::new());

    lines.push("### Confidence Score Distribution".to_string());
    lines.push(String::new());
    lines.push(format!("- **Mean confidence:** {:.3}", s.confidence.mean));
    lines.push(format!("- **Median confidence:** {:.3}", s.confidence.median));
    lines.push(format!("- **Min confidence:** {:.3}", s.confidence.min));
    lines.push(format!("- **Max confidence:** {:.3}", s.confidence.max));
    lines.push(String::new());
    lines.push("| Confidence Range | Count | % of Total | Description |".to_string());
    lines.push("|------------------|-------|------------|-------------|".to_string());
    let band_rows = [
        ("0.0 - 0.3", s.confidence.bands.low, "Low"),
        ("0.3 - 0.5", s.confidence.bands.medium, "Medium"),
        ("0.5 - 0.7", s.confidence.bands.high, "High"),
        ("0.7 - 1.0", s.confidence.bands.very_high, "Very High"),
    ];
    for (range, count, label) in band_rows {
        lines.push(format!(
            "| {} | {} | {:.1}% | {} |",
            range,
            count,
            pct(count, s.confidence.scored),
            label
        ));
    }
    lines.push(String::new());
    if s.confidence.bands.low > 0 {
        lines.push(format!(
            "**Note:** {} segments ({:.1}%) have low confidence scores (<0.3). \
             These may be DEM artifacts and should be visually inspected.",
            s.confidence.bands.low,
            s.confidence.low_fraction * 100.0
        ));
        lines.push(String::new());
    }

    lines.push("### Geometric Metrics".to_string());
    lines.push(String::new());
    lines.push(format!("- **Mean sinuosity:** {:.3}", s.sinuosity.mean));
    lines.push(format!("- **Median sinuosity:** {:.3}", s.sinuosity.median));
    lines.push(String::new());
    if s.sinuosity.straight > 0 {
        lines.push(format!(
            "**Warning:** {} segments ({:.1}%) are very straight (sinuosity < 1.1). \
             These may be DEM artifacts or channelized reaches.",
            s.sinuosity.straight,
            s.sinuosity.straight_fraction * 100.0
        ));
        lines.push(String::new());
    }

    render_quality(lines, s);
    render_recommendations(lines, s);
}

fn render_quality(lines: &mut Vec<String>, s: &NetworkSummary) {
    lines.push("### Data Quality Checks".to_string());
    lines.push(String::new());
    lines.push(format!(
        "- **Degenerate geometries (pre-filter):** {}",
        s.quality.degenerate_geometries
    ));
    lines.push(format!(
        "- **Boundary artifacts:** {}",
        s.quality.boundary_artifacts
    ));
    lines.push(format!(
        "- **Dropped by filter:** {}",
        s.quality.dropped_total
    ));
    lines.push(format!(
        "  - length too short: {}",
        s.quality.dropped_length_too_short
    ));
    lines.push(format!(
        "  - drainage area too small: {}",
        s.quality.dropped_drainage_area_too_small
    ));
    lines.push(format!(
        "  - too straight: {}",
        s.quality.dropped_too_straight
    ));
    lines.push(format!("  - degenerate: {}", s.quality.dropped_degenerate));
    lines.push(String::new());
}

fn render_recommendations(lines: &mut Vec<String>, s: &NetworkSummary) {
    lines.push("### Recommendations".to_string());
    lines.push(String::new());
    if s.recommendations.is_empty() {
        lines.push("No issues detected.".to_string());
    } else {
        for (i, rec) in s.recommendations.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, rec.message()));
        }
    }
    lines.push(String::new());
}
