//! # Hydrotrace Algorithms
//!
//! Stream network extraction and analysis from DEM flow derivatives.
//!
//! ## Pipeline stages
//!
//! - **extraction**: accumulation thresholding, Strahler ordering, vectorization
//! - **attribute**: length, sinuosity and drainage area per segment
//! - **filter**: artifact removal with audited drop reasons
//! - **persistence**: perennial / intermittent / ephemeral classification
//! - **confidence**: composite confidence scoring
//! - **qa**: multi-threshold quality report
//! - **watershed**: pour point snapping and upstream delineation

pub mod attribute;
pub mod confidence;
pub mod extraction;
pub mod filter;
pub mod geometry;
pub mod persistence;
pub mod pipeline;
pub mod qa;
pub mod watershed;

mod d8;
mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::attribute::{attribute_network, AttributeNetwork};
    pub use crate::confidence::{confidence_score, score_network, ConfidenceBand, ScoreConfidence};
    pub use crate::extraction::{
        extract_network, ExtractStreams, ExtractionParams, ExtractionStats,
    };
    pub use crate::filter::{
        filter_network, ArtifactFilter, DropReason, DroppedSegment, FilterConfig, FilterOutcome,
    };
    pub use crate::persistence::{classify_drainage_area, classify_network, ClassifyPersistence};
    pub use crate::pipeline::{
        run_pipeline, PipelineConfig, PipelineRun, StreamPipeline, ThresholdRun,
    };
    pub use crate::qa::{qa_report, render_markdown, QaReport, Recommendation};
    pub use crate::watershed::{
        delineate_from_outlet, delineate_watershed, snap_pour_point, watershed_statistics,
        WatershedDelineation, WatershedOutcome, WatershedParams, WatershedStats,
    };
    pub use hydrotrace_core::prelude::*;
}
