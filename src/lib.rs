//! Airborne Threat Analysis Pipeline
//!
//! Turns a per-frame stream of (possibly noisy, intermittent) detections from
//! a surveillance feed into stable object tracks with smoothed trajectories
//! and a single authoritative threat assessment per video or session.
//!
//! The object detector and the detection-to-track associator are external
//! collaborators behind the [`ObjectDetector`] and [`Associator`] traits;
//! everything downstream of them - trajectory estimation, track lifecycle,
//! threat classification and aggregation, timeline reconstruction and report
//! assembly - lives here.

pub mod alerts;
pub mod detector;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod report;
pub mod stream;
pub mod threat;
pub mod timeline;
pub mod track_store;
pub mod trajectory;
pub mod types;

pub use alerts::AlertLog;
pub use detector::{
    Associator, AssociatorConfig, CentroidAssociator, ObjectDetector, StubDetector,
    TrackObservation,
};
pub use error::{AnalysisError, Result};
pub use frame::FrameImage;
pub use pipeline::{AnalysisOutcome, AnalyzerConfig, VideoAnalyzer};
pub use report::{AnalysisReport, PerformanceMetrics, ReportBuilder, ReportStore};
pub use stream::{FrameAnalysis, StreamConfig, StreamSession};
pub use threat::{ThreatAggregator, ThreatLevel, ThreatPolicy, ThreatSummary};
pub use timeline::FrameClock;
pub use track_store::{Track, TrackStore};
pub use trajectory::{EstimatorConfig, TrajectoryEstimator};
pub use types::{BoundingBox, Detection, FrameRecord, Position, RawDetection};

/// Get library version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
