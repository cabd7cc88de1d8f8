//! Analysis report assembly and persistence
//!
//! The serialized document shape is a compatibility surface consumed by
//! downstream dashboards: `{metadata: {...}, frames: [...]}` with the field
//! names below. It must remain stable across runs of the same pipeline
//! version.

use crate::error::{AnalysisError, Result};
use crate::threat::{ThreatLevel, ThreatSummary};
use crate::types::FrameRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Wall-clock processing metrics for one completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Elapsed wall time, excluding detector warm-up
    pub processing_time_seconds: f64,
    /// Processed frames (not source frames) per wall-clock second
    pub processed_fps: f64,
    pub frames_processed: u64,
    /// Reconstructed source-video duration
    pub video_length_seconds: f64,
}

/// Detection counts per threat tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierCounts {
    #[serde(rename = "Critical")]
    pub critical: u64,
    #[serde(rename = "High")]
    pub high: u64,
    #[serde(rename = "Low")]
    pub low: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    pub total_detections: u64,
    pub threat_levels: TierCounts,
}

/// Metadata block of the report document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub processing_time_seconds: f64,
    pub processed_fps: f64,
    pub frames_processed: u64,
    pub video_length_seconds: f64,
    pub threat_summary: ThreatSummary,
    pub analysis_statistics: AnalysisStatistics,
    /// ISO-8601 timestamp of when the analysis completed
    pub analysis_timestamp: String,
}

/// Complete structured analysis for one video/session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: AnalysisMetadata,
    pub frames: Vec<FrameRecord>,
}

/// Assembles the final report. Pure assembly: metrics, summary and frame
/// records are taken as-is, with one consistency check — the sum of per-class
/// counters must equal the total detection count across all frame records. A
/// mismatch means aggregation and frame recording diverged mid-run and the
/// report must not be persisted.
pub struct ReportBuilder;

impl ReportBuilder {
    pub fn build(
        metrics: PerformanceMetrics,
        summary: ThreatSummary,
        frames: Vec<FrameRecord>,
    ) -> Result<AnalysisReport> {
        let recorded: u64 = frames.iter().map(|f| f.detections.len() as u64).sum();
        let counted = summary.total_detections();
        if recorded != counted {
            return Err(AnalysisError::report(format!(
                "summary counts {} detections but frame records hold {}",
                counted, recorded
            )));
        }

        let mut tiers = TierCounts::default();
        for det in frames.iter().flat_map(|f| f.detections.iter()) {
            match det.threat {
                ThreatLevel::Critical => tiers.critical += 1,
                ThreatLevel::High => tiers.high += 1,
                ThreatLevel::Low => tiers.low += 1,
                ThreatLevel::None | ThreatLevel::Unknown => {}
            }
        }

        Ok(AnalysisReport {
            metadata: AnalysisMetadata {
                processing_time_seconds: metrics.processing_time_seconds,
                processed_fps: metrics.processed_fps,
                frames_processed: metrics.frames_processed,
                video_length_seconds: metrics.video_length_seconds,
                threat_summary: summary,
                analysis_statistics: AnalysisStatistics {
                    total_detections: recorded,
                    threat_levels: tiers,
                },
                analysis_timestamp: chrono::Utc::now().to_rfc3339(),
            },
            frames,
        })
    }
}

/// Persists completed reports as JSON documents under unique identifiers
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Write the report as `detection_log_<uuid>.json` and return its path
    pub fn save(&self, report: &AnalysisReport) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("detection_log_{}.json", Uuid::new_v4()));
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, report)?;
        log::info!("Saved analysis report to {}", path.display());
        Ok(path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<AnalysisReport> {
        let file = File::open(path.as_ref())?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threat::{ThreatAggregator, ThreatPolicy};
    use crate::types::Detection;

    fn detection(class: &str, threat: ThreatLevel) -> Detection {
        Detection {
            class_name: class.to_string(),
            confidence: 0.9,
            bbox: [0.0, 0.0, 10.0, 10.0],
            threat,
            position: None,
            timestamp: None,
            track_id: Some(0),
            velocity: None,
        }
    }

    fn metrics() -> PerformanceMetrics {
        PerformanceMetrics {
            processing_time_seconds: 2.0,
            processed_fps: 1.5,
            frames_processed: 3,
            video_length_seconds: 0.4,
        }
    }

    fn summary_and_frames() -> (ThreatSummary, Vec<FrameRecord>) {
        let mut agg = ThreatAggregator::new(ThreatPolicy::default());
        agg.observe("bird");
        agg.observe("drone");
        let frames = vec![
            FrameRecord {
                frame_id: 0,
                timestamp: 0.0,
                detections: vec![detection("bird", ThreatLevel::Low)],
            },
            FrameRecord {
                frame_id: 4,
                timestamp: 4.0 / 30.0,
                detections: vec![detection("drone", ThreatLevel::High)],
            },
            FrameRecord {
                frame_id: 8,
                timestamp: 8.0 / 30.0,
                detections: vec![],
            },
        ];
        (agg.snapshot(), frames)
    }

    #[test]
    fn cross_count_invariant_holds() {
        let (summary, frames) = summary_and_frames();
        let report = ReportBuilder::build(metrics(), summary, frames).unwrap();
        assert_eq!(report.metadata.analysis_statistics.total_detections, 2);
        assert_eq!(report.metadata.analysis_statistics.threat_levels.low, 1);
        assert_eq!(report.metadata.analysis_statistics.threat_levels.high, 1);
        assert_eq!(report.metadata.analysis_statistics.threat_levels.critical, 0);
    }

    #[test]
    fn mismatched_counts_are_rejected() {
        let (summary, mut frames) = summary_and_frames();
        frames[0].detections.clear();
        let err = ReportBuilder::build(metrics(), summary, frames).unwrap_err();
        assert!(matches!(err, AnalysisError::Report(_)));
    }

    #[test]
    fn document_shape_is_stable() {
        let (summary, frames) = summary_and_frames();
        let report = ReportBuilder::build(metrics(), summary, frames).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        let metadata = &json["metadata"];
        for field in [
            "processing_time_seconds",
            "processed_fps",
            "frames_processed",
            "video_length_seconds",
            "threat_summary",
            "analysis_statistics",
            "analysis_timestamp",
        ] {
            assert!(!metadata[field].is_null(), "missing metadata field {field}");
        }
        assert_eq!(metadata["threat_summary"]["highest_threat_level"], "High");

        let frame = &json["frames"][0];
        assert_eq!(frame["frame_id"], 0);
        assert_eq!(frame["detections"][0]["class"], "bird");
        assert_eq!(frame["detections"][0]["threat_level"], "Low");
        assert!(frame["detections"][0]["bounding_box"].is_array());
    }

    #[test]
    fn save_and_reload_round_trip() {
        let (summary, frames) = summary_and_frames();
        let report = ReportBuilder::build(metrics(), summary, frames).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let path = store.save(&report).unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("detection_log_"));

        let loaded = ReportStore::load(&path).unwrap();
        assert_eq!(loaded, report);
    }
}
