//! Batch video analysis pipeline
//!
//! Drives one video start to finish: decode -> detect -> associate -> track
//! update -> threat classify/aggregate -> frame record, then assembles and
//! persists the analysis report. A single logical thread owns the whole run;
//! nothing here is shared across runs except the injected alert log.

use crate::alerts::AlertLog;
use crate::detector::{Associator, ObjectDetector};
use crate::error::Result;
use crate::frame::FrameImage;
use crate::report::{AnalysisReport, PerformanceMetrics, ReportBuilder, ReportStore};
use crate::threat::{ThreatAggregator, ThreatPolicy, ThreatSummary};
use crate::timeline::FrameClock;
use crate::track_store::TrackStore;
use crate::trajectory::EstimatorConfig;
use crate::types::{Detection, FrameRecord, Position};
use std::path::PathBuf;
use std::time::Instant;

/// Configuration for a batch analysis run
#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    /// Assumed source-video frame rate
    pub frame_rate: f64,
    /// Process every `stride`-th source frame
    pub stride: u32,
    /// Evict tracks not updated for this many processed frames
    pub max_track_age_frames: u64,
    /// Trajectory estimator noise parameters
    pub estimator: EstimatorConfig,
    /// Directory for persisted report documents
    pub report_dir: PathBuf,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            stride: 4,
            max_track_age_frames: 30,
            estimator: EstimatorConfig::default(),
            report_dir: PathBuf::from("detection_logs"),
        }
    }
}

/// How detection records are emitted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// Batch report document: absolute bounding boxes, frame-level timestamps
    Report,
    /// Streaming/radar records: normalized boxes and center positions,
    /// per-detection timestamps
    Radar,
}

/// Per-run mutable state shared by the batch and streaming drivers.
///
/// Owns the track store, aggregator and clock for exactly one video or one
/// streaming session; confirmed observations flow through here one frame at a
/// time.
pub(crate) struct AnalysisState {
    store: TrackStore,
    aggregator: ThreatAggregator,
    clock: FrameClock,
    mode: OutputMode,
    max_track_age_frames: u64,
    processed: u64,
}

impl AnalysisState {
    pub(crate) fn new(
        policy: ThreatPolicy,
        clock: FrameClock,
        estimator: EstimatorConfig,
        max_track_age_frames: u64,
        mode: OutputMode,
    ) -> Self {
        Self {
            store: TrackStore::new(estimator),
            aggregator: ThreatAggregator::new(policy),
            clock,
            mode,
            max_track_age_frames,
            processed: 0,
        }
    }

    /// Process one decoded frame through association, tracking and threat
    /// accounting. Unconfirmed observations are excluded from both trajectory
    /// and threat accounting.
    pub(crate) fn process_frame(
        &mut self,
        detector: &mut dyn ObjectDetector,
        associator: &mut dyn Associator,
        frame: &FrameImage,
        alerts: Option<&AlertLog>,
    ) -> Result<FrameRecord> {
        let tick = self.processed;
        let timestamp = self.clock.timestamp(tick);

        let raw = detector.detect(frame)?;
        let observations = associator.associate(tick, &raw)?;

        let mut detections = Vec::with_capacity(observations.len());
        for obs in &observations {
            if !obs.confirmed {
                log::debug!(
                    "Skipping unconfirmed track {} ({})",
                    obs.track_id,
                    obs.detection.class_name
                );
                continue;
            }

            let center = obs.detection.bbox.center();
            let corrected = self.store.associate_and_update(
                obs.track_id,
                &obs.detection.class_name,
                center,
                obs.confirmed,
                tick,
            );
            let velocity = self
                .store
                .get(obs.track_id)
                .map(|track| track.velocity())
                .unwrap_or((0.0, 0.0));

            let class_name = obs.detection.class_name.to_lowercase();
            let tier = self.aggregator.observe(&class_name);

            let bbox = match self.mode {
                OutputMode::Report => obs.detection.bbox,
                OutputMode::Radar => obs.detection.bbox.to_normalized(frame.width, frame.height),
            };
            let detection = Detection {
                class_name,
                confidence: obs.detection.confidence,
                bbox: bbox.to_array(),
                threat: tier,
                position: match self.mode {
                    OutputMode::Report => None,
                    OutputMode::Radar => Some(Position {
                        x: corrected.0 / frame.width as f64,
                        y: corrected.1 / frame.height as f64,
                    }),
                },
                timestamp: match self.mode {
                    OutputMode::Report => None,
                    OutputMode::Radar => Some(timestamp),
                },
                track_id: Some(obs.track_id),
                velocity: Some(velocity),
            };

            if let Some(feed) = alerts {
                feed.append(detection.clone());
            }
            detections.push(detection);
        }

        self.store.expire_stale(tick, self.max_track_age_frames);
        self.processed += 1;

        Ok(FrameRecord {
            frame_id: self.clock.source_index(tick),
            timestamp,
            detections,
        })
    }

    /// Record an undecodable frame: it keeps its slot in the reconstructed
    /// timeline but carries no detections.
    pub(crate) fn skip_frame(&mut self) -> FrameRecord {
        let tick = self.processed;
        self.processed += 1;
        FrameRecord {
            frame_id: self.clock.source_index(tick),
            timestamp: self.clock.timestamp(tick),
            detections: Vec::new(),
        }
    }

    pub(crate) fn frames_processed(&self) -> u64 {
        self.processed
    }

    pub(crate) fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub(crate) fn summary(&self) -> ThreatSummary {
        self.aggregator.snapshot()
    }
}

/// Result of one completed batch run
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    /// Where the report document was persisted; `None` when persistence
    /// failed and the run degraded to inline-only delivery
    pub report_path: Option<PathBuf>,
}

/// Synchronous batch analyzer: one video processed start to finish
pub struct VideoAnalyzer {
    detector: Box<dyn ObjectDetector>,
    associator: Box<dyn Associator>,
    policy: ThreatPolicy,
    config: AnalyzerConfig,
    alerts: Option<AlertLog>,
}

impl VideoAnalyzer {
    pub fn new(
        detector: Box<dyn ObjectDetector>,
        associator: Box<dyn Associator>,
        policy: ThreatPolicy,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            detector,
            associator,
            policy,
            config,
            alerts: None,
        }
    }

    /// Share an alert feed with other pipelines/sessions
    pub fn with_alert_log(mut self, alerts: AlertLog) -> Self {
        self.alerts = Some(alerts);
        self
    }

    /// Analyze one video given as a sequence of encoded frame payloads
    /// (already sub-sampled to the configured stride).
    ///
    /// Undecodable frames are skipped with a warning; detector or associator
    /// failure aborts the run and nothing is persisted.
    pub fn analyze<I>(&mut self, frames: I) -> Result<AnalysisOutcome>
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        // Warm-up runs outside the measured window for stable fps numbers
        self.detector.warmup()?;
        log::info!(
            "Starting batch analysis (detector: {}, stride: {})",
            self.detector.name(),
            self.config.stride
        );

        let clock = FrameClock::new(self.config.stride, self.config.frame_rate);
        let mut state = AnalysisState::new(
            self.policy.clone(),
            clock,
            self.config.estimator.clone(),
            self.config.max_track_age_frames,
            OutputMode::Report,
        );

        let started = Instant::now();
        let mut records = Vec::new();
        for payload in frames {
            let record = match FrameImage::from_bytes(&payload) {
                Ok(frame) => state.process_frame(
                    self.detector.as_mut(),
                    self.associator.as_mut(),
                    &frame,
                    self.alerts.as_ref(),
                )?,
                Err(e) => {
                    log::warn!(
                        "Skipping undecodable frame {}: {}",
                        state.frames_processed(),
                        e
                    );
                    state.skip_frame()
                }
            };
            records.push(record);
        }
        let elapsed = started.elapsed();

        let frames_processed = state.frames_processed();
        let metrics = PerformanceMetrics {
            processing_time_seconds: elapsed.as_secs_f64(),
            processed_fps: state.clock().achieved_fps(frames_processed, elapsed),
            frames_processed,
            video_length_seconds: state.clock().video_length_seconds(frames_processed),
        };

        let report = ReportBuilder::build(metrics, state.summary(), records)?;

        let store = ReportStore::new(&self.config.report_dir);
        let report_path = match store.save(&report) {
            Ok(path) => Some(path),
            Err(e) => {
                // Degrade gracefully: the caller still gets the report inline
                log::warn!("Failed to persist analysis report: {}", e);
                None
            }
        };

        log::info!(
            "Batch analysis complete: {} frames, {} detections, highest threat {}",
            frames_processed,
            report.metadata.analysis_statistics.total_detections,
            report.metadata.threat_summary.highest_threat_level
        );

        Ok(AnalysisOutcome {
            report,
            report_path,
        })
    }
}
