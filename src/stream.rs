//! Streaming session pipeline
//!
//! One long-lived session per inbound frame stream. Frames are processed and
//! acknowledged strictly sequentially: the bounded channels hold a single
//! frame, so a slow detector naturally throttles the sender. Every session
//! owns its own track store, aggregator and clock; sessions share only the
//! injected alert log.

use crate::alerts::AlertLog;
use crate::detector::{Associator, ObjectDetector};
use crate::error::{AnalysisError, Result};
use crate::frame::FrameImage;
use crate::pipeline::{AnalysisState, OutputMode};
use crate::threat::{ThreatPolicy, ThreatSummary};
use crate::timeline::FrameClock;
use crate::trajectory::EstimatorConfig;
use crate::types::Detection;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Streaming session configuration
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Assumed source frame rate for timestamp reconstruction
    pub frame_rate: f64,
    /// Terminate the session when no frame arrives within this window
    pub idle_timeout: Duration,
    /// Evict tracks not updated for this many frames
    pub max_track_age_frames: u64,
    /// Trajectory estimator noise parameters
    pub estimator: EstimatorConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            idle_timeout: Duration::from_secs(30),
            max_track_age_frames: 30,
            estimator: EstimatorConfig::default(),
        }
    }
}

/// Acknowledgment for one streamed frame
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Source frame index (streaming runs at stride 1)
    pub frame_id: u64,
    /// Reconstructed timestamp in seconds
    pub timestamp: f64,
    /// Classified detections with normalized boxes and center positions
    pub detections: Vec<Detection>,
}

/// One live analysis session over a frame stream.
///
/// Dropping the session (or calling [`finish`](Self::finish)) closes the
/// inbound channel; the worker drains, reports its final summary and exits.
/// Multiple sessions run concurrently without sharing any mutable state
/// beyond the alert log.
pub struct StreamSession {
    frame_tx: Option<Sender<Vec<u8>>>,
    result_rx: Receiver<Result<FrameAnalysis>>,
    worker: Option<thread::JoinHandle<ThreatSummary>>,
}

impl StreamSession {
    /// Spawn a session worker that owns the detector, associator and all
    /// per-session state.
    pub fn spawn(
        mut detector: Box<dyn ObjectDetector>,
        mut associator: Box<dyn Associator>,
        policy: ThreatPolicy,
        config: StreamConfig,
        alerts: AlertLog,
    ) -> Self {
        // Depth-1 channels: the sender blocks until the previous frame has
        // been consumed, which is the session's backpressure contract.
        let (frame_tx, frame_rx) = bounded::<Vec<u8>>(1);
        let (result_tx, result_rx) = bounded::<Result<FrameAnalysis>>(1);

        let worker = thread::spawn(move || {
            let mut state = AnalysisState::new(
                policy,
                FrameClock::new(1, config.frame_rate),
                config.estimator.clone(),
                config.max_track_age_frames,
                OutputMode::Radar,
            );
            log::info!("Streaming session worker started");

            loop {
                let payload = match frame_rx.recv_timeout(config.idle_timeout) {
                    Ok(payload) => payload,
                    Err(RecvTimeoutError::Timeout) => {
                        log::warn!(
                            "Streaming session idle for {:?}, closing",
                            config.idle_timeout
                        );
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                };

                // Malformed frames and per-frame detector failures are
                // reported to the sender; the session itself survives.
                let result = FrameImage::from_bytes(&payload).and_then(|frame| {
                    let record = state.process_frame(
                        detector.as_mut(),
                        associator.as_mut(),
                        &frame,
                        Some(&alerts),
                    )?;
                    Ok(FrameAnalysis {
                        frame_id: record.frame_id,
                        timestamp: record.timestamp,
                        detections: record.detections,
                    })
                });

                if let Err(e) = &result {
                    log::warn!(
                        "Frame {} failed: {}",
                        state.frames_processed(),
                        e
                    );
                }
                if result_tx.send(result).is_err() {
                    break;
                }
            }

            let summary = state.summary();
            log::info!(
                "Streaming session closed after {} frames (highest threat {})",
                state.frames_processed(),
                summary.highest_threat_level
            );
            summary
        });

        Self {
            frame_tx: Some(frame_tx),
            result_rx,
            worker: Some(worker),
        }
    }

    /// Submit one encoded frame and wait for its analysis.
    ///
    /// Blocks until the worker acknowledges the frame, keeping the session
    /// strictly sequential. A [`AnalysisError::FrameDecode`] or per-frame
    /// detector error fails only this frame.
    pub fn process_frame(&self, payload: Vec<u8>) -> Result<FrameAnalysis> {
        let tx = self.frame_tx.as_ref().ok_or(AnalysisError::SessionClosed)?;
        tx.send(payload).map_err(|_| AnalysisError::SessionClosed)?;
        self.result_rx
            .recv()
            .map_err(|_| AnalysisError::SessionClosed)?
    }

    /// Close the session and return the final threat summary for the run.
    pub fn finish(mut self) -> Result<ThreatSummary> {
        self.frame_tx.take();
        let worker = self.worker.take().ok_or(AnalysisError::SessionClosed)?;
        worker.join().map_err(|_| AnalysisError::SessionClosed)
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.frame_tx.take();
        if let Some(worker) = self.worker.take() {
            worker.join().ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{CentroidAssociator, StubDetector};
    use crate::threat::ThreatLevel;
    use crate::types::{BoundingBox, RawDetection};

    fn png_frame() -> Vec<u8> {
        let img = image::RgbImage::new(32, 32);
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn det(class: &str, x: f32) -> RawDetection {
        RawDetection::new(class, 0.7, BoundingBox::new(x, 8.0, x + 8.0, 16.0))
    }

    fn session(script: Vec<Vec<RawDetection>>, alerts: AlertLog) -> StreamSession {
        StreamSession::spawn(
            Box::new(StubDetector::new(script)),
            Box::new(CentroidAssociator::default()),
            ThreatPolicy::default(),
            StreamConfig::default(),
            alerts,
        )
    }

    #[test]
    fn frames_are_processed_sequentially() {
        let session = session(
            vec![vec![det("drone", 4.0)], vec![det("drone", 6.0)], vec![]],
            AlertLog::new(),
        );

        let first = session.process_frame(png_frame()).unwrap();
        assert_eq!(first.frame_id, 0);
        assert_eq!(first.detections.len(), 1);
        let d = &first.detections[0];
        assert_eq!(d.threat, ThreatLevel::High);
        assert!(d.position.is_some());
        assert!(d.timestamp.is_some());
        // Radar output is normalized to [0, 1]
        assert!(d.bbox.iter().all(|v| (0.0..=1.0).contains(v)));

        let second = session.process_frame(png_frame()).unwrap();
        assert_eq!(second.frame_id, 1);
        assert_eq!(second.detections[0].track_id, first.detections[0].track_id);

        let third = session.process_frame(png_frame()).unwrap();
        assert!(third.detections.is_empty());

        let summary = session.finish().unwrap();
        assert_eq!(summary.counts["drone"], 2);
        assert_eq!(summary.highest_threat_level, ThreatLevel::High);
    }

    #[test]
    fn malformed_frame_fails_alone() {
        let session = session(
            vec![vec![det("bird", 4.0)], vec![det("bird", 5.0)]],
            AlertLog::new(),
        );

        session.process_frame(png_frame()).unwrap();
        let err = session.process_frame(vec![0xff, 0x00]).unwrap_err();
        assert!(err.is_recoverable());
        // Session survives the bad frame
        let ok = session.process_frame(png_frame()).unwrap();
        assert_eq!(ok.detections.len(), 1);

        let summary = session.finish().unwrap();
        assert_eq!(summary.counts["bird"], 2);
    }

    #[test]
    fn sessions_are_isolated_but_share_the_alert_feed() {
        let alerts = AlertLog::new();
        let a = session(vec![vec![det("missile", 4.0)]], alerts.clone());
        let b = session(vec![vec![det("bird", 4.0)]], alerts.clone());

        a.process_frame(png_frame()).unwrap();
        b.process_frame(png_frame()).unwrap();

        let summary_a = a.finish().unwrap();
        let summary_b = b.finish().unwrap();

        // Threat state never leaks across sessions
        assert_eq!(summary_a.highest_threat_level, ThreatLevel::Critical);
        assert_eq!(summary_b.highest_threat_level, ThreatLevel::Low);

        // The shared feed saw both
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn idle_session_times_out() {
        let config = StreamConfig {
            idle_timeout: Duration::from_millis(50),
            ..StreamConfig::default()
        };
        let session = StreamSession::spawn(
            Box::new(StubDetector::empty()),
            Box::new(CentroidAssociator::default()),
            ThreatPolicy::default(),
            config,
            AlertLog::new(),
        );

        std::thread::sleep(Duration::from_millis(200));
        let err = session.process_frame(png_frame()).unwrap_err();
        assert!(matches!(err, AnalysisError::SessionClosed));
    }
}
