//! External collaborator seams: object detection and track association
//!
//! The detector and associator are black boxes to the analysis core. Swapping
//! model families or association algorithms must not require core changes, so
//! both sit behind traits with the smallest surface the pipeline needs.

use crate::error::Result;
use crate::frame::FrameImage;
use crate::types::RawDetection;
use std::collections::HashMap;

/// Common interface for object detectors.
///
/// Implementations are expected to apply their own confidence threshold: the
/// pipeline treats every returned detection as reportable.
pub trait ObjectDetector: Send {
    /// Detect objects in a single frame
    fn detect(&mut self, frame: &FrameImage) -> Result<Vec<RawDetection>>;

    /// Detector name (for logging/debugging)
    fn name(&self) -> &str;

    /// One-time model warm-up. Called before the measured processing window
    /// so first-invocation model cost does not skew throughput metrics.
    fn warmup(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One detection bound to a persistent track identity
#[derive(Debug, Clone, PartialEq)]
pub struct TrackObservation {
    pub track_id: u64,
    pub detection: RawDetection,
    /// True once the associator considers the track stable rather than a
    /// transient candidate
    pub confirmed: bool,
}

/// Common interface for detection-to-track association
pub trait Associator: Send {
    /// Bind the current frame's detections to persistent track identities
    fn associate(
        &mut self,
        frame_idx: u64,
        detections: &[RawDetection],
    ) -> Result<Vec<TrackObservation>>;
}

/// Scripted detector for tests and demos: replays a fixed detection sequence,
/// one entry per frame, then reports empty frames.
pub struct StubDetector {
    script: Vec<Vec<RawDetection>>,
    next_frame: usize,
}

impl StubDetector {
    pub fn new(script: Vec<Vec<RawDetection>>) -> Self {
        Self {
            script,
            next_frame: 0,
        }
    }

    /// A detector that never sees anything
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl ObjectDetector for StubDetector {
    fn detect(&mut self, _frame: &FrameImage) -> Result<Vec<RawDetection>> {
        let detections = self
            .script
            .get(self.next_frame)
            .cloned()
            .unwrap_or_default();
        self.next_frame += 1;
        Ok(detections)
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn warmup(&mut self) -> Result<()> {
        log::info!("Stub detector warmup completed");
        Ok(())
    }
}

/// Configuration for the default centroid associator
#[derive(Clone, Debug)]
pub struct AssociatorConfig {
    /// Maximum centroid distance for binding a detection to an existing track
    pub max_centroid_distance: f64,
    /// Consecutive hits before a track is confirmed
    pub min_hits: u32,
    /// Drop candidate tracks not seen for this many frames
    pub max_age_frames: u64,
}

impl Default for AssociatorConfig {
    fn default() -> Self {
        Self {
            max_centroid_distance: 100.0,
            min_hits: 1,
            max_age_frames: 30,
        }
    }
}

struct Candidate {
    center: (f64, f64),
    class_name: String,
    hits: u32,
    last_frame: u64,
}

/// Greedy nearest-centroid associator.
///
/// Good enough to run the pipeline end to end; deployments with crossing or
/// dense targets substitute their own [`Associator`].
pub struct CentroidAssociator {
    config: AssociatorConfig,
    candidates: HashMap<u64, Candidate>,
    next_track_id: u64,
}

impl CentroidAssociator {
    pub fn new(config: AssociatorConfig) -> Self {
        Self {
            config,
            candidates: HashMap::new(),
            next_track_id: 0,
        }
    }
}

impl Default for CentroidAssociator {
    fn default() -> Self {
        Self::new(AssociatorConfig::default())
    }
}

impl Associator for CentroidAssociator {
    fn associate(
        &mut self,
        frame_idx: u64,
        detections: &[RawDetection],
    ) -> Result<Vec<TrackObservation>> {
        let mut claimed: Vec<u64> = Vec::with_capacity(detections.len());
        let mut observations = Vec::with_capacity(detections.len());

        for det in detections {
            let center = det.bbox.center();

            // Nearest unclaimed same-class candidate within the gate
            let best = self
                .candidates
                .iter()
                .filter(|&(id, cand)| {
                    !claimed.contains(id) && cand.class_name == det.class_name
                })
                .map(|(&id, cand)| {
                    let dx = center.0 - cand.center.0;
                    let dy = center.1 - cand.center.1;
                    (id, (dx * dx + dy * dy).sqrt())
                })
                .filter(|(_, dist)| *dist <= self.config.max_centroid_distance)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            let track_id = match best {
                Some((id, _)) => {
                    let cand = self
                        .candidates
                        .get_mut(&id)
                        .expect("candidate id came from the map");
                    cand.center = center;
                    cand.hits += 1;
                    cand.last_frame = frame_idx;
                    id
                }
                None => {
                    let id = self.next_track_id;
                    self.next_track_id += 1;
                    self.candidates.insert(
                        id,
                        Candidate {
                            center,
                            class_name: det.class_name.clone(),
                            hits: 1,
                            last_frame: frame_idx,
                        },
                    );
                    id
                }
            };
            claimed.push(track_id);

            let confirmed = self.candidates[&track_id].hits >= self.config.min_hits;
            observations.push(TrackObservation {
                track_id,
                detection: det.clone(),
                confirmed,
            });
        }

        let max_age = self.config.max_age_frames;
        self.candidates
            .retain(|_, cand| frame_idx - cand.last_frame <= max_age);

        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn det(class: &str, x: f32) -> RawDetection {
        RawDetection::new(class, 0.9, BoundingBox::new(x, 0.0, x + 10.0, 10.0))
    }

    #[test]
    fn moving_object_keeps_its_track_id() {
        let mut assoc = CentroidAssociator::default();

        let obs = assoc.associate(0, &[det("drone", 100.0)]).unwrap();
        let id = obs[0].track_id;

        let obs = assoc.associate(1, &[det("drone", 105.0)]).unwrap();
        assert_eq!(obs[0].track_id, id);

        let obs = assoc.associate(2, &[det("drone", 111.0)]).unwrap();
        assert_eq!(obs[0].track_id, id);
    }

    #[test]
    fn different_classes_never_share_a_track() {
        let mut assoc = CentroidAssociator::default();
        let obs = assoc
            .associate(0, &[det("drone", 100.0), det("bird", 101.0)])
            .unwrap();
        assert_ne!(obs[0].track_id, obs[1].track_id);
    }

    #[test]
    fn distant_detection_opens_a_new_track() {
        let mut assoc = CentroidAssociator::default();
        let first = assoc.associate(0, &[det("drone", 0.0)]).unwrap();
        let second = assoc.associate(1, &[det("drone", 500.0)]).unwrap();
        assert_ne!(first[0].track_id, second[0].track_id);
    }

    #[test]
    fn min_hits_gates_confirmation() {
        let mut assoc = CentroidAssociator::new(AssociatorConfig {
            min_hits: 3,
            ..AssociatorConfig::default()
        });

        assert!(!assoc.associate(0, &[det("drone", 0.0)]).unwrap()[0].confirmed);
        assert!(!assoc.associate(1, &[det("drone", 2.0)]).unwrap()[0].confirmed);
        assert!(assoc.associate(2, &[det("drone", 4.0)]).unwrap()[0].confirmed);
    }

    #[test]
    fn stub_detector_replays_script_then_empty() {
        let mut stub = StubDetector::new(vec![vec![det("bird", 0.0)], vec![]]);
        let frame = FrameImage::new(vec![0; 12], 2, 2);
        assert_eq!(stub.detect(&frame).unwrap().len(), 1);
        assert!(stub.detect(&frame).unwrap().is_empty());
        assert!(stub.detect(&frame).unwrap().is_empty());
    }
}
