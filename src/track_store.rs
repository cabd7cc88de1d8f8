//! Track lifecycle and trajectory history management
//!
//! The store exclusively owns all tracks and their estimators; no other
//! component mutates track state. Track identities are assigned by the
//! external associator, the store only follows them.

use crate::trajectory::{EstimatorConfig, TrajectoryEstimator};
use rayon::prelude::*;
use std::collections::HashMap;

/// One physical object followed across frames
#[derive(Clone, Debug)]
pub struct Track {
    pub track_id: u64,
    pub class_name: String,
    estimator: TrajectoryEstimator,
    /// Corrected positions, appended once per observed frame
    history: Vec<(f64, f64)>,
    /// Set once the associator has seen the object often enough to consider
    /// it stable
    pub confirmed: bool,
    /// Source-loop tick of the last association
    pub last_update_frame: u64,
    /// Number of successful associations
    pub hits: u32,
}

impl Track {
    fn new(
        track_id: u64,
        class_name: &str,
        center: (f64, f64),
        confirmed: bool,
        frame_idx: u64,
        config: &EstimatorConfig,
    ) -> Self {
        Self {
            track_id,
            class_name: class_name.to_string(),
            estimator: TrajectoryEstimator::new(center, config),
            history: vec![center],
            confirmed,
            last_update_frame: frame_idx,
            hits: 1,
        }
    }

    /// Trajectory of corrected positions, oldest first
    pub fn history(&self) -> &[(f64, f64)] {
        &self.history
    }

    /// Current velocity estimate (units per frame tick)
    pub fn velocity(&self) -> (f64, f64) {
        self.estimator.velocity()
    }

    /// Current position estimate
    pub fn position(&self) -> (f64, f64) {
        self.estimator.position()
    }
}

/// Owns the mapping from track identity to estimator state and position
/// history
#[derive(Default)]
pub struct TrackStore {
    tracks: HashMap<u64, Track>,
    estimator_config: EstimatorConfig,
}

impl TrackStore {
    pub fn new(estimator_config: EstimatorConfig) -> Self {
        Self {
            tracks: HashMap::new(),
            estimator_config,
        }
    }

    /// Apply one associated observation.
    ///
    /// A new `track_id` creates a track seeded at the detection center; an
    /// existing one advances its estimator by one predict+update cycle and
    /// appends the corrected position to the history. Returns the corrected
    /// position for trajectory overlays.
    pub fn associate_and_update(
        &mut self,
        track_id: u64,
        class_name: &str,
        center: (f64, f64),
        confirmed: bool,
        frame_idx: u64,
    ) -> (f64, f64) {
        match self.tracks.get_mut(&track_id) {
            Some(track) => {
                track.estimator.predict();
                let corrected = track.estimator.update(center);
                track.history.push(corrected);
                track.confirmed |= confirmed;
                track.last_update_frame = frame_idx;
                track.hits += 1;
                corrected
            }
            None => {
                log::debug!(
                    "New track {} ({}) at ({:.1}, {:.1})",
                    track_id,
                    class_name,
                    center.0,
                    center.1
                );
                let track = Track::new(
                    track_id,
                    class_name,
                    center,
                    confirmed,
                    frame_idx,
                    &self.estimator_config,
                );
                self.tracks.insert(track_id, track);
                center
            }
        }
    }

    /// Evict tracks not updated within `max_age_frames` of `current_frame`.
    /// Called once per frame tick after all associations for that frame, to
    /// bound memory on long videos.
    pub fn expire_stale(&mut self, current_frame: u64, max_age_frames: u64) {
        let before = self.tracks.len();
        self.tracks
            .retain(|_, track| current_frame - track.last_update_frame <= max_age_frames);
        let removed = before - self.tracks.len();
        if removed > 0 {
            log::debug!("Expired {} stale tracks ({} remaining)", removed, self.tracks.len());
        }
    }

    pub fn get(&self, track_id: u64) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Current (track_id, position, velocity) of every live track, for
    /// rendering trajectory overlays
    pub fn live_states(&self) -> Vec<(u64, (f64, f64), (f64, f64))> {
        self.tracks
            .par_iter()
            .map(|(&id, track)| (id, track.position(), track.velocity()))
            .collect()
    }
}
