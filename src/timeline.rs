//! Mapping between processed-frame ordinals and source-video time
//!
//! Sub-sampled runs process every `stride`-th source frame, so processed-loop
//! indices and source frame indices diverge. Everything that reports frame
//! numbers, timestamps or durations goes through one clock so the two units
//! are never conflated.

use std::time::Duration;

/// Reconstructs source frame indices and wall-clock timestamps for a
/// (possibly sub-sampled) processing run.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    /// Process every `stride`-th source frame (1 = every frame)
    stride: u32,
    /// Source video frame rate
    frame_rate: f64,
}

impl FrameClock {
    pub fn new(stride: u32, frame_rate: f64) -> Self {
        debug_assert!(stride >= 1 && frame_rate > 0.0);
        Self { stride, frame_rate }
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Source frame index of the `n`-th processed frame
    pub fn source_index(&self, processed_idx: u64) -> u64 {
        processed_idx * self.stride as u64
    }

    /// Timestamp in seconds of the `n`-th processed frame within the source
    /// video
    pub fn timestamp(&self, processed_idx: u64) -> f64 {
        self.source_index(processed_idx) as f64 / self.frame_rate
    }

    /// Reconstructed source-video duration covered by `frames_processed`
    /// processed frames
    pub fn video_length_seconds(&self, frames_processed: u64) -> f64 {
        (frames_processed * self.stride as u64) as f64 / self.frame_rate
    }

    /// Achieved throughput: processed frames (not source frames) per second
    /// of wall-clock time
    pub fn achieved_fps(&self, frames_processed: u64, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            frames_processed as f64 / secs
        } else {
            0.0
        }
    }
}

impl Default for FrameClock {
    /// Every frame of an assumed 30 fps source
    fn default() -> Self {
        Self::new(1, 30.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn subsampled_mapping() {
        let clock = FrameClock::new(4, 30.0);
        assert_eq!(clock.source_index(10), 40);
        assert_abs_diff_eq!(clock.timestamp(10), 1.3333333, epsilon = 1e-6);
    }

    #[test]
    fn unit_stride_is_identity() {
        let clock = FrameClock::new(1, 30.0);
        assert_eq!(clock.source_index(42), 42);
        assert_abs_diff_eq!(clock.timestamp(30), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn duration_counts_source_frames() {
        let clock = FrameClock::new(4, 30.0);
        // 90 processed frames cover 360 source frames = 12 seconds
        assert_abs_diff_eq!(clock.video_length_seconds(90), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn fps_uses_processed_frame_denominator() {
        let clock = FrameClock::new(4, 30.0);
        let fps = clock.achieved_fps(60, Duration::from_secs(4));
        assert_abs_diff_eq!(fps, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_elapsed_yields_zero_fps() {
        let clock = FrameClock::default();
        assert_eq!(clock.achieved_fps(10, Duration::ZERO), 0.0);
    }
}
