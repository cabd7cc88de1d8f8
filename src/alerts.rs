//! Process-wide append-only feed of classified detections
//!
//! Every session and batch run appends into one shared log; consumers fetch a
//! flat snapshot. The log is an explicitly owned, injected handle with its
//! lifecycle tied to the process, never an implicit module-level container.

use crate::types::Detection;
use std::sync::{Arc, Mutex};

/// Cheaply cloneable handle to the shared alert feed.
///
/// Appends are atomic under concurrent use; no ordering is guaranteed across
/// sessions beyond append atomicity.
#[derive(Clone, Default)]
pub struct AlertLog {
    entries: Arc<Mutex<Vec<Detection>>>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one classified detection
    pub fn append(&self, detection: Detection) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push(detection);
    }

    /// Flat snapshot of all alerts appended so far
    pub fn snapshot(&self) -> Vec<Detection> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threat::ThreatLevel;

    fn alert(class: &str) -> Detection {
        Detection {
            class_name: class.to_string(),
            confidence: 0.9,
            bbox: [0.0, 0.0, 1.0, 1.0],
            threat: ThreatLevel::High,
            position: None,
            timestamp: None,
            track_id: None,
            velocity: None,
        }
    }

    #[test]
    fn clones_share_the_same_feed() {
        let log = AlertLog::new();
        let other = log.clone();
        log.append(alert("drone"));
        other.append(alert("missile"));
        assert_eq!(log.len(), 2);
        assert_eq!(other.snapshot().len(), 2);
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let log = AlertLog::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        log.append(alert("drone"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.len(), 800);
    }
}
