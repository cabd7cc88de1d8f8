//! Type definitions for airborne threat detection

use crate::threat::ThreatLevel;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in `[x1, y1, x2, y2]` order.
///
/// Coordinates are either pixel or normalized units; a pipeline instance uses
/// one convention consistently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Get center point coordinates
    pub fn center(&self) -> (f64, f64) {
        (
            (self.x1 + self.x2) as f64 / 2.0,
            (self.y1 + self.y2) as f64 / 2.0,
        )
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Get area of bounding box
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Convert pixel coordinates to normalized [0,1] coordinates
    pub fn to_normalized(&self, img_width: u32, img_height: u32) -> BoundingBox {
        BoundingBox {
            x1: self.x1 / img_width as f32,
            y1: self.y1 / img_height as f32,
            x2: self.x2 / img_width as f32,
            y2: self.y2 / img_height as f32,
        }
    }

    /// Serialized form used by the report document: `[x1, y1, x2, y2]`
    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Normalized 2-D position (center point) for radar-style display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Raw detector output for one object in one frame, before threat
/// classification. Confidence filtering happens upstream: detections arriving
/// here are already above the deployment threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl RawDetection {
    pub fn new<S: Into<String>>(class_name: S, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            bbox,
        }
    }
}

/// A classified detection as it appears in frame records, streaming results
/// and the alert feed. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f32,
    #[serde(rename = "bounding_box")]
    pub bbox: [f32; 4],
    #[serde(rename = "threat_level")]
    pub threat: ThreatLevel,
    /// Normalized center position, when frame dimensions are known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Reconstructed timestamp in seconds within the source video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    /// Persistent track identity assigned by the associator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u64>,
    /// Estimated velocity from the track's trajectory estimator
    /// (units per frame tick)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<(f64, f64)>,
}

/// Detections observed in one processed frame.
///
/// `frame_id` is in source-video frame units, not sub-sampled loop units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_id: u64,
    pub timestamp: f64,
    pub detections: Vec<Detection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_center_and_area() {
        let bbox = BoundingBox::new(10.0, 20.0, 30.0, 60.0);
        assert_eq!(bbox.center(), (20.0, 40.0));
        assert_eq!(bbox.area(), 800.0);
    }

    #[test]
    fn bbox_normalization() {
        let bbox = BoundingBox::new(160.0, 120.0, 480.0, 360.0);
        let norm = bbox.to_normalized(640, 480);
        assert_eq!(norm.to_array(), [0.25, 0.25, 0.75, 0.75]);
    }
}
