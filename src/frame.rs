//! Decoded frame payloads handed to the detector

use crate::error::{AnalysisError, Result};
use image::GenericImageView;

/// One decoded video frame in RGB
#[derive(Debug, Clone)]
pub struct FrameImage {
    /// Raw RGB pixel data, row-major
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl FrameImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Decode an encoded image payload (JPEG, PNG, ...). A malformed payload
    /// is a recoverable per-frame error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AnalysisError::frame_decode(e.to_string()))?;

        let (width, height) = img.dimensions();
        let data = img.to_rgb8().into_raw();

        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Validate pixel buffer consistency
    pub fn validate(&self) -> bool {
        self.data.len() == (self.width * self.height * 3) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_payload_is_recoverable() {
        let err = FrameImage::from_bytes(&[0x00, 0x01, 0x02]).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn decodes_png_payload() {
        let img = image::RgbImage::new(8, 6);
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();

        let frame = FrameImage::from_bytes(bytes.get_ref()).unwrap();
        assert_eq!((frame.width, frame.height), (8, 6));
        assert!(frame.validate());
    }
}
