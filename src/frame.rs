use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// 8-bit greyscale
    Luma8,
    /// Packed 8-bit RGB
    Rgb24,
    /// Packed 8-bit RGBA
    Rgba8,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Luma8 => 1,
            FrameFormat::Rgb24 => 3,
            FrameFormat::Rgba8 => 4,
        }
    }
}

/// Frame data structure containing raw frame data and metadata
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Unique frame identifier
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared ownership for efficiency)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
}

impl FrameData {
    /// Create a new frame data instance
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Get the expected frame size in bytes
    pub fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        self.data.len() == self.expected_size()
    }

    /// Get frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Greyscale snapshot of the frame for raster-based engines.
    ///
    /// Luma frames share their buffer; colour frames are converted with the
    /// integer BT.601 weights. Returns `None` when the buffer is truncated.
    pub fn to_luma(&self) -> Option<Arc<Vec<u8>>> {
        if !self.validate_size() {
            return None;
        }

        match self.format {
            FrameFormat::Luma8 => Some(Arc::clone(&self.data)),
            FrameFormat::Rgb24 | FrameFormat::Rgba8 => {
                let stride = self.format.bytes_per_pixel();
                let luma = self
                    .data
                    .chunks_exact(stride)
                    .map(|px| {
                        let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
                        ((299 * r + 587 * g + 114 * b) / 1000) as u8
                    })
                    .collect();
                Some(Arc::new(luma))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_luma_frame_shares_buffer() {
        let frame = FrameData::new(1, SystemTime::now(), vec![7u8; 6], 3, 2, FrameFormat::Luma8);
        let luma = frame.to_luma().unwrap();
        assert!(Arc::ptr_eq(&luma, &frame.data));
    }

    #[test]
    fn test_rgb_conversion() {
        let data = vec![255, 255, 255, 0, 0, 0];
        let frame = FrameData::new(2, SystemTime::now(), data, 2, 1, FrameFormat::Rgb24);
        let luma = frame.to_luma().unwrap();
        assert_eq!(luma.as_slice(), &[255, 0]);
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let frame = FrameData::new(3, SystemTime::now(), vec![0u8; 5], 2, 1, FrameFormat::Rgba8);
        assert!(!frame.validate_size());
        assert!(frame.to_luma().is_none());
    }

    #[test]
    fn test_age_counts_from_capture_time() {
        let captured = SystemTime::now() - Duration::from_millis(250);
        let frame = FrameData::new(4, captured, vec![0u8; 1], 1, 1, FrameFormat::Luma8);
        assert!(frame.age_ms() >= 250);

        // Clock skew never yields a negative age
        let skewed = SystemTime::now() + Duration::from_secs(60);
        let frame = FrameData::new(5, skewed, vec![0u8; 1], 1, 1, FrameFormat::Luma8);
        assert_eq!(frame.age_ms(), 0);
    }
}
