use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use image::{GrayImage, RgbImage};

use crate::config::Rect;

/// A single decoded video frame. Immutable once published; extractors only
/// ever read crops of it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub received_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            received_at: Utc::now(),
        }
    }

    /// Builds a frame from packed rgb24 bytes. Returns `None` when the byte
    /// count does not match the geometry.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(Self::new)
    }

    /// Crops `rect`, clamped to the frame bounds. `None` when the rectangle
    /// lies outside the frame entirely (undersized source video).
    pub fn crop(&self, rect: Rect) -> Option<RgbImage> {
        if rect.x >= self.image.width() || rect.y >= self.image.height() {
            return None;
        }
        let width = rect.width.min(self.image.width() - rect.x);
        let height = rect.height.min(self.image.height() - rect.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(image::imageops::crop_imm(&self.image, rect.x, rect.y, width, height).to_image())
    }

    pub fn crop_luma(&self, rect: Rect) -> Option<GrayImage> {
        self.crop(rect).map(|img| image::imageops::grayscale(&img))
    }
}

/// Single most-recent-frame slot shared between the capture loop and every
/// extractor. Readers clone out an `Arc`; overwritten frames are simply
/// dropped, so a slow extractor skips frames rather than lagging behind.
#[derive(Clone, Default)]
pub struct FrameBuffer {
    slot: Arc<Mutex<Option<Arc<Frame>>>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: Frame) {
        *self.slot.lock().unwrap() = Some(Arc::new(frame));
    }

    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.slot.lock().unwrap().clone()
    }
}
