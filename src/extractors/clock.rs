use std::sync::Arc;
use std::time::Duration;

use image::GrayImage;

use super::Extractor;
use crate::config::ClockConfig;
use crate::frame::Frame;
use crate::matcher;
use crate::templates::TemplateLibrary;
use crate::tracker::{ClockReading, Observation};

/// Reads the seven-digit IGT overlay. Digit window positions are fixed by
/// calibration, not detected. Every window must resolve to a digit or the
/// whole reading is discarded for this tick.
pub struct ClockExtractor {
    config: ClockConfig,
    library: Arc<TemplateLibrary>,
}

impl ClockExtractor {
    pub fn new(config: ClockConfig, library: Arc<TemplateLibrary>) -> Self {
        Self { config, library }
    }

    fn read_digit(&self, window: &GrayImage) -> Option<u8> {
        let mut best: Option<(u8, f32)> = None;
        for (value, template) in self.library.clock_digits.iter().enumerate() {
            let Some(hit) = matcher::best_match(window, template) else {
                continue;
            };
            if hit.score >= self.config.threshold
                && best.map_or(true, |(_, score)| hit.score > score)
            {
                best = Some((value as u8, hit.score));
            }
        }
        best.map(|(value, _)| value)
    }
}

impl Extractor for ClockExtractor {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.config.interval_ms)
    }

    fn observe(&mut self, frame: &Frame) -> Option<Observation> {
        let region = frame.crop_luma(self.config.region)?;
        if region.dimensions() != (self.config.region.width, self.config.region.height) {
            return None;
        }

        let mut digits = [0u8; 7];
        for (slot, &offset) in self.config.digit_offsets.iter().enumerate() {
            if offset + self.config.digit_width > region.width() {
                return None;
            }
            let window = image::imageops::crop_imm(
                &region,
                offset,
                0,
                self.config.digit_width,
                self.config.digit_height,
            )
            .to_image();
            // One unresolved slot discards the whole reading; partial clock
            // updates are worse than stale ones.
            digits[slot] = self.read_digit(&window)?;
        }
        Some(Observation::Clock(ClockReading::from_digits(digits)))
    }
}
