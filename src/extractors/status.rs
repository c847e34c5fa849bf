use std::sync::Arc;
use std::time::Duration;

use super::Extractor;
use crate::config::{Rect, StatusConfig};
use crate::frame::Frame;
use crate::matcher;
use crate::templates::TemplateLibrary;
use crate::tracker::{Observation, StatusKind};

/// Recognizes full-screen status states (loading, world generation, death,
/// spectator). Unlike the other extractors this one reports on every tick,
/// including "no status visible", so the tracker can edge-trigger the
/// transition actions.
pub struct StatusExtractor {
    config: StatusConfig,
    library: Arc<TemplateLibrary>,
}

impl StatusExtractor {
    pub fn new(config: StatusConfig, library: Arc<TemplateLibrary>) -> Self {
        Self { config, library }
    }

    /// Each status screen has its own search window and its own calibrated
    /// threshold; the tinted death-screen text needs a much looser cutoff
    /// than the crisp generation label.
    fn window_for(&self, kind: StatusKind) -> (Rect, f32) {
        match kind {
            StatusKind::Loading => (self.config.loading_region, self.config.loading_threshold),
            StatusKind::Generating => (
                self.config.generating_region,
                self.config.generating_threshold,
            ),
            StatusKind::Died => (self.config.died_region, self.config.died_threshold),
            StatusKind::Spectator => (
                self.config.spectator_region,
                self.config.spectator_threshold,
            ),
        }
    }
}

impl Extractor for StatusExtractor {
    fn name(&self) -> &'static str {
        "status"
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.config.interval_ms)
    }

    fn observe(&mut self, frame: &Frame) -> Option<Observation> {
        for (kind, template) in &self.library.status {
            let (rect, threshold) = self.window_for(*kind);
            let Some(window) = frame.crop_luma(rect) else {
                continue;
            };
            let Some(hit) = matcher::best_match(&window, template) else {
                continue;
            };
            if hit.score >= threshold {
                return Some(Observation::Status(Some(*kind)));
            }
        }
        Some(Observation::Status(None))
    }
}
