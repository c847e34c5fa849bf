use std::sync::Arc;
use std::time::Duration;

use super::Extractor;
use crate::config::{BiomeConfig, Rect};
use crate::frame::Frame;
use crate::matcher;
use crate::templates::TemplateLibrary;
use crate::tracker::Observation;

/// Reads the biome label from the HUD. The banner template gates the whole
/// check: no banner means the label area shows something else entirely, and
/// the previously derived biome is retained.
pub struct BiomeExtractor {
    config: BiomeConfig,
    library: Arc<TemplateLibrary>,
}

impl BiomeExtractor {
    pub fn new(config: BiomeConfig, library: Arc<TemplateLibrary>) -> Self {
        Self { config, library }
    }

    fn banner_visible(&self, frame: &Frame) -> bool {
        let Some(region) = frame.crop_luma(self.config.banner_region) else {
            return false;
        };
        matcher::best_match(&region, &self.library.biome_banner)
            .is_some_and(|hit| hit.score >= self.config.threshold)
    }
}

impl Extractor for BiomeExtractor {
    fn name(&self) -> &'static str {
        "biome"
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.config.interval_ms)
    }

    fn observe(&mut self, frame: &Frame) -> Option<Observation> {
        if !self.banner_visible(frame) {
            return None;
        }

        // Labels differ in width, so each candidate gets its own exact-size
        // window at the label origin.
        let mut best: Option<(&String, f32)> = None;
        for (id, template) in &self.library.biomes {
            let window_rect = Rect::new(
                self.config.label_x,
                self.config.label_y,
                template.width(),
                template.height(),
            );
            let Some(window) = frame.crop_luma(window_rect) else {
                continue;
            };
            if window.dimensions() != template.dimensions() {
                continue;
            }
            let Some(hit) = matcher::best_match(&window, template) else {
                continue;
            };
            if hit.score >= self.config.threshold
                && best.map_or(true, |(_, score)| hit.score > score)
            {
                best = Some((id, hit.score));
            }
        }
        best.map(|(id, _)| Observation::Biome(id.clone()))
    }
}
