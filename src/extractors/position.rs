use std::sync::Arc;
use std::time::Duration;

use image::{GrayImage, RgbImage};

use super::Extractor;
use crate::config::PositionConfig;
use crate::frame::Frame;
use crate::matcher;
use crate::templates::TemplateLibrary;
use crate::tracker::Observation;

/// Reads the three-field coordinate line from the debug HUD. Glyphs sit on
/// a fixed horizontal grid with an extra jump between fields; anything that
/// breaks the grid or yields more or fewer than three numbers discards the
/// whole tick rather than reporting a half-read point.
pub struct PositionExtractor {
    config: PositionConfig,
    library: Arc<TemplateLibrary>,
}

impl PositionExtractor {
    pub fn new(config: PositionConfig, library: Arc<TemplateLibrary>) -> Self {
        Self { config, library }
    }

    fn gate_visible(&self, frame: &Frame) -> bool {
        let Some(region) = frame.crop_luma(self.config.gate_region) else {
            return false;
        };
        matcher::best_match(&region, &self.library.coord_gate)
            .is_some_and(|hit| hit.score >= self.config.gate_threshold)
    }

    /// All grid-aligned glyph hits in the strip, left to right. Overlapping
    /// hits at the same x keep the higher score.
    fn locate_glyphs(&self, strip: &GrayImage) -> Vec<(u32, char)> {
        let stride = self.config.glyph_stride as i64;
        let mut found: Vec<(u32, char, f32)> = Vec::new();
        for (glyph, template) in &self.library.coord_glyphs {
            for hit in matcher::matches_above(strip, template, self.config.glyph_threshold) {
                let on_grid = self
                    .config
                    .group_anchors
                    .iter()
                    .any(|&anchor| (hit.x as i64 + anchor as i64).rem_euclid(stride) == 0);
                if !on_grid {
                    continue;
                }
                match found.iter_mut().find(|(x, _, _)| *x == hit.x) {
                    Some(entry) if hit.score > entry.2 => *entry = (hit.x, *glyph, hit.score),
                    Some(_) => {}
                    None => found.push((hit.x, *glyph, hit.score)),
                }
            }
        }
        found.sort_by_key(|(x, _, _)| *x);
        found
            .into_iter()
            .map(|(x, glyph, _)| (x, glyph))
            .collect()
    }

    /// Splits the glyph row into fields by grid misalignment: a glyph off
    /// the expected stride closes the current field and shifts the grid by
    /// the inter-field jump.
    fn assemble_fields(&self, glyphs: &[(u32, char)]) -> Option<[i64; 3]> {
        glyphs.first()?;
        let stride = self.config.glyph_stride as i64;
        let mut jump = 0i64;
        let mut fields: Vec<i64> = Vec::new();
        let mut text = String::new();
        for &(x, glyph) in glyphs {
            if (x as i64 - jump).rem_euclid(stride) != 0 {
                fields.push(text.parse().ok()?);
                text.clear();
                jump += self.config.field_jump as i64;
                if fields.len() >= 3 {
                    break;
                }
            }
            text.push(glyph);
        }
        if fields.len() >= 3 {
            // A fourth field means the strip was misread.
            return None;
        }
        fields.push(text.parse().ok()?);
        if fields.len() != 3 {
            return None;
        }
        Some([fields[0], fields[1], fields[2]])
    }
}

/// Masks everything outside the near-white band the HUD text is drawn in,
/// so terrain behind the translucent HUD cannot shadow-match a glyph.
fn isolate_hud_text(strip: &RgbImage, white_floor: u8) -> GrayImage {
    let mut masked = strip.clone();
    for pixel in masked.pixels_mut() {
        if pixel.0.iter().any(|&channel| channel < white_floor) {
            *pixel = image::Rgb([0, 0, 0]);
        }
    }
    image::imageops::grayscale(&masked)
}

impl Extractor for PositionExtractor {
    fn name(&self) -> &'static str {
        "position"
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.config.interval_ms)
    }

    fn observe(&mut self, frame: &Frame) -> Option<Observation> {
        if !self.gate_visible(frame) {
            return None;
        }
        let strip = frame.crop(self.config.digits_region)?;
        let text = isolate_hud_text(&strip, self.config.white_floor);
        let glyphs = self.locate_glyphs(&text);
        let point = self.assemble_fields(&glyphs)?;
        Some(Observation::Position(point))
    }
}
