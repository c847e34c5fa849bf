//! Normalized cross-correlation of a luma region against a reference
//! template. Scores are in [-1, 1]; a score below an extractor's threshold
//! means "feature absent this frame", never an error.

use image::GrayImage;

/// A template hit inside a search region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

/// Every placement scoring at least `threshold`. Placements where either the
/// template or the covered patch has zero variance are skipped.
pub fn matches_above(region: &GrayImage, template: &GrayImage, threshold: f32) -> Vec<Match> {
    let (region_width, region_height) = region.dimensions();
    let (template_width, template_height) = template.dimensions();
    if template_width == 0
        || template_height == 0
        || template_width > region_width
        || template_height > region_height
    {
        return Vec::new();
    }

    let template_mean = template.as_raw().iter().map(|&p| p as f32).sum::<f32>()
        / (template_width * template_height) as f32;
    let template_dev: Vec<f32> = template
        .as_raw()
        .iter()
        .map(|&p| p as f32 - template_mean)
        .collect();
    let template_energy: f32 = template_dev.iter().map(|d| d * d).sum();
    if template_energy == 0.0 {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for y in 0..=(region_height - template_height) {
        for x in 0..=(region_width - template_width) {
            let score = score_at(
                region.as_raw(),
                region_width as usize,
                x as usize,
                y as usize,
                &template_dev,
                template_energy,
                template_width as usize,
                template_height as usize,
            );
            if let Some(score) = score {
                if score >= threshold {
                    hits.push(Match { x, y, score });
                }
            }
        }
    }
    hits
}

/// Best-scoring placement, or `None` when no placement is scorable. The
/// first maximum found wins ties.
pub fn best_match(region: &GrayImage, template: &GrayImage) -> Option<Match> {
    matches_above(region, template, -1.0)
        .into_iter()
        .reduce(|best, hit| if hit.score > best.score { hit } else { best })
}

#[allow(clippy::too_many_arguments)]
fn score_at(
    region: &[u8],
    region_width: usize,
    x: usize,
    y: usize,
    template_dev: &[f32],
    template_energy: f32,
    template_width: usize,
    template_height: usize,
) -> Option<f32> {
    let count = (template_width * template_height) as f32;

    let mut sum = 0.0f32;
    for row in 0..template_height {
        let base = (y + row) * region_width + x;
        for col in 0..template_width {
            sum += region[base + col] as f32;
        }
    }
    let mean = sum / count;

    let mut cross = 0.0f32;
    let mut energy = 0.0f32;
    for row in 0..template_height {
        let base = (y + row) * region_width + x;
        for col in 0..template_width {
            let dev = region[base + col] as f32 - mean;
            cross += dev * template_dev[row * template_width + col];
            energy += dev * dev;
        }
    }
    if energy == 0.0 {
        return None;
    }
    Some(cross / (energy * template_energy).sqrt())
}
