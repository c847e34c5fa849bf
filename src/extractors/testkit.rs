//! Shared helpers for extractor tests: deterministic synthetic templates
//! and a template library assembled from them.

use std::collections::HashMap;

use image::{GrayImage, RgbImage};

use crate::templates::TemplateLibrary;

/// Deterministic binary pattern; distinct seeds give patterns that are not
/// affine-related, so cross-scores stay near zero.
pub fn test_pattern(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let mut v = x.wrapping_mul(374_761_393)
            ^ y.wrapping_mul(668_265_263)
            ^ seed.wrapping_mul(2_246_822_519);
        v ^= v >> 13;
        v = v.wrapping_mul(1_274_126_177);
        v ^= v >> 16;
        image::Luma([if v & 1 == 0 { 255 } else { 0 }])
    })
}

/// Paints a gray template into an RGB frame as neutral-gray pixels, so the
/// luma conversion recovers it exactly.
pub fn paint_gray(image: &mut RgbImage, template: &GrayImage, at_x: u32, at_y: u32) {
    for (x, y, pixel) in template.enumerate_pixels() {
        let v = pixel.0[0];
        image.put_pixel(at_x + x, at_y + y, image::Rgb([v, v, v]));
    }
}

/// A library with no templates at all; tests fill in the sets they need.
pub fn empty_library() -> TemplateLibrary {
    TemplateLibrary {
        clock_digits: Vec::new(),
        biome_banner: GrayImage::new(0, 0),
        biomes: Vec::new(),
        biome_names: HashMap::new(),
        milestones: Vec::new(),
        priorities: HashMap::new(),
        status: Vec::new(),
        coord_gate: GrayImage::new(0, 0),
        coord_glyphs: Vec::new(),
    }
}

pub fn library_with_clock_digits(width: u32, height: u32) -> TemplateLibrary {
    let mut library = empty_library();
    library.clock_digits = (0..10u32)
        .map(|digit| test_pattern(width, height, 100 + digit))
        .collect();
    library
}
