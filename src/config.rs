use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Pixel rectangle in source-frame coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// IGT overlay crop.
    pub region: Rect,
    /// X offset of each of the seven digit windows inside the crop.
    pub digit_offsets: [u32; 7],
    pub digit_width: u32,
    pub digit_height: u32,
    pub threshold: f32,
    pub interval_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            region: Rect::new(1683, 81, 207, 27),
            digit_offsets: [66, 84, 108, 126, 150, 168, 186],
            digit_width: 21,
            digit_height: 27,
            threshold: 0.5,
            interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeConfig {
    /// Region checked for the biome banner before any label matching.
    pub banner_region: Rect,
    /// Top-left corner of the biome label text.
    pub label_x: u32,
    pub label_y: u32,
    pub threshold: f32,
    pub interval_ms: u64,
}

impl Default for BiomeConfig {
    fn default() -> Self {
        Self {
            banner_region: Rect::new(0, 488, 83, 28),
            label_x: 249,
            label_y: 489,
            threshold: 0.5,
            interval_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Advancement banner crop.
    pub region: Rect,
    pub threshold: f32,
    pub interval_ms: u64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            region: Rect::new(461, 882, 466, 78),
            threshold: 0.5,
            interval_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub loading_region: Rect,
    pub loading_threshold: f32,
    pub generating_region: Rect,
    pub generating_threshold: f32,
    pub died_region: Rect,
    pub died_threshold: f32,
    pub spectator_region: Rect,
    pub spectator_threshold: f32,
    pub interval_ms: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            loading_region: Rect::new(771, 390, 285, 24),
            loading_threshold: 0.5,
            generating_region: Rect::new(942, 438, 33, 21),
            generating_threshold: 0.85,
            died_region: Rect::new(855, 504, 207, 24),
            died_threshold: 0.3,
            spectator_region: Rect::new(879, 555, 159, 21),
            spectator_threshold: 0.4,
            // Status changes are time-sensitive gameplay signals, so this
            // extractor runs at frame rate.
            interval_ms: 33,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Region checked for the coordinate HUD label before digit matching.
    pub gate_region: Rect,
    pub gate_threshold: f32,
    /// Strip containing the three coordinate fields.
    pub digits_region: Rect,
    pub glyph_threshold: f32,
    /// Horizontal spacing between consecutive glyphs of one field.
    pub glyph_stride: u32,
    /// Extra horizontal gap between fields.
    pub field_jump: u32,
    /// Possible x offsets of the three digit-group starts relative to the
    /// glyph grid.
    pub group_anchors: [u32; 3],
    /// Lower bound of the near-white band the HUD text is drawn in.
    pub white_floor: u8,
    /// Inter-point distance above which a fresh coordinate is treated as a
    /// misread.
    pub outlier_distance: f64,
    pub interval_ms: u64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            gate_region: Rect::new(6, 303, 75, 21),
            gate_threshold: 0.5,
            digits_region: Rect::new(101, 302, 284, 23),
            glyph_threshold: 0.8,
            glyph_stride: 18,
            field_jump: 30,
            group_anchors: [0, 30, 60],
            white_floor: 170,
            outlier_distance: 10.0,
            interval_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Pause between frame reads; keeps the buffer fresh without pinning a
    /// core on fast sources.
    pub read_pause_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { read_pause_ms: 5 }
    }
}

/// Complete watcher configuration. Defaults carry the values calibrated
/// against 1920x1080 source video; a JSON file can override any subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub clock: ClockConfig,
    pub biome: BiomeConfig,
    pub progression: ProgressionConfig,
    pub status: StatusConfig,
    pub position: PositionConfig,
    pub capture: CaptureConfig,
}

impl WatcherConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_calibrated_thresholds() {
        let config = WatcherConfig::default();
        assert_eq!(config.clock.digit_offsets.len(), 7);
        assert_eq!(config.status.generating_threshold, 0.85);
        assert_eq!(config.position.glyph_stride, 18);
        assert_eq!(config.position.outlier_distance, 10.0);
    }

    #[test]
    fn partial_override_keeps_remaining_defaults() {
        let parsed: WatcherConfig =
            serde_json::from_str(r#"{"clock": {"interval_ms": 250}}"#).unwrap();
        assert_eq!(parsed.clock.interval_ms, 250);
        assert_eq!(parsed.clock.digit_width, 21);
        assert_eq!(parsed.biome.interval_ms, 200);
    }
}
