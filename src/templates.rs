//! Reference images and dictionaries, loaded once at startup and immutable
//! for the process lifetime.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use image::GrayImage;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::tracker::StatusKind;

pub struct TemplateLibrary {
    /// Clock digit templates, indexed by digit value.
    pub clock_digits: Vec<GrayImage>,
    /// Banner that marks the biome label as visible at all.
    pub biome_banner: GrayImage,
    /// One label template per biome id, in dictionary order.
    pub biomes: Vec<(String, GrayImage)>,
    /// Biome id -> display name.
    pub biome_names: HashMap<String, String>,
    /// One banner template per milestone, in dictionary order.
    pub milestones: Vec<(String, GrayImage)>,
    /// Milestone name -> admission priority.
    pub priorities: HashMap<String, i32>,
    /// Status screen templates in their fixed evaluation order.
    pub status: Vec<(StatusKind, GrayImage)>,
    /// Label that marks the coordinate HUD as visible.
    pub coord_gate: GrayImage,
    /// Coordinate glyph templates: digits 0-9 plus the minus sign.
    pub coord_glyphs: Vec<(char, GrayImage)>,
}

#[derive(Deserialize)]
struct BiomeDictionary {
    biome_ids: Vec<String>,
    biome_text: HashMap<String, String>,
}

#[derive(Deserialize)]
struct MilestoneDictionary {
    phases: Vec<String>,
    priority: HashMap<String, i32>,
}

impl TemplateLibrary {
    /// Loads every template and both dictionaries from an asset directory
    /// laid out as `dictionaries/*.json` + `templates/<feature>/<name>.png`.
    pub fn load(dir: &Path) -> Result<Self> {
        let biome_dict: BiomeDictionary = read_json(&dir.join("dictionaries/biomes.json"))?;
        let milestone_dict: MilestoneDictionary =
            read_json(&dir.join("dictionaries/milestones.json"))?;

        let mut clock_digits = Vec::with_capacity(10);
        for digit in 0..10 {
            clock_digits.push(load_gray(&dir.join(format!("templates/clock/{digit}.png")))?);
        }

        let biome_banner = load_gray(&dir.join("templates/biome_banner.png"))?;
        let mut biomes = Vec::with_capacity(biome_dict.biome_ids.len());
        for id in biome_dict.biome_ids {
            let template = load_gray(&dir.join(format!("templates/biomes/{id}.png")))?;
            biomes.push((id, template));
        }

        let mut milestones = Vec::with_capacity(milestone_dict.phases.len());
        for phase in milestone_dict.phases {
            let template = load_gray(&dir.join(format!("templates/milestones/{phase}.png")))?;
            milestones.push((phase, template));
        }

        let status = vec![
            (
                StatusKind::Loading,
                load_gray(&dir.join("templates/status/loading.png"))?,
            ),
            (
                StatusKind::Generating,
                load_gray(&dir.join("templates/status/generating.png"))?,
            ),
            (
                StatusKind::Died,
                load_gray(&dir.join("templates/status/died.png"))?,
            ),
            (
                StatusKind::Spectator,
                load_gray(&dir.join("templates/status/spectator.png"))?,
            ),
        ];

        let coord_gate = load_gray(&dir.join("templates/coords/gate.png"))?;
        let mut coord_glyphs = Vec::with_capacity(11);
        for digit in 0..10u32 {
            let template = load_gray(&dir.join(format!("templates/coords/{digit}.png")))?;
            coord_glyphs.push((char::from_digit(digit, 10).unwrap_or('0'), template));
        }
        coord_glyphs.push(('-', load_gray(&dir.join("templates/coords/minus.png"))?));

        Ok(Self {
            clock_digits,
            biome_banner,
            biomes,
            biome_names: biome_dict.biome_text,
            milestones,
            priorities: milestone_dict.priority,
            status,
            coord_gate,
            coord_glyphs,
        })
    }
}

fn load_gray(path: &Path) -> Result<GrayImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to load template {}", path.display()))?;
    Ok(img.to_luma8())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dictionary {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse dictionary {}", path.display()))
}
