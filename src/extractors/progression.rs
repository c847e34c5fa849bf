use std::sync::Arc;
use std::time::Duration;

use super::Extractor;
use crate::config::ProgressionConfig;
use crate::frame::Frame;
use crate::matcher;
use crate::templates::TemplateLibrary;
use crate::tracker::Observation;

/// Scans the advancement banner area for milestone popups. Every template
/// that clears threshold is reported; admission order and priority rules
/// live in the tracker, not here.
pub struct ProgressionExtractor {
    config: ProgressionConfig,
    library: Arc<TemplateLibrary>,
}

impl ProgressionExtractor {
    pub fn new(config: ProgressionConfig, library: Arc<TemplateLibrary>) -> Self {
        Self { config, library }
    }
}

impl Extractor for ProgressionExtractor {
    fn name(&self) -> &'static str {
        "progression"
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.config.interval_ms)
    }

    fn observe(&mut self, frame: &Frame) -> Option<Observation> {
        let region = frame.crop_luma(self.config.region)?;
        let seen: Vec<String> = self
            .library
            .milestones
            .iter()
            .filter(|(_, template)| {
                matcher::best_match(&region, template)
                    .is_some_and(|hit| hit.score >= self.config.threshold)
            })
            .map(|(phase, _)| phase.clone())
            .collect();
        if seen.is_empty() {
            None
        } else {
            Some(Observation::Milestones(seen))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rect;
    use crate::extractors::testkit::{empty_library, paint_gray, test_pattern};
    use image::RgbImage;

    fn progression_config() -> ProgressionConfig {
        ProgressionConfig {
            region: Rect::new(20, 50, 160, 30),
            threshold: 0.5,
            interval_ms: 200,
        }
    }

    fn milestone_library() -> TemplateLibrary {
        let mut library = empty_library();
        library.milestones = vec![
            ("Nether".to_string(), test_pattern(40, 14, 500)),
            ("Bastion".to_string(), test_pattern(40, 14, 501)),
            ("Fortress".to_string(), test_pattern(40, 14, 502)),
        ];
        library
    }

    #[test]
    fn reports_every_banner_above_threshold() {
        let library = Arc::new(milestone_library());
        let mut extractor = ProgressionExtractor::new(progression_config(), library.clone());

        let mut image = RgbImage::new(256, 128);
        paint_gray(&mut image, &library.milestones[0].1, 24, 54);
        paint_gray(&mut image, &library.milestones[2].1, 110, 60);

        assert_eq!(
            extractor.observe(&Frame::new(image)),
            Some(Observation::Milestones(vec![
                "Nether".to_string(),
                "Fortress".to_string(),
            ]))
        );
    }

    #[test]
    fn quiet_banner_area_reports_nothing() {
        let library = Arc::new(milestone_library());
        let mut extractor = ProgressionExtractor::new(progression_config(), library);

        let image = RgbImage::new(256, 128);
        assert!(extractor.observe(&Frame::new(image)).is_none());
    }
}
