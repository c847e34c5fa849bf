//! Per-feature extractors. Each one crops fixed regions of the latest
//! frame, matches them against its template set, and reports what it saw;
//! the shared loop below drives every extractor on its own schedule.

mod biome;
mod clock;
mod position;
mod progression;
mod status;

#[cfg(test)]
pub(crate) mod testkit;

pub use biome::BiomeExtractor;
pub use clock::ClockExtractor;
pub use position::PositionExtractor;
pub use progression::ProgressionExtractor;
pub use status::StatusExtractor;

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::frame::{Frame, FrameBuffer};
use crate::tracker::{Observation, RunTracker};

pub trait Extractor: Send {
    fn name(&self) -> &'static str;
    fn interval(&self) -> Duration;
    /// One sampling tick. `None` means the feature could not be confirmed
    /// on this frame; the previously derived state is retained.
    fn observe(&mut self, frame: &Frame) -> Option<Observation>;
}

/// Drives one extractor until cancellation. A missing frame skips the tick;
/// frame loss is expected, not an error.
pub async fn run_extractor(
    mut extractor: Box<dyn Extractor>,
    frames: FrameBuffer,
    tracker: Arc<Mutex<RunTracker>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(extractor.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(frame) = frames.latest() else { continue };
                if let Some(observation) = extractor.observe(&frame) {
                    tracker
                        .lock()
                        .await
                        .apply_from_frame(frame.received_at, observation);
                }
            }
            _ = cancel.cancelled() => {
                debug!("{} extractor shutting down", extractor.name());
                break;
            }
        }
    }
}
