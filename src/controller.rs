//! Task orchestration: one blocking capture task plus one async task per
//! extractor, all tied to a single cancellation token.

use std::sync::Arc;

use log::info;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::{capture_loop, FrameSource};
use crate::config::WatcherConfig;
use crate::extractors::{
    run_extractor, BiomeExtractor, ClockExtractor, Extractor, PositionExtractor,
    ProgressionExtractor, StatusExtractor,
};
use crate::frame::FrameBuffer;
use crate::notify::Notifier;
use crate::templates::TemplateLibrary;
use crate::tracker::{RunTracker, TrackerSnapshot};

pub struct Watcher {
    tracker: Arc<Mutex<RunTracker>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Watcher {
    /// Spawns the capture task and one task per extractor. The watcher runs
    /// until [`stop`](Self::stop) or until the frame source ends, whichever
    /// comes first.
    pub fn start(
        config: WatcherConfig,
        library: Arc<TemplateLibrary>,
        source: Box<dyn FrameSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let frames = FrameBuffer::new();
        let cancel = CancellationToken::new();
        let tracker = Arc::new(Mutex::new(RunTracker::new(
            library.priorities.clone(),
            library.biome_names.clone(),
            notifier,
            config.position.outlier_distance,
        )));

        let mut tasks = Vec::new();
        {
            let frames = frames.clone();
            let cancel = cancel.clone();
            let capture = config.capture.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                capture_loop(source, frames, capture, cancel);
            }));
        }

        let extractors: Vec<Box<dyn Extractor>> = vec![
            Box::new(ClockExtractor::new(config.clock, library.clone())),
            Box::new(BiomeExtractor::new(config.biome, library.clone())),
            Box::new(ProgressionExtractor::new(
                config.progression,
                library.clone(),
            )),
            Box::new(StatusExtractor::new(config.status, library.clone())),
            Box::new(PositionExtractor::new(config.position, library)),
        ];
        for extractor in extractors {
            info!("starting {} extractor", extractor.name());
            tasks.push(tokio::spawn(run_extractor(
                extractor,
                frames.clone(),
                tracker.clone(),
                cancel.clone(),
            )));
        }

        Self {
            tracker,
            cancel,
            tasks,
        }
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        self.tracker.lock().await.snapshot()
    }

    /// Resolves once the watcher is shutting down, e.g. because the frame
    /// source reached end of stream.
    pub async fn until_stopped(&self) {
        self.cancel.cancelled().await;
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
        info!("watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::testkit::empty_library;
    use crate::frame::Frame;
    use crate::notify::LogNotifier;
    use crate::tracker::START_PHASE;

    struct EmptySource;

    impl FrameSource for EmptySource {
        fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn watcher_stops_when_the_source_ends() {
        let watcher = Watcher::start(
            WatcherConfig::default(),
            Arc::new(empty_library()),
            Box::new(EmptySource),
            Arc::new(LogNotifier),
        );

        watcher.until_stopped().await;
        let snapshot = watcher.snapshot().await;
        assert_eq!(snapshot.phase, START_PHASE);
        assert_eq!(snapshot.worlds_generated, 0);

        watcher.stop().await;
    }
}
