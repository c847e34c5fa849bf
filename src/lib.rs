//! Derives live speedrun state from a raw video stream by matching fixed
//! HUD regions against reference templates. A capture task keeps the latest
//! frame in a shared slot; independent extractor tasks sample it on their
//! own schedules and feed observations into a single [`RunTracker`].

pub mod capture;
pub mod config;
pub mod controller;
pub mod extractors;
pub mod frame;
pub mod matcher;
pub mod notify;
pub mod templates;
pub mod tracker;

pub use capture::{FrameSource, RawVideoSource};
pub use config::WatcherConfig;
pub use controller::Watcher;
pub use frame::{Frame, FrameBuffer};
pub use notify::{LogNotifier, Notifier};
pub use templates::TemplateLibrary;
pub use tracker::{Observation, RunTracker, TrackerSnapshot};
