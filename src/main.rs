use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use runwatch::{LogNotifier, RawVideoSource, TemplateLibrary, Watcher, WatcherConfig};

/// Watches an rgb24 frame stream on stdin, e.g.
/// `ffmpeg -i <stream> -f rawvideo -pix_fmt rgb24 - | runwatch`.
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let assets = PathBuf::from(env::var("RUNWATCH_ASSETS").unwrap_or_else(|_| "assets".into()));
    let config = match env::var("RUNWATCH_CONFIG") {
        Ok(path) => WatcherConfig::load(PathBuf::from(path).as_path())?,
        Err(_) => WatcherConfig::default(),
    };
    let width = read_dimension("RUNWATCH_WIDTH", 1920)?;
    let height = read_dimension("RUNWATCH_HEIGHT", 1080)?;

    let library = Arc::new(TemplateLibrary::load(&assets)?);
    let source = RawVideoSource::new(std::io::stdin(), width, height);
    let watcher = Watcher::start(config, library, Box::new(source), Arc::new(LogNotifier));
    info!("watching {width}x{height} rgb24 frames on stdin");

    let mut report = tokio::time::interval(Duration::from_secs(10));
    loop {
        tokio::select! {
            _ = report.tick() => {
                let snapshot = watcher.snapshot().await;
                info!(
                    "phase {} | biome {} | igt {} | deaths {}",
                    snapshot.phase, snapshot.biome, snapshot.clock_text, snapshot.deaths
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
            _ = watcher.until_stopped() => break,
        }
    }

    let snapshot = watcher.snapshot().await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    watcher.stop().await;
    Ok(())
}

fn read_dimension(var: &str, default: u32) -> Result<u32> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{var} must be a frame dimension in pixels")),
        Err(_) => Ok(default),
    }
}
