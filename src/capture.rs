use std::io::{ErrorKind, Read};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::CaptureConfig;
use crate::frame::{Frame, FrameBuffer};

/// Opaque source of decoded frames. `Ok(None)` means end of stream (a
/// terminal condition); `Err` is a transient read failure and the frame is
/// skipped. Reconnection policy lives with the embedding process.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Reads fixed-geometry rgb24 frames from a byte stream, e.g. an
/// `ffmpeg -f rawvideo -pix_fmt rgb24` pipe on stdin.
pub struct RawVideoSource<R> {
    reader: R,
    width: u32,
    height: u32,
}

impl<R: Read> RawVideoSource<R> {
    pub fn new(reader: R, width: u32, height: u32) -> Self {
        Self {
            reader,
            width,
            height,
        }
    }
}

impl<R: Read + Send> FrameSource for RawVideoSource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut data = vec![0u8; (self.width * self.height * 3) as usize];
        match self.reader.read_exact(&mut data) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err).context("raw frame read failed"),
        }
        let frame = Frame::from_raw(self.width, self.height, data)
            .context("frame bytes do not match the configured geometry")?;
        Ok(Some(frame))
    }
}

/// Blocking capture loop: publishes every frame into the shared buffer and
/// cancels the token when the source ends, so extractors shut down before
/// the source is dropped. No buffering or backpressure anywhere; a slow
/// extractor just skips frames.
pub fn capture_loop(
    mut source: Box<dyn FrameSource>,
    frames: FrameBuffer,
    config: CaptureConfig,
    cancel: CancellationToken,
) {
    let pause = Duration::from_millis(config.read_pause_ms);
    while !cancel.is_cancelled() {
        match source.next_frame() {
            Ok(Some(frame)) => frames.publish(frame),
            Ok(None) => {
                info!("frame source reached end of stream");
                cancel.cancel();
                break;
            }
            Err(err) => warn!("frame read failed: {err:#}"),
        }
        std::thread::sleep(pause);
    }
}
