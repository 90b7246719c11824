//! Frame capture
//!
//! Frames are pulled synchronously, one at a time. The device behind a
//! [`FrameSource`] is released through [`CaptureGuard`] on every exit path,
//! and a [`StopSignal`] ends the loop between frames.

use crate::error::{PipelineError, Result};
use image::RgbImage;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One frame pulled from a source
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Position in the stream, starting at 0
    pub index: u64,
    pub image: RgbImage,
}

/// Anything that yields frames: a camera, a video decoder, a test script
pub trait FrameSource {
    /// Next frame, or `None` when the source is exhausted
    fn read_frame(&mut self) -> Result<Option<CapturedFrame>>;

    /// Release the underlying device
    fn release(&mut self);

    fn name(&self) -> &str {
        "source"
    }
}

/// Owns a source and releases it exactly once
pub struct CaptureGuard<S: FrameSource> {
    source: S,
    released: bool,
}

impl<S: FrameSource> CaptureGuard<S> {
    pub fn new(source: S) -> Self {
        info!("acquired frame source {}", source.name());
        Self {
            source,
            released: false,
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release now instead of on drop; later calls do nothing
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
            info!("released frame source {}", self.source.name());
        }
    }

    pub fn read_frame(&mut self) -> Result<Option<CapturedFrame>> {
        if self.released {
            return Err(PipelineError::Capture(format!(
                "{} already released",
                self.source.name()
            )));
        }
        self.source.read_frame()
    }
}

impl<S: FrameSource> Drop for CaptureGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Cancellation flag shared between the capture loop and whoever stops it
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pull frames into `handler` until the source runs dry, `stop` fires or the
/// handler fails. Returns the number of frames handled.
///
/// The source is released before this returns, whatever the outcome.
pub fn run_frame_loop<S, F>(source: S, stop: &StopSignal, mut handler: F) -> Result<u64>
where
    S: FrameSource,
    F: FnMut(CapturedFrame) -> Result<()>,
{
    let mut guard = CaptureGuard::new(source);
    let mut handled = 0;

    loop {
        if stop.is_stopped() {
            debug!("stop requested after {handled} frames");
            break;
        }
        let Some(frame) = guard.read_frame()? else {
            debug!("source exhausted after {handled} frames");
            break;
        };
        if let Err(e) = handler(frame) {
            warn!("frame loop aborted after {handled} frames: {e}");
            return Err(e);
        }
        handled += 1;
    }

    Ok(handled)
}

/// Frames held in memory, yielded in order
#[derive(Debug, Default)]
pub struct ImageSequence {
    frames: VecDeque<RgbImage>,
    next_index: u64,
}

impl ImageSequence {
    pub fn new<I: IntoIterator<Item = RgbImage>>(frames: I) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            next_index: 0,
        }
    }

    /// `count` blank frames of the given size, for replaying landmarks
    /// without video
    pub fn blank(width: u32, height: u32, count: usize) -> Self {
        Self::new((0..count).map(|_| RgbImage::new(width, height)))
    }
}

impl FrameSource for ImageSequence {
    fn read_frame(&mut self) -> Result<Option<CapturedFrame>> {
        Ok(self.frames.pop_front().map(|image| {
            let index = self.next_index;
            self.next_index += 1;
            CapturedFrame { index, image }
        }))
    }

    fn release(&mut self) {
        self.frames.clear();
    }

    fn name(&self) -> &str {
        "image-sequence"
    }
}
