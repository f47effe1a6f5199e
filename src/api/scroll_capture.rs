//! 滚动长截图入口

use std::io;
use std::thread::{self, JoinHandle};

use log::{info, warn};

use crate::api::models::{Rect, ScrollCaptureConfig};
use crate::core::capture::{ArtifactId, ArtifactSink, CaptureLoopController, Collaborators};
use crate::core::stitch::{Compositor, Frame, StitchConfig, StitchError, StitchedImage};

/// 滚动截图 - 连续截图 + 智能拼接
///
/// ```ignore
/// let mut capture = ScrollCapture::create(config, collaborators, Box::new(sink));
/// let artifact = capture.run_scroll_capture(Rect::new(0, 120, 1280, 720))?;
/// ```
pub struct ScrollCapture {
    config: ScrollCaptureConfig,
    collaborators: Collaborators,
    sink: Box<dyn ArtifactSink>,
}

impl ScrollCapture {
    pub fn create(
        config: ScrollCaptureConfig,
        collaborators: Collaborators,
        sink: Box<dyn ArtifactSink>,
    ) -> Self {
        crate::init_logging();
        info!("🎬 ScrollCapture: created");
        Self {
            config,
            collaborators,
            sink,
        }
    }

    /// Captures the region while scrolling, stitches the frames and persists
    /// the result. Blocks for the whole session.
    pub fn run_scroll_capture(&mut self, region: Rect) -> Result<ArtifactId, StitchError> {
        if region.is_empty() {
            return Err(StitchError::EmptyRegion);
        }

        let controller = CaptureLoopController::with_config(self.config.loop_config.clone());
        let session = controller.run(region, &mut self.collaborators)?;

        let image = Compositor::with_config(self.config.stitch.clone()).stitch(&session.frames)?;
        let artifact = self.sink.persist_artifact(&image, &self.config.title)?;

        info!(
            "✅ {} complete: {} ({}x{}, {} of {} frames)",
            self.config.title,
            artifact,
            image.width,
            image.height,
            image.frame_count,
            session.frames.len()
        );
        Ok(artifact)
    }

    /// Runs the session on a dedicated worker thread.
    pub fn spawn(
        mut self,
        region: Rect,
    ) -> io::Result<JoinHandle<Result<ArtifactId, StitchError>>> {
        thread::Builder::new()
            .name("scroll-capture".into())
            .spawn(move || self.run_scroll_capture(region))
    }
}

impl Drop for ScrollCapture {
    fn drop(&mut self) {
        info!("🗑️ ScrollCapture: released");
    }
}

/// Stitches already-captured encoded images in order. Decoding stops at the
/// first unreadable image; frames before it are still stitched.
pub fn stitch_encoded_frames(
    encoded: &[Vec<u8>],
    config: &StitchConfig,
) -> Result<StitchedImage, StitchError> {
    let mut frames = Vec::with_capacity(encoded.len());

    for (i, bytes) in encoded.iter().enumerate() {
        match Frame::decode(i, bytes) {
            Ok(frame) => frames.push(frame),
            Err(e) if frames.is_empty() => return Err(e.into()),
            Err(e) => {
                warn!("⚠️ Image {} unreadable, stitching {} frames: {}", i, frames.len(), e);
                break;
            }
        }
    }

    Compositor::with_config(config.clone()).stitch(&frames)
}
