use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::collaborators::{AbortSignal, Collaborators, ScrollDirection};
use super::state_machine::{CaptureState, LoopEvent, TerminationReason};
use crate::api::models::Rect;
use crate::core::stitch::{DuplicateDetector, Frame, StitchError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub max_iterations: u32,
    /// 隐藏应用后等待系统切换焦点
    pub hide_settle_ms: u64,
    pub focus_settle_ms: u64,
    /// 截图完成到发送滚动之间的等待
    pub capture_settle_ms: u64,
    /// 滚动动画 + 重新渲染的等待
    pub scroll_settle_ms: u64,
    pub scroll_repeats: u32,
    pub abort_poll_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            hide_settle_ms: 800,
            focus_settle_ms: 300,
            capture_settle_ms: 100,
            scroll_settle_ms: 1500,
            scroll_repeats: 10,
            abort_poll_ms: 50,
        }
    }
}

impl LoopConfig {
    pub fn for_slow_pages() -> Self {
        Self {
            capture_settle_ms: 250,
            scroll_settle_ms: 2500,
            ..Default::default()
        }
    }

    /// No settle delays; for replaying pre-recorded captures.
    pub fn without_delays() -> Self {
        Self {
            hide_settle_ms: 0,
            focus_settle_ms: 0,
            capture_settle_ms: 0,
            scroll_settle_ms: 0,
            ..Default::default()
        }
    }
}

/// 一次滚动截图会话，只在本次调用内存在
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub region: Rect,
    pub frames: Vec<Frame>,
    pub aborted: bool,
    pub iteration_count: u32,
    pub termination: Option<TerminationReason>,
}

impl CaptureSession {
    pub fn new(region: Rect) -> Self {
        Self {
            region,
            frames: Vec::new(),
            aborted: false,
            iteration_count: 0,
            termination: None,
        }
    }

    pub fn region_width(&self) -> u32 {
        self.region.width
    }

    pub fn region_height(&self) -> u32 {
        self.region.height
    }
}

pub struct CaptureLoopController {
    config: LoopConfig,
}

impl CaptureLoopController {
    pub fn new() -> Self {
        Self::with_config(LoopConfig::default())
    }

    pub fn with_config(config: LoopConfig) -> Self {
        Self { config }
    }

    /// Runs capture → duplicate check → scroll until the page bottom, an
    /// abort, a failure or the iteration cap. Frames gathered before a
    /// non-initial failure are kept.
    pub fn run(
        &self,
        region: Rect,
        collaborators: &mut Collaborators,
    ) -> Result<CaptureSession, StitchError> {
        let mut session = CaptureSession::new(region);
        let mut duplicates = DuplicateDetector::new();
        let mut state = CaptureState::new();

        info!(
            "📜 Scroll capture started: {}x{} at ({}, {})",
            region.width, region.height, region.x, region.y
        );

        let outcome = loop {
            let event = match &state {
                CaptureState::Terminated(reason) => break Ok(*reason),
                CaptureState::Idle => LoopEvent::Start,
                CaptureState::Hiding => {
                    collaborators.visibility.set_app_visibility(true);
                    self.settle_event(self.config.hide_settle_ms, collaborators)
                }
                CaptureState::Focusing => {
                    let (x, y) = region.center();
                    if let Err(e) = collaborators.input.click(x, y) {
                        warn!("⚠️ Focus click failed: {}", e);
                    }
                    self.settle_event(self.config.focus_settle_ms, collaborators)
                }
                CaptureState::Capturing => {
                    self.capture(&region, collaborators, &mut session)
                }
                CaptureState::CheckDuplicate { raw } => {
                    match self.accept_capture(raw, &mut duplicates, &mut session) {
                        Ok(event) => event,
                        Err(e) => break Err(e),
                    }
                }
                CaptureState::Scrolling => self.scroll(collaborators),
            };

            if event == LoopEvent::AbortRequested {
                info!("🛑 Scroll capture aborted by user");
                session.aborted = true;
            }
            state = state.transition(event, &self.config);
        };

        collaborators.visibility.set_app_visibility(false);

        let reason = outcome?;
        session.termination = Some(reason);
        info!(
            "🏁 Scroll capture finished: {:?}, {} frames from {} captures",
            reason,
            session.frames.len(),
            session.iteration_count
        );
        Ok(session)
    }

    fn capture(
        &self,
        region: &Rect,
        collaborators: &mut Collaborators,
        session: &mut CaptureSession,
    ) -> LoopEvent {
        if collaborators.abort.is_abort_requested() {
            return LoopEvent::AbortRequested;
        }

        debug!(
            "📸 Capture {}/{}",
            session.iteration_count + 1,
            self.config.max_iterations
        );
        session.iteration_count += 1;

        match collaborators.capturer.capture_region(region) {
            Ok(raw) => LoopEvent::Captured { raw },
            Err(e) => {
                error!(
                    "❌ Capture {} failed: {}",
                    session.iteration_count, e
                );
                LoopEvent::CaptureFailed
            }
        }
    }

    fn accept_capture(
        &self,
        raw: &[u8],
        duplicates: &mut DuplicateDetector,
        session: &mut CaptureSession,
    ) -> Result<LoopEvent, StitchError> {
        if duplicates.is_duplicate(raw) {
            info!("✅ Reached bottom (identical capture)");
            return Ok(LoopEvent::Duplicate);
        }

        match Frame::decode(session.frames.len(), raw) {
            Ok(frame) => {
                session.frames.push(frame);
                Ok(LoopEvent::Fresh {
                    captures_taken: session.iteration_count,
                })
            }
            Err(e) if session.frames.is_empty() => {
                error!("❌ First capture could not be decoded: {}", e);
                Err(StitchError::Decode(e))
            }
            Err(e) => {
                warn!(
                    "⚠️ Capture {} could not be decoded, stitching {} frames: {}",
                    session.iteration_count,
                    session.frames.len(),
                    e
                );
                Ok(LoopEvent::DecodeFailed)
            }
        }
    }

    fn scroll(&self, collaborators: &mut Collaborators) -> LoopEvent {
        if !self.settle(self.config.capture_settle_ms, collaborators.abort.as_ref()) {
            return LoopEvent::AbortRequested;
        }

        if let Err(e) = collaborators
            .input
            .inject_scroll(self.config.scroll_repeats, ScrollDirection::Down)
        {
            error!("❌ Scroll injection failed: {}", e);
            return LoopEvent::ScrollFailed;
        }

        if !self.settle(self.config.scroll_settle_ms, collaborators.abort.as_ref()) {
            return LoopEvent::AbortRequested;
        }
        LoopEvent::Scrolled
    }

    fn settle_event(&self, ms: u64, collaborators: &Collaborators) -> LoopEvent {
        if self.settle(ms, collaborators.abort.as_ref()) {
            LoopEvent::Settled
        } else {
            LoopEvent::AbortRequested
        }
    }

    /// Sleeps for `ms`, waking every `abort_poll_ms` to check for an abort.
    /// Returns false if the wait was cut short.
    fn settle(&self, ms: u64, abort: &dyn AbortSignal) -> bool {
        let deadline = Instant::now() + Duration::from_millis(ms);
        let slice = Duration::from_millis(self.config.abort_poll_ms.max(1));

        loop {
            if abort.is_abort_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(slice.min(deadline - now));
        }
    }
}

impl Default for CaptureLoopController {
    fn default() -> Self {
        Self::new()
    }
}
