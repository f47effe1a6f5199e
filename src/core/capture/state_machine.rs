use super::controller::LoopConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// 滚动后画面字节完全一致
    ReachedBottom,
    Aborted,
    IterationLimit,
    CaptureFailed,
    DecodeFailed,
    ScrollFailed,
}

/// 捕获循环状态，按值在各步骤间传递
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Hiding,
    Focusing,
    Capturing,
    CheckDuplicate { raw: Vec<u8> },
    Scrolling,
    Terminated(TerminationReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    Start,
    Settled,
    AbortRequested,
    Captured { raw: Vec<u8> },
    CaptureFailed,
    Duplicate,
    Fresh { captures_taken: u32 },
    DecodeFailed,
    Scrolled,
    ScrollFailed,
}

impl CaptureState {
    pub fn new() -> Self {
        CaptureState::Idle
    }

    pub fn transition(self, event: LoopEvent, config: &LoopConfig) -> CaptureState {
        match (self, event) {
            (CaptureState::Idle, LoopEvent::Start) => CaptureState::Hiding,

            // 任何等待中收到取消都立即结束，不再点击或滚动
            (
                CaptureState::Hiding
                | CaptureState::Focusing
                | CaptureState::Capturing
                | CaptureState::Scrolling,
                LoopEvent::AbortRequested,
            ) => CaptureState::Terminated(TerminationReason::Aborted),

            (CaptureState::Hiding, LoopEvent::Settled) => CaptureState::Focusing,
            (CaptureState::Focusing, LoopEvent::Settled) => CaptureState::Capturing,

            (CaptureState::Capturing, LoopEvent::Captured { raw }) => {
                CaptureState::CheckDuplicate { raw }
            }
            (CaptureState::Capturing, LoopEvent::CaptureFailed) => {
                CaptureState::Terminated(TerminationReason::CaptureFailed)
            }

            (CaptureState::CheckDuplicate { .. }, LoopEvent::Duplicate) => {
                CaptureState::Terminated(TerminationReason::ReachedBottom)
            }
            (CaptureState::CheckDuplicate { .. }, LoopEvent::DecodeFailed) => {
                CaptureState::Terminated(TerminationReason::DecodeFailed)
            }
            (CaptureState::CheckDuplicate { .. }, LoopEvent::Fresh { captures_taken }) => {
                if captures_taken >= config.max_iterations {
                    CaptureState::Terminated(TerminationReason::IterationLimit)
                } else {
                    CaptureState::Scrolling
                }
            }

            (CaptureState::Scrolling, LoopEvent::Scrolled) => CaptureState::Capturing,
            (CaptureState::Scrolling, LoopEvent::ScrollFailed) => {
                CaptureState::Terminated(TerminationReason::ScrollFailed)
            }

            (state, _) => state,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, CaptureState::Terminated(_))
    }
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::new()
    }
}
