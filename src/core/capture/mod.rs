//! 滚动截图捕获循环
//!
//! 隐藏应用 → 点击聚焦 → 截图 → 字节去重 → 模拟滚动 → 再截图，
//! 直到到底、用户取消、失败或达到最大次数。

pub mod collaborators;
pub mod controller;
pub mod state_machine;

#[cfg(test)]
pub(crate) mod fakes;

pub use collaborators::{
    AbortFlag, AbortSignal, ArtifactId, ArtifactSink, CaptureError, Collaborators, InputError,
    InputInjector, PersistError, PngDirectorySink, RegionCapturer, ScrollDirection,
    VisibilityController,
};
pub use controller::{CaptureLoopController, CaptureSession, LoopConfig};
pub use state_machine::{CaptureState, LoopEvent, TerminationReason};
