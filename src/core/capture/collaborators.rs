//! 外部协作方接口：截图、输入注入、窗口可见性、产物持久化、取消信号

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;
use thiserror::Error;

use crate::api::models::Rect;
use crate::core::stitch::StitchedImage;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture failed: {0}")]
    Failed(String),
    #[error("Capture produced no output")]
    NoOutput,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input injection failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Artifact rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactId(pub String);

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Grabs one still image of a screen region, in a lossless encoding.
pub trait RegionCapturer: Send {
    fn capture_region(&mut self, region: &Rect) -> Result<Vec<u8>, CaptureError>;
}

pub trait InputInjector: Send {
    /// Focus click, used once so the scrolled window receives keyboard input.
    fn click(&mut self, x: i32, y: i32) -> Result<(), InputError>;

    fn inject_scroll(&mut self, repeats: u32, direction: ScrollDirection) -> Result<(), InputError>;
}

pub trait VisibilityController: Send {
    fn set_app_visibility(&mut self, hidden: bool);
}

pub trait ArtifactSink: Send {
    fn persist_artifact(
        &mut self,
        image: &StitchedImage,
        title: &str,
    ) -> Result<ArtifactId, PersistError>;
}

pub trait AbortSignal: Send + Sync {
    fn is_abort_requested(&self) -> bool;
}

/// 会话级取消标志，可跨线程共享
#[derive(Debug, Clone, Default)]
pub struct AbortFlag {
    requested: Arc<AtomicBool>,
}

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }
}

impl AbortSignal for AbortFlag {
    fn is_abort_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Everything the capture loop talks to.
pub struct Collaborators {
    pub capturer: Box<dyn RegionCapturer>,
    pub input: Box<dyn InputInjector>,
    pub visibility: Box<dyn VisibilityController>,
    pub abort: Arc<dyn AbortSignal>,
}

/// 将长图以 PNG 写入目录，返回文件路径作为产物 ID
pub struct PngDirectorySink {
    dir: PathBuf,
}

impl PngDirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactSink for PngDirectorySink {
    fn persist_artifact(
        &mut self,
        image: &StitchedImage,
        title: &str,
    ) -> Result<ArtifactId, PersistError> {
        fs::create_dir_all(&self.dir)?;

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = self.dir.join(format!("capture-long-{}.png", millis));

        let png = image
            .to_png()
            .map_err(|e| PersistError::Encode(e.to_string()))?;
        fs::write(&path, png)?;

        info!(
            "💾 {} saved: {:?} ({}x{})",
            title, path, image.width, image.height
        );
        Ok(ArtifactId(path.to_string_lossy().into_owned()))
    }
}
