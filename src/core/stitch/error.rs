use thiserror::Error;

use crate::core::capture::PersistError;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("Frame has zero dimensions ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },
    #[error("Pixel buffer length {actual} does not match {width}x{height} RGBA ({expected})")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// 重叠匹配失败原因（仅在拼接器内部处理，不会返回给调用方）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoMatch {
    #[error("Frame too short for block matching (height {height})")]
    FrameTooShort { height: u32 },
    #[error("Best block score {score} above ceiling {ceiling}")]
    ScoreAboveCeiling { score: u64, ceiling: u64 },
    #[error("Fuzzy confirmation failed at block row {row}")]
    FuzzyConfirmFailed { row: u32 },
    #[error("Scroll delta {delta}px below floor {floor}px")]
    ScrollTooSmall { delta: i64, floor: u32 },
}

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("Capture region is empty")]
    EmptyRegion,
    #[error("No usable frames to stitch")]
    NoFrames,
    #[error("Composite has non-positive height")]
    EmptyComposite,
    #[error("Plan entry refers to frame {index}, which is missing or not {width}px wide")]
    PlanFrameMismatch { index: usize, width: u32 },
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("PNG encode failed: {0}")]
    Encode(image::ImageError),
    #[error("Persist failed: {0}")]
    Persist(#[from] PersistError),
}
