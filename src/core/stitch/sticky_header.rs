use log::debug;
use serde::{Deserialize, Serialize};

use super::frame::FrameView;
use super::row_compare::{compare_strict, ColumnSpan};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// 最多扫描帧高的多少比例
    pub max_scan_fraction: f32,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            max_scan_fraction: 0.30,
        }
    }
}

impl HeaderConfig {
    pub fn max_scan_height(&self, frame_height: u32) -> u32 {
        (frame_height as f32 * self.max_scan_fraction.clamp(0.0, 1.0)) as u32
    }
}

/// Counts the leading rows that are identical (within `tolerance`) in both
/// frames, scanning at most `max_scan_height` rows.
pub fn scan_static_header_height(
    prev: &FrameView<'_>,
    curr: &FrameView<'_>,
    span: ColumnSpan,
    max_scan_height: u32,
    tolerance: u8,
) -> u32 {
    let limit = max_scan_height.min(prev.height()).min(curr.height());

    let height = (0..limit)
        .take_while(|&y| compare_strict(prev, y, curr, y, span, tolerance))
        .count() as u32;

    if height > 0 {
        debug!("📌 Static header detected: {}px (scanned {})", height, limit);
    }
    height
}
