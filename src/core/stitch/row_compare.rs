//! 像素行比较原语
//!
//! 每 4 列采样一次，只比较 RGB 通道（忽略 alpha）。
//! 严格比较用于吸顶栏检测，模糊比较用于重叠确认。

use serde::{Deserialize, Serialize};

use super::frame::{FrameView, BYTES_PER_PIXEL};

/// Sample every Nth column.
pub const SAMPLE_STRIDE: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RowCompareConfig {
    pub strict_tolerance: u8,
    pub fuzzy_tolerance: u8,
    pub max_mismatch_fraction: f32,
}

impl Default for RowCompareConfig {
    fn default() -> Self {
        Self {
            strict_tolerance: 5,
            fuzzy_tolerance: 10,
            max_mismatch_fraction: 0.10,
        }
    }
}

/// Half-open column range `[start, end)` to compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    pub start: u32,
    pub end: u32,
}

impl ColumnSpan {
    pub fn full(width: u32) -> Self {
        Self {
            start: 0,
            end: width,
        }
    }

    /// 中间一段，避开滚动条和边缘阴影
    pub fn centered(width: u32, fraction: f32) -> Self {
        let keep = (width as f32 * fraction.clamp(0.0, 1.0)) as u32;
        let start = (width - keep) / 2;
        Self {
            start,
            end: start + keep,
        }
    }

    fn clamp_to(self, width: u32) -> Self {
        let end = self.end.min(width);
        Self {
            start: self.start.min(end),
            end,
        }
    }

    pub fn sample_count(&self) -> usize {
        let len = self.end.saturating_sub(self.start) as usize;
        len.div_ceil(SAMPLE_STRIDE)
    }
}

#[inline]
fn pixel_within(a: &[u8], b: &[u8], tolerance: u8) -> bool {
    a[0].abs_diff(b[0]) <= tolerance
        && a[1].abs_diff(b[1]) <= tolerance
        && a[2].abs_diff(b[2]) <= tolerance
}

fn sampled_pixels<'a>(
    a: &FrameView<'a>,
    row_a: u32,
    b: &FrameView<'a>,
    row_b: u32,
    span: ColumnSpan,
) -> impl Iterator<Item = (&'a [u8], &'a [u8])> {
    let span = span.clamp_to(a.width().min(b.width()));
    let line_a = a.row(row_a);
    let line_b = b.row(row_b);

    (span.start as usize..span.end as usize)
        .step_by(SAMPLE_STRIDE)
        .map(move |x| {
            let idx = x * BYTES_PER_PIXEL;
            (
                &line_a[idx..idx + BYTES_PER_PIXEL],
                &line_b[idx..idx + BYTES_PER_PIXEL],
            )
        })
}

/// True iff every sampled pixel differs by at most `tolerance` on each RGB channel.
pub fn compare_strict(
    a: &FrameView<'_>,
    row_a: u32,
    b: &FrameView<'_>,
    row_b: u32,
    span: ColumnSpan,
    tolerance: u8,
) -> bool {
    sampled_pixels(a, row_a, b, row_b, span).all(|(pa, pb)| pixel_within(pa, pb, tolerance))
}

/// True iff the fraction of sampled pixels outside `tolerance` stays below
/// `max_mismatch_fraction`.
pub fn compare_fuzzy(
    a: &FrameView<'_>,
    row_a: u32,
    b: &FrameView<'_>,
    row_b: u32,
    span: ColumnSpan,
    tolerance: u8,
    max_mismatch_fraction: f32,
) -> bool {
    let mut samples = 0usize;
    let mut mismatches = 0usize;

    for (pa, pb) in sampled_pixels(a, row_a, b, row_b, span) {
        samples += 1;
        if !pixel_within(pa, pb, tolerance) {
            mismatches += 1;
        }
    }

    if samples == 0 {
        return true;
    }

    (mismatches as f32 / samples as f32) < max_mismatch_fraction
}
