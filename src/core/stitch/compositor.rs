use std::io::Cursor;

use image::{ImageOutputFormat, RgbaImage};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::error::StitchError;
use super::frame::{Frame, BYTES_PER_PIXEL};
use super::overlap::{InertiaState, OverlapConfig, OverlapEstimator};
use super::row_compare::{ColumnSpan, RowCompareConfig};
use super::sticky_header::{scan_static_header_height, HeaderConfig};

/// 匹配失败且已超过前几帧时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoMatchPolicy {
    /// 丢弃该帧，继续与后续帧匹配
    #[default]
    Drop,
    /// 视为已到达页面底部，停止拼接
    EndWalk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    pub compare: RowCompareConfig,
    pub header: HeaderConfig,
    pub overlap: OverlapConfig,
    pub no_match_policy: NoMatchPolicy,
    /// Frames past this index that fail to match are assumed to be end-of-page repeats.
    pub deep_frame_index: usize,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            compare: RowCompareConfig::default(),
            header: HeaderConfig::default(),
            overlap: OverlapConfig::default(),
            no_match_policy: NoMatchPolicy::Drop,
            deep_frame_index: 2,
        }
    }
}

impl StitchConfig {
    pub fn for_noisy_content() -> Self {
        Self {
            overlap: OverlapConfig::for_noisy_content(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanEntry {
    pub source_frame_index: usize,
    pub vertical_offset: i64,
    pub cropped_top_rows: u32,
    /// Rows drawn: frame height minus `cropped_top_rows`.
    pub visible_rows: u32,
}

impl PlanEntry {
    pub fn bottom(&self) -> i64 {
        self.vertical_offset + self.visible_rows as i64
    }
}

/// 每帧在长图中的位置，遍历完成后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchPlan {
    width: u32,
    entries: Vec<PlanEntry>,
    final_height: i64,
}

impl StitchPlan {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn final_height(&self) -> i64 {
        self.final_height
    }
}

/// 拼接完成的长图
#[derive(Debug, Clone)]
pub struct StitchedImage {
    pub width: u32,
    pub height: u32,
    pub image: RgbaImage,
    pub frame_count: usize,
}

impl StitchedImage {
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn to_png(&self) -> Result<Vec<u8>, StitchError> {
        let mut buffer = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .map_err(StitchError::Encode)?;
        Ok(buffer.into_inner())
    }
}

pub struct Compositor {
    config: StitchConfig,
    estimator: OverlapEstimator,
}

impl Compositor {
    pub fn new() -> Self {
        Self::with_config(StitchConfig::default())
    }

    pub fn with_config(config: StitchConfig) -> Self {
        let estimator = OverlapEstimator::with_config(config.overlap.clone(), config.compare.clone());
        debug!("🧵 Overlap search on {} threads", estimator.search_threads());
        Self { config, estimator }
    }

    pub fn stitch(&self, frames: &[Frame]) -> Result<StitchedImage, StitchError> {
        let plan = self.plan(frames)?;
        self.render(&plan, frames)
    }

    /// Walks the frames pairwise and places each accepted frame below the
    /// previous accepted one.
    pub fn plan(&self, frames: &[Frame]) -> Result<StitchPlan, StitchError> {
        let first = frames.first().ok_or(StitchError::NoFrames)?;
        let width = first.width;

        let mut entries = vec![PlanEntry {
            source_frame_index: 0,
            vertical_offset: 0,
            cropped_top_rows: 0,
            visible_rows: first.height,
        }];
        let mut current_y = first.height as i64;
        let mut inertia = InertiaState::default();
        let mut last_accepted = 0usize;

        for (i, curr) in frames.iter().enumerate().skip(1) {
            if curr.width != width {
                warn!(
                    "⚠️ Frame {} width {} != {}, dropped",
                    i, curr.width, width
                );
                continue;
            }

            let prev = &frames[last_accepted];
            let header = scan_static_header_height(
                &prev.view(),
                &curr.view(),
                ColumnSpan::full(width),
                self.config.header.max_scan_height(curr.height),
                self.config.compare.strict_tolerance,
            );
            let curr_view = curr.view().crop_top(header);

            let found = match self.estimator.find_overlap(
                &prev.view(),
                &curr_view,
                inertia.last_scroll_delta,
            ) {
                Ok(found) => found,
                Err(reason) => {
                    inertia.reset();
                    if i > self.config.deep_frame_index {
                        warn!(
                            "⚠️ Frame {} unmatched ({}), assuming end of content",
                            i, reason
                        );
                        if self.config.no_match_policy == NoMatchPolicy::EndWalk {
                            break;
                        }
                    } else {
                        warn!("⚠️ Frame {} unmatched early ({}), dropped", i, reason);
                    }
                    continue;
                }
            };

            let offset = current_y - found.overlap_rows as i64;
            let last_offset = entries.last().map_or(0, |e| e.vertical_offset);
            if offset < last_offset {
                warn!(
                    "⚠️ Frame {} would land above frame {} ({} < {}), dropped",
                    i, last_accepted, offset, last_offset
                );
                inertia.reset();
                continue;
            }

            debug!(
                "🧩 Frame {}: overlap={} delta={} header={} offset={}",
                i, found.overlap_rows, found.delta, header, offset
            );

            let entry = PlanEntry {
                source_frame_index: i,
                vertical_offset: offset,
                cropped_top_rows: header,
                visible_rows: curr.height - header,
            };
            current_y = entry.bottom();
            entries.push(entry);
            inertia.record(found.delta);
            last_accepted = i;
        }

        Ok(StitchPlan {
            width,
            entries,
            final_height: current_y,
        })
    }

    /// Draws every planned frame in order; later frames overwrite earlier ones
    /// where they overlap.
    pub fn render(&self, plan: &StitchPlan, frames: &[Frame]) -> Result<StitchedImage, StitchError> {
        if plan.final_height <= 0 || plan.final_height > u32::MAX as i64 {
            return Err(StitchError::EmptyComposite);
        }

        let width = plan.width;
        let height = plan.final_height as u32;
        let stride = width as usize * BYTES_PER_PIXEL;
        let mut canvas = RgbaImage::new(width, height);
        let out: &mut [u8] = &mut canvas;

        for entry in &plan.entries {
            let frame = frames
                .get(entry.source_frame_index)
                .filter(|f| f.width == width)
                .ok_or(StitchError::PlanFrameMismatch {
                    index: entry.source_frame_index,
                    width,
                })?;
            let src = frame.view().crop_top(entry.cropped_top_rows);

            for r in 0..src.height() {
                let dst_y = entry.vertical_offset + r as i64;
                if dst_y < 0 || dst_y >= height as i64 {
                    continue;
                }
                let start = dst_y as usize * stride;
                out[start..start + stride].copy_from_slice(src.row(r));
            }
        }

        info!(
            "🖼️ Stitched {} frames into {}x{}",
            plan.entries.len(),
            width,
            height
        );

        Ok(StitchedImage {
            width,
            height,
            image: canvas,
            frame_count: plan.entries.len(),
        })
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}
