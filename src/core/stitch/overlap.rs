//! 重叠估计 - 块匹配 + 惯性窗口
//!
//! 取上一帧底部 20% 作为参考块，在新帧中搜索最佳对齐行：
//! 1. 有惯性（上一次的滚动距离）时只搜索预测位置附近 ±25%
//! 2. 惯性窗口匹配失败时自动回退到全范围搜索
//! 3. 只采样参考块的上/中/下三行，每 4 列一个像素

use log::{debug, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use super::error::NoMatch;
use super::frame::{FrameView, BYTES_PER_PIXEL};
use super::row_compare::{compare_fuzzy, ColumnSpan, RowCompareConfig, SAMPLE_STRIDE};

/// Fraction of the width used for fuzzy confirmation (skips scrollbars and edge shadows).
const CONFIRM_SPAN_FRACTION: f32 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapConfig {
    pub block_fraction: f32,
    pub full_search_fraction: f32,
    pub inertia_window_fraction: f32,
    /// 每个采样像素允许的平均 RGB 误差之和（0-765），乘以采样数得到块分数上限
    pub max_mean_sample_error: u32,
    pub min_scroll_delta: u32,
    pub confirm_rows: u32,
    /// 0 = use the global rayon pool; otherwise a dedicated pool, capped at the CPU count
    pub search_threads: usize,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            block_fraction: 0.20,
            full_search_fraction: 0.70,
            inertia_window_fraction: 0.25,
            max_mean_sample_error: 30,
            min_scroll_delta: 50,
            confirm_rows: 8,
            search_threads: 0,
        }
    }
}

impl OverlapConfig {
    /// Looser ceiling for pages with heavy anti-aliasing or animated content.
    pub fn for_noisy_content() -> Self {
        Self {
            max_mean_sample_error: 60,
            confirm_rows: 4,
            ..Default::default()
        }
    }
}

/// 上一次成功匹配的滚动距离，0 表示未知
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InertiaState {
    pub last_scroll_delta: u32,
}

impl InertiaState {
    pub fn record(&mut self, delta: u32) {
        self.last_scroll_delta = delta;
    }

    pub fn reset(&mut self) {
        self.last_scroll_delta = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapMatch {
    /// Rows of `prev` that reappear at the top of `curr`.
    pub overlap_rows: u32,
    /// Apparent scroll distance between the two frames.
    pub delta: u32,
    pub best_y: u32,
    pub score: u64,
    pub used_inertia: bool,
}

#[derive(Debug, Clone, Copy)]
struct SearchWindow {
    lo: u32,
    hi: u32,
}

pub struct OverlapEstimator {
    config: OverlapConfig,
    compare: RowCompareConfig,
    pool: Option<ThreadPool>,
}

impl OverlapEstimator {
    pub fn new() -> Self {
        Self::with_config(OverlapConfig::default(), RowCompareConfig::default())
    }

    pub fn with_config(config: OverlapConfig, compare: RowCompareConfig) -> Self {
        let pool = if config.search_threads > 0 {
            ThreadPoolBuilder::new()
                .num_threads(config.search_threads.min(num_cpus::get()))
                .thread_name(|i| format!("overlap-search-{}", i))
                .build()
                .map_err(|e| warn!("⚠️ Overlap search pool unavailable, using global pool: {}", e))
                .ok()
        } else {
            None
        };

        Self {
            config,
            compare,
            pool,
        }
    }

    /// 候选行搜索实际使用的线程数
    pub fn search_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Finds how many rows at the bottom of `prev` reappear at the top of
    /// `curr`. A non-zero `expected_delta` narrows the search around the
    /// predicted position and falls back to a full search if that misses.
    pub fn find_overlap(
        &self,
        prev: &FrameView<'_>,
        curr: &FrameView<'_>,
        expected_delta: u32,
    ) -> Result<OverlapMatch, NoMatch> {
        if expected_delta > 0 {
            match self.search(prev, curr, Some(expected_delta)) {
                Err(NoMatch::ScoreAboveCeiling { score, ceiling }) => {
                    debug!(
                        "🔁 Inertia window miss (expected {}px, score {} > {}), full search",
                        expected_delta, score, ceiling
                    );
                }
                Err(NoMatch::FuzzyConfirmFailed { row }) => {
                    debug!(
                        "🔁 Inertia window confirm failed at row {}, full search",
                        row
                    );
                }
                other => return other,
            }
        }

        self.search(prev, curr, None)
    }

    fn search(
        &self,
        prev: &FrameView<'_>,
        curr: &FrameView<'_>,
        expected_delta: Option<u32>,
    ) -> Result<OverlapMatch, NoMatch> {
        let prev_height = prev.height();
        let curr_height = curr.height();
        let block_height = (prev_height as f32 * self.config.block_fraction) as u32;

        if block_height == 0 || curr_height < block_height {
            return Err(NoMatch::FrameTooShort {
                height: prev_height.min(curr_height),
            });
        }

        let block_start = prev_height - block_height;
        let span = ColumnSpan::full(prev.width().min(curr.width()));
        let bands = [0, block_height / 2, block_height - 1];

        let samples = (bands.len() * span.sample_count()) as u64;
        let ceiling = samples * self.config.max_mean_sample_error as u64;

        let window = match self.search_window(block_start, block_height, curr_height, expected_delta)
        {
            Some(window) => window,
            None => {
                return Err(NoMatch::ScoreAboveCeiling {
                    score: u64::MAX,
                    ceiling,
                })
            }
        };

        let scan = || {
            (window.lo..=window.hi)
                .into_par_iter()
                .map(|y| (block_score(prev, block_start, curr, y, &bands, span), y))
                .min()
        };
        let best = match &self.pool {
            Some(pool) => pool.install(scan),
            None => scan(),
        };

        let (score, best_y) = best.ok_or(NoMatch::ScoreAboveCeiling {
            score: u64::MAX,
            ceiling,
        })?;

        debug!(
            "🔍 Block search y∈[{}, {}] best_y={} score={} ceiling={}",
            window.lo, window.hi, best_y, score, ceiling
        );

        if score > ceiling {
            return Err(NoMatch::ScoreAboveCeiling { score, ceiling });
        }

        self.confirm(prev, block_start, curr, best_y, block_height)?;

        let delta = block_start as i64 - best_y as i64;
        if delta < self.config.min_scroll_delta as i64 {
            return Err(NoMatch::ScrollTooSmall {
                delta,
                floor: self.config.min_scroll_delta,
            });
        }

        let delta = delta as u32;
        Ok(OverlapMatch {
            overlap_rows: prev_height - delta,
            delta,
            best_y,
            score,
            used_inertia: expected_delta.is_some(),
        })
    }

    fn search_window(
        &self,
        block_start: u32,
        block_height: u32,
        curr_height: u32,
        expected_delta: Option<u32>,
    ) -> Option<SearchWindow> {
        let max_y = (curr_height - block_height) as i64;

        let (lo, hi) = match expected_delta {
            Some(delta) => {
                let estimated = block_start as i64 - delta as i64;
                let radius = (delta as f32 * self.config.inertia_window_fraction) as i64;
                ((estimated - radius).max(0), (estimated + radius).min(max_y))
            }
            None => {
                let upper = (curr_height as f32 * self.config.full_search_fraction) as i64;
                (0, upper.min(max_y))
            }
        };

        (lo <= hi).then_some(SearchWindow {
            lo: lo as u32,
            hi: hi as u32,
        })
    }

    fn confirm(
        &self,
        prev: &FrameView<'_>,
        block_start: u32,
        curr: &FrameView<'_>,
        best_y: u32,
        block_height: u32,
    ) -> Result<(), NoMatch> {
        let rows = self.config.confirm_rows;
        if rows == 0 {
            return Ok(());
        }

        let span = ColumnSpan::centered(prev.width().min(curr.width()), CONFIRM_SPAN_FRACTION);
        for k in 0..rows {
            let offset = if rows > 1 {
                k * (block_height - 1) / (rows - 1)
            } else {
                0
            };

            let matched = compare_fuzzy(
                prev,
                block_start + offset,
                curr,
                best_y + offset,
                span,
                self.compare.fuzzy_tolerance,
                self.compare.max_mismatch_fraction,
            );
            if !matched {
                return Err(NoMatch::FuzzyConfirmFailed { row: offset });
            }
        }

        Ok(())
    }
}

impl Default for OverlapEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Sum of absolute RGB differences over the sampled bands of the reference block.
fn block_score(
    prev: &FrameView<'_>,
    block_start: u32,
    curr: &FrameView<'_>,
    y: u32,
    bands: &[u32],
    span: ColumnSpan,
) -> u64 {
    let mut score = 0u64;

    for &band in bands {
        let row_a = prev.row(block_start + band);
        let row_b = curr.row(y + band);

        for x in (span.start as usize..span.end as usize).step_by(SAMPLE_STRIDE) {
            let idx = x * BYTES_PER_PIXEL;
            score += row_a[idx].abs_diff(row_b[idx]) as u64
                + row_a[idx + 1].abs_diff(row_b[idx + 1]) as u64
                + row_a[idx + 2].abs_diff(row_b[idx + 2]) as u64;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stitch::frame::Frame;
    use crate::core::stitch::test_support::SyntheticPage;

    const WIDTH: u32 = 400;
    const HEIGHT: u32 = 600;

    fn estimator() -> OverlapEstimator {
        OverlapEstimator::with_config(
            OverlapConfig {
                search_threads: 2,
                ..Default::default()
            },
            RowCompareConfig::default(),
        )
    }

    fn pair(shift: u32) -> (Frame, Frame) {
        let page = SyntheticPage::new(WIDTH, HEIGHT);
        (page.frame(0, 1000), page.frame(1, 1000 + shift))
    }

    #[test]
    fn test_full_search_finds_shift() {
        let estimator = estimator();
        for shift in [70, 100, 250, 400, 480] {
            let (prev, curr) = pair(shift);
            let m = estimator
                .find_overlap(&prev.view(), &curr.view(), 0)
                .unwrap();

            assert_eq!(m.delta, shift, "shift {}", shift);
            assert_eq!(m.overlap_rows, HEIGHT - shift);
            assert_eq!(m.score, 0);
            assert!(!m.used_inertia);
        }
    }

    #[test]
    fn test_inertia_search_finds_shift() {
        let estimator = estimator();
        for shift in [70, 100, 250, 400, 480] {
            let (prev, curr) = pair(shift);
            let m = estimator
                .find_overlap(&prev.view(), &curr.view(), shift)
                .unwrap();

            assert_eq!(m.overlap_rows, HEIGHT - shift, "shift {}", shift);
            assert!(m.used_inertia);
        }
    }

    #[test]
    fn test_inertia_tolerates_small_speed_change() {
        let estimator = estimator();
        let (prev, curr) = pair(420);
        let m = estimator
            .find_overlap(&prev.view(), &curr.view(), 400)
            .unwrap();

        assert_eq!(m.delta, 420);
        assert!(m.used_inertia);
    }

    #[test]
    fn test_inertia_falls_back_to_full_search() {
        let estimator = estimator();
        let (prev, curr) = pair(200);

        // predicted y = 80 ± 100, actual y = 280
        let m = estimator
            .find_overlap(&prev.view(), &curr.view(), 400)
            .unwrap();

        assert_eq!(m.delta, 200);
        assert_eq!(m.overlap_rows, 400);
        assert!(!m.used_inertia);
    }

    #[test]
    fn test_small_scroll_rejected() {
        let estimator = estimator();
        let (prev, curr) = pair(30);

        let result = estimator.find_overlap(&prev.view(), &curr.view(), 30);
        assert_eq!(
            result,
            Err(NoMatch::ScrollTooSmall {
                delta: 30,
                floor: 50
            })
        );
    }

    #[test]
    fn test_unrelated_frames_rejected() {
        let estimator = estimator();
        let page = SyntheticPage::new(WIDTH, HEIGHT);
        let prev = page.frame(0, 0);
        let curr = page.frame(1, 5000);

        let result = estimator.find_overlap(&prev.view(), &curr.view(), 0);
        assert!(matches!(result, Err(NoMatch::ScoreAboveCeiling { .. })));

        let result = estimator.find_overlap(&prev.view(), &curr.view(), 300);
        assert!(matches!(result, Err(NoMatch::ScoreAboveCeiling { .. })));
    }

    #[test]
    fn test_tolerates_render_noise() {
        let estimator = estimator();
        let (prev, mut curr) = pair(300);

        for (i, px) in curr.pixels.chunks_exact_mut(4).enumerate() {
            let noise = (i % 7) as u8;
            px[0] = px[0].saturating_add(noise);
            px[1] = px[1].saturating_sub(noise);
        }

        let m = estimator
            .find_overlap(&prev.view(), &curr.view(), 0)
            .unwrap();
        assert_eq!(m.delta, 300);
        assert!(m.score > 0);
    }

    #[test]
    fn test_ties_resolve_to_smallest_y() {
        let estimator = estimator();
        let data = vec![90u8; (WIDTH * HEIGHT * 4) as usize];
        let prev = Frame::from_rgba(0, WIDTH, HEIGHT, data.clone()).unwrap();
        let curr = Frame::from_rgba(1, WIDTH, HEIGHT, data).unwrap();

        for _ in 0..3 {
            let m = estimator
                .find_overlap(&prev.view(), &curr.view(), 0)
                .unwrap();
            assert_eq!(m.best_y, 0);
            assert_eq!(m.delta, 480);
        }
    }

    #[test]
    fn test_cropped_view_matching() {
        let estimator = estimator();
        let page = SyntheticPage::new(WIDTH, HEIGHT).with_header(50);
        let prev = page.frame(0, 0);
        let curr = page.frame(1, 300);

        let m = estimator
            .find_overlap(&prev.view(), &curr.view().crop_top(50), 0)
            .unwrap();

        // prev row 480 shows content row 430, cropped curr row 130 shows 300 + 130
        assert_eq!(m.best_y, 130);
        assert_eq!(m.delta, 350);
        assert_eq!(m.overlap_rows, 250);
    }

    #[test]
    fn test_frame_too_short() {
        let estimator = estimator();
        let tiny = Frame::from_rgba(0, 8, 3, vec![0u8; 8 * 3 * 4]).unwrap();

        let result = estimator.find_overlap(&tiny.view(), &tiny.view(), 0);
        assert_eq!(result, Err(NoMatch::FrameTooShort { height: 3 }));
    }

    #[test]
    fn test_default_uses_global_pool() {
        let estimator = OverlapEstimator::new();
        assert_eq!(OverlapConfig::default().search_threads, 0);
        assert_eq!(estimator.search_threads(), rayon::current_num_threads());
    }

    #[test]
    fn test_dedicated_pool_capped_at_cpu_count() {
        let estimator = OverlapEstimator::with_config(
            OverlapConfig {
                search_threads: 4096,
                ..Default::default()
            },
            RowCompareConfig::default(),
        );
        assert!(estimator.search_threads() <= num_cpus::get());
        assert_eq!(estimator_threads_for(1), 1);
    }

    fn estimator_threads_for(threads: usize) -> usize {
        OverlapEstimator::with_config(
            OverlapConfig {
                search_threads: threads,
                ..Default::default()
            },
            RowCompareConfig::default(),
        )
        .search_threads()
    }

    #[test]
    fn test_global_pool_matches_dedicated_pool() {
        let global = OverlapEstimator::with_config(
            OverlapConfig {
                search_threads: 0,
                ..Default::default()
            },
            RowCompareConfig::default(),
        );
        let (prev, curr) = pair(250);

        let a = global.find_overlap(&prev.view(), &curr.view(), 0).unwrap();
        let b = estimator()
            .find_overlap(&prev.view(), &curr.view(), 0)
            .unwrap();
        assert_eq!(a, b);
    }
}
