use serde::{Deserialize, Serialize};

use crate::core::capture::LoopConfig;
use crate::core::stitch::StitchConfig;

/// 屏幕区域（全局坐标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Converts a rect selected relative to a display into global coordinates.
    pub fn offset_by(&self, origin_x: i32, origin_y: i32) -> Self {
        Self {
            x: self.x.saturating_add(origin_x),
            y: self.y.saturating_add(origin_y),
            ..*self
        }
    }

    /// 区域中心点，坐标在 i32 边界处饱和
    pub fn center(&self) -> (i32, i32) {
        let half = |len: u32| i32::try_from(len / 2).unwrap_or(i32::MAX);
        (
            self.x.saturating_add(half(self.width)),
            self.y.saturating_add(half(self.height)),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollCaptureConfig {
    pub loop_config: LoopConfig,
    pub stitch: StitchConfig,
    /// 保存长图时使用的标题
    pub title: String,
}

impl Default for ScrollCaptureConfig {
    fn default() -> Self {
        Self {
            loop_config: LoopConfig::default(),
            stitch: StitchConfig::default(),
            title: "Scroll Capture".to_string(),
        }
    }
}

impl ScrollCaptureConfig {
    /// 懒加载、动画较多的页面：等待更久，匹配更宽松
    pub fn for_slow_pages() -> Self {
        Self {
            loop_config: LoopConfig::for_slow_pages(),
            stitch: StitchConfig::for_noisy_content(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
