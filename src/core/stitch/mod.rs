//! 长截图拼接
//!
//! 流程：字节去重 → 吸顶栏检测 → 块匹配求重叠 → 按偏移合成长图

pub mod compositor;
pub mod duplicate;
pub mod error;
pub mod frame;
pub mod overlap;
pub mod row_compare;
pub mod sticky_header;

#[cfg(test)]
pub(crate) mod test_support;

pub use compositor::{Compositor, NoMatchPolicy, PlanEntry, StitchConfig, StitchPlan, StitchedImage};
pub use duplicate::{is_byte_identical, DuplicateDetector};
pub use error::{DecodeError, NoMatch, StitchError};
pub use frame::{Frame, FrameView};
pub use overlap::{InertiaState, OverlapConfig, OverlapEstimator, OverlapMatch};
pub use row_compare::{compare_fuzzy, compare_strict, ColumnSpan, RowCompareConfig};
pub use sticky_header::{scan_static_header_height, HeaderConfig};
