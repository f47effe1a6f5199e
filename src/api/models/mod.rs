pub mod capture;

pub use capture::{Rect, ScrollCaptureConfig};
