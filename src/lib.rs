pub mod api;
pub mod core;

pub use api::models::{Rect, ScrollCaptureConfig};
pub use api::scroll_capture::{stitch_encoded_frames, ScrollCapture};

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("scroll_stitch"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // 已初始化时忽略（宿主应用可能先装好了 logger）
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();
    }
}
