pub mod models;
pub mod scroll_capture;
