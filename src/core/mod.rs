pub mod capture;
pub mod stitch;
