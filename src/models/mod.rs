pub mod analysis;
pub mod common;
pub mod image;
pub mod video;

pub use analysis::*;
pub use common::*;
pub use image::*;
pub use video::*;
