pub mod common;
pub mod image;
pub mod state;

pub use common::*;
pub use image::*;
pub use state::*;
