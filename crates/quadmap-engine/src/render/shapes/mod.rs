//! Shape renderers.

mod common;

pub mod circle;
pub mod polyline;
pub mod rect;
pub mod text;
pub mod warp;
