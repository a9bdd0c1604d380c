//! Paint model shared between the mapping core and renderers.
//!
//! Scope:
//! - color representation (linear premultiplied alpha)
//! - CPU-side RGBA frames that textured renderers upload
//!
//! Geometry types remain in `coords`.

pub mod color;
pub mod image;

pub use color::Color;
pub use image::ImageFrame;
