//! quadmap engine crate.
//!
//! Platform + GPU runtime used by the mapping core and the studio binary:
//! window loop, input, frame timing, draw lists, fonts and the wgpu renderers
//! that rasterize them.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
pub mod paint;
pub mod scene;
pub mod text;
