//! Contracts between the runtime (platform loop) and the application.
//!
//! Keeps runtime internals out of application code and gives every frame the
//! same context shape.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
