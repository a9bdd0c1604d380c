//! quadmap core.
//!
//! Owns the mapping model: surfaces with four control points, their stacking
//! order and selection, calibration editing, and the warp meshes handed to
//! the engine's renderers. Nothing in here touches the GPU, the window or a
//! decoder directly.

pub mod calibration;
pub mod command;
pub mod composition;
pub mod geometry;
pub mod interaction;
pub mod media;
pub mod mesh;
pub mod placement;
pub mod registry;
pub mod surface;

pub use calibration::CalibrationMode;
pub use command::{Action, ListCommand};
pub use composition::{CompositionConfig, CompositionState, HandleStyle, PointerInput};
pub use geometry::{Corner, Homography, Quad};
pub use media::{ImageFrame, MediaKind, MediaSource, StillImage, VideoPlayback};
pub use mesh::{WarpMesh, WarpMode};
pub use placement::{Placement, PlacementConfig, Stage};
pub use registry::{Registry, SurfaceListEntry};
pub use surface::{Surface, SurfaceId, SurfaceStatus};
