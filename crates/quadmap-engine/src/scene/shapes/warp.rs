use std::sync::Arc;

use crate::coords::Vec2;
use crate::paint::ImageFrame;
use crate::scene::{DrawCmd, DrawList, ZIndex};

/// Identifies one texture slot in the warp renderer's cache.
///
/// Callers use a stable key per textured surface so that consecutive frames
/// reuse the same GPU texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureKey(pub u64);

/// One vertex of a warped mesh.
///
/// `pos` is in logical pixels relative to [`WarpCmd::origin`]. `w` is the
/// projective weight: renderers emit clip position `(ndc * w, 0, w)`, so a
/// weight taken from the homography denominator yields perspective-correct
/// texturing, while `w = 1` gives plain affine interpolation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WarpVertex {
    pub pos: Vec2,
    pub uv: [f32; 2],
    pub w: f32,
}

/// Textured triangle mesh payload.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpCmd {
    pub texture: TextureKey,
    pub frame: ImageFrame,
    /// Translation added to every vertex position.
    pub origin: Vec2,
    pub vertices: Arc<[WarpVertex]>,
    /// Triangle list indices into `vertices`.
    pub indices: Arc<[u32]>,
}

impl DrawList {
    /// Records a textured mesh draw.
    #[inline]
    pub fn push_warp(&mut self, z: ZIndex, cmd: WarpCmd) {
        self.push(z, DrawCmd::Warp(cmd));
    }
}
