use std::fmt;

use log::{info, warn};
use quadmap_engine::coords::Vec2;
use quadmap_engine::paint::Color;

use crate::geometry::{Corner, Quad};
use crate::media::{MediaSource, UNMUTED_VOLUME};
use crate::mesh::{WarpMesh, MAX_RESOLUTION};
use crate::placement::Placement;

/// Stable identity of a surface; survives reordering, never reused.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Playback state as shown in the surface list.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceStatus {
    pub playing: bool,
    pub muted: bool,
    pub hidden: bool,
}

impl fmt::Display for SurfaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = if self.hidden {
            "Hidden"
        } else if self.playing {
            "Playing"
        } else {
            "Paused"
        };
        f.write_str(base)?;
        if self.muted && !self.hidden {
            f.write_str(" (Muted)")?;
        }
        Ok(())
    }
}

/// One media source mapped onto four control points.
#[derive(Debug)]
pub struct Surface {
    id: SurfaceId,
    name: String,
    source: MediaSource,
    color: Color,
    quad: Quad,
    visible: bool,
    muted: bool,
    mesh: Option<(Quad, WarpMesh)>,
}

impl Surface {
    pub fn new(
        id: SurfaceId,
        name: impl Into<String>,
        source: MediaSource,
        color: Color,
        placement: &Placement,
    ) -> Self {
        let quad = placement.quad_for(source.intrinsic_size());
        Self {
            id,
            name: name.into(),
            source,
            color,
            quad,
            visible: true,
            muted: false,
            mesh: None,
        }
    }

    #[inline]
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub fn quad(&self) -> &Quad {
        &self.quad
    }

    #[inline]
    pub fn corner(&self, c: Corner) -> Vec2 {
        self.quad.corner(c)
    }

    #[inline]
    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_playing(&self) -> bool {
        self.source.video().is_some_and(|v| v.is_playing())
    }

    pub fn status(&self) -> SurfaceStatus {
        SurfaceStatus {
            playing: self.is_playing(),
            muted: self.muted,
            hidden: !self.visible,
        }
    }

    // ── geometry ──────────────────────────────────────────────────────────

    /// Re-runs auto-fit for this surface's media and `placement.index`.
    pub fn reset_placement(&mut self, placement: &Placement) {
        self.quad = placement.quad_for(self.source.intrinsic_size());
        info!("surface {}: placement reset", self.id);
    }

    /// Scales the quad about its centroid. Non-finite or non-positive
    /// factors are ignored.
    pub fn scale(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            warn!("surface {}: ignoring scale factor {factor}", self.id);
            return;
        }
        self.apply(self.quad.scaled(factor));
    }

    /// Moves one corner by whole pixels.
    pub fn nudge(&mut self, corner: Corner, dx: i32, dy: i32) {
        let p = self.quad.corner(corner) + Vec2::new(dx as f32, dy as f32);
        self.set_corner(corner, p);
    }

    pub fn set_corner(&mut self, corner: Corner, pos: Vec2) {
        let mut quad = self.quad;
        quad.set_corner(corner, pos);
        self.apply(quad);
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.apply(self.quad.translated(delta));
    }

    fn apply(&mut self, quad: Quad) {
        if !quad.is_finite() {
            warn!("surface {}: rejecting non-finite corners {:?}", self.id, quad.points);
            return;
        }
        self.quad = quad;
    }

    /// Even-odd containment in canvas space.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        self.quad.contains(point)
    }

    /// Mesh for the current corners, rebuilt only when they or the
    /// resolution changed.
    pub fn warp_mesh(&mut self, resolution: u32) -> &WarpMesh {
        let resolution = resolution.clamp(1, MAX_RESOLUTION);
        let quad = self.quad;
        if self
            .mesh
            .as_ref()
            .is_some_and(|(q, mesh)| *q != quad || mesh.resolution() != resolution)
        {
            self.mesh = None;
        }
        &self
            .mesh
            .get_or_insert_with(|| (quad, WarpMesh::build(&quad, resolution)))
            .1
    }

    // ── state toggles ─────────────────────────────────────────────────────

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            info!("surface {} ({}): {}", self.id, self.name, if visible { "shown" } else { "hidden" });
        }
    }

    /// No-op for images.
    pub fn set_muted(&mut self, muted: bool) {
        let Some(video) = self.source.video_mut() else { return };
        video.set_volume(if muted { 0.0 } else { UNMUTED_VOLUME });
        self.muted = muted;
        info!("surface {} ({}): {}", self.id, self.name, if muted { "muted" } else { "unmuted" });
    }

    /// No-op for images.
    pub fn set_playing(&mut self, playing: bool) {
        let Some(video) = self.source.video_mut() else { return };
        video.set_playing(playing);
        info!("surface {} ({}): {}", self.id, self.name, if playing { "playing" } else { "paused" });
    }
}
