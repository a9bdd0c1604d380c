//! Initial, aspect-correct placement of new surfaces.

use log::warn;
use quadmap_engine::coords::{Rect, Vec2};

use crate::geometry::Quad;

/// Tunables for auto-fit.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlacementConfig {
    /// Share of the shorter viewport side the long edge of a new quad spans.
    pub fill_ratio: f32,
    /// Per-index diagonal offset, in pixels, so stacked surfaces stay visible.
    pub stack_offset: f32,
    /// Size used when the media reports no usable dimensions.
    pub fallback_size: Vec2,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            fill_ratio: 0.7,
            stack_offset: 50.0,
            fallback_size: Vec2::new(300.0, 200.0),
        }
    }
}

/// The drawing canvas and the part of it currently on screen.
///
/// Window logical pixels and canvas-screen pixels coincide; canvas space puts
/// the origin at the canvas center, +y down. `visible` is in window pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Stage {
    pub canvas: Vec2,
    pub visible: Rect,
}

impl Stage {
    /// A canvas exactly the size of the viewport.
    pub fn fitted(width: f32, height: f32) -> Self {
        Self {
            canvas: Vec2::new(width, height),
            visible: Rect::new(0.0, 0.0, width, height),
        }
    }

    /// A fixed-size canvas whose top-left part is visible in a `width` by
    /// `height` viewport. Each canvas axis is at least the viewport's.
    pub fn on_canvas(canvas: Vec2, width: f32, height: f32) -> Self {
        Self {
            canvas: Vec2::new(canvas.x.max(width), canvas.y.max(height)),
            visible: Rect::new(0.0, 0.0, width, height),
        }
    }

    /// Window logical pixels to canvas space.
    #[inline]
    pub fn to_canvas(&self, screen: Vec2) -> Vec2 {
        screen - self.canvas * 0.5
    }

    /// Canvas space to window logical pixels.
    #[inline]
    pub fn to_screen(&self, canvas: Vec2) -> Vec2 {
        canvas + self.canvas * 0.5
    }

    /// Center of the visible viewport, in canvas space.
    pub fn visible_center(&self) -> Vec2 {
        self.to_canvas(self.visible.center())
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::fitted(1280.0, 720.0)
    }
}

/// Everything auto-fit needs to place the surface at `index`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Placement {
    pub stage: Stage,
    pub config: PlacementConfig,
    pub index: usize,
}

impl Placement {
    pub fn new(stage: Stage, config: PlacementConfig, index: usize) -> Self {
        Self { stage, config, index }
    }

    /// Quad for media of the given intrinsic size.
    ///
    /// `None` or non-positive intrinsics use `fallback_size` as-is.
    pub fn quad_for(&self, intrinsic: Option<Vec2>) -> Quad {
        let size = match intrinsic {
            Some(s) if s.x > 0.0 && s.y > 0.0 && s.is_finite() => self.fit(s),
            _ => {
                warn!(
                    "placement: no usable media size, falling back to {}x{}",
                    self.config.fallback_size.x, self.config.fallback_size.y
                );
                self.config.fallback_size
            }
        };

        let offset = self.index as f32 * self.config.stack_offset;
        let center = self.stage.visible_center() + Vec2::new(offset, offset);
        Quad::centered(center, size)
    }

    fn fit(&self, media: Vec2) -> Vec2 {
        let visible = self.stage.visible.size;
        let max_size = visible.x.min(visible.y) * self.config.fill_ratio;
        if media.x / media.y > 1.0 {
            Vec2::new(max_size, max_size * media.y / media.x)
        } else {
            Vec2::new(max_size * media.x / media.y, max_size)
        }
    }
}
