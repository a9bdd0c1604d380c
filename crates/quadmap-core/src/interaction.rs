//! Pointer and keyboard editing of control points.
//!
//! Everything here works in canvas space. Mode gating (calibrating or not)
//! is the caller's job.

use log::debug;
use quadmap_engine::coords::Vec2;

use crate::geometry::{Corner, Quad};
use crate::registry::Registry;
use crate::surface::Surface;

/// Distance from a corner, in pixels, within which a press grabs it.
pub const HANDLE_HIT_RADIUS: f32 = 12.0;

/// Wheel scale factor per notch scrolled away from the user.
pub const WHEEL_SCALE_UP: f32 = 1.05;
/// Wheel scale factor per notch scrolled toward the user.
pub const WHEEL_SCALE_DOWN: f32 = 0.95;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Drag {
    /// Dragging one corner of the selected surface.
    Point(Corner),
    /// Dragging the selected surface's body; `last` is the previous cursor.
    Body { last: Vec2 },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NudgeDirection {
    Left,
    Right,
    Up,
    Down,
}

impl NudgeDirection {
    pub const fn delta(self) -> (i32, i32) {
        match self {
            NudgeDirection::Left => (-1, 0),
            NudgeDirection::Right => (1, 0),
            NudgeDirection::Up => (0, -1),
            NudgeDirection::Down => (0, 1),
        }
    }
}

/// First corner of `quad`, in TL, TR, BR, BL order, within `radius` of `cursor`.
pub fn hit_test_point(cursor: Vec2, quad: &Quad, radius: f32) -> Option<Corner> {
    Corner::ALL
        .into_iter()
        .find(|&c| quad.corner(c).distance(cursor) <= radius)
}

/// Whether `cursor` lies inside the surface body.
#[inline]
pub fn hit_test_surface(cursor: Vec2, surface: &Surface) -> bool {
    surface.contains(cursor)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub selected_point: Option<Corner>,
    pub hover_point: Option<Corner>,
    pub drag: Option<Drag>,
    pub hit_radius: f32,
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new(HANDLE_HIT_RADIUS)
    }
}

impl Interaction {
    pub fn new(hit_radius: f32) -> Self {
        Self {
            selected_point: None,
            hover_point: None,
            drag: None,
            hit_radius,
        }
    }

    /// Drops the selected point, hover and any drag in progress.
    pub fn reset(&mut self) {
        self.selected_point = None;
        self.hover_point = None;
        self.drag = None;
    }

    pub fn deselect_point(&mut self) {
        if self.selected_point.take().is_some() {
            debug!("interaction: point deselected");
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Index of the selected surface when it is visible; only those take edits.
    fn editable(registry: &Registry) -> Option<usize> {
        let i = registry.selected()?;
        registry.get(i)?.is_visible().then_some(i)
    }

    /// Tracks the corner of the selected surface under the cursor.
    pub fn hover(&mut self, cursor: Vec2, registry: &Registry) {
        self.hover_point = Self::editable(registry)
            .and_then(|i| registry.get(i))
            .and_then(|s| hit_test_point(cursor, s.quad(), self.hit_radius));
    }

    /// Press: grab a corner, the selected body, or select what lies under
    /// the cursor. Returns true when a drag started.
    ///
    /// A press always ends any earlier drag, even one whose release was
    /// never seen.
    pub fn pointer_down(&mut self, cursor: Vec2, registry: &mut Registry) -> bool {
        self.drag = None;
        if let Some(i) = Self::editable(registry) {
            if let Some(surface) = registry.get(i) {
                if let Some(corner) = hit_test_point(cursor, surface.quad(), self.hit_radius) {
                    self.selected_point = Some(corner);
                    self.drag = Some(Drag::Point(corner));
                    debug!("interaction: grabbed {corner:?} of '{}'", surface.name());
                    return true;
                }
                self.selected_point = None;
                if hit_test_surface(cursor, surface) {
                    self.drag = Some(Drag::Body { last: cursor });
                    return true;
                }
            }
        }

        let hit = registry
            .visible()
            .find(|(_, s)| hit_test_surface(cursor, s))
            .map(|(i, _)| i);
        let Some(index) = hit else { return false };

        if registry.selected() != Some(index) {
            self.selected_point = None;
        }
        registry.select(index);
        self.drag = Some(Drag::Body { last: cursor });
        true
    }

    /// Motion while pressed.
    pub fn pointer_drag(&mut self, cursor: Vec2, registry: &mut Registry) {
        let Some(drag) = self.drag else { return };
        let Some(i) = Self::editable(registry) else {
            self.drag = None;
            return;
        };
        let Some(surface) = registry.get_mut(i) else { return };

        match drag {
            Drag::Point(corner) => surface.set_corner(corner, cursor),
            Drag::Body { last } => {
                let delta = cursor - last;
                if delta != Vec2::zero() {
                    surface.translate(delta);
                }
                self.drag = Some(Drag::Body { last: cursor });
            }
        }
    }

    /// Release. The selected point stays selected for nudging.
    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    /// Moves the selected point by one pixel. Returns false when there is
    /// nothing to nudge.
    pub fn nudge_selected(&mut self, direction: NudgeDirection, registry: &mut Registry) -> bool {
        let Some(corner) = self.selected_point else { return false };
        let Some(i) = Self::editable(registry) else { return false };
        let Some(surface) = registry.get_mut(i) else { return false };
        let (dx, dy) = direction.delta();
        surface.nudge(corner, dx, dy);
        true
    }

    /// Scales the selected surface by one wheel step.
    ///
    /// Positive `lines` means scrolling away from the user; magnitude is
    /// ignored.
    pub fn wheel(&mut self, lines: f32, registry: &mut Registry) -> bool {
        if lines == 0.0 || !lines.is_finite() {
            return false;
        }
        let Some(i) = Self::editable(registry) else { return false };
        let Some(surface) = registry.get_mut(i) else { return false };
        let step = if lines > 0.0 { WHEEL_SCALE_UP } else { WHEEL_SCALE_DOWN };
        surface.scale(step);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::fake;
    use crate::placement::{PlacementConfig, Stage};

    // Index 0 at the center, index 1 offset by (50, 50); 560×420 each.
    fn registry() -> Registry {
        let mut r = Registry::with_seed(3);
        let stage = Stage::fitted(1000.0, 800.0);
        let cfg = PlacementConfig::default();
        r.insert("front", fake::video(640, 480), &stage, &cfg);
        r.insert("back", fake::video(640, 480), &stage, &cfg);
        r
    }

    // ── hit testing ───────────────────────────────────────────────────────

    #[test]
    fn first_corner_in_order_wins() {
        let q = Quad::new([Vec2::zero(), Vec2::new(5.0, 0.0), Vec2::new(5.0, 5.0), Vec2::new(0.0, 5.0)]);
        assert_eq!(hit_test_point(Vec2::new(2.0, 2.0), &q, 12.0), Some(Corner::TopLeft));
        assert_eq!(hit_test_point(Vec2::new(100.0, 0.0), &q, 12.0), None);
    }

    #[test]
    fn surface_body_hit_uses_quad_interior() {
        let r = registry();
        let front = r.get(0).unwrap();
        assert!(hit_test_surface(Vec2::new(0.0, 0.0), front));
        assert!(hit_test_surface(Vec2::new(270.0, -200.0), front));
        assert!(!hit_test_surface(Vec2::new(300.0, 0.0), front));
        // Only the back surface reaches this far down-right.
        assert!(hit_test_surface(Vec2::new(320.0, 250.0), r.get(1).unwrap()));
    }

    // ── pointer ───────────────────────────────────────────────────────────

    #[test]
    fn press_selects_topmost_surface() {
        let mut r = registry();
        let mut ix = Interaction::default();
        // Inside both quads; index 0 is in front.
        assert!(ix.pointer_down(Vec2::new(100.0, 100.0), &mut r));
        assert_eq!(r.selected(), Some(0));
        assert!(matches!(ix.drag, Some(Drag::Body { .. })));
    }

    #[test]
    fn press_on_nothing_keeps_selection() {
        let mut r = registry();
        r.select(1);
        let mut ix = Interaction::default();
        assert!(!ix.pointer_down(Vec2::new(-490.0, -390.0), &mut r));
        assert_eq!(r.selected(), Some(1));
    }

    #[test]
    fn press_on_nothing_ends_unreleased_drag() {
        let mut r = registry();
        let mut ix = Interaction::default();
        let before = *r.get(0).unwrap().quad();

        assert!(ix.pointer_down(Vec2::new(0.0, 0.0), &mut r));
        // No release; the next press lands on empty canvas.
        assert!(!ix.pointer_down(Vec2::new(-490.0, -390.0), &mut r));
        assert_eq!(ix.drag, None);

        ix.pointer_drag(Vec2::new(-480.0, -380.0), &mut r);
        assert_eq!(*r.get(0).unwrap().quad(), before);
    }

    #[test]
    fn corner_drag_moves_only_that_corner() {
        let mut r = registry();
        r.select(0);
        let mut ix = Interaction::default();
        let tl = r.get(0).unwrap().corner(Corner::TopLeft);

        assert!(ix.pointer_down(tl + Vec2::new(3.0, 3.0), &mut r));
        assert_eq!(ix.selected_point, Some(Corner::TopLeft));
        ix.pointer_drag(Vec2::new(-400.0, -300.0), &mut r);
        ix.pointer_up();

        assert_eq!(r.get(0).unwrap().corner(Corner::TopLeft), Vec2::new(-400.0, -300.0));
        assert_eq!(ix.drag, None);
        assert_eq!(ix.selected_point, Some(Corner::TopLeft));
    }

    #[test]
    fn body_drag_translates_by_pointer_delta() {
        let mut r = registry();
        let mut ix = Interaction::default();
        let before = *r.get(0).unwrap().quad();

        ix.pointer_down(Vec2::new(0.0, 0.0), &mut r);
        ix.pointer_drag(Vec2::new(10.0, 5.0), &mut r);
        ix.pointer_drag(Vec2::new(20.0, 5.0), &mut r);
        ix.pointer_up();

        assert_eq!(*r.get(0).unwrap().quad(), before.translated(Vec2::new(20.0, 5.0)));
    }

    #[test]
    fn switching_surface_clears_point() {
        let mut r = registry();
        r.select(1);
        let mut ix = Interaction::default();
        let br = r.get(1).unwrap().corner(Corner::BottomRight);
        ix.pointer_down(br, &mut r);
        ix.pointer_up();
        assert_eq!(ix.selected_point, Some(Corner::BottomRight));

        // Inside the front surface only.
        ix.pointer_down(Vec2::new(-250.0, -180.0), &mut r);
        assert_eq!(r.selected(), Some(0));
        assert_eq!(ix.selected_point, None);
    }

    #[test]
    fn hidden_surfaces_are_not_hit() {
        let mut r = registry();
        r.get_mut(0).unwrap().set_visible(false);
        let mut ix = Interaction::default();
        ix.pointer_down(Vec2::new(100.0, 100.0), &mut r);
        assert_eq!(r.selected(), Some(1));

        r.get_mut(1).unwrap().set_visible(false);
        r.clear_selection();
        assert!(!ix.pointer_down(Vec2::new(100.0, 100.0), &mut r));
        assert_eq!(r.selected(), None);
    }

    #[test]
    fn hover_tracks_selected_surface_corners() {
        let mut r = registry();
        let mut ix = Interaction::default();
        let tr = r.get(0).unwrap().corner(Corner::TopRight);

        ix.hover(tr, &r);
        assert_eq!(ix.hover_point, None);

        r.select(0);
        ix.hover(tr + Vec2::new(-4.0, 4.0), &r);
        assert_eq!(ix.hover_point, Some(Corner::TopRight));
    }

    // ── keyboard and wheel ────────────────────────────────────────────────

    #[test]
    fn nudge_moves_selected_point_one_pixel() {
        let mut r = registry();
        r.select(0);
        let before = *r.get(0).unwrap().quad();
        let other = *r.get(1).unwrap().quad();
        let mut ix = Interaction::default();

        assert!(!ix.nudge_selected(NudgeDirection::Right, &mut r));

        ix.selected_point = Some(Corner::TopLeft);
        assert!(ix.nudge_selected(NudgeDirection::Right, &mut r));
        let after = *r.get(0).unwrap().quad();
        assert_eq!(after.corner(Corner::TopLeft), before.corner(Corner::TopLeft) + Vec2::new(1.0, 0.0));
        assert_eq!(after.corner(Corner::BottomRight), before.corner(Corner::BottomRight));
        assert_eq!(*r.get(1).unwrap().quad(), other);
    }

    #[test]
    fn wheel_scales_selected_surface() {
        let mut r = registry();
        let mut ix = Interaction::default();
        assert!(!ix.wheel(1.0, &mut r));

        r.select(0);
        let before = *r.get(0).unwrap().quad();
        assert!(ix.wheel(1.0, &mut r));
        let expected = before.scaled(WHEEL_SCALE_UP);
        let after = *r.get(0).unwrap().quad();
        for i in 0..4 {
            assert!((after.points[i].x - expected.points[i].x).abs() < 1e-3);
        }

        ix.wheel(-1.0, &mut r);
        let smaller = *r.get(0).unwrap().quad();
        assert!(smaller.points[1].x < after.points[1].x);
    }
}
