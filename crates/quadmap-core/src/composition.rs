//! The single owned mapping state: surfaces, selection, mode and layout.
//!
//! Host code drives it once per frame:
//!
//! ```text
//! set_stage → tick → handle_pointer / apply → paint
//! ```

use std::f64::consts::TAU;

use log::{debug, info};
use quadmap_engine::coords::Vec2;
use quadmap_engine::paint::Color;
use quadmap_engine::scene::shapes::warp::{TextureKey, WarpCmd};
use quadmap_engine::scene::shapes::Border;
use quadmap_engine::scene::{DrawList, ZIndex};

use crate::calibration::CalibrationMode;
use crate::command::{Action, ListCommand};
use crate::geometry::Corner;
use crate::interaction::{Interaction, HANDLE_HIT_RADIUS};
use crate::media::MediaSource;
use crate::mesh::DEFAULT_RESOLUTION;
use crate::placement::{Placement, PlacementConfig, Stage};
use crate::registry::{Registry, SurfaceListEntry};
use crate::surface::{Surface, SurfaceId};

/// Look of the calibration overlay.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HandleStyle {
    pub base_diameter: f32,
    pub hover_diameter: f32,
    pub selected_diameter: f32,
    pub outline_width: f32,
    pub hit_radius: f32,
    pub highlight: Color,
    /// Pulses per second of the ring around the selected point.
    pub pulse_hz: f32,
}

impl Default for HandleStyle {
    fn default() -> Self {
        Self {
            base_diameter: 16.0,
            hover_diameter: 20.0,
            selected_diameter: 24.0,
            outline_width: 2.0,
            hit_radius: HANDLE_HIT_RADIUS,
            highlight: Color::from_srgb_u8(255, 214, 10, 255),
            pulse_hz: 1.5,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CompositionConfig {
    pub placement: PlacementConfig,
    /// Grid subdivisions per side of each warp mesh.
    pub mesh_resolution: u32,
    pub handle_style: HandleStyle,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            placement: PlacementConfig::default(),
            mesh_resolution: DEFAULT_RESOLUTION,
            handle_style: HandleStyle::default(),
        }
    }
}

/// Pointer state for one frame, in window logical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PointerInput {
    pub pos: Option<Vec2>,
    /// Primary button went down this frame.
    pub pressed: bool,
    /// Primary button is down.
    pub held: bool,
    /// Primary button went up this frame.
    pub released: bool,
    /// Wheel lines; positive is away from the user.
    pub wheel: f32,
}

#[derive(Debug)]
pub struct CompositionState {
    registry: Registry,
    interaction: Interaction,
    mode: CalibrationMode,
    stage: Stage,
    config: CompositionConfig,
    elapsed: f64,
}

impl CompositionState {
    pub fn new(config: CompositionConfig) -> Self {
        Self::with_registry(config, Registry::new())
    }

    pub fn with_registry(config: CompositionConfig, registry: Registry) -> Self {
        Self {
            registry,
            interaction: Interaction::new(config.handle_style.hit_radius),
            mode: CalibrationMode::default(),
            stage: Stage::default(),
            config,
            elapsed: 0.0,
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    #[inline]
    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    #[inline]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    #[inline]
    pub fn config(&self) -> &CompositionConfig {
        &self.config
    }

    #[inline]
    pub fn selected_point(&self) -> Option<Corner> {
        self.interaction.selected_point
    }

    pub fn list_view(&self) -> Vec<SurfaceListEntry> {
        self.registry.list_view()
    }

    // ── frame ─────────────────────────────────────────────────────────────

    pub fn set_stage(&mut self, stage: Stage) {
        if self.stage != stage {
            debug!("composition: stage {:?}", stage);
            self.stage = stage;
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt as f64;
        }
    }

    pub fn set_mode(&mut self, mode: CalibrationMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        if !mode.is_calibrating() {
            self.interaction.reset();
        }
        info!("composition: {mode}");
    }

    /// Adds a loaded source as the newest surface, selects it and starts
    /// video playback.
    pub fn add_surface(&mut self, name: impl Into<String>, source: MediaSource) -> SurfaceId {
        let id = self.registry.insert(name, source, &self.stage, &self.config.placement);
        if let Some(index) = self.registry.index_of(id) {
            self.registry.select(index);
            self.interaction.reset();
            if let Some(surface) = self.registry.get_mut(index) {
                surface.set_playing(true);
            }
        }
        id
    }

    /// Feeds this frame's pointer state. Returns true when the pointer edited
    /// or selected something.
    pub fn handle_pointer(&mut self, input: &PointerInput) -> bool {
        if !self.mode.is_calibrating() {
            return false;
        }
        // A release can be lost (focus change mid-drag); a button that is
        // no longer held ends the drag either way.
        if input.released || !input.held {
            self.interaction.pointer_up();
        }
        let Some(cursor) = input.pos.map(|p| self.stage.to_canvas(p)) else {
            self.interaction.hover_point = None;
            return false;
        };

        let mut consumed = false;
        if input.pressed {
            consumed |= self.interaction.pointer_down(cursor, &mut self.registry);
        } else if input.held && self.interaction.is_dragging() {
            self.interaction.pointer_drag(cursor, &mut self.registry);
            consumed = true;
        }
        if input.released {
            self.interaction.pointer_up();
        }
        if !self.interaction.is_dragging() {
            self.interaction.hover(cursor, &self.registry);
        }
        if input.wheel != 0.0 {
            consumed |= self.interaction.wheel(input.wheel, &mut self.registry);
        }
        consumed
    }

    // ── commands ──────────────────────────────────────────────────────────

    /// Applies a keyboard action. Host actions and actions without a target
    /// return false.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::ToggleCalibration => {
                self.set_mode(self.mode.toggled());
                true
            }
            Action::ToggleFullscreen | Action::ToggleKiosk => false,
            Action::Nudge(direction) => {
                self.mode.is_calibrating()
                    && self.interaction.nudge_selected(direction, &mut self.registry)
            }
            Action::DeselectPoint => {
                self.interaction.deselect_point();
                true
            }
            Action::Scale(factor) => match self.registry.selected_surface_mut() {
                Some(surface) => {
                    surface.scale(factor);
                    true
                }
                None => false,
            },
            Action::ResetPlacement => {
                let Some(index) = self.registry.selected() else { return false };
                let placement = Placement::new(self.stage, self.config.placement, index);
                match self.registry.get_mut(index) {
                    Some(surface) => {
                        surface.reset_placement(&placement);
                        true
                    }
                    None => false,
                }
            }
            Action::TogglePlayback => self.with_selected(ListCommand::TogglePlay),
            Action::ToggleMute => self.with_selected(ListCommand::ToggleMute),
            Action::ToggleHide => self.with_selected(ListCommand::ToggleHide),
            Action::MoveForward => self.with_selected(ListCommand::MoveUp),
            Action::MoveBackward => self.with_selected(ListCommand::MoveDown),
            Action::DeleteSelected => self.with_selected(ListCommand::Delete),
        }
    }

    fn with_selected(&mut self, cmd: fn(usize) -> ListCommand) -> bool {
        match self.registry.selected() {
            Some(index) => self.apply_list_command(cmd(index)),
            None => false,
        }
    }

    /// Applies a command from the surface list. Stale indices are no-ops.
    pub fn apply_list_command(&mut self, cmd: ListCommand) -> bool {
        let index = cmd.index();
        if index >= self.registry.len() {
            return false;
        }
        let was_selected = self.registry.selected() == Some(index);

        match cmd {
            ListCommand::Select(i) => {
                if !was_selected {
                    self.interaction.reset();
                }
                self.registry.select(i)
            }
            ListCommand::Delete(i) => {
                if was_selected {
                    self.interaction.reset();
                }
                self.registry.remove(i)
            }
            ListCommand::TogglePlay(i) => self.update(i, |s| s.set_playing(!s.is_playing())),
            ListCommand::ToggleMute(i) => self.update(i, |s| s.set_muted(!s.is_muted())),
            ListCommand::ToggleHide(i) => {
                let changed = self.update(i, |s| s.set_visible(!s.is_visible()));
                let hidden = self.registry.get(i).is_some_and(|s| !s.is_visible());
                if was_selected && hidden {
                    self.interaction.reset();
                }
                changed
            }
            ListCommand::MoveUp(i) => self.registry.move_up(i),
            ListCommand::MoveDown(i) => self.registry.move_down(i),
        }
    }

    fn update(&mut self, index: usize, f: impl FnOnce(&mut Surface)) -> bool {
        match self.registry.get_mut(index) {
            Some(surface) => {
                f(surface);
                true
            }
            None => false,
        }
    }

    // ── paint ─────────────────────────────────────────────────────────────

    /// Records warped media for every visible surface, back to front, then
    /// the calibration overlay for the selected surface.
    pub fn paint(&mut self, list: &mut DrawList) {
        let origin = self.stage.canvas * 0.5;
        let resolution = self.config.mesh_resolution;

        let order: Vec<usize> = self.registry.paint_order().map(|(i, _)| i).collect();
        let surfaces = self.registry.surfaces_mut();
        for index in order {
            let surface = &mut surfaces[index];
            if !surface.quad().is_finite() {
                continue;
            }
            let Some(frame) = surface.source().current_frame() else { continue };
            let texture = TextureKey(surface.id().0);
            let mesh = surface.warp_mesh(resolution);
            list.push_warp(
                ZIndex::SURFACES,
                WarpCmd {
                    texture,
                    frame,
                    origin,
                    vertices: mesh.vertices.clone(),
                    indices: mesh.indices.clone(),
                },
            );
        }

        if self.mode.is_calibrating() {
            self.paint_handles(list);
        }
    }

    fn paint_handles(&self, list: &mut DrawList) {
        let Some(surface) = self.registry.selected_surface() else { return };
        if !surface.is_visible() || !surface.quad().is_finite() {
            return;
        }

        let style = &self.config.handle_style;
        let color = surface.color();
        let points: Vec<Vec2> = surface.quad().points.iter().map(|&p| self.stage.to_screen(p)).collect();

        list.push_polyline(ZIndex::HANDLES, points.as_slice(), style.outline_width, color, true);

        let shadow = Some(Border::new(1.5, Color::BLACK.with_alpha(0.6)));
        for (corner, &center) in Corner::ALL.into_iter().zip(points.iter()) {
            let z = ZIndex::HANDLES.above(1);
            if self.interaction.selected_point == Some(corner) {
                let radius = style.selected_diameter * 0.5;
                list.push_circle(z, center, radius, style.highlight, shadow);

                let phase = (self.elapsed * style.pulse_hz as f64 * TAU).sin() as f32 * 0.5 + 0.5;
                let ring = radius + 4.0 + phase * 6.0;
                let alpha = 1.0 - 0.7 * phase;
                list.push_ring(z.above(1), center, ring, 2.0, style.highlight.with_alpha(alpha));
            } else if self.interaction.hover_point == Some(corner) {
                list.push_circle(z, center, style.hover_diameter * 0.5, color, shadow);
            } else {
                list.push_circle(z, center, style.base_diameter * 0.5, color, shadow);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use quadmap_engine::scene::DrawCmd;

    use super::*;
    use crate::interaction::NudgeDirection;
    use crate::media::fake;

    fn state() -> CompositionState {
        let mut s = CompositionState::with_registry(CompositionConfig::default(), Registry::with_seed(11));
        s.set_stage(Stage::fitted(1000.0, 800.0));
        s
    }

    fn screen(s: &CompositionState, canvas: Vec2) -> Vec2 {
        s.stage().to_screen(canvas)
    }

    fn press(at: Vec2) -> PointerInput {
        PointerInput { pos: Some(at), pressed: true, held: true, ..Default::default() }
    }

    fn circles(list: &DrawList) -> Vec<f32> {
        list.items()
            .iter()
            .filter_map(|item| match &item.cmd {
                DrawCmd::Circle(c) if c.fill.a > 0.0 => Some(c.radius),
                _ => None,
            })
            .collect()
    }

    fn warps(list: &DrawList) -> usize {
        list.items().iter().filter(|i| matches!(i.cmd, DrawCmd::Warp(_))).count()
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn added_surface_is_selected_and_playing() {
        let mut s = state();
        s.add_surface("a.mp4", fake::video(1920, 1080));
        let id = s.add_surface("b.mp4", fake::video(1080, 1920));
        assert_eq!(s.registry().selected(), s.registry().index_of(id));
        assert!(s.registry().get(1).unwrap().is_playing());

        let b = s.registry().get(1).unwrap();
        assert_eq!(b.corner(Corner::TopLeft), Vec2::new(50.0 - 157.5, 50.0 - 280.0));
    }

    #[test]
    fn delete_selected_clears_point() {
        let mut s = state();
        s.add_surface("a", fake::video(640, 480));
        s.add_surface("b", fake::video(640, 480));
        s.add_surface("c", fake::video(640, 480));
        s.apply_list_command(ListCommand::Select(1));
        s.interaction.selected_point = Some(Corner::TopLeft);

        assert!(s.apply(Action::DeleteSelected));
        assert_eq!(s.registry().selected_surface().unwrap().name(), "c");
        assert_eq!(s.selected_point(), None);
    }

    #[test]
    fn stale_list_commands_are_ignored() {
        let mut s = state();
        s.add_surface("a", fake::video(640, 480));
        assert!(!s.apply_list_command(ListCommand::Delete(4)));
        assert!(!s.apply_list_command(ListCommand::MoveUp(0)));
        assert_eq!(s.registry().len(), 1);
    }

    // ── calibration ───────────────────────────────────────────────────────

    #[test]
    fn idle_clears_point_but_keeps_surface() {
        let mut s = state();
        s.add_surface("a", fake::video(640, 480));
        s.interaction.selected_point = Some(Corner::BottomLeft);

        s.apply(Action::ToggleCalibration);
        assert_eq!(s.mode(), CalibrationMode::Idle);
        assert_eq!(s.selected_point(), None);
        assert_eq!(s.registry().selected(), Some(0));

        let mut list = DrawList::new();
        s.paint(&mut list);
        assert!(circles(&list).is_empty());
        assert_eq!(warps(&list), 1);
    }

    #[test]
    fn pointer_is_ignored_when_idle() {
        let mut s = state();
        s.add_surface("a", fake::video(640, 480));
        s.registry.clear_selection();
        s.set_mode(CalibrationMode::Idle);
        let center = screen(&s, Vec2::zero());
        assert!(!s.handle_pointer(&press(center)));
        assert_eq!(s.registry().selected(), None);
    }

    // ── pointer ───────────────────────────────────────────────────────────

    #[test]
    fn drag_corner_through_pointer_frames() {
        let mut s = state();
        s.add_surface("a", fake::video(640, 480));
        let tl = s.registry().get(0).unwrap().corner(Corner::TopLeft);

        assert!(s.handle_pointer(&press(screen(&s, tl))));
        let moved = PointerInput { pos: Some(screen(&s, Vec2::new(-300.0, -250.0))), held: true, ..Default::default() };
        s.handle_pointer(&moved);
        let up = PointerInput { pos: moved.pos, released: true, ..Default::default() };
        s.handle_pointer(&up);

        assert_eq!(s.registry().get(0).unwrap().corner(Corner::TopLeft), Vec2::new(-300.0, -250.0));
        assert_eq!(s.selected_point(), Some(Corner::TopLeft));
        assert!(!s.interaction().is_dragging());
    }

    #[test]
    fn lost_release_does_not_leave_a_drag() {
        let mut s = state();
        s.add_surface("a", fake::video(640, 480));
        let before = *s.registry().get(0).unwrap().quad();

        assert!(s.handle_pointer(&press(screen(&s, Vec2::zero()))));
        // Focus lost mid-drag: the button reads up, but no release arrived.
        let hover = PointerInput { pos: Some(screen(&s, Vec2::new(-490.0, -390.0))), ..Default::default() };
        s.handle_pointer(&hover);
        assert!(!s.interaction().is_dragging());

        assert!(!s.handle_pointer(&press(screen(&s, Vec2::new(-490.0, -390.0)))));
        let held = PointerInput { pos: Some(screen(&s, Vec2::new(-480.0, -380.0))), held: true, ..Default::default() };
        s.handle_pointer(&held);
        assert_eq!(*s.registry().get(0).unwrap().quad(), before);
    }

    #[test]
    fn arrow_nudges_only_selected_point() {
        let mut s = state();
        s.add_surface("a", fake::video(640, 480));
        let before = *s.registry().get(0).unwrap().quad();

        assert!(!s.apply(Action::Nudge(NudgeDirection::Right)));

        s.interaction.selected_point = Some(Corner::TopRight);
        assert!(s.apply(Action::Nudge(NudgeDirection::Right)));
        let after = s.registry().get(0).unwrap().quad();
        assert_eq!(after.corner(Corner::TopRight), before.corner(Corner::TopRight) + Vec2::new(1.0, 0.0));
        assert_eq!(after.corner(Corner::TopLeft), before.corner(Corner::TopLeft));
    }

    #[test]
    fn reset_restores_auto_fit() {
        let mut s = state();
        s.add_surface("a", fake::video(1920, 1080));
        s.apply(Action::Scale(1.05));
        s.apply(Action::ResetPlacement);
        assert_eq!(s.registry().get(0).unwrap().corner(Corner::TopLeft), Vec2::new(-280.0, -157.5));
    }

    // ── paint ─────────────────────────────────────────────────────────────

    #[test]
    fn handles_follow_hover_and_selection() {
        let mut s = state();
        s.add_surface("a", fake::video(640, 480));
        let mut list = DrawList::new();
        s.paint(&mut list);
        assert_eq!(circles(&list), vec![8.0; 4]);

        s.interaction.hover_point = Some(Corner::TopRight);
        s.interaction.selected_point = Some(Corner::BottomLeft);
        list.clear();
        s.paint(&mut list);
        let mut radii = circles(&list);
        radii.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(radii, vec![8.0, 8.0, 10.0, 12.0]);

        let outlines = list.items().iter().filter(|i| matches!(&i.cmd, DrawCmd::Polyline(p) if p.closed)).count();
        assert_eq!(outlines, 1);
    }

    #[test]
    fn hidden_selected_surface_has_no_handles_or_warp() {
        let mut s = state();
        s.add_surface("a", fake::video(640, 480));
        s.apply(Action::ToggleHide);

        let mut list = DrawList::new();
        s.paint(&mut list);
        assert!(list.is_empty());
        assert_eq!(s.registry().selected(), Some(0));
    }

    #[test]
    fn warps_are_emitted_back_to_front() {
        let mut s = state();
        let front = s.add_surface("front", fake::video(640, 480));
        let back = s.add_surface("back", fake::image(4, 4));
        s.apply(Action::ToggleCalibration);

        let mut list = DrawList::new();
        s.paint(&mut list);
        let keys: Vec<u64> = list
            .iter_in_paint_order()
            .filter_map(|i| match &i.cmd {
                DrawCmd::Warp(w) => Some(w.texture.0),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec![back.0, front.0]);
    }
}
