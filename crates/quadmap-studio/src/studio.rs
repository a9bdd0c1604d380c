use std::path::PathBuf;
use std::time::Instant;

use log::{debug, info};
use winit::event::WindowEvent;
use winit::window::WindowId;

use quadmap_core::{Action, CompositionConfig, CompositionState, PointerInput, Stage};
use quadmap_engine::coords::Vec2;
use quadmap_engine::core::{App, AppControl, FrameCtx};
use quadmap_engine::input::MouseButton;
use quadmap_engine::paint::Color;
use quadmap_engine::render::shapes::circle::CircleRenderer;
use quadmap_engine::render::shapes::polyline::PolylineRenderer;
use quadmap_engine::render::shapes::rect::RectRenderer;
use quadmap_engine::render::shapes::text::TextRenderer;
use quadmap_engine::render::shapes::warp::WarpRenderer;
use quadmap_engine::render::{RenderCtx, RenderTarget};
use quadmap_engine::scene::DrawList;
use quadmap_engine::text::{FontId, FontSystem};
use quadmap_engine::window::CursorIcon;
use quadmap_media::{MediaLoader, VideoConfig};

use crate::label::{self, Labels};
use crate::notice::Notices;
use crate::panel::PanelLayout;

/// Window-level options that are not part of the composition.
#[derive(Debug, Clone, PartialEq)]
pub struct StudioConfig {
    pub title: String,
    /// Start with the panel and cursor hidden.
    pub kiosk: bool,
    /// Fixed canvas size; `None` follows the window.
    pub canvas: Option<Vec2>,
    /// Font for overlay text; `None` searches the usual system paths.
    pub font: Option<PathBuf>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            title: "quadmap".to_string(),
            kiosk: false,
            canvas: None,
            font: None,
        }
    }
}

/// One draw list with its own shape renderers.
///
/// Renderers upload their instances when the frame is submitted, so each
/// can draw once per frame; a layer that must cover another needs its own.
#[derive(Default)]
struct Layer {
    list: DrawList,
    rects: RectRenderer,
    lines: PolylineRenderer,
    circles: CircleRenderer,
}

impl Layer {
    fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        self.rects.render(ctx, target, &mut self.list);
        self.lines.render(ctx, target, &mut self.list);
        self.circles.render(ctx, target, &mut self.list);
    }
}

/// The mapping application driven by the engine runtime.
pub struct Studio {
    composition: CompositionState,
    loader: MediaLoader,
    notices: Notices,

    fonts: FontSystem,
    font: Option<FontId>,

    /// Surfaces plus their calibration outlines and handles.
    scene: Layer,
    warp: WarpRenderer,
    /// Panel and notices, drawn after the whole scene.
    overlay: Layer,
    text: TextRenderer,

    title: String,
    kiosk: bool,
    canvas: Option<Vec2>,
    cursor_visible: Option<bool>,
    cursor_icon: CursorIcon,
    last_title: String,
}

impl Studio {
    pub fn new(config: StudioConfig, composition: CompositionConfig, video: VideoConfig) -> Self {
        let mut fonts = FontSystem::new();
        let font = label::load_font(&mut fonts, config.font.as_deref());
        if let Some(canvas) = config.canvas {
            info!("studio: canvas {}x{}", canvas.x, canvas.y);
        }
        Self {
            composition: CompositionState::new(composition),
            loader: MediaLoader::new(video),
            notices: Notices::new(),
            fonts,
            font,
            scene: Layer::default(),
            warp: WarpRenderer::new(),
            overlay: Layer::default(),
            text: TextRenderer::new(),
            title: config.title,
            kiosk: config.kiosk,
            canvas: config.canvas,
            cursor_visible: None,
            cursor_icon: CursorIcon::Default,
            last_title: String::new(),
        }
    }

    /// Canvas for a `width` x `height` window: the window itself, or the
    /// configured canvas seen from its top-left corner.
    fn stage(&self, width: f32, height: f32) -> Stage {
        match self.canvas {
            Some(canvas) => Stage::on_canvas(canvas, width, height),
            None => Stage::fitted(width, height),
        }
    }

    /// Queues a file for loading; rejected files become notices.
    pub fn open(&mut self, path: impl Into<PathBuf>) {
        if let Err(e) = self.loader.request(path) {
            self.notices.push(e.to_string(), Instant::now());
        }
    }

    fn collect_loads(&mut self, now: Instant) {
        for outcome in self.loader.poll() {
            match outcome.result {
                Ok(media) => {
                    let id = self.composition.add_surface(media.name, media.source);
                    debug!("studio: surface {id} from '{}'", media.path.display());
                }
                Err(e) => self.notices.push(e.to_string(), now),
            }
        }
    }

    fn handle_keys(&mut self, ctx: &mut FrameCtx<'_, '_>) {
        let presses: Vec<_> = ctx.input_frame.key_presses(true).collect();
        for (key, repeat) in presses {
            let Some(action) = Action::from_key(key) else { continue };
            if repeat && !action.repeats() {
                continue;
            }
            match action {
                Action::ToggleFullscreen => ctx.window.toggle_fullscreen(),
                Action::ToggleKiosk => {
                    self.kiosk = !self.kiosk;
                    info!("studio: kiosk {}", if self.kiosk { "on" } else { "off" });
                }
                _ => {
                    self.composition.apply(action);
                }
            }
        }
    }

    fn handle_pointer(&mut self, ctx: &FrameCtx<'_, '_>, panel: &PanelLayout) {
        let pos = ctx.input.pointer();
        let frame = ctx.input_frame;
        let mut pressed = frame.buttons_pressed.contains(&MouseButton::Left);

        if pressed && !self.kiosk {
            if let Some(p) = pos.filter(|p| panel.contains(*p)) {
                if let Some(cmd) = panel.hit(p) {
                    self.composition.apply_list_command(cmd);
                }
                pressed = false;
            }
        }

        let input = PointerInput {
            pos,
            pressed,
            held: ctx.input.button_down(MouseButton::Left),
            released: frame.buttons_released.contains(&MouseButton::Left),
            wheel: frame.scroll_lines,
        };
        self.composition.handle_pointer(&input);
    }

    fn sync_window(&mut self, ctx: &FrameCtx<'_, '_>) {
        let show_cursor = !self.kiosk;
        if self.cursor_visible != Some(show_cursor) {
            ctx.window.set_cursor_visible(show_cursor);
            self.cursor_visible = Some(show_cursor);
        }

        let interaction = self.composition.interaction();
        let icon = if interaction.is_dragging() {
            CursorIcon::Grabbing
        } else if interaction.hover_point.is_some() {
            CursorIcon::Grab
        } else {
            CursorIcon::Default
        };
        if icon != self.cursor_icon {
            ctx.window.set_cursor(icon);
            self.cursor_icon = icon;
        }

        let title = self.window_title();
        if title != self.last_title {
            ctx.window.set_title(&title);
            self.last_title = title;
        }
    }

    /// `quadmap | clip.mp4 | Playing | calibrating`, plus the newest notice.
    fn window_title(&self) -> String {
        let mut title = self.title.clone();
        if let Some(s) = self.composition.registry().selected_surface() {
            title.push_str(&format!(" | {} | {}", s.name(), s.status()));
        }
        title.push_str(&format!(" | {}", self.composition.mode()));
        if self.loader.pending() > 0 {
            title.push_str(&format!(" | loading {}", self.loader.pending()));
        }
        if let Some(msg) = self.notices.latest() {
            title.push_str(&format!(" | {msg}"));
        }
        title
    }
}

impl App for Studio {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        if let WindowEvent::DroppedFile(path) = event {
            info!("studio: dropped '{}'", path.display());
            self.open(path.clone());
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let now = ctx.time.now;
        let (w, h) = ctx.window.logical_size();
        let viewport = Vec2::new(w, h);

        self.collect_loads(now);
        self.notices.expire(now);

        self.composition.set_stage(self.stage(w, h));
        self.composition.tick(ctx.time.dt);

        self.handle_keys(ctx);
        let panel = PanelLayout::compute(viewport, self.composition.registry().len());
        self.handle_pointer(ctx, &panel);
        self.sync_window(ctx);

        self.paint(viewport, now);

        let Self { scene, warp, overlay, text, fonts, .. } = self;
        ctx.render(Color::BLACK, |rctx, target| {
            warp.render(rctx, target, &mut scene.list);
            scene.render(rctx, target);
            overlay.render(rctx, target);
            text.render(rctx, target, &mut overlay.list, fonts);
        })
    }
}

impl Studio {
    /// Fills both layers for this frame.
    fn paint(&mut self, viewport: Vec2, now: Instant) {
        self.scene.list.clear();
        self.overlay.list.clear();
        self.composition.paint(&mut self.scene.list);
        if self.kiosk {
            return;
        }

        let labels = self.font.map(|font| Labels::new(&self.fonts, font));
        // Rows may have changed since the layout used for hit testing.
        let panel = PanelLayout::compute(viewport, self.composition.registry().len());
        panel.paint(&mut self.overlay.list, &self.composition.list_view(), labels);
        self.notices.paint(&mut self.overlay.list, viewport, now, labels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quadmap_core::{ImageFrame, MediaSource, StillImage};
    use quadmap_engine::scene::{DrawCmd, ZIndex};

    fn studio() -> Studio {
        Studio::new(StudioConfig::default(), CompositionConfig::default(), VideoConfig::default())
    }

    // ── title ──

    #[test]
    fn title_shows_mode_without_surfaces() {
        assert_eq!(studio().window_title(), "quadmap | calibrating");
    }

    // ── open ──

    #[test]
    fn unsupported_drop_becomes_notice() {
        let mut s = studio();
        s.open("notes.txt");
        assert_eq!(s.loader.pending(), 0);
        assert_eq!(s.notices.len(), 1);
        assert!(s.window_title().contains("notes.txt"));
    }

    fn with_surface(mut s: Studio) -> Studio {
        s.composition.set_stage(s.stage(1280.0, 720.0));
        let frame = ImageFrame::new(64, 32, vec![255; 64 * 32 * 4]).expect("valid frame");
        s.composition.add_surface("logo.png", MediaSource::Image(StillImage::new(frame)));
        s
    }

    // ── stage ──

    #[test]
    fn stage_follows_window_without_a_canvas() {
        let s = studio();
        assert_eq!(s.stage(1280.0, 720.0), Stage::fitted(1280.0, 720.0));
    }

    #[test]
    fn configured_canvas_outgrows_the_window() {
        let s = Studio::new(
            StudioConfig { canvas: Some(Vec2::new(3840.0, 2160.0)), ..StudioConfig::default() },
            CompositionConfig::default(),
            VideoConfig::default(),
        );
        let stage = s.stage(1280.0, 720.0);
        assert_eq!(stage.canvas, Vec2::new(3840.0, 2160.0));
        assert_eq!(stage.visible, Stage::fitted(1280.0, 720.0).visible);

        let s = with_surface(s);
        let quad = s.composition.registry().selected_surface().expect("added").quad();
        // Centered on the window, not the canvas.
        assert!((quad.centroid() - stage.visible_center()).length() < 1e-3);
    }

    // ── layers ──

    #[test]
    fn panel_and_notices_paint_only_into_the_overlay() {
        let mut s = with_surface(studio());
        let now = Instant::now();
        s.notices.push("clip.mov: decoder failed", now);
        s.paint(Vec2::new(1280.0, 720.0), now);

        // Calibration handles and outlines stay in the scene layer.
        assert!(s.scene.list.items().iter().any(|it| matches!(it.cmd, DrawCmd::Warp(_))));
        assert!(s.scene.list.items().iter().any(|it| matches!(it.cmd, DrawCmd::Circle(_))));
        assert!(s.scene.list.items().iter().all(|it| it.key.z < ZIndex::OVERLAY));

        assert!(!s.overlay.list.is_empty());
        assert!(s.overlay.list.items().iter().all(|it| it.key.z >= ZIndex::OVERLAY));
        assert!(!s.overlay.list.items().iter().any(|it| matches!(it.cmd, DrawCmd::Warp(_))));
    }

    #[test]
    fn kiosk_paints_an_empty_overlay() {
        let mut s = with_surface(Studio::new(
            StudioConfig { kiosk: true, ..StudioConfig::default() },
            CompositionConfig::default(),
            VideoConfig::default(),
        ));
        s.paint(Vec2::new(1280.0, 720.0), Instant::now());
        assert!(!s.scene.list.is_empty());
        assert!(s.overlay.list.is_empty());
    }

    #[test]
    fn rows_are_labelled_when_a_font_loads() {
        let mut s = with_surface(studio());
        if s.font.is_none() {
            return;
        }
        s.paint(Vec2::new(1280.0, 720.0), Instant::now());
        let label = s.overlay.list.items().iter().find_map(|it| match &it.cmd {
            DrawCmd::Text(t) => Some(t.text.clone()),
            _ => None,
        });
        assert_eq!(label.as_deref(), Some("logo.png (Paused)"));
    }
}
