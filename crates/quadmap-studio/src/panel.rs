//! Surface list panel: one row per surface, front-most at the top.
//!
//! Layout is pure so it can be hit-tested and unit-tested without a window.
//! Painting reads a [`SurfaceListEntry`] projection and never touches the
//! registry; clicks come back out as [`ListCommand`]s. Each row reads
//! `name (status)` between its swatch and its buttons.

use quadmap_core::{ListCommand, SurfaceListEntry};
use quadmap_engine::coords::{Rect, Vec2};
use quadmap_engine::paint::Color;
use quadmap_engine::scene::{DrawList, ZIndex};

use crate::label::Labels;

pub const PANEL_WIDTH: f32 = 360.0;
pub const ROW_HEIGHT: f32 = 28.0;
const MARGIN: f32 = 12.0;
const PADDING: f32 = 6.0;
const BUTTON: f32 = 20.0;
const BUTTON_GAP: f32 = 4.0;
const GLYPH_WIDTH: f32 = 1.5;

/// Per-row buttons, left to right.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RowButton {
    Play,
    Mute,
    Hide,
    Up,
    Down,
    Delete,
}

impl RowButton {
    pub const ALL: [RowButton; 6] = [
        RowButton::Play,
        RowButton::Mute,
        RowButton::Hide,
        RowButton::Up,
        RowButton::Down,
        RowButton::Delete,
    ];

    pub fn command(self, index: usize) -> ListCommand {
        match self {
            RowButton::Play => ListCommand::TogglePlay(index),
            RowButton::Mute => ListCommand::ToggleMute(index),
            RowButton::Hide => ListCommand::ToggleHide(index),
            RowButton::Up => ListCommand::MoveUp(index),
            RowButton::Down => ListCommand::MoveDown(index),
            RowButton::Delete => ListCommand::Delete(index),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    pub index: usize,
    pub rect: Rect,
    pub swatch: Rect,
    /// Space left for the row's text.
    pub label: Rect,
    pub buttons: [(RowButton, Rect); 6],
}

impl RowLayout {
    fn new(index: usize, rect: Rect) -> Self {
        let cy = rect.origin.y + (rect.size.y - BUTTON) * 0.5;
        let swatch = Rect::new(rect.origin.x + PADDING, cy, BUTTON, BUTTON);

        let strip = RowButton::ALL.len() as f32 * (BUTTON + BUTTON_GAP) - BUTTON_GAP;
        let x0 = rect.max().x - PADDING - strip;
        let buttons = std::array::from_fn(|slot| {
            let x = x0 + slot as f32 * (BUTTON + BUTTON_GAP);
            (RowButton::ALL[slot], Rect::new(x, cy, BUTTON, BUTTON))
        });

        let label_x = swatch.max().x + PADDING;
        let label = Rect::new(label_x, rect.origin.y, (x0 - PADDING - label_x).max(0.0), rect.size.y);

        Self { index, rect, swatch, label, buttons }
    }

    pub fn button(&self, which: RowButton) -> Rect {
        self.buttons
            .iter()
            .find(|(b, _)| *b == which)
            .map(|(_, r)| *r)
            .unwrap_or_default()
    }
}

/// Panel geometry for `count` surfaces in a `viewport`-sized window.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelLayout {
    pub panel: Rect,
    pub rows: Vec<RowLayout>,
}

impl PanelLayout {
    /// Anchors the panel to the top-right corner. An empty list keeps one
    /// row of height for the drop hint.
    pub fn compute(viewport: Vec2, count: usize) -> Self {
        let x = (viewport.x - MARGIN - PANEL_WIDTH).max(0.0);
        let h = 2.0 * PADDING + count.max(1) as f32 * ROW_HEIGHT;
        let panel = Rect::new(x, MARGIN, PANEL_WIDTH, h);

        let rows = (0..count)
            .map(|i| {
                let y = panel.origin.y + PADDING + i as f32 * ROW_HEIGHT;
                RowLayout::new(i, Rect::new(x, y, PANEL_WIDTH, ROW_HEIGHT))
            })
            .collect();

        Self { panel, rows }
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        self.panel.contains(p)
    }

    /// Command for a click at `p`. A row click outside its buttons selects.
    pub fn hit(&self, p: Vec2) -> Option<ListCommand> {
        let row = self.rows.iter().find(|r| r.rect.contains(p))?;
        let cmd = row
            .buttons
            .iter()
            .find(|(_, r)| r.contains(p))
            .map(|(b, _)| b.command(row.index))
            .unwrap_or(ListCommand::Select(row.index));
        Some(cmd)
    }

    /// Without `labels` (no font) rows and the hint draw without text.
    pub fn paint(&self, list: &mut DrawList, entries: &[SurfaceListEntry], labels: Option<Labels<'_>>) {
        let z = ZIndex::OVERLAY;
        list.push_rect(z, self.panel, Color::from_srgb_u8(24, 24, 28, 220));

        if self.rows.is_empty() {
            paint_drop_hint(list, self.panel, labels);
            return;
        }

        for (row, entry) in self.rows.iter().zip(entries) {
            if entry.selected {
                list.push_rect(z.above(1), row.rect.inset(2.0), Color::from_srgb_u8(60, 60, 72, 255));
            }

            let swatch = if entry.status.hidden { entry.color.with_alpha(0.3) } else { entry.color };
            list.push_rect(z.above(2), row.swatch, swatch);

            if let Some(labels) = labels {
                let ink = if entry.status.hidden {
                    Color::from_srgb_u8(120, 120, 128, 255)
                } else {
                    Color::WHITE
                };
                let text = format!("{} ({})", entry.name, entry.status);
                labels.paint(list, z.above(3), &text, row.label, ink);
            }

            for (button, rect) in &row.buttons {
                paint_button(list, *button, *rect, entry);
            }
        }
    }
}

const DROP_HINT: &str = "Drop images or videos here";

fn paint_drop_hint(list: &mut DrawList, panel: Rect, labels: Option<Labels<'_>>) {
    let arm = 7.0;
    let color = Color::from_srgb_u8(140, 140, 150, 255);
    let z = ZIndex::OVERLAY.above(3);

    // The plus moves to the left edge to make room for the hint text.
    let c = match labels {
        Some(labels) => {
            let row = panel.inset(PADDING);
            let indent = BUTTON + PADDING;
            let text = Rect::new(row.origin.x + indent, row.origin.y, row.size.x - indent, row.size.y);
            labels.paint(list, z, DROP_HINT, text, color);
            Vec2::new(row.origin.x + BUTTON * 0.5, row.center().y)
        }
        None => panel.center(),
    };
    list.push_polyline(z, [Vec2::new(c.x - arm, c.y), Vec2::new(c.x + arm, c.y)], 2.0, color, false);
    list.push_polyline(z, [Vec2::new(c.x, c.y - arm), Vec2::new(c.x, c.y + arm)], 2.0, color, false);
}

fn paint_button(list: &mut DrawList, button: RowButton, rect: Rect, entry: &SurfaceListEntry) {
    let status = entry.status;
    let (active, enabled) = match button {
        RowButton::Play => (status.playing, true),
        RowButton::Mute => (status.muted, true),
        RowButton::Hide => (status.hidden, true),
        RowButton::Up => (false, entry.can_move_up),
        RowButton::Down => (false, entry.can_move_down),
        RowButton::Delete => (false, true),
    };

    let fill = match (button, active) {
        (RowButton::Delete, _) => Color::from_srgb_u8(120, 36, 44, 255),
        (_, true) => Color::from_srgb_u8(70, 110, 200, 255),
        (_, false) => Color::from_srgb_u8(48, 48, 56, 255),
    };
    let ink = if enabled {
        Color::WHITE
    } else {
        Color::from_srgb_u8(100, 100, 108, 255)
    };

    list.push_rect(ZIndex::OVERLAY.above(2), rect, fill);
    paint_glyph(list, button, rect.inset(5.0), status.playing, ink);
}

fn paint_glyph(list: &mut DrawList, button: RowButton, r: Rect, playing: bool, ink: Color) {
    let z = ZIndex::OVERLAY.above(3);
    let (x0, y0) = (r.origin.x, r.origin.y);
    let (x1, y1) = (r.max().x, r.max().y);
    let c = r.center();
    let p = Vec2::new;

    match button {
        RowButton::Play if playing => {
            let dx = r.size.x * 0.25;
            list.push_polyline(z, [p(c.x - dx, y0), p(c.x - dx, y1)], 2.0, ink, false);
            list.push_polyline(z, [p(c.x + dx, y0), p(c.x + dx, y1)], 2.0, ink, false);
        }
        RowButton::Play => {
            list.push_polyline(z, [p(x0, y0), p(x1, c.y), p(x0, y1)], GLYPH_WIDTH, ink, true);
        }
        RowButton::Mute => {
            let mid = x0 + r.size.x * 0.45;
            let speaker = [
                p(x0, c.y - 2.0),
                p(x0 + 3.0, c.y - 2.0),
                p(mid, y0),
                p(mid, y1),
                p(x0 + 3.0, c.y + 2.0),
                p(x0, c.y + 2.0),
            ];
            list.push_polyline(z, speaker, GLYPH_WIDTH, ink, true);
        }
        RowButton::Hide => {
            let eye = [p(x0, c.y), p(c.x, y0 + 1.0), p(x1, c.y), p(c.x, y1 - 1.0)];
            list.push_polyline(z, eye, GLYPH_WIDTH, ink, true);
            list.push_solid_circle(z, c, 1.8, ink);
        }
        RowButton::Up => {
            list.push_polyline(z, [p(x0, c.y + 3.0), p(c.x, c.y - 3.0), p(x1, c.y + 3.0)], 2.0, ink, false);
        }
        RowButton::Down => {
            list.push_polyline(z, [p(x0, c.y - 3.0), p(c.x, c.y + 3.0), p(x1, c.y - 3.0)], 2.0, ink, false);
        }
        RowButton::Delete => {
            list.push_polyline(z, [p(x0, y0), p(x1, y1)], 2.0, ink, false);
            list.push_polyline(z, [p(x1, y0), p(x0, y1)], 2.0, ink, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadmap_core::{SurfaceId, SurfaceStatus};
    use quadmap_engine::scene::DrawCmd;
    use quadmap_engine::scene::shapes::text::TextCmd;

    use crate::label::system_font;

    fn entry(index: usize) -> SurfaceListEntry {
        SurfaceListEntry {
            index,
            id: SurfaceId(index as u64 + 1),
            name: format!("clip{index}.mp4"),
            status: SurfaceStatus { playing: true, muted: false, hidden: false },
            color: Color::from_srgb_u8(200, 120, 180, 255),
            selected: index == 0,
            can_move_up: index > 0,
            can_move_down: true,
        }
    }

    // ── layout ──

    #[test]
    fn panel_hugs_top_right_and_grows_per_row() {
        let empty = PanelLayout::compute(Vec2::new(1280.0, 720.0), 0);
        assert!(empty.rows.is_empty());
        assert_eq!(empty.panel.origin, Vec2::new(1280.0 - MARGIN - PANEL_WIDTH, MARGIN));

        let three = PanelLayout::compute(Vec2::new(1280.0, 720.0), 3);
        assert_eq!(three.rows.len(), 3);
        assert_eq!(three.panel.size.y, 2.0 * PADDING + 3.0 * ROW_HEIGHT);
        assert_eq!(empty.panel.size.y, 2.0 * PADDING + ROW_HEIGHT);
        assert!(three.rows[1].rect.origin.y > three.rows[0].rect.origin.y);
    }

    #[test]
    fn buttons_fit_inside_their_row() {
        let layout = PanelLayout::compute(Vec2::new(800.0, 600.0), 1);
        let row = &layout.rows[0];
        assert!(row.swatch.max().x < row.label.origin.x);
        assert!(row.label.max().x < row.button(RowButton::Play).origin.x);
        assert!(row.label.size.x >= 160.0);
        for (_, r) in &row.buttons {
            assert!(r.origin.x >= row.rect.origin.x);
            assert!(r.max().x <= row.rect.max().x);
            assert!(r.origin.y >= row.rect.origin.y);
            assert!(r.max().y <= row.rect.max().y);
        }
    }

    // ── hit testing ──

    #[test]
    fn row_and_button_hits_map_to_commands() {
        let layout = PanelLayout::compute(Vec2::new(1280.0, 720.0), 2);
        let row = &layout.rows[1];

        assert_eq!(layout.hit(row.swatch.center()), Some(ListCommand::Select(1)));
        assert_eq!(layout.hit(row.button(RowButton::Delete).center()), Some(ListCommand::Delete(1)));
        assert_eq!(layout.hit(row.button(RowButton::Mute).center()), Some(ListCommand::ToggleMute(1)));
        assert_eq!(layout.hit(row.button(RowButton::Up).center()), Some(ListCommand::MoveUp(1)));
        assert_eq!(
            layout.hit(layout.rows[0].button(RowButton::Hide).center()),
            Some(ListCommand::ToggleHide(0))
        );
    }

    #[test]
    fn padding_and_outside_points_hit_nothing() {
        let layout = PanelLayout::compute(Vec2::new(1280.0, 720.0), 1);
        let top_pad = Vec2::new(layout.panel.center().x, layout.panel.origin.y + 1.0);
        assert!(layout.contains(top_pad));
        assert_eq!(layout.hit(top_pad), None);
        assert_eq!(layout.hit(Vec2::new(10.0, 10.0)), None);
        assert!(!layout.contains(Vec2::new(10.0, 10.0)));
    }

    // ── paint ──

    #[test]
    fn paints_on_the_overlay_layer() {
        let layout = PanelLayout::compute(Vec2::new(1280.0, 720.0), 2);
        let mut list = DrawList::new();
        layout.paint(&mut list, &[entry(0), entry(1)], None);

        assert!(!list.is_empty());
        assert!(list.items().iter().all(|it| it.key.z >= ZIndex::OVERLAY));
        // Background + selection highlight + two swatches + 12 button faces.
        let rects = list.items().iter().filter(|it| matches!(it.cmd, DrawCmd::Rect(_))).count();
        assert_eq!(rects, 1 + 1 + 2 + 12);
    }

    #[test]
    fn empty_panel_draws_drop_hint() {
        let layout = PanelLayout::compute(Vec2::new(640.0, 480.0), 0);
        let mut list = DrawList::new();
        layout.paint(&mut list, &[], None);
        let lines = list.items().iter().filter(|it| matches!(it.cmd, DrawCmd::Polyline(_))).count();
        assert_eq!(lines, 2);
        assert!(!list.items().iter().any(|it| matches!(it.cmd, DrawCmd::Text(_))));
    }

    fn texts(list: &DrawList) -> Vec<&TextCmd> {
        list.items()
            .iter()
            .filter_map(|it| match &it.cmd {
                DrawCmd::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn rows_read_name_and_status() {
        let Some((fonts, font)) = system_font() else { return };
        let layout = PanelLayout::compute(Vec2::new(1280.0, 720.0), 2);
        let mut second = entry(1);
        second.status.playing = false;
        let mut list = DrawList::new();
        layout.paint(&mut list, &[entry(0), second], Some(Labels::new(&fonts, font)));

        let texts = texts(&list);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].text, "clip0.mp4 (Playing)");
        assert_eq!(texts[1].text, "clip1.mp4 (Paused)");
        assert_eq!(texts[0].origin.x, layout.rows[0].label.origin.x);
        assert!(texts[1].origin.y > texts[0].origin.y);
    }

    #[test]
    fn long_names_stay_clear_of_the_buttons() {
        let Some((fonts, font)) = system_font() else { return };
        let layout = PanelLayout::compute(Vec2::new(1280.0, 720.0), 1);
        let mut long = entry(0);
        long.name = "projection-wall-left-side-final-render-v12-4k.mov".into();
        let mut list = DrawList::new();
        layout.paint(&mut list, &[long], Some(Labels::new(&fonts, font)));

        let text = texts(&list)[0];
        assert!(text.text.ends_with('…'));
        let right = text.origin.x + fonts.measure_width(&text.text, font, text.size);
        assert!(right <= layout.rows[0].button(RowButton::Play).origin.x);
    }

    #[test]
    fn empty_panel_hint_has_text_when_a_font_exists() {
        let Some((fonts, font)) = system_font() else { return };
        let layout = PanelLayout::compute(Vec2::new(640.0, 480.0), 0);
        let mut list = DrawList::new();
        layout.paint(&mut list, &[], Some(Labels::new(&fonts, font)));
        assert_eq!(texts(&list)[0].text, DROP_HINT);
        assert!(list.items().iter().all(|it| it.key.z >= ZIndex::OVERLAY));
    }
}
