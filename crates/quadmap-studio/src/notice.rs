//! Transient error notices along the bottom edge.

use std::time::{Duration, Instant};

use quadmap_engine::coords::{Rect, Vec2};
use quadmap_engine::paint::Color;
use quadmap_engine::scene::{DrawList, ZIndex};

use crate::label::Labels;

/// How long a notice stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(4);
const MAX_NOTICES: usize = 4;
const TEXT_HEIGHT: f32 = 22.0;
const STRIP_HEIGHT: f32 = 4.0;
const SLOT_GAP: f32 = 6.0;
const MARGIN: f32 = 12.0;
const TEXT_INDENT: f32 = 8.0;

#[derive(Debug, Clone)]
struct Notice {
    message: String,
    shown_at: Instant,
}

/// Screen placement of one notice: the message band with a red strip
/// under it that shrinks as the notice expires.
#[derive(Debug, Clone, PartialEq)]
pub struct NoticeSlot<'a> {
    pub message: &'a str,
    pub band: Rect,
    pub strip: Rect,
}

/// Short-lived notices for failed loads. The newest message is also logged
/// and shown in the window title.
#[derive(Debug, Default)]
pub struct Notices {
    items: Vec<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>, now: Instant) {
        let message = message.into();
        log::warn!("notice: {message}");
        self.items.push(Notice { message, shown_at: now });
        if self.items.len() > MAX_NOTICES {
            self.items.remove(0);
        }
    }

    /// Drops expired notices.
    pub fn expire(&mut self, now: Instant) {
        self.items.retain(|n| now.saturating_duration_since(n.shown_at) < NOTICE_TTL);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Newest message, if any.
    pub fn latest(&self) -> Option<&str> {
        self.items.last().map(|n| n.message.as_str())
    }

    /// One slot per notice, newest at the bottom.
    pub fn slots(&self, viewport: Vec2, now: Instant) -> Vec<NoticeSlot<'_>> {
        let full = (viewport.x - 2.0 * MARGIN).max(0.0);
        let mut y = viewport.y - MARGIN - STRIP_HEIGHT - TEXT_HEIGHT;
        let mut out = Vec::with_capacity(self.items.len());
        for n in self.items.iter().rev() {
            let age = now.saturating_duration_since(n.shown_at).as_secs_f32();
            let left = (1.0 - age / NOTICE_TTL.as_secs_f32()).clamp(0.0, 1.0);
            out.push(NoticeSlot {
                message: &n.message,
                band: Rect::new(MARGIN, y, full, TEXT_HEIGHT),
                strip: Rect::new(MARGIN, y + TEXT_HEIGHT, full * left, STRIP_HEIGHT),
            });
            y -= TEXT_HEIGHT + STRIP_HEIGHT + SLOT_GAP;
        }
        out
    }

    /// Without `labels` only the shrinking strips are drawn.
    pub fn paint(&self, list: &mut DrawList, viewport: Vec2, now: Instant, labels: Option<Labels<'_>>) {
        let z = ZIndex::OVERLAY.above(10);
        let strip = Color::from_srgb_u8(220, 53, 69, 230);
        let band = Color::from_srgb_u8(40, 16, 20, 220);
        for slot in self.slots(viewport, now) {
            list.push_rect(z, slot.strip, strip);
            if let Some(labels) = labels {
                list.push_rect(z, slot.band, band);
                let text = Rect::new(
                    slot.band.origin.x + TEXT_INDENT,
                    slot.band.origin.y,
                    (slot.band.size.x - 2.0 * TEXT_INDENT).max(0.0),
                    slot.band.size.y,
                );
                labels.paint(list, z.above(1), slot.message, text, Color::WHITE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadmap_engine::scene::DrawCmd;

    use crate::label::system_font;

    // ── lifetime ──

    #[test]
    fn notices_expire_after_ttl() {
        let t0 = Instant::now();
        let mut n = Notices::new();
        n.push("bad.txt: unsupported file type", t0);
        n.expire(t0 + Duration::from_secs(1));
        assert_eq!(n.len(), 1);
        assert_eq!(n.latest(), Some("bad.txt: unsupported file type"));

        n.expire(t0 + NOTICE_TTL);
        assert!(n.is_empty());
    }

    #[test]
    fn oldest_notice_is_dropped_when_full() {
        let t0 = Instant::now();
        let mut n = Notices::new();
        for i in 0..6 {
            n.push(format!("n{i}"), t0);
        }
        assert_eq!(n.len(), MAX_NOTICES);
        assert_eq!(n.latest(), Some("n5"));
    }

    // ── layout ──

    #[test]
    fn strips_shrink_and_stack_upwards() {
        let t0 = Instant::now();
        let mut n = Notices::new();
        n.push("a", t0);
        n.push("b", t0 + Duration::from_secs(2));

        let now = t0 + Duration::from_secs(2);
        let slots = n.slots(Vec2::new(824.0, 600.0), now);
        assert_eq!(slots.len(), 2);

        // Newest first, full width, at the bottom.
        assert_eq!(slots[0].message, "b");
        assert_eq!(slots[0].strip.size.x, 800.0);
        assert_eq!(slots[0].strip.max().y, 600.0 - MARGIN);
        assert_eq!(slots[0].band.max().y, slots[0].strip.origin.y);
        // Older one is half expired and sits above.
        assert!((slots[1].strip.size.x - 400.0).abs() < 1e-3);
        assert!(slots[1].strip.max().y < slots[0].band.origin.y);
        assert_eq!(slots[1].band.size.x, 800.0);
    }

    // ── paint ──

    #[test]
    fn paint_without_font_draws_strips_only() {
        let t0 = Instant::now();
        let mut n = Notices::new();
        n.push("a", t0);
        let mut list = DrawList::new();
        n.paint(&mut list, Vec2::new(800.0, 600.0), t0, None);
        assert_eq!(list.len(), 1);
        assert!(matches!(list.items()[0].cmd, DrawCmd::Rect(_)));
    }

    #[test]
    fn paint_shows_the_message() {
        let Some((fonts, font)) = system_font() else { return };
        let t0 = Instant::now();
        let mut n = Notices::new();
        n.push("notes.txt: unsupported file type", t0);
        let mut list = DrawList::new();
        n.paint(&mut list, Vec2::new(800.0, 600.0), t0, Some(Labels::new(&fonts, font)));

        let text = list
            .items()
            .iter()
            .find_map(|it| match &it.cmd {
                DrawCmd::Text(t) => Some(t),
                _ => None,
            })
            .map(|t| t.text.as_str());
        assert_eq!(text, Some("notes.txt: unsupported file type"));
        assert!(list.items().iter().all(|it| it.key.z >= ZIndex::OVERLAY));
    }
}
