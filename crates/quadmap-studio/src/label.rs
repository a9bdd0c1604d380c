//! Overlay text: font discovery and single-line labels fitted into a box.

use std::path::Path;

use quadmap_engine::coords::{Rect, Vec2};
use quadmap_engine::paint::Color;
use quadmap_engine::scene::{DrawList, ZIndex};
use quadmap_engine::text::{FontId, FontSystem};

pub const LABEL_SIZE: f32 = 13.0;

const FONT_CANDIDATES: [&str; 5] = [
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
];

/// Loads `explicit` if given, else the first system font that parses.
///
/// `None` means overlay text is skipped; the panel and notices still draw.
pub fn load_font(fonts: &mut FontSystem, explicit: Option<&Path>) -> Option<FontId> {
    if let Some(path) = explicit {
        let loaded = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| fonts.load_font(&bytes).map_err(|e| e.to_string()));
        match loaded {
            Ok(id) => {
                log::info!("font: '{}'", path.display());
                return Some(id);
            }
            Err(e) => log::warn!("font '{}' unusable: {e}", path.display()),
        }
    }

    let found = FONT_CANDIDATES.iter().find_map(|p| {
        let bytes = std::fs::read(p).ok()?;
        let id = fonts.load_font(&bytes).ok()?;
        log::info!("font: '{p}'");
        Some(id)
    });
    if found.is_none() {
        log::warn!("no usable font found; overlay text disabled (try --font)");
    }
    found
}

/// A loaded font plus the size labels use.
#[derive(Copy, Clone)]
pub struct Labels<'a> {
    pub fonts: &'a FontSystem,
    pub font: FontId,
    pub size: f32,
}

impl<'a> Labels<'a> {
    pub fn new(fonts: &'a FontSystem, font: FontId) -> Self {
        Self { fonts, font, size: LABEL_SIZE }
    }

    /// Draws `text` left-aligned and vertically centered in `area`, elided
    /// to its width.
    pub fn paint(&self, list: &mut DrawList, z: ZIndex, text: &str, area: Rect, color: Color) {
        let fitted = self.fonts.elide(text, self.font, self.size, area.size.x);
        // fontdue lines are about 1.2em tall.
        let top = area.center().y - self.size * 0.6;
        list.push_text(z, fitted, self.font, self.size, color, Vec2::new(area.origin.x, top));
    }
}

#[cfg(test)]
pub(crate) fn system_font() -> Option<(FontSystem, FontId)> {
    let mut fonts = FontSystem::new();
    let id = load_font(&mut fonts, None)?;
    Some((fonts, id))
}
