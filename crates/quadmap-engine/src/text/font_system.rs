use std::fmt;

use fontdue::layout::{CoordinateSystem, Layout, TextStyle};

/// Error returned by [`FontSystem::load_font`].
#[derive(Debug, Clone)]
pub struct FontLoadError(pub String);

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font load error: {}", self.0)
    }
}

impl std::error::Error for FontLoadError {}

/// Opaque handle to a font loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// Owns the loaded fonts.
///
/// The app keeps it and hands it to the text renderer each frame so glyphs
/// can be rasterized on first use.
#[derive(Default)]
pub struct FontSystem {
    fonts: Vec<fontdue::Font>,
}

impl FontSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TrueType or OpenType font.
    pub fn load_font(&mut self, bytes: &[u8]) -> Result<FontId, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;
        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        log::debug!("font {id:?} loaded ({} glyphs)", self.fonts[id.0].glyph_count());
        Ok(id)
    }

    pub(crate) fn get(&self, id: FontId) -> Option<&fontdue::Font> {
        self.fonts.get(id.0)
    }

    /// Advance width of `text` on one line, in logical pixels. Unknown fonts
    /// measure zero.
    pub fn measure_width(&self, text: &str, id: FontId, size: f32) -> f32 {
        let Some(font) = self.get(id) else { return 0.0 };
        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.append(&[font], &TextStyle::new(text, size, 0));

        // Pen position after each glyph, not the bitmap edge, so trailing
        // spaces and overhangs count the way the renderer places them.
        layout
            .glyphs()
            .iter()
            .map(|g| {
                let m = font.metrics_indexed(g.key.glyph_index, size);
                (g.x - m.xmin as f32 + m.advance_width).max(0.0)
            })
            .fold(0.0, f32::max)
    }

    /// `text` cut to fit `max_width`, ending in an ellipsis when shortened.
    pub fn elide(&self, text: &str, id: FontId, size: f32, max_width: f32) -> String {
        if self.measure_width(text, id, size) <= max_width {
            return text.to_string();
        }

        // Longest char prefix that still fits with the ellipsis; binary
        // search over char boundaries.
        let bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let fits = |n: usize| self.measure_width(&format!("{}…", &text[..bounds[n]]), id, size) <= max_width;
        let (mut lo, mut hi) = (0, bounds.len());
        while lo + 1 < hi {
            let mid = (lo + hi) / 2;
            if fits(mid) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        format!("{}…", text[..bounds[lo]].trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM_FONTS: [&str; 3] = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    ];

    /// A font system with one real font, or `None` on machines without one.
    fn with_font() -> Option<(FontSystem, FontId)> {
        let bytes = SYSTEM_FONTS.iter().find_map(|p| std::fs::read(p).ok())?;
        let mut fonts = FontSystem::new();
        let id = fonts.load_font(&bytes).ok()?;
        Some((fonts, id))
    }

    #[test]
    fn garbage_is_not_a_font() {
        let mut fonts = FontSystem::new();
        assert!(fonts.load_font(b"not a font").is_err());
    }

    #[test]
    fn unknown_font_measures_zero_and_keeps_text() {
        let fonts = FontSystem::new();
        assert_eq!(fonts.measure_width("clip.mp4", FontId(3), 14.0), 0.0);
        assert_eq!(fonts.elide("clip.mp4", FontId(3), 14.0, 1.0), "clip.mp4");
    }

    #[test]
    fn width_grows_with_text_and_size() {
        let Some((fonts, id)) = with_font() else { return };
        let short = fonts.measure_width("ab", id, 14.0);
        assert!(short > 0.0);
        assert!(fonts.measure_width("abcd", id, 14.0) > short);
        assert!(fonts.measure_width("ab", id, 28.0) > short);
    }

    #[test]
    fn long_names_are_elided_to_fit() {
        let Some((fonts, id)) = with_font() else { return };
        let name = "a-very-long-projection-clip-name.mp4";
        let max = fonts.measure_width("a-very-long", id, 14.0);

        let cut = fonts.elide(name, id, 14.0, max);
        assert!(cut.ends_with('…'));
        assert!(name.starts_with(cut.trim_end_matches('…')));
        assert!(fonts.measure_width(&cut, id, 14.0) <= max);

        assert_eq!(fonts.elide("a.mp4", id, 14.0, 1000.0), "a.mp4");
    }
}
