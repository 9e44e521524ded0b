//! # Typography System
//!
//! Shapes and rasterizes legend labels with cosmic-text, blending glyph
//! coverage straight into a tiny-skia pixmap.

use crate::errors::TraceError;
use crate::types::Color;
use cosmic_text::{fontdb, Attrs, Buffer, Family, FontSystem, Metrics, Shaping, SwashCache};
use tiny_skia::{ColorU8, Pixmap, PremultipliedColorU8};

/// A font system holding exactly one loaded face.
pub struct Typesetter {
    font_system: FontSystem,
    swash_cache: SwashCache,
    family: String,
}

impl std::fmt::Debug for Typesetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typesetter")
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

impl Typesetter {
    /// Builds a typesetter from raw TrueType/OpenType bytes.
    pub fn from_font_bytes(bytes: Vec<u8>) -> Result<Self, TraceError> {
        let mut db = fontdb::Database::new();
        db.load_font_data(bytes);
        let family = db
            .faces()
            .next()
            .and_then(|face| face.families.first())
            .map(|(name, _)| name.clone())
            .ok_or_else(|| TraceError::AssetNotFound("font data contains no usable face".into()))?;
        db.set_sans_serif_family(family.clone());

        Ok(Self {
            font_system: FontSystem::new_with_locale_and_db("en-US".into(), db),
            swash_cache: SwashCache::new(),
            family,
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    fn shape(&mut self, text: &str, size: f32) -> Buffer {
        let mut buffer = Buffer::new(&mut self.font_system, Metrics::new(size, size * 1.2));
        let attrs = Attrs::new().family(Family::Name(&self.family));
        buffer.set_size(&mut self.font_system, None, None);
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
        buffer.shape_until_scroll(&mut self.font_system, false);
        buffer
    }

    /// Width and height of `text` set at `size` px. The height is the font
    /// size, so rows of a legend line up regardless of the label's glyphs.
    pub fn measure(&mut self, text: &str, size: f32) -> (f32, f32) {
        let buffer = self.shape(text, size);
        let width = buffer
            .layout_runs()
            .map(|run| run.line_w)
            .fold(0.0_f32, f32::max);
        (width.ceil(), size)
    }

    /// Draws `text` with its top-left corner at `(x, y)`.
    pub fn draw(
        &mut self,
        pixmap: &mut Pixmap,
        text: &str,
        x: i32,
        y: i32,
        size: f32,
        color: Color,
    ) {
        let buffer = self.shape(text, size);
        let text_color = cosmic_text::Color::rgba(color.r, color.g, color.b, color.a);
        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            text_color,
            |gx, gy, w, h, c| {
                let coverage = Color::new(c.r(), c.g(), c.b(), c.a());
                blend_rect(pixmap, x + gx, y + gy, w, h, coverage);
            },
        );
    }
}

/// Source-over blends a solid straight-alpha color into a rectangle of `pixmap`.
pub fn blend_rect(pixmap: &mut Pixmap, x: i32, y: i32, w: u32, h: u32, color: Color) {
    if color.a == 0 {
        return;
    }
    let width = pixmap.width() as i32;
    let height = pixmap.height() as i32;
    let src = ColorU8::from_rgba(color.r, color.g, color.b, color.a).premultiply();
    let pixels = pixmap.pixels_mut();

    for py in y.max(0)..(y + h as i32).min(height) {
        for px in x.max(0)..(x + w as i32).min(width) {
            let idx = (py * width + px) as usize;
            pixels[idx] = source_over(src, pixels[idx]);
        }
    }
}

fn source_over(src: PremultipliedColorU8, dst: PremultipliedColorU8) -> PremultipliedColorU8 {
    let inv = 255 - src.alpha() as u32;
    let mix = |s: u8, d: u8| (s as u32 + (d as u32 * inv + 127) / 255).min(255) as u8;
    let a = mix(src.alpha(), dst.alpha());
    let r = mix(src.red(), dst.red()).min(a);
    let g = mix(src.green(), dst.green()).min(a);
    let b = mix(src.blue(), dst.blue()).min(a);
    PremultipliedColorU8::from_rgba(r, g, b, a).unwrap_or(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_rect_over_opaque_background() {
        let mut pixmap = Pixmap::new(4, 4).unwrap();
        pixmap.fill(tiny_skia::Color::WHITE);
        blend_rect(&mut pixmap, 1, 1, 2, 2, Color::new(0, 0, 0, 128));

        let inside = pixmap.pixel(1, 1).unwrap();
        assert_eq!(inside.alpha(), 255);
        assert!((inside.red() as i32 - 127).abs() <= 1);
        assert_eq!(pixmap.pixel(0, 0).unwrap().red(), 255);
        assert_eq!(pixmap.pixel(3, 3).unwrap().red(), 255);
    }

    #[test]
    fn test_blend_rect_clips_to_pixmap() {
        let mut pixmap = Pixmap::new(2, 2).unwrap();
        blend_rect(&mut pixmap, -5, -5, 6, 6, Color::RED);
        assert_eq!(pixmap.pixel(0, 0).unwrap().red(), 255);
        assert_eq!(pixmap.pixel(1, 1).unwrap().alpha(), 0);
    }

    const MONO: &[u8] = include_bytes!("../../tests/fixtures/fonts/DejaVuSansMono.ttf");

    #[test]
    fn test_measures_and_draws_labels() {
        let mut typesetter = Typesetter::from_font_bytes(MONO.to_vec()).unwrap();
        let (one, height) = typesetter.measure("M", 10.0);
        let (four, _) = typesetter.measure("MMMM", 10.0);
        assert_eq!(height, 10.0);
        assert!(one > 0.0);
        // widths are rounded up per label
        assert!(four > 3.0 * one && four <= 4.0 * one, "{} vs {}", four, one);

        let mut pixmap = Pixmap::new(60, 20).unwrap();
        pixmap.fill(tiny_skia::Color::BLACK);
        typesetter.draw(&mut pixmap, "Hi", 2, 2, 12.0, Color::WHITE);
        assert!(pixmap.pixels().iter().any(|p| p.red() > 200));
    }

    #[test]
    fn test_rejects_garbage_font() {
        assert!(Typesetter::from_font_bytes(b"not a font".to_vec()).is_err());
    }
}
