//! # Renderer System
//!
//! Owns the output raster of one render and draws the overlay primitives.
//!
//! ## Responsibilities
//! - **Coordinate Scaling**: Game units → pixels via `width / map_size`.
//! - **Vector Primitives**: Paths, flags, safe zones and the flight line (tiny-skia).
//! - **Raster Primitives**: Centered, clamped and optionally tinted icons; watermark.
//! - **Legend Accumulation**: Entries collected during composition, drawn once.
//!
//! ## See Also
//! - `systems::legend` for legend layout and drawing.
//! - `compose` for the layer order.

use crate::errors::TraceError;
use crate::flight::FlightFit;
use crate::path::PlayerPath;
use crate::systems::assets::AssetManager;
use crate::systems::legend::LegendEntry;
use crate::systems::typography::blend_rect;
use crate::telemetry::SafeZone;
use crate::types::{Color, Corner, GamePoint, PixelPoint, Swatch};
use image::RgbaImage;
use tiny_skia::{
    ColorU8, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke,
    Transform,
};
use tracing::{debug, warn};

/// The raster of one render request plus its drawing state.
pub struct RenderContext {
    pixmap: Pixmap,
    scale: f64,
    assets: AssetManager,
    legend: Vec<LegendEntry>,
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("scale", &self.scale)
            .field("legend", &self.legend.len())
            .finish()
    }
}

impl RenderContext {
    /// Wraps a decoded base map. `map_size` is the map's side in game units.
    pub fn new(base: &RgbaImage, map_size: f64, assets: AssetManager) -> Result<Self, TraceError> {
        if !(map_size.is_finite() && map_size > 0.0) {
            return Err(TraceError::Config(format!(
                "map_size must be positive, got {}",
                map_size
            )));
        }
        let pixmap = rgba_to_pixmap(base)?;
        let scale = pixmap.width() as f64 / map_size;
        debug!(
            width = pixmap.width(),
            height = pixmap.height(),
            scale,
            "Render context created"
        );
        Ok(Self {
            pixmap,
            scale,
            assets,
            legend: Vec::new(),
        })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Source-over fill of a pixel rectangle.
    pub(crate) fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        blend_rect(&mut self.pixmap, x, y, w, h, color);
    }

    /// Label sizes at `size` px, or `None` when no legend font is available.
    pub(crate) fn measure_labels(&mut self, labels: &[&str], size: f32) -> Option<Vec<(f32, f32)>> {
        let typesetter = self.assets.typesetter()?;
        Some(
            labels
                .iter()
                .map(|label| typesetter.measure(label, size))
                .collect(),
        )
    }

    pub(crate) fn draw_label(&mut self, text: &str, x: i32, y: i32, size: f32, color: Color) {
        if let Some(typesetter) = self.assets.typesetter() {
            typesetter.draw(&mut self.pixmap, text, x, y, size, color);
        }
    }

    pub fn to_pixel(&self, point: GamePoint) -> PixelPoint {
        point.to_pixel(self.scale)
    }

    // --- Path & Markers ---

    /// Draws every segment of `path` as a polyline, in `normal` before the
    /// first death and in `post_death` afterwards.
    ///
    /// Returns the path's spawn markers for the caller to draw as respawn icons.
    pub fn draw_path(
        &mut self,
        path: &PlayerPath,
        normal: Color,
        post_death: Color,
        width: f32,
    ) -> Vec<GamePoint> {
        for segment in &path.segments {
            let color = if segment.after_death {
                post_death
            } else {
                normal
            };
            self.stroke_polyline(&segment.points, color, width);
        }
        path.spawn_markers.clone()
    }

    pub(crate) fn stroke_polyline(&mut self, points: &[PixelPoint], color: Color, width: f32) {
        let [first, rest @ ..] = points else {
            return;
        };
        if rest.is_empty() {
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(first.x as f32, first.y as f32);
        for p in rest {
            pb.line_to(p.x as f32, p.y as f32);
        }
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint(color), &stroke, Transform::identity(), None);
    }

    /// Filled circle with a 1 px outline, centered at `(cx, cy)` in pixels.
    pub(crate) fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, swatch: Swatch) {
        let Some(circle) = PathBuilder::from_circle(cx, cy, radius.max(0.5)) else {
            return;
        };
        self.pixmap.fill_path(
            &circle,
            &paint(swatch.fill),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
        let stroke = Stroke {
            width: 1.0,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &circle,
            &paint(swatch.outline),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    pub(crate) fn stroke_circle(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        color: Color,
        width: f32,
    ) {
        let Some(circle) = PathBuilder::from_circle(cx, cy, radius) else {
            return;
        };
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&circle, &paint(color), &stroke, Transform::identity(), None);
    }

    /// Circular markers of `diameter` px at each point.
    pub fn draw_flags(&mut self, points: &[GamePoint], swatch: Swatch, diameter: u32) {
        let radius = (diameter as f32 - 1.0) / 2.0;
        for point in points {
            let px = self.to_pixel(*point);
            self.fill_circle(px.x as f32, px.y as f32, radius, swatch);
        }
    }

    /// Pastes `asset` resized to `size` px, centered on each point and kept
    /// inside the image. With a tint, the icon's silhouette is recolored.
    pub fn draw_icon(&mut self, points: &[GamePoint], asset: &str, size: u32, tint: Option<Color>) {
        if points.is_empty() {
            return;
        }
        let Some(icon) = self.prepared_icon(asset, size, tint) else {
            return;
        };

        let max_x = self.width() as i32 - size as i32;
        let max_y = self.height() as i32 - size as i32;
        let half = (size / 2) as i32;
        for point in points {
            let px = self.to_pixel(*point);
            let x = (px.x - half).min(max_x).max(0);
            let y = (px.y - half).min(max_y).max(0);
            self.paste(&icon, x, y);
        }
    }

    /// A resized, optionally tinted icon ready to paste.
    pub(crate) fn prepared_icon(
        &mut self,
        asset: &str,
        size: u32,
        tint: Option<Color>,
    ) -> Option<Pixmap> {
        let mut icon = self.assets.icon(asset, size)?;
        if let Some(color) = tint {
            tint_icon(&mut icon, color);
        }
        match rgba_to_pixmap(&icon) {
            Ok(pixmap) => Some(pixmap),
            Err(e) => {
                warn!("Skipping icon {}: {}", asset, e);
                None
            }
        }
    }

    pub(crate) fn paste(&mut self, src: &Pixmap, x: i32, y: i32) {
        self.pixmap.draw_pixmap(
            x,
            y,
            src.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    /// Unfilled circles for each safe zone.
    pub fn draw_magnetic(&mut self, zones: &[SafeZone], color: Color, width: f32) {
        for zone in zones {
            let center = self.to_pixel(zone.center);
            let radius = (zone.radius * self.scale) as i32;
            if radius <= 0 {
                continue;
            }
            self.stroke_circle(center.x as f32, center.y as f32, radius as f32, color, width);
        }
    }

    /// The flight line clipped to the image. Skipped when no fit is available.
    pub fn draw_flight(&mut self, fit: FlightFit, color: Color, width: f32) {
        if !fit.is_available() {
            debug!("No flight fit, skipping flight line");
            return;
        }
        let points = flight_endpoints(fit, self.scale, self.width(), self.height());
        if points.len() < 2 {
            warn!(
                slope = fit.slope,
                intercept = fit.intercept,
                "Flight line does not cross the map"
            );
            return;
        }
        self.stroke_polyline(&points, color, width);
    }

    /// Alpha-blends a branding image into a corner, its own alpha scaled by `opacity`.
    pub fn draw_watermark(
        &mut self,
        asset: &str,
        opacity: f32,
        corner: Corner,
        padding: (u32, u32),
    ) {
        let mut mark = match self.assets.load_image(asset) {
            Ok(mark) => mark,
            Err(e) => {
                warn!("Skipping watermark: {}", e);
                return;
            }
        };
        let opacity = opacity.clamp(0.0, 1.0);
        for pixel in mark.pixels_mut() {
            pixel.0[3] = (pixel.0[3] as f32 * opacity) as u8;
        }

        let (w, h) = (mark.width() as i32, mark.height() as i32);
        let (pad_x, pad_y) = (padding.0 as i32, padding.1 as i32);
        let (img_w, img_h) = (self.width() as i32, self.height() as i32);
        let (x, y) = match corner {
            Corner::TopLeft => (pad_x, pad_y),
            Corner::TopRight => (img_w - w - pad_x, pad_y),
            Corner::BottomLeft => (pad_x, img_h - h - pad_y),
            Corner::BottomRight => (img_w - w - pad_x, img_h - h - pad_y),
        };
        match rgba_to_pixmap(&mark) {
            Ok(pixmap) => self.paste(&pixmap, x, y),
            Err(e) => warn!("Skipping watermark: {}", e),
        }
    }

    // --- Legend ---

    pub fn add_legend_entry(&mut self, entry: LegendEntry) {
        self.legend.push(entry);
    }

    pub(crate) fn take_legend(&mut self) -> Vec<LegendEntry> {
        std::mem::take(&mut self.legend)
    }

    /// Converts back to straight-alpha RGBA for encoding.
    pub fn into_image(self) -> Result<RgbaImage, TraceError> {
        pixmap_to_rgba(&self.pixmap)
    }
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

/// Recolors an icon: every channel (alpha included) becomes
/// `tint·α + icon·(1−α)`, with `α` the icon's own alpha.
pub fn tint_icon(icon: &mut RgbaImage, tint: Color) {
    let tint = [tint.r, tint.g, tint.b, tint.a];
    for pixel in icon.pixels_mut() {
        let alpha = pixel.0[3] as u32;
        for (channel, t) in pixel.0.iter_mut().zip(tint) {
            *channel = ((t as u32 * alpha + *channel as u32 * (255 - alpha) + 127) / 255) as u8;
        }
    }
}

/// Where `y = m·x + c·s` enters and leaves the `width`×`height` raster,
/// sorted by x and deduplicated.
pub fn flight_endpoints(fit: FlightFit, scale: f64, width: u32, height: u32) -> Vec<PixelPoint> {
    let m = fit.slope;
    let c = fit.intercept * scale;
    let (w, h) = (width as f64, height as f64);

    let mut candidates = vec![(0.0, c), (w, m * w + c)];
    if m != 0.0 {
        candidates.push((-c / m, 0.0));
        candidates.push(((h - c) / m, h));
    }

    let mut points: Vec<PixelPoint> = candidates
        .into_iter()
        .filter(|(x, y)| (0.0..=w).contains(x) && (0.0..=h).contains(y))
        .map(|(x, y)| PixelPoint::new(x as i32, y as i32))
        .collect();
    points.sort_by_key(|p| (p.x, p.y));
    points.dedup();
    points
}

fn rgba_to_pixmap(image: &RgbaImage) -> Result<Pixmap, TraceError> {
    let (w, h) = image.dimensions();
    let mut pixmap = Pixmap::new(w, h).ok_or(TraceError::SurfaceFailure(w, h))?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

fn pixmap_to_rgba(pixmap: &Pixmap) -> Result<RgbaImage, TraceError> {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .ok_or(TraceError::SurfaceFailure(pixmap.width(), pixmap.height()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tint_keeps_silhouette() {
        let mut icon = RgbaImage::new(2, 1);
        icon.put_pixel(0, 0, image::Rgba([0, 0, 0, 255]));
        icon.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));
        tint_icon(&mut icon, Color::new(0, 255, 0, 255));
        assert_eq!(icon.get_pixel(0, 0).0, [0, 255, 0, 255]);
        assert_eq!(icon.get_pixel(1, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_flight_endpoints_clip_to_image() {
        // y = x in game space at scale 0.5 on a 100x100 raster
        let points = flight_endpoints(FlightFit::new(1.0, 0.0), 0.5, 100, 100);
        assert_eq!(points, vec![PixelPoint::new(0, 0), PixelPoint::new(100, 100)]);

        // horizontal line at y = 20 px
        let points = flight_endpoints(FlightFit::new(0.0, 40.0), 0.5, 100, 100);
        assert_eq!(points, vec![PixelPoint::new(0, 20), PixelPoint::new(100, 20)]);

        // entirely below the raster
        assert!(flight_endpoints(FlightFit::new(0.0, 1000.0), 0.5, 100, 100).is_empty());
    }

    #[test]
    fn test_pixmap_roundtrip_preserves_opaque_pixels() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([12, 34, 56, 255]));
        let back = pixmap_to_rgba(&rgba_to_pixmap(&image).unwrap()).unwrap();
        assert_eq!(back, image);
    }
}
