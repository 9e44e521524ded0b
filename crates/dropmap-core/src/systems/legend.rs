//! # Legend System
//!
//! Boxed legends anchored to an image corner.
//!
//! ## Layout
//! Each row is `icon_size` wide plus a 20 px gap plus its label; the row height
//! is the larger of the icon and the text. The box wraps the widest row and all
//! rows with 10 px of inner margin, sitting `padding - 10` px from its corner.

use crate::systems::renderer::RenderContext;
use crate::tokens::LegendLayout;
use crate::types::{Color, Corner, PixelPoint, Swatch};
use tracing::{debug, warn};

/// Gap between a legend marker and its label (px).
const LABEL_GAP: i32 = 20;
/// Inner margin of the legend box (px).
const MARGIN: i32 = 10;

/// The swatch drawn to the left of a legend label.
#[derive(Clone, Debug, PartialEq)]
pub enum LegendMarker {
    /// Horizontal line, like a path segment.
    Path,
    /// Filled circle.
    Flag,
    /// Unfilled circle, like a safe zone.
    Outline,
    /// An image asset, optionally tinted.
    Icon { asset: String, tint: Option<Color> },
}

/// One legend row. The label is drawn in the swatch's outline color.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub swatch: Swatch,
    pub marker: LegendMarker,
}

impl LegendEntry {
    pub fn new(label: impl Into<String>, swatch: Swatch, marker: LegendMarker) -> Self {
        Self {
            label: label.into(),
            swatch,
            marker,
        }
    }
}

/// Pixel rectangle of a legend background, corners inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LegendBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Places a legend box of the given content size in `layout.corner`.
///
/// `label_sizes` holds the measured (width, height) of each label.
pub fn legend_box(
    label_sizes: &[(f32, f32)],
    layout: &LegendLayout,
    image_width: u32,
    image_height: u32,
) -> LegendBox {
    let icon = layout.icon_size as i32;
    let spacing = layout.spacing as i32;

    let content_w = label_sizes
        .iter()
        .map(|(w, _)| icon + LABEL_GAP + *w as i32)
        .max()
        .unwrap_or(0);
    let mut content_h: i32 = label_sizes
        .iter()
        .map(|(_, h)| icon.max(*h as i32) + spacing)
        .sum();
    if !label_sizes.is_empty() {
        content_h -= spacing;
    }

    let inset = layout.padding as i32 - MARGIN;
    let box_w = content_w + 2 * MARGIN;
    let box_h = content_h + 2 * MARGIN;
    let (img_w, img_h) = (image_width as i32, image_height as i32);

    let (x1, y1) = match layout.corner {
        Corner::TopLeft => (inset, inset),
        Corner::TopRight => (img_w - inset - box_w, inset),
        Corner::BottomLeft => (inset, img_h - inset - box_h),
        Corner::BottomRight => (img_w - inset - box_w, img_h - inset - box_h),
    };
    LegendBox {
        x1,
        y1,
        x2: x1 + box_w,
        y2: y1 + box_h,
    }
}

impl RenderContext {
    /// Draws a boxed legend of `entries` on a `background` fill.
    ///
    /// Without a usable font, labels are skipped and only markers are drawn.
    pub fn draw_legend(
        &mut self,
        entries: &[LegendEntry],
        layout: &LegendLayout,
        background: Color,
    ) {
        if entries.is_empty() {
            return;
        }
        let font_size = layout.font_size;
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        let (label_sizes, has_font) = match self.measure_labels(&labels, font_size) {
            Some(sizes) => (sizes, true),
            None => {
                warn!("Legend drawn without labels");
                (vec![(0.0, 0.0); entries.len()], false)
            }
        };

        let bounds = legend_box(&label_sizes, layout, self.width(), self.height());
        debug!(?bounds, entries = entries.len(), "Drawing legend");
        self.fill_rect(
            bounds.x1,
            bounds.y1,
            (bounds.x2 - bounds.x1 + 1) as u32,
            (bounds.y2 - bounds.y1 + 1) as u32,
            background,
        );

        let icon = layout.icon_size as i32;
        let icon_x = bounds.x1 + MARGIN;
        let mut cur_y = bounds.y1 + MARGIN;
        for (entry, (_, text_h)) in entries.iter().zip(&label_sizes) {
            self.draw_marker(&entry.marker, entry.swatch, icon_x, cur_y, layout.icon_size);

            let text_x = icon_x + icon + LABEL_GAP;
            let text_y = cur_y + (icon - *text_h as i32) / 2;
            if has_font {
                self.draw_label(&entry.label, text_x, text_y, font_size, entry.swatch.outline);
            }
            cur_y += icon.max(*text_h as i32) + layout.spacing as i32;
        }
    }

    /// Draws the accumulated legend entries and clears them.
    pub fn flush_legend(&mut self, layout: &LegendLayout, background: Color) {
        let entries = self.take_legend();
        self.draw_legend(&entries, layout, background);
    }

    /// A legend mapping each tracked player's name to their path color.
    pub fn draw_player_legend(
        &mut self,
        players: &[(String, Color)],
        layout: &LegendLayout,
        background: Color,
    ) {
        let entries: Vec<LegendEntry> = players
            .iter()
            .map(|(name, color)| {
                LegendEntry::new(name.clone(), Swatch::solid(*color), LegendMarker::Path)
            })
            .collect();
        self.draw_legend(&entries, layout, background);
    }

    fn draw_marker(&mut self, marker: &LegendMarker, swatch: Swatch, x: i32, y: i32, size: u32) {
        let d = size as i32;
        let r = d as f32 / 2.0;
        let (cx, cy) = (x as f32 + r, y as f32 + r);
        match marker {
            LegendMarker::Path => {
                let width = (d / 10).max(2) as f32;
                let mid = y + d / 2;
                self.stroke_polyline(
                    &[PixelPoint::new(x, mid), PixelPoint::new(x + d, mid)],
                    swatch.outline,
                    width,
                );
            }
            LegendMarker::Flag => self.fill_circle(cx, cy, r, swatch),
            LegendMarker::Outline => {
                let width = (d / 20).max(2) as f32;
                self.stroke_circle(cx, cy, r, swatch.outline, width);
            }
            LegendMarker::Icon { asset, tint } => {
                if let Some(icon) = self.prepared_icon(asset, size, *tint) {
                    self.paste(&icon, x, y);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(corner: Corner) -> LegendLayout {
        LegendLayout {
            corner,
            padding: 120,
            spacing: 80,
            icon_size: 100,
            font_size: 100.0,
        }
    }

    #[test]
    fn test_top_left_box_wraps_widest_row() {
        let sizes = [(300.0, 100.0), (500.0, 100.0)];
        let bounds = legend_box(&sizes, &layout(Corner::TopLeft), 4000, 4000);
        // width: 100 + 20 + 500 + 20; height: 100 + 80 + 100 + 20
        assert_eq!(
            bounds,
            LegendBox {
                x1: 110,
                y1: 110,
                x2: 110 + 640,
                y2: 110 + 300
            }
        );
    }

    #[test]
    fn test_bottom_right_box_hugs_corner() {
        let sizes = [(200.0, 100.0)];
        let bounds = legend_box(&sizes, &layout(Corner::BottomRight), 4000, 3000);
        assert_eq!(bounds.x2, 4000 - 110);
        assert_eq!(bounds.y2, 3000 - 110);
        assert_eq!(bounds.x2 - bounds.x1, 100 + 20 + 200 + 20);
        assert_eq!(bounds.y2 - bounds.y1, 100 + 20);
    }

    #[test]
    fn test_tall_text_grows_rows() {
        let sizes = [(10.0, 150.0), (10.0, 150.0)];
        let bounds = legend_box(&sizes, &layout(Corner::TopLeft), 1000, 1000);
        assert_eq!(bounds.y2 - bounds.y1, 150 + 80 + 150 + 20);
    }
}
