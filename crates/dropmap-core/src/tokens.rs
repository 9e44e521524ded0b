//! # Tokens Module
//!
//! Visual tokens for the trace overlay.
//!
//! ## Responsibilities
//! - **Palette**: Player path colors, marker colors, legend background.
//! - **Sizes**: Stroke widths, icon sizes and flag diameter (px).
//! - **Path Tuning**: Respawn distance and dedup tolerances of path reconstruction.
//! - **Legend Layouts**: Anchor corner and metrics of both legends.
//! - **Watermark**: Placement and opacity of the branding image.
//!
//! ## Key Types
//! - `VisualTokens`: Collection of all tokens, overridable from configuration.
//! - `LegendLayout`: Metrics of one legend box.

use crate::path::{INTERIOR_TOLERANCE, RESPAWN_DISTANCE, TRAILING_TOLERANCE};
use crate::types::{Color, Corner};
use serde::{Deserialize, Serialize};

/// Colors used by the overlay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Path color of the requested player.
    pub primary: Color,
    /// Cycled in team order for every other tracked player.
    pub teammates: Vec<Color>,
    /// Third-party kill flags.
    pub kill_flag: Color,
    pub flight: Color,
    pub safe_zone: Color,
    /// Tint of the death icon shown in the main legend.
    pub legend_death_tint: Color,
    pub legend_background: Color,
    /// Legend entry drawn for care packages.
    pub airdrop_label: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: Color::GREEN,
            teammates: vec![
                Color::new(200, 0, 200, 255),
                Color::new(255, 200, 0, 255),
                Color::new(0, 200, 200, 255),
                Color::new(150, 75, 0, 255),
                Color::new(100, 0, 255, 255),
                Color::new(255, 100, 100, 255),
                Color::new(150, 150, 150, 255),
                Color::new(255, 0, 100, 255),
                Color::new(100, 50, 0, 255),
            ],
            kill_flag: Color::RED,
            flight: Color::WHITE,
            safe_zone: Color::WHITE,
            legend_death_tint: Color::GREY,
            legend_background: Color::BLACK.with_alpha(128),
            airdrop_label: Color::RED,
        }
    }
}

impl Palette {
    /// Path color of the `nth` tracked teammate (the primary player excluded).
    pub fn teammate_color(&self, nth: usize) -> Color {
        if self.teammates.is_empty() {
            return self.primary;
        }
        self.teammates[nth % self.teammates.len()]
    }
}

/// Metrics of one legend box.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendLayout {
    pub corner: Corner,
    /// Distance from the image edge to the legend content (px).
    pub padding: u32,
    /// Vertical gap between entries (px).
    pub spacing: u32,
    pub icon_size: u32,
    pub font_size: f32,
}

impl Default for LegendLayout {
    fn default() -> Self {
        Self {
            corner: Corner::TopLeft,
            padding: 120,
            spacing: 80,
            icon_size: 100,
            font_size: 100.0,
        }
    }
}

/// Placement of the branding image.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkLayout {
    pub corner: Corner,
    pub padding: (u32, u32),
    /// Multiplier applied to the watermark's own alpha channel.
    pub opacity: f32,
}

impl Default for WatermarkLayout {
    fn default() -> Self {
        Self {
            corner: Corner::TopRight,
            padding: (20, 20),
            opacity: 0.5,
        }
    }
}

/// All visual tokens of a render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualTokens {
    pub palette: Palette,
    /// Player path stroke width (px).
    pub path_width: f32,
    pub flight_width: f32,
    pub safe_zone_width: f32,
    pub flag_diameter: u32,
    pub respawn_icon_size: u32,
    pub death_icon_size: u32,
    pub airdrop_icon_size: u32,
    pub pickup_icon_size: u32,
    /// Game units a post-death sample must be from the death site to count as a respawn.
    pub respawn_distance: f64,
    /// Dedup tolerance (px) for path segments closed by a death.
    pub interior_tolerance: f64,
    /// Dedup tolerance (px) for the segment still open at the end of the log.
    pub trailing_tolerance: f64,
    pub main_legend: LegendLayout,
    pub player_legend: LegendLayout,
    pub watermark: WatermarkLayout,
}

impl Default for VisualTokens {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            path_width: 10.0,
            flight_width: 10.0,
            safe_zone_width: 5.0,
            flag_diameter: 25,
            respawn_icon_size: 200,
            death_icon_size: 100,
            airdrop_icon_size: 100,
            pickup_icon_size: 130,
            respawn_distance: RESPAWN_DISTANCE,
            interior_tolerance: INTERIOR_TOLERANCE,
            trailing_tolerance: TRAILING_TOLERANCE,
            main_legend: LegendLayout::default(),
            player_legend: LegendLayout {
                corner: Corner::BottomRight,
                ..LegendLayout::default()
            },
            watermark: WatermarkLayout::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teammate_colors_cycle() {
        let palette = Palette::default();
        assert_eq!(palette.teammate_color(0), Color::new(200, 0, 200, 255));
        assert_eq!(palette.teammate_color(9), palette.teammate_color(0));
        assert_ne!(palette.teammate_color(3), palette.primary);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let tokens: VisualTokens =
            serde_json::from_str(r#"{ "path_width": 4.0, "player_legend": { "padding": 10 } }"#)
                .unwrap();
        assert_eq!(tokens.path_width, 4.0);
        assert_eq!(tokens.player_legend.padding, 10);
        assert_eq!(tokens.player_legend.spacing, 80);
        assert_eq!(tokens.death_icon_size, 100);
    }

    #[test]
    fn test_path_tuning_override() {
        let tokens: VisualTokens =
            serde_json::from_str(r#"{ "respawn_distance": 250.0, "trailing_tolerance": 1.0 }"#)
                .unwrap();
        assert_eq!(tokens.respawn_distance, 250.0);
        assert_eq!(tokens.trailing_tolerance, 1.0);
        assert_eq!(tokens.interior_tolerance, INTERIOR_TOLERANCE);
        assert_eq!(VisualTokens::default().respawn_distance, RESPAWN_DISTANCE);
    }
}
