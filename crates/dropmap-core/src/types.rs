//! # Types Module
//!
//! Shared value types used across the pipeline.
//!
//! ## Responsibilities
//! - **Color**: 8-bit RGBA color with an `image` conversion.
//! - **Swatch**: Outline + fill pair for flags and legend entries.
//! - **Coordinates**: Game-space points and their truncated pixel projections.
//! - **Path Points**: Typed samples of a player's reconstructed trajectory.

use serde::{Deserialize, Serialize};

/// An RGBA color with straight (non-premultiplied) 8-bit channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0, 255);
    pub const WHITE: Color = Color::new(255, 255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0, 255);
    pub const GREEN: Color = Color::new(0, 255, 0, 255);
    pub const GREY: Color = Color::new(150, 150, 150, 255);
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_rgba(&self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Outline and fill colors of a marker.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swatch {
    pub outline: Color,
    pub fill: Color,
}

impl Swatch {
    pub const fn new(outline: Color, fill: Color) -> Self {
        Self { outline, fill }
    }

    /// A swatch whose outline and fill are the same color.
    pub const fn solid(color: Color) -> Self {
        Self {
            outline: color,
            fill: color,
        }
    }
}

/// A location in game units (centimetres on the game map).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GamePoint {
    pub x: f64,
    pub y: f64,
}

impl GamePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Projects onto the raster, truncating toward zero.
    pub fn to_pixel(self, scale: f64) -> PixelPoint {
        PixelPoint {
            x: (self.x * scale) as i32,
            y: (self.y * scale) as i32,
        }
    }
}

/// An integer pixel position on the output raster.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(&self, other: &PixelPoint) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

/// Classification of a point on a reconstructed path.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointKind {
    /// Ordinary movement sample.
    Position,
    /// The player died here; the current segment ends.
    KillBreak,
    /// First sample far enough from the last death to count as a respawn.
    AfterDeathPosition,
}

/// One typed sample of a player's path.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    /// Seconds since match start.
    pub time: f64,
    pub kind: PointKind,
}

impl PathPoint {
    pub fn location(&self) -> GamePoint {
        GamePoint::new(self.x, self.y)
    }
}

/// A corner of the output image, used to anchor legends and the watermark.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}
