//! Shared fixtures: a synthetic match log and a throwaway asset tree.

#![allow(dead_code)]

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use dropmap_core::tokens::LegendLayout;
use dropmap_core::types::Corner;
use dropmap_core::{DefaultAssetLoader, RenderConfig};
use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Game units per side; with an 800 px base map the scale is 0.1.
pub const MAP_SIZE: f64 = 8000.0;
pub const MAP_PX: u32 = 800;
pub const BACKGROUND: Rgba<u8> = Rgba([30, 30, 30, 255]);

pub const RESPAWN_BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
pub const AIRDROP_YELLOW: Rgba<u8> = Rgba([255, 255, 0, 255]);
pub const PICKUP_CYAN: Rgba<u8> = Rgba([0, 255, 255, 255]);
pub const WATERMARK_MAGENTA: Rgba<u8> = Rgba([255, 0, 255, 255]);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("dropmap_core=debug")
        .try_init();
}

// --- Telemetry records ---

fn start_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-01T10:00:00.000Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// `_D` value `secs` after the fixture match start.
pub fn stamp(secs: f64) -> String {
    (start_time() + TimeDelta::milliseconds((secs * 1000.0) as i64))
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn match_start(map: &str) -> Value {
    json!({ "_T": "LogMatchStart", "_D": stamp(0.0), "mapName": map })
}

pub fn player_create(name: &str, team: i64) -> Value {
    json!({
        "_T": "LogPlayerCreate",
        "_D": stamp(-60.0),
        "character": { "name": name, "teamId": team }
    })
}

pub fn position(name: &str, x: f64, y: f64, secs: f64) -> Value {
    json!({
        "_T": "LogPlayerPosition",
        "_D": stamp(secs),
        "character": { "name": name, "location": { "x": x, "y": y, "z": 100.0 } }
    })
}

pub fn kill(victim: &str, killer: Option<&str>, x: f64, y: f64, secs: f64) -> Value {
    json!({
        "_T": "LogPlayerKillV2",
        "_D": stamp(secs),
        "victim": { "name": victim, "location": { "x": x, "y": y, "z": 0.0 } },
        "killer": killer.map(|name| json!({ "name": name }))
    })
}

pub fn zone(x: f64, y: f64, radius: f64) -> Value {
    json!({
        "_T": "LogGameStatePeriodic",
        "gameState": {
            "safetyZonePosition": { "x": x, "y": y, "z": 0.0 },
            "safetyZoneRadius": radius
        }
    })
}

pub fn care_package_land(x: f64, y: f64) -> Value {
    json!({
        "_T": "LogCarePackageLand",
        "itemPackage": { "location": { "x": x, "y": y, "z": 0.0 } }
    })
}

pub fn emergency_pickup(name: &str, x: f64, y: f64) -> Value {
    json!({
        "_T": "LogItemPickup",
        "character": { "name": name, "location": { "x": x, "y": y, "z": 0.0 } },
        "item": { "itemId": "Item_EmergencyPickup_C" }
    })
}

/// Alice and Bob (team 1) against Eve (team 2) on Erangel.
///
/// Alice flies in along `y = 0.5x + 1000`, dies at (4000, 4000) at 30 s and
/// respawns at (6000, 6000). Alice kills Eve at (7000, 1000). Bob uses an
/// emergency pickup at (2600, 3000).
pub fn scenario() -> Vec<Value> {
    vec![
        player_create("Alice", 1),
        player_create("Bob", 1),
        player_create("Eve", 2),
        // lobby movement, before the match starts
        position("Alice", 500.0, 500.0, -5.0),
        match_start("Erangel_Main"),
        position("Alice", 1000.0, 1500.0, 1.0),
        position("Bob", 2000.0, 2000.0, 2.0),
        position("Alice", 3000.0, 2500.0, 3.0),
        position("Alice", 3000.0, 3000.0, 10.0),
        position("Bob", 2500.0, 2500.0, 10.0),
        position("Eve", 7000.0, 1000.0, 10.0),
        kill("Eve", Some("Alice"), 7000.0, 1000.0, 15.0),
        position("Alice", 4000.0, 4000.0, 20.0),
        position("Bob", 2600.0, 3000.0, 20.0),
        emergency_pickup("Bob", 2600.0, 3000.0),
        zone(4000.0, 4000.0, 3000.0),
        zone(4000.0, 4000.0, 3000.0),
        kill("Alice", Some("Eve"), 4000.0, 4000.0, 30.0),
        // still at the death site: dropped
        position("Alice", 4010.0, 4000.0, 31.0),
        position("Alice", 6000.0, 6000.0, 40.0),
        care_package_land(1000.0, 7000.0),
        zone(4500.0, 4500.0, 1000.0),
        position("Alice", 6500.0, 6000.0, 50.0),
        zone(4500.0, 4500.0, 1000.0),
    ]
}

/// One player who dies between two samples, reappears next to the body,
/// then shows up far away.
pub fn respawn_log() -> Vec<Value> {
    vec![
        match_start("Erangel_Main"),
        player_create("A", 1),
        position("A", 1000.0, 1000.0, 1.0),
        position("A", 2000.0, 1000.0, 2.0),
        kill("A", None, 2000.0, 1000.0, 3.0),
        position("A", 2010.0, 1000.0, 4.0),
        position("A", 7000.0, 7000.0, 5.0),
    ]
}

pub fn write_log(dir: &Path, name: &str, events: &[Value]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, Value::Array(events.to_vec()).to_string()).unwrap();
    path
}

// --- Assets ---

fn write_image(root: &Path, relative: &str, image: &RgbaImage, format: ImageFormat) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image.save_with_format(&path, format).unwrap();
}

fn solid_icon(root: &Path, relative: &str, color: Rgba<u8>) {
    write_image(
        root,
        relative,
        &RgbaImage::from_pixel(8, 8, color),
        ImageFormat::Png,
    );
}

/// A temporary asset root, output directory and matching configuration.
///
/// No font is installed unless [`Fixture::with_font`] is called, so legends
/// are drawn without labels by default.
pub struct Fixture {
    pub dir: TempDir,
    pub config: RenderConfig,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        write_image(
            root,
            "map_img/erangel.webp",
            &RgbaImage::from_pixel(MAP_PX, MAP_PX, BACKGROUND),
            ImageFormat::WebP,
        );
        solid_icon(root, "icons/death.png", Rgba([255, 255, 255, 255]));
        solid_icon(root, "icons/respawn.png", RESPAWN_BLUE);
        solid_icon(root, "icons/airdrop.png", AIRDROP_YELLOW);
        solid_icon(root, "icons/pickup.png", PICKUP_CYAN);
        write_image(
            root,
            "icons/watermark.png",
            &RgbaImage::from_pixel(10, 10, WATERMARK_MAGENTA),
            ImageFormat::Png,
        );

        let mut config = RenderConfig {
            map_size: MAP_SIZE,
            output_dir: root.join("results"),
            ..RenderConfig::default()
        };
        let tokens = &mut config.tokens;
        tokens.flag_diameter = 9;
        tokens.respawn_icon_size = 20;
        tokens.death_icon_size = 10;
        tokens.airdrop_icon_size = 10;
        tokens.pickup_icon_size = 13;
        let small = LegendLayout {
            corner: Corner::TopLeft,
            padding: 20,
            spacing: 5,
            icon_size: 10,
            font_size: 10.0,
        };
        tokens.main_legend = small;
        tokens.player_legend = LegendLayout {
            corner: Corner::BottomRight,
            ..small
        };

        Self { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn loader(&self) -> DefaultAssetLoader {
        DefaultAssetLoader::with_root(self.root())
    }

    pub fn write_log(&self, name: &str, events: &[Value]) -> PathBuf {
        write_log(self.root(), name, events)
    }

    /// Installs DejaVu Sans Mono as the legend font.
    pub fn with_font(self) -> Self {
        let font = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/fonts/DejaVuSansMono.ttf");
        let target = self.root().join("fonts/legend.ttf");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::copy(font, target).unwrap();
        self
    }
}

/// Pixel at game coordinates `(x, y)` of a decoded render.
pub fn pixel_at(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let scale = MAP_PX as f64 / MAP_SIZE;
    *image.get_pixel((x * scale) as u32, (y * scale) as u32)
}
