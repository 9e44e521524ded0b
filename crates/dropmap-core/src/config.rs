//! # Config Module
//!
//! Render configuration, loadable from JSON with a default for every field.
//!
//! ## Responsibilities
//! - **Asset Layout**: Where base maps, icons, the watermark and the legend font live.
//! - **Map Catalog**: Internal map name → base-map file and display name.
//! - **Runtime**: Output directory, worker count, retention delay.

use crate::errors::TraceError;
use crate::telemetry::DEFAULT_MAP;
use crate::tokens::VisualTokens;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Side length of every map in game units.
pub const DEFAULT_MAP_SIZE: f64 = 816_001.0;

/// Base-map file and human-readable name of one map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub file: String,
    pub display_name: String,
}

impl MapEntry {
    fn new(file: &str, display_name: &str) -> Self {
        Self {
            file: file.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// Lookup from the game's internal map name to its assets.
///
/// Entries read from configuration are merged over the built-in catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, MapEntry>", into = "BTreeMap<String, MapEntry>")]
pub struct MapCatalog {
    maps: BTreeMap<String, MapEntry>,
}

impl From<BTreeMap<String, MapEntry>> for MapCatalog {
    fn from(overrides: BTreeMap<String, MapEntry>) -> Self {
        let mut catalog = MapCatalog::default();
        catalog.maps.extend(overrides);
        catalog
    }
}

impl From<MapCatalog> for BTreeMap<String, MapEntry> {
    fn from(catalog: MapCatalog) -> Self {
        catalog.maps
    }
}

impl Default for MapCatalog {
    fn default() -> Self {
        let maps = [
            ("Desert_Main", "miramar.webp", "Miramar"),
            ("Erangel_Main", "erangel.webp", "Erangel"),
            ("Savage_Main", "sanhok.webp", "Sanhok"),
            ("DihorOtok_Main", "vikendi.webp", "Vikendi"),
            ("Baltic_Main", "erangel.webp", "Erangel (Remastered)"),
            ("Summerland_Main", "paramo.webp", "Paramo"),
            ("Neon_Main", "rondo.webp", "Rondo"),
            ("Tiger_Main", "taego.webp", "Taego"),
            ("Deston_Main", "deston.webp", "Deston"),
            ("Chimera_Main", "training.webp", "Camp Jackal"),
            ("Kiki_Main", "deston.webp", "Rondo"),
        ]
        .into_iter()
        .map(|(name, file, display)| (name.to_string(), MapEntry::new(file, display)))
        .collect();
        Self { maps }
    }
}

impl MapCatalog {
    /// Resolves a map name. Unknown maps use the default map's base image and
    /// keep their raw name for display.
    pub fn resolve(&self, map_name: &str) -> MapEntry {
        if let Some(entry) = self.maps.get(map_name) {
            return entry.clone();
        }
        let file = self
            .maps
            .get(DEFAULT_MAP)
            .map(|entry| entry.file.clone())
            .unwrap_or_else(|| "miramar.webp".to_string());
        MapEntry {
            file,
            display_name: map_name.to_string(),
        }
    }
}

/// Relative locations of the static assets, resolved through the asset loader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    /// Directory holding the base-map images named in the catalog.
    pub map_dir: String,
    pub death_icon: String,
    pub respawn_icon: String,
    pub airdrop_icon: String,
    pub pickup_icon: String,
    pub watermark: String,
    pub font: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            map_dir: "map_img".into(),
            death_icon: "icons/death.png".into(),
            respawn_icon: "icons/respawn.png".into(),
            airdrop_icon: "icons/airdrop.png".into(),
            pickup_icon: "icons/pickup.png".into(),
            watermark: "icons/watermark.png".into(),
            font: "fonts/legend.ttf".into(),
        }
    }
}

impl AssetPaths {
    pub fn base_map(&self, entry: &MapEntry) -> String {
        if self.map_dir.is_empty() {
            entry.file.clone()
        } else {
            format!("{}/{}", self.map_dir.trim_end_matches('/'), entry.file)
        }
    }
}

/// Everything a render needs besides the telemetry itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub assets: AssetPaths,
    /// Map side length in game units; the raster scale is `width / map_size`.
    pub map_size: f64,
    pub maps: MapCatalog,
    pub output_dir: PathBuf,
    pub tokens: VisualTokens,
    /// Render threads; `0` lets rayon pick.
    pub workers: usize,
    /// Seconds before outputs and scheduled inputs are deleted.
    pub retention_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            assets: AssetPaths::default(),
            map_size: DEFAULT_MAP_SIZE,
            maps: MapCatalog::default(),
            output_dir: PathBuf::from("results"),
            tokens: VisualTokens::default(),
            workers: 0,
            retention_secs: 300,
        }
    }
}

impl RenderConfig {
    /// Loads a JSON config file; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, TraceError> {
        let bytes = std::fs::read(path)
            .map_err(|e| TraceError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: RenderConfig = serde_json::from_slice(&bytes)
            .map_err(|e| TraceError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TraceError> {
        if !(self.map_size.is_finite() && self.map_size > 0.0) {
            return Err(TraceError::Config(format!(
                "map_size must be positive, got {}",
                self.map_size
            )));
        }
        Ok(())
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}
