//! # Dropmap Core
//!
//! `dropmap-core` turns a battle-royale match replay log into a single annotated
//! map image: each tracked player's movement, deaths and respawns, the safe-zone
//! progression, the drop-ship line, care packages and emergency pickups, plus
//! legends and a watermark.
//!
//! It rasterizes with [tiny-skia](https://crates.io/crates/tiny-skia), shapes legend
//! text with [cosmic-text](https://crates.io/crates/cosmic-text) and decodes/encodes
//! images with [image](https://crates.io/crates/image).
//!
//! ## Pipeline
//!
//! *   **Event Normalizer** ([`telemetry`]): typed events on one elapsed-seconds axis.
//! *   **Path Reconstructor** ([`path`]): per-player segments split at deaths, respawn markers.
//! *   **Flight-Path Estimator** ([`flight`]): least-squares drop-ship line.
//! *   **Overlay Renderer** ([`systems`]): drawing primitives over one owned raster.
//! *   **Composition** ([`compose`]): fixed layer order, color assignment, output file.
//! *   **Workers** ([`workers`], [`cleanup`]): bounded render pool and delayed deletion.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dropmap_core::{Compositor, DefaultAssetLoader, MatchTimeline, RenderConfig, RenderRequest};
//! use std::sync::Arc;
//!
//! let events = dropmap_core::telemetry::load_log("match.json".as_ref())?;
//! let timeline = MatchTimeline::new(events);
//! let compositor = Compositor::new(RenderConfig::default(), Arc::new(DefaultAssetLoader::default()));
//! let outcome = compositor.render(&timeline, &RenderRequest::new("Player", "match-id", true))?;
//! println!("{}", outcome.status_message());
//! # Ok::<(), dropmap_core::TraceError>(())
//! ```

/// Shared value types (colors, coordinates, path points).
pub mod types;

pub mod errors;

/// Visual tokens (palette, sizes, legend metrics).
pub mod tokens;

/// Render configuration and the map catalog.
pub mod config;

/// Telemetry decoding and time normalization.
pub mod telemetry;

/// Per-player path reconstruction.
pub mod path;

/// Drop-ship line estimation.
pub mod flight;

/// Core systems (asset management, typography, rasterization, legends).
pub mod systems;

/// Image persistence.
pub mod export;

/// Request-level orchestration.
pub mod compose;

/// Bounded render worker pool.
pub mod workers;

/// Delayed deletion of produced files.
pub mod cleanup;

pub use compose::{Compositor, RenderOutcome, RenderRequest};
pub use config::RenderConfig;
pub use errors::TraceError;
pub use telemetry::MatchTimeline;

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Environment variable naming a directory searched for assets.
pub const ASSET_DIR_ENV: &str = "DROPMAP_ASSET_DIR";

/// A trait for abstracting file system access.
///
/// This allows the renderer to read its maps, icons and fonts from somewhere
/// other than the working directory (an archive, an in-memory fixture set).
pub trait AssetLoader: Send + Sync {
    /// Loads the raw bytes of an asset from the given path.
    ///
    /// # Arguments
    /// * `path` - The relative path or identifier of the asset.
    fn load_bytes(&self, path: &str) -> Result<Vec<u8>>;
}

/// Filesystem loader.
///
/// Looks for an asset at, in order: the path as given, the configured root,
/// the directory named by [`ASSET_DIR_ENV`], and `assets/`.
#[derive(Clone, Debug, Default)]
pub struct DefaultAssetLoader {
    root: Option<PathBuf>,
}

impl DefaultAssetLoader {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn candidates(&self, path: &str) -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from(path)];
        if let Some(root) = &self.root {
            candidates.push(root.join(path));
        }
        if let Ok(dir) = std::env::var(ASSET_DIR_ENV) {
            candidates.push(Path::new(&dir).join(path));
        }
        candidates.push(Path::new("assets").join(path));
        candidates
    }
}

impl AssetLoader for DefaultAssetLoader {
    #[instrument(level = "debug", skip(self), fields(path = path))]
    fn load_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let candidates = self.candidates(path);
        for candidate in &candidates {
            if let Ok(bytes) = std::fs::read(candidate) {
                return Ok(bytes);
            }
        }
        let checked: Vec<String> = candidates
            .iter()
            .map(|c| format!("'{}'", c.display()))
            .collect();
        Err(anyhow::anyhow!(
            "Asset not found: {} (checked {})",
            path,
            checked.join(", ")
        ))
    }
}
