use crate::config::AssetPaths;
use crate::errors::TraceError;
use crate::systems::typography::Typesetter;
use crate::AssetLoader;
use image::imageops::FilterType;
use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves, decodes and caches the static assets of one render.
///
/// One manager belongs to one `RenderContext`; nothing here is shared between
/// requests except the loader itself.
pub struct AssetManager {
    /// Asset loader for resolving file paths to bytes.
    pub loader: Arc<dyn AssetLoader>,
    pub paths: AssetPaths,
    /// Resized icons keyed by (path, size).
    icon_cache: HashMap<(String, u32), Option<RgbaImage>>,
    /// `None` until first use; `Some(None)` once loading has failed.
    typesetter: Option<Option<Typesetter>>,
}

impl AssetManager {
    pub fn new(loader: Arc<dyn AssetLoader>, paths: AssetPaths) -> Self {
        Self {
            loader,
            paths,
            icon_cache: HashMap::new(),
            typesetter: None,
        }
    }

    /// Loads and decodes an image asset.
    pub fn load_image(&self, path: &str) -> Result<RgbaImage, TraceError> {
        let bytes = self
            .loader
            .load_bytes(path)
            .map_err(|e| TraceError::AssetNotFound(format!("{}: {}", path, e)))?;
        let image = image::load_from_memory(&bytes)?;
        Ok(image.to_rgba8())
    }

    /// Loads the base map. Failure here is fatal for the render.
    pub fn base_map(&self, path: &str) -> Result<RgbaImage, TraceError> {
        self.load_image(path)
            .map_err(|e| TraceError::BaseMap(format!("{}: {}", path, e)))
    }

    /// An icon resized to `size`×`size`, or `None` (logged once) if it cannot be loaded.
    pub fn icon(&mut self, path: &str, size: u32) -> Option<RgbaImage> {
        let key = (path.to_string(), size);
        if let Some(cached) = self.icon_cache.get(&key) {
            return cached.clone();
        }

        let loaded = match self.load_image(path) {
            Ok(icon) => {
                debug!(path, size, "Icon loaded");
                Some(image::imageops::resize(&icon, size, size, FilterType::Lanczos3))
            }
            Err(e) => {
                warn!("Skipping icon {}: {}", path, e);
                None
            }
        };
        self.icon_cache.insert(key, loaded.clone());
        loaded
    }

    /// The legend typesetter, loaded from the configured font on first use.
    pub fn typesetter(&mut self) -> Option<&mut Typesetter> {
        if self.typesetter.is_none() {
            let font = self.paths.font.clone();
            let loaded = self
                .loader
                .load_bytes(&font)
                .map_err(TraceError::from)
                .and_then(Typesetter::from_font_bytes);
            let typesetter = match loaded {
                Ok(typesetter) => {
                    debug!(family = typesetter.family(), "Legend font loaded");
                    Some(typesetter)
                }
                Err(e) => {
                    warn!("Legend font {} unavailable, labels will be skipped: {}", font, e);
                    None
                }
            };
            self.typesetter = Some(typesetter);
        }
        self.typesetter.as_mut().and_then(Option::as_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct MemoryLoader(HashMap<String, Vec<u8>>);

    impl AssetLoader for MemoryLoader {
        fn load_bytes(&self, path: &str) -> anyhow::Result<Vec<u8>> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow!("missing {}", path))
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_icon_is_resized_and_cached() {
        let mut files = HashMap::new();
        files.insert("icons/death.png".to_string(), png(8, 8));
        let mut assets = AssetManager::new(Arc::new(MemoryLoader(files)), AssetPaths::default());

        let icon = assets.icon("icons/death.png", 4).unwrap();
        assert_eq!(icon.dimensions(), (4, 4));
        assert_eq!(assets.icon_cache.len(), 1);
        assert!(assets.icon("icons/death.png", 4).is_some());
        assert_eq!(assets.icon_cache.len(), 1);
    }

    #[test]
    fn test_missing_assets_degrade() {
        let mut assets =
            AssetManager::new(Arc::new(MemoryLoader(HashMap::new())), AssetPaths::default());
        assert!(assets.icon("icons/none.png", 10).is_none());
        assert!(assets.typesetter().is_none());
        assert!(matches!(
            assets.base_map("map_img/erangel.webp"),
            Err(TraceError::BaseMap(_))
        ));
    }
}
