use crate::errors::TraceError;
use image::{ImageFormat, RgbaImage};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// Replaces every character outside `[A-Za-z0-9_.-]` with `_`.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    // a lone ".." would escape the output directory
    if cleaned.chars().all(|c| c == '.') {
        cleaned.replace('.', "_")
    } else {
        cleaned
    }
}

/// `<dir>/<player>_<match_id>_<map_name>_trace.webp`
pub fn output_path_for(dir: &Path, player: &str, match_id: &str, map_name: &str) -> PathBuf {
    dir.join(format!(
        "{}_{}_{}_trace.webp",
        sanitize_component(player),
        sanitize_component(match_id),
        sanitize_component(map_name)
    ))
}

/// Encodes `image` to `path`, picking the format from the extension
/// (WebP when unknown). The file appears only once fully written.
#[instrument(level = "debug", skip(image), fields(path = %path.display()))]
pub fn save_image(image: &RgbaImage, path: &Path) -> Result<(), TraceError> {
    let format = match ImageFormat::from_path(path) {
        Ok(format) if format.writing_enabled() => format,
        _ => ImageFormat::WebP,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        image.write_to(&mut writer, format)?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| TraceError::IoError(e.error))?;
    debug!(?format, "Image written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name_is_sanitized() {
        let path = output_path_for(Path::new("out"), "Shroud/Pro", "a b:c", "Erangel_Main");
        assert_eq!(path, Path::new("out/Shroud_Pro_a_b_c_Erangel_Main_trace.webp"));
        assert_eq!(sanitize_component(".."), "__");
        assert_eq!(sanitize_component("Jo.e-1"), "Jo.e-1");
    }

    #[test]
    fn test_save_writes_decodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbaImage::from_pixel(4, 3, image::Rgba([1, 2, 3, 255]));

        let webp = dir.path().join("nested/render.webp");
        save_image(&image, &webp).unwrap();
        let decoded = image::open(&webp).unwrap().to_rgba8();
        assert_eq!(decoded, image);

        let png = dir.path().join("render.png");
        save_image(&image, &png).unwrap();
        assert_eq!(ImageFormat::from_path(&png).unwrap(), ImageFormat::Png);
        assert_eq!(image::open(&png).unwrap().to_rgba8(), image);

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 2);
    }
}
