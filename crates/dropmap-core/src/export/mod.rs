//! # Export Module
//!
//! Persistence of finished renders.
//!
//! ## Responsibilities
//! - **Naming**: Deterministic, filesystem-safe output paths per player, match and map.
//! - **Encoding**: Lossless WebP by default, PNG when the path asks for it.
//! - **Atomic Writes**: Encode into a temporary file beside the target, then rename.

pub mod raster;

pub use raster::{output_path_for, sanitize_component, save_image};
