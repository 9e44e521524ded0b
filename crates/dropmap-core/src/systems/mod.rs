pub mod assets;
pub mod legend;
pub mod renderer;
pub mod typography;

pub use assets::AssetManager;
pub use legend::{LegendEntry, LegendMarker};
pub use renderer::RenderContext;
pub use typography::Typesetter;
