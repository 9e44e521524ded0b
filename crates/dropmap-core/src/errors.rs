use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Malformed telemetry: {0}")]
    MalformedTelemetry(String),
    #[error("Telemetry is not valid JSON: {0}")]
    TelemetryJson(#[from] serde_json::Error),
    #[error("Base map unavailable: {0}")]
    BaseMap(String),
    #[error("Asset not found: {0}")]
    AssetNotFound(String),
    #[error("Player `{0}` has no PlayerCreate record in this match")]
    UnknownPlayer(String),
    #[error("Failed to allocate a {0}x{1} canvas")]
    SurfaceFailure(u32, u32),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Render worker pool: {0}")]
    Pool(String),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
