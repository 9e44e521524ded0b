//! # Telemetry Module
//!
//! Ingestion of raw match logs.
//!
//! ## Responsibilities
//! - **Decoding**: `_T`-tagged JSON records into [`TelemetryEvent`] (`event`).
//! - **Normalization**: a single elapsed-seconds axis and per-match queries (`timeline`).

pub mod event;
pub mod timeline;

pub use event::{
    load_log, parse_log, CarePackagePhase, EventTime, TelemetryEvent, EMERGENCY_PICKUP_ITEM,
};
pub use timeline::{
    KillSite, MatchTimeline, PlayerSample, PositionSample, SafeZone, SampleKind,
    StartReference, DEFAULT_MAP,
};
