//! # Telemetry Events
//!
//! Decodes the raw replay log (a JSON array of `_T`-tagged records) into
//! [`TelemetryEvent`]s. Each record is decoded independently: unknown record
//! types and records missing a field their variant needs are skipped, only a
//! document that is not an array of objects fails ingestion.

use crate::errors::TraceError;
use crate::types::GamePoint;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, instrument};

/// Item id of the emergency pickup consumable.
pub const EMERGENCY_PICKUP_ITEM: &str = "Item_EmergencyPickup_C";

/// The timestamps a record may carry.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct EventTime {
    /// Native seconds-since-start field (`elapsedTime`).
    pub elapsed: Option<f64>,
    /// Wall-clock timestamp (`_D`).
    pub absolute: Option<DateTime<Utc>>,
}

impl EventTime {
    pub fn absolute(at: DateTime<Utc>) -> Self {
        Self {
            elapsed: None,
            absolute: Some(at),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elapsed.is_none() && self.absolute.is_none()
    }
}

/// Whether a care package record marks its spawn or its landing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CarePackagePhase {
    Spawn,
    Land,
}

/// A decoded telemetry record.
#[derive(Clone, Debug, PartialEq)]
pub enum TelemetryEvent {
    MatchStart {
        map_name: Option<String>,
        time: EventTime,
    },
    PlayerCreate {
        player_name: String,
        team_id: i64,
        map_name: Option<String>,
    },
    PlayerPosition {
        player_name: String,
        location: GamePoint,
        map_name: Option<String>,
        time: EventTime,
    },
    PlayerKill {
        victim_name: String,
        killer_name: Option<String>,
        victim_location: GamePoint,
        time: EventTime,
    },
    ItemPickup {
        player_name: String,
        item_id: String,
        location: GamePoint,
    },
    SafeZoneUpdate {
        center: GamePoint,
        radius: f64,
    },
    CarePackage {
        location: GamePoint,
        phase: CarePackagePhase,
    },
}

impl TelemetryEvent {
    /// The record's timestamps, for the variants that carry one.
    pub fn time(&self) -> Option<&EventTime> {
        match self {
            TelemetryEvent::MatchStart { time, .. }
            | TelemetryEvent::PlayerPosition { time, .. }
            | TelemetryEvent::PlayerKill { time, .. } => Some(time),
            TelemetryEvent::PlayerCreate { .. }
            | TelemetryEvent::ItemPickup { .. }
            | TelemetryEvent::SafeZoneUpdate { .. }
            | TelemetryEvent::CarePackage { .. } => None,
        }
    }
}

// --- Wire format ---

#[derive(Deserialize, Debug)]
struct RawLocation {
    x: f64,
    y: f64,
}

impl From<RawLocation> for GamePoint {
    fn from(loc: RawLocation) -> Self {
        GamePoint::new(loc.x, loc.y)
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawCharacter {
    name: String,
    #[serde(default)]
    team_id: Option<i64>,
    #[serde(default)]
    location: Option<RawLocation>,
    #[serde(default)]
    map_name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawParty {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    location: Option<RawLocation>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    item_id: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawGameState {
    #[serde(default)]
    safety_zone_position: Option<RawLocation>,
    #[serde(default)]
    safety_zone_radius: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct RawItemPackage {
    #[serde(default)]
    location: Option<RawLocation>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "_T", rename_all_fields = "camelCase")]
enum RawRecord {
    LogMatchStart {
        #[serde(default)]
        map_name: Option<String>,
        #[serde(default)]
        elapsed_time: Option<f64>,
        #[serde(default, rename = "_D")]
        timestamp: Option<String>,
    },
    LogPlayerCreate {
        character: RawCharacter,
    },
    LogPlayerPosition {
        character: RawCharacter,
        #[serde(default)]
        elapsed_time: Option<f64>,
        #[serde(default, rename = "_D")]
        timestamp: Option<String>,
    },
    #[serde(rename = "LogPlayerKillV2")]
    LogPlayerKill {
        #[serde(default)]
        victim: Option<RawParty>,
        #[serde(default)]
        killer: Option<RawParty>,
        #[serde(default)]
        elapsed_time: Option<f64>,
        #[serde(default, rename = "_D")]
        timestamp: Option<String>,
    },
    LogItemPickup {
        character: RawCharacter,
        item: RawItem,
    },
    LogGameStatePeriodic {
        game_state: RawGameState,
    },
    LogCarePackageSpawn {
        item_package: RawItemPackage,
    },
    LogCarePackageLand {
        item_package: RawItemPackage,
    },
    #[serde(other)]
    Other,
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            debug!("Ignoring unparseable timestamp {:?}: {}", raw, e);
            None
        }
    }
}

fn event_time(elapsed: Option<f64>, timestamp: Option<String>) -> EventTime {
    EventTime {
        elapsed,
        absolute: parse_timestamp(timestamp),
    }
}

impl RawRecord {
    fn into_event(self) -> Option<TelemetryEvent> {
        match self {
            RawRecord::LogMatchStart {
                map_name,
                elapsed_time,
                timestamp,
            } => Some(TelemetryEvent::MatchStart {
                map_name,
                time: event_time(elapsed_time, timestamp),
            }),
            RawRecord::LogPlayerCreate { character } => Some(TelemetryEvent::PlayerCreate {
                player_name: character.name,
                team_id: character.team_id?,
                map_name: character.map_name,
            }),
            RawRecord::LogPlayerPosition {
                character,
                elapsed_time,
                timestamp,
            } => Some(TelemetryEvent::PlayerPosition {
                location: character.location?.into(),
                player_name: character.name,
                map_name: character.map_name,
                time: event_time(elapsed_time, timestamp),
            }),
            RawRecord::LogPlayerKill {
                victim,
                killer,
                elapsed_time,
                timestamp,
            } => {
                let victim = victim?;
                Some(TelemetryEvent::PlayerKill {
                    victim_name: victim.name?,
                    killer_name: killer.and_then(|k| k.name),
                    victim_location: victim.location?.into(),
                    time: event_time(elapsed_time, timestamp),
                })
            }
            RawRecord::LogItemPickup { character, item } => Some(TelemetryEvent::ItemPickup {
                location: character.location?.into(),
                player_name: character.name,
                item_id: item.item_id,
            }),
            RawRecord::LogGameStatePeriodic { game_state } => {
                Some(TelemetryEvent::SafeZoneUpdate {
                    center: game_state.safety_zone_position?.into(),
                    radius: game_state.safety_zone_radius?,
                })
            }
            RawRecord::LogCarePackageSpawn { item_package } => {
                Some(TelemetryEvent::CarePackage {
                    location: item_package.location?.into(),
                    phase: CarePackagePhase::Spawn,
                })
            }
            RawRecord::LogCarePackageLand { item_package } => Some(TelemetryEvent::CarePackage {
                location: item_package.location?.into(),
                phase: CarePackagePhase::Land,
            }),
            RawRecord::Other => None,
        }
    }
}

/// Decodes a raw telemetry document.
///
/// # Errors
/// Returns [`TraceError::TelemetryJson`] if the bytes are not JSON and
/// [`TraceError::MalformedTelemetry`] if the document is not an array of objects.
#[instrument(level = "debug", skip(bytes), fields(len = bytes.len()))]
pub fn parse_log(bytes: &[u8]) -> Result<Vec<TelemetryEvent>, TraceError> {
    let document: Value = serde_json::from_slice(bytes)?;
    let Value::Array(records) = document else {
        return Err(TraceError::MalformedTelemetry(
            "expected a JSON array of event records".into(),
        ));
    };

    let mut events = Vec::with_capacity(records.len());
    let mut skipped = 0usize;
    for (index, record) in records.into_iter().enumerate() {
        if !record.is_object() {
            return Err(TraceError::MalformedTelemetry(format!(
                "record {} is not an object",
                index
            )));
        }
        match serde_json::from_value::<RawRecord>(record) {
            Ok(raw) => match raw.into_event() {
                Some(event) => events.push(event),
                None => skipped += 1,
            },
            Err(e) => {
                debug!("Skipping record {}: {}", index, e);
                skipped += 1;
            }
        }
    }

    debug!(decoded = events.len(), skipped, "Telemetry decoded");
    Ok(events)
}

/// Reads and decodes a telemetry file.
pub fn load_log(path: &Path) -> Result<Vec<TelemetryEvent>, TraceError> {
    let bytes = std::fs::read(path).map_err(|e| {
        TraceError::MalformedTelemetry(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_log(&bytes)
}
