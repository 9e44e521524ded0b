//! # Match Timeline
//!
//! Normalizes a decoded event list into a single time axis (seconds since
//! match start) and answers the per-match queries the renderer needs: map
//! identity, team rosters, per-player movement streams, kills, safe zones,
//! care packages and emergency pickups.
//!
//! ## Time resolution
//! Each event's elapsed time is, in priority order: its native `elapsedTime`,
//! its absolute timestamp minus the match's absolute start, or zero (logged).
//! The absolute start comes from `MatchStart`; without one, the earliest
//! absolute timestamp in the log is used and precision is reported degraded.

use super::event::{EventTime, TelemetryEvent, EMERGENCY_PICKUP_ITEM};
use crate::errors::TraceError;
use crate::types::GamePoint;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Map used when the log names none.
pub const DEFAULT_MAP: &str = "Desert_Main";

/// What a player-stream sample records.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SampleKind {
    Position,
    /// The player was the victim of a kill here.
    Death,
}

/// One time-normalized movement or death sample for a single player.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlayerSample {
    pub location: GamePoint,
    /// Seconds since match start, always `> 0`.
    pub time: f64,
    pub kind: SampleKind,
}

/// A position sample of any player, used by the flight estimator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PositionSample {
    pub location: GamePoint,
    pub time: f64,
}

/// A kill location and its victim.
#[derive(Clone, Debug, PartialEq)]
pub struct KillSite {
    pub victim_name: String,
    pub killer_name: Option<String>,
    pub location: GamePoint,
}

/// A safe-zone circle in game units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SafeZone {
    pub center: GamePoint,
    pub radius: f64,
}

impl SafeZone {
    fn key(&self) -> (u64, u64, u64) {
        (
            self.center.x.to_bits(),
            self.center.y.to_bits(),
            self.radius.to_bits(),
        )
    }
}

/// How the match start was resolved.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StartReference {
    /// `MatchStart` carried an absolute timestamp.
    MatchStart(DateTime<Utc>),
    /// No usable `MatchStart` time; the earliest timestamp in the log stands in.
    EarliestEvent(DateTime<Utc>),
    /// No absolute timestamps at all; only native elapsed times are usable.
    Unknown,
}

/// A decoded match log with every timed event resolved to elapsed seconds.
#[derive(Clone, Debug)]
pub struct MatchTimeline {
    events: Vec<TelemetryEvent>,
    /// Parallel to `events`; `None` for record types without a time field.
    elapsed: Vec<Option<f64>>,
    map_name: String,
    start: StartReference,
}

impl MatchTimeline {
    pub fn new(events: Vec<TelemetryEvent>) -> Self {
        let map_name = resolve_map_name(&events);
        let start = resolve_start(&events);

        let mut untimed = 0usize;
        let elapsed = events
            .iter()
            .map(|event| {
                event.time().map(|time| {
                    let (seconds, resolved) = elapsed_seconds(time, start);
                    if !resolved {
                        untimed += 1;
                    }
                    seconds
                })
            })
            .collect();

        if untimed > 0 {
            warn!(
                untimed,
                "Events without a usable timestamp were assigned elapsed time 0 and will be ignored"
            );
        }

        Self {
            events,
            elapsed,
            map_name,
            start,
        }
    }

    /// The game's internal map identifier, e.g. `Erangel_Main`.
    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn start_reference(&self) -> StartReference {
        self.start
    }

    fn timed(&self) -> impl Iterator<Item = (&TelemetryEvent, f64)> {
        self.events
            .iter()
            .zip(self.elapsed.iter())
            .filter_map(|(event, elapsed)| elapsed.map(|t| (event, t)))
            .filter(|(_, t)| *t > 0.0)
    }

    /// Team id from the player's `PlayerCreate` record.
    pub fn team_id(&self, player: &str) -> Option<i64> {
        self.events.iter().find_map(|event| match event {
            TelemetryEvent::PlayerCreate {
                player_name,
                team_id,
                ..
            } if player_name == player => Some(*team_id),
            _ => None,
        })
    }

    /// Names of every player created with `team_id`, in first-seen order.
    pub fn team_members(&self, team_id: i64) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut members = Vec::new();
        for event in &self.events {
            if let TelemetryEvent::PlayerCreate {
                player_name,
                team_id: id,
                ..
            } = event
            {
                if *id == team_id && seen.insert(player_name.as_str()) {
                    members.push(player_name.clone());
                }
            }
        }
        members
    }

    /// The player's team with the player moved to the front.
    ///
    /// # Errors
    /// [`TraceError::UnknownPlayer`] when the player has no `PlayerCreate`
    /// record; callers fall back to tracking the player alone.
    pub fn roster(&self, player: &str) -> Result<Vec<String>, TraceError> {
        let team_id = self
            .team_id(player)
            .ok_or_else(|| TraceError::UnknownPlayer(player.to_string()))?;
        let mut members = self.team_members(team_id);
        members.retain(|name| name != player);
        members.insert(0, player.to_string());
        Ok(members)
    }

    /// Positions and deaths of one player with elapsed time `> 0`, in log order.
    pub fn player_samples(&self, player: &str) -> Vec<PlayerSample> {
        let mut samples = Vec::new();
        for (event, time) in self.timed() {
            match event {
                TelemetryEvent::PlayerPosition {
                    player_name,
                    location,
                    ..
                } if player_name == player => samples.push(PlayerSample {
                    location: *location,
                    time,
                    kind: SampleKind::Position,
                }),
                TelemetryEvent::PlayerKill {
                    victim_name,
                    victim_location,
                    ..
                } if victim_name == player => samples.push(PlayerSample {
                    location: *victim_location,
                    time,
                    kind: SampleKind::Death,
                }),
                _ => {}
            }
        }
        debug!(player, samples = samples.len(), "Collected player samples");
        samples
    }

    /// Every player's position samples with elapsed time `> 0`.
    pub fn position_samples(&self) -> Vec<PositionSample> {
        self.timed()
            .filter_map(|(event, time)| match event {
                TelemetryEvent::PlayerPosition { location, .. } => Some(PositionSample {
                    location: *location,
                    time,
                }),
                _ => None,
            })
            .collect()
    }

    /// All kills in the match, regardless of time.
    pub fn kills(&self) -> Vec<KillSite> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TelemetryEvent::PlayerKill {
                    victim_name,
                    killer_name,
                    victim_location,
                    ..
                } => Some(KillSite {
                    victim_name: victim_name.clone(),
                    killer_name: killer_name.clone(),
                    location: *victim_location,
                }),
                _ => None,
            })
            .collect()
    }

    /// Safe zones that occur more than once in the log, each reported once.
    ///
    /// Zones seen exactly once are dropped. This mirrors the long-standing
    /// behaviour of the renderer and may hide genuine single updates.
    pub fn safe_zones(&self) -> Vec<SafeZone> {
        let raw: Vec<SafeZone> = self
            .events
            .iter()
            .filter_map(|event| match event {
                TelemetryEvent::SafeZoneUpdate { center, radius } => Some(SafeZone {
                    center: *center,
                    radius: *radius,
                }),
                _ => None,
            })
            .collect();

        let mut counts = HashMap::new();
        for zone in &raw {
            *counts.entry(zone.key()).or_insert(0usize) += 1;
        }

        let mut emitted = HashSet::new();
        raw.into_iter()
            .filter(|zone| counts[&zone.key()] > 1 && emitted.insert(zone.key()))
            .collect()
    }

    /// Spawn and landing locations of every care package.
    pub fn care_packages(&self) -> Vec<GamePoint> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TelemetryEvent::CarePackage { location, .. } => Some(*location),
                _ => None,
            })
            .collect()
    }

    /// Emergency pickups used by any of `players`.
    pub fn emergency_pickups(&self, players: &[String]) -> Vec<GamePoint> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TelemetryEvent::ItemPickup {
                    player_name,
                    item_id,
                    location,
                } if item_id == EMERGENCY_PICKUP_ITEM && players.contains(player_name) => {
                    Some(*location)
                }
                _ => None,
            })
            .collect()
    }
}

fn resolve_map_name(events: &[TelemetryEvent]) -> String {
    let from_start = events.iter().find_map(|event| match event {
        TelemetryEvent::MatchStart {
            map_name: Some(name),
            ..
        } => Some(name),
        _ => None,
    });
    let from_create = || {
        events.iter().find_map(|event| match event {
            TelemetryEvent::PlayerCreate {
                map_name: Some(name),
                ..
            } => Some(name),
            _ => None,
        })
    };
    let from_position = || {
        events.iter().find_map(|event| match event {
            TelemetryEvent::PlayerPosition {
                map_name: Some(name),
                ..
            } => Some(name),
            _ => None,
        })
    };

    match from_start.or_else(from_create).or_else(from_position) {
        Some(name) => name.clone(),
        None => {
            warn!("Telemetry names no map; using {}", DEFAULT_MAP);
            DEFAULT_MAP.to_string()
        }
    }
}

fn resolve_start(events: &[TelemetryEvent]) -> StartReference {
    let match_start = events.iter().find_map(|event| match event {
        TelemetryEvent::MatchStart { time, .. } => Some(time),
        _ => None,
    });

    if let Some(at) = match_start.and_then(|time| time.absolute) {
        return StartReference::MatchStart(at);
    }

    let earliest = events
        .iter()
        .filter_map(|event| event.time().and_then(|time| time.absolute))
        .min();

    match earliest {
        Some(at) => {
            warn!(
                start = %at,
                "MatchStart carries no timestamp; measuring from the earliest event, precision degraded"
            );
            StartReference::EarliestEvent(at)
        }
        None => {
            if match_start.map_or(true, EventTime::is_empty) {
                warn!("MatchStart time not found; assuming match start at 0");
            }
            StartReference::Unknown
        }
    }
}

/// Elapsed seconds for one event and whether a real timestamp backed it.
fn elapsed_seconds(time: &EventTime, start: StartReference) -> (f64, bool) {
    if let Some(elapsed) = time.elapsed {
        return (elapsed, true);
    }
    let start_at = match start {
        StartReference::MatchStart(at) | StartReference::EarliestEvent(at) => Some(at),
        StartReference::Unknown => None,
    };
    match (time.absolute, start_at) {
        (Some(at), Some(start_at)) => {
            let seconds = (at - start_at).num_milliseconds() as f64 / 1000.0;
            (seconds.max(0.0), true)
        }
        _ => (0.0, false),
    }
}
