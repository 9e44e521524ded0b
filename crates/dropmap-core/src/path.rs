//! # Path Reconstruction
//!
//! Turns one player's time-normalized samples into a typed path and the
//! drawable segments between spawns and deaths.
//!
//! After a death the player is considered to still be at the death site until
//! a sample lands at least [`RESPAWN_DISTANCE`] game units away (measured on the
//! raster, after truncation to whole pixels). That sample opens the post-death
//! stretch and is recorded as a spawn marker.

use crate::telemetry::{PlayerSample, SampleKind};
use crate::types::{GamePoint, PathPoint, PixelPoint, PointKind};
use tracing::debug;

/// Distance from the death site, in game units, that counts as a respawn.
pub const RESPAWN_DISTANCE: f64 = 500.0;

/// Collapse tolerance (pixels) for segments closed by a death.
pub const INTERIOR_TOLERANCE: f64 = 0.2;

/// Collapse tolerance (pixels) for the segment still open when the path ends.
pub const TRAILING_TOLERANCE: f64 = 0.4;

/// A continuous stretch of movement, in pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub points: Vec<PixelPoint>,
    /// Whether the player had already died once when this stretch began.
    pub after_death: bool,
}

/// A reconstructed player path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerPath {
    /// Every kept point, ordered by time.
    pub points: Vec<PathPoint>,
    /// Drawable segments, each with at least two distinct points.
    pub segments: Vec<Segment>,
    /// Game-space locations where the player re-entered play.
    pub spawn_markers: Vec<GamePoint>,
}

impl PlayerPath {
    /// True when the player produced no movement at all.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether any position (pre- or post-death) survived reconstruction.
    pub fn has_movement(&self) -> bool {
        self.points
            .iter()
            .any(|p| matches!(p.kind, PointKind::Position | PointKind::AfterDeathPosition))
    }

    pub fn death_sites(&self) -> Vec<GamePoint> {
        self.points
            .iter()
            .filter(|p| p.kind == PointKind::KillBreak)
            .map(PathPoint::location)
            .collect()
    }
}

/// Collapses consecutive points whose squared distance is within `tolerance²`.
pub fn dedup_segment(points: &[PixelPoint], tolerance: f64) -> Vec<PixelPoint> {
    let limit = tolerance * tolerance;
    let mut kept: Vec<PixelPoint> = Vec::with_capacity(points.len());
    for &point in points {
        let duplicate = kept
            .last()
            .is_some_and(|last| (point.distance_sq(last) as f64) <= limit);
        if !duplicate {
            kept.push(point);
        }
    }
    kept
}

/// Builds [`PlayerPath`]s for a given raster scale.
#[derive(Clone, Debug)]
pub struct PathReconstructor {
    scale: f64,
    respawn_distance: f64,
    interior_tolerance: f64,
    trailing_tolerance: f64,
}

impl PathReconstructor {
    /// `scale` converts game units to pixels.
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            respawn_distance: RESPAWN_DISTANCE,
            interior_tolerance: INTERIOR_TOLERANCE,
            trailing_tolerance: TRAILING_TOLERANCE,
        }
    }

    pub fn with_tolerances(mut self, interior: f64, trailing: f64) -> Self {
        self.interior_tolerance = interior;
        self.trailing_tolerance = trailing;
        self
    }

    pub fn with_respawn_distance(mut self, distance: f64) -> Self {
        self.respawn_distance = distance;
        self
    }

    /// Squared respawn threshold in whole pixels.
    fn respawn_threshold_sq(&self) -> i64 {
        let px = (self.respawn_distance * self.scale) as i64;
        px * px
    }

    fn flush(
        &self,
        open: &mut Vec<PixelPoint>,
        after_death: bool,
        tolerance: f64,
        out: &mut Vec<Segment>,
    ) {
        let raw = std::mem::take(open);
        if raw.len() < 2 {
            return;
        }
        let points = dedup_segment(&raw, tolerance);
        if points.len() >= 2 {
            out.push(Segment {
                points,
                after_death,
            });
        }
    }

    /// Reconstructs a path from one player's samples.
    ///
    /// Samples need not be sorted; ties keep their input order. A player
    /// without any position sample yields an empty path.
    pub fn reconstruct(&self, samples: &[PlayerSample]) -> PlayerPath {
        if !samples.iter().any(|s| s.kind == SampleKind::Position) {
            return PlayerPath::default();
        }

        let mut ordered = samples.to_vec();
        ordered.sort_by(|a, b| a.time.total_cmp(&b.time));

        let threshold_sq = self.respawn_threshold_sq();
        let mut path = PlayerPath::default();
        let mut open: Vec<PixelPoint> = Vec::new();
        let mut after_death = false;
        let mut last_death: Option<PixelPoint> = None;
        let mut discarded = 0usize;

        for sample in &ordered {
            let px = sample.location.to_pixel(self.scale);
            match sample.kind {
                SampleKind::Death => {
                    self.flush(
                        &mut open,
                        after_death,
                        self.interior_tolerance,
                        &mut path.segments,
                    );
                    after_death = true;
                    last_death = Some(px);
                    path.points.push(point(sample, PointKind::KillBreak));
                }
                SampleKind::Position => match last_death {
                    Some(death) if px.distance_sq(&death) < threshold_sq => {
                        discarded += 1;
                    }
                    Some(_) => {
                        last_death = None;
                        open.push(px);
                        path.spawn_markers.push(sample.location);
                        path.points.push(point(sample, PointKind::AfterDeathPosition));
                    }
                    None => {
                        open.push(px);
                        path.points.push(point(sample, PointKind::Position));
                    }
                },
            }
        }
        self.flush(
            &mut open,
            after_death,
            self.trailing_tolerance,
            &mut path.segments,
        );

        debug!(
            points = path.points.len(),
            segments = path.segments.len(),
            spawns = path.spawn_markers.len(),
            discarded,
            "Path reconstructed"
        );
        path
    }
}

fn point(sample: &PlayerSample, kind: PointKind) -> PathPoint {
    PathPoint {
        x: sample.location.x,
        y: sample.location.y,
        time: sample.time,
        kind,
    }
}
