//! # Flight Path
//!
//! Estimates the drop-ship line `y = slope·x + intercept` (game units) from the
//! position samples of the first seconds of the match, while every player is
//! still aboard.

use crate::telemetry::PositionSample;
use crate::types::GamePoint;
use tracing::warn;

/// Samples with elapsed time below this many seconds are treated as in-flight.
pub const FLIGHT_WINDOW_SECS: f64 = 5.0;

/// A fitted line in game space. `(0, 0)` means no line is available.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FlightFit {
    pub slope: f64,
    pub intercept: f64,
}

impl FlightFit {
    pub const NONE: FlightFit = FlightFit {
        slope: 0.0,
        intercept: 0.0,
    };

    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// False for the `(0, 0)` sentinel; such a fit must not be drawn.
    pub fn is_available(&self) -> bool {
        *self != Self::NONE
    }
}

/// Ordinary least squares over `points`. `None` for fewer than two points or
/// when every point shares one x (the line would be vertical).
pub fn least_squares(points: &[GamePoint]) -> Option<FlightFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.x).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.y).sum::<f64>() / n;

    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), p| {
        let dx = p.x - mean_x;
        (sxx + dx * dx, sxy + dx * (p.y - mean_y))
    });
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    Some(FlightFit::new(slope, mean_y - slope * mean_x))
}

/// Fits the flight line from every early position sample of the match.
///
/// Returns [`FlightFit::NONE`] (and logs a warning) when fewer than two
/// usable samples fall inside [`FLIGHT_WINDOW_SECS`].
pub fn fit(samples: &[PositionSample]) -> FlightFit {
    let mut early: Vec<&PositionSample> = samples
        .iter()
        .filter(|s| s.time > 0.0 && s.time < FLIGHT_WINDOW_SECS)
        .collect();
    early.sort_by(|a, b| a.time.total_cmp(&b.time));

    let points: Vec<GamePoint> = early.iter().map(|s| s.location).collect();
    match least_squares(&points) {
        Some(fit) => fit,
        None => {
            warn!(
                samples = points.len(),
                "Not enough early position samples to estimate the flight path"
            );
            FlightFit::NONE
        }
    }
}
