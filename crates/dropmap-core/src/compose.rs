//! # Composition
//!
//! Turns one render request into one image file.
//!
//! ## Responsibilities
//! - **Tracking**: Resolves the tracked players (the requested player, or their whole team).
//! - **Colors**: The requested player gets the primary color, teammates cycle the palette.
//! - **Layering**: Kill flags, paths and respawns, deaths, zones, flight line, care
//!   packages, emergency pickups, main legend, player legend, watermark.
//! - **Status**: A human-readable line for the delivery layer.

use crate::config::RenderConfig;
use crate::errors::TraceError;
use crate::export;
use crate::flight;
use crate::path::{PathReconstructor, PlayerPath};
use crate::systems::{AssetManager, LegendEntry, LegendMarker, RenderContext};
use crate::telemetry::{MatchTimeline, PlayerSample, SampleKind};
use crate::types::{Color, Swatch};
use crate::AssetLoader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// What the caller asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderRequest {
    /// Player display name, matched case-sensitively.
    pub player: String,
    pub match_id: String,
    /// Also track every teammate of `player`.
    pub track_team: bool,
}

impl RenderRequest {
    pub fn new(player: impl Into<String>, match_id: impl Into<String>, track_team: bool) -> Self {
        Self {
            player: player.into(),
            match_id: match_id.into(),
            track_team,
        }
    }
}

/// Result of a render that did not fail.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderOutcome {
    Rendered {
        path: PathBuf,
        /// Tracked players in drawing order, requested player first when tracked.
        players: Vec<String>,
        map_display_name: String,
        /// Whether the requested player moved after match start.
        primary_has_movement: bool,
    },
    /// None of the requested players appear in the match. No file was written.
    NoData { player: String },
}

impl RenderOutcome {
    pub fn output_path(&self) -> Option<&Path> {
        match self {
            RenderOutcome::Rendered { path, .. } => Some(path),
            RenderOutcome::NoData { .. } => None,
        }
    }

    pub fn status_message(&self) -> String {
        match self {
            RenderOutcome::Rendered {
                players,
                map_display_name,
                primary_has_movement,
                ..
            } => {
                let mut message = format!(
                    "Telemetry for player(s): {} on map {}",
                    players.join(", "),
                    map_display_name
                );
                if !primary_has_movement {
                    message.push_str(
                        "\n\nWarning: no location data was found for the main player after match start.",
                    );
                }
                message
            }
            RenderOutcome::NoData { player } => {
                format!("No telemetry data found for player `{}` in this match.", player)
            }
        }
    }
}

/// Status line for any render result, failures included.
pub fn status_line(result: &Result<RenderOutcome, TraceError>) -> String {
    match result {
        Ok(outcome) => outcome.status_message(),
        Err(e) => format!("Rendering failed: {}", e),
    }
}

/// A tracked player with their samples and path color.
struct Tracked {
    name: String,
    color: Color,
    samples: Vec<PlayerSample>,
}

/// Renders requests against a fixed configuration and asset source.
#[derive(Clone)]
pub struct Compositor {
    config: RenderConfig,
    loader: Arc<dyn AssetLoader>,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Compositor {
    pub fn new(config: RenderConfig, loader: Arc<dyn AssetLoader>) -> Self {
        Self { config, loader }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Renders into the configured output directory under the standard name.
    pub fn render(
        &self,
        timeline: &MatchTimeline,
        request: &RenderRequest,
    ) -> Result<RenderOutcome, TraceError> {
        let output = export::output_path_for(
            &self.config.output_dir,
            &request.player,
            &request.match_id,
            timeline.map_name(),
        );
        self.render_to(timeline, request, &output)
    }

    /// Renders to an explicit output path.
    #[instrument(
        level = "info",
        skip(self, timeline, request),
        fields(player = %request.player, team = request.track_team)
    )]
    pub fn render_to(
        &self,
        timeline: &MatchTimeline,
        request: &RenderRequest,
        output: &Path,
    ) -> Result<RenderOutcome, TraceError> {
        let started = Instant::now();

        let tracked = self.tracked_players(timeline, request);
        if tracked.is_empty() {
            info!("No telemetry for requested player(s)");
            return Ok(RenderOutcome::NoData {
                player: request.player.clone(),
            });
        }

        let entry = self.config.maps.resolve(timeline.map_name());
        let assets = AssetManager::new(self.loader.clone(), self.config.assets.clone());
        let base = assets.base_map(&self.config.assets.base_map(&entry))?;
        let mut ctx = RenderContext::new(&base, self.config.map_size, assets)?;
        drop(base);

        let tokens = &self.config.tokens;
        let reconstructor = PathReconstructor::new(ctx.scale())
            .with_tolerances(tokens.interior_tolerance, tokens.trailing_tolerance)
            .with_respawn_distance(tokens.respawn_distance);
        let paths: Vec<PlayerPath> = tracked
            .iter()
            .map(|player| reconstructor.reconstruct(&player.samples))
            .collect();
        let primary_has_movement = tracked
            .iter()
            .zip(&paths)
            .any(|(player, path)| player.name == request.player && path.has_movement());

        self.compose_layers(&mut ctx, timeline, &tracked, &paths);

        let image = ctx.into_image()?;
        export::save_image(&image, output)?;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            output = %output.display(),
            "Render complete"
        );
        Ok(RenderOutcome::Rendered {
            path: output.to_path_buf(),
            players: tracked.into_iter().map(|player| player.name).collect(),
            map_display_name: entry.display_name,
            primary_has_movement,
        })
    }

    /// Players to draw, each with at least one position after match start, and their colors.
    fn tracked_players(&self, timeline: &MatchTimeline, request: &RenderRequest) -> Vec<Tracked> {
        let roster = if request.track_team {
            match timeline.roster(&request.player) {
                Ok(roster) => roster,
                Err(e) => {
                    warn!("Team lookup failed, tracking the player alone: {}", e);
                    vec![request.player.clone()]
                }
            }
        } else {
            vec![request.player.clone()]
        };

        let palette = &self.config.tokens.palette;
        let mut teammates = 0usize;
        let mut tracked = Vec::with_capacity(roster.len());
        for name in roster {
            let samples = timeline.player_samples(&name);
            if !samples.iter().any(|s| s.kind == SampleKind::Position) {
                warn!(player = %name, "No movement data, player skipped");
                continue;
            }
            let color = if name == request.player {
                palette.primary
            } else {
                teammates += 1;
                palette.teammate_color(teammates - 1)
            };
            tracked.push(Tracked {
                name,
                color,
                samples,
            });
        }
        tracked
    }

    fn compose_layers(
        &self,
        ctx: &mut RenderContext,
        timeline: &MatchTimeline,
        tracked: &[Tracked],
        paths: &[PlayerPath],
    ) {
        let tokens = &self.config.tokens;
        let palette = &tokens.palette;
        let icons = &self.config.assets;
        let names: Vec<String> = tracked.iter().map(|player| player.name.clone()).collect();

        let third_party: Vec<_> = timeline
            .kills()
            .into_iter()
            .filter(|kill| !names.contains(&kill.victim_name))
            .map(|kill| kill.location)
            .collect();
        ctx.draw_flags(
            &third_party,
            Swatch::solid(palette.kill_flag),
            tokens.flag_diameter,
        );

        for (player, path) in tracked.iter().zip(paths) {
            let spawns = ctx.draw_path(path, player.color, player.color, tokens.path_width);
            ctx.draw_icon(&spawns, &icons.respawn_icon, tokens.respawn_icon_size, None);
        }

        for (player, path) in tracked.iter().zip(paths) {
            ctx.draw_icon(
                &path.death_sites(),
                &icons.death_icon,
                tokens.death_icon_size,
                Some(player.color),
            );
        }

        let zones = timeline.safe_zones();
        debug!(zones = zones.len(), "Drawing safe zones");
        ctx.draw_magnetic(&zones, palette.safe_zone, tokens.safe_zone_width);

        let fit = flight::fit(&timeline.position_samples());
        ctx.draw_flight(fit, palette.flight, tokens.flight_width);

        ctx.draw_icon(
            &timeline.care_packages(),
            &icons.airdrop_icon,
            tokens.airdrop_icon_size,
            None,
        );
        ctx.draw_icon(
            &timeline.emergency_pickups(&names),
            &icons.pickup_icon,
            tokens.pickup_icon_size,
            None,
        );

        for entry in self.main_legend() {
            ctx.add_legend_entry(entry);
        }
        ctx.flush_legend(&tokens.main_legend, palette.legend_background);

        let players: Vec<(String, Color)> = tracked
            .iter()
            .map(|player| (player.name.clone(), player.color))
            .collect();
        ctx.draw_player_legend(&players, &tokens.player_legend, palette.legend_background);

        let watermark = &tokens.watermark;
        ctx.draw_watermark(
            &icons.watermark,
            watermark.opacity,
            watermark.corner,
            watermark.padding,
        );
    }

    fn main_legend(&self) -> Vec<LegendEntry> {
        let palette = &self.config.tokens.palette;
        let icons = &self.config.assets;
        let white = Swatch::solid(Color::WHITE);
        let icon = |asset: &str, tint: Option<Color>| LegendMarker::Icon {
            asset: asset.to_string(),
            tint,
        };
        vec![
            LegendEntry::new(
                "Team/Player Death",
                white,
                icon(&icons.death_icon, Some(palette.legend_death_tint)),
            ),
            LegendEntry::new("Respawn/Revive", white, icon(&icons.respawn_icon, None)),
            LegendEntry::new(
                "Safe Zones",
                Swatch::solid(palette.safe_zone),
                LegendMarker::Outline,
            ),
            LegendEntry::new(
                "Flight Path",
                Swatch::solid(palette.flight),
                LegendMarker::Path,
            ),
            LegendEntry::new("Emergency Pickup", white, icon(&icons.pickup_icon, None)),
            LegendEntry::new(
                "Airdrop",
                Swatch::solid(palette.airdrop_label),
                icon(&icons.airdrop_icon, None),
            ),
            LegendEntry::new(
                "Deaths (Other Players)",
                Swatch::solid(palette.kill_flag),
                LegendMarker::Flag,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        let rendered = RenderOutcome::Rendered {
            path: PathBuf::from("out.webp"),
            players: vec!["A".into(), "B".into()],
            map_display_name: "Erangel".into(),
            primary_has_movement: true,
        };
        assert_eq!(
            rendered.status_message(),
            "Telemetry for player(s): A, B on map Erangel"
        );

        let idle = RenderOutcome::Rendered {
            path: PathBuf::from("out.webp"),
            players: vec!["A".into(), "B".into()],
            map_display_name: "Erangel".into(),
            primary_has_movement: false,
        };
        assert!(idle.status_message().contains("Warning"));

        let none = RenderOutcome::NoData {
            player: "Ghost".into(),
        };
        assert_eq!(
            none.status_message(),
            "No telemetry data found for player `Ghost` in this match."
        );
        assert_eq!(none.output_path(), None);

        let failed: Result<RenderOutcome, TraceError> =
            Err(TraceError::BaseMap("erangel.webp".into()));
        assert!(status_line(&failed).starts_with("Rendering failed: "));
    }
}
