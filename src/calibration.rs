// src/calibration.rs
//
// Pixel ↔ meter conversion for one video session.
//
// The pitch (22 yards = 20.12 m) is assumed to span a fixed fraction of the
// frame height. One value is computed when the session starts and then never
// changes; converting before it is set is a hard error because every
// downstream velocity/distance would be silently wrong.

use crate::analysis::tracker::Track;
use crate::error::{LbwError, Result};
use crate::types::{BallState, Vec3};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::info;

pub const PITCH_LENGTH_M: f64 = 20.12;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub pitch_length_m: f64,
    /// Fraction of the frame height occupied by the pitch
    pub pitch_frame_fraction: f64,
    /// Fixed scale, skips the pitch-based estimate when set
    pub pixels_to_meters: Option<f64>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            pitch_length_m: PITCH_LENGTH_M,
            pitch_frame_fraction: 0.8,
            pixels_to_meters: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationContext {
    pub pixels_to_meters: f64,
    pub fps: f64,
}

impl CalibrationContext {
    pub fn new(pixels_to_meters: f64, fps: f64) -> Self {
        Self {
            pixels_to_meters,
            fps,
        }
    }

    /// Scale from the known pitch length: 20.12 / (frame_height × 0.8) by default.
    pub fn from_frame(frame_height: u32, fps: f64, config: &CalibrationConfig) -> Self {
        let pixels_to_meters = config.pixels_to_meters.unwrap_or_else(|| {
            config.pitch_length_m / (frame_height as f64 * config.pitch_frame_fraction)
        });
        Self::new(pixels_to_meters, fps)
    }

    #[inline]
    pub fn px_to_m(&self, px: f64) -> f64 {
        px * self.pixels_to_meters
    }

    /// Pixels per frame → meters per second.
    #[inline]
    pub fn px_per_frame_to_mps(&self, px: f64) -> f64 {
        px * self.pixels_to_meters * self.fps
    }

    pub fn frame_to_seconds(&self, frame: u64) -> f64 {
        frame as f64 / self.fps
    }

    /// Lift a pixel track into physical ball states for a single side-on camera.
    ///
    /// Image x maps to the down-pitch axis and image rows above the bottom
    /// edge map to height. A single view carries no lateral information, so
    /// z is 0; multi-camera fusion can supply real lateral positions.
    pub fn ball_states(&self, track: &Track, frame_height: u32) -> Vec<BallState> {
        let h = frame_height as f64;
        let n = track.positions.len();
        let mut states = Vec::with_capacity(n);

        for i in 0..n {
            let (px, py) = track.positions[i];
            let position = Vec3::new(self.px_to_m(px), self.px_to_m(h - py), 0.0);

            // A freshly born track has no velocity yet; borrow the next step's
            let (vx, vy) = if i == 0 && n > 1 {
                track.velocities[1]
            } else {
                track.velocities[i]
            };
            let velocity = Vec3::new(
                self.px_per_frame_to_mps(vx),
                -self.px_per_frame_to_mps(vy),
                0.0,
            );

            states.push(BallState::new(
                position,
                velocity,
                self.frame_to_seconds(track.frames[i]),
            ));
        }
        states
    }
}

/// Write-once holder for the session calibration.
#[derive(Debug, Default)]
pub struct SessionCalibration {
    cell: OnceLock<CalibrationContext>,
}

impl SessionCalibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Result<&CalibrationContext> {
        self.cell.get().ok_or(LbwError::CalibrationNotSet)
    }

    /// Set once. Re-setting the identical value is a no-op; anything else conflicts.
    pub fn init(&self, ctx: CalibrationContext) -> Result<&CalibrationContext> {
        if self.cell.set(ctx).is_ok() {
            info!(
                "📏 Calibration set: {:.5} m/px @ {:.1} fps",
                ctx.pixels_to_meters, ctx.fps
            );
        }
        let existing = self.get()?;
        if *existing != ctx {
            return Err(LbwError::CalibrationConflict {
                existing: existing.pixels_to_meters,
                requested: ctx.pixels_to_meters,
            });
        }
        Ok(existing)
    }
}
