// src/analysis/motion.rs
//
// Decides whether a track moves like a bowled cricket ball.
//
// A delivery covers most of a 20 m pitch well above 30 km/h with a smooth
// speed profile. Shadows, clothing and spectators are slow, short-lived or
// jerky, so three thresholds reject them:
//
//   avg speed ≥ 30 km/h  ∧  distance ≥ 15 m  ∧  σ(speed) < 0.5·μ(speed)
//
// Too few points is reported as InsufficientData, never as Invalid.

use super::tracker::Track;
use crate::calibration::CalibrationContext;
use serde::{Deserialize, Serialize};

/// Absorbs float noise when a track sits exactly on a threshold.
const THRESHOLD_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub min_points_for_stats: usize,
    pub min_points_for_verdict: usize,
    /// Inclusive minimum on average speed
    pub min_velocity_kmh: f64,
    /// Inclusive minimum on path length
    pub min_distance_m: f64,
    /// Speed std-dev must stay under this fraction of the mean
    pub consistency_ratio: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            min_points_for_stats: 3,
            min_points_for_verdict: 10,
            min_velocity_kmh: 30.0,
            min_distance_m: 15.0,
            consistency_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionVerdict {
    Valid,
    Invalid,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionReport {
    pub points: usize,
    pub avg_velocity_kmh: f64,
    pub max_velocity_kmh: f64,
    pub velocity_std_kmh: f64,
    pub distance_m: f64,
    pub duration_s: f64,
    pub motion_consistency: bool,
    pub verdict: MotionVerdict,
}

impl MotionReport {
    fn insufficient(points: usize) -> Self {
        Self {
            points,
            avg_velocity_kmh: 0.0,
            max_velocity_kmh: 0.0,
            velocity_std_kmh: 0.0,
            distance_m: 0.0,
            duration_s: 0.0,
            motion_consistency: false,
            verdict: MotionVerdict::InsufficientData,
        }
    }

    pub fn is_valid_cricket_ball(&self) -> bool {
        self.verdict == MotionVerdict::Valid
    }

    pub fn has_statistics(&self) -> bool {
        self.avg_velocity_kmh > 0.0 || self.distance_m > 0.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct MotionValidator {
    config: MotionConfig,
}

impl MotionValidator {
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn validate(&self, track: &Track, calib: &CalibrationContext) -> MotionReport {
        self.analyze(&track.positions, &track.frames, calib)
    }

    /// `positions` and `frames` are parallel and frame-ordered.
    pub fn analyze(
        &self,
        positions: &[(f64, f64)],
        frames: &[u64],
        calib: &CalibrationContext,
    ) -> MotionReport {
        let cfg = &self.config;
        let n = positions.len().min(frames.len());
        if n < cfg.min_points_for_stats.max(2) {
            return MotionReport::insufficient(n);
        }

        let mut speeds_mps = Vec::with_capacity(n - 1);
        let mut distance_px = 0.0;
        for i in 1..n {
            let (x0, y0) = positions[i - 1];
            let (x1, y1) = positions[i];
            let step = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
            let gap = frames[i].saturating_sub(frames[i - 1]).max(1) as f64;
            distance_px += step;
            speeds_mps.push(calib.px_per_frame_to_mps(step / gap));
        }

        let count = speeds_mps.len() as f64;
        let mean = speeds_mps.iter().sum::<f64>() / count;
        let max = speeds_mps.iter().copied().fold(0.0, f64::max);
        let variance = speeds_mps.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
        let std = variance.sqrt();

        let avg_velocity_kmh = mean * 3.6;
        let distance_m = calib.px_to_m(distance_px);
        let motion_consistency = std < cfg.consistency_ratio * mean;
        let duration_s = (frames[n - 1] - frames[0]) as f64 / calib.fps;

        let verdict = if n < cfg.min_points_for_verdict {
            MotionVerdict::InsufficientData
        } else if avg_velocity_kmh + THRESHOLD_EPSILON >= cfg.min_velocity_kmh
            && distance_m + THRESHOLD_EPSILON >= cfg.min_distance_m
            && motion_consistency
        {
            MotionVerdict::Valid
        } else {
            MotionVerdict::Invalid
        };

        MotionReport {
            points: n,
            avg_velocity_kmh,
            max_velocity_kmh: max * 3.6,
            velocity_std_kmh: std * 3.6,
            distance_m,
            duration_s,
            motion_consistency,
            verdict,
        }
    }
}
