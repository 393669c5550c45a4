// src/config.rs
//
// YAML configuration. Every section defaults to the stock constants, so a
// file only needs to name what it overrides.

use crate::analysis::impact::ImpactConfig;
use crate::analysis::motion::MotionConfig;
use crate::analysis::tracker::TrackerConfig;
use crate::analysis::trajectory::PhysicsConfig;
use crate::calibration::CalibrationConfig;
use crate::detection::{EnhancerConfig, SegmentationConfig, ShapeFilterConfig};
use crate::error::{LbwError, Result};
use crate::types::{LineZone, Vec3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enhancer: EnhancerConfig,
    pub segmentation: SegmentationConfig,
    pub shape: ShapeFilterConfig,
    pub tracker: TrackerConfig,
    pub motion: MotionConfig,
    pub physics: PhysicsConfig,
    pub impact: ImpactConfig,
    pub calibration: CalibrationConfig,
    pub review: ReviewConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,
}

/// Externally supplied positions for the LBW review of a delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub pad_position: Option<Vec3>,
    pub bat_position: Option<Vec3>,
    pub pitch_line: Option<LineZone>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Directory of frame images, or of one sub-directory per stream
    pub input_dir: String,
    pub output_dir: String,
    pub fps: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            input_dir: "frames".to_string(),
            output_dir: "output".to_string(),
            fps: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "lbw_vision=info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&contents)?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(yaml).map_err(|e| LbwError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> { Err(LbwError::Config(msg)) };

        let roi = self.segmentation.roi_percentage;
        if !(roi > 0.0 && roi <= 1.0) {
            return fail(format!("segmentation.roi_percentage {} outside (0, 1]", roi));
        }
        if self.shape.min_radius > self.shape.max_radius {
            return fail(format!(
                "shape.min_radius {} exceeds max_radius {}",
                self.shape.min_radius, self.shape.max_radius
            ));
        }
        if self.shape.circularity_min > self.shape.circularity_max {
            return fail(format!(
                "shape.circularity_min {} exceeds circularity_max {}",
                self.shape.circularity_min, self.shape.circularity_max
            ));
        }
        if self.tracker.gating_distance_px <= 0.0 {
            return fail("tracker.gating_distance_px must be positive".to_string());
        }
        if self.tracker.archive_capacity == 0 {
            return fail("tracker.archive_capacity must be at least 1".to_string());
        }
        if self.motion.min_points_for_stats < 2
            || self.motion.min_points_for_verdict < self.motion.min_points_for_stats
        {
            return fail(format!(
                "motion point minimums {}/{} are inconsistent",
                self.motion.min_points_for_stats, self.motion.min_points_for_verdict
            ));
        }
        if !(self.physics.dt > 0.0) || self.physics.ball_mass_kg <= 0.0 {
            return fail("physics.dt and physics.ball_mass_kg must be positive".to_string());
        }
        if self.impact.min_confidence > self.impact.out_confidence {
            return fail(format!(
                "impact.min_confidence {} exceeds out_confidence {}",
                self.impact.min_confidence, self.impact.out_confidence
            ));
        }
        if let Some(ppm) = self.calibration.pixels_to_meters {
            if !(ppm > 0.0) {
                return fail(format!("calibration.pixels_to_meters {} is not positive", ppm));
            }
        }
        if !(self.calibration.pitch_frame_fraction > 0.0) {
            return fail("calibration.pitch_frame_fraction must be positive".to_string());
        }
        if !(self.video.fps > 0.0) {
            return fail(format!("video.fps {} is not positive", self.video.fps));
        }
        Ok(())
    }
}
