// src/types.rs
//
// Shared data model for the ball pipeline.
//
// Coordinate conventions (meters):
//   x: down the pitch, bowler towards batter
//   y: height above the ground (gravity acts on -y)
//   z: lateral, off side positive, leg side negative
//
// Pixel positions are (x, y) image coordinates with y growing downwards.

use crate::error::{LbwError, Result};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

// ============================================================================
// FRAMES
// ============================================================================

/// One decoded video frame. `data` is packed BGR, row-major, 3 bytes/pixel.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Seconds since the start of the stream
    pub timestamp: f64,
    pub fps: f64,
}

impl Frame {
    pub fn new(index: u64, width: u32, height: u32, data: Vec<u8>, fps: f64) -> Self {
        let timestamp = if fps > 0.0 { index as f64 / fps } else { 0.0 };
        Self {
            index,
            width,
            height,
            data,
            timestamp,
            fps,
        }
    }

    /// Reject anything the detectors cannot safely index into.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| LbwError::InvalidFrame {
            index: self.index,
            reason,
        };

        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!(
                "zero dimension {}x{}",
                self.width, self.height
            )));
        }
        let expected = self.width as usize * self.height as usize * 3;
        if self.data.len() != expected {
            return Err(invalid(format!(
                "buffer holds {} bytes, {}x{} BGR needs {}",
                self.data.len(),
                self.width,
                self.height,
                expected
            )));
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(invalid(format!("frame rate {} is not positive", self.fps)));
        }
        Ok(())
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }
}

// ============================================================================
// DETECTIONS
// ============================================================================

/// A roughly spherical blob found in a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Center in pixels
    pub position: (f64, f64),
    pub radius: f64,
    pub circularity: f64,
    pub area: f64,
    pub confidence: f64,
}

impl Candidate {
    pub fn distance_to(&self, p: (f64, f64)) -> f64 {
        ((self.position.0 - p.0).powi(2) + (self.position.1 - p.1).powi(2)).sqrt()
    }
}

// ============================================================================
// 3D STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm(&self) -> f64 {
        self.dot(*self).sqrt()
    }

    pub fn distance(&self, other: Vec3) -> f64 {
        (*self - other).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, k: f64) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

/// Physical ball state in meters / meters per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Angular velocity (rad/s); `None` means no Magnus contribution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin: Option<Vec3>,
    pub timestamp: f64,
}

impl BallState {
    pub fn new(position: Vec3, velocity: Vec3, timestamp: f64) -> Self {
        Self {
            position,
            velocity,
            spin: None,
            timestamp,
        }
    }

    pub fn with_spin(mut self, spin: Vec3) -> Self {
        self.spin = Some(spin);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub position: Vec3,
    /// Seconds after the state the prediction started from
    pub time: f64,
}

// ============================================================================
// IMPACT / DECISION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactKind {
    Pad,
    Bat,
    Stump,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactMetrics {
    pub distance_m: f64,
    /// Angle between the ball's recent displacement and the ball→object vector
    pub approach_angle_deg: f64,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactEvent {
    #[serde(rename = "type")]
    pub kind: ImpactKind,
    pub position: Vec3,
    pub confidence: f64,
    pub metrics: ImpactMetrics,
}

/// Lateral band relative to the stumps, used for both the pitching point
/// and the stump that would have been hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineZone {
    Off,
    Middle,
    Leg,
}

impl LineZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineZone::Off => "off",
            LineZone::Middle => "middle",
            LineZone::Leg => "leg",
        }
    }

    pub fn classify(z: f64, middle_band: f64) -> Self {
        if z.abs() < middle_band {
            LineZone::Middle
        } else if z > 0.0 {
            LineZone::Off
        } else {
            LineZone::Leg
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "OUT")]
    Out,
    #[serde(rename = "NOT OUT")]
    NotOut,
    #[serde(rename = "UMPIRE'S CALL")]
    UmpiresCall,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Out => "OUT",
            Decision::NotOut => "NOT OUT",
            Decision::UmpiresCall => "UMPIRE'S CALL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LbwDecision {
    #[serde(rename = "lbw")]
    pub possible: bool,
    pub decision: Decision,
    /// 0–100; anything under the minimum is reported as 0
    pub confidence: f64,
    pub stump_hit: Option<LineZone>,
    #[serde(default)]
    pub pitch_line: Option<LineZone>,
    #[serde(default)]
    pub impact: Option<ImpactEvent>,
    /// Where the predicted flight meets the stumps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stump_impact: Option<ImpactEvent>,
    #[serde(default)]
    pub trajectory: Vec<TrajectoryPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LbwDecision {
    /// Non-committal answer used whenever the analysis cannot run.
    pub fn inconclusive(reason: &str) -> Self {
        Self {
            possible: false,
            decision: Decision::NotOut,
            confidence: 0.0,
            stump_hit: None,
            pitch_line: None,
            impact: None,
            stump_impact: None,
            trajectory: Vec::new(),
            reason: Some(reason.to_string()),
        }
    }
}

// ============================================================================
// OUTPUT CONTRACT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackingStatistics {
    pub total_distance_m: f64,
    pub average_velocity_kmh: f64,
    pub max_velocity_kmh: f64,
    pub tracking_duration_s: f64,
    /// Fraction of processed frames in which the ball was detected
    pub detection_rate: f64,
}

/// Interchange shape for one reported ball position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallObservation {
    pub position: [f64; 2],
    pub radius: f64,
    pub confidence: f64,
    pub velocity: [f64; 3],
    pub timestamp: f64,
    pub distance_covered: f64,
    pub is_valid_cricket_ball: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_validation_rejects_short_buffer() {
        let frame = Frame::new(3, 4, 4, vec![0u8; 10], 30.0);
        assert!(matches!(
            frame.validate(),
            Err(LbwError::InvalidFrame { index: 3, .. })
        ));
    }

    #[test]
    fn test_frame_validation_rejects_bad_fps() {
        let frame = Frame::new(0, 2, 2, vec![0u8; 12], 0.0);
        assert!(frame.validate().is_err());
        let frame = Frame::new(0, 2, 2, vec![0u8; 12], f64::NAN);
        assert!(frame.validate().is_err());
        let frame = Frame::new(0, 2, 2, vec![0u8; 12], 25.0);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_vec3_cross_is_right_handed() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(y), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_line_zone_classification() {
        assert_eq!(LineZone::classify(0.01, 0.05), LineZone::Middle);
        assert_eq!(LineZone::classify(0.10, 0.05), LineZone::Off);
        assert_eq!(LineZone::classify(-0.10, 0.05), LineZone::Leg);
    }

    #[test]
    fn test_decision_labels_serialize_as_broadcast_strings() {
        let json = serde_json::to_string(&Decision::UmpiresCall).unwrap();
        assert_eq!(json, "\"UMPIRE'S CALL\"");
        let json = serde_json::to_string(&Decision::NotOut).unwrap();
        assert_eq!(json, "\"NOT OUT\"");
    }

    #[test]
    fn test_vec3_serializes_as_array() {
        let json = serde_json::to_string(&Vec3::new(1.0, 2.5, -3.0)).unwrap();
        assert_eq!(json, "[1.0,2.5,-3.0]");
    }
}
