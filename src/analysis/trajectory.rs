// src/analysis/trajectory.rs
//
// Forward flight prediction from a single ball state.
//
// Forces on the ball:
//   drag    F_d = −½ ρ C_d(|v|) A |v| v,   C_d = 0.47·(1 − 0.1·min(|v|/50, 1))
//   Magnus  F_m = C_m(|ω|) (v × ω),        C_m = 0.5·(1 + 0.2·min(|ω|/100, 1))
//   gravity −g on y
//
// Integrated with semi-implicit Euler (velocity first, then position with the
// new velocity). The predictor is a pure function of (state, dt, steps).

use crate::types::{BallState, TrajectoryPoint, Vec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub ball_radius_m: f64,
    pub ball_mass_kg: f64,
    pub air_density: f64,
    pub gravity: f64,
    pub base_drag_coefficient: f64,
    /// Fractional drag reduction reached at `drag_reference_speed`
    pub drag_reduction: f64,
    pub drag_reference_speed: f64,
    pub base_magnus_coefficient: f64,
    /// Fractional Magnus boost reached at `magnus_reference_spin`
    pub magnus_boost: f64,
    pub magnus_reference_spin: f64,
    pub dt: f64,
    pub steps: usize,
    pub enable_drag: bool,
    pub enable_magnus: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            ball_radius_m: 0.0364,
            ball_mass_kg: 0.163,
            air_density: 1.225,
            gravity: 9.81,
            base_drag_coefficient: 0.47,
            drag_reduction: 0.1,
            drag_reference_speed: 50.0,
            base_magnus_coefficient: 0.5,
            magnus_boost: 0.2,
            magnus_reference_spin: 100.0,
            dt: 0.01,
            steps: 50,
            enable_drag: true,
            enable_magnus: true,
        }
    }
}

impl PhysicsConfig {
    /// Gravity only; used for analytic checks.
    pub fn vacuum() -> Self {
        Self {
            enable_drag: false,
            enable_magnus: false,
            ..Self::default()
        }
    }

    pub fn cross_section(&self) -> f64 {
        PI * self.ball_radius_m * self.ball_radius_m
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPrediction {
    pub points: Vec<TrajectoryPoint>,
    /// Integration produced a non-finite value; `points` stops before it
    pub diverged: bool,
    /// Stopped because the ball reached the ground
    pub grounded: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TrajectoryPredictor {
    config: PhysicsConfig,
}

impl TrajectoryPredictor {
    pub fn new(config: PhysicsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn drag_coefficient(&self, speed: f64) -> f64 {
        let c = &self.config;
        let saturation = (speed / c.drag_reference_speed).min(1.0);
        c.base_drag_coefficient * (1.0 - c.drag_reduction * saturation)
    }

    pub fn magnus_coefficient(&self, spin_rate: f64) -> f64 {
        let c = &self.config;
        let saturation = (spin_rate / c.magnus_reference_spin).min(1.0);
        c.base_magnus_coefficient * (1.0 + c.magnus_boost * saturation)
    }

    /// Net acceleration for a given velocity and spin.
    pub fn acceleration(&self, velocity: Vec3, spin: Option<Vec3>) -> Vec3 {
        let c = &self.config;
        let mut force = Vec3::ZERO;

        if c.enable_drag {
            let speed = velocity.norm();
            let k = -0.5 * c.air_density * self.drag_coefficient(speed) * c.cross_section() * speed;
            force = force + velocity * k;
        }

        if c.enable_magnus {
            if let Some(omega) = spin {
                let rate = omega.norm();
                if rate > 0.0 {
                    force = force + velocity.cross(omega) * self.magnus_coefficient(rate);
                }
            }
        }

        let mut accel = force * (1.0 / c.ball_mass_kg);
        accel.y -= c.gravity;
        accel
    }

    /// Predict with the configured step and horizon.
    pub fn predict(&self, state: &BallState) -> TrajectoryPrediction {
        self.predict_with(state, self.config.dt, self.config.steps)
    }

    pub fn predict_with(&self, state: &BallState, dt: f64, steps: usize) -> TrajectoryPrediction {
        let mut points = Vec::with_capacity(steps);
        let mut p = state.position;
        let mut v = state.velocity;
        let mut diverged = false;
        let mut grounded = false;

        for step in 1..=steps {
            let a = self.acceleration(v, state.spin);
            v = v + a * dt;
            p = p + v * dt;

            if !p.is_finite() || !v.is_finite() {
                warn!(
                    "Trajectory diverged at step {} (p={:?}, v={:?}); truncating",
                    step, p, v
                );
                diverged = true;
                break;
            }

            points.push(TrajectoryPoint {
                position: p,
                time: step as f64 * dt,
            });

            if p.y <= 0.0 {
                grounded = true;
                break;
            }
        }

        TrajectoryPrediction {
            points,
            diverged,
            grounded,
        }
    }
}
