// src/analysis/mod.rs
//
// Temporal and physical analysis of the ball.
//
// Signal flow:
//   Candidates → tracker → motion (is it a delivery?)
//                        → calibration::ball_states → impact ─→ trajectory
//                                                            └→ LbwDecision

pub mod impact;
pub mod motion;
pub mod tracker;
pub mod trajectory;

pub use impact::{ImpactAnalyzer, ImpactConfig, LbwInput};
pub use motion::{MotionConfig, MotionReport, MotionValidator, MotionVerdict};
pub use tracker::{MultiObjectTracker, Track, TrackState, TrackerConfig, TrackerUpdate};
pub use trajectory::{PhysicsConfig, TrajectoryPrediction, TrajectoryPredictor};
