// src/lib.rs
//
// Cricket ball detection, tracking and LBW trajectory prediction.
//
// frame → detection (enhance → segment → shape filter)
//       → analysis::tracker (stateful, per stream)
//       → analysis::motion (is it a delivery?)
//       → analysis::impact + analysis::trajectory → LbwDecision
//
// `pipeline::BallTrackingSession` wires the stages together for one stream.

pub mod analysis;
pub mod calibration;
pub mod config;
pub mod detection;
pub mod error;
pub mod frame_source;
pub mod pipeline;
pub mod types;

pub use calibration::{CalibrationContext, SessionCalibration};
pub use config::Config;
pub use error::{LbwError, Result};
pub use pipeline::{BallTrackingSession, FrameOutput};
pub use types::{
    BallObservation, BallState, Candidate, Decision, Frame, ImpactEvent, ImpactKind, LbwDecision,
    LineZone, TrackingStatistics, TrajectoryPoint, Vec3,
};
