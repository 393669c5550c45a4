// src/error.rs
//
// Typed failures for the detection → tracking → LBW pipeline.
//
// Only hard failures live here. "Not enough history" and "physics blew up"
// are ordinary outcomes and are carried as result variants instead
// (MotionVerdict::InsufficientData, TrajectoryPrediction::diverged,
// LbwDecision::reason).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LbwError {
    /// Malformed frame. The tracker is never touched when this is returned.
    #[error("invalid frame {index}: {reason}")]
    InvalidFrame { index: u64, reason: String },

    /// Frames within one stream must arrive in strictly increasing order.
    #[error("frame {index} arrived after frame {last}; frames must be strictly increasing")]
    FrameOutOfOrder { index: u64, last: u64 },

    /// Pixel→meter conversion attempted before the session was calibrated.
    #[error("calibration not set: pixel to meter conversion requested before calibration")]
    CalibrationNotSet,

    /// A session holds exactly one calibration for its lifetime.
    #[error("calibration already set to {existing:.6} m/px, refusing {requested:.6} m/px")]
    CalibrationConflict { existing: f64, requested: f64 },

    /// A stream worker panicked or was torn down before reporting.
    #[error("stream worker failed: {0}")]
    Worker(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, LbwError>;
