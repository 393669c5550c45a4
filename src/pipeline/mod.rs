// src/pipeline/mod.rs

pub mod session;
pub mod stats;
pub mod streams;

pub use session::{BallTrackingSession, FrameInfo, FrameOutput, ReportedBall};
pub use stats::{tracking_statistics, MetricsSummary, PipelineMetrics};
pub use streams::{run_stream, run_streams, CancellationFlag, FrameStream, StreamJob, StreamReport};
