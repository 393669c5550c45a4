// src/pipeline/streams.rs
//
// Independent streams (e.g. several camera feeds) on separate workers.
//
// Each stream gets its own session: its own tracker and its own calibration.
// Nothing is shared between workers except the read-only config and the
// cancellation flag. Cancellation is checked between frames, so the frame in
// flight always finishes.

use super::session::BallTrackingSession;
use super::stats::MetricsSummary;
use crate::analysis::motion::MotionReport;
use crate::calibration::CalibrationContext;
use crate::config::Config;
use crate::error::{LbwError, Result};
use crate::types::{Frame, LbwDecision, TrackingStatistics};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub type FrameStream = Box<dyn Iterator<Item = Result<Frame>> + Send>;

pub struct StreamJob {
    pub name: String,
    pub frames: FrameStream,
    /// Fixed calibration; derived from the first frame when `None`
    pub calibration: Option<CalibrationContext>,
}

impl StreamJob {
    pub fn new(name: impl Into<String>, frames: FrameStream) -> Self {
        Self {
            name: name.into(),
            frames,
            calibration: None,
        }
    }

    pub fn with_calibration(mut self, ctx: CalibrationContext) -> Self {
        self.calibration = Some(ctx);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamReport {
    pub name: String,
    pub frames_processed: u64,
    pub frames_failed: u64,
    pub cancelled: bool,
    pub calibration: Option<CalibrationContext>,
    pub primary_track_id: Option<u64>,
    pub statistics: TrackingStatistics,
    pub motion: Option<MotionReport>,
    pub decision: LbwDecision,
    pub metrics: MetricsSummary,
}

/// Run one stream to completion on the current thread.
///
/// Bad frames are logged and skipped. Calibration failures are fatal for the
/// stream: every later conversion would be wrong.
pub fn run_stream(
    job: StreamJob,
    config: &Config,
    cancel: &CancellationFlag,
) -> Result<StreamReport> {
    let StreamJob {
        name,
        mut frames,
        calibration,
    } = job;

    let mut session = match calibration {
        Some(ctx) => BallTrackingSession::with_calibration(config, ctx)?,
        None => BallTrackingSession::new(config),
    };

    info!("▶️  Stream '{}' started", name);
    let mut processed = 0u64;
    let mut failed = 0u64;
    let mut cancelled = false;

    loop {
        if cancel.is_cancelled() {
            info!("⏹️  Stream '{}' cancelled after {} frames", name, processed);
            cancelled = true;
            break;
        }
        let Some(item) = frames.next() else {
            break;
        };

        let result = item.and_then(|frame| session.process_frame(&frame));
        match result {
            Ok(_) => processed += 1,
            Err(e @ (LbwError::CalibrationNotSet | LbwError::CalibrationConflict { .. })) => {
                return Err(e);
            }
            Err(e) => {
                warn!("Stream '{}': skipping frame: {}", name, e);
                failed += 1;
            }
        }
    }

    let decision = session.analyze_lbw(&config.review)?;
    let report = StreamReport {
        frames_processed: processed,
        frames_failed: failed,
        cancelled,
        calibration: session.calibration().ok().copied(),
        primary_track_id: session.primary_track().map(|t| t.id),
        statistics: session.statistics()?,
        motion: session.primary_report()?,
        decision,
        metrics: session.metrics().summary(),
        name,
    };

    info!(
        "✅ Stream '{}': {} frames, {:.1} km/h avg over {:.2} m",
        report.name,
        report.frames_processed,
        report.statistics.average_velocity_kmh,
        report.statistics.total_distance_m
    );
    Ok(report)
}

/// Run every stream on its own blocking worker. Results come back in job
/// order, one per stream; a failed stream does not affect the others.
pub async fn run_streams(
    jobs: Vec<StreamJob>,
    config: Arc<Config>,
    cancel: CancellationFlag,
) -> Vec<(String, Result<StreamReport>)> {
    let mut handles = Vec::with_capacity(jobs.len());
    for job in jobs {
        let name = job.name.clone();
        let config = Arc::clone(&config);
        let cancel = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || run_stream(job, &config, &cancel));
        handles.push((name, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(LbwError::Worker(format!("stream '{}': {}", name, e))),
        };
        results.push((name, result));
    }
    results
}
