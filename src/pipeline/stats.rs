// src/pipeline/stats.rs
//
// Per-session counters and the tracking-statistics summary.
//
// Counters are shared atomics so a supervisor can read them while the
// stream worker is still running.

use crate::analysis::motion::MotionReport;
use crate::types::TrackingStatistics;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub frames_processed: Arc<AtomicU64>,
    pub frames_with_ball: Arc<AtomicU64>,
    pub frames_rejected: Arc<AtomicU64>,
    pub candidates_found: Arc<AtomicU64>,
    pub fallback_detections: Arc<AtomicU64>,
    pub tracks_born: Arc<AtomicU64>,
    pub tracks_pruned: Arc<AtomicU64>,
    pub detection_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            frames_processed: Arc::new(AtomicU64::new(0)),
            frames_with_ball: Arc::new(AtomicU64::new(0)),
            frames_rejected: Arc::new(AtomicU64::new(0)),
            candidates_found: Arc::new(AtomicU64::new(0)),
            fallback_detections: Arc::new(AtomicU64::new(0)),
            tracks_born: Arc::new(AtomicU64::new(0)),
            tracks_pruned: Arc::new(AtomicU64::new(0)),
            detection_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    /// Fraction of processed frames with a detected (not coasting) ball.
    pub fn detection_rate(&self) -> f64 {
        let total = self.frames_processed.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.frames_with_ball.load(Ordering::Relaxed) as f64 / total as f64
    }

    pub fn fps(&self) -> f64 {
        let frames = self.frames_processed.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_with_ball: self.frames_with_ball.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            candidates_found: self.candidates_found.load(Ordering::Relaxed),
            fallback_detections: self.fallback_detections.load(Ordering::Relaxed),
            tracks_born: self.tracks_born.load(Ordering::Relaxed),
            tracks_pruned: self.tracks_pruned.load(Ordering::Relaxed),
            last_detection_us: self.detection_time_us.load(Ordering::Relaxed),
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub frames_processed: u64,
    pub frames_with_ball: u64,
    pub frames_rejected: u64,
    pub candidates_found: u64,
    pub fallback_detections: u64,
    pub tracks_born: u64,
    pub tracks_pruned: u64,
    pub last_detection_us: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}

/// Fold a motion report and a detection rate into the output summary.
/// A report without statistics leaves the motion fields at zero.
pub fn tracking_statistics(
    report: Option<&MotionReport>,
    detection_rate: f64,
) -> TrackingStatistics {
    match report {
        Some(r) if r.has_statistics() => TrackingStatistics {
            total_distance_m: r.distance_m,
            average_velocity_kmh: r.avg_velocity_kmh,
            max_velocity_kmh: r.max_velocity_kmh,
            tracking_duration_s: r.duration_s,
            detection_rate,
        },
        _ => TrackingStatistics {
            detection_rate,
            ..TrackingStatistics::default()
        },
    }
}
