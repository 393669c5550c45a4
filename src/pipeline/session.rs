// src/pipeline/session.rs
//
// One video stream, start to finish.
//
// The session owns everything that carries state across frames (tracker,
// calibration, archive of finished tracks) and is passed around explicitly;
// nothing here is global. Frames must arrive in strictly increasing index
// order, and a rejected frame leaves every piece of state untouched.

use super::stats::{tracking_statistics, PipelineMetrics};
use crate::analysis::impact::{ImpactAnalyzer, LbwInput};
use crate::analysis::motion::{MotionReport, MotionValidator};
use crate::analysis::tracker::{MultiObjectTracker, Track, TrackState, TrackerUpdate};
use crate::analysis::trajectory::TrajectoryPredictor;
use crate::calibration::{CalibrationContext, SessionCalibration};
use crate::config::{Config, ReviewConfig};
use crate::detection::DetectorChain;
use crate::error::{LbwError, Result};
use crate::types::{BallObservation, BallState, Candidate, Frame, LbwDecision, TrackingStatistics};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

/// Frame metadata for candidates that were produced outside the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub index: u64,
    pub height: u32,
    pub fps: f64,
}

impl FrameInfo {
    pub fn of(frame: &Frame) -> Self {
        Self {
            index: frame.index,
            height: frame.height,
            fps: frame.fps,
        }
    }

    pub fn timestamp(&self) -> f64 {
        self.index as f64 / self.fps
    }
}

/// The ball reported for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct ReportedBall {
    pub track_id: u64,
    /// Pixel position; the last known one while coasting
    pub position: (f64, f64),
    pub coasting: bool,
    pub observation: BallObservation,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameOutput {
    pub frame_index: u64,
    pub timestamp: f64,
    pub candidates: Vec<Candidate>,
    /// Detection strategy that produced the candidates
    pub strategy: Option<&'static str>,
    pub ball: Option<ReportedBall>,
}

pub struct BallTrackingSession {
    config: Config,
    detectors: DetectorChain,
    tracker: MultiObjectTracker,
    validator: MotionValidator,
    analyzer: ImpactAnalyzer,
    calibration: SessionCalibration,
    /// Longest pruned tracks, bounded by `tracker.archive_capacity`
    archive: Vec<Track>,
    frame_height: Option<u32>,
    last_index: Option<u64>,
    metrics: PipelineMetrics,
}

impl BallTrackingSession {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            detectors: DetectorChain::from_config(config),
            tracker: MultiObjectTracker::new(config.tracker.clone()),
            validator: MotionValidator::new(config.motion.clone()),
            analyzer: ImpactAnalyzer::new(
                config.impact.clone(),
                TrajectoryPredictor::new(config.physics.clone()),
            ),
            calibration: SessionCalibration::new(),
            archive: Vec::new(),
            frame_height: None,
            last_index: None,
            metrics: PipelineMetrics::new(),
        }
    }

    /// Start with a known calibration instead of deriving one from the first frame.
    pub fn with_calibration(config: &Config, ctx: CalibrationContext) -> Result<Self> {
        let session = Self::new(config);
        session.calibration.init(ctx)?;
        Ok(session)
    }

    pub fn with_detectors(mut self, detectors: DetectorChain) -> Self {
        self.detectors = detectors;
        self
    }

    pub fn calibration(&self) -> Result<&CalibrationContext> {
        self.calibration.get()
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn tracker(&self) -> &MultiObjectTracker {
        &self.tracker
    }

    pub fn archived_tracks(&self) -> &[Track] {
        &self.archive
    }

    // ========================================================================
    // PER-FRAME
    // ========================================================================

    /// Detect and track on one decoded frame.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameOutput> {
        if let Err(e) = frame.validate() {
            self.metrics.inc(&self.metrics.frames_rejected);
            return Err(e);
        }
        let info = FrameInfo::of(frame);
        self.check_order(info.index)?;
        self.ensure_calibrated(&info)?;

        let started = Instant::now();
        let outcome = self.detectors.detect(frame)?;
        self.metrics.set_timing(
            &self.metrics.detection_time_us,
            started.elapsed().as_micros() as u64,
        );
        let preferred = self.detectors.strategies().first().copied();
        if outcome.strategy.is_some() && outcome.strategy != preferred {
            self.metrics.inc(&self.metrics.fallback_detections);
        }

        self.ingest(info, outcome.candidates, outcome.strategy)
    }

    /// Track candidates produced upstream (e.g. by a learned detector).
    pub fn process_detections(
        &mut self,
        info: FrameInfo,
        candidates: Vec<Candidate>,
    ) -> Result<FrameOutput> {
        if !(info.fps.is_finite() && info.fps > 0.0) || info.height == 0 {
            self.metrics.inc(&self.metrics.frames_rejected);
            return Err(LbwError::InvalidFrame {
                index: info.index,
                reason: format!("height {} / fps {} not usable", info.height, info.fps),
            });
        }
        self.check_order(info.index)?;
        self.ensure_calibrated(&info)?;
        self.ingest(info, candidates, Some("external"))
    }

    fn check_order(&self, index: u64) -> Result<()> {
        match self.last_index {
            Some(last) if index <= last => Err(LbwError::FrameOutOfOrder { index, last }),
            _ => Ok(()),
        }
    }

    fn ensure_calibrated(&mut self, info: &FrameInfo) -> Result<()> {
        if !self.calibration.is_set() {
            let ctx =
                CalibrationContext::from_frame(info.height, info.fps, &self.config.calibration);
            self.calibration.init(ctx)?;
        }
        Ok(())
    }

    fn ingest(
        &mut self,
        info: FrameInfo,
        candidates: Vec<Candidate>,
        strategy: Option<&'static str>,
    ) -> Result<FrameOutput> {
        let update = self.tracker.update(info.index, &candidates)?;
        self.last_index = Some(info.index);
        self.frame_height = Some(info.height);

        self.metrics.inc(&self.metrics.frames_processed);
        self.metrics.add(&self.metrics.candidates_found, candidates.len() as u64);
        self.absorb(update);

        let ball = self.select_ball()?;
        if matches!(&ball, Some(b) if !b.coasting) {
            self.metrics.inc(&self.metrics.frames_with_ball);
        }

        debug!(
            "Frame {}: {} candidate(s) via {:?}, ball {:?}",
            info.index,
            candidates.len(),
            strategy,
            ball.as_ref().map(|b| (b.track_id, b.coasting))
        );

        Ok(FrameOutput {
            frame_index: info.index,
            timestamp: info.timestamp(),
            candidates,
            strategy,
            ball,
        })
    }

    fn absorb(&mut self, update: TrackerUpdate) {
        self.metrics.add(&self.metrics.tracks_born, update.born.len() as u64);
        self.metrics.add(&self.metrics.tracks_pruned, update.pruned.len() as u64);
        let min_points = self.config.tracker.archive_min_points;
        self.archive
            .extend(update.pruned.into_iter().filter(|t| t.len() >= min_points));

        let capacity = self.config.tracker.archive_capacity;
        if self.archive.len() > capacity {
            self.archive.sort_by(|a, b| {
                b.len()
                    .cmp(&a.len())
                    .then(b.last_seen_frame.cmp(&a.last_seen_frame))
            });
            let evicted = self.archive.len() - capacity;
            self.archive.truncate(capacity);
            debug!("Archive full: evicted {} short track(s)", evicted);
        }
    }

    /// Longest active track; failing that, the longest coasting one at its
    /// last known position.
    fn select_ball(&self) -> Result<Option<ReportedBall>> {
        let tracks = self.tracker.tracks();
        let active = tracks.iter().filter(|t| t.is_active()).max_by(|a, b| {
            a.len()
                .cmp(&b.len())
                .then(a.last_confidence().total_cmp(&b.last_confidence()))
        });

        let (track, coasting) = match active {
            Some(t) => (t, false),
            None => {
                let coasting = tracks
                    .iter()
                    .filter(|t| matches!(t.state, TrackState::Coasting { .. }))
                    .max_by_key(|t| t.len());
                match coasting {
                    Some(t) => (t, true),
                    None => return Ok(None),
                }
            }
        };

        let observation = self.observe(track)?;
        Ok(Some(ReportedBall {
            track_id: track.id,
            position: track.last_position(),
            coasting,
            observation,
        }))
    }

    /// Interchange view of a track's latest point.
    pub fn observe(&self, track: &Track) -> Result<BallObservation> {
        let calib = self.calibration.get()?;
        let (x, y) = track.last_position();
        let (vx, vy) = track.last_velocity();
        let report = self.validator.validate(track, calib);
        Ok(BallObservation {
            position: [x, y],
            radius: track.last_radius(),
            confidence: track.last_confidence(),
            velocity: [
                calib.px_per_frame_to_mps(vx),
                -calib.px_per_frame_to_mps(vy),
                0.0,
            ],
            timestamp: calib.frame_to_seconds(track.last_seen_frame),
            distance_covered: calib.px_to_m(track.path_length_px()),
            is_valid_cricket_ball: report.is_valid_cricket_ball(),
        })
    }

    // ========================================================================
    // ON REQUEST
    // ========================================================================

    /// The delivery: the longest track seen so far, live or archived.
    pub fn primary_track(&self) -> Option<&Track> {
        self.tracker
            .tracks()
            .iter()
            .chain(self.archive.iter())
            .max_by(|a, b| {
                a.len()
                    .cmp(&b.len())
                    .then(a.last_seen_frame.cmp(&b.last_seen_frame))
            })
    }

    pub fn validate_track(&self, track: &Track) -> Result<MotionReport> {
        let calib = self.calibration.get()?;
        Ok(self.validator.validate(track, calib))
    }

    /// Zero detections is a valid summary, not an error.
    pub fn statistics(&self) -> Result<TrackingStatistics> {
        let report = match self.primary_track() {
            Some(track) => Some(self.validate_track(track)?),
            None => None,
        };
        Ok(tracking_statistics(report.as_ref(), self.metrics.detection_rate()))
    }

    pub fn primary_report(&self) -> Result<Option<MotionReport>> {
        self.primary_track().map(|t| self.validate_track(t)).transpose()
    }

    /// Physical states of the primary track.
    pub fn ball_states(&self) -> Result<Vec<BallState>> {
        let (Some(track), Some(height)) = (self.primary_track(), self.frame_height) else {
            return Ok(Vec::new());
        };
        let calib = self.calibration.get()?;
        Ok(calib.ball_states(track, height))
    }

    /// LBW review of the primary track with externally supplied positions.
    pub fn analyze_lbw(&self, review: &ReviewConfig) -> Result<LbwDecision> {
        let states = self.ball_states()?;
        let input = LbwInput {
            ball_states: &states,
            pad_position: review.pad_position,
            bat_position: review.bat_position,
            pitch_line: review.pitch_line,
        };
        let decision = self.analyzer.analyze(&input);
        info!(
            "Review over {} states: {} ({:.1})",
            states.len(),
            decision.decision.as_str(),
            decision.confidence
        );
        Ok(decision)
    }
}
