// src/analysis/tracker.rs
//
// Nearest-neighbour multi-object tracker for ball candidates.
//
// Design:
//   - Gated greedy matching on pixel distance (sufficient for <20 objects
//     per frame, O(tracks × candidates))
//   - Closest pair wins; unmatched candidates seed new tracks, no merging
//   - Tracks coast on their last known position through short detection
//     gaps (motion blur, occlusion by the batter) and are pruned once the
//     gap exceeds the missing-frame tolerance
//   - Track histories are strictly frame-ordered; a frame index that does
//     not increase is rejected before any state is touched

use crate::error::{LbwError, Result};
use crate::types::Candidate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Max pixel distance between a track's last position and a candidate
    pub gating_distance_px: f64,
    /// Frames a track may go unseen before it is pruned
    pub max_missing_frames: u64,
    /// Pruned tracks shorter than this are not worth keeping for analysis
    pub archive_min_points: usize,
    /// Most pruned tracks kept per session; the longest survive
    pub archive_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            gating_distance_px: 40.0,
            max_missing_frames: 5,
            archive_min_points: 3,
            archive_capacity: 16,
        }
    }
}

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrackState {
    /// Matched in the most recent frame
    Active,
    /// Not matched; reported at its last known position
    Coasting { missing_frames: u64 },
    /// Gap exceeded the tolerance, no longer in the live table
    Pruned,
}

/// One physical object followed across frames.
///
/// `positions`, `velocities`, `frames`, `radii` and `confidences` are
/// parallel arrays in strictly increasing frame order. Velocities are in
/// pixels per frame; the first entry of a new track is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: u64,
    pub positions: Vec<(f64, f64)>,
    pub velocities: Vec<(f64, f64)>,
    pub frames: Vec<u64>,
    pub radii: Vec<f64>,
    pub confidences: Vec<f64>,
    pub last_seen_frame: u64,
    pub state: TrackState,
}

impl Track {
    pub fn born(id: u64, frame: u64, candidate: &Candidate) -> Self {
        Self {
            id,
            positions: vec![candidate.position],
            velocities: vec![(0.0, 0.0)],
            frames: vec![frame],
            radii: vec![candidate.radius],
            confidences: vec![candidate.confidence],
            last_seen_frame: frame,
            state: TrackState::Active,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn last_position(&self) -> (f64, f64) {
        self.positions.last().copied().unwrap_or((0.0, 0.0))
    }

    pub fn last_velocity(&self) -> (f64, f64) {
        self.velocities.last().copied().unwrap_or((0.0, 0.0))
    }

    pub fn last_radius(&self) -> f64 {
        self.radii.last().copied().unwrap_or(0.0)
    }

    pub fn last_confidence(&self) -> f64 {
        self.confidences.last().copied().unwrap_or(0.0)
    }

    pub fn first_frame(&self) -> u64 {
        self.frames.first().copied().unwrap_or(self.last_seen_frame)
    }

    pub fn is_active(&self) -> bool {
        self.state == TrackState::Active
    }

    /// Append a matched detection. Velocity spreads the displacement over
    /// any frames the track coasted through.
    pub fn observe(&mut self, frame: u64, candidate: &Candidate) {
        let (px, py) = self.last_position();
        let gap = frame.saturating_sub(self.last_seen_frame).max(1) as f64;
        let velocity = (
            (candidate.position.0 - px) / gap,
            (candidate.position.1 - py) / gap,
        );

        self.positions.push(candidate.position);
        self.velocities.push(velocity);
        self.frames.push(frame);
        self.radii.push(candidate.radius);
        self.confidences.push(candidate.confidence);
        self.last_seen_frame = frame;
        self.state = TrackState::Active;
    }

    fn mark_missed(&mut self, frame: u64) {
        self.state = TrackState::Coasting {
            missing_frames: frame.saturating_sub(self.last_seen_frame),
        };
    }

    /// Total pixel path length.
    pub fn path_length_px(&self) -> f64 {
        self.positions
            .windows(2)
            .map(|w| ((w[1].0 - w[0].0).powi(2) + (w[1].1 - w[0].1).powi(2)).sqrt())
            .sum()
    }
}

/// What one `update` call did to the track table.
#[derive(Debug, Clone, Default)]
pub struct TrackerUpdate {
    pub frame: u64,
    /// (track id, candidate index)
    pub matched: Vec<(u64, usize)>,
    /// (track id, candidate index)
    pub born: Vec<(u64, usize)>,
    /// Removed tracks, state set to `Pruned`
    pub pruned: Vec<Track>,
}

impl TrackerUpdate {
    /// Track that took the given candidate this frame, matched or newly born.
    pub fn track_for_candidate(&self, candidate_index: usize) -> Option<u64> {
        self.matched
            .iter()
            .chain(self.born.iter())
            .find(|(_, ci)| *ci == candidate_index)
            .map(|(id, _)| *id)
    }
}

// ============================================================================
// MAIN TRACKER
// ============================================================================

pub struct MultiObjectTracker {
    pub config: TrackerConfig,
    tracks: Vec<Track>,
    next_id: u64,
    last_frame: Option<u64>,
}

impl MultiObjectTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::with_capacity(16),
            next_id: 1,
            last_frame: None,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: u64) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    /// Process one frame of candidates.
    pub fn update(&mut self, frame: u64, candidates: &[Candidate]) -> Result<TrackerUpdate> {
        if let Some(last) = self.last_frame {
            if frame <= last {
                return Err(LbwError::FrameOutOfOrder { index: frame, last });
            }
        }
        self.last_frame = Some(frame);

        let mut update = TrackerUpdate {
            frame,
            ..TrackerUpdate::default()
        };

        // ════════════════════════════════════════════════════════════════
        // GATED NEAREST-NEIGHBOUR MATCHING
        // ════════════════════════════════════════════════════════════════
        let gate = self.config.gating_distance_px;
        let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            let last = track.last_position();
            for (ci, cand) in candidates.iter().enumerate() {
                let d = cand.distance_to(last);
                if d <= gate {
                    pairs.push((ti, ci, d));
                }
            }
        }
        pairs.sort_by(|a, b| {
            a.2.partial_cmp(&b.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
                .then(a.1.cmp(&b.1))
        });

        let mut track_taken = vec![false; self.tracks.len()];
        let mut cand_taken = vec![false; candidates.len()];
        for (ti, ci, d) in pairs {
            if track_taken[ti] || cand_taken[ci] {
                continue;
            }
            track_taken[ti] = true;
            cand_taken[ci] = true;
            self.tracks[ti].observe(frame, &candidates[ci]);
            update.matched.push((self.tracks[ti].id, ci));
            debug!("Track {} ← candidate {} ({:.1}px)", self.tracks[ti].id, ci, d);
        }

        // ════════════════════════════════════════════════════════════════
        // UNMATCHED TRACKS → COAST
        // ════════════════════════════════════════════════════════════════
        for (ti, taken) in track_taken.iter().enumerate() {
            if !taken {
                self.tracks[ti].mark_missed(frame);
            }
        }

        // ════════════════════════════════════════════════════════════════
        // UNMATCHED CANDIDATES → NEW TRACKS
        // ════════════════════════════════════════════════════════════════
        for (ci, taken) in cand_taken.iter().enumerate() {
            if *taken {
                continue;
            }
            let cand = &candidates[ci];
            let track = Track::born(self.next_id, frame, cand);
            info!(
                "🆕 Track {} born at ({:.0}, {:.0}) r={:.1} frame {}",
                track.id, cand.position.0, cand.position.1, cand.radius, frame
            );
            update.born.push((track.id, ci));
            self.next_id += 1;
            self.tracks.push(track);
        }

        // ════════════════════════════════════════════════════════════════
        // PRUNE
        // ════════════════════════════════════════════════════════════════
        let tolerance = self.config.max_missing_frames;
        let mut kept = Vec::with_capacity(self.tracks.len());
        for mut track in self.tracks.drain(..) {
            if frame - track.last_seen_frame > tolerance {
                info!(
                    "🗑️  Track {} pruned after {} missing frames ({} points)",
                    track.id,
                    frame - track.last_seen_frame,
                    track.len()
                );
                track.state = TrackState::Pruned;
                update.pruned.push(track);
            } else {
                kept.push(track);
            }
        }
        self.tracks = kept;

        Ok(update)
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
        self.last_frame = None;
    }
}
