// src/analysis/impact.rs
//
// Pad/bat impact detection and the LBW verdict.
//
// Flow for one delivery:
//   1. find the first state within reach of the pad (and of the bat) that is
//      still moving towards it
//   2. bat first → NOT OUT
//   3. predict the flight on from the pad impact
//   4. intersect the prediction with the stump volume
//   5. score tracking quality, combine with pitch line and pad line
//
// Every missing input degrades to an inconclusive decision, never an error.

use super::trajectory::{TrajectoryPrediction, TrajectoryPredictor};
use crate::types::{
    BallState, Decision, ImpactEvent, ImpactKind, ImpactMetrics, LbwDecision, LineZone,
    TrajectoryPoint, Vec3,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    pub pad_threshold_m: f64,
    pub bat_threshold_m: f64,
    pub stump_height_m: f64,
    pub stump_width_m: f64,
    /// Multiplier on stump height for the hit volume
    pub stump_height_tolerance: f64,
    /// Multiplier on stump width for the hit volume
    pub stump_width_tolerance: f64,
    /// |z| below this is "middle"
    pub middle_band_m: f64,
    /// Max lateral offset of the pad impact from the stump line
    pub pad_lateral_tolerance_m: f64,
    /// Down-pitch coordinate of the stumps; `None` checks every predicted point
    pub stump_line_x: Option<f64>,
    pub length_weight: f64,
    pub stability_weight: f64,
    pub consistency_weight: f64,
    /// History length at which length confidence saturates
    pub length_saturation: usize,
    pub min_confidence: f64,
    pub out_confidence: f64,
    pub min_states: usize,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            pad_threshold_m: 0.15,
            bat_threshold_m: 0.10,
            stump_height_m: 0.711,
            stump_width_m: 0.2286,
            stump_height_tolerance: 1.1,
            stump_width_tolerance: 1.2,
            middle_band_m: 0.05,
            pad_lateral_tolerance_m: 0.15,
            stump_line_x: None,
            length_weight: 0.4,
            stability_weight: 0.4,
            consistency_weight: 0.2,
            length_saturation: 20,
            min_confidence: 60.0,
            out_confidence: 70.0,
            min_states: 3,
        }
    }
}

/// Everything one LBW review needs.
#[derive(Debug, Clone, Copy)]
pub struct LbwInput<'a> {
    /// Frame-ordered states of the delivery
    pub ball_states: &'a [BallState],
    pub pad_position: Option<Vec3>,
    pub bat_position: Option<Vec3>,
    /// Where the ball pitched; detected from the bounce when absent
    pub pitch_line: Option<LineZone>,
}

impl<'a> LbwInput<'a> {
    pub fn new(ball_states: &'a [BallState]) -> Self {
        Self {
            ball_states,
            pad_position: None,
            bat_position: None,
            pitch_line: None,
        }
    }

    pub fn with_pad(mut self, pad: Vec3) -> Self {
        self.pad_position = Some(pad);
        self
    }

    pub fn with_bat(mut self, bat: Vec3) -> Self {
        self.bat_position = Some(bat);
        self
    }

    pub fn with_pitch_line(mut self, line: LineZone) -> Self {
        self.pitch_line = Some(line);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImpactAnalyzer {
    config: ImpactConfig,
    predictor: TrajectoryPredictor,
}

impl ImpactAnalyzer {
    pub fn new(config: ImpactConfig, predictor: TrajectoryPredictor) -> Self {
        Self { config, predictor }
    }

    pub fn config(&self) -> &ImpactConfig {
        &self.config
    }

    // ========================================================================
    // IMPACT DETECTION
    // ========================================================================

    /// First state within `threshold` of `target` that is not receding from it.
    pub fn detect_impact(
        &self,
        states: &[BallState],
        target: Vec3,
        threshold: f64,
        kind: ImpactKind,
    ) -> Option<(usize, ImpactEvent)> {
        for (i, state) in states.iter().enumerate() {
            let distance = state.position.distance(target);
            if distance > threshold {
                continue;
            }

            let heading = if i > 0 {
                state.position - states[i - 1].position
            } else {
                state.velocity
            };
            let to_target = target - state.position;
            let angle = approach_angle_deg(heading, to_target);
            if angle >= 90.0 {
                debug!(
                    "{:?} proximity at state {} rejected: ball receding ({:.1}°)",
                    kind, i, angle
                );
                continue;
            }

            let event = ImpactEvent {
                kind,
                position: state.position,
                confidence: (1.0 - distance / threshold).clamp(0.0, 1.0),
                metrics: ImpactMetrics {
                    distance_m: distance,
                    approach_angle_deg: angle,
                    timestamp: state.timestamp,
                },
            };
            return Some((i, event));
        }
        None
    }

    // ========================================================================
    // STUMPS
    // ========================================================================

    /// First predicted point inside the stump volume.
    pub fn stump_intersection(
        &self,
        trajectory: &[TrajectoryPoint],
        direction_x: f64,
    ) -> Option<(usize, LineZone)> {
        let cfg = &self.config;
        let max_height = cfg.stump_height_m * cfg.stump_height_tolerance;
        let max_half_width = cfg.stump_width_m * cfg.stump_width_tolerance;

        trajectory.iter().enumerate().find_map(|(i, pt)| {
            let p = pt.position;
            if let Some(line) = cfg.stump_line_x {
                if (p.x - line) * direction_x.signum() < 0.0 {
                    return None;
                }
            }
            if (0.0..=max_height).contains(&p.y) && p.z.abs() <= max_half_width {
                Some((i, LineZone::classify(p.z, cfg.middle_band_m)))
            } else {
                None
            }
        })
    }

    /// Stump event for the predicted point at `hit`. The approach angle is
    /// measured against the down-pitch axis.
    fn stump_event(
        &self,
        trajectory: &[TrajectoryPoint],
        hit: usize,
        from: &BallState,
        confidence: f64,
    ) -> Option<ImpactEvent> {
        let point = trajectory.get(hit)?;
        let previous = match hit {
            0 => from.position,
            _ => trajectory[hit - 1].position,
        };
        let axis = Vec3::new(from.velocity.x.signum(), 0.0, 0.0);
        Some(ImpactEvent {
            kind: ImpactKind::Stump,
            position: point.position,
            confidence: confidence / 100.0,
            metrics: ImpactMetrics {
                distance_m: point.position.distance(from.position),
                approach_angle_deg: approach_angle_deg(point.position - previous, axis),
                timestamp: from.timestamp + point.time,
            },
        })
    }

    /// Lateral zone of the bounce: first point where vertical velocity turns
    /// from negative to non-negative, else the lowest state.
    ///
    /// `None` when the states carry no lateral information at all (a single
    /// side-on camera reports z = 0 throughout).
    pub fn detect_pitch_line(&self, states: &[BallState]) -> Option<LineZone> {
        if !has_lateral_measurement(states) {
            debug!("No lateral movement in {} states; pitch line unknown", states.len());
            return None;
        }
        let bounce = states
            .windows(2)
            .position(|w| w[0].velocity.y < 0.0 && w[1].velocity.y >= 0.0)
            .map(|i| i + 1)
            .or_else(|| {
                states
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.position.y.total_cmp(&b.1.position.y))
                    .map(|(i, _)| i)
            })?;
        Some(LineZone::classify(
            states[bounce].position.z,
            self.config.middle_band_m,
        ))
    }

    // ========================================================================
    // CONFIDENCE
    // ========================================================================

    /// Tracking-quality score in [0, 100]; under `min_confidence` becomes 0.
    pub fn confidence(&self, states: &[BallState]) -> f64 {
        let cfg = &self.config;
        if states.len() < 2 {
            return 0.0;
        }

        let length = (states.len() as f64 / cfg.length_saturation.max(1) as f64).min(1.0);
        let stability = path_stability(states);
        let consistency = position_consistency(states);

        let raw = 100.0
            * (cfg.length_weight * length
                + cfg.stability_weight * stability
                + cfg.consistency_weight * consistency);
        let score = raw.clamp(0.0, 100.0);

        if score < cfg.min_confidence {
            0.0
        } else {
            score
        }
    }

    // ========================================================================
    // DECISION
    // ========================================================================

    pub fn analyze(&self, input: &LbwInput<'_>) -> LbwDecision {
        let cfg = &self.config;
        let states = input.ball_states;

        if states.len() < cfg.min_states {
            debug!("LBW review skipped: {} ball states", states.len());
            return LbwDecision::inconclusive("Not enough data");
        }
        let Some(pad) = input.pad_position else {
            warn!("LBW review without a pad position");
            return LbwDecision::inconclusive("insufficient data");
        };

        let pad_hit = self.detect_impact(states, pad, cfg.pad_threshold_m, ImpactKind::Pad);
        let bat_hit = input
            .bat_position
            .and_then(|bat| self.detect_impact(states, bat, cfg.bat_threshold_m, ImpactKind::Bat));

        if let Some((bat_idx, bat_event)) = bat_hit {
            let bat_first = match &pad_hit {
                None => true,
                Some((pad_idx, pad_event)) => {
                    bat_idx < *pad_idx
                        || (bat_idx == *pad_idx
                            && bat_event.metrics.distance_m < pad_event.metrics.distance_m)
                }
            };
            if bat_first {
                info!("🏏 Ball hit bat before pad at t={:.3}s", bat_event.metrics.timestamp);
                let mut decision = LbwDecision::inconclusive("ball hit bat");
                decision.impact = Some(bat_event);
                return decision;
            }
        }

        let Some((impact_idx, impact)) = pad_hit else {
            debug!("No pad impact in {} states", states.len());
            return LbwDecision::inconclusive("no pad impact");
        };

        let impact_state = &states[impact_idx];
        let TrajectoryPrediction {
            points: trajectory,
            diverged,
            ..
        } = self.predictor.predict(impact_state);

        let confidence = if diverged {
            warn!("Prediction diverged after pad impact; confidence forced to 0");
            0.0
        } else {
            self.confidence(&states[..=impact_idx])
        };

        let stump = self.stump_intersection(&trajectory, impact_state.velocity.x);
        let stump_hit = stump.map(|(_, zone)| zone);
        let stump_impact =
            stump.and_then(|(i, _)| self.stump_event(&trajectory, i, impact_state, confidence));

        let Some(pitch_line) = input
            .pitch_line
            .or_else(|| self.detect_pitch_line(&states[..=impact_idx]))
        else {
            warn!("LBW review without a pitch line and no lateral tracking");
            let mut decision = LbwDecision::inconclusive("insufficient data");
            decision.impact = Some(impact);
            return decision;
        };
        let pitch_line = Some(pitch_line);

        let in_line = pad.z.abs() <= cfg.pad_lateral_tolerance_m;
        let pitched_ok = matches!(pitch_line, Some(LineZone::Middle | LineZone::Leg));

        let possible =
            stump_hit.is_some() && pitched_ok && in_line && confidence >= cfg.min_confidence;

        let (decision, reason) = if possible {
            let label = if confidence > cfg.out_confidence {
                Decision::Out
            } else {
                Decision::UmpiresCall
            };
            (label, None)
        } else {
            let why = if stump_hit.is_none() {
                "missing stumps"
            } else if !pitched_ok {
                "pitched outside the line"
            } else if !in_line {
                "impact outside the line"
            } else {
                "low confidence"
            };
            (Decision::NotOut, Some(why.to_string()))
        };

        info!(
            "⚖️ LBW: {} (confidence {:.1}, stumps {:?}, pitched {:?})",
            decision.as_str(),
            confidence,
            stump_hit.map(|z| z.as_str()),
            pitch_line.map(|z| z.as_str())
        );

        LbwDecision {
            possible,
            decision,
            confidence,
            stump_hit,
            pitch_line,
            impact: Some(impact),
            stump_impact,
            trajectory,
            reason,
        }
    }
}

/// Angle between two vectors in degrees; 0 when either is zero.
fn approach_angle_deg(a: Vec3, b: Vec3) -> f64 {
    let denom = a.norm() * b.norm();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

fn has_lateral_measurement(states: &[BallState]) -> bool {
    states
        .iter()
        .any(|s| s.position.z.abs() > f64::EPSILON || s.velocity.z.abs() > f64::EPSILON)
}

/// 1 − mean perpendicular deviation from the endpoint chord, relative to the
/// chord length.
fn path_stability(states: &[BallState]) -> f64 {
    let (Some(first), Some(last)) = (states.first(), states.last()) else {
        return 0.0;
    };
    let start = first.position;
    let chord = last.position - start;
    let chord_len = chord.norm();
    if chord_len <= f64::EPSILON {
        return 0.0;
    }

    let mean_dev = states
        .iter()
        .map(|s| (s.position - start).cross(chord).norm() / chord_len)
        .sum::<f64>()
        / states.len() as f64;

    (1.0 - mean_dev / chord_len).clamp(0.0, 1.0)
}

/// 1 / (1 + variance of step lengths in m²).
fn position_consistency(states: &[BallState]) -> f64 {
    let steps: Vec<f64> = states
        .windows(2)
        .map(|w| w[1].position.distance(w[0].position))
        .collect();
    if steps.is_empty() {
        return 0.0;
    }
    let n = steps.len() as f64;
    let mean = steps.iter().sum::<f64>() / n;
    let variance = steps.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    1.0 / (1.0 + variance)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straight delivery along +x at a fixed height and line.
    fn delivery(n: usize, y: f64, z: f64) -> Vec<BallState> {
        let dt = 1.0 / 30.0;
        let vx = 20.0;
        (0..n)
            .map(|i| {
                let t = i as f64 * dt;
                BallState::new(Vec3::new(vx * t, y, z), Vec3::new(vx, 0.0, 0.0), t)
            })
            .collect()
    }

    #[test]
    fn test_not_enough_states() {
        let states = delivery(2, 0.3, 0.0);
        let out = ImpactAnalyzer::default().analyze(&LbwInput::new(&states).with_pad(Vec3::ZERO));
        assert!(!out.possible);
        assert_eq!(out.confidence, 0.0);
        assert_eq!(out.reason.as_deref(), Some("Not enough data"));
    }

    #[test]
    fn test_missing_pad_is_insufficient_data() {
        let states = delivery(10, 0.3, 0.0);
        let out = ImpactAnalyzer::default().analyze(&LbwInput::new(&states));
        assert!(!out.possible);
        assert_eq!(out.decision, Decision::NotOut);
        assert_eq!(out.reason.as_deref(), Some("insufficient data"));
    }

    #[test]
    fn test_middle_stump_out() {
        let states = delivery(20, 0.3, 0.0);
        let pad = states[19].position;
        let input = LbwInput::new(&states)
            .with_pad(pad)
            .with_pitch_line(LineZone::Middle);
        let out = ImpactAnalyzer::default().analyze(&input);

        assert_eq!(out.stump_hit, Some(LineZone::Middle));
        assert!(out.possible);
        assert!(out.confidence >= 60.0);
        assert_eq!(out.decision, Decision::Out);
        assert_eq!(out.impact.map(|e| e.kind), Some(ImpactKind::Pad));
        assert!(!out.trajectory.is_empty());

        let stump = out.stump_impact.unwrap();
        assert_eq!(stump.kind, ImpactKind::Stump);
        assert_eq!(stump.position, out.trajectory[0].position);
        assert!(stump.metrics.timestamp > pad.x / 20.0);
        assert!(stump.metrics.approach_angle_deg < 5.0);
        assert!((stump.confidence - out.confidence / 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_pitched_outside_off_is_not_out() {
        let states = delivery(20, 0.3, 0.0);
        let input = LbwInput::new(&states)
            .with_pad(states[19].position)
            .with_pitch_line(LineZone::Off);
        let out = ImpactAnalyzer::default().analyze(&input);
        assert_eq!(out.stump_hit, Some(LineZone::Middle));
        assert!(!out.possible);
        assert_eq!(out.decision, Decision::NotOut);
    }

    #[test]
    fn test_ball_over_the_stumps_misses() {
        let states = delivery(20, 2.5, 0.0);
        let input = LbwInput::new(&states)
            .with_pad(states[19].position)
            .with_pitch_line(LineZone::Middle);
        let out = ImpactAnalyzer::default().analyze(&input);
        assert_eq!(out.stump_hit, None);
        assert_eq!(out.stump_impact, None);
        assert_eq!(out.decision, Decision::NotOut);
        assert_eq!(out.reason.as_deref(), Some("missing stumps"));
    }

    #[test]
    fn test_short_history_gives_umpires_call_or_zero() {
        // 12 states: length 0.6 → 40·0.6 + 40 + 20 = 84
        let states = delivery(12, 0.3, 0.0);
        let analyzer = ImpactAnalyzer::default();
        let c = analyzer.confidence(&states);
        assert!((c - 84.0).abs() < 1e-6);

        // 3 states: 40·0.15 + 60 = 66 → umpire's call band
        let states = delivery(3, 0.3, 0.0);
        let input = LbwInput::new(&states)
            .with_pad(states[2].position)
            .with_pitch_line(LineZone::Leg);
        let out = analyzer.analyze(&input);
        assert!(out.possible);
        assert_eq!(out.decision, Decision::UmpiresCall);
    }

    #[test]
    fn test_low_confidence_forced_to_zero() {
        let cfg = ImpactConfig {
            stability_weight: 0.0,
            consistency_weight: 0.0,
            length_weight: 1.0,
            ..ImpactConfig::default()
        };
        let analyzer = ImpactAnalyzer::new(cfg, TrajectoryPredictor::default());
        // 5/20 → 25, under the floor
        assert_eq!(analyzer.confidence(&delivery(5, 0.3, 0.0)), 0.0);
    }

    #[test]
    fn test_bat_first_is_not_out() {
        let states = delivery(20, 0.3, 0.0);
        let bat = states[15].position;
        let pad = states[19].position;
        let input = LbwInput::new(&states)
            .with_pad(pad)
            .with_bat(bat)
            .with_pitch_line(LineZone::Middle);
        let out = ImpactAnalyzer::default().analyze(&input);
        assert!(!out.possible);
        assert_eq!(out.decision, Decision::NotOut);
        assert_eq!(out.reason.as_deref(), Some("ball hit bat"));
        assert_eq!(out.impact.map(|e| e.kind), Some(ImpactKind::Bat));
    }

    #[test]
    fn test_receding_ball_is_not_an_impact() {
        let states = delivery(10, 0.3, 0.0);
        // Just behind the ball's start, ball moves away from it
        let target = Vec3::new(-0.05, 0.3, 0.0);
        let analyzer = ImpactAnalyzer::default();
        assert!(analyzer
            .detect_impact(&states[1..], target, 0.8, ImpactKind::Pad)
            .is_none());
        // Same point ahead of the ball is accepted
        let ahead = Vec3::new(states[5].position.x + 0.05, 0.3, 0.0);
        let (idx, event) = analyzer
            .detect_impact(&states, ahead, 0.15, ImpactKind::Pad)
            .unwrap();
        assert_eq!(idx, 5);
        assert!(event.metrics.approach_angle_deg < 1.0);
    }

    #[test]
    fn test_pitch_line_from_bounce() {
        let mut states = Vec::new();
        for i in 0..10 {
            let t = i as f64 / 30.0;
            // Falls until state 5, then climbs; drifts to leg
            let vy = if i < 5 { -3.0 } else { 2.0 };
            let y = if i < 5 { 1.5 - 0.1 * i as f64 } else { 1.0 + 0.07 * (i - 5) as f64 };
            states.push(BallState::new(
                Vec3::new(20.0 * t, y, -0.02 * i as f64),
                Vec3::new(20.0, vy, -0.6),
                t,
            ));
        }
        // Bounce at state 5: z = -0.10
        assert_eq!(
            ImpactAnalyzer::default().detect_pitch_line(&states),
            Some(LineZone::Leg)
        );
    }

    #[test]
    fn test_side_on_states_without_pitch_line_are_insufficient() {
        let states = delivery(20, 0.3, 0.0);
        let analyzer = ImpactAnalyzer::default();
        assert_eq!(analyzer.detect_pitch_line(&states), None);

        let out = analyzer.analyze(&LbwInput::new(&states).with_pad(states[19].position));
        assert!(!out.possible);
        assert_eq!(out.decision, Decision::NotOut);
        assert_eq!(out.confidence, 0.0);
        assert_eq!(out.pitch_line, None);
        assert_eq!(out.reason.as_deref(), Some("insufficient data"));
        assert_eq!(out.impact.map(|e| e.kind), Some(ImpactKind::Pad));
    }

    #[test]
    fn test_pad_wide_of_the_line_is_not_out() {
        // Ball and pad 0.2 m to the off side: inside the stump volume but
        // beyond the pad tolerance
        let states = delivery(20, 0.3, 0.2);
        let input = LbwInput::new(&states)
            .with_pad(states[19].position)
            .with_pitch_line(LineZone::Middle);
        let out = ImpactAnalyzer::default().analyze(&input);
        assert_eq!(out.stump_hit, Some(LineZone::Off));
        assert!(!out.possible);
        assert_eq!(out.reason.as_deref(), Some("impact outside the line"));
    }

    #[test]
    fn test_diverging_prediction_forces_zero_confidence() {
        let mut states = delivery(20, 0.3, 0.0);
        // Drag on this speed overflows on the first step
        states[19].velocity = Vec3::new(1e200, 0.0, 0.0);
        let input = LbwInput::new(&states)
            .with_pad(states[19].position)
            .with_pitch_line(LineZone::Middle);
        let out = ImpactAnalyzer::default().analyze(&input);
        assert_eq!(out.confidence, 0.0);
        assert!(!out.possible);
        assert_eq!(out.decision, Decision::NotOut);
        assert!(out.trajectory.is_empty());
    }

    #[test]
    fn test_stump_line_filters_early_points() {
        let cfg = ImpactConfig {
            stump_line_x: Some(5.0),
            ..ImpactConfig::default()
        };
        let analyzer = ImpactAnalyzer::new(cfg, TrajectoryPredictor::default());
        let pts: Vec<TrajectoryPoint> = (0..10)
            .map(|i| TrajectoryPoint {
                position: Vec3::new(i as f64, 0.3, if i < 5 { 0.0 } else { 0.1 }),
                time: i as f64 * 0.01,
            })
            .collect();
        assert_eq!(analyzer.stump_intersection(&pts, 1.0), Some((5, LineZone::Off)));
        assert_eq!(
            ImpactAnalyzer::default().stump_intersection(&pts, 1.0),
            Some((0, LineZone::Middle))
        );
    }
}
