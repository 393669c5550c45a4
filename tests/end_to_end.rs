// tests/end_to_end.rs
//
// Full pipeline on synthetic footage: pixels in, speed/distance/verdict out.

mod common;

use approx::assert_abs_diff_eq;
use common::{blank_frame, linear_delivery};
use lbw_vision::analysis::MotionVerdict;
use lbw_vision::config::ReviewConfig;
use lbw_vision::{BallTrackingSession, Config, Decision, LineZone};

fn config() -> Config {
    let mut cfg = Config::default();
    cfg.segmentation.roi_percentage = 1.0;
    cfg.calibration.pixels_to_meters = Some(0.03);
    cfg
}

#[test]
fn test_one_second_delivery_is_a_valid_ball() {
    // 30 intervals over one second: 18 px/frame
    let frames = linear_delivery(31, 640, 480, (50, 240), (590, 240), 30.0);
    let mut session = BallTrackingSession::new(&config());

    for frame in &frames {
        let out = session.process_frame(frame).unwrap();
        let ball = out.ball.expect("ball visible in every frame");
        assert_eq!(ball.track_id, 1);
        assert!(!ball.coasting);
        assert_eq!(out.strategy, Some("enhanced"));
    }

    assert_eq!(session.tracker().tracks().len(), 1);
    let track = session.primary_track().unwrap();
    assert_eq!(track.len(), 31);
    assert!(track.frames.windows(2).all(|w| w[1] == w[0] + 1));

    let report = session.primary_report().unwrap().unwrap();
    assert_eq!(report.verdict, MotionVerdict::Valid);
    assert!(report.is_valid_cricket_ball());
    assert!(report.motion_consistency);

    let stats = session.statistics().unwrap();
    assert!(stats.average_velocity_kmh > 55.0 && stats.average_velocity_kmh < 62.0);
    assert_abs_diff_eq!(stats.average_velocity_kmh, 58.32, epsilon = 0.5);
    assert_abs_diff_eq!(stats.total_distance_m, 16.2, epsilon = 0.2);
    assert_abs_diff_eq!(stats.tracking_duration_s, 1.0, epsilon = 1e-9);
    assert_eq!(stats.detection_rate, 1.0);
}

#[test]
fn test_thirty_frame_second_of_play() {
    // 30 frames spanning one second of play at 30 fps, 540 px of travel:
    // 16.2 m, i.e. 58.3 km/h over the whole second. The headline speed is
    // the mean of the 29 per-step speeds: 540/29 px/frame → 60.3 km/h.
    let frames = linear_delivery(30, 640, 480, (50, 240), (590, 240), 30.0);
    let mut session = BallTrackingSession::new(&config());
    for frame in &frames {
        session.process_frame(frame).unwrap();
    }

    let report = session.primary_report().unwrap().unwrap();
    assert_eq!(report.points, 30);
    assert_eq!(report.verdict, MotionVerdict::Valid);

    let stats = session.statistics().unwrap();
    assert_abs_diff_eq!(stats.total_distance_m, 16.2, epsilon = 0.2);
    let per_step_kmh = 540.0 / 29.0 * 0.03 * 30.0 * 3.6;
    assert_abs_diff_eq!(stats.average_velocity_kmh, per_step_kmh, epsilon = 0.5);
    // Within 2.5 km/h of distance over frames/fps
    let over_clip_kmh = stats.total_distance_m / (30.0 / 30.0) * 3.6;
    assert_abs_diff_eq!(over_clip_kmh, 58.32, epsilon = 0.75);
    assert!((stats.average_velocity_kmh - 58.0).abs() < 2.5);
    assert_abs_diff_eq!(stats.tracking_duration_s, 29.0 / 30.0, epsilon = 1e-9);
}

#[test]
fn test_slow_object_is_rejected() {
    // 3 px/frame: under 10 km/h
    let frames = linear_delivery(31, 640, 480, (200, 240), (290, 240), 30.0);
    let mut session = BallTrackingSession::new(&config());
    for frame in &frames {
        session.process_frame(frame).unwrap();
    }
    let report = session.primary_report().unwrap().unwrap();
    assert_eq!(report.verdict, MotionVerdict::Invalid);
}

#[test]
fn test_empty_footage_reports_zero_detections() {
    let mut session = BallTrackingSession::new(&config());
    for i in 0..10 {
        let out = session.process_frame(&blank_frame(i, 320, 240, 30.0)).unwrap();
        assert!(out.ball.is_none());
        assert!(out.candidates.is_empty());
    }
    let stats = session.statistics().unwrap();
    assert_eq!(stats.detection_rate, 0.0);
    assert_eq!(stats.total_distance_m, 0.0);
    assert!(session.primary_track().is_none());
}

#[test]
fn test_ball_lost_for_a_frame_coasts_then_reacquires() {
    let mut frames = linear_delivery(20, 640, 480, (50, 240), (392, 240), 30.0);
    // Two frames of travel (36 px) still sits inside the 40 px gate
    frames[8] = blank_frame(8, 640, 480, 30.0);

    let mut session = BallTrackingSession::new(&config());
    for (i, frame) in frames.iter().enumerate() {
        let out = session.process_frame(frame).unwrap();
        let ball = out.ball.unwrap();
        assert_eq!(ball.track_id, 1);
        assert_eq!(ball.coasting, i == 8);
    }

    let track = session.primary_track().unwrap();
    assert_eq!(track.len(), 19);
    // Velocity across the gap is per frame, not per detection
    assert_abs_diff_eq!(track.velocities[8].0, 18.0, epsilon = 1e-6);
    let stats = session.statistics().unwrap();
    assert_abs_diff_eq!(stats.detection_rate, 19.0 / 20.0, epsilon = 1e-12);
}

#[test]
fn test_low_full_toss_into_pad_is_out() {
    // Ball 10 px above the bottom edge → 0.3 m high at 0.03 m/px
    let frames = linear_delivery(31, 640, 480, (50, 470), (590, 470), 30.0);
    let mut session = BallTrackingSession::new(&config());
    for frame in &frames {
        session.process_frame(frame).unwrap();
    }

    let states = session.ball_states().unwrap();
    assert_eq!(states.len(), 31);
    let last = *states.last().unwrap();
    assert_abs_diff_eq!(last.position.y, 0.3, epsilon = 0.05);
    assert_eq!(last.position.z, 0.0);

    let review = ReviewConfig {
        pad_position: Some(last.position),
        bat_position: None,
        pitch_line: Some(LineZone::Middle),
    };
    let decision = session.analyze_lbw(&review).unwrap();
    assert!(decision.possible);
    assert_eq!(decision.stump_hit, Some(LineZone::Middle));
    assert!(decision.confidence >= 60.0);
    assert_eq!(decision.decision, Decision::Out);
    assert!(!decision.trajectory.is_empty());
}

#[test]
fn test_side_on_review_needs_a_pitch_line() {
    let frames = linear_delivery(31, 640, 480, (50, 470), (590, 470), 30.0);
    let mut session = BallTrackingSession::new(&config());
    for frame in &frames {
        session.process_frame(frame).unwrap();
    }
    let last = *session.ball_states().unwrap().last().unwrap();

    let review = ReviewConfig {
        pad_position: Some(last.position),
        bat_position: None,
        pitch_line: None,
    };
    let decision = session.analyze_lbw(&review).unwrap();
    assert!(!decision.possible);
    assert_eq!(decision.decision, Decision::NotOut);
    assert_eq!(decision.confidence, 0.0);
    assert_eq!(decision.reason.as_deref(), Some("insufficient data"));
}

#[test]
fn test_review_without_pad_is_insufficient() {
    let frames = linear_delivery(12, 640, 480, (50, 470), (248, 470), 30.0);
    let mut session = BallTrackingSession::new(&config());
    for frame in &frames {
        session.process_frame(frame).unwrap();
    }
    let decision = session.analyze_lbw(&ReviewConfig::default()).unwrap();
    assert!(!decision.possible);
    assert_eq!(decision.confidence, 0.0);
    assert_eq!(decision.reason.as_deref(), Some("insufficient data"));
}
