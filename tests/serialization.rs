// tests/serialization.rs
//
// JSON interchange: tracks, ball states and decisions survive a round trip
// unchanged, and the per-frame observation has the agreed shape.

use lbw_vision::analysis::{ImpactAnalyzer, LbwInput, MultiObjectTracker, TrackerConfig};
use lbw_vision::pipeline::{BallTrackingSession, FrameInfo};
use lbw_vision::{
    BallObservation, BallState, CalibrationContext, Candidate, Config, LbwDecision, LineZone, Vec3,
};

fn cand(x: f64, y: f64) -> Candidate {
    Candidate {
        position: (x, y),
        radius: 7.25,
        circularity: 0.934,
        area: 165.1,
        confidence: 0.871,
    }
}

#[test]
fn test_track_round_trip() {
    let mut tracker = MultiObjectTracker::new(TrackerConfig::default());
    tracker.update(0, &[cand(10.1, 20.2)]).unwrap();
    tracker.update(1, &[cand(27.3, 21.7)]).unwrap();
    tracker.update(2, &[]).unwrap();
    tracker.update(3, &[cand(61.9, 24.4)]).unwrap();
    tracker.update(4, &[]).unwrap();

    let track = tracker.tracks()[0].clone();
    let json = serde_json::to_string(&track).unwrap();
    let back: lbw_vision::analysis::Track = serde_json::from_str(&json).unwrap();
    assert_eq!(back, track);
    assert!(json.contains("\"state\":\"coasting\""));
}

#[test]
fn test_ball_state_round_trip() {
    let plain = BallState::new(Vec3::new(1.5, 0.72, -0.031), Vec3::new(33.3, -4.1, 0.27), 0.4666);
    let spun = plain.with_spin(Vec3::new(0.0, 12.5, 80.125));

    for state in [plain, spun] {
        let json = serde_json::to_string(&state).unwrap();
        let back: BallState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    let json = serde_json::to_string(&plain).unwrap();
    assert!(json.contains("\"position\":[1.5,0.72,-0.031]"));
    assert!(!json.contains("spin"));
}

#[test]
fn test_lbw_decision_round_trip() {
    let states: Vec<BallState> = (0..20)
        .map(|i| {
            let t = i as f64 / 30.0;
            BallState::new(Vec3::new(19.0 * t, 0.35, 0.01), Vec3::new(19.0, -0.2, 0.0), t)
                .with_spin(Vec3::new(0.0, 5.0, 0.0))
        })
        .collect();
    let pad = states[19].position;
    let decision = ImpactAnalyzer::default()
        .analyze(&LbwInput::new(&states).with_pad(pad).with_pitch_line(LineZone::Leg));
    assert!(!decision.trajectory.is_empty());

    let json = serde_json::to_string(&decision).unwrap();
    let back: LbwDecision = serde_json::from_str(&json).unwrap();
    assert_eq!(back, decision);

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["lbw"].is_boolean());
    assert_eq!(value["impact"]["type"], "pad");
    assert_eq!(value["pitch_line"], "leg");

    let inconclusive = LbwDecision::inconclusive("Not enough data");
    let json = serde_json::to_string(&inconclusive).unwrap();
    let back: LbwDecision = serde_json::from_str(&json).unwrap();
    assert_eq!(back, inconclusive);
    assert!(json.contains("\"decision\":\"NOT OUT\""));
}

#[test]
fn test_observation_shape() {
    let mut session = BallTrackingSession::with_calibration(
        &Config::default(),
        CalibrationContext::new(0.03, 30.0),
    )
    .unwrap();
    let info = |index| FrameInfo {
        index,
        height: 480,
        fps: 30.0,
    };
    session.process_detections(info(0), vec![cand(100.0, 200.0)]).unwrap();
    let out = session.process_detections(info(1), vec![cand(118.0, 196.0)]).unwrap();
    let observation = out.ball.unwrap().observation;

    let value = serde_json::to_value(observation).unwrap();
    let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "confidence",
            "distance_covered",
            "is_valid_cricket_ball",
            "position",
            "radius",
            "timestamp",
            "velocity",
        ]
    );
    assert_eq!(value["position"], serde_json::json!([118.0, 196.0]));
    assert_eq!(value["velocity"].as_array().unwrap().len(), 3);
    assert_eq!(value["is_valid_cricket_ball"], false);

    let back: BallObservation = serde_json::from_value(value).unwrap();
    assert_eq!(back, observation);
}
