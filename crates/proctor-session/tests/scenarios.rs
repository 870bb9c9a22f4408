//! End-to-end policy scenarios driven with synthetic clocks

mod common;

use std::time::{Duration, Instant};

use common::*;
use gaze::{
    FaceObservation, GazeConfig, GazeResult, GazeStateMachine, GazeStatus, QualityAssessment,
    ViolationKind,
};
use proctor_session::{
    ExamAttempt, ProctorConfig, ProctoredSession, SessionNotice, SessionPhase,
};
use violation_policy::PolicyOutcome;

fn clear() -> QualityAssessment {
    QualityAssessment {
        is_clear: true,
        sharpness: 400.0,
        brightness: 110.0,
    }
}

fn observation(facing: bool) -> FaceObservation {
    FaceObservation {
        found: true,
        facing,
        ..Default::default()
    }
}

fn triggered(kind: ViolationKind, status: GazeStatus) -> GazeResult {
    GazeResult {
        status,
        is_timeout: false,
        violation_triggered: true,
        violation_type: Some(kind),
        violation_duration: 0.0,
        face_box: None,
    }
}

#[test]
fn test_three_violations_terminate_once() {
    let config = ProctorConfig::default();
    let mut session = proctored_session(config.clone(), empty_room_monitor(&config.gaze));
    let t0 = Instant::now();

    for offset in [0.0, 15.0, 30.0] {
        session.handle_event(gaze_event(
            triggered(ViolationKind::NoFace, GazeStatus::NoFace),
            at(t0, offset),
        ));
    }

    assert_eq!(session.phase(), SessionPhase::Terminated);
    assert_eq!(session.violations(), 3);

    let observer = session.observer();
    assert_eq!(
        observer.warnings,
        vec![
            ("Face not detected".to_string(), 1, 3),
            ("Face not detected".to_string(), 2, 3),
        ]
    );
    assert_eq!(observer.terminations, vec![("Face not detected".to_string(), 3)]);

    let results = session.store().results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].score, 0);
    assert!(results[0].terminated_for_violations);
    assert_eq!(results[0].exam_id, "physics-201");
    assert_eq!(results[0].student_username, "jdoe");

    // Nothing more is recorded or submitted once terminated
    session.handle_event(gaze_event(
        triggered(ViolationKind::NoFace, GazeStatus::NoFace),
        at(t0, 45.0),
    ));
    assert_eq!(session.report_violation("Face not detected", at(t0, 60.0)), None);
    assert_eq!(session.observer().terminations.len(), 1);
    assert_eq!(session.store().results().len(), 1);
    assert!(session.submit(100).is_err());
}

#[test]
fn test_cooldown_suppresses_rapid_violations() {
    let config = ProctorConfig::default();
    let mut session = proctored_session(config.clone(), empty_room_monitor(&config.gaze));
    let t0 = Instant::now();

    for offset in [0.0, 3.0, 6.0, 9.9] {
        session.handle_event(gaze_event(
            triggered(ViolationKind::NotFacing, GazeStatus::NotFacing),
            at(t0, offset),
        ));
    }
    assert_eq!(session.violations(), 1);
    assert_eq!(session.observer().warnings.len(), 1);
    assert_eq!(session.phase(), SessionPhase::Active);
}

#[test]
fn test_continuous_absence_through_state_machine() {
    let config = ProctorConfig::default();
    let mut session = proctored_session(config.clone(), empty_room_monitor(&config.gaze));
    let t0 = Instant::now();
    let mut machine = GazeStateMachine::new(&config.gaze, t0);

    // 10 Hz, face absent for 40 s
    for tick in 0..=400u64 {
        let now = t0 + Duration::from_millis(tick * 100);
        let result = machine.update(&clear(), &FaceObservation::none(), now);
        session.handle_event(gaze_event(result, now));
    }

    assert_eq!(session.phase(), SessionPhase::Terminated);
    assert_eq!(session.observer().warnings.len(), 2);
    assert_eq!(session.observer().terminations.len(), 1);
    assert_eq!(session.store().results().len(), 1);
}

#[test]
fn test_alternating_compliance_never_triggers() {
    let config = ProctorConfig::default();
    let mut session = proctored_session(config.clone(), facing_monitor(&config.gaze));
    let t0 = Instant::now();
    let mut machine = GazeStateMachine::new(&config.gaze, t0);

    // 2 s compliant, 2 s not facing, for two minutes
    for tick in 0..1200u64 {
        let now = t0 + Duration::from_millis(tick * 100);
        let facing = (tick / 20) % 2 == 0;
        let result = machine.update(&clear(), &observation(facing), now);
        assert!(!result.violation_triggered);
        session.handle_event(gaze_event(result, now));
    }

    assert_eq!(session.violations(), 0);
    assert!(session.observer().warnings.is_empty());
    assert_eq!(session.phase(), SessionPhase::Active);
}

#[test]
fn test_absence_resets_long_timeout() {
    let config = ProctorConfig::proctored();
    assert_eq!(config.gaze.timeout_seconds, 15);
    let gaze = GazeConfig {
        violation_threshold_seconds: 1000,
        ..config.gaze.clone()
    };
    let mut session = proctored_session(config.clone(), facing_monitor(&gaze));
    let t0 = Instant::now();
    let mut machine = GazeStateMachine::new(&gaze, t0);

    let mut feed = |secs: f64, face: FaceObservation| {
        let now = at(t0, secs);
        let result = machine.update(&clear(), &face, now);
        let timeout = result.is_timeout;
        session.handle_event(gaze_event(result, now));
        timeout
    };

    assert!(!feed(0.0, observation(false)));
    assert!(!feed(20.0, FaceObservation::none()));
    assert!(!feed(30.0, observation(false)));
    assert!(feed(35.5, observation(false)));
    assert!(!feed(40.0, observation(false)));

    let timeouts: Vec<_> = session
        .observer()
        .notices
        .iter()
        .filter(|n| matches!(n, SessionNotice::LongTimeout { .. }))
        .collect();
    assert_eq!(
        timeouts,
        vec![&SessionNotice::LongTimeout {
            status: GazeStatus::NotFacing
        }]
    );
    assert_eq!(session.violations(), 0);
}

#[test]
fn test_fullscreen_exit_is_a_violation() {
    let config = ProctorConfig::default();
    let mut session = proctored_session(config.clone(), facing_monitor(&config.gaze));
    let t0 = Instant::now();

    // Not expected yet
    assert!(!session.check_fullscreen(false, t0));
    assert_eq!(session.violations(), 0);

    session.set_fullscreen_expected(true);
    assert!(!session.check_fullscreen(true, t0));
    assert!(session.check_fullscreen(false, at(t0, 1.0)));
    assert_eq!(
        session.observer().warnings,
        vec![("Exited fullscreen mode".to_string(), 1, 3)]
    );

    // Shares the cooldown with gaze violations
    session.handle_event(gaze_event(
        triggered(ViolationKind::NotFacing, GazeStatus::NotFacing),
        at(t0, 5.0),
    ));
    assert_eq!(session.violations(), 1);

    assert!(session.check_fullscreen(false, at(t0, 12.0)));
    assert!(!session.check_fullscreen(false, at(t0, 24.0)));
    assert_eq!(session.phase(), SessionPhase::Terminated);
    assert_eq!(
        session.observer().terminations,
        vec![("Exited fullscreen mode".to_string(), 3)]
    );
}

#[test]
fn test_failed_zero_score_still_terminates() {
    let config = ProctorConfig {
        policy: violation_policy::PolicyConfig {
            cooldown_seconds: 0,
            max_violations: 1,
        },
        ..Default::default()
    };
    let mut session = ProctoredSession::new(
        ExamAttempt::new("chem-110", "mlee"),
        gaze::ProctoringCapability::Available(empty_room_monitor(&config.gaze)),
        config,
        FailingStore,
        Recorder::default(),
    );

    let outcome = session.report_violation("Camera image is not clear", Instant::now());
    assert_eq!(outcome, Some(PolicyOutcome::LimitReached { count: 1 }));
    assert_eq!(session.phase(), SessionPhase::Terminated);
    assert_eq!(session.observer().terminations.len(), 1);
    assert!(session.observer().notices.iter().any(|n| matches!(
        n,
        SessionNotice::SubmissionFailed { error } if error.contains("database offline")
    )));
}

#[test]
fn test_failed_submit_can_be_retried() {
    let config = ProctorConfig::default();
    let mut session = ProctoredSession::new(
        ExamAttempt::new("chem-110", "mlee"),
        gaze::ProctoringCapability::Unavailable {
            reason: "cascade missing".to_string(),
        },
        config,
        FailingStore,
        Recorder::default(),
    );

    assert!(session.submit(75).is_err());
    assert_eq!(session.phase(), SessionPhase::Active);
}
