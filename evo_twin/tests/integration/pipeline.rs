//! Integration test: move pipeline with injected collaborators.
//!
//! Validates cancellation → partial execution → contact resolution →
//! learning events → profile persistence across simulator sessions.

use std::sync::Arc;
use std::sync::mpsc;

use evo_twin::dynamics::JsonProfileStore;
use evo_twin::kinematics::registry::cartesian;
use evo_twin::orchestrator::{
    CancelToken, ChannelSink, Collaborators, DangerZonePredictor, ExecutionReport,
    MachineSimulator, MotionExecutor, MotionRequest, StepPhase, TablePlaneDetector,
};
use evo_twin_common::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Executor that stops every move half way.
struct FeedHold;

impl MotionExecutor for FeedHold {
    fn execute(&mut self, request: &MotionRequest<'_>) -> ExecutionReport {
        let mut reached = request.from.clone();
        for (dst, (a, b)) in reached.iter_mut().zip(request.from.iter().zip(request.to.iter())) {
            *dst = a + (b - a) * 0.5;
        }
        ExecutionReport {
            reached,
            fraction: 0.5,
            duration: request.predicted_time * 0.5,
            reason: Some("feed hold".to_string()),
        }
    }
}

/// Predictor that flags every configuration with Z below zero.
struct LowZ;

impl DangerZonePredictor for LowZ {
    fn predict(&self, _machine_id: &str, joints: &JointValues) -> DangerPrediction {
        let low = joints.get(2).is_some_and(|z| z < 0.0);
        DangerPrediction {
            likely: low,
            confidence: if low { 0.8 } else { 0.0 },
        }
    }
}

fn simulator(collaborators: Collaborators) -> MachineSimulator {
    MachineSimulator::new(
        "mill-1",
        Arc::new(cartesian().unwrap()),
        &TwinConfig::default(),
        collaborators,
    )
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn external_cancel_leaves_state_untouched() {
    let mut sim = simulator(Collaborators::default());
    sim.execute_move(&MoveCommand::joints([("X", 10.0)]));
    let before = sim.state().clone();

    let token = CancelToken::new();
    let remote = token.clone();
    remote.cancel();
    let result = sim.execute_move_with_cancel(&MoveCommand::joints([("X", 90.0)]), &token);

    assert!(result.cancelled);
    assert!(!result.success);
    assert_eq!(result.final_joints[0], 10.0);
    assert!(result.predicted_time > 0.0);
    assert_eq!(sim.state(), &before);
    assert_eq!(sim.phase(), StepPhase::Idle);
}

#[test]
fn partial_execution_still_resolves_contacts() {
    let mut sim = simulator(
        Collaborators::default()
            .with_executor(FeedHold)
            .with_detector(TablePlaneDetector::new(-5.0)),
    );
    let result = sim.execute_move(&MoveCommand::joints([("Z", -20.0)]).with_tool("T3", None));

    assert!(!result.success);
    assert!(result.flags().contains(WarningFlags::INCOMPLETE));
    assert_eq!(result.final_joints[2], -10.0);
    assert_eq!(result.collisions.len(), 1);
    assert_eq!(result.collisions[0].body_a, "T3");
    assert!((result.collisions[0].penetration_depth - 5.0).abs() < 1e-9);

    let contact = result
        .constraints
        .iter()
        .find(|c| matches!(c.kind, ResolvedKind::Contact { .. }))
        .expect("contact constraint");
    assert_eq!(contact.status, ConstraintStatus::Resolved);
    assert!(contact.residual() < 0.01);
    assert!(!sim.state().warm_start.is_empty());
}

#[test]
fn learning_events_reach_the_sink() {
    let (tx, rx) = mpsc::channel();
    let mut sim = simulator(
        Collaborators::default()
            .with_sink(ChannelSink::new(tx))
            .with_detector(TablePlaneDetector::new(-5.0)),
    );
    sim.execute_move(&MoveCommand::joints([("X", 40.0), ("Z", -6.0)]).with_feed(3000.0));

    let events: Vec<TwinEvent> = rx.try_iter().collect();
    let moved: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            TwinEvent::MoveCompleted(m) => Some(m.axis.as_str()),
            TwinEvent::CollisionObserved(_) => None,
        })
        .collect();
    assert_eq!(moved, vec!["X", "Z"]);

    let collisions: Vec<&CollisionObserved> = events
        .iter()
        .filter_map(|e| match e {
            TwinEvent::CollisionObserved(c) => Some(c),
            TwinEvent::MoveCompleted(_) => None,
        })
        .collect();
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions[0].body_b, "table");
    assert!((collisions[0].penetration_depth - 1.0).abs() < 1e-9);
    assert_eq!(collisions[0].joint_values[2], -6.0);
}

#[test]
fn predicted_danger_is_reported_but_not_blocking() {
    let mut sim = simulator(Collaborators::default().with_predictor(LowZ));
    let result = sim.execute_move(&MoveCommand::joints([("Z", -50.0)]));

    assert!(result.success);
    assert!(result.flags().contains(WarningFlags::DANGER_ZONE));
    assert!(!result.flags().has_blocking());

    let report = sim.check_position_safety(&JointValues::from_slice(&[0.0, 0.0, -50.0]).unwrap());
    assert!(!report.safe);
    assert!((report.danger_level - 0.8).abs() < 1e-12);
}

#[test]
fn json_profiles_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut sim =
            simulator(Collaborators::default().with_store(JsonProfileStore::new(dir.path())));
        for x in [100.0, 0.0, 100.0] {
            let result = sim.execute_move(&MoveCommand::joints([("X", x)]).with_feed(6000.0));
            assert!(result.success);
        }
        assert_eq!(sim.get_profile("X").observation_count, 3);
    }
    assert!(dir.path().join("mill-1.json").exists());

    let sim = simulator(Collaborators::default().with_store(JsonProfileStore::new(dir.path())));
    let restored = sim.get_profile("X");
    assert_eq!(restored.observation_count, 3);
    assert!(sim.profiles().learned("Y").is_none());
}
