//! Integration test: reference scenarios and cross-module properties.

use std::sync::Arc;

use nalgebra::Vector3;

use evo_twin::constraint::{ConstraintSolver, build_constraints};
use evo_twin::dynamics::predict_motion_time;
use evo_twin::kinematics::registry::{cartesian, head_table_bc, mill_turn, trunnion_ac};
use evo_twin::kinematics::{forward, inverse};
use evo_twin::orchestrator::{Collaborators, MachineSimulator};
use evo_twin_common::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

fn simulator(model: KinematicModel) -> MachineSimulator {
    MachineSimulator::new(
        "scenario",
        Arc::new(model),
        &TwinConfig::default(),
        Collaborators::default(),
    )
}

fn tool_table(depth: f64) -> CollisionResult {
    CollisionResult {
        body_a: "tool".to_string(),
        body_b: "table".to_string(),
        point: Vector3::zeros(),
        normal: Vector3::new(0.0, 0.0, -1.0),
        penetration_depth: depth,
        relative_velocity: None,
        friction: None,
    }
}

fn count_limit_warnings(warnings: &[StepWarning]) -> usize {
    warnings
        .iter()
        .filter(|w| matches!(w, StepWarning::JointLimitViolation { .. }))
        .count()
}

// ── Scenarios ───────────────────────────────────────────────────────

#[test]
fn cartesian_move_matches_trapezoidal_formula() {
    let mut sim = simulator(cartesian().unwrap());
    let result = sim.execute_move(&MoveCommand::joints([("X", 100.0)]).with_feed(3000.0));

    // v = 50 mm/s, a = 5000 mm/s²: t = 2·v/a + (d − v²/a)/v
    let v = 3000.0 / 60.0;
    let a = 5000.0;
    let expected = 2.0 * v / a + (100.0 - v * v / a) / v;
    assert!((result.predicted_time - expected).abs() <= expected * 0.01);
    assert!(result.success);
    assert_eq!(result.final_joints[0], 100.0);
}

#[test]
fn vertical_tool_axis_keeps_table_rotation() {
    let model = trunnion_ac().unwrap();
    let previous = JointValues::from_slice(&[0.0, 0.0, 0.0, 0.0, 45.0]).unwrap();
    let sol = inverse(&model, &Pose::target([0.0; 3], [0.0, 0.0, -1.0]), &previous);

    assert!(sol.joints[3].abs() < 1e-9);
    assert_eq!(sol.joints[4], 45.0);
    assert!(sol.singular);
}

#[test]
fn tilt_about_machine_x_is_pure_a() {
    let model = trunnion_ac().unwrap();
    let tilt = 30f64.to_radians();
    let sol = inverse(
        &model,
        &Pose::target([0.0; 3], [0.0, tilt.sin(), -tilt.cos()]),
        &model.home(),
    );
    assert!((sol.joints[3] - 30.0).abs() < 1e-6);
    assert!(sol.joints[4].abs() < 1e-6);
}

#[test]
fn two_millimetre_contact_converges_deterministically() {
    let model = cartesian().unwrap();
    let config = SolverConfig::default();
    assert_eq!(config.contact_stiffness, 1e5);
    assert_eq!(config.contact_damping, 1e3);

    let solver = ConstraintSolver::new(config);
    let run = || {
        let mut constraints = build_constraints(&[tool_table(2.0)], &model, &[0.0; 3], &config);
        solver.solve(&mut constraints, &WarmStart::new(), 10, config.dt)
    };

    let first = run();
    let second = run();
    assert!(first.max_residual < 0.01);
    assert!(!first.diverged());
    assert_eq!(first, second);
}

#[test]
fn commanded_a_beyond_limit_is_clamped() {
    let mut sim = simulator(trunnion_ac().unwrap());
    let result = sim.execute_move(&MoveCommand::joints([("A", 150.0)]));

    assert_eq!(result.final_joints[3], 120.0);
    assert_eq!(count_limit_warnings(&result.warnings), 1);
}

// ── Properties ──────────────────────────────────────────────────────

#[test]
fn forward_inverse_round_trip_on_five_axis_models() {
    for model in [trunnion_ac().unwrap(), head_table_bc().unwrap(), mill_turn().unwrap()] {
        for (pos, axis) in [
            ([10.0, -20.0, -50.0], [0.2, 0.3, -0.9]),
            ([-30.0, 15.0, -80.0], [-0.4, 0.1, -0.7]),
        ] {
            let target = Pose::target(pos, axis);
            let sol = inverse(&model, &target, &model.home());
            let reached = forward(&model, &sol.joints);
            assert!(
                reached.position_error(&target) < 1e-6,
                "{}: {:?}",
                model.name(),
                sol.joints
            );
            assert!(reached.angular_error(&target) < 1e-4);
        }
    }
}

#[test]
fn final_joints_are_always_within_limits() {
    let mut sim = simulator(trunnion_ac().unwrap());
    let limits: Vec<JointLimits> = sim.model().joints().iter().map(|j| j.limits).collect();

    for command in [
        MoveCommand::joints([("X", 900.0), ("A", -80.0)]),
        MoveCommand::joints([("Z", 500.0), ("C", 720.0)]),
        MoveCommand::joints([("Y", -301.0)]),
    ] {
        let result = sim.execute_move(&command);
        for (value, limit) in result.final_joints.iter().zip(&limits) {
            assert!(limit.contains(*value), "{value} outside {limit:?}");
        }
    }
}

#[test]
fn predicted_time_grows_with_distance() {
    let profile = AxisBehaviorProfile::default();
    let mut last = 0.0;
    for d in [0.1, 1.0, 10.0, 100.0, 1000.0] {
        let t = predict_motion_time(&profile, d, 6000.0);
        assert!(t > last);
        last = t;
    }
}

#[test]
fn contact_impulses_stay_inside_friction_cone() {
    let model = cartesian().unwrap();
    let config = SolverConfig::default();
    let mut sliding = tool_table(1.0);
    sliding.relative_velocity = Some(Vector3::new(8_000.0, -3_000.0, 0.0));
    sliding.friction = Some(0.2);

    let mut constraints = build_constraints(&[sliding], &model, &[0.0; 3], &config);
    let out = ConstraintSolver::new(config).solve_default(&mut constraints, &WarmStart::new());
    match out.resolved[0].kind {
        ResolvedKind::Contact {
            normal_impulse,
            tangent_impulse1,
            tangent_impulse2,
            friction,
            ..
        } => {
            let tangent = tangent_impulse1.hypot(tangent_impulse2);
            assert!(normal_impulse >= 0.0);
            assert!(tangent <= friction * normal_impulse + 1e-9);
        }
        ResolvedKind::JointLimit { .. } => panic!("expected a contact"),
    }
}
