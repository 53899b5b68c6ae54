//! Constraint construction.
//!
//! Joint-limit constraints come first, in joint order, followed by contact
//! constraints in detector order. The order is part of the solver's
//! determinism: Gauss-Seidel passes visit constraints as built.

use std::collections::HashMap;

use nalgebra::Vector3;
use tracing::{trace, warn};

use evo_twin_common::config::SolverConfig;
use evo_twin_common::contact::{
    CollisionResult, Constraint, ConstraintKey, ConstraintKind, ConstraintStatus, Contact,
};
use evo_twin_common::kinematics::KinematicModel;

/// Orthonormal tangent pair for a unit `normal`.
///
/// `tangent1` is the machine axis least aligned with the normal, projected
/// into the contact plane; `tangent2 = normal × tangent1`.
pub fn tangent_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let reference = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let t1 = (reference - normal * normal.dot(&reference)).normalize();
    let t2 = normal.cross(&t1);
    (t1, t2)
}

/// Build the constraint set for one step.
///
/// A joint-limit constraint is created for every joint whose value lies
/// outside its range. A contact constraint is created for every collision
/// with positive penetration and a usable normal; others are skipped.
pub fn build_constraints(
    collisions: &[CollisionResult],
    model: &KinematicModel,
    joint_values: &[f64],
    config: &SolverConfig,
) -> Vec<Constraint> {
    let mut constraints = Vec::new();

    for (idx, joint) in model.joints().iter().enumerate() {
        let Some(value) = joint_values.get(idx).copied() else {
            continue;
        };
        if let Some((side, error)) = joint.limits.violation(value) {
            trace!("{} = {value:.4} violates {side:?} limit by {error:.4}", joint.name);
            constraints.push(Constraint {
                key: ConstraintKey::JointLimit { joint: idx, side },
                stiffness: config.limit_stiffness,
                damping: config.limit_damping,
                status: ConstraintStatus::Unresolved,
                kind: ConstraintKind::JointLimit {
                    joint: idx,
                    joint_name: joint.name.clone(),
                    side,
                    value,
                    limit: joint.limits.bound(side),
                    error,
                },
            });
        }
    }

    let mut ordinals: HashMap<(&str, &str), u16> = HashMap::new();
    for result in collisions {
        if !(result.penetration_depth > 0.0 && result.penetration_depth.is_finite()) {
            trace!(
                "Skipping separated pair {}/{} (depth {})",
                result.body_a, result.body_b, result.penetration_depth
            );
            continue;
        }
        let n = result.normal.norm();
        if !(n > 0.0 && n.is_finite()) {
            warn!(
                "Skipping contact {}/{} with degenerate normal",
                result.body_a, result.body_b
            );
            continue;
        }
        let normal = result.normal / n;
        let (tangent1, tangent2) = tangent_basis(&normal);
        let relative = result.relative_velocity.unwrap_or_else(Vector3::zeros);

        let ordinal = ordinals
            .entry((result.body_a.as_str(), result.body_b.as_str()))
            .or_insert(0);
        let key = ConstraintKey::Contact {
            body_a: result.body_a.clone(),
            body_b: result.body_b.clone(),
            ordinal: *ordinal,
        };
        *ordinal = ordinal.saturating_add(1);

        constraints.push(Constraint {
            key,
            stiffness: config.contact_stiffness,
            damping: config.contact_damping,
            status: ConstraintStatus::Unresolved,
            kind: ConstraintKind::Contact {
                contact: Contact {
                    body_a: result.body_a.clone(),
                    body_b: result.body_b.clone(),
                    point: result.point,
                    normal,
                    tangent1,
                    tangent2,
                    penetration_depth: result.penetration_depth,
                    tangent_velocity: [relative.dot(&tangent1), relative.dot(&tangent2)],
                    friction: result.friction.unwrap_or(config.friction).max(0.0),
                },
                normal_impulse: 0.0,
                tangent_impulse1: 0.0,
                tangent_impulse2: 0.0,
            },
        });
    }

    constraints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::registry::trunnion_ac;
    use evo_twin_common::kinematics::LimitSide;

    fn collision(a: &str, b: &str, depth: f64) -> CollisionResult {
        CollisionResult {
            body_a: a.to_string(),
            body_b: b.to_string(),
            point: Vector3::zeros(),
            normal: Vector3::new(0.0, 0.0, 2.0),
            penetration_depth: depth,
            relative_velocity: Some(Vector3::new(3.0, 4.0, -1.0)),
            friction: None,
        }
    }

    #[test]
    fn tangent_basis_is_orthonormal() {
        for n in [
            Vector3::z(),
            Vector3::x(),
            Vector3::new(1.0, 1.0, 1.0).normalize(),
            Vector3::new(-0.95, 0.1, 0.0).normalize(),
        ] {
            let (t1, t2) = tangent_basis(&n);
            assert!((t1.norm() - 1.0).abs() < 1e-12);
            assert!((t2.norm() - 1.0).abs() < 1e-12);
            assert!(t1.dot(&n).abs() < 1e-12);
            assert!(t2.dot(&n).abs() < 1e-12);
            assert!(t1.dot(&t2).abs() < 1e-12);
        }
    }

    #[test]
    fn joint_limits_then_contacts() {
        let model = trunnion_ac().unwrap();
        let joints = [0.0, 0.0, 0.0, 150.0, 0.0];
        let c = build_constraints(
            &[collision("tool", "table", 0.5)],
            &model,
            &joints,
            &SolverConfig::default(),
        );
        assert_eq!(c.len(), 2);
        assert_eq!(
            c[0].key,
            ConstraintKey::JointLimit {
                joint: 3,
                side: LimitSide::Upper
            }
        );
        match &c[0].kind {
            ConstraintKind::JointLimit { limit, error, .. } => {
                assert_eq!(*limit, 120.0);
                assert_eq!(*error, 30.0);
            }
            ConstraintKind::Contact { .. } => panic!("expected joint limit"),
        }
        assert!(matches!(c[1].kind, ConstraintKind::Contact { .. }));
    }

    #[test]
    fn contact_frame_and_velocity() {
        let model = trunnion_ac().unwrap();
        let c = build_constraints(
            &[collision("tool", "table", 0.5)],
            &model,
            &model.home(),
            &SolverConfig::default(),
        );
        let ConstraintKind::Contact { contact, .. } = &c[0].kind else {
            panic!("expected contact");
        };
        assert_eq!(contact.normal, Vector3::z());
        assert_eq!(contact.friction, SolverConfig::default().friction);
        let [vt1, vt2] = contact.tangent_velocity;
        assert!(((vt1 * vt1 + vt2 * vt2).sqrt() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn ordinals_count_per_pair_and_skip_separated() {
        let model = trunnion_ac().unwrap();
        let c = build_constraints(
            &[
                collision("tool", "table", 0.5),
                collision("tool", "fixture", 0.2),
                collision("tool", "table", -0.1),
                collision("tool", "table", 0.3),
            ],
            &model,
            &model.home(),
            &SolverConfig::default(),
        );
        let keys: Vec<String> = c.iter().map(|c| c.key.to_string()).collect();
        assert_eq!(
            keys,
            vec!["contact tool/table#0", "contact tool/fixture#0", "contact tool/table#1"]
        );
    }

    #[test]
    fn degenerate_normal_is_skipped() {
        let model = trunnion_ac().unwrap();
        let mut bad = collision("tool", "table", 0.5);
        bad.normal = Vector3::zeros();
        assert!(build_constraints(&[bad], &model, &model.home(), &SolverConfig::default()).is_empty());
    }
}
