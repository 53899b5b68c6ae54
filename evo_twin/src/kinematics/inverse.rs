//! Inverse kinematics.
//!
//! Orientation is solved first for 5-axis topologies:
//!
//! - tilt `θ = atan2(ρ, −k)` with `ρ = √(i² + j²)` (equal to `acos(−k)`),
//! - azimuth `C = atan2(j, i) − φ₀`, where `φ₀` is the direction a positive
//!   tilt leans the tool at `C = 0` (90° for a trunnion A about X, 0° for a
//!   head B about −Y).
//!
//! Below the singularity tolerance the azimuth is indeterminate; the previous
//! `C` is kept and the solution is flagged singular. Otherwise `C` is moved to
//! the 360°-equivalent nearest the previous `C` that lies within limits, and
//! the mirrored branch `(−θ, C + 180°)` is used when only it fits the limits.
//!
//! Position is then recovered by undoing the rotation and tool offset and
//! projecting onto each (orthonormal) linear direction. Topologies without an
//! orientable tool keep all rotary joints at their previous values.

use nalgebra::Vector3;
use tracing::debug;

use evo_twin_common::consts::{DEFAULT_TOOL_AXIS, SINGULARITY_TILT_DEG};
use evo_twin_common::kinematics::{JointKind, JointLimits, JointValues, KinematicModel, Pose};
use evo_twin_common::warning::StepWarning;

use super::forward::rotation;

/// Result of an inverse-kinematics solve.
#[derive(Debug, Clone, PartialEq)]
pub struct IkSolution {
    /// Joint values in model order. Not clamped to limits.
    pub joints: JointValues,
    /// Tool axis was within the singularity tolerance of vertical.
    pub singular: bool,
    /// `SingularConfiguration` when `singular` is set.
    pub warnings: Vec<StepWarning>,
}

/// Solve `target` with the default singularity tolerance.
pub fn inverse(model: &KinematicModel, target: &Pose, previous: &JointValues) -> IkSolution {
    inverse_with_tolerance(model, target, previous, SINGULARITY_TILT_DEG)
}

/// Solve `target`, treating tilts below `singularity_tilt_deg` as singular.
///
/// `previous` supplies the rotary values that are kept and the reference for
/// azimuth unwrapping; a shorter vector is padded with zeros.
pub fn inverse_with_tolerance(
    model: &KinematicModel,
    target: &Pose,
    previous: &JointValues,
    singularity_tilt_deg: f64,
) -> IkSolution {
    let mut joints = model.home();
    for (dst, src) in joints.iter_mut().zip(previous.iter()) {
        *dst = *src;
    }

    let mut singular = false;
    let mut warnings = Vec::new();

    if let (true, Some(tilt_idx), Some(az_idx)) = (
        model.topology().orients_tool(),
        model.tilt_joint(),
        model.azimuth_joint(),
    ) {
        let previous_c = joints[az_idx];
        let orientation = solve_orientation(model, target, previous_c, singularity_tilt_deg);
        joints[tilt_idx] = orientation.tilt;
        joints[az_idx] = orientation.azimuth;
        if orientation.singular {
            singular = true;
            let name = model
                .joint(az_idx)
                .map(|j| j.name.clone())
                .unwrap_or_default();
            debug!("Singular orientation, holding {name} at {previous_c:.4}");
            warnings.push(StepWarning::SingularConfiguration {
                joint: name,
                preserved: previous_c,
            });
        }
    }

    let r = rotation(model, &joints);
    let l = match model.pivot_point() {
        Some(c) => c + r.inverse() * (target.position - c) - model.tool_center_offset(),
        None => target.position - r * model.tool_center_offset(),
    };

    for (idx, joint) in model.joints().iter().enumerate() {
        if let JointKind::Linear { direction } = joint.kind {
            joints[idx] = direction.dot(&l);
        }
    }

    IkSolution {
        joints,
        singular,
        warnings,
    }
}

struct Orientation {
    tilt: f64,
    azimuth: f64,
    singular: bool,
}

fn solve_orientation(
    model: &KinematicModel,
    target: &Pose,
    previous_c: f64,
    singularity_tilt_deg: f64,
) -> Orientation {
    let axis = {
        let n = target.tool_axis.norm();
        if n > 0.0 {
            target.tool_axis / n
        } else {
            Vector3::from(DEFAULT_TOOL_AXIS)
        }
    };
    let rho = (axis.x * axis.x + axis.y * axis.y).sqrt();
    let tilt = rho.atan2(-axis.z).to_degrees();

    if tilt.abs() < singularity_tilt_deg {
        return Orientation {
            tilt: 0.0,
            azimuth: previous_c,
            singular: true,
        };
    }

    let raw_c = (axis.y.atan2(axis.x) - model.tilt_azimuth_offset()).to_degrees();

    let tilt_limits = model.tilt_joint().and_then(|i| model.joint(i)).map(|j| j.limits);
    let c_limits = model.azimuth_joint().and_then(|i| model.joint(i)).map(|j| j.limits);

    let branches = [(tilt, raw_c), (-tilt, raw_c + 180.0)];
    for (t, c) in branches {
        let tilt_ok = tilt_limits.is_none_or(|l| l.contains(t));
        let c = nearest_equivalent(c, previous_c, c_limits);
        if let (true, Some(c)) = (tilt_ok, c) {
            return Orientation {
                tilt: t,
                azimuth: c,
                singular: false,
            };
        }
    }

    // Neither branch fits; return the primary and let limit handling clamp it.
    Orientation {
        tilt,
        azimuth: nearest_equivalent(raw_c, previous_c, None).unwrap_or(raw_c),
        singular: false,
    }
}

/// `angle + 360·k` closest to `reference`, restricted to `limits` if given.
fn nearest_equivalent(angle: f64, reference: f64, limits: Option<JointLimits>) -> Option<f64> {
    let base = angle + 360.0 * ((reference - angle) / 360.0).round();
    (-4..=4)
        .map(|k| base + 360.0 * f64::from(k))
        .filter(|c| limits.is_none_or(|l| l.contains(*c)))
        .min_by(|a, b| (a - reference).abs().total_cmp(&(b - reference).abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::forward::forward;
    use crate::kinematics::registry::{cartesian, head_table_bc, lathe, mill_turn, trunnion_ac};

    fn assert_round_trip(model: &KinematicModel, target: &Pose, previous: &JointValues) {
        let sol = inverse(model, target, previous);
        assert!(!sol.singular);
        let reached = forward(model, &sol.joints);
        assert!(
            reached.position_error(target) < 1e-6,
            "position error {} for {:?}",
            reached.position_error(target),
            sol.joints
        );
        assert!(reached.angular_error(target) < 1e-4);
    }

    #[test]
    fn trunnion_round_trips() {
        let m = trunnion_ac().unwrap();
        let home = m.home();
        for (pos, axis) in [
            ([10.0, 20.0, -30.0], [0.0, 0.5, -0.75f64.sqrt()]),
            ([-50.0, 5.0, -100.0], [0.3, -0.4, -0.866]),
            ([0.0, 0.0, 0.0], [0.6, 0.0, -0.8]),
            ([120.0, -80.0, -10.0], [0.0, 0.0, -1.0]),
        ] {
            let target = Pose::target(pos, axis);
            let sol = inverse(&m, &target, &home);
            let reached = forward(&m, &sol.joints);
            assert!(reached.position_error(&target) < 1e-6);
            assert!(reached.angular_error(&target) < 1e-4);
        }
    }

    #[test]
    fn head_table_and_mill_turn_round_trip() {
        for m in [head_table_bc().unwrap(), mill_turn().unwrap()] {
            let target = Pose::target([25.0, -10.0, -40.0], [0.5, 0.5, -0.5f64.sqrt()]);
            assert_round_trip(&m, &target, &m.home());
        }
    }

    #[test]
    fn cartesian_round_trip_keeps_axis() {
        let m = cartesian().unwrap();
        let target = Pose::target([1.5, -2.5, -3.5], [0.0, 0.0, -1.0]);
        assert_round_trip(&m, &target, &m.home());
    }

    #[test]
    fn trunnion_tilt_about_x_gives_a_only() {
        let m = trunnion_ac().unwrap();
        let s = 30f64.to_radians();
        let target = Pose::target([0.0, 0.0, 0.0], [0.0, s.sin(), -s.cos()]);
        let sol = inverse(&m, &target, &m.home());
        assert!((sol.joints[3] - 30.0).abs() < 1e-6);
        assert!(sol.joints[4].abs() < 1e-6);
    }

    #[test]
    fn vertical_axis_preserves_previous_c() {
        let m = trunnion_ac().unwrap();
        let previous = JointValues::from_slice(&[0.0, 0.0, 0.0, 10.0, 45.0]).unwrap();
        let sol = inverse(&m, &Pose::target([0.0; 3], [0.0, 0.0, -1.0]), &previous);
        assert!(sol.singular);
        assert_eq!(sol.joints[3], 0.0);
        assert_eq!(sol.joints[4], 45.0);
        assert_eq!(
            sol.warnings,
            vec![StepWarning::SingularConfiguration {
                joint: "C".to_string(),
                preserved: 45.0
            }]
        );
    }

    #[test]
    fn azimuth_is_unwrapped_toward_previous() {
        let m = head_table_bc().unwrap();
        let previous = JointValues::from_slice(&[0.0, 0.0, 0.0, 20.0, 350.0]).unwrap();
        let target = Pose::target([0.0, 0.0, -200.0], [0.3, -0.1, -0.9]);
        let sol = inverse(&m, &target, &previous);
        let raw = (-0.1f64).atan2(0.3).to_degrees();
        assert!((sol.joints[4] - (raw + 360.0)).abs() < 1e-9);
    }

    #[test]
    fn mirrored_branch_used_when_azimuth_exceeds_limits() {
        use evo_twin_common::kinematics::{Joint, Topology};
        let m = KinematicModel::new(
            "short_c",
            Topology::Trunnion,
            vec![
                Joint::linear("X", [1.0, 0.0, 0.0], -100.0, 100.0),
                Joint::linear("Y", [0.0, 1.0, 0.0], -100.0, 100.0),
                Joint::linear("Z", [0.0, 0.0, 1.0], -100.0, 100.0),
                Joint::rotary("A", [1.0, 0.0, 0.0], -120.0, 120.0),
                Joint::rotary("C", [0.0, 0.0, 1.0], -90.0, 90.0),
            ],
            None,
            [0.0; 3],
        )
        .unwrap();
        // Leaning toward -Y needs C = 180° on the primary branch.
        let s = 60f64.to_radians();
        let target = Pose::target([0.0; 3], [0.0, -s.sin(), -s.cos()]);
        let sol = inverse(&m, &target, &m.home());
        assert!((sol.joints[3] + 60.0).abs() < 1e-6);
        assert!(sol.joints[4].abs() < 1e-6);
        let reached = forward(&m, &sol.joints);
        assert!(reached.angular_error(&target) < 1e-6);
    }

    #[test]
    fn lathe_keeps_spindle_angle() {
        let m = lathe().unwrap();
        let previous = JointValues::from_slice(&[0.0, 0.0, 90.0]).unwrap();
        let sol = inverse(&m, &Pose::target([40.0, 0.0, -100.0], [0.0, 0.0, -1.0]), &previous);
        assert_eq!(sol.joints.len(), 3);
        assert!((sol.joints[0] - 40.0).abs() < 1e-9);
        assert!((sol.joints[1] + 100.0).abs() < 1e-9);
        assert_eq!(sol.joints[2], 90.0);
        assert!(!sol.singular);
    }

    #[test]
    fn nearest_equivalent_respects_limits() {
        let limits = JointLimits::new(-360.0, 360.0);
        assert_eq!(nearest_equivalent(10.0, 355.0, Some(limits)), Some(10.0));
        assert_eq!(nearest_equivalent(-170.0, 170.0, None), Some(190.0));
        assert_eq!(nearest_equivalent(-170.0, 170.0, Some(JointLimits::new(-180.0, 180.0))), Some(-170.0));
    }
}
