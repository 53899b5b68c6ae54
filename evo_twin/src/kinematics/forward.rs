//! Forward kinematics.
//!
//! Linear joints sum to a translation `L = Σ qᵢ·dᵢ`. Rotary joints are
//! applied in the model's rotation order (tilt, then azimuth, then any other
//! rotary joint) and accumulate into one rotation `R`. The tool axis is
//! `R·(0,0,-1)` and the TCP is
//!
//! - `P = L + R·o` without a pivot,
//! - `P = c + R·(L − c) + R·o` with pivot `c`,
//!
//! where `o` is the model's tool-center offset.

use nalgebra::{Rotation3, Unit, Vector3};

use evo_twin_common::consts::DEFAULT_TOOL_AXIS;
use evo_twin_common::kinematics::{JointKind, JointValues, KinematicModel, Pose};

/// Combined rotation of all rotary joints. Missing values count as zero.
pub fn rotation(model: &KinematicModel, joints: &[f64]) -> Rotation3<f64> {
    model
        .rotation_order()
        .iter()
        .fold(Rotation3::identity(), |acc, &idx| {
            let angle = joints.get(idx).copied().unwrap_or(0.0);
            match model.joint(idx).map(|j| j.kind) {
                Some(JointKind::Rotary { axis }) => {
                    Rotation3::from_axis_angle(&Unit::new_unchecked(axis), angle.to_radians()) * acc
                }
                _ => acc,
            }
        })
}

/// Translation produced by the linear joints.
pub fn translation(model: &KinematicModel, joints: &[f64]) -> Vector3<f64> {
    model
        .joints()
        .iter()
        .enumerate()
        .fold(Vector3::zeros(), |acc, (idx, joint)| match joint.kind {
            JointKind::Linear { direction } => {
                acc + direction * joints.get(idx).copied().unwrap_or(0.0)
            }
            JointKind::Rotary { .. } => acc,
        })
}

/// Pose reached by `joints`.
///
/// `joints` is indexed in model joint order; a shorter vector is padded with
/// zeros. The returned pose carries the joint values it was computed from.
pub fn forward(model: &KinematicModel, joints: &JointValues) -> Pose {
    let r = rotation(model, joints);
    let l = translation(model, joints);
    let offset = r * model.tool_center_offset();

    let position = match model.pivot_point() {
        Some(c) => c + r * (l - c) + offset,
        None => l + offset,
    };

    let mut values = model.home();
    for (dst, src) in values.iter_mut().zip(joints.iter()) {
        *dst = *src;
    }

    Pose {
        position,
        tool_axis: r * Vector3::from(DEFAULT_TOOL_AXIS),
        joints: values,
    }
}
