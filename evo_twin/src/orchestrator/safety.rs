//! Stationary safety check of a joint configuration.
//!
//! `danger_level` is the largest of
//!
//! - predictor confidence (when the predictor flags the configuration),
//! - deepest contact penetration over `penetration_scale`,
//! - limit proximity, rising from 0 at `limit_margin · span` away from a
//!   limit to 1 at the limit.
//!
//! Any limit violation pins it at 1. A NaN joint value counts as a
//! violation and is replaced by the home value for the collision query.

use tracing::debug;

use evo_twin_common::command::SafetyReport;
use evo_twin_common::config::SafetyConfig;
use evo_twin_common::kinematics::{JointValues, KinematicModel, LimitSide};
use evo_twin_common::warning::StepWarning;

use super::collaborators::{CollisionDetector, CollisionQuery, DangerZonePredictor};
use crate::kinematics::forward;

/// Evaluate `joints` against limits, the collision detector and the predictor.
///
/// Missing joint values are taken as the model's home position.
pub fn check_position_safety(
    machine_id: &str,
    model: &KinematicModel,
    joints: &JointValues,
    detector: &dyn CollisionDetector,
    predictor: &dyn DangerZonePredictor,
    config: &SafetyConfig,
) -> SafetyReport {
    let mut values = model.home();
    for (dst, src) in values.iter_mut().zip(joints.iter()) {
        *dst = *src;
    }

    let mut report = SafetyReport {
        safe: true,
        ..SafetyReport::default()
    };
    let mut danger: f64 = 0.0;

    let home = model.home();
    for ((joint, value), &home_value) in model
        .joints()
        .iter()
        .zip(values.iter_mut())
        .zip(home.iter())
    {
        let limits = joint.limits;
        if value.is_nan() {
            report.safe = false;
            danger = 1.0;
            report.warnings.push(StepWarning::JointLimitViolation {
                joint: joint.name.clone(),
                side: LimitSide::Lower,
                commanded: *value,
                clamped: home_value,
            });
            *value = home_value;
            continue;
        }
        let value = *value;
        if let Some((side, _)) = limits.violation(value) {
            report.safe = false;
            danger = 1.0;
            report.warnings.push(StepWarning::JointLimitViolation {
                joint: joint.name.clone(),
                side,
                commanded: value,
                clamped: limits.bound(side),
            });
            continue;
        }
        let margin = config.limit_margin * limits.span();
        if margin > 0.0 {
            let clearance = (value - limits.min).min(limits.max - value);
            if clearance < margin {
                danger = danger.max(1.0 - clearance / margin);
            }
        }
    }

    let pose = forward(model, &values);
    let collisions = detector.detect(&CollisionQuery {
        model,
        joints: &values,
        pose: &pose,
        tool_id: None,
        holder_id: None,
    });
    for collision in collisions.iter().filter(|c| c.penetration_depth > 0.0) {
        report.safe = false;
        let severity = if config.penetration_scale > 0.0 {
            collision.penetration_depth / config.penetration_scale
        } else {
            1.0
        };
        danger = danger.max(severity.min(1.0));
    }
    report.collisions = collisions;

    let prediction = predictor.predict(machine_id, &values);
    if prediction.likely {
        danger = danger.max(prediction.confidence.clamp(0.0, 1.0));
        if prediction.confidence >= config.danger_confidence {
            report.safe = false;
            report.warnings.push(StepWarning::DangerZonePredicted {
                confidence: prediction.confidence,
            });
        }
    }

    report.danger_level = danger.clamp(0.0, 1.0);
    debug!(
        "[{machine_id}] safety check: safe={} danger={:.3}",
        report.safe, report.danger_level
    );
    report
}
