//! Contact and constraint records.
//!
//! `CollisionResult` is what an external collision detector reports.
//! `Contact` and `Constraint` live for a single simulation step; only the
//! impulses survive, through the warm-start cache keyed by [`ConstraintKey`].

use std::collections::HashMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::kinematics::LimitSide;

/// Raw narrow-phase result from a collision detector.
///
/// `normal` points from `body_a` towards `body_b`; a positive
/// `penetration_depth` means the bodies overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionResult {
    /// First body (e.g. "tool", "holder", "spindle").
    pub body_a: String,
    /// Second body (e.g. "workpiece", "table", "fixture").
    pub body_b: String,
    /// Contact point in machine coordinates [mm].
    pub point: Vector3<f64>,
    /// Contact normal, A → B.
    pub normal: Vector3<f64>,
    /// Overlap depth [mm].
    pub penetration_depth: f64,
    /// Velocity of B relative to A at the contact point [mm/s].
    #[serde(default)]
    pub relative_velocity: Option<Vector3<f64>>,
    /// Per-pair friction coefficient; the solver default is used if absent.
    #[serde(default)]
    pub friction: Option<f64>,
}

/// Contact frame built from a collision result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// First body.
    pub body_a: String,
    /// Second body.
    pub body_b: String,
    /// Contact point [mm].
    pub point: Vector3<f64>,
    /// Unit normal, A → B.
    pub normal: Vector3<f64>,
    /// First unit tangent.
    pub tangent1: Vector3<f64>,
    /// Second unit tangent.
    pub tangent2: Vector3<f64>,
    /// Overlap depth [mm].
    pub penetration_depth: f64,
    /// Relative tangential velocity in (tangent1, tangent2) [mm/s].
    pub tangent_velocity: [f64; 2],
    /// Coulomb friction coefficient μ.
    pub friction: f64,
}

/// Stable identity used to match a constraint with its previous-step counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKey {
    /// n-th contact between a body pair within one step.
    Contact {
        /// First body.
        body_a: String,
        /// Second body.
        body_b: String,
        /// Order of this contact among contacts of the same pair.
        ordinal: u16,
    },
    /// Limit of one joint.
    JointLimit {
        /// Joint index.
        joint: usize,
        /// Violated side.
        side: LimitSide,
    },
}

impl std::fmt::Display for ConstraintKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contact {
                body_a,
                body_b,
                ordinal,
            } => write!(f, "contact {body_a}/{body_b}#{ordinal}"),
            Self::JointLimit { joint, side } => write!(f, "joint {joint} {side:?} limit"),
        }
    }
}

/// Per-constraint solver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintStatus {
    /// Built, not yet iterated.
    #[default]
    Unresolved,
    /// Residual within tolerance.
    Resolved,
    /// Residual above tolerance after the iteration budget.
    Diverged,
}

/// Constraint payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Non-penetration with Coulomb friction.
    Contact {
        /// Contact frame.
        contact: Contact,
        /// Accumulated normal impulse (≥ 0).
        normal_impulse: f64,
        /// Accumulated impulse along `tangent1`.
        tangent_impulse1: f64,
        /// Accumulated impulse along `tangent2`.
        tangent_impulse2: f64,
    },
    /// Joint travel limit.
    JointLimit {
        /// Joint index.
        joint: usize,
        /// Joint name.
        joint_name: String,
        /// Violated side.
        side: LimitSide,
        /// Commanded value.
        value: f64,
        /// Limit value on `side`.
        limit: f64,
        /// Violation magnitude (≥ 0).
        error: f64,
    },
}

/// One row of the constraint set for a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Warm-start identity.
    pub key: ConstraintKey,
    /// Penalty stiffness.
    pub stiffness: f64,
    /// Penalty damping.
    pub damping: f64,
    /// Solver state.
    pub status: ConstraintStatus,
    /// Payload.
    pub kind: ConstraintKind,
}

/// Outcome of one constraint after solving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolvedKind {
    /// Contact impulses.
    Contact {
        /// First body.
        body_a: String,
        /// Second body.
        body_b: String,
        /// Normal impulse (≥ 0).
        normal_impulse: f64,
        /// Tangent impulse along `tangent1`.
        tangent_impulse1: f64,
        /// Tangent impulse along `tangent2`.
        tangent_impulse2: f64,
        /// Friction coefficient used for the cone.
        friction: f64,
        /// Penetration before solving [mm].
        initial_penetration: f64,
        /// Penetration left after solving [mm].
        residual_penetration: f64,
    },
    /// Joint clamped into range.
    JointLimit {
        /// Joint index.
        joint: usize,
        /// Joint name.
        joint_name: String,
        /// Violated side.
        side: LimitSide,
        /// Commanded value.
        commanded: f64,
        /// Value after correction (== limit).
        corrected: f64,
        /// Spring-damper impulse accumulated while correcting.
        impulse: f64,
    },
}

/// Solved constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConstraint {
    /// Warm-start identity.
    pub key: ConstraintKey,
    /// Final status.
    pub status: ConstraintStatus,
    /// Result payload.
    pub kind: ResolvedKind,
}

impl ResolvedConstraint {
    /// Residual penetration for contacts, zero for joint limits.
    pub fn residual(&self) -> f64 {
        match self.kind {
            ResolvedKind::Contact {
                residual_penetration,
                ..
            } => residual_penetration,
            ResolvedKind::JointLimit { .. } => 0.0,
        }
    }

    /// True if the solver gave up on this constraint.
    #[inline]
    pub fn diverged(&self) -> bool {
        self.status == ConstraintStatus::Diverged
    }
}

/// Impulses remembered from the previous step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedImpulse {
    /// Normal (or joint-limit) impulse.
    pub normal: f64,
    /// Tangent impulses.
    pub tangent: [f64; 2],
}

/// Warm-start cache keyed by constraint identity.
pub type WarmStart = HashMap<ConstraintKey, CachedImpulse>;
