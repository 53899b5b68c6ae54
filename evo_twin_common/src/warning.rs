//! Per-step anomalies.
//!
//! Everything that goes wrong during a step is recoverable and collected into
//! `StepResult::warnings`. [`WarningFlags`] condenses a warning list into
//! bitflags; flags in [`WarningFlags::BLOCKING_MASK`] are the ones a caller
//! would normally treat as a reason to hold back downstream G-code.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kinematics::LimitSide;

/// A recoverable anomaly surfaced by a step.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum StepWarning {
    /// Commanded joint value outside its range; clamped.
    #[error("joint {joint} commanded {commanded:.4} beyond {side:?} limit, clamped to {clamped:.4}")]
    JointLimitViolation {
        /// Joint name.
        joint: String,
        /// Violated side.
        side: LimitSide,
        /// Commanded value.
        commanded: f64,
        /// Value used instead.
        clamped: f64,
    },

    /// Rotary azimuth indeterminate; previous value kept.
    #[error("singular orientation: joint {joint} held at {preserved:.4}")]
    SingularConfiguration {
        /// Joint name (C).
        joint: String,
        /// Value preserved from the previous configuration.
        preserved: f64,
    },

    /// Constraint residual above tolerance after the iteration budget.
    #[error("constraint {constraint} diverged, residual penetration {residual:.5}")]
    ConstraintDivergence {
        /// Constraint description.
        constraint: String,
        /// Residual penetration [mm].
        residual: f64,
    },

    /// Danger-zone predictor flagged the target configuration.
    #[error("danger zone predicted (confidence {confidence:.2})")]
    DangerZonePredicted {
        /// Predictor confidence in `[0, 1]`.
        confidence: f64,
    },

    /// Requested feed exceeds a joint's maximum velocity.
    #[error("feed {requested:.1} exceeds joint {joint} maximum {limit:.1}")]
    FeedRateLimited {
        /// Joint name.
        joint: String,
        /// Requested feed.
        requested: f64,
        /// Maximum velocity used instead.
        limit: f64,
    },

    /// Motion executor did not finish the move.
    #[error("move only {fraction:.3} complete: {reason}")]
    ExecutionIncomplete {
        /// Completed fraction in `[0, 1]`.
        fraction: f64,
        /// Executor reason.
        reason: String,
    },

    /// Command named a joint the model does not have.
    #[error("unknown joint '{0}' ignored")]
    UnknownJoint(String),

    /// Axis profile had unusable dynamics; timing used default dynamics.
    ///
    /// Not raised while a profile is merely short of observations, that case
    /// falls back to the default profile silently.
    #[error("motion time of axis {axis} predicted from default dynamics")]
    PredictionUncertain {
        /// Axis name.
        axis: String,
    },
}

impl StepWarning {
    /// Flag corresponding to this warning.
    pub const fn flag(&self) -> WarningFlags {
        match self {
            Self::JointLimitViolation { .. } => WarningFlags::JOINT_LIMIT,
            Self::SingularConfiguration { .. } => WarningFlags::SINGULAR,
            Self::ConstraintDivergence { .. } => WarningFlags::DIVERGED,
            Self::DangerZonePredicted { .. } => WarningFlags::DANGER_ZONE,
            Self::FeedRateLimited { .. } => WarningFlags::FEED_LIMITED,
            Self::ExecutionIncomplete { .. } => WarningFlags::INCOMPLETE,
            Self::UnknownJoint(_) => WarningFlags::UNKNOWN_JOINT,
            Self::PredictionUncertain { .. } => WarningFlags::UNCERTAIN,
        }
    }
}

bitflags! {
    /// Summary of the warnings attached to a step.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct WarningFlags: u16 {
        /// Joint clamped into range.
        const JOINT_LIMIT   = 0x0001;
        /// Singular orientation, azimuth preserved.
        const SINGULAR      = 0x0002;
        /// Constraint diverged. **BLOCKING**.
        const DIVERGED      = 0x0004;
        /// Danger zone predicted.
        const DANGER_ZONE   = 0x0008;
        /// Feed reduced to joint maximum.
        const FEED_LIMITED  = 0x0010;
        /// Move not completed. **BLOCKING**.
        const INCOMPLETE    = 0x0020;
        /// Unknown joint name in command.
        const UNKNOWN_JOINT = 0x0040;
        /// Timing predicted from default dynamics.
        const UNCERTAIN     = 0x0080;
    }
}

impl WarningFlags {
    /// Flags that normally hold back downstream execution.
    pub const BLOCKING_MASK: Self =
        Self::from_bits_truncate(Self::DIVERGED.bits() | Self::INCOMPLETE.bits());

    /// Collect flags from a warning list.
    pub fn from_warnings(warnings: &[StepWarning]) -> Self {
        warnings
            .iter()
            .fold(Self::empty(), |acc, w| acc | w.flag())
    }

    /// Returns true if any BLOCKING flag is set.
    #[inline]
    pub const fn has_blocking(&self) -> bool {
        self.intersects(Self::BLOCKING_MASK)
    }
}

impl Default for WarningFlags {
    fn default() -> Self {
        Self::empty()
    }
}
