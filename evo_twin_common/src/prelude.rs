//! Prelude module for common re-exports.
//!
//! ```rust
//! use evo_twin_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, LogLevel, MachineFile, SharedConfig, SolverConfig, TwinConfig,
};

// ─── Kinematics ─────────────────────────────────────────────────────
pub use crate::error::ConfigurationError;
pub use crate::kinematics::{
    Joint, JointKind, JointLimits, JointValues, KinematicModel, LimitSide, Pose, Topology,
};

// ─── Dynamics ───────────────────────────────────────────────────────
pub use crate::profile::{AxisBehaviorProfile, AxisObservation, VelocityProfileKind};

// ─── Contacts & Constraints ─────────────────────────────────────────
pub use crate::contact::{
    CollisionResult, Constraint, ConstraintKey, ConstraintStatus, ResolvedConstraint, ResolvedKind,
    WarmStart,
};

// ─── Steps ──────────────────────────────────────────────────────────
pub use crate::command::{
    CollisionObserved, DangerPrediction, MachineId, MoveCommand, MoveCompleted, MoveTarget,
    SafetyReport, StepResult, TwinEvent,
};
pub use crate::warning::{StepWarning, WarningFlags};
