//! Move commands, step results and learning events.

use serde::{Deserialize, Serialize};

use crate::contact::{CollisionResult, ResolvedConstraint};
use crate::kinematics::{JointValues, Pose};
use crate::warning::{StepWarning, WarningFlags};

/// Machine identifier.
pub type MachineId = String;

/// What a move should reach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MoveTarget {
    /// Target values by joint name; joints not named keep their position.
    Joints(Vec<(String, f64)>),
    /// TCP pose, solved through inverse kinematics.
    Pose(Pose),
}

/// One motion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveCommand {
    /// Target.
    pub target: MoveTarget,
    /// Feed rate [mm/min]; `None` moves at each joint's maximum velocity.
    pub feed_rate: Option<f64>,
    /// Tool in the spindle.
    pub tool_id: Option<String>,
    /// Holder of that tool.
    pub holder_id: Option<String>,
}

impl MoveCommand {
    /// Joint-space move.
    pub fn joints<S: Into<String>>(targets: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self {
            target: MoveTarget::Joints(targets.into_iter().map(|(n, v)| (n.into(), v)).collect()),
            feed_rate: None,
            tool_id: None,
            holder_id: None,
        }
    }

    /// Pose move.
    pub fn pose(pose: Pose) -> Self {
        Self {
            target: MoveTarget::Pose(pose),
            feed_rate: None,
            tool_id: None,
            holder_id: None,
        }
    }

    /// Set the feed rate [mm/min].
    #[must_use]
    pub fn with_feed(mut self, feed_rate: f64) -> Self {
        self.feed_rate = Some(feed_rate);
        self
    }

    /// Set tool and holder.
    #[must_use]
    pub fn with_tool(mut self, tool_id: &str, holder_id: Option<&str>) -> Self {
        self.tool_id = Some(tool_id.to_string());
        self.holder_id = holder_id.map(str::to_string);
        self
    }
}

/// Result of one `execute_move`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Move executed to completion.
    pub success: bool,
    /// Move cancelled before execution; nothing changed.
    pub cancelled: bool,
    /// Predicted duration [s].
    pub predicted_time: f64,
    /// Duration reported by the executor [s].
    pub actual_time: f64,
    /// Joint values after the step.
    pub final_joints: JointValues,
    /// Collisions found at the reached configuration.
    pub collisions: Vec<CollisionResult>,
    /// Solved constraints (joint limits from validation, then contacts).
    pub constraints: Vec<ResolvedConstraint>,
    /// Recoverable anomalies.
    pub warnings: Vec<StepWarning>,
}

impl StepResult {
    /// Flag summary of `warnings`.
    pub fn flags(&self) -> WarningFlags {
        WarningFlags::from_warnings(&self.warnings)
    }
}

/// Danger-zone predictor answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DangerPrediction {
    /// Classifier says the configuration is likely dangerous.
    pub likely: bool,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Result of `check_position_safety`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyReport {
    /// No limit violation, no contact, no confident danger prediction.
    pub safe: bool,
    /// Findings.
    pub warnings: Vec<StepWarning>,
    /// Overlapping bodies at the checked configuration.
    pub collisions: Vec<CollisionResult>,
    /// Aggregated danger level in `[0, 1]`.
    pub danger_level: f64,
}

// ─── Events ─────────────────────────────────────────────────────────

/// Emitted once per moved axis after execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveCompleted {
    /// Machine.
    pub machine_id: MachineId,
    /// Axis name.
    pub axis: String,
    /// Distance travelled [mm or deg].
    pub distance: f64,
    /// Duration [s].
    pub duration: f64,
    /// Predicted following error at the commanded feed [mm].
    pub following_error: f64,
}

/// Emitted per contact when contacts were found or constraints diverged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionObserved {
    /// Machine.
    pub machine_id: MachineId,
    /// First body.
    pub body_a: String,
    /// Second body.
    pub body_b: String,
    /// Penetration depth [mm].
    pub penetration_depth: f64,
    /// Joint values at which the contact occurred.
    pub joint_values: JointValues,
}

/// Learning event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TwinEvent {
    /// See [`MoveCompleted`].
    MoveCompleted(MoveCompleted),
    /// See [`CollisionObserved`].
    CollisionObserved(CollisionObserved),
}
