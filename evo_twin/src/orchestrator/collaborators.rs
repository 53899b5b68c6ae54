//! External collaborators of the simulator.
//!
//! The simulator never reaches for geometry, classifiers, motion hardware or
//! event buses on its own. Each is a trait object injected at construction;
//! the bundled implementations cover tests, the CLI and simple setups.

use std::sync::mpsc::Sender;

use nalgebra::Vector3;
use tracing::{debug, info, warn};

use evo_twin_common::command::{CollisionObserved, DangerPrediction, MoveCompleted, TwinEvent};
use evo_twin_common::contact::CollisionResult;
use evo_twin_common::kinematics::{JointValues, KinematicModel, Pose};

// ─── Collision Detection ────────────────────────────────────────────

/// What the collision detector is asked about.
#[derive(Debug, Clone, Copy)]
pub struct CollisionQuery<'a> {
    /// Machine model.
    pub model: &'a KinematicModel,
    /// Joint configuration to check.
    pub joints: &'a JointValues,
    /// TCP pose of that configuration.
    pub pose: &'a Pose,
    /// Tool in the spindle.
    pub tool_id: Option<&'a str>,
    /// Holder of that tool.
    pub holder_id: Option<&'a str>,
}

/// Narrow-phase collision detection at one configuration.
pub trait CollisionDetector: Send {
    /// All body pairs in contact or overlapping.
    fn detect(&self, query: &CollisionQuery<'_>) -> Vec<CollisionResult>;
}

/// Detector that never reports anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCollisions;

impl CollisionDetector for NoCollisions {
    fn detect(&self, _query: &CollisionQuery<'_>) -> Vec<CollisionResult> {
        Vec::new()
    }
}

/// Reports tool-versus-table contact when the TCP dips below a horizontal plane.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePlaneDetector {
    /// Table surface height [mm].
    pub height: f64,
    /// Friction coefficient reported for the pair, if any.
    pub friction: Option<f64>,
}

impl TablePlaneDetector {
    /// Plane at `height`.
    pub const fn new(height: f64) -> Self {
        Self {
            height,
            friction: None,
        }
    }
}

impl CollisionDetector for TablePlaneDetector {
    fn detect(&self, query: &CollisionQuery<'_>) -> Vec<CollisionResult> {
        let depth = self.height - query.pose.position.z;
        if depth <= 0.0 {
            return Vec::new();
        }
        let tcp = query.pose.position;
        vec![CollisionResult {
            body_a: query.tool_id.unwrap_or("tool").to_string(),
            body_b: "table".to_string(),
            point: Vector3::new(tcp.x, tcp.y, self.height),
            normal: Vector3::new(0.0, 0.0, -1.0),
            penetration_depth: depth,
            relative_velocity: None,
            friction: self.friction,
        }]
    }
}

// ─── Danger Prediction ──────────────────────────────────────────────

/// Learned classifier of dangerous configurations.
pub trait DangerZonePredictor: Send {
    /// Prediction for `joints` on `machine_id`.
    fn predict(&self, machine_id: &str, joints: &JointValues) -> DangerPrediction;
}

/// Predictor that considers everything safe.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverDangerous;

impl DangerZonePredictor for NeverDangerous {
    fn predict(&self, _machine_id: &str, _joints: &JointValues) -> DangerPrediction {
        DangerPrediction::default()
    }
}

// ─── Motion Execution ───────────────────────────────────────────────

/// Move handed to the executor after validation.
#[derive(Debug, Clone, Copy)]
pub struct MotionRequest<'a> {
    /// Machine.
    pub machine_id: &'a str,
    /// Joint values at the start of the move.
    pub from: &'a JointValues,
    /// Validated target joint values.
    pub to: &'a JointValues,
    /// Commanded feed [mm/min], if any.
    pub feed_rate: Option<f64>,
    /// Predicted duration [s].
    pub predicted_time: f64,
}

/// What the executor achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    /// Joint values actually reached.
    pub reached: JointValues,
    /// Completed fraction in `[0, 1]`.
    pub fraction: f64,
    /// Elapsed time [s].
    pub duration: f64,
    /// Why the move stopped early, if it did.
    pub reason: Option<String>,
}

impl ExecutionReport {
    /// Report for a fully executed move.
    pub fn complete(reached: JointValues, duration: f64) -> Self {
        Self {
            reached,
            fraction: 1.0,
            duration,
            reason: None,
        }
    }
}

/// Drives (or animates) the machine through a validated move.
pub trait MotionExecutor: Send {
    /// Execute `request`.
    fn execute(&mut self, request: &MotionRequest<'_>) -> ExecutionReport;
}

/// Executor that reaches every target in exactly the predicted time.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdealExecutor;

impl MotionExecutor for IdealExecutor {
    fn execute(&mut self, request: &MotionRequest<'_>) -> ExecutionReport {
        ExecutionReport::complete(request.to.clone(), request.predicted_time)
    }
}

// ─── Learning Feedback ──────────────────────────────────────────────

/// Receiver of learning events.
pub trait LearningSink: Send {
    /// One axis finished a move.
    fn move_completed(&mut self, event: MoveCompleted);

    /// A contact was observed after a move.
    fn collision_observed(&mut self, event: CollisionObserved);
}

/// Sink that logs events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LearningSink for TracingSink {
    fn move_completed(&mut self, event: MoveCompleted) {
        debug!(
            "[{}] {} moved {:.4} in {:.4}s (following error {:.5})",
            event.machine_id, event.axis, event.distance, event.duration, event.following_error
        );
    }

    fn collision_observed(&mut self, event: CollisionObserved) {
        info!(
            "[{}] collision {}/{} depth {:.4} mm",
            event.machine_id, event.body_a, event.body_b, event.penetration_depth
        );
    }
}

/// Sink forwarding events over an `mpsc` channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<TwinEvent>,
}

impl ChannelSink {
    /// Forward into `tx`.
    pub const fn new(tx: Sender<TwinEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: TwinEvent) {
        if self.tx.send(event).is_err() {
            warn!("Learning event receiver dropped, event discarded");
        }
    }
}

impl LearningSink for ChannelSink {
    fn move_completed(&mut self, event: MoveCompleted) {
        self.send(TwinEvent::MoveCompleted(event));
    }

    fn collision_observed(&mut self, event: CollisionObserved) {
        self.send(TwinEvent::CollisionObserved(event));
    }
}
