//! Per-machine simulation context and the move pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use evo_twin_common::command::{
    CollisionObserved, MachineId, MoveCommand, MoveCompleted, MoveTarget, SafetyReport,
    StepResult,
};
use evo_twin_common::config::TwinConfig;
use evo_twin_common::contact::{ResolvedKind, WarmStart};
use evo_twin_common::kinematics::{JointValues, KinematicModel};
use evo_twin_common::profile::{AxisBehaviorProfile, AxisObservation};
use evo_twin_common::warning::StepWarning;

use super::collaborators::{
    CollisionDetector, CollisionQuery, DangerZonePredictor, IdealExecutor, LearningSink,
    MotionExecutor, MotionRequest, NeverDangerous, NoCollisions, TracingSink,
};
use super::phase::{PhaseEvent, PhaseMachine, StepPhase, TransitionResult};
use super::safety;
use crate::constraint::{ConstraintSolver, build_constraints};
use crate::dynamics::{
    AxisProfiles, MemoryProfileStore, ProfileStore, predict_following_error, predict_motion_time,
    try_predict_motion_time,
};
use crate::kinematics::{forward, inverse_with_tolerance};

/// Joint displacement below which an axis counts as not moved.
const MOVE_EPSILON: f64 = 1e-9;

// ─── Cancellation ───────────────────────────────────────────────────

/// Cooperative cancellation flag checked before execution starts.
///
/// Clones share the flag, so a token handed to another thread can cancel a
/// move running on the simulator's thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// New, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the current (or next) move.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a pending request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ─── Collaborators ──────────────────────────────────────────────────

/// Strategy objects injected into a [`MachineSimulator`].
pub struct Collaborators {
    /// Collision detection.
    pub detector: Box<dyn CollisionDetector>,
    /// Danger-zone classifier.
    pub predictor: Box<dyn DangerZonePredictor>,
    /// Motion execution.
    pub executor: Box<dyn MotionExecutor>,
    /// Learning-event receiver.
    pub sink: Box<dyn LearningSink>,
    /// Profile persistence.
    pub store: Box<dyn ProfileStore>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            detector: Box::new(NoCollisions),
            predictor: Box::new(NeverDangerous),
            executor: Box::new(IdealExecutor),
            sink: Box::new(TracingSink),
            store: Box::new(MemoryProfileStore::new()),
        }
    }
}

impl Collaborators {
    /// Replace the collision detector.
    #[must_use]
    pub fn with_detector(mut self, detector: impl CollisionDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    /// Replace the danger-zone predictor.
    #[must_use]
    pub fn with_predictor(mut self, predictor: impl DangerZonePredictor + 'static) -> Self {
        self.predictor = Box::new(predictor);
        self
    }

    /// Replace the motion executor.
    #[must_use]
    pub fn with_executor(mut self, executor: impl MotionExecutor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    /// Replace the learning sink.
    #[must_use]
    pub fn with_sink(mut self, sink: impl LearningSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Replace the profile store.
    #[must_use]
    pub fn with_store(mut self, store: impl ProfileStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }
}

// ─── State ──────────────────────────────────────────────────────────

/// Mutable simulation state of one machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationState {
    /// Current joint values.
    pub joints: JointValues,
    /// Impulses carried into the next step.
    pub warm_start: WarmStart,
    /// A move is in progress.
    pub running: bool,
    /// Moves that reached the executor.
    pub move_count: u64,
}

/// Simulation context of one machine.
pub struct MachineSimulator {
    machine_id: MachineId,
    model: Arc<KinematicModel>,
    config: TwinConfig,
    solver: ConstraintSolver,
    profiles: AxisProfiles,
    state: SimulationState,
    phases: PhaseMachine,
    collaborators: Collaborators,
    cancel: CancelToken,
}

impl std::fmt::Debug for MachineSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineSimulator")
            .field("machine_id", &self.machine_id)
            .field("model", &self.model.name())
            .field("phase", &self.phases.phase())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl MachineSimulator {
    /// Create a simulator at the model's home position.
    ///
    /// Previously learned profiles are loaded from the store; a failing store
    /// is logged and the simulator starts from defaults.
    pub fn new(
        machine_id: impl Into<MachineId>,
        model: Arc<KinematicModel>,
        config: &TwinConfig,
        collaborators: Collaborators,
    ) -> Self {
        let machine_id = machine_id.into();
        let mut profiles = AxisProfiles::new(&model, &config.learning);
        match collaborators.store.load(&machine_id) {
            Ok(Some(stored)) => {
                info!(
                    "[{machine_id}] restored {} learned axis profiles",
                    stored.axes.len()
                );
                profiles.restore(stored);
            }
            Ok(None) => debug!("[{machine_id}] no stored profiles"),
            Err(e) => warn!("[{machine_id}] failed to load profiles: {e}"),
        }

        let state = SimulationState {
            joints: model.home(),
            ..SimulationState::default()
        };

        info!(
            "[{machine_id}] simulator ready: model '{}' ({:?}, {} joints)",
            model.name(),
            model.topology(),
            model.joint_count()
        );

        Self {
            machine_id,
            solver: ConstraintSolver::new(config.solver),
            config: config.clone(),
            model,
            profiles,
            state,
            phases: PhaseMachine::new(),
            collaborators,
            cancel: CancelToken::new(),
        }
    }

    /// Machine id.
    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    /// Kinematic model.
    pub fn model(&self) -> &Arc<KinematicModel> {
        &self.model
    }

    /// Current simulation state.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Current pipeline phase.
    pub fn phase(&self) -> StepPhase {
        self.phases.phase()
    }

    /// Token that cancels moves of this simulator.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Axis profiles.
    pub fn profiles(&self) -> &AxisProfiles {
        &self.profiles
    }

    /// Profile used for `axis`.
    pub fn get_profile(&self, axis: &str) -> AxisBehaviorProfile {
        self.profiles.get_profile(axis)
    }

    /// Place the machine at `joints` without running the pipeline.
    ///
    /// Missing values keep their current position. Extra values are ignored.
    pub fn set_joints(&mut self, joints: &[f64]) {
        for (dst, src) in self.state.joints.iter_mut().zip(joints) {
            *dst = *src;
        }
        self.state.warm_start.clear();
    }

    /// Evaluate `joints` without moving.
    pub fn check_position_safety(&self, joints: &JointValues) -> SafetyReport {
        safety::check_position_safety(
            &self.machine_id,
            &self.model,
            joints,
            self.collaborators.detector.as_ref(),
            self.collaborators.predictor.as_ref(),
            &self.config.safety,
        )
    }

    /// Run one move through the full pipeline.
    pub fn execute_move(&mut self, command: &MoveCommand) -> StepResult {
        let cancel = self.cancel.clone();
        self.execute_move_with_cancel(command, &cancel)
    }

    /// Run one move, checking `cancel` before execution starts.
    ///
    /// A cancelled move leaves the simulation state untouched and consumes
    /// the cancellation request.
    pub fn execute_move_with_cancel(
        &mut self,
        command: &MoveCommand,
        cancel: &CancelToken,
    ) -> StepResult {
        let mut result = StepResult::default();
        let start = self.state.joints.clone();
        self.state.running = true;
        self.transition(PhaseEvent::Start);
        debug!("[{}] move #{}", self.machine_id, self.state.move_count + 1);

        // ─── Predicting ───
        let preview = self.resolve_target(command, &start).0;
        let prediction = self
            .collaborators
            .predictor
            .predict(&self.machine_id, &preview);
        if prediction.likely {
            warn!(
                "[{}] danger zone predicted (confidence {:.2})",
                self.machine_id, prediction.confidence
            );
            result.warnings.push(StepWarning::DangerZonePredicted {
                confidence: prediction.confidence,
            });
        }
        self.transition(PhaseEvent::Validate);

        // ─── Validating ───
        let (mut target, target_warnings) = self.resolve_target(command, &start);
        result.warnings.extend(target_warnings);

        let mut limits = build_constraints(&[], &self.model, &target, &self.config.solver);
        let limit_outcome = self.solver.solve_default(&mut limits, &self.state.warm_start);
        for (idx, value) in limit_outcome.corrected_joints() {
            if let Some(slot) = target.get_mut(idx) {
                *slot = value;
            }
        }
        result.constraints.extend(limit_outcome.resolved.iter().cloned());
        result.warnings.extend(limit_outcome.warnings.iter().cloned());

        result.warnings.extend(self.feed_warnings(command.feed_rate, &start, &target));
        result.predicted_time =
            self.predict_time(command.feed_rate, &start, &target, &mut result.warnings);

        if cancel.is_cancelled() {
            cancel.reset();
            self.transition(PhaseEvent::Abort);
            self.state.running = false;
            info!("[{}] move cancelled before execution", self.machine_id);
            result.cancelled = true;
            result.final_joints = start;
            return result;
        }
        self.transition(PhaseEvent::Execute);

        // ─── Executing ───
        let report = self.collaborators.executor.execute(&MotionRequest {
            machine_id: &self.machine_id,
            from: &start,
            to: &target,
            feed_rate: command.feed_rate,
            predicted_time: result.predicted_time,
        });
        let fraction = report.fraction.clamp(0.0, 1.0);
        let reached = if report.reached.len() == target.len() {
            report.reached
        } else {
            warn!(
                "[{}] executor reported {} joint values, expected {}",
                self.machine_id,
                report.reached.len(),
                target.len()
            );
            interpolate(&start, &target, fraction)
        };
        let complete = fraction >= 1.0;
        if !complete {
            let reason = report.reason.unwrap_or_else(|| "stopped".to_string());
            warn!(
                "[{}] move stopped at {:.1}%: {reason}",
                self.machine_id,
                fraction * 100.0
            );
            result
                .warnings
                .push(StepWarning::ExecutionIncomplete { fraction, reason });
        }
        result.actual_time = report.duration;
        self.state.joints = reached;
        self.state.move_count += 1;
        self.transition(PhaseEvent::Resolve);

        // ─── Resolving ───
        let pose = forward(&self.model, &self.state.joints);
        let collisions = self.collaborators.detector.detect(&CollisionQuery {
            model: &self.model,
            joints: &self.state.joints,
            pose: &pose,
            tool_id: command.tool_id.as_deref(),
            holder_id: command.holder_id.as_deref(),
        });
        let mut constraints = build_constraints(
            &collisions,
            &self.model,
            &self.state.joints,
            &self.config.solver,
        );
        let outcome = self.solver.solve_default(&mut constraints, &self.state.warm_start);
        for (idx, value) in outcome.corrected_joints() {
            if let Some(slot) = self.state.joints.get_mut(idx) {
                *slot = value;
            }
        }
        if outcome.diverged() {
            warn!(
                "[{}] constraint solve diverged, residual {:.5} mm",
                self.machine_id, outcome.max_residual
            );
        }

        let mut warm_start = limit_outcome.warm_start;
        warm_start.extend(outcome.warm_start);
        self.state.warm_start = warm_start;

        result.constraints.extend(outcome.resolved);
        result.warnings.extend(outcome.warnings);
        result.collisions = collisions;
        self.transition(PhaseEvent::Complete);

        // ─── Learn feedback ───
        self.feed_back(command.feed_rate, &start, &result, complete);

        result.success = complete;
        result.final_joints = self.state.joints.clone();
        self.state.running = false;
        info!(
            "[{}] move done: predicted {:.3}s, actual {:.3}s, {} contacts, {} warnings",
            self.machine_id,
            result.predicted_time,
            result.actual_time,
            result.collisions.len(),
            result.warnings.len()
        );
        result
    }

    // ─── Pipeline helpers ───

    fn transition(&mut self, event: PhaseEvent) {
        if let TransitionResult::Rejected(reason) = self.phases.handle_event(event) {
            warn!("[{}] phase transition {event:?}: {reason}", self.machine_id);
        }
    }

    /// Target joint values for `command`, starting from `start`.
    fn resolve_target(
        &self,
        command: &MoveCommand,
        start: &JointValues,
    ) -> (JointValues, Vec<StepWarning>) {
        match &command.target {
            MoveTarget::Joints(targets) => {
                let mut joints = start.clone();
                let mut warnings = Vec::new();
                for (name, value) in targets {
                    match self.model.index_of(name) {
                        Some(idx) if value.is_finite() => joints[idx] = *value,
                        Some(_) => warn!("[{}] ignoring non-finite {name} target", self.machine_id),
                        None => {
                            warn!("[{}] unknown joint '{name}'", self.machine_id);
                            warnings.push(StepWarning::UnknownJoint(name.clone()));
                        }
                    }
                }
                (joints, warnings)
            }
            MoveTarget::Pose(pose) => {
                let solution = inverse_with_tolerance(
                    &self.model,
                    pose,
                    start,
                    self.config.kinematics.singularity_tilt_deg,
                );
                (solution.joints, solution.warnings)
            }
        }
    }

    /// `FeedRateLimited` for every moving joint slower than the requested feed.
    fn feed_warnings(
        &self,
        feed_rate: Option<f64>,
        start: &JointValues,
        target: &JointValues,
    ) -> Vec<StepWarning> {
        let Some(requested) = feed_rate else {
            return Vec::new();
        };
        self.model
            .joints()
            .iter()
            .zip(start.iter().zip(target.iter()))
            .filter(|(joint, (from, to))| {
                (*to - *from).abs() > MOVE_EPSILON && requested > joint.max_velocity
            })
            .map(|(joint, _)| {
                debug!(
                    "[{}] feed {requested:.1} limited to {} max {:.1}",
                    self.machine_id, joint.name, joint.max_velocity
                );
                StepWarning::FeedRateLimited {
                    joint: joint.name.clone(),
                    requested,
                    limit: joint.max_velocity,
                }
            })
            .collect()
    }

    /// Slowest axis decides the move time.
    ///
    /// Axes whose profile cannot be timed are predicted from default dynamics
    /// and reported as `PredictionUncertain`.
    fn predict_time(
        &self,
        feed_rate: Option<f64>,
        start: &JointValues,
        target: &JointValues,
        warnings: &mut Vec<StepWarning>,
    ) -> f64 {
        let feed = feed_rate.unwrap_or(0.0);
        let mut slowest = 0.0f64;
        for (name, distance) in self.axis_moves(start, target) {
            let profile = self.profiles.get_profile(name);
            let t = match try_predict_motion_time(&profile, distance, feed) {
                Some(t) => t,
                None => {
                    warn!(
                        "[{}] axis {name} profile unusable (v={} a={}), timing from defaults",
                        self.machine_id, profile.max_velocity, profile.max_acceleration
                    );
                    warnings.push(StepWarning::PredictionUncertain {
                        axis: name.to_string(),
                    });
                    predict_motion_time(&profile, distance, feed)
                }
            };
            if t > slowest {
                slowest = t;
            }
        }
        slowest
    }

    /// `(axis name, signed distance)` of every joint that moves.
    fn axis_moves<'a>(
        &'a self,
        start: &'a JointValues,
        target: &'a JointValues,
    ) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.model
            .joints()
            .iter()
            .zip(start.iter().zip(target.iter()))
            .map(|(joint, (from, to))| (joint.name.as_str(), to - from))
            .filter(|(_, d)| d.abs() > MOVE_EPSILON)
    }

    /// Emit learning events and fold the move into the local profiles.
    fn feed_back(
        &mut self,
        feed_rate: Option<f64>,
        start: &JointValues,
        result: &StepResult,
        complete: bool,
    ) {
        let feed = feed_rate.unwrap_or(0.0);
        let scale = if result.predicted_time > 0.0 {
            result.actual_time / result.predicted_time
        } else {
            1.0
        };

        let moves: Vec<(String, f64)> = self
            .axis_moves(start, &self.state.joints)
            .map(|(name, d)| (name.to_string(), d))
            .collect();

        let learn = complete && self.config.learning.learn_from_moves;
        for (axis, distance) in &moves {
            let profile = self.profiles.get_profile(axis);
            let velocity = if feed > 0.0 {
                feed.min(profile.max_velocity)
            } else {
                profile.max_velocity
            };
            let duration = predict_motion_time(&profile, *distance, feed) * scale;

            self.collaborators.sink.move_completed(MoveCompleted {
                machine_id: self.machine_id.clone(),
                axis: axis.clone(),
                distance: distance.abs(),
                duration,
                following_error: predict_following_error(&profile, velocity),
            });

            if learn {
                self.profiles.record(
                    axis,
                    &AxisObservation {
                        distance: distance.abs(),
                        duration,
                        commanded_velocity: velocity,
                        ..AxisObservation::default()
                    },
                );
            }
        }

        if learn && !moves.is_empty() {
            if let Err(e) = self
                .collaborators
                .store
                .save(&self.machine_id, self.profiles.snapshot())
            {
                warn!("[{}] failed to save profiles: {e}", self.machine_id);
            }
        }

        for resolved in &result.constraints {
            if let ResolvedKind::Contact {
                body_a,
                body_b,
                initial_penetration,
                ..
            } = &resolved.kind
            {
                self.collaborators.sink.collision_observed(CollisionObserved {
                    machine_id: self.machine_id.clone(),
                    body_a: body_a.clone(),
                    body_b: body_b.clone(),
                    penetration_depth: *initial_penetration,
                    joint_values: self.state.joints.clone(),
                });
            }
        }
    }
}

/// Linear interpolation between two joint vectors.
fn interpolate(from: &JointValues, to: &JointValues, fraction: f64) -> JointValues {
    let mut out = from.clone();
    for (dst, (a, b)) in out.iter_mut().zip(from.iter().zip(to.iter())) {
        *dst = a + (b - a) * fraction;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::registry::{cartesian, trunnion_ac};
    use crate::orchestrator::collaborators::ExecutionReport;
    use evo_twin_common::kinematics::Pose;
    use evo_twin_common::warning::WarningFlags;

    fn simulator(model: KinematicModel) -> MachineSimulator {
        MachineSimulator::new(
            "m1",
            Arc::new(model),
            &TwinConfig::default(),
            Collaborators::default(),
        )
    }

    struct HalfWay;

    impl MotionExecutor for HalfWay {
        fn execute(&mut self, request: &MotionRequest<'_>) -> ExecutionReport {
            ExecutionReport {
                reached: interpolate(request.from, request.to, 0.5),
                fraction: 0.5,
                duration: request.predicted_time * 0.5,
                reason: Some("feed hold".into()),
            }
        }
    }

    #[test]
    fn cartesian_move_predicts_trapezoidal_time() {
        let mut sim = simulator(cartesian().unwrap());
        let result = sim.execute_move(&MoveCommand::joints([("X", 100.0)]).with_feed(3000.0));

        assert!(result.success);
        assert!((result.predicted_time - 2.01).abs() < 2.01 * 0.01);
        assert_eq!(result.final_joints[0], 100.0);
        assert!(result.warnings.is_empty());
        assert_eq!(sim.phase(), StepPhase::Idle);
        assert!(!sim.state().running);
        assert_eq!(sim.state().move_count, 1);
    }

    #[test]
    fn commanded_limit_violation_is_clamped() {
        let mut sim = simulator(trunnion_ac().unwrap());
        let result = sim.execute_move(&MoveCommand::joints([("A", 150.0)]));

        let a = sim.model().index_of("A").unwrap();
        assert_eq!(result.final_joints[a], 120.0);
        let violations = result
            .warnings
            .iter()
            .filter(|w| matches!(w, StepWarning::JointLimitViolation { .. }))
            .count();
        assert_eq!(violations, 1);
        assert!(result.success);
    }

    #[test]
    fn unknown_joint_and_feed_limit_warnings() {
        let mut sim = simulator(cartesian().unwrap());
        let result = sim.execute_move(&MoveCommand::joints([("Q", 1.0), ("Y", 10.0)]).with_feed(90_000.0));

        let flags = result.flags();
        assert!(flags.contains(WarningFlags::UNKNOWN_JOINT | WarningFlags::FEED_LIMITED));
        assert_eq!(result.final_joints[1], 10.0);
    }

    #[test]
    fn cancelled_move_changes_nothing() {
        let mut sim = simulator(cartesian().unwrap());
        let token = sim.cancel_token();
        token.cancel();

        let before = sim.state().clone();
        let result = sim.execute_move(&MoveCommand::joints([("X", 50.0)]));
        assert!(result.cancelled);
        assert!(!result.success);
        assert_eq!(sim.state(), &before);
        assert_eq!(sim.phase(), StepPhase::Idle);
        assert!(!token.is_cancelled());

        let result = sim.execute_move(&MoveCommand::joints([("X", 50.0)]));
        assert!(result.success);
        assert_eq!(sim.state().joints[0], 50.0);
    }

    #[test]
    fn partial_execution_still_resolves() {
        let mut sim = MachineSimulator::new(
            "m1",
            Arc::new(cartesian().unwrap()),
            &TwinConfig::default(),
            Collaborators::default().with_executor(HalfWay),
        );
        let result = sim.execute_move(&MoveCommand::joints([("X", 100.0)]));

        assert!(!result.success);
        assert!(result.flags().has_blocking());
        assert_eq!(result.final_joints[0], 50.0);
        assert_eq!(sim.phase(), StepPhase::Idle);
        assert!(sim.profiles().learned("X").is_none());
    }

    #[test]
    fn pose_move_uses_inverse_kinematics() {
        let mut sim = simulator(trunnion_ac().unwrap());
        let c = sim.model().index_of("C").unwrap();
        sim.set_joints(&[0.0, 0.0, 0.0, 0.0, 45.0]);
        assert_eq!(sim.state().joints[c], 45.0);

        let result = sim.execute_move(&MoveCommand::pose(Pose::target(
            [0.0, 0.0, 0.0],
            [0.0, 0.0, -1.0],
        )));
        assert!((result.final_joints[c] - 45.0).abs() < 1e-9);
        assert!(result.flags().contains(WarningFlags::SINGULAR));
    }

    #[test]
    fn completed_moves_are_learned() {
        let mut sim = simulator(cartesian().unwrap());
        for target in [100.0, 0.0, 100.0] {
            sim.execute_move(&MoveCommand::joints([("X", target)]).with_feed(3000.0));
        }
        let learned = sim.profiles().learned("X").unwrap();
        assert_eq!(learned.observation_count, 3);
        assert!(sim.profiles().learned("Y").is_none());
    }

    #[test]
    fn stored_profile_without_acceleration_is_not_used() {
        use evo_twin_common::profile::{AxisBehaviorProfile, MachineProfiles};

        let mut stored = MachineProfiles::new();
        stored.axes.insert(
            "X".to_string(),
            AxisBehaviorProfile {
                max_acceleration: 0.0,
                observation_count: 5,
                ..Default::default()
            },
        );
        let mut store = MemoryProfileStore::new();
        store.save("m1", &stored).unwrap();

        let mut sim = MachineSimulator::new(
            "m1",
            Arc::new(cartesian().unwrap()),
            &TwinConfig::default(),
            Collaborators::default().with_store(store),
        );
        assert!(sim.profiles().learned("X").is_none());

        let seeded = AxisBehaviorProfile::for_joint(&sim.model().joints()[0]);
        let expected = predict_motion_time(&seeded, 100.0, 6000.0);
        let result = sim.execute_move(&MoveCommand::joints([("X", 100.0)]).with_feed(6000.0));
        assert!(result.success);
        assert!(result.predicted_time > 0.0);
        assert!((result.predicted_time - expected).abs() < 1e-12);
        assert!(!result.flags().contains(WarningFlags::UNCERTAIN));
    }
}
