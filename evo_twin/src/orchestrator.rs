//! Simulation orchestrator root.
//!
//! One [`MachineSimulator`] per machine runs the per-move pipeline
//! (predict → validate → execute → resolve → learn-feedback) against
//! collaborators injected at construction. [`SimulationHub`] keys
//! simulators by machine id.

pub mod collaborators;
pub mod hub;
pub mod machine;
pub mod phase;
pub mod safety;

pub use collaborators::{
    ChannelSink, CollisionDetector, CollisionQuery, DangerZonePredictor, ExecutionReport,
    IdealExecutor, LearningSink, MotionExecutor, MotionRequest, NeverDangerous, NoCollisions,
    TablePlaneDetector, TracingSink,
};
pub use hub::{SimError, SimulationHub};
pub use machine::{CancelToken, Collaborators, MachineSimulator, SimulationState};
pub use phase::{PhaseEvent, PhaseMachine, StepPhase, TransitionResult};
pub use safety::check_position_safety;
