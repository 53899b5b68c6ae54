//! # EVO Twin Library
//!
//! Kinematics, axis dynamics and contact-constraint core of the EVO
//! machine-tool digital twin.
//!
//! # Module Structure
//!
//! - [`kinematics`] - Model templates and registry, forward and inverse kinematics
//! - [`dynamics`] - Axis behavior profiles: timing prediction, learning, persistence
//! - [`constraint`] - Contact/limit constraint builder and Gauss-Seidel solver
//! - [`orchestrator`] - Per-machine move pipeline, safety check, simulation hub
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                        SimulationHub                               │
//! │   machine id ──► MachineSimulator (one per machine, Send)          │
//! │                  │                                                 │
//! │   Predicting ────┼─► DangerZonePredictor        (injected)         │
//! │   Validating ────┼─► inverse kinematics, limit solve, timing       │
//! │   Executing  ────┼─► MotionExecutor             (injected)         │
//! │   Resolving  ────┼─► CollisionDetector ─► build ─► solve           │
//! │   Feedback   ────┴─► LearningSink, AxisProfiles ─► ProfileStore    │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use evo_twin::orchestrator::{Collaborators, SimulationHub};
//! use evo_twin_common::prelude::*;
//!
//! let mut hub = SimulationHub::with_templates(TwinConfig::default()).unwrap();
//! hub.add_machine("mill-1", "cartesian", Collaborators::default()).unwrap();
//!
//! let result = hub
//!     .execute_move("mill-1", &MoveCommand::joints([("X", 100.0)]).with_feed(3000.0))
//!     .unwrap();
//! assert!(result.success);
//! ```

#![warn(missing_docs)]

pub mod constraint;
pub mod dynamics;
pub mod kinematics;
pub mod orchestrator;
