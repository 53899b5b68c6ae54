//! Kinematics root.
//!
//! Model templates and registry, forward kinematics (joints → TCP pose) and
//! inverse kinematics (TCP pose → joints) over every supported topology.

pub mod forward;
pub mod inverse;
pub mod registry;

pub use forward::{forward, rotation};
pub use inverse::{inverse, inverse_with_tolerance, IkSolution};
pub use registry::ModelRegistry;
