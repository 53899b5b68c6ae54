//! Contact and joint-limit constraints.
//!
//! The builder turns collision-detector output and joint-limit violations
//! into a per-step constraint set; the solver resolves it with a fixed number
//! of Gauss-Seidel passes, warm-started from the previous step.

pub mod builder;
pub mod friction;
pub mod solver;

pub use builder::{build_constraints, tangent_basis};
pub use friction::FrictionCone;
pub use solver::{ConstraintSolver, SolveOutcome};
