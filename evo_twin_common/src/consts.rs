//! System-wide constants for the EVO twin workspace.
//!
//! Single source of truth for numeric limits and documented defaults.
//! Configuration structs fall back to these values when a field is omitted.

use static_assertions::const_assert;

// ─── Kinematics ─────────────────────────────────────────────────────

/// Maximum number of joints in one kinematic model.
pub const MAX_JOINTS: usize = 8;

/// Default tool-axis direction before any rotary joint is applied.
pub const DEFAULT_TOOL_AXIS: [f64; 3] = [0.0, 0.0, -1.0];

/// Tilt angle below which the rotary azimuth is indeterminate [deg].
pub const SINGULARITY_TILT_DEG: f64 = 1e-3;

/// Tolerance for unit-length and orthogonality checks on joint directions.
pub const DIRECTION_TOLERANCE: f64 = 1e-9;

// ─── Axis Behavior ──────────────────────────────────────────────────

/// Default maximum velocity [mm/min or deg/min].
pub const DEFAULT_MAX_VELOCITY: f64 = 10_000.0;

/// Default maximum acceleration [mm/s² or deg/s²].
pub const DEFAULT_MAX_ACCELERATION: f64 = 5_000.0;

/// Default maximum jerk [mm/s³].
pub const DEFAULT_MAX_JERK: f64 = 50_000.0;

/// Default servo lag [s].
pub const DEFAULT_SERVO_LAG: f64 = 0.002;

/// Default following error at maximum velocity [mm].
pub const DEFAULT_FOLLOWING_ERROR: f64 = 0.01;

/// Default reversal backlash [mm].
pub const DEFAULT_BACKLASH: f64 = 0.005;

/// Default repeatability (2σ) [mm].
pub const DEFAULT_REPEATABILITY: f64 = 0.003;

/// Default thermal expansion coefficient [1/°C] (steel).
pub const DEFAULT_THERMAL_COEFFICIENT: f64 = 11.5e-6;

/// Rolling window length for backlash and repeatability samples.
pub const SAMPLE_WINDOW: usize = 32;

/// Observations required before a learned profile replaces the default.
pub const MIN_OBSERVATIONS_DEFAULT: u64 = 3;

/// Lower bound on the merge weight once many observations have accumulated.
pub const LEARNING_RATE_FLOOR_DEFAULT: f64 = 0.05;

// ─── Constraint Solver ──────────────────────────────────────────────

/// Default Gauss-Seidel iterations per step.
pub const SOLVER_ITERATIONS_DEFAULT: usize = 10;

/// Upper bound accepted for configured solver iterations.
pub const SOLVER_ITERATIONS_MAX: usize = 1000;

/// Default solver time step [s].
pub const SOLVER_DT_DEFAULT: f64 = 0.001;

/// Default contact stiffness [N/mm].
pub const CONTACT_STIFFNESS_DEFAULT: f64 = 1e5;

/// Default contact damping [N·s/mm].
pub const CONTACT_DAMPING_DEFAULT: f64 = 1e3;

/// Default Baumgarte stabilization factor.
pub const BAUMGARTE_DEFAULT: f64 = 0.2;

/// Default Coulomb friction coefficient.
pub const FRICTION_DEFAULT: f64 = 0.3;

/// Default effective mass of a constraint row [kg].
pub const EFFECTIVE_MASS_DEFAULT: f64 = 0.5;

/// Residual penetration tolerance [mm].
pub const PENETRATION_TOLERANCE_DEFAULT: f64 = 0.01;

/// Decay applied to warm-start impulses carried from the previous step.
pub const WARM_START_DECAY_DEFAULT: f64 = 0.9;

// ─── Safety ─────────────────────────────────────────────────────────

/// Predictor confidence at which a danger prediction marks a position unsafe.
pub const DANGER_CONFIDENCE_DEFAULT: f64 = 0.5;

/// Fraction of a joint's range treated as the near-limit margin.
pub const LIMIT_MARGIN_DEFAULT: f64 = 0.02;

/// Penetration depth mapped to danger level 1.0 [mm].
pub const PENETRATION_SCALE_DEFAULT: f64 = 1.0;

const_assert!(MAX_JOINTS >= 5 && MAX_JOINTS <= 16);
const_assert!(SAMPLE_WINDOW >= 2);
const_assert!(SOLVER_ITERATIONS_DEFAULT <= SOLVER_ITERATIONS_MAX);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        assert!(DEFAULT_MAX_VELOCITY > 0.0);
        assert!(DEFAULT_MAX_ACCELERATION > 0.0);
        assert!(WARM_START_DECAY_DEFAULT > 0.0 && WARM_START_DECAY_DEFAULT < 1.0);
        assert!(BAUMGARTE_DEFAULT > 0.0 && BAUMGARTE_DEFAULT <= 1.0);
        assert!(LEARNING_RATE_FLOOR_DEFAULT > 0.0 && LEARNING_RATE_FLOOR_DEFAULT < 1.0);
    }

    #[test]
    fn default_tool_axis_is_unit() {
        let [i, j, k] = DEFAULT_TOOL_AXIS;
        assert!(((i * i + j * j + k * k).sqrt() - 1.0).abs() < 1e-12);
    }
}
