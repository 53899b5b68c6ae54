//! Construction-time error taxonomy.
//!
//! `ConfigurationError` is the only hard failure of the twin core. It is
//! raised while a `KinematicModel` is being built and never during a step.
//! Per-step anomalies are reported as [`crate::warning::StepWarning`] values.

use thiserror::Error;

use crate::kinematics::Topology;

/// Malformed kinematic model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// A joint required by the topology is absent.
    #[error("{topology:?} topology requires joint '{joint}'")]
    MissingJoint {
        /// Topology being built.
        topology: Topology,
        /// Name of the missing joint.
        joint: &'static str,
    },

    /// A required joint exists but has the wrong kind (linear vs rotary).
    #[error("joint '{joint}' must be {expected}")]
    WrongJointKind {
        /// Joint name.
        joint: String,
        /// Expected kind ("linear" or "rotary").
        expected: &'static str,
    },

    /// Two joints share a name.
    #[error("duplicate joint name '{0}'")]
    DuplicateJoint(String),

    /// Joint limits are inverted or not finite.
    #[error("joint '{joint}' has invalid limits [{min}, {max}]")]
    InvalidLimits {
        /// Joint name.
        joint: String,
        /// Lower limit.
        min: f64,
        /// Upper limit.
        max: f64,
    },

    /// Joint direction or rotation axis is not a unit vector.
    #[error("joint '{0}' direction must be a unit vector")]
    InvalidDirection(String),

    /// Linear joint directions are not mutually orthogonal.
    #[error("linear joints '{0}' and '{1}' are not orthogonal")]
    NonOrthogonalAxes(String, String),

    /// Rotary axis does not match what the topology expects.
    #[error("joint '{joint}' rotation axis is not supported by the {topology:?} topology")]
    UnsupportedRotaryAxis {
        /// Topology being built.
        topology: Topology,
        /// Joint name.
        joint: String,
    },

    /// Dynamic limits must be positive.
    #[error("joint '{joint}' {field} must be positive, got {value}")]
    NonPositiveDynamics {
        /// Joint name.
        joint: String,
        /// Offending field.
        field: &'static str,
        /// Value supplied.
        value: f64,
    },

    /// More joints than the fixed joint capacity.
    #[error("model has {count} joints (max {max})")]
    TooManyJoints {
        /// Joints supplied.
        count: usize,
        /// Capacity.
        max: usize,
    },

    /// Unknown topology name in configuration.
    #[error("unknown topology '{0}'")]
    UnknownTopology(String),

    /// A model with this name is already registered.
    #[error("model '{0}' is already registered")]
    DuplicateModel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_joint() {
        let e = ConfigurationError::MissingJoint {
            topology: Topology::Trunnion,
            joint: "A",
        };
        assert_eq!(e.to_string(), "Trunnion topology requires joint 'A'");

        let e = ConfigurationError::InvalidLimits {
            joint: "X".to_string(),
            min: 10.0,
            max: -10.0,
        };
        assert!(e.to_string().contains("'X'"));
    }
}
