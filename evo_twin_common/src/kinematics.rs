//! Kinematic model types.
//!
//! A [`KinematicModel`] is an ordered set of joints plus the topology that
//! says how they compose. Models are validated once in [`KinematicModel::new`]
//! and are immutable afterwards; simulations share them through `Arc`.
//!
//! Units: linear joints in mm, rotary joints in degrees.

use std::ops::{Deref, DerefMut};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_MAX_ACCELERATION, DEFAULT_MAX_VELOCITY, DEFAULT_TOOL_AXIS, DIRECTION_TOLERANCE,
    MAX_JOINTS,
};
use crate::error::ConfigurationError;

// ─── Topology ───────────────────────────────────────────────────────

/// Axis topology of a machine tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Three linear axes X, Y, Z.
    Cartesian,
    /// Table tilts about X (A) and rotates about Z (C).
    Trunnion,
    /// Spindle head tilts about Y (B), table rotates about Z (C).
    HeadTable,
    /// Two linear axes X, Z with an optional spindle C.
    Lathe,
    /// Milling head B and turning spindle C on an XYZ machine.
    MillTurn,
}

/// Role a required joint plays in a topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointRole {
    /// Translation along an axis.
    Linear,
    /// Tool-axis tilt away from the machine Z axis.
    Tilt,
    /// Rotation about the machine Z axis.
    Azimuth,
}

impl Topology {
    /// Joints every model of this topology must declare.
    pub const fn required_joints(self) -> &'static [(&'static str, JointRole)] {
        use JointRole::*;
        match self {
            Self::Cartesian => &[("X", Linear), ("Y", Linear), ("Z", Linear)],
            Self::Trunnion => &[
                ("X", Linear),
                ("Y", Linear),
                ("Z", Linear),
                ("A", Tilt),
                ("C", Azimuth),
            ],
            Self::HeadTable | Self::MillTurn => &[
                ("X", Linear),
                ("Y", Linear),
                ("Z", Linear),
                ("B", Tilt),
                ("C", Azimuth),
            ],
            Self::Lathe => &[("X", Linear), ("Z", Linear)],
        }
    }

    /// True if the tool axis is solved by inverse kinematics (5-axis).
    #[inline]
    pub const fn orients_tool(self) -> bool {
        matches!(self, Self::Trunnion | Self::HeadTable | Self::MillTurn)
    }
}

impl std::str::FromStr for Topology {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cartesian" | "xyz" => Ok(Self::Cartesian),
            "trunnion" | "ac" => Ok(Self::Trunnion),
            "head_table" | "bc" => Ok(Self::HeadTable),
            "lathe" => Ok(Self::Lathe),
            "mill_turn" => Ok(Self::MillTurn),
            _ => Err(ConfigurationError::UnknownTopology(s.to_string())),
        }
    }
}

// ─── Joints ─────────────────────────────────────────────────────────

/// Closed set of joint kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointKind {
    /// Translation along a unit direction.
    Linear {
        /// Unit direction in machine coordinates.
        direction: Vector3<f64>,
    },
    /// Rotation about a unit axis through the origin (or pivot point).
    Rotary {
        /// Unit rotation axis in machine coordinates.
        axis: Vector3<f64>,
    },
}

impl JointKind {
    /// Unit vector carried by the joint.
    #[inline]
    pub fn vector(&self) -> Vector3<f64> {
        match self {
            Self::Linear { direction } => *direction,
            Self::Rotary { axis } => *axis,
        }
    }

    /// True for rotary joints.
    #[inline]
    pub const fn is_rotary(&self) -> bool {
        matches!(self, Self::Rotary { .. })
    }
}

/// Which side of the range a value violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitSide {
    /// Below `min`.
    Lower,
    /// Above `max`.
    Upper,
}

/// Closed joint range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    /// Lower limit.
    pub min: f64,
    /// Upper limit.
    pub max: f64,
}

impl JointLimits {
    /// Create a range.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// True if `value` lies inside the range.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp `value` into the range.
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Violated side and magnitude of the violation, if any.
    pub fn violation(&self, value: f64) -> Option<(LimitSide, f64)> {
        if value < self.min {
            Some((LimitSide::Lower, self.min - value))
        } else if value > self.max {
            Some((LimitSide::Upper, value - self.max))
        } else {
            None
        }
    }

    /// Limit value on the given side.
    #[inline]
    pub const fn bound(&self, side: LimitSide) -> f64 {
        match side {
            LimitSide::Lower => self.min,
            LimitSide::Upper => self.max,
        }
    }

    /// Width of the range.
    #[inline]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// One machine joint.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    /// Axis letter or name ("X", "A", ...).
    pub name: String,
    /// Linear or rotary.
    pub kind: JointKind,
    /// Travel or angle range.
    pub limits: JointLimits,
    /// Maximum velocity [mm/min or deg/min].
    pub max_velocity: f64,
    /// Maximum acceleration [mm/s² or deg/s²].
    pub max_acceleration: f64,
}

impl Joint {
    /// Linear joint with default dynamics.
    pub fn linear(name: &str, direction: [f64; 3], min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: JointKind::Linear {
                direction: Vector3::from(direction),
            },
            limits: JointLimits::new(min, max),
            max_velocity: DEFAULT_MAX_VELOCITY,
            max_acceleration: DEFAULT_MAX_ACCELERATION,
        }
    }

    /// Rotary joint with default dynamics.
    pub fn rotary(name: &str, axis: [f64; 3], min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: JointKind::Rotary {
                axis: Vector3::from(axis),
            },
            limits: JointLimits::new(min, max),
            max_velocity: DEFAULT_MAX_VELOCITY,
            max_acceleration: DEFAULT_MAX_ACCELERATION,
        }
    }

    /// Override dynamic limits.
    #[must_use]
    pub fn with_dynamics(mut self, max_velocity: f64, max_acceleration: f64) -> Self {
        self.max_velocity = max_velocity;
        self.max_acceleration = max_acceleration;
        self
    }
}

// ─── Joint Values ───────────────────────────────────────────────────

/// Joint positions in model joint order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointValues(heapless::Vec<f64, MAX_JOINTS>);

impl JointValues {
    /// `len` zeros (capped at `MAX_JOINTS`).
    pub fn zeros(len: usize) -> Self {
        let mut v = heapless::Vec::new();
        for _ in 0..len.min(MAX_JOINTS) {
            let _ = v.push(0.0);
        }
        Self(v)
    }

    /// Copy from a slice. Returns `None` if it exceeds `MAX_JOINTS`.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        let mut v = heapless::Vec::new();
        for &x in values {
            v.push(x).ok()?;
        }
        Some(Self(v))
    }

    /// Value of joint `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }
}

impl Deref for JointValues {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl DerefMut for JointValues {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.0
    }
}

// ─── Pose ───────────────────────────────────────────────────────────

/// Tool-center-point pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// TCP position [mm].
    pub position: Vector3<f64>,
    /// Unit tool-axis vector (i, j, k).
    pub tool_axis: Vector3<f64>,
    /// Joint values that produced the pose (empty for a requested target).
    pub joints: JointValues,
}

impl Pose {
    /// Target pose without joint values. The tool axis is normalized.
    pub fn target(position: [f64; 3], tool_axis: [f64; 3]) -> Self {
        let axis = Vector3::from(tool_axis);
        let norm = axis.norm();
        Self {
            position: Vector3::from(position),
            tool_axis: if norm > 0.0 {
                axis / norm
            } else {
                Vector3::from(DEFAULT_TOOL_AXIS)
            },
            joints: JointValues::default(),
        }
    }

    /// Euclidean distance between TCP positions [mm].
    #[inline]
    pub fn position_error(&self, other: &Pose) -> f64 {
        (self.position - other.position).norm()
    }

    /// Angle between tool axes [rad].
    #[inline]
    pub fn angular_error(&self, other: &Pose) -> f64 {
        self.tool_axis.angle(&other.tool_axis)
    }
}

// ─── Kinematic Model ────────────────────────────────────────────────

/// Validated, immutable kinematic model.
#[derive(Debug, Clone)]
pub struct KinematicModel {
    name: String,
    topology: Topology,
    joints: Vec<Joint>,
    pivot_point: Option<Vector3<f64>>,
    tool_center_offset: Vector3<f64>,
    rotation_order: Vec<usize>,
    tilt_joint: Option<usize>,
    azimuth_joint: Option<usize>,
    tilt_azimuth_offset: f64,
}

impl KinematicModel {
    /// Build and validate a model.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if a topology joint is missing or has the
    /// wrong kind, names repeat, limits are inverted, dynamics are not positive,
    /// directions are not unit vectors, linear directions are not orthogonal,
    /// rotary axes do not fit the topology, or there are too many joints.
    pub fn new(
        name: &str,
        topology: Topology,
        joints: Vec<Joint>,
        pivot_point: Option<[f64; 3]>,
        tool_center_offset: [f64; 3],
    ) -> Result<Self, ConfigurationError> {
        if joints.len() > MAX_JOINTS {
            return Err(ConfigurationError::TooManyJoints {
                count: joints.len(),
                max: MAX_JOINTS,
            });
        }

        for (i, joint) in joints.iter().enumerate() {
            if joints[..i].iter().any(|j| j.name == joint.name) {
                return Err(ConfigurationError::DuplicateJoint(joint.name.clone()));
            }
            validate_joint(joint)?;
        }

        // Linear directions must be orthonormal so IK can project onto them.
        let linear: Vec<&Joint> = joints.iter().filter(|j| !j.kind.is_rotary()).collect();
        for (i, a) in linear.iter().enumerate() {
            for b in &linear[i + 1..] {
                if a.kind.vector().dot(&b.kind.vector()).abs() > DIRECTION_TOLERANCE.sqrt() {
                    return Err(ConfigurationError::NonOrthogonalAxes(
                        a.name.clone(),
                        b.name.clone(),
                    ));
                }
            }
        }

        let index_of = |name: &str| joints.iter().position(|j| j.name == name);
        let mut tilt_joint = None;
        let mut azimuth_joint = None;
        for &(required, role) in topology.required_joints() {
            let idx = index_of(required).ok_or(ConfigurationError::MissingJoint {
                topology,
                joint: required,
            })?;
            let joint = &joints[idx];
            match role {
                JointRole::Linear if joint.kind.is_rotary() => {
                    return Err(ConfigurationError::WrongJointKind {
                        joint: joint.name.clone(),
                        expected: "linear",
                    });
                }
                JointRole::Tilt | JointRole::Azimuth if !joint.kind.is_rotary() => {
                    return Err(ConfigurationError::WrongJointKind {
                        joint: joint.name.clone(),
                        expected: "rotary",
                    });
                }
                JointRole::Tilt => tilt_joint = Some(idx),
                JointRole::Azimuth => azimuth_joint = Some(idx),
                JointRole::Linear => {}
            }
        }

        let tool_axis = Vector3::from(DEFAULT_TOOL_AXIS);
        let mut tilt_azimuth_offset = 0.0;
        if let (Some(t), Some(a)) = (tilt_joint, azimuth_joint) {
            let tilt_axis = joints[t].kind.vector();
            let azimuth_axis = joints[a].kind.vector();
            if tilt_axis.dot(&tool_axis).abs() > DIRECTION_TOLERANCE.sqrt() {
                return Err(ConfigurationError::UnsupportedRotaryAxis {
                    topology,
                    joint: joints[t].name.clone(),
                });
            }
            if (azimuth_axis - Vector3::z()).norm() > DIRECTION_TOLERANCE.sqrt() {
                return Err(ConfigurationError::UnsupportedRotaryAxis {
                    topology,
                    joint: joints[a].name.clone(),
                });
            }
            // Direction the tool axis leans for a small positive tilt at C = 0.
            let lean = tilt_axis.cross(&tool_axis);
            tilt_azimuth_offset = lean.y.atan2(lean.x);
        }

        // Tilt first, then azimuth, then any remaining rotary joints in order.
        let mut rotation_order: Vec<usize> = tilt_joint.into_iter().chain(azimuth_joint).collect();
        for (idx, joint) in joints.iter().enumerate() {
            if joint.kind.is_rotary() && !rotation_order.contains(&idx) {
                rotation_order.push(idx);
            }
        }

        Ok(Self {
            name: name.to_string(),
            topology,
            joints,
            pivot_point: pivot_point.map(Vector3::from),
            tool_center_offset: Vector3::from(tool_center_offset),
            rotation_order,
            tilt_joint,
            azimuth_joint,
            tilt_azimuth_offset,
        })
    }

    /// Build from a TOML model description.
    ///
    /// # Errors
    ///
    /// Same as [`KinematicModel::new`].
    pub fn from_config(config: &KinematicModelConfig) -> Result<Self, ConfigurationError> {
        let joints = config
            .joints
            .iter()
            .map(|j| {
                let joint = match j.kind {
                    JointKindTag::Linear => Joint::linear(&j.name, j.direction, j.min, j.max),
                    JointKindTag::Rotary => Joint::rotary(&j.name, j.direction, j.min, j.max),
                };
                joint.with_dynamics(j.max_velocity, j.max_acceleration)
            })
            .collect();
        Self::new(
            &config.name,
            config.topology,
            joints,
            config.pivot_point,
            config.tool_center_offset,
        )
    }

    /// Model name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Topology.
    #[inline]
    pub const fn topology(&self) -> Topology {
        self.topology
    }

    /// Joints in declaration order.
    #[inline]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Number of joints.
    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Index of the joint named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Joint at `index`.
    #[inline]
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    /// Rotation pivot, if the rotary axes do not pass through the origin.
    #[inline]
    pub fn pivot_point(&self) -> Option<Vector3<f64>> {
        self.pivot_point
    }

    /// Offset from the spindle gauge point to the TCP.
    #[inline]
    pub fn tool_center_offset(&self) -> Vector3<f64> {
        self.tool_center_offset
    }

    /// Rotary joint indices in application order.
    #[inline]
    pub fn rotation_order(&self) -> &[usize] {
        &self.rotation_order
    }

    /// Tilt joint (A or B) for 5-axis topologies.
    #[inline]
    pub const fn tilt_joint(&self) -> Option<usize> {
        self.tilt_joint
    }

    /// Azimuth joint (C) for 5-axis topologies.
    #[inline]
    pub const fn azimuth_joint(&self) -> Option<usize> {
        self.azimuth_joint
    }

    /// Azimuth [rad] toward which a positive tilt leans the tool axis at C = 0.
    #[inline]
    pub const fn tilt_azimuth_offset(&self) -> f64 {
        self.tilt_azimuth_offset
    }

    /// Zero-valued joint vector sized for this model.
    pub fn home(&self) -> JointValues {
        JointValues::zeros(self.joints.len())
    }
}

fn validate_joint(joint: &Joint) -> Result<(), ConfigurationError> {
    let JointLimits { min, max } = joint.limits;
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(ConfigurationError::InvalidLimits {
            joint: joint.name.clone(),
            min,
            max,
        });
    }
    for (field, value) in [
        ("max_velocity", joint.max_velocity),
        ("max_acceleration", joint.max_acceleration),
    ] {
        if value <= 0.0 || !value.is_finite() {
            return Err(ConfigurationError::NonPositiveDynamics {
                joint: joint.name.clone(),
                field,
                value,
            });
        }
    }
    if (joint.kind.vector().norm() - 1.0).abs() > DIRECTION_TOLERANCE.sqrt() {
        return Err(ConfigurationError::InvalidDirection(joint.name.clone()));
    }
    Ok(())
}

// ─── Model Config ───────────────────────────────────────────────────

/// Joint kind tag used in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointKindTag {
    /// Linear joint; `direction` is the travel direction.
    Linear,
    /// Rotary joint; `direction` is the rotation axis.
    Rotary,
}

/// One joint in a TOML model description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointConfig {
    /// Joint name.
    pub name: String,
    /// Linear or rotary.
    pub kind: JointKindTag,
    /// Travel direction or rotation axis.
    pub direction: [f64; 3],
    /// Lower limit.
    pub min: f64,
    /// Upper limit.
    pub max: f64,
    /// Maximum velocity [mm/min or deg/min].
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f64,
    /// Maximum acceleration [mm/s² or deg/s²].
    #[serde(default = "default_max_acceleration")]
    pub max_acceleration: f64,
}

fn default_max_velocity() -> f64 {
    DEFAULT_MAX_VELOCITY
}
fn default_max_acceleration() -> f64 {
    DEFAULT_MAX_ACCELERATION
}

/// TOML model description.
///
/// ```toml
/// name = "dmu-50"
/// topology = "trunnion"
/// tool_center_offset = [0.0, 0.0, 0.0]
///
/// [[joints]]
/// name = "X"
/// kind = "linear"
/// direction = [1.0, 0.0, 0.0]
/// min = -250.0
/// max = 250.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinematicModelConfig {
    /// Model name.
    pub name: String,
    /// Topology.
    pub topology: Topology,
    /// Joints in order.
    pub joints: Vec<JointConfig>,
    /// Optional rotation pivot [mm].
    #[serde(default)]
    pub pivot_point: Option<[f64; 3]>,
    /// TCP offset [mm].
    #[serde(default)]
    pub tool_center_offset: [f64; 3],
}
