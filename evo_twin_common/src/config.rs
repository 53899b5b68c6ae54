//! Configuration loading traits and types.
//!
//! All twin configuration is TOML. Any `serde` struct can be loaded through
//! the blanket [`ConfigLoader`] impl; [`TwinConfig`] is the top-level file
//! for a simulator instance and defaults every field.
//!
//! # Usage
//!
//! ```rust,no_run
//! use evo_twin_common::config::{ConfigLoader, ConfigError, TwinConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = TwinConfig::load(Path::new("twin.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::command::MoveCommand;
use crate::kinematics::{KinematicModelConfig, Pose};

use crate::consts::{
    BAUMGARTE_DEFAULT, CONTACT_DAMPING_DEFAULT, CONTACT_STIFFNESS_DEFAULT,
    DANGER_CONFIDENCE_DEFAULT, DEFAULT_TOOL_AXIS, EFFECTIVE_MASS_DEFAULT, FRICTION_DEFAULT,
    LEARNING_RATE_FLOOR_DEFAULT, LIMIT_MARGIN_DEFAULT, MIN_OBSERVATIONS_DEFAULT,
    PENETRATION_SCALE_DEFAULT, PENETRATION_TOLERANCE_DEFAULT, SINGULARITY_TILT_DEG,
    SOLVER_DT_DEFAULT, SOLVER_ITERATIONS_DEFAULT, SOLVER_ITERATIONS_MAX,
    WARM_START_DECAY_DEFAULT,
};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across EVO applications.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "evo-twin-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "evo-twin".to_string(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Twin Config ────────────────────────────────────────────────────

/// Top-level simulator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwinConfig {
    /// Logging and identity.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Constraint solver parameters.
    #[serde(default)]
    pub solver: SolverConfig,
    /// Axis-behavior learning parameters.
    #[serde(default)]
    pub learning: LearningConfig,
    /// Position-safety scoring parameters.
    #[serde(default)]
    pub safety: SafetyConfig,
    /// Kinematics tolerances.
    #[serde(default)]
    pub kinematics: KinematicsConfig,
}

impl TwinConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.solver.validate().map_err(ConfigError::ValidationError)?;
        self.learning.validate().map_err(ConfigError::ValidationError)?;
        self.safety.validate().map_err(ConfigError::ValidationError)?;
        self.kinematics.validate().map_err(ConfigError::ValidationError)
    }
}

/// Constraint solver parameters.
///
/// Contact response per iteration is `Δλ = k·d·dt + c·(β·d/dt)·dt`, turned into
/// a positional correction through `effective_mass`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Gauss-Seidel iterations per step.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Step time [s].
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Contact stiffness k.
    #[serde(default = "default_stiffness")]
    pub contact_stiffness: f64,
    /// Contact damping c.
    #[serde(default = "default_damping")]
    pub contact_damping: f64,
    /// Joint-limit stiffness.
    #[serde(default = "default_stiffness")]
    pub limit_stiffness: f64,
    /// Joint-limit damping.
    #[serde(default = "default_damping")]
    pub limit_damping: f64,
    /// Baumgarte factor β in `[0, 1]`.
    #[serde(default = "default_baumgarte")]
    pub baumgarte: f64,
    /// Default Coulomb friction μ.
    #[serde(default = "default_friction")]
    pub friction: f64,
    /// Effective mass of one constraint row [kg].
    #[serde(default = "default_effective_mass")]
    pub effective_mass: f64,
    /// Residual penetration above which a contact is Diverged [mm].
    #[serde(default = "default_penetration_tolerance")]
    pub penetration_tolerance: f64,
    /// Decay applied to warm-start impulses.
    #[serde(default = "default_warm_start_decay")]
    pub warm_start_decay: f64,
}

fn default_iterations() -> usize {
    SOLVER_ITERATIONS_DEFAULT
}
fn default_dt() -> f64 {
    SOLVER_DT_DEFAULT
}
fn default_stiffness() -> f64 {
    CONTACT_STIFFNESS_DEFAULT
}
fn default_damping() -> f64 {
    CONTACT_DAMPING_DEFAULT
}
fn default_baumgarte() -> f64 {
    BAUMGARTE_DEFAULT
}
fn default_friction() -> f64 {
    FRICTION_DEFAULT
}
fn default_effective_mass() -> f64 {
    EFFECTIVE_MASS_DEFAULT
}
fn default_penetration_tolerance() -> f64 {
    PENETRATION_TOLERANCE_DEFAULT
}
fn default_warm_start_decay() -> f64 {
    WARM_START_DECAY_DEFAULT
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: SOLVER_ITERATIONS_DEFAULT,
            dt: SOLVER_DT_DEFAULT,
            contact_stiffness: CONTACT_STIFFNESS_DEFAULT,
            contact_damping: CONTACT_DAMPING_DEFAULT,
            limit_stiffness: CONTACT_STIFFNESS_DEFAULT,
            limit_damping: CONTACT_DAMPING_DEFAULT,
            baumgarte: BAUMGARTE_DEFAULT,
            friction: FRICTION_DEFAULT,
            effective_mass: EFFECTIVE_MASS_DEFAULT,
            penetration_tolerance: PENETRATION_TOLERANCE_DEFAULT,
            warm_start_decay: WARM_START_DECAY_DEFAULT,
        }
    }
}

impl SolverConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.iterations == 0 || self.iterations > SOLVER_ITERATIONS_MAX {
            return Err(format!(
                "solver.iterations {} out of range [1, {}]",
                self.iterations, SOLVER_ITERATIONS_MAX
            ));
        }
        for (name, value) in [
            ("dt", self.dt),
            ("contact_stiffness", self.contact_stiffness),
            ("limit_stiffness", self.limit_stiffness),
            ("effective_mass", self.effective_mass),
            ("penetration_tolerance", self.penetration_tolerance),
        ] {
            if value <= 0.0 || !value.is_finite() {
                return Err(format!("solver.{name} must be positive, got {value}"));
            }
        }
        for (name, value) in [
            ("contact_damping", self.contact_damping),
            ("limit_damping", self.limit_damping),
            ("friction", self.friction),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(format!("solver.{name} must be non-negative, got {value}"));
            }
        }
        if !(0.0..=1.0).contains(&self.baumgarte) {
            return Err(format!("solver.baumgarte {} out of range [0, 1]", self.baumgarte));
        }
        if !(0.0..=1.0).contains(&self.warm_start_decay) {
            return Err(format!(
                "solver.warm_start_decay {} out of range [0, 1]",
                self.warm_start_decay
            ));
        }
        Ok(())
    }
}

/// Axis-behavior learning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Observations before a learned profile is trusted.
    #[serde(default = "default_min_observations")]
    pub min_observations: u64,
    /// Lower bound on the merge weight.
    #[serde(default = "default_learning_rate_floor")]
    pub learning_rate_floor: f64,
    /// Merge executed moves back into the machine's profiles.
    #[serde(default = "default_true")]
    pub learn_from_moves: bool,
}

fn default_min_observations() -> u64 {
    MIN_OBSERVATIONS_DEFAULT
}
fn default_learning_rate_floor() -> f64 {
    LEARNING_RATE_FLOOR_DEFAULT
}
fn default_true() -> bool {
    true
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            min_observations: MIN_OBSERVATIONS_DEFAULT,
            learning_rate_floor: LEARNING_RATE_FLOOR_DEFAULT,
            learn_from_moves: true,
        }
    }
}

impl LearningConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.learning_rate_floor > 0.0 && self.learning_rate_floor < 1.0) {
            return Err(format!(
                "learning.learning_rate_floor {} out of range (0, 1)",
                self.learning_rate_floor
            ));
        }
        Ok(())
    }
}

/// Position-safety scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Predictor confidence that makes a position unsafe.
    #[serde(default = "default_danger_confidence")]
    pub danger_confidence: f64,
    /// Near-limit margin as a fraction of the joint range.
    #[serde(default = "default_limit_margin")]
    pub limit_margin: f64,
    /// Penetration mapped to danger level 1.0 [mm].
    #[serde(default = "default_penetration_scale")]
    pub penetration_scale: f64,
}

fn default_danger_confidence() -> f64 {
    DANGER_CONFIDENCE_DEFAULT
}
fn default_limit_margin() -> f64 {
    LIMIT_MARGIN_DEFAULT
}
fn default_penetration_scale() -> f64 {
    PENETRATION_SCALE_DEFAULT
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            danger_confidence: DANGER_CONFIDENCE_DEFAULT,
            limit_margin: LIMIT_MARGIN_DEFAULT,
            penetration_scale: PENETRATION_SCALE_DEFAULT,
        }
    }
}

impl SafetyConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.danger_confidence) {
            return Err(format!(
                "safety.danger_confidence {} out of range [0, 1]",
                self.danger_confidence
            ));
        }
        if !(0.0..0.5).contains(&self.limit_margin) {
            return Err(format!(
                "safety.limit_margin {} out of range [0, 0.5)",
                self.limit_margin
            ));
        }
        if self.penetration_scale <= 0.0 {
            return Err("safety.penetration_scale must be positive".to_string());
        }
        Ok(())
    }
}

/// Kinematics tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicsConfig {
    /// Tilt below which the azimuth is treated as indeterminate [deg].
    #[serde(default = "default_singularity_tilt")]
    pub singularity_tilt_deg: f64,
}

fn default_singularity_tilt() -> f64 {
    SINGULARITY_TILT_DEG
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            singularity_tilt_deg: SINGULARITY_TILT_DEG,
        }
    }
}

impl KinematicsConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.singularity_tilt_deg >= 0.0 && self.singularity_tilt_deg < 10.0) {
            return Err(format!(
                "kinematics.singularity_tilt_deg {} out of range [0, 10)",
                self.singularity_tilt_deg
            ));
        }
        Ok(())
    }
}

// ─── Machine File ───────────────────────────────────────────────────

/// One move in a machine file.
///
/// Either `position` (plus optional `tool_axis`) for a pose move, or a
/// `joints` table for a joint-space move.
///
/// ```toml
/// [[moves]]
/// position = [10.0, 0.0, -5.0]
/// tool_axis = [0.0, 0.5, -0.866]
/// feed_rate = 3000.0
///
/// [[moves]]
/// joints = { X = 100.0, C = 45.0 }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveConfig {
    /// Joint targets by name.
    #[serde(default)]
    pub joints: BTreeMap<String, f64>,
    /// TCP target [mm].
    #[serde(default)]
    pub position: Option<[f64; 3]>,
    /// Tool axis for a pose target; defaults to straight down.
    #[serde(default)]
    pub tool_axis: Option<[f64; 3]>,
    /// Feed rate [mm/min].
    #[serde(default)]
    pub feed_rate: Option<f64>,
    /// Tool in the spindle.
    #[serde(default)]
    pub tool_id: Option<String>,
    /// Holder of that tool.
    #[serde(default)]
    pub holder_id: Option<String>,
}

impl MoveConfig {
    /// Convert into a [`MoveCommand`].
    ///
    /// # Errors
    ///
    /// `ValidationError` if the move names neither a position nor joints, or
    /// names both.
    pub fn to_command(&self) -> Result<MoveCommand, ConfigError> {
        let mut command = match (self.position, self.joints.is_empty()) {
            (Some(_), false) => {
                return Err(ConfigError::ValidationError(
                    "move has both position and joints".to_string(),
                ));
            }
            (Some(position), true) => MoveCommand::pose(Pose::target(
                position,
                self.tool_axis.unwrap_or(DEFAULT_TOOL_AXIS),
            )),
            (None, false) => {
                MoveCommand::joints(self.joints.iter().map(|(n, v)| (n.as_str(), *v)))
            }
            (None, true) => {
                return Err(ConfigError::ValidationError(
                    "move has neither position nor joints".to_string(),
                ));
            }
        };
        command.feed_rate = self.feed_rate;
        command.tool_id = self.tool_id.clone();
        command.holder_id = self.holder_id.clone();
        Ok(command)
    }
}

/// Machine description consumed by the `evo_twin` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineFile {
    /// Machine identifier.
    pub machine_id: String,
    /// Kinematic model.
    pub model: KinematicModelConfig,
    /// Moves to run in order.
    #[serde(default)]
    pub moves: Vec<MoveConfig>,
}
