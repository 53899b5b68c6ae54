//! Kinematic model templates and registry.
//!
//! Templates build the stock topologies with typical limits. The registry
//! holds validated models by name and hands them out as `Arc` so every
//! simulation of a machine type shares one immutable model. The registry is
//! constructed and owned by the caller; there is no global instance.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use evo_twin_common::error::ConfigurationError;
use evo_twin_common::kinematics::{Joint, KinematicModel, KinematicModelConfig, Topology};

// ─── Templates ──────────────────────────────────────────────────────

const LINEAR_VELOCITY: f64 = 30_000.0;
const LINEAR_ACCELERATION: f64 = 5_000.0;
const ROTARY_VELOCITY: f64 = 18_000.0;
const ROTARY_ACCELERATION: f64 = 3_600.0;

fn x(min: f64, max: f64) -> Joint {
    Joint::linear("X", [1.0, 0.0, 0.0], min, max)
        .with_dynamics(LINEAR_VELOCITY, LINEAR_ACCELERATION)
}

fn y(min: f64, max: f64) -> Joint {
    Joint::linear("Y", [0.0, 1.0, 0.0], min, max)
        .with_dynamics(LINEAR_VELOCITY, LINEAR_ACCELERATION)
}

fn z(min: f64, max: f64) -> Joint {
    Joint::linear("Z", [0.0, 0.0, 1.0], min, max)
        .with_dynamics(LINEAR_VELOCITY, LINEAR_ACCELERATION)
}

fn rotary(name: &str, axis: [f64; 3], min: f64, max: f64) -> Joint {
    Joint::rotary(name, axis, min, max).with_dynamics(ROTARY_VELOCITY, ROTARY_ACCELERATION)
}

/// Three-axis vertical mill.
pub fn cartesian() -> Result<KinematicModel, ConfigurationError> {
    KinematicModel::new(
        "cartesian",
        Topology::Cartesian,
        vec![x(-500.0, 500.0), y(-400.0, 400.0), z(-500.0, 100.0)],
        None,
        [0.0; 3],
    )
}

/// Five-axis trunnion: table tilts about X (A), rotates about Z (C).
pub fn trunnion_ac() -> Result<KinematicModel, ConfigurationError> {
    KinematicModel::new(
        "trunnion_ac",
        Topology::Trunnion,
        vec![
            x(-400.0, 400.0),
            y(-300.0, 300.0),
            z(-400.0, 100.0),
            rotary("A", [1.0, 0.0, 0.0], -30.0, 120.0),
            rotary("C", [0.0, 0.0, 1.0], -360.0, 360.0),
        ],
        Some([0.0, 0.0, -150.0]),
        [0.0; 3],
    )
}

/// Five-axis head-table: spindle head tilts about Y (B), table rotates about Z (C).
///
/// B turns about -Y so that a positive B leans the tool toward +X.
pub fn head_table_bc() -> Result<KinematicModel, ConfigurationError> {
    KinematicModel::new(
        "head_table_bc",
        Topology::HeadTable,
        vec![
            x(-500.0, 500.0),
            y(-400.0, 400.0),
            z(-400.0, 200.0),
            rotary("B", [0.0, -1.0, 0.0], -110.0, 110.0),
            rotary("C", [0.0, 0.0, 1.0], -360.0, 360.0),
        ],
        None,
        [0.0, 0.0, -120.0],
    )
}

/// Two-axis lathe with a C spindle.
pub fn lathe() -> Result<KinematicModel, ConfigurationError> {
    KinematicModel::new(
        "lathe",
        Topology::Lathe,
        vec![
            x(0.0, 300.0),
            z(-600.0, 0.0),
            rotary("C", [0.0, 0.0, 1.0], -360.0, 360.0),
        ],
        None,
        [0.0; 3],
    )
}

/// Mill-turn: XYZ with a milling head B and turning spindle C.
pub fn mill_turn() -> Result<KinematicModel, ConfigurationError> {
    KinematicModel::new(
        "mill_turn",
        Topology::MillTurn,
        vec![
            x(-300.0, 300.0),
            y(-150.0, 150.0),
            z(-700.0, 100.0),
            rotary("B", [0.0, -1.0, 0.0], -120.0, 120.0),
            rotary("C", [0.0, 0.0, 1.0], -360.0, 360.0),
        ],
        None,
        [0.0, 0.0, -100.0],
    )
}

// ─── Registry ───────────────────────────────────────────────────────

/// Registry of validated kinematic models.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<KinematicModel>>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
        }
    }

    /// Registry pre-populated with every stock template.
    pub fn with_templates() -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for model in [cartesian()?, trunnion_ac()?, head_table_bc()?, lathe()?, mill_turn()?] {
            registry.register(model)?;
        }
        Ok(registry)
    }

    /// Register a model under its own name.
    ///
    /// # Errors
    /// Returns `ConfigurationError::DuplicateModel` if the name is taken.
    pub fn register(
        &mut self,
        model: KinematicModel,
    ) -> Result<Arc<KinematicModel>, ConfigurationError> {
        if self.models.contains_key(model.name()) {
            return Err(ConfigurationError::DuplicateModel(model.name().to_string()));
        }
        debug!(
            "Registered model '{}' ({:?}, {} joints)",
            model.name(),
            model.topology(),
            model.joint_count()
        );
        let model = Arc::new(model);
        self.models
            .insert(model.name().to_string(), Arc::clone(&model));
        Ok(model)
    }

    /// Build a model from its TOML description and register it.
    pub fn load(
        &mut self,
        config: &KinematicModelConfig,
    ) -> Result<Arc<KinematicModel>, ConfigurationError> {
        self.register(KinematicModel::from_config(config)?)
    }

    /// Shared handle to a registered model.
    pub fn get(&self, name: &str) -> Option<Arc<KinematicModel>> {
        self.models.get(name).cloned()
    }

    /// Registered model names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
