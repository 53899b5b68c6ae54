//! Simulators keyed by machine id.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use evo_twin_common::command::{MachineId, MoveCommand, SafetyReport, StepResult};
use evo_twin_common::config::{ConfigError, TwinConfig};
use evo_twin_common::error::ConfigurationError;
use evo_twin_common::kinematics::{JointValues, KinematicModel};
use evo_twin_common::profile::AxisBehaviorProfile;

use super::machine::{Collaborators, MachineSimulator};
use crate::kinematics::ModelRegistry;

/// Hub-level failures.
#[derive(Debug, Error)]
pub enum SimError {
    /// No simulator with this id.
    #[error("unknown machine '{0}'")]
    UnknownMachine(MachineId),

    /// A simulator with this id already exists.
    #[error("machine '{0}' already exists")]
    DuplicateMachine(MachineId),

    /// No model with this name in the registry.
    #[error("unknown kinematic model '{0}'")]
    UnknownModel(String),

    /// Model construction failed.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Configuration file failed to load.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Owner of one [`MachineSimulator`] per machine id.
#[derive(Debug)]
pub struct SimulationHub {
    config: TwinConfig,
    registry: ModelRegistry,
    machines: HashMap<MachineId, MachineSimulator>,
}

impl SimulationHub {
    /// Hub with the given configuration and model registry.
    pub fn new(config: TwinConfig, registry: ModelRegistry) -> Self {
        Self {
            config,
            registry,
            machines: HashMap::new(),
        }
    }

    /// Hub with the built-in model templates.
    pub fn with_templates(config: TwinConfig) -> Result<Self, SimError> {
        Ok(Self::new(config, ModelRegistry::with_templates()?))
    }

    /// Shared configuration.
    pub fn config(&self) -> &TwinConfig {
        &self.config
    }

    /// Model registry.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Mutable model registry, for registering custom models.
    pub fn registry_mut(&mut self) -> &mut ModelRegistry {
        &mut self.registry
    }

    /// Add a machine running registry model `model_name`.
    pub fn add_machine(
        &mut self,
        machine_id: &str,
        model_name: &str,
        collaborators: Collaborators,
    ) -> Result<&mut MachineSimulator, SimError> {
        let model = self
            .registry
            .get(model_name)
            .ok_or_else(|| SimError::UnknownModel(model_name.to_string()))?;
        self.add_machine_with_model(machine_id, model, collaborators)
    }

    /// Add a machine running `model`.
    pub fn add_machine_with_model(
        &mut self,
        machine_id: &str,
        model: Arc<KinematicModel>,
        collaborators: Collaborators,
    ) -> Result<&mut MachineSimulator, SimError> {
        if self.machines.contains_key(machine_id) {
            return Err(SimError::DuplicateMachine(machine_id.to_string()));
        }
        info!("Adding machine '{machine_id}' ({})", model.name());
        let sim = MachineSimulator::new(machine_id, model, &self.config, collaborators);
        Ok(self.machines.entry(machine_id.to_string()).or_insert(sim))
    }

    /// Remove a machine and hand back its simulator.
    pub fn remove_machine(&mut self, machine_id: &str) -> Option<MachineSimulator> {
        self.machines.remove(machine_id)
    }

    /// Simulator of `machine_id`.
    pub fn machine(&self, machine_id: &str) -> Result<&MachineSimulator, SimError> {
        self.machines
            .get(machine_id)
            .ok_or_else(|| SimError::UnknownMachine(machine_id.to_string()))
    }

    /// Mutable simulator of `machine_id`.
    pub fn machine_mut(&mut self, machine_id: &str) -> Result<&mut MachineSimulator, SimError> {
        self.machines
            .get_mut(machine_id)
            .ok_or_else(|| SimError::UnknownMachine(machine_id.to_string()))
    }

    /// Ids of all machines, sorted.
    pub fn machine_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.machines.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Run one move on `machine_id`.
    pub fn execute_move(
        &mut self,
        machine_id: &str,
        command: &MoveCommand,
    ) -> Result<StepResult, SimError> {
        Ok(self.machine_mut(machine_id)?.execute_move(command))
    }

    /// Evaluate a configuration of `machine_id` without moving.
    pub fn check_position_safety(
        &self,
        machine_id: &str,
        joints: &JointValues,
    ) -> Result<SafetyReport, SimError> {
        Ok(self.machine(machine_id)?.check_position_safety(joints))
    }

    /// Profile used for `axis` of `machine_id`.
    pub fn get_profile(
        &self,
        machine_id: &str,
        axis: &str,
    ) -> Result<AxisBehaviorProfile, SimError> {
        Ok(self.machine(machine_id)?.get_profile(axis))
    }

    /// Split into independent simulators, e.g. to drive them from separate threads.
    pub fn into_machines(self) -> HashMap<MachineId, MachineSimulator> {
        self.machines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub() -> SimulationHub {
        SimulationHub::with_templates(TwinConfig::default()).unwrap()
    }

    #[test]
    fn add_and_drive_machine() {
        let mut hub = hub();
        hub.add_machine("mill-1", "cartesian", Collaborators::default())
            .unwrap();
        let result = hub
            .execute_move("mill-1", &MoveCommand::joints([("X", 10.0)]))
            .unwrap();
        assert!(result.success);
        assert_eq!(hub.machine_ids(), vec!["mill-1"]);
    }

    #[test]
    fn duplicate_and_unknown_ids() {
        let mut hub = hub();
        hub.add_machine("m", "lathe", Collaborators::default())
            .unwrap();
        assert!(matches!(
            hub.add_machine("m", "lathe", Collaborators::default()),
            Err(SimError::DuplicateMachine(_))
        ));
        assert!(matches!(
            hub.add_machine("n", "hexapod", Collaborators::default()),
            Err(SimError::UnknownModel(_))
        ));
        assert!(matches!(
            hub.execute_move("ghost", &MoveCommand::joints([("X", 1.0)])),
            Err(SimError::UnknownMachine(_))
        ));
        assert_eq!(
            SimError::UnknownMachine("ghost".into()).to_string(),
            "unknown machine 'ghost'"
        );
    }

    #[test]
    fn machines_share_models() {
        let mut hub = hub();
        hub.add_machine("a", "trunnion_ac", Collaborators::default())
            .unwrap();
        hub.add_machine("b", "trunnion_ac", Collaborators::default())
            .unwrap();
        let a = hub.machine("a").unwrap().model().clone();
        let b = hub.machine("b").unwrap().model().clone();
        assert!(Arc::ptr_eq(&a, &b));

        assert!(hub.remove_machine("a").is_some());
        assert!(hub.machine("a").is_err());
    }
}
