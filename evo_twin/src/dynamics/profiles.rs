//! Per-machine axis profiles and their persistence.
//!
//! [`AxisProfiles`] is owned by one machine's simulator. Every axis starts
//! from a default profile seeded with the joint's configured dynamics; the
//! learned profile is handed out only once it has absorbed
//! `min_observations` observations. Before that the default is returned
//! silently.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use evo_twin_common::config::LearningConfig;
use evo_twin_common::kinematics::KinematicModel;
use evo_twin_common::profile::{AxisBehaviorProfile, AxisObservation, MachineProfiles};

use super::learning::merge_observation;

/// Profile persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("profile store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized.
    #[error("profile store format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Persistence for learned machine profiles.
pub trait ProfileStore: Send {
    /// Profiles stored for `machine_id`, if any.
    fn load(&self, machine_id: &str) -> Result<Option<MachineProfiles>, StoreError>;

    /// Replace the profiles stored for `machine_id`.
    fn save(&mut self, machine_id: &str, profiles: &MachineProfiles) -> Result<(), StoreError>;
}

// ─── Axis Profiles ──────────────────────────────────────────────────

/// Learned and default axis profiles of one machine.
#[derive(Debug, Clone)]
pub struct AxisProfiles {
    defaults: HashMap<String, AxisBehaviorProfile>,
    learned: MachineProfiles,
    min_observations: u64,
    learning_rate_floor: f64,
}

impl AxisProfiles {
    /// Defaults for every joint of `model`, nothing learned yet.
    pub fn new(model: &KinematicModel, learning: &LearningConfig) -> Self {
        Self {
            defaults: model
                .joints()
                .iter()
                .map(|j| (j.name.clone(), AxisBehaviorProfile::for_joint(j)))
                .collect(),
            learned: MachineProfiles::new(),
            min_observations: learning.min_observations,
            learning_rate_floor: learning.learning_rate_floor,
        }
    }

    /// Profile to use for `axis`.
    ///
    /// The learned profile once it is trusted, otherwise the default. Unknown
    /// axes get the global default profile.
    pub fn get_profile(&self, axis: &str) -> AxisBehaviorProfile {
        match self.learned.axes.get(axis) {
            Some(p) if !p.is_uncertain(self.min_observations) => p.clone(),
            _ => self.default_profile(axis),
        }
    }

    /// Learned profile regardless of its observation count.
    pub fn learned(&self, axis: &str) -> Option<&AxisBehaviorProfile> {
        self.learned.axes.get(axis)
    }

    /// Merge an observation into `axis` and return the updated learned profile.
    pub fn record(&mut self, axis: &str, observation: &AxisObservation) -> &AxisBehaviorProfile {
        let current = match self.learned.axes.get(axis) {
            Some(p) => p.clone(),
            None => self.default_profile(axis),
        };
        let next = merge_observation(&current, observation, self.learning_rate_floor);
        self.learned.axes.insert(axis.to_string(), next);
        &self.learned.axes[axis]
    }

    /// Everything learned so far, for persistence.
    pub fn snapshot(&self) -> &MachineProfiles {
        &self.learned
    }

    /// Replace learned profiles with a stored snapshot.
    ///
    /// Axes whose stored dynamics are unusable are dropped and fall back to
    /// their defaults.
    pub fn restore(&mut self, mut profiles: MachineProfiles) {
        discard_invalid_axes(&mut profiles, "restored snapshot");
        self.learned = profiles;
    }

    fn default_profile(&self, axis: &str) -> AxisBehaviorProfile {
        self.defaults.get(axis).cloned().unwrap_or_default()
    }
}

/// Remove axes whose velocity, acceleration or jerk is not finite and
/// positive.
fn discard_invalid_axes(profiles: &mut MachineProfiles, origin: &str) {
    profiles.axes.retain(|axis, p| {
        let valid = p.has_valid_dynamics();
        if !valid {
            warn!(
                "Discarding {} profile for axis {}: v={} a={} j={}",
                origin, axis, p.max_velocity, p.max_acceleration, p.max_jerk
            );
        }
        valid
    });
}

// ─── Stores ─────────────────────────────────────────────────────────

/// Volatile store; profiles live as long as the store.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    machines: HashMap<String, MachineProfiles>,
}

impl MemoryProfileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self, machine_id: &str) -> Result<Option<MachineProfiles>, StoreError> {
        Ok(self.machines.get(machine_id).cloned())
    }

    fn save(&mut self, machine_id: &str, profiles: &MachineProfiles) -> Result<(), StoreError> {
        self.machines
            .insert(machine_id.to_string(), profiles.clone());
        Ok(())
    }
}

/// One JSON file per machine under a directory: `<dir>/<machine_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    dir: PathBuf,
}

impl JsonProfileStore {
    /// Store rooted at `dir`. The directory is created on first save.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// File backing `machine_id`.
    pub fn path_for(&self, machine_id: &str) -> PathBuf {
        let safe: String = machine_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    /// Remove the stored file for `machine_id`.
    pub fn delete(&self, machine_id: &str) -> Result<(), StoreError> {
        let path = self.path_for(machine_id);
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Deleted profile file {:?}", path);
        }
        Ok(())
    }
}

impl ProfileStore for JsonProfileStore {
    fn load(&self, machine_id: &str) -> Result<Option<MachineProfiles>, StoreError> {
        let path = self.path_for(machine_id);
        debug!("Loading profiles from {:?}", path);

        if !path.exists() {
            debug!("Profile file does not exist, starting fresh");
            return Ok(None);
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut profiles: MachineProfiles = serde_json::from_reader(reader).map_err(|e| {
            warn!("Failed to parse profile file {:?}: {}", path, e);
            e
        })?;

        if profiles.version != MachineProfiles::CURRENT_VERSION {
            warn!(
                "Profile file version {} differs from current {}, starting fresh",
                profiles.version,
                MachineProfiles::CURRENT_VERSION
            );
            return Ok(None);
        }

        discard_invalid_axes(&mut profiles, "stored");

        info!(
            "Loaded profiles for {} axes from {:?} (saved at {})",
            profiles.axes.len(),
            path,
            profiles.saved_at
        );
        Ok(Some(profiles))
    }

    fn save(&mut self, machine_id: &str, profiles: &MachineProfiles) -> Result<(), StoreError> {
        let path = self.path_for(machine_id);
        debug!("Saving profiles to {:?}", path);

        fs::create_dir_all(&self.dir)?;

        let mut profiles = profiles.clone();
        profiles.saved_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        replace_file(&path, |writer| {
            serde_json::to_writer_pretty(writer, &profiles)?;
            Ok(())
        })?;

        debug!("Saved profiles for {} axes to {:?}", profiles.axes.len(), path);
        Ok(())
    }
}

/// Write `path` through a sibling `.tmp` file renamed into place. The temp
/// file is removed if writing fails.
fn replace_file<F>(path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), StoreError>,
{
    let tmp = path.with_extension("json.tmp");
    let written = File::create(&tmp)
        .map_err(StoreError::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush()?;
            Ok(())
        });
    if let Err(e) = written {
        if tmp.exists() {
            if let Err(rm) = fs::remove_file(&tmp) {
                warn!("Failed to remove temp file {:?}: {}", tmp, rm);
            }
        }
        return Err(e);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::registry::trunnion_ac;
    use tempfile::tempdir;

    fn profiles() -> AxisProfiles {
        let model = trunnion_ac().unwrap();
        AxisProfiles::new(&model, &LearningConfig::default())
    }

    #[test]
    fn default_seeded_from_joint() {
        let model = trunnion_ac().unwrap();
        let p = profiles().get_profile("A");
        assert_eq!(p.max_velocity, model.joint(3).unwrap().max_velocity);
        assert_eq!(p.observation_count, 0);
    }

    #[test]
    fn learned_profile_needs_min_observations() {
        let mut axes = profiles();
        let obs = AxisObservation {
            servo_lag: Some(0.01),
            ..Default::default()
        };
        axes.record("X", &obs);
        axes.record("X", &obs);
        assert_eq!(axes.get_profile("X").observation_count, 0);
        assert_eq!(axes.learned("X").unwrap().observation_count, 2);

        axes.record("X", &obs);
        let p = axes.get_profile("X");
        assert_eq!(p.observation_count, 3);
        assert!(p.servo_lag > AxisBehaviorProfile::default().servo_lag);
    }

    #[test]
    fn unknown_axis_gets_global_default() {
        assert_eq!(profiles().get_profile("W"), AxisBehaviorProfile::default());
    }

    #[test]
    fn memory_store_round_trip() {
        let mut axes = profiles();
        axes.record("C", &AxisObservation::default());
        let mut store = MemoryProfileStore::new();
        assert!(store.load("m1").unwrap().is_none());
        store.save("m1", axes.snapshot()).unwrap();
        assert_eq!(store.load("m1").unwrap().as_ref(), Some(axes.snapshot()));
    }

    #[test]
    fn json_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let mut axes = profiles();
        axes.record(
            "Y",
            &AxisObservation {
                reversal_error: Some(0.007),
                ..Default::default()
            },
        );

        let mut store = JsonProfileStore::new(dir.path().join("profiles"));
        store.save("mill/01", axes.snapshot()).unwrap();
        assert!(dir.path().join("profiles/mill_01.json").exists());

        let reopened = JsonProfileStore::new(dir.path().join("profiles"));
        let loaded = reopened.load("mill/01").unwrap().unwrap();
        assert!(loaded.saved_at > 0);
        assert_eq!(loaded.axes["Y"].reversal_samples.as_slice(), &[0.007]);

        let mut restored = profiles();
        restored.restore(loaded);
        assert_eq!(restored.learned("Y").unwrap().observation_count, 1);
    }

    #[test]
    fn json_store_missing_and_corrupt_files() {
        let dir = tempdir().unwrap();
        let store = JsonProfileStore::new(dir.path());
        assert!(store.load("nobody").unwrap().is_none());

        fs::write(store.path_for("bad"), "{ not json").unwrap();
        assert!(matches!(store.load("bad"), Err(StoreError::Format(_))));

        store.delete("bad").unwrap();
        assert!(!store.path_for("bad").exists());
    }

    #[test]
    fn json_store_ignores_other_versions() {
        let dir = tempdir().unwrap();
        let store = JsonProfileStore::new(dir.path());
        fs::write(store.path_for("old"), r#"{"version": 99, "axes": {}}"#).unwrap();
        assert!(store.load("old").unwrap().is_none());
    }

    #[test]
    fn json_store_drops_axes_with_unusable_dynamics() {
        let dir = tempdir().unwrap();
        let mut axes = profiles();
        let obs = AxisObservation {
            servo_lag: Some(0.01),
            ..Default::default()
        };
        for _ in 0..3 {
            axes.record("X", &obs);
            axes.record("Y", &obs);
        }
        let mut store = JsonProfileStore::new(dir.path());
        store.save("mill-1", axes.snapshot()).unwrap();

        let path = store.path_for("mill-1");
        let mut raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        raw["axes"]["X"]["max_acceleration"] = serde_json::json!(0.0);
        fs::write(&path, raw.to_string()).unwrap();

        let loaded = store.load("mill-1").unwrap().unwrap();
        assert!(!loaded.axes.contains_key("X"));
        assert!(loaded.axes.contains_key("Y"));

        let mut restored = profiles();
        restored.restore(loaded);
        let x = restored.get_profile("X");
        assert_eq!(x.observation_count, 0);
        assert!(x.has_valid_dynamics());
        assert_eq!(restored.get_profile("Y").observation_count, 3);
    }

    #[test]
    fn restore_drops_non_finite_axes() {
        let mut snapshot = MachineProfiles::new();
        snapshot.axes.insert(
            "Z".to_string(),
            AxisBehaviorProfile {
                max_velocity: f64::NAN,
                observation_count: 10,
                ..Default::default()
            },
        );
        let mut axes = profiles();
        axes.restore(snapshot);
        assert!(axes.learned("Z").is_none());
        assert!(axes.get_profile("Z").max_velocity.is_finite());
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m1.json");
        let result = replace_file(&path, |writer| {
            writer.write_all(b"{ partial")?;
            writer.flush()?;
            Err(StoreError::Io(std::io::Error::other("disk full")))
        });
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(!path.with_extension("json.tmp").exists());
        assert!(!path.exists());

        replace_file(&path, |writer| {
            writer.write_all(b"{}")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert!(!path.with_extension("json.tmp").exists());
    }
}
