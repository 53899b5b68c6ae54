//! Per-axis motion-dynamics profile types.
//!
//! Profiles start from documented defaults and are refined by observations.
//! The learning math lives in the `evo_twin::dynamics` module; this module
//! only defines the records that are persisted and exchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BACKLASH, DEFAULT_FOLLOWING_ERROR, DEFAULT_MAX_ACCELERATION, DEFAULT_MAX_JERK,
    DEFAULT_MAX_VELOCITY, DEFAULT_REPEATABILITY, DEFAULT_SERVO_LAG, DEFAULT_THERMAL_COEFFICIENT,
    SAMPLE_WINDOW,
};
use crate::kinematics::Joint;

/// Velocity profile shape used for timing prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityProfileKind {
    /// Constant acceleration ramps.
    #[default]
    Trapezoidal,
    /// Jerk-limited ramps.
    SCurve,
}

/// Rolling window of recent samples.
pub type SampleWindow = heapless::Vec<f64, SAMPLE_WINDOW>;

/// Learned or default dynamics of one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisBehaviorProfile {
    /// Maximum velocity [mm/min or deg/min].
    pub max_velocity: f64,
    /// Maximum acceleration [mm/s² or deg/s²].
    pub max_acceleration: f64,
    /// Maximum jerk [mm/s³ or deg/s³].
    pub max_jerk: f64,
    /// Servo lag [s].
    pub servo_lag: f64,
    /// Following error at `max_velocity` [mm].
    pub following_error: f64,
    /// Reversal backlash [mm].
    pub backlash: f64,
    /// Repeatability, 2σ [mm].
    pub repeatability: f64,
    /// Thermal growth per degree [1/°C].
    pub thermal_coefficient: f64,
    /// Velocity profile shape.
    #[serde(default)]
    pub velocity_profile: VelocityProfileKind,
    /// Observations merged so far.
    #[serde(default)]
    pub observation_count: u64,
    /// Recent direction-reversal errors [mm].
    #[serde(default)]
    pub reversal_samples: SampleWindow,
    /// Recent repeat-position errors [mm].
    #[serde(default)]
    pub repeat_samples: SampleWindow,
}

impl Default for AxisBehaviorProfile {
    fn default() -> Self {
        Self {
            max_velocity: DEFAULT_MAX_VELOCITY,
            max_acceleration: DEFAULT_MAX_ACCELERATION,
            max_jerk: DEFAULT_MAX_JERK,
            servo_lag: DEFAULT_SERVO_LAG,
            following_error: DEFAULT_FOLLOWING_ERROR,
            backlash: DEFAULT_BACKLASH,
            repeatability: DEFAULT_REPEATABILITY,
            thermal_coefficient: DEFAULT_THERMAL_COEFFICIENT,
            velocity_profile: VelocityProfileKind::Trapezoidal,
            observation_count: 0,
            reversal_samples: SampleWindow::new(),
            repeat_samples: SampleWindow::new(),
        }
    }
}

impl AxisBehaviorProfile {
    /// Default profile seeded with a joint's configured dynamics.
    pub fn for_joint(joint: &Joint) -> Self {
        Self {
            max_velocity: joint.max_velocity,
            max_acceleration: joint.max_acceleration,
            ..Self::default()
        }
    }

    /// True until at least `min_observations` have been merged.
    #[inline]
    pub fn is_uncertain(&self, min_observations: u64) -> bool {
        self.observation_count < min_observations
    }

    /// Velocity, acceleration and jerk limits are finite and positive.
    ///
    /// Timing prediction is only defined for profiles that pass this check.
    pub fn has_valid_dynamics(&self) -> bool {
        [self.max_velocity, self.max_acceleration, self.max_jerk]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

/// One measured move of one axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisObservation {
    /// Distance travelled [mm or deg].
    pub distance: f64,
    /// Measured duration [s].
    pub duration: f64,
    /// Commanded velocity [mm/min].
    pub commanded_velocity: f64,
    /// Peak measured velocity [mm/min].
    #[serde(default)]
    pub peak_velocity: Option<f64>,
    /// Peak measured acceleration [mm/s²].
    #[serde(default)]
    pub peak_acceleration: Option<f64>,
    /// Measured servo lag [s].
    #[serde(default)]
    pub servo_lag: Option<f64>,
    /// Measured following error at `commanded_velocity` [mm].
    #[serde(default)]
    pub following_error: Option<f64>,
    /// Position error after a direction reversal [mm].
    #[serde(default)]
    pub reversal_error: Option<f64>,
    /// Error when returning to a previously visited position [mm].
    #[serde(default)]
    pub repeat_error: Option<f64>,
    /// Thermal growth [mm] over `temperature_delta` [°C] across `distance`.
    #[serde(default)]
    pub thermal_growth: Option<(f64, f64)>,
}

/// All learned axis profiles of one machine, keyed by axis name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineProfiles {
    /// Format version.
    #[serde(default = "MachineProfiles::current_version")]
    pub version: u32,
    /// Profiles by axis name.
    #[serde(default)]
    pub axes: BTreeMap<String, AxisBehaviorProfile>,
    /// Timestamp of last save (Unix epoch seconds).
    #[serde(default)]
    pub saved_at: u64,
}

impl MachineProfiles {
    /// Current format version.
    pub const CURRENT_VERSION: u32 = 1;

    fn current_version() -> u32 {
        Self::CURRENT_VERSION
    }

    /// Empty set with the current version.
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            axes: BTreeMap::new(),
            saved_at: 0,
        }
    }
}
