//! Learning axis profiles from observed moves.
//!
//! Each observation is blended into the profile with weight
//! `w = max(1/(n + 2), floor)`, where `n` is the number of observations
//! merged so far. The starting profile counts as one prior observation, so a
//! single measurement moves a field halfway and never replaces it outright.
//!
//! Backlash and repeatability are statistics over rolling sample windows:
//! backlash is the mean absolute reversal error, repeatability is two sample
//! standard deviations of the repeat-position errors.

use tracing::trace;

use evo_twin_common::consts::LEARNING_RATE_FLOOR_DEFAULT;
use evo_twin_common::profile::{
    AxisBehaviorProfile, AxisObservation, SampleWindow, VelocityProfileKind,
};

/// Merge `observation` into `profile` with the default learning-rate floor.
pub fn record_observation(
    profile: &AxisBehaviorProfile,
    observation: &AxisObservation,
) -> AxisBehaviorProfile {
    merge_observation(profile, observation, LEARNING_RATE_FLOOR_DEFAULT)
}

/// Merge `observation` into `profile`.
///
/// Fields the observation does not measure are left unchanged. Measurements
/// that are non-finite or out of physical range are ignored.
pub fn merge_observation(
    profile: &AxisBehaviorProfile,
    observation: &AxisObservation,
    learning_rate_floor: f64,
) -> AxisBehaviorProfile {
    let mut next = profile.clone();
    let w = merge_weight(profile.observation_count, learning_rate_floor);

    if let Some(v) = observation.peak_velocity.filter(|v| positive(*v)) {
        next.max_velocity = blend(profile.max_velocity, v, w);
    }

    match observation.peak_acceleration.filter(|a| positive(*a)) {
        Some(a) => next.max_acceleration = blend(profile.max_acceleration, a, w),
        None => {
            if let Some(a) = acceleration_from_timing(profile, observation) {
                next.max_acceleration = blend(profile.max_acceleration, a, w);
            }
        }
    }

    if let Some(lag) = observation.servo_lag.filter(|l| non_negative(*l)) {
        next.servo_lag = blend(profile.servo_lag, lag, w);
    }

    // Scale the measured error back to what it would be at max velocity.
    if let Some(fe) = observation.following_error.filter(|e| non_negative(*e)) {
        if positive(observation.commanded_velocity) {
            let v = observation.commanded_velocity.min(profile.max_velocity);
            let at_max = fe * profile.max_velocity / v;
            next.following_error = blend(profile.following_error, at_max, w);
        }
    }

    if let Some(err) = observation.reversal_error.filter(|e| e.is_finite()) {
        push_sample(&mut next.reversal_samples, err.abs());
        next.backlash = mean(&next.reversal_samples);
    }

    if let Some(err) = observation.repeat_error.filter(|e| e.is_finite()) {
        push_sample(&mut next.repeat_samples, err);
        if next.repeat_samples.len() >= 2 {
            next.repeatability = 2.0 * std_dev(&next.repeat_samples);
        }
    }

    if let Some((growth, delta_t)) = observation.thermal_growth {
        let span = observation.distance.abs();
        if growth.is_finite() && positive(delta_t) && positive(span) {
            next.thermal_coefficient = blend(profile.thermal_coefficient, growth / (span * delta_t), w);
        }
    }

    next.observation_count = profile.observation_count.saturating_add(1);
    trace!(
        "Merged observation #{} (w={w:.3}): v_max={:.1} a_max={:.1} backlash={:.4}",
        next.observation_count,
        next.max_velocity,
        next.max_acceleration,
        next.backlash
    );
    next
}

/// Weight of the next observation after `count` merged ones.
#[inline]
pub fn merge_weight(count: u64, floor: f64) -> f64 {
    (1.0 / (count as f64 + 2.0)).max(floor)
}

#[inline]
fn blend(current: f64, observed: f64, w: f64) -> f64 {
    current + w * (observed - current)
}

#[inline]
fn positive(v: f64) -> bool {
    v > 0.0 && v.is_finite()
}

#[inline]
fn non_negative(v: f64) -> bool {
    v >= 0.0 && v.is_finite()
}

/// Acceleration implied by a trapezoidal move's measured duration.
///
/// `T = d/v + v/a`, valid only if the move reached cruise (`d ≥ v²/a`).
fn acceleration_from_timing(
    profile: &AxisBehaviorProfile,
    observation: &AxisObservation,
) -> Option<f64> {
    if profile.velocity_profile != VelocityProfileKind::Trapezoidal {
        return None;
    }
    let d = observation.distance.abs();
    let t = observation.duration;
    if !positive(d) || !positive(t) || !positive(observation.commanded_velocity) {
        return None;
    }
    let v = observation.commanded_velocity.min(profile.max_velocity) / 60.0;
    let ramp = t - d / v;
    if ramp <= 1e-9 {
        return None;
    }
    let a = v / ramp;
    (d >= v * v / a).then_some(a)
}

fn push_sample(window: &mut SampleWindow, sample: f64) {
    if window.is_full() {
        window.remove(0);
    }
    let _ = window.push(sample);
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn std_dev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let m = mean(samples);
    let var = samples.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (samples.len() - 1) as f64;
    var.sqrt()
}
