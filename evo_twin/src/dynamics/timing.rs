//! Motion timing and following-error prediction.
//!
//! Velocities are in mm/min (deg/min for rotary axes), accelerations in
//! mm/s² and jerk in mm/s³. Times are in seconds.

use evo_twin_common::profile::{AxisBehaviorProfile, VelocityProfileKind};

/// Cruise velocity [mm/s] for a commanded feed [mm/min].
///
/// A non-positive or non-finite feed means "as fast as the axis allows".
#[inline]
pub fn cruise_velocity(profile: &AxisBehaviorProfile, commanded_velocity: f64) -> f64 {
    let v = if commanded_velocity > 0.0 && commanded_velocity.is_finite() {
        commanded_velocity.min(profile.max_velocity)
    } else {
        profile.max_velocity
    };
    v / 60.0
}

/// Predicted duration of a point-to-point move [s].
///
/// Triangular profile `2·√(d/a)` when the move is too short to reach the
/// cruise velocity, trapezoidal `2·t_acc + (d − 2·d_acc)/v` otherwise. Jerk
/// limited profiles add one `a/j` ramp. Zero distance takes zero time.
///
/// A profile with unusable dynamics is timed with the default velocity,
/// acceleration and jerk in place of the bad values; use
/// [`try_predict_motion_time`] to detect that case.
pub fn predict_motion_time(
    profile: &AxisBehaviorProfile,
    distance: f64,
    commanded_velocity: f64,
) -> f64 {
    match try_predict_motion_time(profile, distance, commanded_velocity) {
        Some(t) => t,
        None => motion_time(&with_default_dynamics(profile), distance, commanded_velocity),
    }
}

/// Like [`predict_motion_time`], but `None` when the profile's velocity,
/// acceleration or jerk is not finite and positive.
pub fn try_predict_motion_time(
    profile: &AxisBehaviorProfile,
    distance: f64,
    commanded_velocity: f64,
) -> Option<f64> {
    let d = distance.abs();
    if d <= 0.0 || !d.is_finite() {
        return Some(0.0);
    }
    if !profile.has_valid_dynamics() {
        return None;
    }
    let t = motion_time(profile, d, commanded_velocity);
    t.is_finite().then_some(t)
}

fn motion_time(profile: &AxisBehaviorProfile, distance: f64, commanded_velocity: f64) -> f64 {
    let d = distance.abs();
    if d <= 0.0 || !d.is_finite() {
        return 0.0;
    }

    let v = cruise_velocity(profile, commanded_velocity);
    let a = profile.max_acceleration;
    let t_acc = v / a;
    let d_acc = 0.5 * a * t_acc * t_acc;

    let base = if d < 2.0 * d_acc {
        2.0 * (d / a).sqrt()
    } else {
        2.0 * t_acc + (d - 2.0 * d_acc) / v
    };

    match profile.velocity_profile {
        VelocityProfileKind::Trapezoidal => base,
        VelocityProfileKind::SCurve if profile.max_jerk > 0.0 => base + a / profile.max_jerk,
        VelocityProfileKind::SCurve => base,
    }
}

/// `profile` with every unusable dynamics limit replaced by its default.
fn with_default_dynamics(profile: &AxisBehaviorProfile) -> AxisBehaviorProfile {
    let defaults = AxisBehaviorProfile::default();
    let pick = |v: f64, fallback: f64| if v.is_finite() && v > 0.0 { v } else { fallback };
    AxisBehaviorProfile {
        max_velocity: pick(profile.max_velocity, defaults.max_velocity),
        max_acceleration: pick(profile.max_acceleration, defaults.max_acceleration),
        max_jerk: pick(profile.max_jerk, defaults.max_jerk),
        ..profile.clone()
    }
}

/// Following error expected at `velocity` [mm/min].
#[inline]
pub fn predict_following_error(profile: &AxisBehaviorProfile, velocity: f64) -> f64 {
    if profile.max_velocity <= 0.0 {
        return 0.0;
    }
    profile.following_error * velocity.abs() / profile.max_velocity
}
