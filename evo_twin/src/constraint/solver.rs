//! Gauss-Seidel constraint solver with Baumgarte stabilization.
//!
//! # Contacts
//!
//! Each pass visits the contacts in order. For a contact with current
//! residual penetration `d` the normal impulse increment is
//!
//! ```text
//! Δλ = k·d·dt + c·(β·d/dt)·dt
//! ```
//!
//! The accumulated impulse is clamped at zero. The applied increment becomes
//! a positional correction `Δλ·dt/m_eff` (never more than `d`), split evenly
//! between the two bodies, so later contacts sharing a body see the updated
//! separation within the same pass.
//!
//! Friction aims to cancel the relative tangential velocity (`λ_t = −m_eff·v_t`)
//! and is projected onto the Coulomb cone of the current normal impulse.
//!
//! # Joint limits
//!
//! The violation is driven toward zero by the same spring-damper law, then
//! projected exactly onto `clamp(v, min, max)`. Limit constraints always end
//! `Resolved` and report a `JointLimitViolation`.
//!
//! # Warm start
//!
//! Impulses cached from the previous step under the same constraint key
//! seed the accumulators after decay, and their correction is applied
//! before the first pass.

use std::collections::HashMap;

use nalgebra::{Vector2, Vector3};
use tracing::{debug, warn};

use evo_twin_common::config::SolverConfig;
use evo_twin_common::contact::{
    CachedImpulse, Constraint, ConstraintKind, ConstraintStatus, ResolvedConstraint,
    ResolvedKind, WarmStart,
};
use evo_twin_common::warning::StepWarning;

use super::friction::FrictionCone;

/// Result of one solve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveOutcome {
    /// Solved constraints in input order.
    pub resolved: Vec<ResolvedConstraint>,
    /// Impulse cache for the next step.
    pub warm_start: WarmStart,
    /// `JointLimitViolation` and `ConstraintDivergence` warnings.
    pub warnings: Vec<StepWarning>,
    /// Passes performed.
    pub iterations: usize,
    /// Largest residual penetration over all contacts [mm].
    pub max_residual: f64,
}

impl SolveOutcome {
    /// True if any constraint diverged.
    pub fn diverged(&self) -> bool {
        self.resolved.iter().any(ResolvedConstraint::diverged)
    }

    /// Corrected value of every clamped joint, as `(joint index, value)`.
    pub fn corrected_joints(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.resolved.iter().filter_map(|r| match r.kind {
            ResolvedKind::JointLimit {
                joint, corrected, ..
            } => Some((joint, corrected)),
            ResolvedKind::Contact { .. } => None,
        })
    }
}

/// Iterative solver for contact and joint-limit constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintSolver {
    config: SolverConfig,
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

/// Per-contact scratch state kept across passes.
struct ContactRow {
    pen0: f64,
    normal: Vector3<f64>,
    body_a: String,
    body_b: String,
    cone: FrictionCone,
    tangent_target: Vector2<f64>,
}

impl ConstraintSolver {
    /// Create a solver.
    pub const fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Solver parameters.
    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve with the configured iteration count and time step.
    pub fn solve_default(&self, constraints: &mut [Constraint], warm_start: &WarmStart) -> SolveOutcome {
        self.solve(constraints, warm_start, self.config.iterations, self.config.dt)
    }

    /// Resolve `constraints` in place.
    ///
    /// Impulses and statuses are written back into `constraints`; the outcome
    /// carries the same results as [`ResolvedConstraint`]s plus the new
    /// warm-start cache. Identical inputs give identical outputs.
    pub fn solve(
        &self,
        constraints: &mut [Constraint],
        warm_start: &WarmStart,
        iterations: usize,
        dt: f64,
    ) -> SolveOutcome {
        let cfg = &self.config;
        let dt = if dt > 0.0 && dt.is_finite() { dt } else { cfg.dt };
        let mass = cfg.effective_mass;
        let decay = cfg.warm_start_decay;

        let mut displacement: HashMap<String, Vector3<f64>> = HashMap::new();
        let mut rows: Vec<Option<ContactRow>> = Vec::with_capacity(constraints.len());
        let mut limit_remaining: Vec<f64> = vec![0.0; constraints.len()];
        let mut limit_impulse: Vec<f64> = vec![0.0; constraints.len()];

        // ─── Setup and warm start ───
        for (i, c) in constraints.iter_mut().enumerate() {
            let cached = warm_start.get(&c.key).copied().unwrap_or_default();
            match &mut c.kind {
                ConstraintKind::Contact {
                    contact,
                    normal_impulse,
                    tangent_impulse1,
                    tangent_impulse2,
                } => {
                    let cone = FrictionCone::new(contact.friction);
                    let v_t = Vector2::new(contact.tangent_velocity[0], contact.tangent_velocity[1]);
                    let row = ContactRow {
                        pen0: contact.penetration_depth,
                        normal: contact.normal,
                        body_a: contact.body_a.clone(),
                        body_b: contact.body_b.clone(),
                        cone,
                        tangent_target: -v_t * mass,
                    };

                    *normal_impulse = (cached.normal * decay).max(0.0);
                    let t = cone.project(
                        Vector2::new(cached.tangent[0], cached.tangent[1]) * decay,
                        *normal_impulse,
                    );
                    *tangent_impulse1 = t.x;
                    *tangent_impulse2 = t.y;

                    if *normal_impulse > 0.0 {
                        let residual = residual_of(&row, &displacement);
                        let correction = (*normal_impulse * dt / mass).clamp(0.0, residual.max(0.0));
                        apply_correction(&row, correction, &mut displacement);
                    }
                    rows.push(Some(row));
                }
                ConstraintKind::JointLimit { error, .. } => {
                    let impulse = (cached.normal * decay).max(0.0);
                    limit_impulse[i] = impulse;
                    limit_remaining[i] = *error - (impulse * dt / mass).min(*error);
                    rows.push(None);
                }
            }
        }

        // ─── Gauss-Seidel passes ───
        for _ in 0..iterations {
            for (i, c) in constraints.iter_mut().enumerate() {
                let gain = c.stiffness * dt + c.damping * cfg.baumgarte;
                match (&mut c.kind, &rows[i]) {
                    (
                        ConstraintKind::Contact {
                            normal_impulse,
                            tangent_impulse1,
                            tangent_impulse2,
                            ..
                        },
                        Some(row),
                    ) => {
                        let residual = residual_of(row, &displacement);
                        let previous = *normal_impulse;
                        *normal_impulse = (previous + gain * residual).max(0.0);
                        let applied = *normal_impulse - previous;
                        let correction =
                            (applied * dt / mass).clamp(residual.min(0.0), residual.max(0.0));
                        apply_correction(row, correction, &mut displacement);

                        let t = row.cone.project(row.tangent_target, *normal_impulse);
                        *tangent_impulse1 = t.x;
                        *tangent_impulse2 = t.y;
                    }
                    (ConstraintKind::JointLimit { .. }, _) => {
                        let remaining = limit_remaining[i];
                        let delta = gain * remaining;
                        limit_impulse[i] += delta;
                        limit_remaining[i] = remaining - (delta * dt / mass).min(remaining);
                    }
                    (ConstraintKind::Contact { .. }, None) => {}
                }
            }
        }

        // ─── Status, projection and outcome ───
        let mut outcome = SolveOutcome {
            iterations,
            ..Default::default()
        };
        for (i, c) in constraints.iter_mut().enumerate() {
            match (&mut c.kind, &rows[i]) {
                (
                    ConstraintKind::Contact {
                        normal_impulse,
                        tangent_impulse1,
                        tangent_impulse2,
                        contact,
                    },
                    Some(row),
                ) => {
                    *normal_impulse = normal_impulse.max(0.0);
                    let t = row.cone.project(
                        Vector2::new(*tangent_impulse1, *tangent_impulse2),
                        *normal_impulse,
                    );
                    *tangent_impulse1 = t.x;
                    *tangent_impulse2 = t.y;

                    let residual = residual_of(row, &displacement).max(0.0);
                    outcome.max_residual = outcome.max_residual.max(residual);
                    c.status = if residual > cfg.penetration_tolerance {
                        ConstraintStatus::Diverged
                    } else {
                        ConstraintStatus::Resolved
                    };
                    if c.status == ConstraintStatus::Diverged {
                        warn!("Constraint {} diverged, residual {residual:.5} mm", c.key);
                        outcome.warnings.push(StepWarning::ConstraintDivergence {
                            constraint: c.key.to_string(),
                            residual,
                        });
                    }

                    outcome.warm_start.insert(
                        c.key.clone(),
                        CachedImpulse {
                            normal: *normal_impulse,
                            tangent: [t.x, t.y],
                        },
                    );
                    outcome.resolved.push(ResolvedConstraint {
                        key: c.key.clone(),
                        status: c.status,
                        kind: ResolvedKind::Contact {
                            body_a: contact.body_a.clone(),
                            body_b: contact.body_b.clone(),
                            normal_impulse: *normal_impulse,
                            tangent_impulse1: t.x,
                            tangent_impulse2: t.y,
                            friction: contact.friction,
                            initial_penetration: row.pen0,
                            residual_penetration: residual,
                        },
                    });
                }
                (
                    ConstraintKind::JointLimit {
                        joint,
                        joint_name,
                        side,
                        value,
                        limit,
                        ..
                    },
                    _,
                ) => {
                    c.status = ConstraintStatus::Resolved;
                    outcome.warm_start.insert(
                        c.key.clone(),
                        CachedImpulse {
                            normal: limit_impulse[i],
                            tangent: [0.0; 2],
                        },
                    );
                    outcome.warnings.push(StepWarning::JointLimitViolation {
                        joint: joint_name.clone(),
                        side: *side,
                        commanded: *value,
                        clamped: *limit,
                    });
                    outcome.resolved.push(ResolvedConstraint {
                        key: c.key.clone(),
                        status: c.status,
                        kind: ResolvedKind::JointLimit {
                            joint: *joint,
                            joint_name: joint_name.clone(),
                            side: *side,
                            commanded: *value,
                            corrected: *limit,
                            impulse: limit_impulse[i],
                        },
                    });
                }
                (ConstraintKind::Contact { .. }, None) => {}
            }
        }

        debug!(
            "Solved {} constraints in {} passes, max residual {:.5} mm",
            outcome.resolved.len(),
            iterations,
            outcome.max_residual
        );
        outcome
    }
}

/// Penetration left after the displacements applied so far.
fn residual_of(row: &ContactRow, displacement: &HashMap<String, Vector3<f64>>) -> f64 {
    let d_a = displacement.get(&row.body_a).copied().unwrap_or_else(Vector3::zeros);
    let d_b = displacement.get(&row.body_b).copied().unwrap_or_else(Vector3::zeros);
    row.pen0 - (d_b - d_a).dot(&row.normal)
}

/// Separate the bodies by `correction` along the normal, half each.
fn apply_correction(
    row: &ContactRow,
    correction: f64,
    displacement: &mut HashMap<String, Vector3<f64>>,
) {
    if correction == 0.0 {
        return;
    }
    let half = row.normal * (0.5 * correction);
    *displacement
        .entry(row.body_a.clone())
        .or_insert_with(Vector3::zeros) -= half;
    *displacement
        .entry(row.body_b.clone())
        .or_insert_with(Vector3::zeros) += half;
}
