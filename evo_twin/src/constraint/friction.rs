//! Coulomb friction cone.
//!
//! Tangential impulses are confined to `‖λ_t‖ ≤ μ·λ_n` by radial projection
//! onto the cone boundary.

use nalgebra::Vector2;

/// Isotropic friction cone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionCone {
    /// Coulomb friction coefficient.
    pub mu: f64,
}

impl FrictionCone {
    /// Cone with coefficient `mu` (negative values are treated as zero).
    #[must_use]
    pub fn new(mu: f64) -> Self {
        Self { mu: mu.max(0.0) }
    }

    /// Largest tangential impulse allowed for `normal` impulse.
    #[inline]
    #[must_use]
    pub fn max_tangent(&self, normal: f64) -> f64 {
        self.mu * normal.max(0.0)
    }

    /// Project a tangential impulse onto the cone.
    #[must_use]
    pub fn project(&self, tangent: Vector2<f64>, normal: f64) -> Vector2<f64> {
        let limit = self.max_tangent(normal);
        if limit <= 0.0 {
            return Vector2::zeros();
        }

        let magnitude = tangent.norm();
        if magnitude <= limit {
            tangent
        } else {
            tangent * (limit / magnitude)
        }
    }

    /// True if `tangent` lies inside the cone (with a small tolerance).
    #[must_use]
    pub fn contains(&self, tangent: &Vector2<f64>, normal: f64) -> bool {
        tangent.norm() <= self.max_tangent(normal) + 1e-10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inside_is_unchanged() {
        let cone = FrictionCone::new(0.5);
        let t = Vector2::new(1.0, 1.0);
        assert_eq!(cone.project(t, 10.0), t);
        assert!(cone.contains(&t, 10.0));
    }

    #[test]
    fn outside_is_scaled_to_boundary() {
        let cone = FrictionCone::new(0.5);
        let p = cone.project(Vector2::new(30.0, 40.0), 10.0);
        assert!((p.norm() - 5.0).abs() < 1e-12);
        assert!((p.x / p.y - 0.75).abs() < 1e-12);
    }

    #[test]
    fn zero_normal_or_mu_removes_friction() {
        assert_eq!(
            FrictionCone::new(0.5).project(Vector2::new(1.0, 0.0), 0.0),
            Vector2::zeros()
        );
        assert_eq!(
            FrictionCone::new(-1.0).project(Vector2::new(1.0, 0.0), 10.0),
            Vector2::zeros()
        );
    }
}
