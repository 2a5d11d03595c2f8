use crate::error::{ConstructionError, Result};
use crate::math::quadratic::solve_quadratic;
use crate::math::{Point3, Vector3, TOLERANCE};

/// A spherical surface.
///
/// The implicit side value is the metric distance to the centre minus the
/// radius, so `side_value < 0` inside the sphere.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point3,
    radius: f64,
}

impl Sphere {
    /// Creates a new sphere.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive.
    pub fn new(center: Point3, radius: f64) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(
                ConstructionError::DegenerateSurface("sphere radius must be positive".into())
                    .into(),
            );
        }
        Ok(Self { center, radius })
    }

    /// Returns the centre.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Distance to the centre minus the radius.
    #[must_use]
    pub fn side_value(&self, point: &Point3) -> f64 {
        (point - self.center).norm() - self.radius
    }

    /// Outward gradient direction at (or near) the surface.
    #[must_use]
    pub fn gradient(&self, point: &Point3) -> Vector3 {
        point - self.center
    }

    /// Ray parameters `t` where `origin + t * dir` meets the sphere.
    #[must_use]
    pub fn line_roots(&self, origin: &Point3, dir: &Vector3) -> Vec<f64> {
        let w = origin - self.center;
        solve_quadratic(
            dir.norm_squared(),
            2.0 * dir.dot(&w),
            w.norm_squared() - self.radius * self.radius,
        )
    }

    /// True when `other` describes the same sphere within tolerance.
    #[must_use]
    pub fn coeff_equal(&self, other: &Sphere, tol: f64) -> bool {
        (self.center - other.center).norm() < tol && (self.radius - other.radius).abs() < tol
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn v(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z)
    }

    #[test]
    fn side_sign_convention() {
        let s = Sphere::new(Point3::origin(), 6.0).unwrap();
        assert!(s.side_value(&p(0.0, 0.0, 0.0)) < 0.0);
        assert!(s.side_value(&p(10.0, 0.0, 0.0)) > 0.0);
        assert!(s.side_value(&p(6.0, 0.0, 0.0)).abs() < TOLERANCE);
    }

    #[test]
    fn chord_roots() {
        let s = Sphere::new(Point3::origin(), 25.0).unwrap();
        let r = s.line_roots(&p(-30.0, 0.0, 0.0), &v(1.0, 0.0, 0.0));
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[0], 5.0, epsilon = 1e-9);
        assert_relative_eq!(r[1], 55.0, epsilon = 1e-9);
    }

    #[test]
    fn off_centre_chord() {
        // c/z-style offset: centre (3,5,0), radius 50, ray along +x from origin.
        let s = Sphere::new(p(3.0, 5.0, 0.0), 50.0).unwrap();
        let r = s.line_roots(&Point3::origin(), &v(1.0, 0.0, 0.0));
        assert_eq!(r.len(), 2);
        let expect = (50.0_f64 * 50.0 - 25.0).sqrt() + 3.0;
        assert_relative_eq!(r[1], expect, epsilon = 1e-9);
    }

    #[test]
    fn tangent_single_root() {
        let s = Sphere::new(Point3::origin(), 5.0).unwrap();
        let r = s.line_roots(&p(-10.0, 5.0, 0.0), &v(1.0, 0.0, 0.0));
        assert_eq!(r.len(), 1);
        assert!((r[0] - 10.0).abs() < 1e-6);
    }

    #[test]
    fn miss_has_no_roots() {
        let s = Sphere::new(Point3::origin(), 5.0).unwrap();
        assert!(s
            .line_roots(&p(-10.0, 8.0, 0.0), &v(1.0, 0.0, 0.0))
            .is_empty());
    }

    #[test]
    fn gradient_points_outward() {
        let s = Sphere::new(Point3::origin(), 2.0).unwrap();
        let g = s.gradient(&p(2.0, 0.0, 0.0));
        assert!(g.x > 0.0);
    }

    #[test]
    fn invalid_radius() {
        assert!(Sphere::new(Point3::origin(), 0.0).is_err());
    }
}
