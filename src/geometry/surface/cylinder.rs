use crate::error::{ConstructionError, Result};
use crate::math::quadratic::solve_quadratic;
use crate::math::{Point3, Vector3, TOLERANCE};

/// An infinite circular cylinder.
///
/// Defined by a point on the axis, the (normalized) axis direction, and the
/// radius. The implicit side value is the distance to the axis minus the
/// radius, so `side_value < 0` inside the cylinder.
#[derive(Debug, Clone)]
pub struct Cylinder {
    axis_point: Point3,
    axis: Vector3,
    radius: f64,
}

impl Cylinder {
    /// Creates a new cylinder.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive or the axis is
    /// zero-length.
    pub fn new(axis_point: Point3, axis: Vector3, radius: f64) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(
                ConstructionError::DegenerateSurface("cylinder radius must be positive".into())
                    .into(),
            );
        }
        let len = axis.norm();
        if len < TOLERANCE {
            return Err(
                ConstructionError::DegenerateSurface("zero-length cylinder axis".into()).into(),
            );
        }
        Ok(Self {
            axis_point,
            axis: axis / len,
            radius,
        })
    }

    /// Returns a point on the axis.
    #[must_use]
    pub fn axis_point(&self) -> &Point3 {
        &self.axis_point
    }

    /// Returns the axis direction (unit vector).
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn perp(&self, point: &Point3) -> Vector3 {
        let w = point - self.axis_point;
        w - self.axis * w.dot(&self.axis)
    }

    /// Distance to the axis minus the radius.
    #[must_use]
    pub fn side_value(&self, point: &Point3) -> f64 {
        self.perp(point).norm() - self.radius
    }

    /// Outward gradient direction at (or near) the surface.
    #[must_use]
    pub fn gradient(&self, point: &Point3) -> Vector3 {
        self.perp(point)
    }

    /// Ray parameters `t` where `origin + t * dir` meets the cylinder.
    #[must_use]
    pub fn line_roots(&self, origin: &Point3, dir: &Vector3) -> Vec<f64> {
        let w = origin - self.axis_point;
        let w_perp = w - self.axis * w.dot(&self.axis);
        let d_perp = dir - self.axis * dir.dot(&self.axis);
        solve_quadratic(
            d_perp.norm_squared(),
            2.0 * d_perp.dot(&w_perp),
            w_perp.norm_squared() - self.radius * self.radius,
        )
    }

    /// True when `other` describes the same cylinder within tolerance.
    ///
    /// The axis is compared as an undirected line: reversed direction and
    /// any point along the axis match.
    #[must_use]
    pub fn coeff_equal(&self, other: &Cylinder, tol: f64) -> bool {
        if (self.radius - other.radius).abs() >= tol {
            return false;
        }
        if self.axis.cross(&other.axis).norm() >= tol {
            return false;
        }
        // Other axis point must lie on this axis line.
        self.perp(&other.axis_point).norm() < tol
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn v(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z)
    }

    #[test]
    fn side_sign_convention() {
        let c = Cylinder::new(Point3::origin(), v(0.0, 0.0, 1.0), 3.0).unwrap();
        assert!(c.side_value(&p(1.0, 0.0, 7.0)) < 0.0);
        assert!(c.side_value(&p(5.0, 0.0, -2.0)) > 0.0);
        assert!(c.side_value(&p(3.0, 0.0, 11.0)).abs() < TOLERANCE);
    }

    #[test]
    fn chord_roots() {
        let c = Cylinder::new(Point3::origin(), v(0.0, 0.0, 1.0), 2.0).unwrap();
        let r = c.line_roots(&p(-5.0, 0.0, 1.0), &v(1.0, 0.0, 0.0));
        assert_eq!(r.len(), 2);
        assert!((r[0] - 3.0).abs() < 1e-9);
        assert!((r[1] - 7.0).abs() < 1e-9);
    }

    #[test]
    fn axial_ray_misses() {
        let c = Cylinder::new(Point3::origin(), v(0.0, 0.0, 1.0), 2.0).unwrap();
        assert!(c
            .line_roots(&p(0.5, 0.0, 0.0), &v(0.0, 0.0, 1.0))
            .is_empty());
    }

    #[test]
    fn offset_axis_roots() {
        // c/z 3 5 50 : axis parallel to z through (3, 5).
        let c = Cylinder::new(p(3.0, 5.0, 0.0), v(0.0, 0.0, 1.0), 50.0).unwrap();
        let r = c.line_roots(&Point3::origin(), &v(1.0, 0.0, 0.0));
        assert_eq!(r.len(), 2);
        let expect = (50.0_f64 * 50.0 - 25.0).sqrt() + 3.0;
        assert!((r[1] - expect).abs() < 1e-9);
    }

    #[test]
    fn axis_line_equality() {
        let a = Cylinder::new(p(0.0, 0.0, 0.0), v(0.0, 0.0, 1.0), 2.0).unwrap();
        let b = Cylinder::new(p(0.0, 0.0, 9.0), v(0.0, 0.0, -1.0), 2.0).unwrap();
        assert!(a.coeff_equal(&b, 1e-8));
        let c = Cylinder::new(p(1.0, 0.0, 0.0), v(0.0, 0.0, 1.0), 2.0).unwrap();
        assert!(!a.coeff_equal(&c, 1e-8));
    }

    #[test]
    fn invalid_radius() {
        assert!(Cylinder::new(Point3::origin(), v(0.0, 0.0, 1.0), -1.0).is_err());
    }
}
