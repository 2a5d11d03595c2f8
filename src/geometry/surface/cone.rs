use crate::error::{ConstructionError, Result};
use crate::math::quadratic::solve_quadratic;
use crate::math::{Point3, Vector3, TOLERANCE};

/// Sheet selection for a cone.
///
/// `Positive` keeps the sheet opening along the axis direction from the
/// apex, `Negative` the opposite sheet, `Both` the full double cone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sheet {
    Both,
    Positive,
    Negative,
}

impl Sheet {
    /// The sheet selected when the axis direction is reversed.
    #[must_use]
    pub fn reversed(self) -> Sheet {
        match self {
            Sheet::Both => Sheet::Both,
            Sheet::Positive => Sheet::Negative,
            Sheet::Negative => Sheet::Positive,
        }
    }

    fn keeps(self, axial: f64) -> bool {
        match self {
            Sheet::Both => true,
            Sheet::Positive => axial >= 0.0,
            Sheet::Negative => axial <= 0.0,
        }
    }
}

/// An infinite cone in implicit form.
///
/// Defined by an apex, a (normalized) axis direction, the squared tangent
/// of the half-angle, and a sheet selector. The side value is the quadric
/// residual `rho^2 - tan^2 * h^2` (`rho` = distance from the axis, `h` =
/// axial distance from the apex), negative inside the selected sheet.
/// Points on a deselected sheet always evaluate positive.
#[derive(Debug, Clone)]
pub struct Cone {
    apex: Point3,
    axis: Vector3,
    tan_sq: f64,
    sheet: Sheet,
}

impl Cone {
    /// Creates a new cone.
    ///
    /// # Errors
    ///
    /// Returns an error if the squared tangent is non-positive or the axis
    /// is zero-length.
    pub fn new(apex: Point3, axis: Vector3, tan_sq: f64, sheet: Sheet) -> Result<Self> {
        if tan_sq < TOLERANCE {
            return Err(ConstructionError::DegenerateSurface(
                "cone tangent-squared must be positive".into(),
            )
            .into());
        }
        let len = axis.norm();
        if len < TOLERANCE {
            return Err(
                ConstructionError::DegenerateSurface("zero-length cone axis".into()).into(),
            );
        }
        Ok(Self {
            apex,
            axis: axis / len,
            tan_sq,
            sheet,
        })
    }

    /// Returns the apex.
    #[must_use]
    pub fn apex(&self) -> &Point3 {
        &self.apex
    }

    /// Returns the axis direction (unit vector).
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Returns the squared tangent of the half-angle.
    #[must_use]
    pub fn tan_sq(&self) -> f64 {
        self.tan_sq
    }

    /// Returns the sheet selector.
    #[must_use]
    pub fn sheet(&self) -> Sheet {
        self.sheet
    }

    /// Quadric residual, negative inside the selected sheet.
    #[must_use]
    pub fn side_value(&self, point: &Point3) -> f64 {
        let w = point - self.apex;
        let h = w.dot(&self.axis);
        let rho_sq = (w.norm_squared() - h * h).max(0.0);
        if self.sheet.keeps(h) {
            rho_sq - self.tan_sq * h * h
        } else {
            // Deselected sheet counts as outside.
            rho_sq + self.tan_sq * h * h
        }
    }

    /// Outward gradient direction of the quadric at (or near) the surface.
    #[must_use]
    pub fn gradient(&self, point: &Point3) -> Vector3 {
        let w = point - self.apex;
        let h = w.dot(&self.axis);
        w - self.axis * ((1.0 + self.tan_sq) * h)
    }

    /// Ray parameters `t` where `origin + t * dir` meets the selected sheet.
    #[must_use]
    pub fn line_roots(&self, origin: &Point3, dir: &Vector3) -> Vec<f64> {
        let k = 1.0 + self.tan_sq;
        let w = origin - self.apex;
        let wa = w.dot(&self.axis);
        let da = dir.dot(&self.axis);
        let mut roots = solve_quadratic(
            dir.norm_squared() - k * da * da,
            2.0 * (w.dot(dir) - k * wa * da),
            w.norm_squared() - k * wa * wa,
        );
        roots.retain(|t| self.sheet.keeps(wa + t * da));
        roots
    }

    /// True when `other` describes the same cone within tolerance.
    ///
    /// A reversed axis with the complementary sheet selector is the same
    /// surface.
    #[must_use]
    pub fn coeff_equal(&self, other: &Cone, tol: f64) -> bool {
        if (self.apex - other.apex).norm() >= tol || (self.tan_sq - other.tan_sq).abs() >= tol {
            return false;
        }
        if (self.axis - other.axis).norm() < tol {
            return self.sheet == other.sheet;
        }
        if (self.axis + other.axis).norm() < tol {
            return self.sheet == other.sheet.reversed();
        }
        false
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

    // ── sheet filtering: the ky cards from the reference data ──

    #[test]
    fn positive_sheet_misses_below_apex() {
        // ky 1 1 1 : apex (0,1,0), axis +y, positive sheet only.
        let c = Cone::new(p(0.0, 1.0, 0.0), v(0.0, 1.0, 0.0), 1.0, Sheet::Positive).unwrap();
        let r = c.line_roots(&p(-3.0, 0.0, 0.0), &v(1.0, 0.0, 0.0));
        assert!(r.is_empty());
    }

    #[test]
    fn negative_sheet_hits_twice() {
        // ky 1 1 -1 : same cone, opposite sheet.
        let c = Cone::new(p(0.0, 1.0, 0.0), v(0.0, 1.0, 0.0), 1.0, Sheet::Negative).unwrap();
        let r = c.line_roots(&p(-3.0, 0.0, 0.0), &v(1.0, 0.0, 0.0));
        assert_eq!(r.len(), 2);
        assert!((r[0] - 2.0).abs() < 1e-9);
        assert!((r[1] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn double_cone_hits_both_sheets() {
        // Ray parallel to the axis at unit offset crosses each sheet once.
        let c = Cone::new(Point3::origin(), v(0.0, 0.0, 1.0), 1.0, Sheet::Both).unwrap();
        let r = c.line_roots(&p(1.0, 0.0, -10.0), &v(0.0, 0.0, 1.0));
        assert_eq!(r.len(), 2);
        assert!((r[0] - 9.0).abs() < 1e-9);
        assert!((r[1] - 11.0).abs() < 1e-9);
    }

    #[test]
    fn side_value_inside_selected_sheet() {
        let c = Cone::new(Point3::origin(), v(0.0, 0.0, 1.0), 1.0, Sheet::Positive).unwrap();
        // On the axis, above the apex: inside.
        assert!(c.side_value(&p(0.0, 0.0, 5.0)) < 0.0);
        // Mirror point is on the deselected sheet: outside.
        assert!(c.side_value(&p(0.0, 0.0, -5.0)) > 0.0);
        // Wide of the cone: outside.
        assert!(c.side_value(&p(9.0, 0.0, 1.0)) > 0.0);
    }

    #[test]
    fn reversed_axis_matches_complementary_sheet() {
        let a = Cone::new(Point3::origin(), v(0.0, 0.0, 1.0), 0.5, Sheet::Positive).unwrap();
        let b = Cone::new(Point3::origin(), v(0.0, 0.0, -1.0), 0.5, Sheet::Negative).unwrap();
        assert!(a.coeff_equal(&b, 1e-8));
        let c = Cone::new(Point3::origin(), v(0.0, 0.0, -1.0), 0.5, Sheet::Positive).unwrap();
        assert!(!a.coeff_equal(&c, 1e-8));
    }

    #[test]
    fn invalid_tangent() {
        assert!(Cone::new(Point3::origin(), v(0.0, 0.0, 1.0), 0.0, Sheet::Both).is_err());
    }
}
