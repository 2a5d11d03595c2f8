use crate::error::{ConstructionError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

/// An infinite plane in implicit form `n . p = d`.
///
/// The stored normal is unit length; the positive half-space is the side
/// the normal points into (`side_value > 0`).
#[derive(Debug, Clone)]
pub struct Plane {
    normal: Vector3,
    offset: f64,
}

impl Plane {
    /// Creates a plane from a normal vector and offset, `n . p = d`.
    ///
    /// The normal is normalized and the offset rescaled to match.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal is zero-length.
    pub fn new(normal: Vector3, offset: f64) -> Result<Self> {
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(
                ConstructionError::DegenerateSurface("zero-length plane normal".into()).into(),
            );
        }
        Ok(Self {
            normal: normal / len,
            offset: offset / len,
        })
    }

    /// Creates a plane through `point` with the given normal direction.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal is zero-length.
    pub fn from_point_normal(point: Point3, normal: Vector3) -> Result<Self> {
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(
                ConstructionError::DegenerateSurface("zero-length plane normal".into()).into(),
            );
        }
        let normal = normal / len;
        Ok(Self {
            normal,
            offset: normal.dot(&point.coords),
        })
    }

    /// Returns the unit normal.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Returns the offset `d` in `n . p = d`.
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Signed distance from the point to the plane.
    #[must_use]
    pub fn side_value(&self, point: &Point3) -> f64 {
        self.normal.dot(&point.coords) - self.offset
    }

    /// Gradient of the implicit function (constant for a plane).
    #[must_use]
    pub fn gradient(&self, _point: &Point3) -> Vector3 {
        self.normal
    }

    /// Ray parameters `t` where `origin + t * dir` meets the plane.
    #[must_use]
    pub fn line_roots(&self, origin: &Point3, dir: &Vector3) -> Vec<f64> {
        let denom = self.normal.dot(dir);
        if denom.abs() < TOLERANCE {
            return Vec::new();
        }
        vec![-self.side_value(origin) / denom]
    }

    /// True when `other` describes the same plane with the same orientation.
    #[must_use]
    pub fn coeff_equal(&self, other: &Plane, tol: f64) -> bool {
        (self.normal - other.normal).norm() < tol && (self.offset - other.offset).abs() < tol
    }

    /// True when `other` is the same plane with the normal reversed.
    #[must_use]
    pub fn mirror_equal(&self, other: &Plane, tol: f64) -> bool {
        (self.normal + other.normal).norm() < tol && (self.offset + other.offset).abs() < tol
    }
}
