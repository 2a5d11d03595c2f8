pub mod quadratic;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Tolerance for classifying a point as lying on a surface.
///
/// Wider than [`TOLERANCE`] because points delivered by ray tracking carry
/// the accumulated error of a quadratic root plus a point advance.
pub const SURFACE_TOL: f64 = 1e-8;

/// Formats a point for diagnostic messages.
#[must_use]
pub fn fmt_point(p: &Point3) -> String {
    format!("({:.6}, {:.6}, {:.6})", p.x, p.y, p.z)
}

/// Formats a direction vector for diagnostic messages.
#[must_use]
pub fn fmt_dir(v: &Vector3) -> String {
    format!("({:.6}, {:.6}, {:.6})", v.x, v.y, v.z)
}
