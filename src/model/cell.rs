use crate::algebra::{self, RuleTree, SignedSurface, SurfaceId};
use crate::error::{GeometryInconsistency, Result};
use crate::math::{fmt_dir, fmt_point, Point3, Vector3, TOLERANCE};

use super::registry::SurfaceRegistry;

/// Cell identifier.
pub type CellId = u32;

/// Minimum crossing distance accepted by ray tracking; smaller roots are
/// the residue of the crossing just made.
pub const TRACK_TOL: f64 = 1e-8;

/// A region of space: a material filling the volume described by a rule
/// tree over signed surfaces.
///
/// The flattened boundary-surface list is cached and rebuilt eagerly on
/// every rule mutation, so readers never observe a stale list.
#[derive(Debug, Clone)]
pub struct Cell {
    id: CellId,
    material: u32,
    density: f64,
    rule: RuleTree,
    boundary: Vec<SignedSurface>,
}

impl Cell {
    /// Creates a cell from an assembled rule tree.
    ///
    /// # Errors
    ///
    /// Returns an error for a corrupt rule arena.
    pub fn new(id: CellId, material: u32, density: f64, rule: RuleTree) -> Result<Self> {
        let mut cell = Self {
            id,
            material,
            density,
            rule,
            boundary: Vec::new(),
        };
        cell.rebuild_boundary()?;
        Ok(cell)
    }

    /// Creates a cell from an algebra expression, the usual builder path.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed algebra text.
    pub fn from_expr(id: CellId, material: u32, density: f64, expr: &str) -> Result<Self> {
        Self::new(id, material, density, algebra::parse(expr)?)
    }

    /// Returns the cell id.
    #[must_use]
    pub fn id(&self) -> CellId {
        self.id
    }

    /// Returns the material id (0 = void).
    #[must_use]
    pub fn material(&self) -> u32 {
        self.material
    }

    /// Returns the material density.
    #[must_use]
    pub fn density(&self) -> f64 {
        self.density
    }

    /// True for a void cell.
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.material == 0
    }

    /// Returns the boundary rule tree.
    #[must_use]
    pub fn rule(&self) -> &RuleTree {
        &self.rule
    }

    /// The cached flattened list of signed boundary surfaces.
    #[must_use]
    pub fn boundary_surfaces(&self) -> &[SignedSurface] {
        &self.boundary
    }

    /// Intersects an extra signed surface into the boundary (assembly
    /// phase only; see [`Universe::add_cell`](super::Universe::add_cell)).
    ///
    /// # Errors
    ///
    /// Returns an error for surface id 0 or a corrupt rule arena.
    pub fn add_intersection(&mut self, surface: SignedSurface) -> Result<()> {
        self.rule.add_intersection(surface)?;
        self.rebuild_boundary()
    }

    /// Unions an extra signed surface into the boundary (assembly phase
    /// only).
    ///
    /// # Errors
    ///
    /// Returns an error for surface id 0 or a corrupt rule arena.
    pub fn add_union(&mut self, surface: SignedSurface) -> Result<()> {
        self.rule.add_union(surface)?;
        self.rebuild_boundary()
    }

    /// Replaces the boundary rule wholesale (assembly phase only).
    ///
    /// # Errors
    ///
    /// Returns an error for a corrupt rule arena.
    pub fn set_rule(&mut self, rule: RuleTree) -> Result<()> {
        self.rule = rule;
        self.rebuild_boundary()
    }

    fn rebuild_boundary(&mut self) -> Result<()> {
        self.boundary = self.rule.collect_signed()?.into_iter().collect();
        Ok(())
    }

    /// True when the point lies in the cell.
    ///
    /// # Errors
    ///
    /// Returns an error for a surface missing from the registry.
    pub fn is_valid(&self, registry: &SurfaceRegistry, point: &Point3) -> Result<bool> {
        self.rule.evaluate(registry, point)
    }

    /// Containment test ignoring the listed surfaces, for points lying
    /// exactly on a boundary.
    ///
    /// # Errors
    ///
    /// Returns an error for a surface missing from the registry.
    pub fn is_valid_excluding(
        &self,
        registry: &SurfaceRegistry,
        point: &Point3,
        excluded: &[SurfaceId],
    ) -> Result<bool> {
        self.rule.evaluate_excluding(registry, point, excluded)
    }

    /// Rule value with the named surface forced to each side:
    /// `(negative-side value, positive-side value)`. The surface is a real
    /// boundary of the cell at `point` exactly when the two differ.
    ///
    /// # Errors
    ///
    /// Returns an error for a surface missing from the registry.
    pub fn pair_valid(
        &self,
        registry: &SurfaceRegistry,
        surface: SurfaceId,
        point: &Point3,
    ) -> Result<(bool, bool)> {
        Ok((
            self.rule.evaluate_forced(registry, point, surface, false)?,
            self.rule.evaluate_forced(registry, point, surface, true)?,
        ))
    }

    /// Finds the exit of a ray from inside the cell.
    ///
    /// Intersects the ray with every cached boundary surface and keeps the
    /// smallest distance beyond [`TRACK_TOL`] whose crossing is not
    /// tangential, actually flips containment, and is not the crossing
    /// just made (`exclude`). Returns the distance and the exit surface
    /// signed by the side the ray leaves, so the neighbouring cell is
    /// registered under the negated value.
    ///
    /// # Errors
    ///
    /// [`GeometryInconsistency::NoExitSurface`] when no crossing
    /// qualifies: either a leaky cell definition, or a ray that never
    /// leaves an unbounded cell.
    pub fn track_out_cell(
        &self,
        registry: &SurfaceRegistry,
        origin: &Point3,
        dir: &Vector3,
        exclude: Option<SignedSurface>,
    ) -> Result<(f64, SignedSurface)> {
        let mut best: Option<(f64, SignedSurface)> = None;
        let mut previous: Option<SurfaceId> = None;

        // Boundary list is sorted by signed id; both signs of one surface
        // resolve to the same geometry, so skip duplicates by magnitude.
        let mut ids: Vec<SurfaceId> = self
            .boundary
            .iter()
            .map(|s| s.unsigned_abs())
            .collect();
        ids.sort_unstable();

        for id in ids {
            if previous == Some(id) {
                continue;
            }
            previous = Some(id);

            let surface = registry.get(id)?;
            for t in surface.line_roots(origin, dir) {
                if t <= TRACK_TOL {
                    continue;
                }
                if best.is_some_and(|(bt, _)| t >= bt) {
                    continue;
                }
                let crossing = origin + dir * t;
                let gradient = surface.gradient(&crossing);
                let along = dir.dot(&gradient);
                // Tangential touch: the ray does not change sides.
                if along.abs() <= TOLERANCE * gradient.norm().max(1.0) {
                    continue;
                }
                let leaving = algebra::with_sign(id, along < 0.0);
                if exclude == Some(leaving) {
                    continue;
                }
                let (negative, positive) = self.pair_valid(registry, id, &crossing)?;
                if negative == positive {
                    continue;
                }
                best = Some((t, leaving));
            }
        }

        best.ok_or_else(|| {
            GeometryInconsistency::NoExitSurface {
                cell: self.id,
                detail: format!(
                    "from {} along {} over boundary {:?}",
                    fmt_point(origin),
                    fmt_dir(dir),
                    self.boundary
                ),
            }
            .into()
        })
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

    /// Concentric spheres: inner r=6 (cell 2), shell 6..25 (cell 3).
    fn sphere_registry() -> SurfaceRegistry {
        let mut reg = SurfaceRegistry::new();
        reg.register_card(100, "so 25").unwrap();
        reg.register_card(101, "so 6.0").unwrap();
        reg
    }

    #[test]
    fn containment_follows_rule() {
        let reg = sphere_registry();
        let shell = Cell::from_expr(3, 7, 7.8, "-100 101").unwrap();
        assert!(shell.is_valid(&reg, &p(10.0, 0.0, 0.0)).unwrap());
        assert!(!shell.is_valid(&reg, &p(0.0, 0.0, 0.0)).unwrap());
        assert!(!shell.is_valid(&reg, &p(30.0, 0.0, 0.0)).unwrap());
    }

    #[test]
    fn boundary_cache_tracks_mutation() {
        let mut cell = Cell::from_expr(1, 0, 0.0, "-100").unwrap();
        assert_eq!(cell.boundary_surfaces(), &[-100]);
        cell.add_intersection(101).unwrap();
        assert_eq!(cell.boundary_surfaces(), &[-100, 101]);
        cell.add_union(-102).unwrap();
        assert_eq!(cell.boundary_surfaces(), &[-102, -100, 101]);
    }

    #[test]
    fn exclusion_rescues_on_surface_point() {
        let reg = sphere_registry();
        let inner = Cell::from_expr(2, 78, 7.8, "-101").unwrap();
        let boundary_point = p(6.0, 0.0, 0.0);
        assert!(inner
            .is_valid_excluding(&reg, &boundary_point, &[101])
            .unwrap());
    }

    #[test]
    fn pair_valid_flags_boundary() {
        let reg = sphere_registry();
        let shell = Cell::from_expr(3, 7, 7.8, "-100 101").unwrap();
        let on_inner = p(6.0, 0.0, 0.0);
        let (neg, pos) = shell.pair_valid(&reg, 101, &on_inner).unwrap();
        assert_ne!(neg, pos);
        // Surface 100 is nowhere near this point but still a boundary in
        // the rule sense: forcing it changes the value.
        let (neg, pos) = shell.pair_valid(&reg, 100, &on_inner).unwrap();
        assert_ne!(neg, pos);
    }

    #[test]
    fn track_out_finds_nearest_exit() {
        let reg = sphere_registry();
        let shell = Cell::from_expr(3, 7, 7.8, "-100 101").unwrap();
        let (d, exit) = shell
            .track_out_cell(&reg, &p(-25.0, 0.0, 0.0), &v(1.0, 0.0, 0.0), Some(100))
            .unwrap();
        assert!((d - 19.0).abs() < 1e-6);
        assert_eq!(exit, 101);
    }

    #[test]
    fn excluded_entry_surface_is_not_bounced() {
        let reg = sphere_registry();
        let inner = Cell::from_expr(2, 78, 7.8, "-101").unwrap();
        // Entering at x=-6 moving +x; the same sphere is the exit but on
        // the far side, with the opposite orientation label.
        let (d, exit) = inner
            .track_out_cell(&reg, &p(-6.0, 0.0, 0.0), &v(1.0, 0.0, 0.0), Some(101))
            .unwrap();
        assert!((d - 12.0).abs() < 1e-6);
        assert_eq!(exit, -101);
    }

    #[test]
    fn chord_exit_through_entry_surface() {
        let reg = sphere_registry();
        let shell = Cell::from_expr(3, 7, 7.8, "-100 101").unwrap();
        // Off-axis chord through the shell missing the inner sphere:
        // enters and leaves through surface 100.
        let origin = p(-(25.0_f64 * 25.0 - 100.0).sqrt(), 10.0, 0.0);
        let (d, exit) = shell
            .track_out_cell(&reg, &origin, &v(1.0, 0.0, 0.0), Some(100))
            .unwrap();
        assert!((d - 2.0 * (25.0_f64 * 25.0 - 100.0).sqrt()).abs() < 1e-6);
        assert_eq!(exit, -100);
    }

    #[test]
    fn tangent_ray_does_not_exit_through_touch_point() {
        let mut reg = SurfaceRegistry::new();
        reg.register_card(1, "so 10").unwrap();
        reg.register_card(2, "so 5").unwrap();
        // Shell cell; ray tangent to the inner sphere at (0, 5, 0).
        let shell = Cell::from_expr(1, 0, 0.0, "-1 2").unwrap();
        let (d, exit) = shell
            .track_out_cell(&reg, &p(-8.0, 5.0, 0.0), &v(1.0, 0.0, 0.0), None)
            .unwrap();
        // Exit is the outer sphere, not the grazed inner one.
        assert_eq!(exit, -1);
        assert!((d - (8.0 + (10.0_f64 * 10.0 - 25.0).sqrt())).abs() < 1e-6);
    }

    #[test]
    fn leaky_cell_reports_no_exit() {
        let reg = sphere_registry();
        let outer = Cell::from_expr(1, 0, 0.0, "100").unwrap();
        // From outside the sphere moving away: nothing ahead.
        let err = outer
            .track_out_cell(&reg, &p(25.0, 0.0, 0.0), &v(1.0, 0.0, 0.0), Some(-100))
            .unwrap_err();
        assert!(err.to_string().contains("no exit surface"));
    }
}
