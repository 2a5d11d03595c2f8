use std::collections::BTreeMap;

use crate::algebra::SignedSurface;
use crate::error::Result;
use crate::math::Point3;

use super::cell::{Cell, CellId};
use super::universe::Universe;

/// Adjacency index from a signed surface to the cells whose boundary
/// includes that half-space.
///
/// A derived cache over a finished cell set: build it once after assembly
/// and rebuild it whenever any cell's boundary changes. The universe drops
/// its copy automatically on mutation.
#[derive(Debug, Default, Clone)]
pub struct ObjSurfMap {
    map: BTreeMap<SignedSurface, Vec<CellId>>,
}

impl ObjSurfMap {
    /// Builds the index from a cell set.
    pub fn build<'a, I>(cells: I) -> Self
    where
        I: IntoIterator<Item = &'a Cell>,
    {
        let mut map: BTreeMap<SignedSurface, Vec<CellId>> = BTreeMap::new();
        for cell in cells {
            for &signed in cell.boundary_surfaces() {
                map.entry(signed).or_default().push(cell.id());
            }
        }
        for ids in map.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }
        Self { map }
    }

    /// Cells registered under the signed surface, ascending by id.
    #[must_use]
    pub fn cells_on(&self, surface: SignedSurface) -> &[CellId] {
        self.map.get(&surface).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct signed surfaces in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Finds the cell entered across a crossing: among cells registered on
    /// `surface` (the sign opposite the side just left), the first one
    /// containing `point` with the crossed surface excluded from the test.
    /// `None` means the ray has left the modeled universe.
    ///
    /// # Errors
    ///
    /// Returns an error for a surface missing from the registry.
    pub fn find_next_cell(
        &self,
        world: &Universe,
        surface: SignedSurface,
        point: &Point3,
        exclude_cell: Option<CellId>,
    ) -> Result<Option<CellId>> {
        let crossed = [surface.unsigned_abs()];
        for &id in self.cells_on(surface) {
            if exclude_cell == Some(id) {
                continue;
            }
            let cell = world.cell(id)?;
            if cell.is_valid_excluding(world.registry(), point, &crossed)? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    /// The concentric-sphere model: outer void, steel inner, void shell.
    fn sphere_world() -> Universe {
        let mut world = Universe::new();
        world.registry_mut().register_card(100, "so 25").unwrap();
        world.registry_mut().register_card(101, "so 6.0").unwrap();
        world
            .add_cell(Cell::from_expr(1, 0, 0.0, "100").unwrap())
            .unwrap();
        world
            .add_cell(Cell::from_expr(2, 78, 7.8, "-101").unwrap())
            .unwrap();
        world
            .add_cell(Cell::from_expr(3, 0, 0.0, "-100 101").unwrap())
            .unwrap();
        world.create_obj_surf_map();
        world
    }

    #[test]
    fn index_records_signed_membership() {
        let world = sphere_world();
        let osm = world.obj_surf_map().unwrap();
        assert_eq!(osm.cells_on(100), &[1]);
        assert_eq!(osm.cells_on(-100), &[3]);
        assert_eq!(osm.cells_on(101), &[3]);
        assert_eq!(osm.cells_on(-101), &[2]);
        assert!(osm.cells_on(55).is_empty());
    }

    #[test]
    fn next_cell_across_outer_surface() {
        let world = sphere_world();
        let osm = world.obj_surf_map().unwrap();
        // Crossing inward at x = -25: the ray leaves the +100 side, so the
        // neighbour is registered under -100.
        let next = osm
            .find_next_cell(&world, -100, &p(-25.0, 0.0, 0.0), Some(1))
            .unwrap();
        assert_eq!(next, Some(3));
    }

    #[test]
    fn next_cell_across_inner_surface() {
        let world = sphere_world();
        let osm = world.obj_surf_map().unwrap();
        let next = osm
            .find_next_cell(&world, -101, &p(-6.0, 0.0, 0.0), Some(3))
            .unwrap();
        assert_eq!(next, Some(2));
    }

    #[test]
    fn leaving_the_universe_returns_none() {
        let mut world = Universe::new();
        world.registry_mut().register_card(1, "so 10").unwrap();
        world
            .add_cell(Cell::from_expr(5, 0, 0.0, "-1").unwrap())
            .unwrap();
        world.create_obj_surf_map();
        let osm = world.obj_surf_map().unwrap();
        // Outward crossing at x = 10: nothing is registered outside.
        let next = osm
            .find_next_cell(&world, 1, &p(10.0, 0.0, 0.0), Some(5))
            .unwrap();
        assert_eq!(next, None);
    }
}
