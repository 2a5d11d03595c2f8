use std::collections::BTreeMap;

use crate::error::{ConstructionError, LookupError, Result};
use crate::math::Point3;

use super::cell::{Cell, CellId};
use super::registry::SurfaceRegistry;
use super::surf_map::ObjSurfMap;

/// One complete model build: the surface registry, the cell set, and the
/// derived adjacency index.
///
/// Mutation discipline: cells are assembled and added during the build
/// phase; once [`create_obj_surf_map`](Universe::create_obj_surf_map) has
/// run the universe is read-only and freely shareable between threads.
/// Adding a cell drops the adjacency index so a stale cache can never be
/// queried.
#[derive(Debug, Default)]
pub struct Universe {
    registry: SurfaceRegistry,
    cells: BTreeMap<CellId, Cell>,
    surf_map: Option<ObjSurfMap>,
}

impl Universe {
    /// Creates an empty universe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the surface registry.
    #[must_use]
    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    /// Mutable access to the surface registry (build phase).
    pub fn registry_mut(&mut self) -> &mut SurfaceRegistry {
        &mut self.registry
    }

    /// Adds a finished cell.
    ///
    /// # Errors
    ///
    /// Rejects a duplicate cell id and any boundary surface missing from
    /// the registry.
    pub fn add_cell(&mut self, cell: Cell) -> Result<()> {
        if self.cells.contains_key(&cell.id()) {
            return Err(ConstructionError::DuplicateCell(cell.id()).into());
        }
        for &signed in cell.boundary_surfaces() {
            let id = signed.unsigned_abs();
            if !self.registry.contains(id) {
                return Err(LookupError::UnknownSurface(id).into());
            }
        }
        self.surf_map = None;
        self.cells.insert(cell.id(), cell);
        Ok(())
    }

    /// Looks up a cell by id.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown id.
    pub fn cell(&self, id: CellId) -> Result<&Cell> {
        self.cells
            .get(&id)
            .ok_or_else(|| LookupError::UnknownCell(id).into())
    }

    /// Iterates cells in ascending id order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// First cell (ascending id) containing the point.
    ///
    /// # Errors
    ///
    /// Returns an error for a surface missing from the registry.
    pub fn find_cell(&self, point: &Point3) -> Result<Option<&Cell>> {
        for cell in self.cells.values() {
            if cell.is_valid(&self.registry, point)? {
                return Ok(Some(cell));
            }
        }
        Ok(None)
    }

    /// Builds (or rebuilds) the object-surface adjacency index from the
    /// current cell set.
    pub fn create_obj_surf_map(&mut self) {
        self.surf_map = Some(ObjSurfMap::build(self.cells.values()));
    }

    /// Returns the adjacency index.
    ///
    /// # Errors
    ///
    /// Errors when the index has not been built since the last mutation.
    pub fn obj_surf_map(&self) -> Result<&ObjSurfMap> {
        self.surf_map
            .as_ref()
            .ok_or_else(|| ConstructionError::AdjacencyNotBuilt.into())
    }

    /// Clears every surface, cell, and cache for an independent build.
    pub fn reset(&mut self) {
        self.registry.reset();
        self.cells.clear();
        self.surf_map = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn two_sphere_world() -> Universe {
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
        world
    }

    #[test]
    fn find_cell_partitions_space() {
        let world = two_sphere_world();
        assert_eq!(world.find_cell(&p(0.0, 0.0, 0.0)).unwrap().unwrap().id(), 2);
        assert_eq!(
            world.find_cell(&p(10.0, 0.0, 0.0)).unwrap().unwrap().id(),
            3
        );
        assert_eq!(
            world.find_cell(&p(40.0, 0.0, 0.0)).unwrap().unwrap().id(),
            1
        );
    }

    #[test]
    fn duplicate_cell_rejected() {
        let mut world = two_sphere_world();
        let dup = Cell::from_expr(2, 0, 0.0, "100").unwrap();
        assert!(world.add_cell(dup).is_err());
    }

    #[test]
    fn unknown_boundary_surface_rejected() {
        let mut world = two_sphere_world();
        let cell = Cell::from_expr(9, 0, 0.0, "-555").unwrap();
        assert!(world.add_cell(cell).is_err());
    }

    #[test]
    fn adjacency_must_be_built() {
        let mut world = two_sphere_world();
        assert!(world.obj_surf_map().is_err());
        world.create_obj_surf_map();
        assert!(world.obj_surf_map().is_ok());
    }

    #[test]
    fn mutation_drops_adjacency() {
        let mut world = two_sphere_world();
        world.create_obj_surf_map();
        world.registry_mut().register_card(7, "px 90").unwrap();
        world
            .add_cell(Cell::from_expr(4, 0, 0.0, "7").unwrap())
            .unwrap();
        assert!(world.obj_surf_map().is_err());
    }

    #[test]
    fn reset_clears_everything() {
        let mut world = two_sphere_world();
        world.create_obj_surf_map();
        world.reset();
        assert_eq!(world.cell_count(), 0);
        assert!(world.registry().is_empty());
        assert!(world.obj_surf_map().is_err());
    }
}
