pub mod cell;
pub mod registry;
pub mod surf_map;
pub mod universe;

pub use cell::{Cell, CellId};
pub use registry::SurfaceRegistry;
pub use surf_map::ObjSurfMap;
pub use universe::Universe;
