pub mod parse;
pub mod surface;

pub use parse::parse_card;
pub use surface::{Cone, Cylinder, Plane, Sheet, Side, Sphere, Surface, SurfaceMatch};
