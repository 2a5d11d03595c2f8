use std::collections::BTreeMap;

use crate::algebra::{SignedSurface, SurfaceId};
use crate::error::{ConstructionError, LookupError, Result};
use crate::geometry::{parse_card, Surface, SurfaceMatch};

/// Coefficient tolerance for surface deduplication.
///
/// Looser than the evaluation tolerance: model builders produce the same
/// plane through different arithmetic paths.
pub const DEDUP_TOL: f64 = 1e-8;

/// Canonical store of the surfaces of one model build.
///
/// An explicit build-context value: create one per model, pass it by
/// reference, and [`reset`](SurfaceRegistry::reset) it only when reusing
/// the allocation for an independent build. Registration deduplicates
/// geometrically equal surfaces (including mirror-form planes) so every
/// surface has exactly one stable id.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    surfaces: BTreeMap<SurfaceId, Surface>,
}

impl SurfaceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a surface under the requested id, returning the canonical
    /// signed id: the existing id when an equal surface is already present,
    /// negated when the match is a mirror-form plane, and the requested id
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Rejects id 0, and an id already bound to different geometry.
    #[allow(clippy::cast_possible_wrap)]
    pub fn register(&mut self, id: SurfaceId, surface: Surface) -> Result<SignedSurface> {
        if id == 0 {
            return Err(ConstructionError::ZeroSurfaceId.into());
        }
        for (&existing, candidate) in &self.surfaces {
            match candidate.compare(&surface, DEDUP_TOL) {
                SurfaceMatch::Equal => return Ok(existing as SignedSurface),
                SurfaceMatch::Mirror => return Ok(-(existing as SignedSurface)),
                SurfaceMatch::Distinct => {}
            }
        }
        if self.surfaces.contains_key(&id) {
            return Err(ConstructionError::SurfaceIdClash(id).into());
        }
        self.surfaces.insert(id, surface);
        Ok(id as SignedSurface)
    }

    /// Parses a quadric card and registers it under the requested id.
    ///
    /// # Errors
    ///
    /// As [`register`](SurfaceRegistry::register), plus card parse errors.
    pub fn register_card(&mut self, id: SurfaceId, card: &str) -> Result<SignedSurface> {
        let surface = parse_card(card)?;
        self.register(id, surface)
    }

    /// Looks up a surface by id.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown id.
    pub fn get(&self, id: SurfaceId) -> Result<&Surface> {
        self.surfaces
            .get(&id)
            .ok_or_else(|| LookupError::UnknownSurface(id).into())
    }

    /// True when the id is registered.
    #[must_use]
    pub fn contains(&self, id: SurfaceId) -> bool {
        self.surfaces.contains_key(&id)
    }

    /// Number of registered surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// True when no surface is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Iterates surfaces in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (SurfaceId, &Surface)> {
        self.surfaces.iter().map(|(&id, s)| (id, s))
    }

    /// Clears all registered surfaces for an independent model build.
    pub fn reset(&mut self) {
        self.surfaces.clear();
    }
}
