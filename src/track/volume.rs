use std::collections::BTreeMap;
use std::f64::consts::PI;

use rand::Rng;

use crate::error::{LookupError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::model::{CellId, Universe};

use super::line::LineTrack;

/// Stochastic volume estimator over a bounding sphere.
///
/// Two sampling modes share the tally: uniform points in the sphere
/// (unbiased hit counting) and [`LineTrack`] chords between random points
/// on the sphere surface (track-length fractions, the smoke-level check
/// used against the point estimate). Each run replaces the previous tally.
#[derive(Debug)]
pub struct VolumeEstimator {
    center: Point3,
    radius: f64,
    tallies: BTreeMap<CellId, f64>,
    norm: f64,
}

impl VolumeEstimator {
    /// Creates an estimator over the given bounding sphere.
    #[must_use]
    pub fn new(center: Point3, radius: f64) -> Self {
        Self {
            center,
            radius,
            tallies: BTreeMap::new(),
            norm: 0.0,
        }
    }

    /// Registers a cell to be tallied.
    pub fn add_cell(&mut self, cell: CellId) {
        self.tallies.insert(cell, 0.0);
    }

    fn sphere_volume(&self) -> f64 {
        4.0 / 3.0 * PI * self.radius.powi(3)
    }

    fn clear(&mut self) {
        for value in self.tallies.values_mut() {
            *value = 0.0;
        }
        self.norm = 0.0;
    }

    /// Samples uniform points in the bounding sphere, counting hits per
    /// tallied cell.
    ///
    /// # Errors
    ///
    /// Returns an error for a surface missing from the registry.
    #[allow(clippy::cast_precision_loss)]
    pub fn run_points<R>(&mut self, world: &Universe, shots: usize, rng: &mut R) -> Result<()>
    where
        R: Rng + ?Sized,
    {
        self.clear();
        self.norm = shots as f64;
        for _ in 0..shots {
            let point = self.random_interior_point(rng);
            if let Some(cell) = world.find_cell(&point)? {
                if let Some(tally) = self.tallies.get_mut(&cell.id()) {
                    *tally += 1.0;
                }
            }
        }
        Ok(())
    }

    /// Fires [`LineTrack`] chords between random points on the bounding
    /// sphere, tallying per-cell track length.
    ///
    /// # Errors
    ///
    /// Propagates tracking failures; the universe must cover the bounding
    /// sphere and have its object-surface map built.
    pub fn run_lines<R>(&mut self, world: &Universe, chords: usize, rng: &mut R) -> Result<()>
    where
        R: Rng + ?Sized,
    {
        self.clear();
        for _ in 0..chords {
            let a = self.random_surface_point(rng);
            let b = self.random_surface_point(rng);
            if (b - a).norm() < TOLERANCE {
                continue;
            }
            let mut track = LineTrack::new(a, b);
            track.calculate(world)?;
            self.norm += track.total_distance();
            for segment in track.segments() {
                if let Some(tally) = self.tallies.get_mut(&segment.cell) {
                    *tally += segment.length;
                }
            }
        }
        Ok(())
    }

    /// Estimated volume of a tallied cell from the last run.
    ///
    /// # Errors
    ///
    /// Returns an error for a cell that was never registered.
    pub fn volume(&self, cell: CellId) -> Result<f64> {
        let tally = self
            .tallies
            .get(&cell)
            .ok_or(LookupError::UnknownCell(cell))?;
        if self.norm < TOLERANCE {
            return Ok(0.0);
        }
        Ok(tally / self.norm * self.sphere_volume())
    }

    fn random_interior_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point3 {
        loop {
            let v = Vector3::new(
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
            );
            if v.norm_squared() <= 1.0 {
                return self.center + v * self.radius;
            }
        }
    }

    fn random_surface_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point3 {
        loop {
            let v = Vector3::new(
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
            );
            let norm = v.norm();
            if norm > 1e-3 && norm <= 1.0 {
                return self.center + v * (self.radius / norm);
            }
        }
    }
}
