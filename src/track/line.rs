use std::fmt;

use crate::error::{GeometryInconsistency, LookupError, RaycellError, Result};
use crate::math::{fmt_dir, fmt_point, Point3, Vector3, TOLERANCE};
use crate::model::{Cell, CellId, Universe};

/// Upper bound on cell crossings per track; trips the fatal
/// [`GeometryInconsistency::IterationLimit`] on degenerate tangency loops.
pub const MAX_CROSSINGS: usize = 10_000;

/// Crossing distances below this are treated as grazing and trigger the
/// containment-based relocation instead of the adjacency lookup.
const GRAZE_TOL: f64 = 1e-8;

/// Offset used to nudge a query point off a surface before containment
/// searches.
const NUDGE: f64 = 1e-6;

/// One traversed segment: the cell and the path length inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub cell: CellId,
    pub length: f64,
}

/// Walks a straight line through a universe, accumulating ordered
/// (cell, length) segments whose lengths sum to the start-to-end distance.
///
/// The universe must have its object-surface map built. All state is local
/// to the track, so independent tracks over a shared universe may run on
/// separate threads.
#[derive(Debug, Clone)]
pub struct LineTrack {
    init: Point3,
    end: Point3,
    aim_dist: f64,
    total: f64,
    segments: Vec<Segment>,
}

impl LineTrack {
    /// Creates a track between two points. Call
    /// [`calculate`](LineTrack::calculate) to populate it.
    #[must_use]
    pub fn new(init: Point3, end: Point3) -> Self {
        Self {
            init,
            end,
            aim_dist: (end - init).norm(),
            total: 0.0,
            segments: Vec::new(),
        }
    }

    /// Returns the start point.
    #[must_use]
    pub fn init_point(&self) -> &Point3 {
        &self.init
    }

    /// Returns the end point.
    #[must_use]
    pub fn end_point(&self) -> &Point3 {
        &self.end
    }

    /// The traversed segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The traversed cell ids in order.
    #[must_use]
    pub fn cells(&self) -> Vec<CellId> {
        self.segments.iter().map(|s| s.cell).collect()
    }

    /// Straight-line distance between the end points.
    #[must_use]
    pub fn aim_distance(&self) -> f64 {
        self.aim_dist
    }

    /// Total accumulated length.
    #[must_use]
    pub fn total_distance(&self) -> f64 {
        self.total
    }

    /// The point where the line enters segment `index`; index `len()`
    /// names the end of the final segment.
    ///
    /// # Errors
    ///
    /// Returns an error for an index beyond `len()`.
    pub fn point(&self, index: usize) -> Result<Point3> {
        if index > self.segments.len() {
            return Err(LookupError::SegmentIndex {
                index,
                size: self.segments.len(),
            }
            .into());
        }
        let len: f64 = self.segments[..index].iter().map(|s| s.length).sum();
        let span = self.end - self.init;
        let norm = span.norm();
        if norm < TOLERANCE {
            return Ok(self.init);
        }
        Ok(self.init + span * (len / norm))
    }

    /// Walks the line through the universe.
    ///
    /// # Errors
    ///
    /// [`GeometryInconsistency`] when the start point is outside the
    /// model, a cell has no exit, the adjacency lookup fails after a
    /// crossing, or the crossing guard trips; all are fatal for this trace.
    /// [`ConstructionError::AdjacencyNotBuilt`](crate::error::ConstructionError::AdjacencyNotBuilt)
    /// when the universe has no object-surface map.
    pub fn calculate(&mut self, world: &Universe) -> Result<()> {
        self.segments.clear();
        self.total = 0.0;

        let osm = world.obj_surf_map()?;
        let aim = self.aim_dist;
        if aim < TOLERANCE {
            return Ok(());
        }
        let dir = (self.end - self.init) / aim;

        let start_probe = self.init + dir * NUDGE;
        let Some(mut cell) = world.find_cell(&start_probe)? else {
            return Err(GeometryInconsistency::InitialPointNotInModel(fmt_point(&self.init)).into());
        };

        let mut pos = self.init;
        let mut entered = None;
        for _ in 0..MAX_CROSSINGS {
            let (dist, exit) =
                match cell.track_out_cell(world.registry(), &pos, &dir, entered) {
                    Ok(found) => found,
                    Err(err) => {
                        // A ray that ends inside an unbounded cell has no
                        // further crossing; that terminates the track.
                        if self.no_exit_is_terminal(&err, world, cell)? {
                            self.push_final(cell.id(), aim);
                            return Ok(());
                        }
                        return Err(err);
                    }
                };

            if self.total + dist >= aim - GRAZE_TOL {
                self.push_final(cell.id(), aim);
                return Ok(());
            }
            self.segments.push(Segment {
                cell: cell.id(),
                length: dist,
            });
            self.total += dist;
            pos += dir * dist;

            // The neighbour holds the crossed surface with the sign
            // opposite the side just left.
            let mut next = osm.find_next_cell(world, -exit, &pos, Some(cell.id()))?;
            if dist < GRAZE_TOL {
                // Grazing crossing: adjacency is unreliable this close to
                // the previous surface, so relocate by containment.
                tracing::debug!(distance = dist, surface = exit, "grazing crossing, relocating");
                next = world.find_cell(&(pos + dir * NUDGE))?.map(Cell::id);
            }
            let Some(next_id) = next else {
                return Err(self.no_next_cell(world, cell, exit, &pos, &dir));
            };
            cell = world.cell(next_id)?;
            entered = Some(exit);
        }
        Err(GeometryInconsistency::IterationLimit(MAX_CROSSINGS).into())
    }

    /// True when a no-exit failure actually means the line terminates
    /// inside the current (unbounded) cell.
    fn no_exit_is_terminal(
        &self,
        err: &RaycellError,
        world: &Universe,
        cell: &Cell,
    ) -> Result<bool> {
        if !matches!(
            err,
            RaycellError::Geometry(GeometryInconsistency::NoExitSurface { .. })
        ) {
            return Ok(false);
        }
        cell.is_valid(world.registry(), &self.end)
    }

    fn push_final(&mut self, cell: CellId, aim: f64) {
        self.segments.push(Segment {
            cell,
            length: aim - self.total,
        });
        self.total = aim;
    }

    fn no_next_cell(
        &self,
        world: &Universe,
        cell: &Cell,
        exit: i32,
        pos: &Point3,
        dir: &Vector3,
    ) -> RaycellError {
        // Collect every surface passing through the stuck point; this is
        // the context needed to find the gap in the model.
        let on_point: Vec<u32> = world
            .registry()
            .iter()
            .filter(|(_, s)| s.on_surface(pos))
            .map(|(id, _)| id)
            .collect();
        let candidates = world.obj_surf_map().map_or_else(
            |_| Vec::new(),
            |osm| osm.cells_on(-exit).to_vec(),
        );
        tracing::error!(
            surface = exit,
            cell = cell.id(),
            position = %fmt_point(pos),
            direction = %fmt_dir(dir),
            ?on_point,
            ?candidates,
            "no cell found across exit surface"
        );
        GeometryInconsistency::NoNextCell {
            surface: exit,
            detail: format!(
                "at {} along {} leaving cell {} (init {}, end {}, surfaces on point {:?}, candidate cells {:?})",
                fmt_point(pos),
                fmt_dir(dir),
                cell.id(),
                fmt_point(&self.init),
                fmt_point(&self.end),
                on_point,
                candidates,
            ),
        }
        .into()
    }
}

impl fmt::Display for LineTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "track {} -> {}",
            fmt_point(&self.init),
            fmt_point(&self.end)
        )?;
        for seg in &self.segments {
            writeln!(f, "  {} : {:.6}", seg.cell, seg.length)?;
        }
        Ok(())
    }
}
