use std::fmt;

use glam::{DVec3, IVec3};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::QuerySettings;
use crate::sublevel::{Positioned, SubLevel};
use crate::types::{ContinuousBox, block_containing, chunk_coord_with};

/// Which interpretation of a point a [`Probe`] tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// The raw point, against whatever frame owns it.
    Origin,
    /// The point mapped into the assumed sub-level's local frame.
    Assumed,
    /// The point mapped out of its owning sub-level into the main grid.
    Projected,
}

/// One candidate cell to test when resolving a point across frames.
#[derive(Clone, Copy)]
pub struct Probe<'a> {
    pub kind: ProbeKind,
    /// Sub-level whose data the cell belongs to; `None` for the main grid.
    pub frame: Option<&'a dyn SubLevel>,
    pub point: DVec3,
}

impl Probe<'_> {
    pub fn block(&self) -> IVec3 {
        block_containing(self.point)
    }
}

impl fmt::Debug for Probe<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("kind", &self.kind)
            .field("frame", &self.frame.map(|s| s.id()))
            .field("point", &self.point)
            .finish()
    }
}

/// Read-side contract of a sub-level registry for one level.
///
/// Absence is an answer, not an error: lookups return `None`, projections
/// return the input, velocities return zero.
pub trait SubLevelQueries: Send + Sync {
    /// Sub-levels whose bounding box intersects `bounds`.
    ///
    /// The iterator borrows `bounds` and the registry for its whole life, so
    /// neither can change mid-traversal.
    fn get_all_intersecting<'a>(
        &'a self,
        bounds: &'a ContinuousBox,
    ) -> Box<dyn Iterator<Item = &'a dyn SubLevel> + 'a>;

    /// The sub-level whose plot claims the chunk column, if any.
    fn get_containing(&self, chunk_x: i32, chunk_z: i32) -> Option<&dyn SubLevel>;

    /// Whether any plot claims the chunk column.
    fn is_in_plot_grid(&self, chunk_x: i32, chunk_z: i32) -> bool;

    fn settings(&self) -> &QuerySettings;

    /// Ambient flow velocity at a global point.
    fn ambient_flow(&self, _global: DVec3) -> DVec3 {
        DVec3::ZERO
    }

    fn get_containing_point(&self, point: DVec3) -> Option<&dyn SubLevel> {
        let bits = self.settings().chunk_bits;
        self.get_containing(chunk_coord_with(point.x, bits), chunk_coord_with(point.z, bits))
    }

    /// Map `point` out of its owning sub-level into the main grid. Points no
    /// sub-level owns are returned unchanged.
    fn project_out_of_sub_level(&self, point: DVec3) -> DVec3 {
        match self.get_containing_point(point) {
            Some(owner) => owner.logical_pose().transform_position(point),
            None => point,
        }
    }

    /// The probes tried for `origin`, highest priority first.
    ///
    /// 1. the raw point, if `check_origin`
    /// 2. the point inverse-mapped into `assumed`, when the point lies in the main grid
    /// 3. the point projected out of its owner, when a sub-level owns it
    fn probe_order<'a>(
        &'a self,
        origin: DVec3,
        check_origin: bool,
        assumed: Option<&'a dyn SubLevel>,
    ) -> Vec<Probe<'a>> {
        let owner = self.get_containing_point(origin);
        let mut probes = Vec::with_capacity(3);

        if check_origin {
            probes.push(Probe {
                kind: ProbeKind::Origin,
                frame: owner,
                point: origin,
            });
        }

        match owner {
            None => {
                if let Some(sub_level) = assumed {
                    probes.push(Probe {
                        kind: ProbeKind::Assumed,
                        frame: Some(sub_level),
                        point: sub_level.logical_pose().transform_position_inverse(origin),
                    });
                }
            }
            Some(owner) => probes.push(Probe {
                kind: ProbeKind::Projected,
                frame: None,
                point: owner.logical_pose().transform_position(origin),
            }),
        }

        probes
    }

    /// Squared distance after projecting both points into the main grid.
    fn distance_squared_with_sub_levels(&self, a: DVec3, b: DVec3) -> f64 {
        self.project_out_of_sub_level(a)
            .distance_squared(self.project_out_of_sub_level(b))
    }

    /// Global velocity (m/s) of a point at rest in whichever frame owns it.
    fn get_velocity(&self, point: DVec3) -> DVec3 {
        match self.get_containing_point(point) {
            Some(owner) => self.get_velocity_in(owner, point),
            None => DVec3::ZERO,
        }
    }

    /// Global velocity (m/s) of `local`, a point at rest in `sub_level`'s
    /// frame, over the last tick.
    fn get_velocity_in(&self, sub_level: &dyn SubLevel, local: DVec3) -> DVec3 {
        let now = sub_level.logical_pose().transform_position(local);
        let before = sub_level.last_pose().transform_position(local);
        (now - before) / self.settings().tick_seconds
    }

    /// [`get_velocity`](Self::get_velocity) minus the ambient flow at the
    /// point's global position.
    fn get_velocity_relative_to_air(&self, point: DVec3) -> DVec3 {
        let global = self.project_out_of_sub_level(point);
        self.get_velocity(point) - self.ambient_flow(global)
    }
}

/// Conveniences over [`SubLevelQueries`], available on trait objects too.
pub trait SubLevelQueriesExt: SubLevelQueries {
    /// Run `probe` over [`probe_order`](SubLevelQueries::probe_order) and
    /// return the first hit.
    fn run_including_sub_levels<'a, T>(
        &'a self,
        origin: DVec3,
        check_origin: bool,
        assumed: Option<&'a dyn SubLevel>,
        mut probe: impl FnMut(Option<&'a dyn SubLevel>, IVec3) -> Option<T>,
    ) -> Option<T> {
        self.probe_order(origin, check_origin, assumed)
            .into_iter()
            .find_map(|p| probe(p.frame, p.block()))
    }

    /// Boolean form of [`run_including_sub_levels`](Self::run_including_sub_levels).
    fn find_including_sub_levels<'a>(
        &'a self,
        origin: DVec3,
        check_origin: bool,
        assumed: Option<&'a dyn SubLevel>,
        mut probe: impl FnMut(Option<&'a dyn SubLevel>, IVec3) -> bool,
    ) -> bool {
        self.run_including_sub_levels(origin, check_origin, assumed, |frame, block| {
            probe(frame, block).then_some(())
        })
        .is_some()
    }

    fn get_containing_block(&self, cell: IVec3) -> Option<&dyn SubLevel> {
        let bits = self.settings().chunk_bits;
        self.get_containing(cell.x >> bits, cell.z >> bits)
    }

    fn get_containing_handle(&self, handle: &impl Positioned) -> Option<&dyn SubLevel> {
        self.get_containing_point(handle.position())
    }

    fn is_in_plot_grid_at(&self, point: DVec3) -> bool {
        let bits = self.settings().chunk_bits;
        self.is_in_plot_grid(chunk_coord_with(point.x, bits), chunk_coord_with(point.z, bits))
    }

    /// [`project_out_of_sub_level`](SubLevelQueries::project_out_of_sub_level)
    /// over a batch, in parallel.
    fn project_all(&self, points: &[DVec3]) -> Vec<DVec3> {
        points
            .par_iter()
            .map(|p| self.project_out_of_sub_level(*p))
            .collect()
    }

    /// [`get_velocity`](SubLevelQueries::get_velocity) over a batch, in parallel.
    fn velocities(&self, points: &[DVec3]) -> Vec<DVec3> {
        points.par_iter().map(|p| self.get_velocity(*p)).collect()
    }
}

impl<Q: SubLevelQueries + ?Sized> SubLevelQueriesExt for Q {}

/// Queries for a world without any sub-level system.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSubLevels {
    settings: QuerySettings,
}

impl NoSubLevels {
    pub fn new(settings: QuerySettings) -> Self {
        Self { settings }
    }
}

impl SubLevelQueries for NoSubLevels {
    fn get_all_intersecting<'a>(
        &'a self,
        _bounds: &'a ContinuousBox,
    ) -> Box<dyn Iterator<Item = &'a dyn SubLevel> + 'a> {
        Box::new(std::iter::empty())
    }

    fn get_containing(&self, _chunk_x: i32, _chunk_z: i32) -> Option<&dyn SubLevel> {
        None
    }

    fn is_in_plot_grid(&self, _chunk_x: i32, _chunk_z: i32) -> bool {
        false
    }

    fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// Only the raw point, probed against the main grid. Without sub-levels
    /// there is no frame to reinterpret it in, so `assumed` is ignored.
    fn probe_order<'a>(
        &'a self,
        origin: DVec3,
        check_origin: bool,
        _assumed: Option<&'a dyn SubLevel>,
    ) -> Vec<Probe<'a>> {
        if !check_origin {
            return Vec::new();
        }
        vec![Probe {
            kind: ProbeKind::Origin,
            frame: None,
            point: origin,
        }]
    }

    fn get_velocity_in(&self, _sub_level: &dyn SubLevel, _local: DVec3) -> DVec3 {
        DVec3::ZERO
    }
}
