//! Sub-levels: independently posed local frames that live inside a main grid.
//!
//! A sub-level addresses its own local coordinates. Its cells are stored in a
//! plot, a run of chunk columns of the main grid claimed exclusively by that
//! sub-level, while its `bounding_box` describes where it currently sits in
//! global space. Plots never overlap; bounding boxes may.

pub mod queries;
pub mod registry;

use glam::DVec3;

use crate::types::{ContinuousBox, Pose, SubLevelId};

pub use queries::{NoSubLevels, Probe, ProbeKind, SubLevelQueries, SubLevelQueriesExt};
pub use registry::PlotRegistry;

/// Read-only view of one sub-level for the current tick.
pub trait SubLevel: Send + Sync {
    fn id(&self) -> SubLevelId;

    fn name(&self) -> Option<&str>;

    /// Pose for the current tick.
    fn logical_pose(&self) -> &Pose;

    /// Pose for the previous tick.
    fn last_pose(&self) -> &Pose;

    /// Global bounds for the current tick.
    fn bounding_box(&self) -> &ContinuousBox;

    /// Pose between the previous and current tick, `partial_tick` in `[0, 1]`.
    fn pose_at(&self, partial_tick: f64) -> Pose {
        self.last_pose().lerp(self.logical_pose(), partial_tick)
    }
}

/// Anything with a current position in the main grid (an entity, a block
/// entity, a camera).
pub trait Positioned {
    fn position(&self) -> DVec3;
}

impl Positioned for DVec3 {
    fn position(&self) -> DVec3 {
        *self
    }
}

/// External source of ambient flow (wind, current) in global space, m/s.
pub trait AmbientFlow: Send + Sync {
    fn velocity_at(&self, global: DVec3) -> DVec3;
}

/// No ambient flow anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct StillAir;

impl AmbientFlow for StillAir {
    fn velocity_at(&self, _global: DVec3) -> DVec3 {
        DVec3::ZERO
    }
}

/// The same flow everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformWind(pub DVec3);

impl AmbientFlow for UniformWind {
    fn velocity_at(&self, _global: DVec3) -> DVec3 {
        self.0
    }
}

/// Owned sub-level snapshot: identity, the two most recent poses and the
/// local-space extent of its contents.
///
/// The global bounding box is derived from `local_bounds` and the logical
/// pose, and is refreshed whenever the pose changes.
#[derive(Debug, Clone, PartialEq)]
pub struct SubLevelState {
    id: SubLevelId,
    name: Option<String>,
    logical_pose: Pose,
    last_pose: Pose,
    local_bounds: ContinuousBox,
    bounding_box: ContinuousBox,
}

impl SubLevelState {
    /// A sub-level at rest: both poses equal `pose`.
    pub fn new(id: SubLevelId, pose: Pose, local_bounds: ContinuousBox) -> Self {
        Self {
            id,
            name: None,
            logical_pose: pose,
            last_pose: pose,
            local_bounds,
            bounding_box: local_bounds.transformed(&pose),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_last_pose(mut self, last_pose: Pose) -> Self {
        self.last_pose = last_pose;
        self
    }

    pub fn local_bounds(&self) -> &ContinuousBox {
        &self.local_bounds
    }

    /// Step one tick: the current pose becomes the previous one.
    pub fn advance(&mut self, next: Pose) {
        self.last_pose = self.logical_pose;
        self.logical_pose = next;
        self.bounding_box = self.local_bounds.transformed(&next);
    }

    /// Replace the local extent, e.g. after cells were added to the plot.
    pub fn set_local_bounds(&mut self, local_bounds: ContinuousBox) {
        self.local_bounds = local_bounds;
        self.bounding_box = local_bounds.transformed(&self.logical_pose);
    }
}

impl SubLevel for SubLevelState {
    fn id(&self) -> SubLevelId {
        self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn logical_pose(&self) -> &Pose {
        &self.logical_pose
    }

    fn last_pose(&self) -> &Pose {
        &self.last_pose
    }

    fn bounding_box(&self) -> &ContinuousBox {
        &self.bounding_box
    }
}
