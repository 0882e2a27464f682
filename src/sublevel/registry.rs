use std::collections::{BTreeMap, HashMap};

use glam::{DVec3, IVec2};
use tracing::{debug, warn};

use crate::config::QuerySettings;
use crate::error::{KernelError, Result};
use crate::sublevel::queries::SubLevelQueries;
use crate::sublevel::{AmbientFlow, StillAir, SubLevel, SubLevelState};
use crate::types::{ContinuousBox, GridBox, Pose, SubLevelId};

/// Largest number of chunk columns a single plot may claim.
pub const MAX_PLOT_COLUMNS: i64 = 1 << 20;

struct PlotEntry {
    state: SubLevelState,
    /// Cells of the main grid reserved for this sub-level.
    plot: GridBox,
}

/// In-memory sub-level registry for one level.
///
/// Every sub-level owns a plot: a box of main-grid cells addressed in its
/// local frame. The chunk columns a plot covers are claimed exclusively, so a
/// column lookup returns at most one sub-level.
pub struct PlotRegistry {
    entries: BTreeMap<SubLevelId, PlotEntry>,
    columns: HashMap<IVec2, SubLevelId>,
    settings: QuerySettings,
    ambient: Box<dyn AmbientFlow>,
}

impl Default for PlotRegistry {
    fn default() -> Self {
        Self::new(QuerySettings::default())
    }
}

impl PlotRegistry {
    pub fn new(settings: QuerySettings) -> Self {
        Self {
            entries: BTreeMap::new(),
            columns: HashMap::new(),
            settings,
            ambient: Box::new(StillAir),
        }
    }

    pub fn set_ambient_flow(&mut self, flow: impl AmbientFlow + 'static) {
        self.ambient = Box::new(flow);
    }

    fn plot_columns(&self, plot: &GridBox) -> impl Iterator<Item = IVec2> + use<> {
        let chunks = plot.chunk_bounds_with(self.settings.chunk_bits);
        (chunks.min_x..=chunks.max_x)
            .flat_map(move |x| (chunks.min_z..=chunks.max_z).map(move |z| IVec2::new(x, z)))
    }

    /// Register `state` with the plot of cells it occupies.
    ///
    /// Fails without claiming anything if the id is already registered, the
    /// plot spans more than [`MAX_PLOT_COLUMNS`] columns, or any column of the
    /// plot belongs to another sub-level.
    pub fn insert(&mut self, state: SubLevelState, plot: GridBox) -> Result<()> {
        let id = state.id();
        if self.entries.contains_key(&id) {
            return Err(KernelError::Registry(format!("sub-level {id} is already registered")));
        }

        let chunks = plot.chunk_bounds_with(self.settings.chunk_bits);
        let columns = chunks.width() * chunks.length();
        if columns > MAX_PLOT_COLUMNS {
            warn!(%id, %plot, columns, "Rejected oversized plot");
            return Err(KernelError::Registry(format!(
                "plot {plot} of sub-level {id} spans {columns} chunk columns (limit {MAX_PLOT_COLUMNS})"
            )));
        }

        if let Some((column, owner)) = self
            .plot_columns(&plot)
            .find_map(|c| self.columns.get(&c).map(|owner| (c, *owner)))
        {
            warn!(
                %id,
                %owner,
                chunk_x = column.x,
                chunk_z = column.y,
                "Rejected overlapping plot"
            );
            return Err(KernelError::PlotOverlap {
                chunk_x: column.x,
                chunk_z: column.y,
                owner,
            });
        }

        let claimed: Vec<IVec2> = self.plot_columns(&plot).collect();
        debug!(%id, %plot, columns = claimed.len(), "Registered sub-level");
        for column in claimed {
            self.columns.insert(column, id);
        }
        self.entries.insert(id, PlotEntry { state, plot });
        Ok(())
    }

    /// Unregister a sub-level and release its plot.
    pub fn remove(&mut self, id: SubLevelId) -> Option<SubLevelState> {
        let entry = self.entries.remove(&id)?;
        self.columns.retain(|_, owner| *owner != id);
        debug!(%id, "Removed sub-level");
        Some(entry.state)
    }

    /// Move a sub-level to its pose for the next tick.
    pub fn advance(&mut self, id: SubLevelId, next: Pose) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| KernelError::Registry(format!("unknown sub-level {id}")))?;
        entry.state.advance(next);
        Ok(())
    }

    /// Replace the local extent of a sub-level's contents. The plot is unchanged.
    pub fn set_local_bounds(&mut self, id: SubLevelId, local_bounds: ContinuousBox) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| KernelError::Registry(format!("unknown sub-level {id}")))?;
        entry.state.set_local_bounds(local_bounds);
        Ok(())
    }

    pub fn get(&self, id: SubLevelId) -> Option<&SubLevelState> {
        self.entries.get(&id).map(|e| &e.state)
    }

    pub fn plot(&self, id: SubLevelId) -> Option<GridBox> {
        self.entries.get(&id).map(|e| e.plot)
    }

    /// Sub-levels in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SubLevelState> {
        self.entries.values().map(|e| &e.state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SubLevelQueries for PlotRegistry {
    fn get_all_intersecting<'a>(
        &'a self,
        bounds: &'a ContinuousBox,
    ) -> Box<dyn Iterator<Item = &'a dyn SubLevel> + 'a> {
        Box::new(
            self.entries
                .values()
                .filter(move |e| e.state.bounding_box().intersects(bounds))
                .map(|e| &e.state as &dyn SubLevel),
        )
    }

    fn get_containing(&self, chunk_x: i32, chunk_z: i32) -> Option<&dyn SubLevel> {
        let id = self.columns.get(&IVec2::new(chunk_x, chunk_z))?;
        self.entries.get(id).map(|e| &e.state as &dyn SubLevel)
    }

    fn is_in_plot_grid(&self, chunk_x: i32, chunk_z: i32) -> bool {
        self.columns.contains_key(&IVec2::new(chunk_x, chunk_z))
    }

    fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    fn ambient_flow(&self, global: DVec3) -> DVec3 {
        self.ambient.velocity_at(global)
    }
}
