//! JSON scene files: levels, their sub-levels and solid cells.
//!
//! ```json
//! {
//!   "active_level": "overworld",
//!   "levels": {
//!     "overworld": {
//!       "wind": [2.0, 0.0, 0.0],
//!       "solid": [[0, 63, 0], [4096, 0, 0]],
//!       "sub_levels": [{
//!         "id": "0000000000000000000000000000000a",
//!         "name": "raft",
//!         "plot": [4096, 0, 0, 4111, 15, 15],
//!         "pose": { "position": [0.0, 64.0, 0.0], "rotation_point": [4096.0, 0.0, 0.0] },
//!         "last_pose": { "position": [-0.5, 64.0, 0.0], "rotation_point": [4096.0, 0.0, 0.0] }
//!       }]
//!     }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::companion::Companion;
use crate::config::{Backend, KernelConfig};
use crate::error::{KernelError, Result};
use crate::sublevel::{SubLevelState, UniformWind};
use crate::types::layout;
use crate::types::{ContinuousBox, GridBox, LevelId, Pose, SubLevelId};

/// One sub-level as written in a scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubLevelRecord {
    pub id: SubLevelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Main-grid cells reserved for the sub-level, in its local frame.
    pub plot: GridBox,
    /// Local extent of the contents; the whole plot when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<ContinuousBox>,
    #[serde(default)]
    pub pose: Pose,
    /// Pose one tick earlier; equal to `pose` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pose: Option<Pose>,
}

impl SubLevelRecord {
    pub fn to_state(&self) -> SubLevelState {
        let bounds = self.bounds.unwrap_or_else(|| self.plot.to_continuous_box());
        let mut state = SubLevelState::new(self.id, self.pose, bounds)
            .with_last_pose(self.last_pose.unwrap_or(self.pose));
        if let Some(name) = &self.name {
            state = state.with_name(name.clone());
        }
        state
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelRecord {
    /// Uniform ambient flow, m/s.
    #[serde(default, with = "layout::vec3")]
    pub wind: DVec3,
    /// Occupied cells of the main grid, plot cells included.
    #[serde(default)]
    pub solid: Vec<[i32; 3]>,
    #[serde(default)]
    pub sub_levels: Vec<SubLevelRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_level: Option<LevelId>,
    #[serde(default)]
    pub levels: BTreeMap<LevelId, LevelRecord>,
}

impl Scene {
    /// Read and validate a scene file.
    pub fn load(path: &Path) -> Result<Self> {
        // 1. Validate input exists
        if !path.exists() {
            return Err(KernelError::Scene(format!(
                "Scene file not found: {}",
                path.display()
            )));
        }

        // 2. Parse
        let text = fs::read_to_string(path)?;
        let scene = Self::from_json(&text)?;

        info!(
            path = %path.display(),
            levels = scene.levels.len(),
            sub_levels = scene.sub_level_count(),
            "Loaded scene"
        );
        Ok(scene)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(text)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        debug!(path = %path.display(), "Wrote scene");
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(active) = &self.active_level {
            if !self.levels.contains_key(active) {
                return Err(KernelError::Scene(format!(
                    "Active level {active} is not defined"
                )));
            }
        }
        Ok(())
    }

    pub fn sub_level_count(&self) -> usize {
        self.levels.values().map(|l| l.sub_levels.len()).sum()
    }

    pub fn level(&self, level: &LevelId) -> Option<&LevelRecord> {
        self.levels.get(level)
    }

    /// Solid cells of `level`; empty for unknown levels.
    pub fn solid_cells(&self, level: &LevelId) -> HashSet<IVec3> {
        self.levels
            .get(level)
            .map(|l| l.solid.iter().map(|c| IVec3::from_array(*c)).collect())
            .unwrap_or_default()
    }

    /// Build a companion holding every level of the scene.
    ///
    /// With the backend disabled the sub-levels are skipped and every level
    /// answers as if it had none.
    pub fn build_companion(&self, config: &KernelConfig) -> Result<Companion> {
        let mut companion = Companion::from_config(config)?;
        companion.set_active_level(self.active_level.clone());

        if config.backend == Backend::Disabled {
            if self.sub_level_count() > 0 {
                warn!(
                    sub_levels = self.sub_level_count(),
                    "Sub-level backend disabled, ignoring scene sub-levels"
                );
            }
            return Ok(companion);
        }

        for (name, level) in &self.levels {
            let registry = companion.level_mut(name)?;
            if level.wind != DVec3::ZERO {
                registry.set_ambient_flow(UniformWind(level.wind));
            }
            for record in &level.sub_levels {
                registry.insert(record.to_state(), record.plot)?;
            }
            debug!(level = %name, sub_levels = registry.len(), "Populated level");
        }

        Ok(companion)
    }
}
