use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::{Backend, KernelConfig};
use crate::error::{KernelError, Result};
use crate::sublevel::{NoSubLevels, PlotRegistry, SubLevelQueries};
use crate::types::LevelId;

/// Entry point for sub-level queries across every level of a world.
///
/// The backend is chosen once, from configuration, when the companion is
/// built. With [`Backend::Disabled`] every level answers through
/// [`NoSubLevels`]; with [`Backend::Plots`] each level gets its own
/// [`PlotRegistry`] on first mutable access.
pub struct Companion {
    config: KernelConfig,
    levels: BTreeMap<LevelId, PlotRegistry>,
    fallback: NoSubLevels,
    active_level: Option<LevelId>,
}

impl Companion {
    pub fn from_config(config: &KernelConfig) -> Result<Self> {
        config.settings.validate()?;
        info!(
            backend = %config.backend,
            chunk_bits = config.settings.chunk_bits,
            tick_seconds = config.settings.tick_seconds,
            "Sub-level backend selected"
        );
        Ok(Self {
            config: *config,
            levels: BTreeMap::new(),
            fallback: NoSubLevels::new(config.settings),
            active_level: None,
        })
    }

    pub fn backend(&self) -> Backend {
        self.config.backend
    }

    /// Queries for `level`. Levels without a registry behave as if they had
    /// no sub-levels.
    pub fn queries(&self, level: &LevelId) -> &dyn SubLevelQueries {
        match (self.config.backend, self.levels.get(level)) {
            (Backend::Plots, Some(registry)) => registry,
            _ => &self.fallback,
        }
    }

    /// The registry for `level`, created empty if needed.
    pub fn level_mut(&mut self, level: &LevelId) -> Result<&mut PlotRegistry> {
        if self.config.backend == Backend::Disabled {
            return Err(KernelError::Config(format!(
                "cannot register sub-levels in {level}: backend is {}",
                self.config.backend
            )));
        }
        let settings = self.config.settings;
        Ok(self.levels.entry(level.clone()).or_insert_with(|| {
            debug!(%level, "Created plot registry");
            PlotRegistry::new(settings)
        }))
    }

    /// Levels that have a registry, in name order.
    pub fn levels(&self) -> impl Iterator<Item = &LevelId> {
        self.levels.keys()
    }

    /// The level the local viewer is in, if one has been set.
    pub fn active_level(&self) -> Option<&LevelId> {
        self.active_level.as_ref()
    }

    pub fn set_active_level(&mut self, level: Option<LevelId>) {
        self.active_level = level;
    }

    /// Queries for the active level, if one is set.
    pub fn active_queries(&self) -> Option<&dyn SubLevelQueries> {
        self.active_level.as_ref().map(|level| self.queries(level))
    }
}
