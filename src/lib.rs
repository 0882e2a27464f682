pub mod companion;
pub mod config;
pub mod error;
pub mod scene;
pub mod session;
pub mod sublevel;
pub mod types;

pub use companion::Companion;
pub use config::{Backend, KernelConfig, ProbeConfig, QuerySettings};
pub use error::{KernelError, Result};
pub use session::Session;
pub use sublevel::{
    AmbientFlow, NoSubLevels, PlotRegistry, Positioned, SubLevel, SubLevelQueries,
    SubLevelQueriesExt, SubLevelState,
};
pub use types::{ContinuousBox, GridBox, LevelId, Pose, SubLevelId};
