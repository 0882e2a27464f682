pub mod bounds;
pub mod grid_box;
pub mod ident;
pub mod layout;
pub mod pose;

pub use bounds::ContinuousBox;
pub use grid_box::{
    CHUNK_BITS, CHUNK_SIZE, GridBox, block_containing, chunk_coord, chunk_coord_with, chunk_of,
};
pub use ident::{LevelId, SubLevelId};
pub use pose::{POSE_LEN, Pose};
