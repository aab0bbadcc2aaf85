//! Ocean density field, its parameters, and the shared world handle.
#![forbid(unsafe_code)]

pub mod coords;
pub mod density;
pub mod params;
pub mod world;

pub use coords::{ChunkCoord, ColumnCoord, LatticeResolution};
pub use density::{DensityField, ScalarField, NORMAL_EPSILON};
pub use params::{
    DensityConfig, DensityParams, ParamsError, Preset, load_config_from_path, load_params_from_path,
};
pub use world::World;
