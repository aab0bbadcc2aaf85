//! CPU isosurface extraction: Marching Cubes over a density field, plus water planes.
#![forbid(unsafe_code)]

pub mod geometry;
pub mod marching;
pub mod tables;
pub mod water;

pub use geometry::ChunkGeometry;
pub use marching::{MAX_LATTICE_CELLS, MeshError, extract};
pub use water::build_water_plane;
