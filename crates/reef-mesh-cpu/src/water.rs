use reef_geom::Vec3;
use reef_world::{ColumnCoord, LatticeResolution};

use crate::geometry::ChunkGeometry;
use crate::marching::MeshError;

/// Flat water grid over one column footprint at world height `surface_y`.
///
/// `res.x * res.z` vertices, all normals up, two upward-facing triangles per cell.
/// The geometry is keyed by the column's `cy = 0` chunk; positions are world space.
pub fn build_water_plane(
    col: ColumnCoord,
    res: LatticeResolution,
    chunk_size: Vec3,
    surface_y: f32,
) -> Result<ChunkGeometry, MeshError> {
    if res.x < 2 || res.z < 2 {
        return Err(MeshError::EmptyResolution(res));
    }
    let (nx, nz) = (res.x, res.z);
    let x0 = col.cx as f32 * chunk_size.x;
    let z0 = col.cz as f32 * chunk_size.z;
    let dx = chunk_size.x / (nx - 1) as f32;
    let dz = chunk_size.z / (nz - 1) as f32;

    let mut out = ChunkGeometry::new(col.chunk(0));
    out.positions.reserve((nx * nz * 3) as usize);
    out.normals.reserve((nx * nz * 3) as usize);
    out.indices.reserve(((nx - 1) * (nz - 1) * 6) as usize);
    for i in 0..nx {
        for j in 0..nz {
            let p = Vec3::new(x0 + i as f32 * dx, surface_y, z0 + j as f32 * dz);
            out.push_vertex(p, Vec3::UP);
        }
    }
    let v = |i: u32, j: u32| i * nz + j;
    for i in 0..nx - 1 {
        for j in 0..nz - 1 {
            let (a, b, c, d) = (v(i, j), v(i, j + 1), v(i + 1, j), v(i + 1, j + 1));
            out.indices.extend_from_slice(&[a, b, c, c, b, d]);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_covers_footprint_facing_up() {
        let size = Vec3::splat(10.0);
        let g = build_water_plane(ColumnCoord::new(-1, 2), LatticeResolution::cubic(16), size, 40.0)
            .unwrap();
        assert_eq!(g.vertex_count(), 256);
        assert_eq!(g.triangle_count(), 15 * 15 * 2);
        assert!(g.is_consistent());
        let b = g.bounds();
        assert_eq!(b.min, Vec3::new(-10.0, 40.0, 20.0));
        assert!((b.max.x - 0.0).abs() < 1e-4 && (b.max.z - 30.0).abs() < 1e-4);
        for t in g.indices.chunks_exact(3) {
            let (p0, p1, p2) = (
                g.position(t[0] as usize),
                g.position(t[1] as usize),
                g.position(t[2] as usize),
            );
            assert!((p1 - p0).cross(p2 - p0).y > 0.0);
        }
    }

    #[test]
    fn degenerate_grid_is_rejected() {
        let r = build_water_plane(
            ColumnCoord::new(0, 0),
            LatticeResolution::new(1, 16, 16),
            Vec3::splat(10.0),
            0.0,
        );
        assert!(matches!(r, Err(MeshError::EmptyResolution(_))));
    }
}
