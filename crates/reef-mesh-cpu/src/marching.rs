use std::fmt;

use reef_geom::Vec3;
use reef_world::{ChunkCoord, LatticeResolution, ScalarField};

use crate::geometry::ChunkGeometry;
use crate::tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};

/// Largest accepted `res.x * res.y * res.z`.
pub const MAX_LATTICE_CELLS: u64 = 10_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeshError {
    ResolutionTooLarge {
        resolution: LatticeResolution,
        cells: u64,
        cap: u64,
    },
    /// An axis with zero cells (or fewer than two water-plane vertices).
    EmptyResolution(LatticeResolution),
}

impl MeshError {
    /// Wire tag for the error kind.
    pub fn tag(&self) -> &'static str {
        match self {
            MeshError::ResolutionTooLarge { .. } => "ResolutionTooLarge",
            MeshError::EmptyResolution(_) => "EmptyResolution",
        }
    }
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::ResolutionTooLarge {
                resolution,
                cells,
                cap,
            } => write!(
                f,
                "lattice resolution too large: {resolution} = {cells} cells > {cap}"
            ),
            MeshError::EmptyResolution(r) => write!(f, "lattice resolution {r} is empty"),
        }
    }
}

impl std::error::Error for MeshError {}

pub(crate) fn check_resolution(res: LatticeResolution) -> Result<(), MeshError> {
    let cells = res.cells();
    if cells > MAX_LATTICE_CELLS {
        return Err(MeshError::ResolutionTooLarge {
            resolution: res,
            cells,
            cap: MAX_LATTICE_CELLS,
        });
    }
    if cells == 0 {
        return Err(MeshError::EmptyResolution(res));
    }
    Ok(())
}

/// Samples on a `(res + 1)^3` lattice, x-major.
struct Lattice {
    ny: usize,
    nz: usize,
    values: Vec<f32>,
}

impl Lattice {
    fn sample<F: ScalarField + ?Sized>(field: &F, coord: ChunkCoord, res: LatticeResolution) -> Self {
        let (nx, ny, nz) = (res.x as usize + 1, res.y as usize + 1, res.z as usize + 1);
        let base = coord.as_vec3();
        let r = res.as_vec3();
        let mut values = Vec::with_capacity(nx * ny * nz);
        for x in 0..nx {
            let sx = base.x + x as f32 / r.x;
            for y in 0..ny {
                let sy = base.y + y as f32 / r.y;
                for z in 0..nz {
                    let sz = base.z + z as f32 / r.z;
                    values.push(field.sample(sx, sy, sz));
                }
            }
        }
        Self { ny, nz, values }
    }

    #[inline]
    fn at(&self, x: u32, y: u32, z: u32) -> f32 {
        self.values[(x as usize * self.ny + y as usize) * self.nz + z as usize]
    }
}

/// Polygonizes one chunk.
///
/// The resolution is checked before any sampling. Positions are world space:
/// `coord * chunk_size + lattice_index * (chunk_size / res)`. Normals are the
/// field gradient at `position / chunk_size`, pointing toward the water side.
pub fn extract<F: ScalarField + ?Sized>(
    field: &F,
    coord: ChunkCoord,
    res: LatticeResolution,
    chunk_size: Vec3,
    threshold: f32,
) -> Result<ChunkGeometry, MeshError> {
    check_resolution(res)?;
    let lattice = Lattice::sample(field, coord, res);
    let origin = coord.world_origin(chunk_size);
    let step = chunk_size.div_elem(res.as_vec3());
    let mut out = ChunkGeometry::new(coord);

    let mut corner_d = [0.0f32; 8];
    let mut corner_p = [Vec3::ZERO; 8];
    for x in 0..res.x {
        for y in 0..res.y {
            for z in 0..res.z {
                let mut cube = 0usize;
                for (i, [ox, oy, oz]) in CORNER_OFFSETS.iter().enumerate() {
                    let d = lattice.at(x + ox, y + oy, z + oz);
                    corner_d[i] = d;
                    if d < threshold {
                        cube |= 1 << i;
                    }
                }
                let edges = EDGE_TABLE[cube];
                if edges == 0 {
                    continue;
                }
                for (i, [ox, oy, oz]) in CORNER_OFFSETS.iter().enumerate() {
                    let idx = Vec3::new((x + ox) as f32, (y + oy) as f32, (z + oz) as f32);
                    corner_p[i] = origin + idx.mul_elem(step);
                }

                // Vertices are shared only within this cube.
                let mut local = [0u32; 12];
                for (e, &[a, b]) in EDGE_CORNERS.iter().enumerate() {
                    if edges & (1 << e) == 0 {
                        continue;
                    }
                    let mu = (threshold - corner_d[a]) / (corner_d[b] - corner_d[a]);
                    let p = corner_p[a].lerp(corner_p[b], mu);
                    let n = field.normal_at(p.div_elem(chunk_size));
                    local[e] = out.push_vertex(p, n);
                }
                for &e in TRI_TABLE[cube].iter().take_while(|&&e| e >= 0) {
                    out.indices.push(local[e as usize]);
                }
            }
        }
    }
    log::trace!(
        "extracted {:?}: {} verts, {} tris",
        coord,
        out.vertex_count(),
        out.triangle_count()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_names_resolution_and_cap() {
        let err = check_resolution(LatticeResolution::cubic(22)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("22 x 22 x 22"), "{msg}");
        assert!(msg.contains("10648"), "{msg}");
        assert!(msg.contains("10000"), "{msg}");
        assert_eq!(err.tag(), "ResolutionTooLarge");
    }

    #[test]
    fn cap_is_inclusive() {
        assert!(check_resolution(LatticeResolution::new(100, 100, 1)).is_ok());
        assert!(check_resolution(LatticeResolution::new(100, 101, 1)).is_err());
    }

    #[test]
    fn zero_axis_is_rejected() {
        assert_eq!(
            check_resolution(LatticeResolution::new(0, 4, 4)),
            Err(MeshError::EmptyResolution(LatticeResolution::new(0, 4, 4)))
        );
    }

    #[test]
    fn oversized_resolution_never_samples() {
        let calls = std::cell::Cell::new(0u32);
        let field = |_x: f32, _y: f32, _z: f32| {
            calls.set(calls.get() + 1);
            0.0
        };
        let r = extract(
            &field,
            ChunkCoord::new(0, 0, 0),
            LatticeResolution::cubic(22),
            Vec3::splat(10.0),
            0.0,
        );
        assert!(r.is_err());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn single_cell_single_corner() {
        // Only corner 0 is below threshold: one triangle across edges 0, 3, 8.
        let field = |x: f32, y: f32, z: f32| x + y + z;
        let g = extract(
            &field,
            ChunkCoord::new(0, 0, 0),
            LatticeResolution::cubic(1),
            Vec3::splat(1.0),
            0.5,
        )
        .unwrap();
        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.triangle_count(), 1);
        let mut pts: Vec<[f32; 3]> = (0..3).map(|i| g.position(i).to_array()).collect();
        pts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(pts, vec![[0.0, 0.0, 0.5], [0.0, 0.5, 0.0], [0.5, 0.0, 0.0]]);
    }
}
