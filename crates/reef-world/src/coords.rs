use reef_geom::Vec3;
use serde::{Deserialize, Serialize};

/// Integer chunk index. Chunk `c` spans world `[c * size, (c + 1) * size)` per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    #[serde(rename = "x")]
    pub cx: i32,
    #[serde(rename = "y")]
    pub cy: i32,
    #[serde(rename = "z")]
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    #[inline]
    pub fn column(self) -> ColumnCoord {
        ColumnCoord::new(self.cx, self.cz)
    }

    /// Chunk origin in normalized chunk space.
    #[inline]
    pub fn as_vec3(self) -> Vec3 {
        Vec3::new(self.cx as f32, self.cy as f32, self.cz as f32)
    }

    /// World-space origin (minimum corner).
    #[inline]
    pub fn world_origin(self, chunk_size: Vec3) -> Vec3 {
        self.as_vec3().mul_elem(chunk_size)
    }

    pub fn from_world(p: Vec3, chunk_size: Vec3) -> Self {
        let n = p.div_elem(chunk_size);
        Self::new(n.x.floor() as i32, n.y.floor() as i32, n.z.floor() as i32)
    }
}

/// One vertical stack of chunks; the unit of streaming.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnCoord {
    #[serde(rename = "x")]
    pub cx: i32,
    #[serde(rename = "z")]
    pub cz: i32,
}

impl ColumnCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn chunk(self, cy: i32) -> ChunkCoord {
        ChunkCoord::new(self.cx, cy, self.cz)
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.cx + dx, self.cz + dz)
    }

    /// Max of the per-axis distances.
    #[inline]
    pub fn chebyshev(self, other: ColumnCoord) -> u32 {
        let dx = self.cx.abs_diff(other.cx);
        let dz = self.cz.abs_diff(other.cz);
        dx.max(dz)
    }

    pub fn from_world(wx: f32, wz: f32, chunk_size: Vec3) -> Self {
        Self::new(
            (wx / chunk_size.x).floor() as i32,
            (wz / chunk_size.z).floor() as i32,
        )
    }
}

/// Cells per chunk along each axis; the sampling lattice has one more point per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LatticeResolution {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl LatticeResolution {
    #[inline]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn cubic(n: u32) -> Self {
        Self { x: n, y: n, z: n }
    }

    #[inline]
    pub fn cells(self) -> u64 {
        u64::from(self.x) * u64::from(self.y) * u64::from(self.z)
    }

    #[inline]
    pub fn as_vec3(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }
}

impl Default for LatticeResolution {
    fn default() -> Self {
        Self::cubic(16)
    }
}

impl std::fmt::Display for LatticeResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {} x {}", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chebyshev_is_max_axis() {
        let a = ColumnCoord::new(0, 0);
        assert_eq!(a.chebyshev(ColumnCoord::new(2, -1)), 2);
        assert_eq!(a.chebyshev(ColumnCoord::new(-3, 3)), 3);
        assert_eq!(a.chebyshev(a), 0);
    }

    #[test]
    fn from_world_floors_negative() {
        let size = Vec3::splat(10.0);
        assert_eq!(ColumnCoord::from_world(-0.5, 9.99, size), ColumnCoord::new(-1, 0));
        assert_eq!(
            ChunkCoord::from_world(Vec3::new(10.0, -10.0, -10.01), size),
            ChunkCoord::new(1, -1, -2)
        );
    }

    #[test]
    fn wire_shape_uses_xyz_keys() {
        let s = toml::to_string(&ChunkCoord::new(1, -2, 3)).unwrap();
        assert!(s.contains("x = 1"));
        assert!(s.contains("y = -2"));
        assert!(s.contains("z = 3"));
    }
}
