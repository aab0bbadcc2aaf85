use reef_geom::{Aabb, Vec3};
use reef_world::ChunkCoord;
use serde::{Deserialize, Serialize};

/// Indexed triangle list for one chunk. Flat `xyz` arrays, one normal per vertex.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkGeometry {
    pub chunk_coord: ChunkCoord,
    #[serde(rename = "vertices")]
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl ChunkGeometry {
    pub fn new(chunk_coord: ChunkCoord) -> Self {
        Self {
            chunk_coord,
            ..Default::default()
        }
    }

    /// Appends a vertex and returns its index.
    #[inline]
    pub fn push_vertex(&mut self, p: Vec3, n: Vec3) -> u32 {
        let i = self.vertex_count() as u32;
        self.positions.extend_from_slice(&p.to_array());
        self.normals.extend_from_slice(&n.to_array());
        i
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::new(
            self.positions[i * 3],
            self.positions[i * 3 + 1],
            self.positions[i * 3 + 2],
        )
    }

    #[inline]
    pub fn normal(&self, i: usize) -> Vec3 {
        Vec3::new(self.normals[i * 3], self.normals[i * 3 + 1], self.normals[i * 3 + 2])
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points((0..self.vertex_count()).map(|i| self.position(i)))
    }

    /// Subtracts `origin` from every position.
    pub fn into_local(mut self, origin: Vec3) -> Self {
        for p in self.positions.chunks_exact_mut(3) {
            p[0] -= origin.x;
            p[1] -= origin.y;
            p[2] -= origin.z;
        }
        self
    }

    /// Buffer sizes agree and every index names an existing vertex.
    pub fn is_consistent(&self) -> bool {
        let n = self.vertex_count();
        self.positions.len() % 3 == 0
            && self.normals.len() == self.positions.len()
            && self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| (i as usize) < n)
    }
}
