use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use reef_geom::Vec3;

use crate::coords::{ColumnCoord, LatticeResolution};
use crate::density::{DensityField, ScalarField};
use crate::params::{ChunkLayout, DensityParams, ParamsError};

/// Bisection stops once the sample is this close to the threshold.
const SEABED_TOLERANCE: f32 = 1e-4;
const SEABED_MAX_STEPS: u32 = 64;

/// Shared terrain handle: chunk layout plus the current density field snapshot.
///
/// Readers clone the inner `Arc` and keep sampling a consistent field even while a
/// parameter update swaps it.
pub struct World {
    pub chunk_size: Vec3,
    pub resolution: LatticeResolution,
    field: RwLock<Arc<DensityField>>,
    params_rev: AtomicU32,
}

impl World {
    pub fn new(params: DensityParams, layout: &ChunkLayout) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(Self {
            chunk_size: layout.chunk_size(),
            resolution: layout.resolution(),
            field: RwLock::new(Arc::new(DensityField::new(params))),
            params_rev: AtomicU32::new(0),
        })
    }

    /// Current field. Cheap; take one per build request.
    pub fn field(&self) -> Arc<DensityField> {
        let guard = self.field.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    pub fn params(&self) -> DensityParams {
        self.field().params().clone()
    }

    #[inline]
    pub fn params_rev(&self) -> u32 {
        self.params_rev.load(Ordering::Acquire)
    }

    /// Validates and swaps in a new field. On error the previous field stays active.
    pub fn update_params(&self, params: DensityParams) -> Result<u32, ParamsError> {
        params.validate()?;
        let next = Arc::new(DensityField::new(params));
        {
            let mut guard = self.field.write().unwrap_or_else(PoisonError::into_inner);
            *guard = next;
        }
        let rev = self.params_rev.fetch_add(1, Ordering::AcqRel) + 1;
        log::info!("density params updated (rev {})", rev);
        Ok(rev)
    }

    #[inline]
    pub fn to_normalized(&self, p: Vec3) -> Vec3 {
        p.div_elem(self.chunk_size)
    }

    /// True when the world position is open water.
    pub fn can_occupy(&self, p: Vec3) -> bool {
        self.field().is_water(self.to_normalized(p))
    }

    /// Same gradient the mesher uses for vertex normals.
    pub fn surface_normal(&self, p: Vec3) -> Vec3 {
        self.field().normal_at(self.to_normalized(p))
    }

    /// Chunk y indices a column holds: `floor(floor_level) .. ceil(surface_level)`.
    pub fn column_y_range(&self) -> Range<i32> {
        let p = self.params();
        (p.floor_level.floor() as i32)..(p.surface_level.ceil() as i32)
    }

    /// World height of the water plane.
    pub fn surface_height(&self) -> f32 {
        self.params().surface_level * self.chunk_size.y
    }

    /// World height where the vertical line at `(wx, wz)` crosses the threshold,
    /// searched between one chunk under the floor and the surface.
    pub fn seabed_height(&self, wx: f32, wz: f32) -> f32 {
        let field = self.field();
        let p = field.params();
        let thr = p.threshold;
        let mut upper = p.surface_level * self.chunk_size.y;
        let mut lower = (p.floor_level - 1.0) * self.chunk_size.y;
        let mut mid = 0.5 * (upper + lower);
        for _ in 0..SEABED_MAX_STEPS {
            let d = field.sample_at(self.to_normalized(Vec3::new(wx, mid, wz)));
            if (d - thr).abs() < SEABED_TOLERANCE {
                break;
            }
            if d < thr {
                upper = mid;
            } else {
                lower = mid;
            }
            mid = 0.5 * (upper + lower);
        }
        mid
    }

    /// Up to `max` seabed anchor points within a column, jittered deterministically
    /// by column coordinate. Each anchor carries its surface normal.
    pub fn decoration_anchors(&self, col: ColumnCoord, max: u32) -> Vec<(Vec3, Vec3)> {
        let mut state = column_hash(col);
        let count = next_unit(&mut state) * (max as f32 + 1.0);
        let count = (count as u32).min(max);
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let wx = (col.cx as f32 + next_unit(&mut state)) * self.chunk_size.x;
            let wz = (col.cz as f32 + next_unit(&mut state)) * self.chunk_size.z;
            let wy = self.seabed_height(wx, wz);
            let pos = Vec3::new(wx, wy, wz);
            out.push((pos, self.surface_normal(pos)));
        }
        out
    }
}

fn column_hash(col: ColumnCoord) -> u64 {
    let mut h = (col.cx as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= (col.cz as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h ^ (h >> 29)
}

// splitmix64, mapped to [0, 1)
fn next_unit(state: &mut u64) -> f32 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 40) as f32 / (1u64 << 24) as f32
}
