//! Layered gradient noise with surface and floor masks.
//!
//! Inputs are in normalized chunk space (world position divided by chunk size).
//! Output lies in `[-1, 1]`: values below the threshold are open water, values at
//! or above it are rock.

use std::fmt;

use fastnoise_lite::{FastNoiseLite, NoiseType};
use reef_geom::Vec3;

use crate::params::DensityParams;

/// Step used by the central-difference gradient, in normalized chunk units.
pub const NORMAL_EPSILON: f32 = 0.05;

/// Anything that can be sampled like the density field.
pub trait ScalarField {
    fn sample(&self, x: f32, y: f32, z: f32) -> f32;

    #[inline]
    fn sample_at(&self, p: Vec3) -> f32 {
        self.sample(p.x, p.y, p.z)
    }

    /// Unit vector pointing toward lower density (into the water side). A flat
    /// field, such as the fully masked water above the surface, yields `Vec3::UP`.
    fn normal_at(&self, p: Vec3) -> Vec3 {
        let e = NORMAL_EPSILON;
        let dx = self.sample(p.x - e, p.y, p.z) - self.sample(p.x + e, p.y, p.z);
        let dy = self.sample(p.x, p.y - e, p.z) - self.sample(p.x, p.y + e, p.z);
        let dz = self.sample(p.x, p.y, p.z - e) - self.sample(p.x, p.y, p.z + e);
        let g = Vec3::new(dx, dy, dz);
        let n = g / g.length();
        if n.is_finite() { n } else { Vec3::UP }
    }
}

impl<F> ScalarField for F
where
    F: Fn(f32, f32, f32) -> f32,
{
    #[inline]
    fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        self(x, y, z)
    }
}

/// Immutable once built. A parameter change builds a new field.
pub struct DensityField {
    params: DensityParams,
    octaves: Vec<Octave>,
}

struct Octave {
    noise: FastNoiseLite,
    amplitude: f32,
    frequency: f32,
}

impl DensityField {
    /// Octave `i` is seeded with `i`, so equal params give bit-identical fields.
    pub fn new(params: DensityParams) -> Self {
        let mut octaves = Vec::with_capacity(params.octave_count as usize);
        let mut amplitude = 1.0f32;
        let mut frequency = params.frequency;
        for i in 0..params.octave_count {
            let mut noise = FastNoiseLite::with_seed(i as i32);
            noise.set_noise_type(Some(NoiseType::OpenSimplex2));
            noise.set_frequency(Some(1.0));
            octaves.push(Octave {
                noise,
                amplitude,
                frequency,
            });
            amplitude *= params.persistence;
            frequency *= params.lacunarity;
        }
        Self { params, octaves }
    }

    #[inline]
    pub fn params(&self) -> &DensityParams {
        &self.params
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.params.threshold
    }

    /// Raw octave sum clamped to `[-1, 1]`, before masking.
    pub fn layered_noise(&self, x: f32, y: f32, z: f32) -> f32 {
        let mut value = 0.0f32;
        for o in &self.octaves {
            let f = o.frequency;
            value += o.amplitude * o.noise.get_noise_3d(x * f, y * f, z * f);
        }
        value.clamp(-1.0, 1.0)
    }

    /// 1 well below the surface, 0 at and above it.
    #[inline]
    pub fn surface_mask(&self, y: f32) -> f32 {
        let p = &self.params;
        ((p.surface_level - y) / p.surface_transition_height).clamp(0.0, 1.0)
    }

    /// 1 well above the floor, 0 at and below it.
    #[inline]
    pub fn floor_mask(&self, y: f32) -> f32 {
        let p = &self.params;
        ((y - p.floor_level) / p.floor_transition_height).clamp(0.0, 1.0)
    }

    #[inline]
    pub fn is_water(&self, p: Vec3) -> bool {
        self.sample_at(p) < self.params.threshold
    }
}

impl ScalarField for DensityField {
    fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        let mut value = self.layered_noise(x, y, z);
        // Floor is applied last so it wins where the two bands overlap.
        value = (value + 1.0) * self.surface_mask(y) - 1.0;
        value = (value - 1.0) * self.floor_mask(y) + 1.0;
        value
    }
}

impl fmt::Debug for DensityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DensityField")
            .field("params", &self.params)
            .field("octaves", &self.octaves.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> DensityField {
        DensityField::new(DensityParams::default())
    }

    #[test]
    fn same_params_bit_identical() {
        let a = field();
        let b = field();
        for i in 0..64 {
            let t = i as f32 * 0.173;
            let (x, y, z) = (t - 3.0, -t * 0.5, t * 1.7);
            assert_eq!(a.sample(x, y, z).to_bits(), b.sample(x, y, z).to_bits());
        }
    }

    #[test]
    fn surface_mask_endpoints() {
        let f = field();
        let p = f.params().clone();
        assert!((f.surface_mask(p.surface_level - p.surface_transition_height) - 1.0).abs() < 1e-6);
        assert!(f.surface_mask(p.surface_level).abs() < 1e-6);
        assert_eq!(f.surface_mask(p.surface_level + 10.0), 0.0);
    }

    #[test]
    fn floor_mask_endpoints() {
        let f = field();
        let p = f.params().clone();
        assert!((f.floor_mask(p.floor_level + p.floor_transition_height) - 1.0).abs() < 1e-6);
        assert!(f.floor_mask(p.floor_level).abs() < 1e-6);
        assert_eq!(f.floor_mask(p.floor_level - 3.0), 0.0);
    }

    #[test]
    fn open_water_above_surface_rock_below_floor() {
        let f = field();
        let p = f.params().clone();
        assert_eq!(f.sample(0.3, p.surface_level + 1.0, -2.1), -1.0);
        assert_eq!(f.sample(0.3, p.floor_level - 1.0, -2.1), 1.0);
        assert!(f.is_water(Vec3::new(0.0, p.surface_level + 0.5, 0.0)));
        assert!(!f.is_water(Vec3::new(0.0, p.floor_level - 0.5, 0.0)));
    }

    #[test]
    fn closure_normal_points_toward_lower_density() {
        // Density grows with y, so the normal points down.
        let plane = |_x: f32, y: f32, _z: f32| y;
        let n = plane.normal_at(Vec3::new(0.2, 0.4, -0.7));
        assert!((n.y + 1.0).abs() < 1e-5);
        assert!(n.x.abs() < 1e-6 && n.z.abs() < 1e-6);
    }

    #[test]
    fn flat_field_normal_is_up() {
        let flat = |_x: f32, _y: f32, _z: f32| 0.5;
        assert_eq!(flat.normal_at(Vec3::new(1.0, 2.0, 3.0)), Vec3::UP);
        // Above the surface the masks saturate and the field is constant.
        let f = field();
        let y = f.params().surface_level + 2.0;
        assert_eq!(f.normal_at(Vec3::new(0.3, y, -1.2)), Vec3::UP);
    }
}
