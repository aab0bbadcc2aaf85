use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use reef_geom::Vec3;
use serde::Deserialize;

use crate::coords::LatticeResolution;

/// Upper bound on octaves; beyond this `lacunarity^i` leaves f32 range for typical inputs.
pub const MAX_OCTAVES: u32 = 32;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DensityConfig {
    #[serde(default)]
    pub noise: Noise,
    #[serde(default)]
    pub levels: Levels,
    #[serde(default)]
    pub chunk: ChunkLayout,
}

/// Noise shape keys. Absent keys fall back to the preset, then to the defaults.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Noise {
    pub frequency: Option<f32>,
    pub octaves: Option<u32>,
    pub persistence: Option<f32>,
    pub lacunarity: Option<f32>,
    pub threshold: Option<f32>,
    /// Optional preset applied before the explicit keys above.
    pub preset: Option<String>,
}
fn default_frequency() -> f32 {
    0.2
}
fn default_octaves() -> u32 {
    3
}
fn default_persistence() -> f32 {
    0.15
}
fn default_lacunarity() -> f32 {
    4.0
}
fn default_threshold() -> f32 {
    0.2
}

/// Heights in chunk units.
#[derive(Clone, Debug, Deserialize)]
pub struct Levels {
    #[serde(default = "default_surface")]
    pub surface: f32,
    #[serde(default = "default_surface_transition")]
    pub surface_transition_height: f32,
    #[serde(default = "default_floor")]
    pub floor: f32,
    #[serde(default = "default_floor_transition")]
    pub floor_transition_height: f32,
    #[serde(default)]
    pub sea: f32,
}
fn default_surface() -> f32 {
    4.0
}
fn default_surface_transition() -> f32 {
    5.0
}
fn default_floor() -> f32 {
    -8.0
}
fn default_floor_transition() -> f32 {
    1.0
}
impl Default for Levels {
    fn default() -> Self {
        Self {
            surface: default_surface(),
            surface_transition_height: default_surface_transition(),
            floor: default_floor(),
            floor_transition_height: default_floor_transition(),
            sea: 0.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChunkLayout {
    #[serde(default = "default_chunk_size")]
    pub size: [f32; 3],
    #[serde(default = "default_resolution")]
    pub resolution: [u32; 3],
}
fn default_chunk_size() -> [f32; 3] {
    [10.0, 10.0, 10.0]
}
fn default_resolution() -> [u32; 3] {
    [16, 16, 16]
}
impl Default for ChunkLayout {
    fn default() -> Self {
        Self {
            size: default_chunk_size(),
            resolution: default_resolution(),
        }
    }
}

impl ChunkLayout {
    #[inline]
    pub fn chunk_size(&self) -> Vec3 {
        Vec3::from(self.size)
    }

    #[inline]
    pub fn resolution(&self) -> LatticeResolution {
        let [x, y, z] = self.resolution;
        LatticeResolution::new(x, y, z)
    }
}

/// Flattened density parameters. Immutable once a field is built from them.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityParams {
    pub frequency: f32,
    pub octave_count: u32,
    pub persistence: f32,
    pub lacunarity: f32,
    pub threshold: f32,
    pub surface_level: f32,
    pub surface_transition_height: f32,
    pub floor_level: f32,
    pub floor_transition_height: f32,
    pub sea_level: f32,
}

impl Default for DensityParams {
    fn default() -> Self {
        let l = Levels::default();
        Self {
            frequency: default_frequency(),
            octave_count: default_octaves(),
            persistence: default_persistence(),
            lacunarity: default_lacunarity(),
            threshold: default_threshold(),
            surface_level: l.surface,
            surface_transition_height: l.surface_transition_height,
            floor_level: l.floor,
            floor_transition_height: l.floor_transition_height,
            sea_level: l.sea,
        }
    }
}

impl DensityParams {
    /// Flattens a config. A named preset overrides the noise shape first; every
    /// explicit key then wins over the preset.
    pub fn from_config(cfg: &DensityConfig) -> Result<Self, ParamsError> {
        let mut p = Self {
            frequency: default_frequency(),
            octave_count: default_octaves(),
            persistence: default_persistence(),
            lacunarity: default_lacunarity(),
            threshold: default_threshold(),
            surface_level: cfg.levels.surface,
            surface_transition_height: cfg.levels.surface_transition_height,
            floor_level: cfg.levels.floor,
            floor_transition_height: cfg.levels.floor_transition_height,
            sea_level: cfg.levels.sea,
        };
        if let Some(name) = cfg.noise.preset.as_deref() {
            name.parse::<Preset>()?.apply(&mut p);
        }
        let n = &cfg.noise;
        if let Some(v) = n.frequency {
            p.frequency = v;
        }
        if let Some(v) = n.octaves {
            p.octave_count = v;
        }
        if let Some(v) = n.persistence {
            p.persistence = v;
        }
        if let Some(v) = n.lacunarity {
            p.lacunarity = v;
        }
        if let Some(v) = n.threshold {
            p.threshold = v;
        }
        Ok(p)
    }

    /// Rejects parameter sets that would break the field's assumptions.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let finite = [
            ("frequency", self.frequency),
            ("persistence", self.persistence),
            ("lacunarity", self.lacunarity),
            ("threshold", self.threshold),
            ("surface_level", self.surface_level),
            ("surface_transition_height", self.surface_transition_height),
            ("floor_level", self.floor_level),
            ("floor_transition_height", self.floor_transition_height),
            ("sea_level", self.sea_level),
        ];
        for (name, v) in finite {
            if !v.is_finite() {
                return Err(ParamsError::NonFinite(name));
            }
        }
        if self.floor_level >= self.surface_level {
            return Err(ParamsError::FloorNotBelowSurface {
                floor: self.floor_level,
                surface: self.surface_level,
            });
        }
        if self.octave_count == 0 || self.octave_count > MAX_OCTAVES {
            return Err(ParamsError::OctaveCount(self.octave_count));
        }
        if !(0.0..=1.0).contains(&self.persistence) {
            return Err(ParamsError::PersistenceOutOfRange(self.persistence));
        }
        if self.surface_transition_height <= 0.0 {
            return Err(ParamsError::NonPositiveTransition {
                which: "surface",
                value: self.surface_transition_height,
            });
        }
        if self.floor_transition_height <= 0.0 {
            return Err(ParamsError::NonPositiveTransition {
                which: "floor",
                value: self.floor_transition_height,
            });
        }
        Ok(())
    }
}

/// Named noise shapes. Levels are left untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    Ocean,
    Default,
    Cinematic,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Ocean, Preset::Default, Preset::Cinematic];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Ocean => "ocean",
            Preset::Default => "default",
            Preset::Cinematic => "cinematic",
        }
    }

    pub fn apply(self, p: &mut DensityParams) {
        let (frequency, octaves, persistence, lacunarity, threshold) = match self {
            Preset::Ocean => (0.2, 3, 0.15, 4.0, 0.2),
            Preset::Default => (1.0, 4, 0.5, 2.0, 0.0),
            Preset::Cinematic => (0.1, 8, 0.5, 2.0, 0.0),
        };
        p.frequency = frequency;
        p.octave_count = octaves;
        p.persistence = persistence;
        p.lacunarity = lacunarity;
        p.threshold = threshold;
    }
}

impl FromStr for Preset {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParamsError::UnknownPreset(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParamsError {
    FloorNotBelowSurface { floor: f32, surface: f32 },
    OctaveCount(u32),
    PersistenceOutOfRange(f32),
    NonPositiveTransition { which: &'static str, value: f32 },
    NonFinite(&'static str),
    UnknownPreset(String),
}

impl fmt::Display for ParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamsError::FloorNotBelowSurface { floor, surface } => write!(
                f,
                "invalid parameters: floor_level {floor} must be below surface_level {surface}"
            ),
            ParamsError::OctaveCount(n) => write!(
                f,
                "invalid parameters: octave_count {n} must be in 1..={MAX_OCTAVES}"
            ),
            ParamsError::PersistenceOutOfRange(v) => {
                write!(f, "invalid parameters: persistence {v} must be in [0, 1]")
            }
            ParamsError::NonPositiveTransition { which, value } => write!(
                f,
                "invalid parameters: {which}_transition_height {value} must be > 0"
            ),
            ParamsError::NonFinite(name) => {
                write!(f, "invalid parameters: {name} is not finite")
            }
            ParamsError::UnknownPreset(name) => write!(f, "unknown preset '{name}'"),
        }
    }
}

impl Error for ParamsError {}

pub fn load_config_from_path(path: &Path) -> Result<DensityConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let cfg: DensityConfig = toml::from_str(&s)?;
    Ok(cfg)
}

/// Reads, flattens and validates a density config file.
pub fn load_params_from_path(path: &Path) -> Result<DensityParams, Box<dyn Error>> {
    let cfg = load_config_from_path(path)?;
    let params = DensityParams::from_config(&cfg)?;
    params.validate()?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let p = DensityParams::default();
        assert!(p.validate().is_ok());
        assert_eq!(p.octave_count, 3);
        assert_eq!(p.floor_level, -8.0);
        assert_eq!(p.surface_level, 4.0);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: DensityConfig = toml::from_str("[noise]\noctaves = 5\n").unwrap();
        let p = DensityParams::from_config(&cfg).unwrap();
        assert_eq!(p.octave_count, 5);
        assert_eq!(p.frequency, 0.2);
        assert_eq!(cfg.chunk.resolution(), LatticeResolution::cubic(16));
    }

    #[test]
    fn preset_then_explicit_override() {
        let src = "[noise]\npreset = \"cinematic\"\nthreshold = 0.3\n";
        let cfg: DensityConfig = toml::from_str(src).unwrap();
        let p = DensityParams::from_config(&cfg).unwrap();
        assert_eq!(p.octave_count, 8);
        assert_eq!(p.frequency, 0.1);
        assert_eq!(p.threshold, 0.3);
    }

    #[test]
    fn explicit_default_value_beats_preset() {
        let src = "[noise]\npreset = \"cinematic\"\noctaves = 3\nthreshold = 0.2\n";
        let cfg: DensityConfig = toml::from_str(src).unwrap();
        let p = DensityParams::from_config(&cfg).unwrap();
        assert_eq!(p.octave_count, 3);
        assert_eq!(p.threshold, 0.2);
        // Keys left out still come from the preset.
        assert_eq!(p.frequency, 0.1);
        assert_eq!(p.persistence, 0.5);
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let cfg: DensityConfig = toml::from_str("[noise]\npreset = \"lava\"\n").unwrap();
        assert_eq!(
            DensityParams::from_config(&cfg),
            Err(ParamsError::UnknownPreset("lava".into()))
        );
    }

    #[test]
    fn validation_rejects_each_invariant() {
        let base = DensityParams::default();

        let mut p = base.clone();
        p.floor_level = p.surface_level;
        assert!(matches!(p.validate(), Err(ParamsError::FloorNotBelowSurface { .. })));

        let mut p = base.clone();
        p.octave_count = 0;
        assert_eq!(p.validate(), Err(ParamsError::OctaveCount(0)));

        let mut p = base.clone();
        p.persistence = 1.5;
        assert_eq!(p.validate(), Err(ParamsError::PersistenceOutOfRange(1.5)));

        let mut p = base.clone();
        p.floor_transition_height = 0.0;
        assert!(matches!(
            p.validate(),
            Err(ParamsError::NonPositiveTransition { which: "floor", .. })
        ));

        let mut p = base;
        p.frequency = f32::NAN;
        assert_eq!(p.validate(), Err(ParamsError::NonFinite("frequency")));
    }

    #[test]
    fn preset_names_round_trip() {
        for p in Preset::ALL {
            assert_eq!(p.name().parse::<Preset>(), Ok(p));
        }
        assert_eq!("CINEMATIC".parse::<Preset>(), Ok(Preset::Cinematic));
    }
}
