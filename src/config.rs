use std::error::Error;
use std::path::Path;

use serde::Deserialize;

use crate::app::AppOptions;

/// Root `[stream]` table of the config file. Density tables in the same file are
/// read by `reef_world::load_config_from_path`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub radius: u32,
    pub workers: usize,
    pub stats_every: u64,
    pub decorations_per_column: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        let d = AppOptions::default();
        Self {
            radius: d.radius,
            workers: d.workers,
            stats_every: d.stats_every,
            decorations_per_column: d.decor_per_column,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RootConfig {
    #[serde(default)]
    stream: StreamConfig,
}

pub fn load_stream_config(path: &Path) -> Result<StreamConfig, Box<dyn Error>> {
    let s = std::fs::read_to_string(path)?;
    let root: RootConfig = toml::from_str(&s)?;
    Ok(root.stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_table_is_optional_and_partial() {
        let root: RootConfig = toml::from_str("[noise]\noctaves = 2\n").unwrap();
        assert_eq!(root.stream, StreamConfig::default());
        let root: RootConfig = toml::from_str("[stream]\nradius = 5\n").unwrap();
        assert_eq!(root.stream.radius, 5);
        assert_eq!(root.stream.workers, StreamConfig::default().workers);
    }

    #[test]
    fn sample_config_matches_defaults() {
        let text = include_str!("../reef.toml");
        let root: RootConfig = toml::from_str(text).unwrap();
        assert_eq!(root.stream, StreamConfig::default());
        let cfg: reef_world::DensityConfig = toml::from_str(text).unwrap();
        let p = reef_world::DensityParams::from_config(&cfg).unwrap();
        assert_eq!(p, reef_world::DensityParams::default());
        assert_eq!(cfg.chunk.resolution(), reef_world::LatticeResolution::cubic(16));
    }
}
