mod app;
mod config;
mod event;
mod viewer;

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use log::LevelFilter;
use reef_world::{DensityConfig, DensityParams, World, load_config_from_path};

use crate::app::{App, AppOptions};
use crate::config::{StreamConfig, load_stream_config};

/// Headless voxel ocean: streams and meshes chunk columns around a drifting viewer.
#[derive(Parser, Debug)]
#[command(name = "reef", version)]
struct Args {
    /// Density config (TOML) with `[noise]`, `[levels]`, `[chunk]` and `[stream]` tables
    #[arg(long)]
    config: Option<PathBuf>,
    /// Noise preset: ocean, default or cinematic
    #[arg(long)]
    preset: Option<String>,
    /// Stream radius in columns; overrides `[stream].radius`
    #[arg(long)]
    radius: Option<u32>,
    /// Mesh workers; 0 = one per core
    #[arg(long)]
    workers: Option<usize>,
    /// Ticks to simulate; 0 runs until interrupted
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    /// Viewer speed in world units per second
    #[arg(long, default_value_t = 4.0)]
    speed: f32,
    /// Viewer heading in degrees, 0 = +X
    #[arg(long, default_value_t = 0.0)]
    heading: f32,
    /// Reload the density config when the file changes
    #[arg(long)]
    watch_config: bool,
    /// Also write a debug log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// After the last tick, wait for outstanding builds and print final stats
    #[arg(long)]
    drain: bool,
    /// Sleep to hold ticks at 60 Hz instead of running flat out
    #[arg(long)]
    realtime: bool,
}

fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match log_file {
        Some(path) => {
            use simplelog::{
                ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode, WriteLogger,
            };
            CombinedLogger::init(vec![
                TermLogger::new(
                    LevelFilter::Info,
                    Config::default(),
                    TerminalMode::Mixed,
                    ColorChoice::Auto,
                ),
                WriteLogger::new(LevelFilter::Debug, Config::default(), File::create(path)?),
            ])?;
        }
        None => {
            env_logger::Builder::new()
                .target(env_logger::Target::Stdout)
                .filter_level(LevelFilter::Info)
                .parse_env("RUST_LOG")
                .try_init()?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let (mut cfg, stream) = match args.config.as_deref() {
        Some(path) => (load_config_from_path(path)?, load_stream_config(path)?),
        None => (DensityConfig::default(), StreamConfig::default()),
    };
    if let Some(name) = &args.preset {
        cfg.noise.preset = Some(name.clone());
    }
    let params = DensityParams::from_config(&cfg)?;
    let world = Arc::new(World::new(params, &cfg.chunk)?);
    log::info!(
        "world: chunk {:?} at {} lattice, columns span cy {:?}",
        world.chunk_size.to_array(),
        world.resolution,
        world.column_y_range()
    );

    let opts = AppOptions {
        radius: args.radius.unwrap_or(stream.radius),
        workers: args.workers.unwrap_or(stream.workers),
        heading_deg: args.heading,
        speed: args.speed,
        config_path: args.config.clone(),
        watch_config: args.watch_config,
        stats_every: stream.stats_every,
        decor_per_column: stream.decorations_per_column,
    };
    let mut app = App::new(world, opts)?;

    const DT: f32 = 1.0 / 60.0;
    let frame = Duration::from_secs_f32(DT);
    let started = Instant::now();
    let mut tick = 0u64;
    while args.ticks == 0 || tick < args.ticks {
        let t0 = Instant::now();
        app.step(DT);
        tick += 1;
        if args.realtime {
            if let Some(rest) = frame.checked_sub(t0.elapsed()) {
                std::thread::sleep(rest);
            }
        }
    }
    log::info!(
        "ran {} ticks in {:.2}s",
        tick,
        started.elapsed().as_secs_f32()
    );

    if args.drain && !app.drain(Duration::from_secs(120)) {
        log::warn!(
            "drain timed out with {} chunks pending",
            app.store.pending_count()
        );
    }
    app.log_stats();
    Ok(())
}
