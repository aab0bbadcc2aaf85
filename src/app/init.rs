use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reef_chunk::{ChunkStore, StreamingPolicy};
use reef_runtime::{Runtime, ThreadPoolBuildError};
use reef_world::World;

use super::App;
use super::state::DebugStats;
use crate::event::{Event, EventQueue};
use crate::viewer::Viewer;

/// Startup knobs collected from the command line and the `[stream]` table.
#[derive(Clone, Debug)]
pub struct AppOptions {
    pub radius: u32,
    pub workers: usize,
    pub heading_deg: f32,
    pub speed: f32,
    pub config_path: Option<PathBuf>,
    pub watch_config: bool,
    /// Ticks between stats lines; 0 disables them.
    pub stats_every: u64,
    pub decor_per_column: u32,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            radius: 2,
            workers: 0,
            heading_deg: 0.0,
            speed: 4.0,
            config_path: None,
            watch_config: false,
            stats_every: 600,
            decor_per_column: 8,
        }
    }
}

impl App {
    pub fn new(world: Arc<World>, opts: AppOptions) -> Result<Self, ThreadPoolBuildError> {
        let viewer = Viewer::spawn(&world, opts.heading_deg, opts.speed);
        log::info!(
            "viewer spawned at ({:.1}, {:.1}, {:.1}) in column {:?}",
            viewer.position().x,
            viewer.position().y,
            viewer.position().z,
            viewer.column()
        );

        let config_event_rx = match (&opts.config_path, opts.watch_config) {
            (Some(path), true) => Some(spawn_config_watcher(path)),
            _ => None,
        };

        let runtime = Runtime::new(opts.workers)?;
        let store = ChunkStore::new(world.clone());
        let policy = StreamingPolicy::new(opts.radius);
        let mut queue = EventQueue::new();
        let center = viewer.column();
        queue.emit_now(Event::ViewCenterChanged {
            ccx: center.cx,
            ccz: center.cz,
        });

        Ok(Self {
            world,
            store,
            runtime,
            policy,
            queue,
            viewer,
            debug_stats: DebugStats::default(),
            decor: hashbrown::HashMap::new(),
            decor_per_column: opts.decor_per_column,
            stats_every: opts.stats_every,
            evt_processed_total: 0,
            evt_processed_by: HashMap::new(),
            config_event_rx,
            config_path: opts.config_path,
            params_dirty: false,
        })
    }
}

/// Watches the density config file; every change sends a unit notification.
fn spawn_config_watcher(path: &Path) -> std::sync::mpsc::Receiver<()> {
    let (tx, rx) = std::sync::mpsc::channel::<()>();
    let path = path.to_path_buf();
    std::thread::spawn(move || {
        use notify::{EventKind, RecursiveMode, Watcher};
        match notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                match event.kind {
                    EventKind::Modify(_)
                    | EventKind::Create(_)
                    | EventKind::Remove(_)
                    | EventKind::Any => {
                        let _ = tx.send(());
                    }
                    _ => {}
                }
            }
        }) {
            Ok(mut watcher) => {
                if let Err(e) = watcher.watch(path.as_path(), RecursiveMode::NonRecursive) {
                    log::warn!("cannot watch {}: {}", path.display(), e);
                    return;
                }
                log::info!("watching {} for changes", path.display());
                loop {
                    std::thread::sleep(std::time::Duration::from_secs(3600));
                }
            }
            Err(e) => log::warn!("config watcher unavailable: {}", e),
        }
    });
    rx
}
