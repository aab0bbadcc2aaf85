use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use reef_chunk::{ChunkStore, StreamingPolicy};
use reef_geom::Vec3;
use reef_runtime::Runtime;
use reef_world::{ColumnCoord, World};

use crate::event::EventQueue;
use crate::viewer::Viewer;

pub struct App {
    pub world: Arc<World>,
    pub store: ChunkStore,
    pub runtime: Runtime,
    pub policy: StreamingPolicy,
    pub queue: EventQueue,
    pub viewer: Viewer,
    pub debug_stats: DebugStats,
    /// Decoration anchors (position, normal) per loaded column.
    pub(crate) decor: hashbrown::HashMap<ColumnCoord, Vec<(Vec3, Vec3)>>,
    pub(crate) decor_per_column: u32,
    pub(crate) stats_every: u64,
    pub(crate) evt_processed_total: usize,
    pub(crate) evt_processed_by: HashMap<&'static str, usize>,
    pub(crate) config_event_rx: Option<Receiver<()>>,
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) params_dirty: bool,
}

#[derive(Clone, Debug, Default)]
pub struct DebugStats {
    pub jobs_done: u64,
    pub build_ms_total: u64,
    pub build_ms_max: u32,
    pub queued_events_total: usize,
    pub decorations: usize,
}

impl DebugStats {
    pub fn mean_build_ms(&self) -> f32 {
        if self.jobs_done == 0 {
            0.0
        } else {
            self.build_ms_total as f32 / self.jobs_done as f32
        }
    }
}
