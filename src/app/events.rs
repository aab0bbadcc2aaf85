use reef_chunk::Delivery;
use reef_world::ColumnCoord;

use super::App;
use crate::event::{Event, EventEnvelope};

impl App {
    pub(super) fn handle_event(&mut self, env: EventEnvelope) {
        log::trace!(target: "events", "[tick {} #{}] {}", env.tick, env.id, env.kind.name());
        match env.kind {
            Event::Tick => {
                if self.stats_every > 0 && env.tick % self.stats_every == 0 {
                    self.log_stats();
                }
            }
            Event::ViewCenterChanged { ccx, ccz } => {
                let center = ColumnCoord::new(ccx, ccz);
                let delta = self.policy.plan(center, &self.store);
                for col in delta.unloaded {
                    self.queue.emit_now(Event::EnsureColumnUnloaded {
                        cx: col.cx,
                        cz: col.cz,
                    });
                }
                for col in delta.loaded {
                    self.queue.emit_now(Event::EnsureColumnLoaded {
                        cx: col.cx,
                        cz: col.cz,
                    });
                }
            }
            Event::StreamRadiusChanged { radius } => {
                let before = self.policy.radius();
                let radius = self.policy.set_radius(radius);
                log::info!("stream radius {} -> {}", before, radius);
                if let Some(center) = self.policy.center() {
                    self.queue.emit_now(Event::ViewCenterChanged {
                        ccx: center.cx,
                        ccz: center.cz,
                    });
                }
            }
            Event::EnsureColumnLoaded { cx, cz } => {
                let col = ColumnCoord::new(cx, cz);
                // The center may have moved again since this was queued.
                if !self.in_stream_range(col) {
                    return;
                }
                if self.store.ensure_column(col, &mut self.runtime) {
                    let anchors = self.world.decoration_anchors(col, self.decor_per_column);
                    self.decor.insert(col, anchors);
                }
            }
            Event::EnsureColumnUnloaded { cx, cz } => {
                let col = ColumnCoord::new(cx, cz);
                if self.in_stream_range(col) {
                    return;
                }
                self.store.drop_column(col);
                self.decor.remove(&col);
            }
            Event::BuildJobCompleted { out } => {
                self.debug_stats.jobs_done += 1;
                self.debug_stats.build_ms_total += u64::from(out.t_total_ms);
                self.debug_stats.build_ms_max = self.debug_stats.build_ms_max.max(out.t_total_ms);
                let (coord, kind) = (out.coord, out.kind);
                if let Delivery::Attached = self.store.apply_result(out) {
                    log::trace!(target: "events", "attached {:?} {:?}", kind, coord);
                }
            }
            Event::DensityParamsChanged { rev } => {
                let cols: Vec<ColumnCoord> = self.store.column_coords().collect();
                for col in cols {
                    let anchors = self.world.decoration_anchors(col, self.decor_per_column);
                    self.decor.insert(col, anchors);
                }
                let n = self.store.force_rebuild_all(&mut self.runtime);
                log::info!(
                    "density params rev {} applied; rebuilding {} chunks in {} columns",
                    rev,
                    n,
                    self.store.column_count()
                );
            }
        }
    }

    fn in_stream_range(&self, col: ColumnCoord) -> bool {
        match self.policy.center() {
            Some(c) => col.chebyshev(c) <= self.policy.radius(),
            None => false,
        }
    }
}
