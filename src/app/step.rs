use std::time::{Duration, Instant};

use super::App;
use crate::event::Event;

impl App {
    /// One control-loop tick: config reload, viewer motion, result intake, events.
    pub fn step(&mut self, dt: f32) {
        self.process_config_file_events();
        if self.take_params_dirty() {
            self.queue.emit_now(Event::DensityParamsChanged {
                rev: self.world.params_rev(),
            });
        }

        if let Some(col) = self.viewer.advance(dt, &self.world) {
            self.queue.emit_now(Event::ViewCenterChanged {
                ccx: col.cx,
                ccz: col.cz,
            });
        }

        for out in self.runtime.drain_worker_results() {
            self.queue.emit_now(Event::BuildJobCompleted { out });
        }
        self.queue.emit_now(Event::Tick);

        while let Some(env) = self.queue.pop_ready() {
            self.evt_processed_total = self.evt_processed_total.saturating_add(1);
            *self.evt_processed_by.entry(env.kind.name()).or_insert(0) += 1;
            self.handle_event(env);
        }
        self.debug_stats.queued_events_total = self.queue.len();
        self.debug_stats.decorations = self.decor.values().map(Vec::len).sum();
        self.queue.advance_tick();
    }

    /// No queued work, no in-flight builds and no chunk waiting on a result.
    pub fn is_settled(&self) -> bool {
        self.queue.is_empty() && self.runtime.is_idle() && self.store.pending_count() == 0
    }

    /// Steps without moving the viewer until every requested build has been delivered.
    /// Returns `false` if `timeout` ran out first.
    pub fn drain(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.is_settled() {
                return true;
            }
            if let Some(out) = self.runtime.recv_result_timeout(Duration::from_millis(20)) {
                self.queue.emit_now(Event::BuildJobCompleted { out });
            }
            self.step(0.0);
        }
        self.is_settled()
    }

    pub fn log_stats(&self) {
        let r = self.store.render_stats();
        let s = self.store.stats();
        let (queued, inflight) = self.runtime.queue_debug_counts();
        log::info!(
            "tick {} col {:?} ({} turns) | columns {} chunks {} water {} pending {} | {} verts {} tris",
            self.queue.now,
            self.viewer.column(),
            self.viewer.blocked_moves,
            r.columns,
            r.chunks_loaded,
            r.water_loaded,
            r.pending,
            r.vertices,
            r.triangles
        );
        log::info!(
            "jobs queued {} inflight {} | requested {} attached {} rejected {} discarded {} disposed {} | build {:.2} ms avg {} ms max | {} decorations",
            queued,
            inflight,
            s.requested,
            s.attached,
            s.rejected,
            s.discarded,
            s.disposed,
            self.debug_stats.mean_build_ms(),
            self.debug_stats.build_ms_max,
            self.debug_stats.decorations
        );
        if log::log_enabled!(log::Level::Debug) {
            let mut by: Vec<(&str, usize)> =
                self.evt_processed_by.iter().map(|(k, v)| (*k, *v)).collect();
            by.sort_by(|a, b| b.1.cmp(&a.1));
            log::debug!(
                "events processed {} ({} deferred) {:?}",
                self.evt_processed_total,
                self.debug_stats.queued_events_total,
                by
            );
        }
    }
}
