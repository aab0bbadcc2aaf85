use super::App;
use crate::config::load_stream_config;
use crate::event::Event;

impl App {
    /// Reloads the config file after changes. A density section that fails to parse
    /// or validate leaves the current parameters in place. A changed `[stream].radius`
    /// replaces the running radius, including one given on the command line.
    pub fn process_config_file_events(&mut self) {
        let Some(rx) = self.config_event_rx.as_ref() else {
            return;
        };
        let mut changed = false;
        for _ in rx.try_iter() {
            changed = true;
        }
        if !changed {
            return;
        }
        let Some(path) = self.config_path.as_deref() else {
            return;
        };
        if !path.exists() {
            log::warn!("density config missing: {}", path.display());
            return;
        }
        match load_stream_config(path) {
            Ok(sc) if sc.radius != self.policy.radius() => {
                self.queue
                    .emit_now(Event::StreamRadiusChanged { radius: sc.radius });
            }
            Ok(_) => {}
            Err(e) => log::warn!("stream config reload failed ({}): {}", path.display(), e),
        }
        let params = match reef_world::load_params_from_path(path) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("density config reload failed ({}): {}", path.display(), e);
                return;
            }
        };
        if params == self.world.params() {
            log::debug!("density config touched but unchanged");
            return;
        }
        match self.world.update_params(params) {
            Ok(rev) => {
                log::info!("density config reloaded from {} (rev {})", path.display(), rev);
                self.params_dirty = true;
            }
            Err(e) => log::warn!("density config rejected: {}", e),
        }
    }

    pub fn take_params_dirty(&mut self) -> bool {
        if self.params_dirty {
            self.params_dirty = false;
            true
        } else {
            false
        }
    }
}
