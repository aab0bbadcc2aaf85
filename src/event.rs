use std::collections::{BTreeMap, VecDeque};

use reef_runtime::JobOut;

pub enum Event {
    Tick,

    // Viewer
    ViewCenterChanged { ccx: i32, ccz: i32 },
    StreamRadiusChanged { radius: u32 },

    // Streaming & meshing
    EnsureColumnLoaded { cx: i32, cz: i32 },
    EnsureColumnUnloaded { cx: i32, cz: i32 },
    BuildJobCompleted { out: JobOut },

    // Configuration
    DensityParamsChanged { rev: u32 },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Tick => "Tick",
            Event::ViewCenterChanged { .. } => "ViewCenterChanged",
            Event::StreamRadiusChanged { .. } => "StreamRadiusChanged",
            Event::EnsureColumnLoaded { .. } => "EnsureColumnLoaded",
            Event::EnsureColumnUnloaded { .. } => "EnsureColumnUnloaded",
            Event::BuildJobCompleted { .. } => "BuildJobCompleted",
            Event::DensityParamsChanged { .. } => "DensityParamsChanged",
        }
    }
}

pub struct EventEnvelope {
    pub id: u64,
    pub tick: u64,
    pub kind: Event,
}

/// Events bucketed by tick; FIFO within a tick.
pub struct EventQueue {
    by_tick: BTreeMap<u64, VecDeque<EventEnvelope>>,
    pub now: u64,
    next_id: u64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self {
            by_tick: BTreeMap::new(),
            now: 0,
            next_id: 1,
        }
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    pub fn emit_now(&mut self, kind: Event) -> u64 {
        self.emit_at(self.now, kind)
    }

    pub fn emit_at(&mut self, tick: u64, kind: Event) -> u64 {
        let id = self.alloc_id();
        // Past ticks would never be popped.
        let tick = tick.max(self.now);
        let env = EventEnvelope { id, tick, kind };
        self.by_tick.entry(tick).or_default().push_back(env);
        id
    }

    pub fn pop_ready(&mut self) -> Option<EventEnvelope> {
        self.by_tick.get_mut(&self.now)?.pop_front()
    }

    pub fn advance_tick(&mut self) {
        if self.by_tick.get(&self.now).is_some_and(VecDeque::is_empty) {
            self.by_tick.remove(&self.now);
        }
        self.now = self.now.wrapping_add(1);
    }

    pub fn len(&self) -> usize {
        self.by_tick.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_within_tick_and_deferred_later() {
        let mut q = EventQueue::new();
        q.emit_at(q.now + 1, Event::EnsureColumnLoaded { cx: 9, cz: 9 });
        q.emit_now(Event::EnsureColumnLoaded { cx: 1, cz: 0 });
        q.emit_now(Event::EnsureColumnUnloaded { cx: 2, cz: 0 });
        assert!(matches!(
            q.pop_ready().map(|e| e.kind),
            Some(Event::EnsureColumnLoaded { cx: 1, .. })
        ));
        assert!(matches!(
            q.pop_ready().map(|e| e.kind),
            Some(Event::EnsureColumnUnloaded { cx: 2, .. })
        ));
        assert!(q.pop_ready().is_none());
        assert_eq!(q.len(), 1);
        q.advance_tick();
        assert!(matches!(
            q.pop_ready().map(|e| e.kind),
            Some(Event::EnsureColumnLoaded { cx: 9, .. })
        ));
        assert!(q.is_empty());
    }

    #[test]
    fn past_ticks_clamp_to_now() {
        let mut q = EventQueue::new();
        q.advance_tick();
        q.advance_tick();
        q.emit_at(0, Event::Tick);
        assert_eq!(q.pop_ready().map(|e| e.tick), Some(2));
    }
}
