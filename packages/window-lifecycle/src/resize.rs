use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::ipc::MAXIMIZE_STATE_CHANNEL;
use crate::scheduler::{Scheduler, Task};
use crate::surface::{guarded, Backend, SurfaceId};

/// Pushes debounced maximize-state changes to a surface's content.
pub struct ResizeBroadcaster {
    watched: HashSet<SurfaceId>,
    debounce: Duration,
}

impl ResizeBroadcaster {
    pub fn new(debounce: Duration) -> Self {
        Self {
            watched: HashSet::new(),
            debounce,
        }
    }

    pub fn subscribe(&mut self, surface: SurfaceId) {
        self.watched.insert(surface);
    }

    /// Stop watching `surface` and drop any pending broadcast for it.
    pub fn unsubscribe(&mut self, scheduler: &mut Scheduler, surface: SurfaceId) {
        if self.watched.remove(&surface) {
            scheduler.cancel_debounced(Task::BroadcastMaximize(surface));
        }
    }

    pub fn is_watching(&self, surface: SurfaceId) -> bool {
        self.watched.contains(&surface)
    }

    /// Re-arm the debounce window for `surface`.
    pub fn on_resized(&self, scheduler: &mut Scheduler, now: Instant, surface: SurfaceId) {
        if self.watched.contains(&surface) {
            scheduler.debounce(now, self.debounce, Task::BroadcastMaximize(surface));
        }
    }

    /// Send the current maximize state. Skipped for destroyed surfaces.
    pub fn broadcast<B: Backend + ?Sized>(&self, backend: &mut B, surface: SurfaceId) -> bool {
        if !self.watched.contains(&surface) {
            return false;
        }
        guarded(backend, surface, "broadcast maximize state", |b, id| {
            let maximized = b.is_maximized(id);
            b.post_message(id, MAXIMIZE_STATE_CHANNEL, Value::Bool(maximized))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SurfaceOptions;
    use crate::testing::FakeBackend;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn bursts_collapse_into_one_task() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let mut resize = ResizeBroadcaster::new(ms(80));
        resize.subscribe(1);

        resize.on_resized(&mut scheduler, t0, 1);
        resize.on_resized(&mut scheduler, t0 + ms(30), 1);
        resize.on_resized(&mut scheduler, t0 + ms(60), 1);

        assert!(scheduler.take_due(t0 + ms(100)).is_empty());
        assert_eq!(
            scheduler.take_due(t0 + ms(140)),
            vec![Task::BroadcastMaximize(1)]
        );
    }

    #[test]
    fn unwatched_surfaces_are_ignored() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let resize = ResizeBroadcaster::new(ms(80));
        resize.on_resized(&mut scheduler, t0, 9);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn broadcast_sends_current_state() {
        let mut backend = FakeBackend::default();
        backend.create_surface(1, &SurfaceOptions::default()).unwrap();
        backend.maximize(1).unwrap();
        let mut resize = ResizeBroadcaster::new(ms(80));
        resize.subscribe(1);

        assert!(resize.broadcast(&mut backend, 1));
        assert_eq!(
            backend.surface(1).unwrap().messages,
            vec![(MAXIMIZE_STATE_CHANNEL.to_string(), Value::Bool(true))]
        );
    }

    #[test]
    fn no_broadcast_after_destroy() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let mut backend = FakeBackend::default();
        backend.create_surface(1, &SurfaceOptions::default()).unwrap();
        let mut resize = ResizeBroadcaster::new(ms(80));
        resize.subscribe(1);
        resize.on_resized(&mut scheduler, t0, 1);

        backend.destroy(1).unwrap();
        assert!(!resize.broadcast(&mut backend, 1));

        resize.unsubscribe(&mut scheduler, 1);
        assert!(scheduler.is_empty());
        assert!(!resize.is_watching(1));
    }
}
