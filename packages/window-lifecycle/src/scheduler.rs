//! Deferred work for the single control thread.
//!
//! Nothing here sleeps or spawns: tasks are plain data queued with a due
//! time, and the controller runs whatever is due on each pump.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::surface::SurfaceId;

/// Work the controller runs once its delay has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Push the surface's maximize state to its content.
    BroadcastMaximize(SurfaceId),
    /// Hide a surface that was fake-closed.
    FakeCloseHide(SurfaceId),
    /// Apply min/max sizes after the first show.
    ApplySizeConstraints(SurfaceId),
    /// Give up waiting for content readiness and show the surface.
    OverlayTimeout(SurfaceId),
}

impl Task {
    pub fn surface(&self) -> SurfaceId {
        match *self {
            Task::BroadcastMaximize(id)
            | Task::FakeCloseHide(id)
            | Task::ApplySizeConstraints(id)
            | Task::OverlayTimeout(id) => id,
        }
    }
}

/// Cancellation handle for a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskToken(u64);

struct Entry {
    due: Instant,
    token: TaskToken,
    task: Task,
}

#[derive(Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
    /// Debounced tasks currently armed, keyed by the task itself.
    debounced: HashMap<Task, TaskToken>,
    next_token: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to run once `delay` has elapsed after `now`.
    pub fn schedule(&mut self, now: Instant, delay: Duration, task: Task) -> TaskToken {
        let token = TaskToken(self.next_token);
        self.next_token += 1;
        self.entries.push(Entry {
            due: now + delay,
            token,
            task,
        });
        token
    }

    /// Queue `task`, replacing a previous identical task that has not run yet.
    pub fn debounce(&mut self, now: Instant, delay: Duration, task: Task) -> TaskToken {
        if let Some(previous) = self.debounced.remove(&task) {
            self.cancel(previous);
        }
        let token = self.schedule(now, delay, task);
        self.debounced.insert(task, token);
        token
    }

    /// Drop a pending task. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, token: TaskToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.token != token);
        self.debounced.retain(|_, t| *t != token);
        self.entries.len() != before
    }

    /// Drop the armed debounced `task`, if any.
    pub fn cancel_debounced(&mut self, task: Task) -> bool {
        match self.debounced.remove(&task) {
            Some(token) => self.cancel(token),
            None => false,
        }
    }

    /// Drop every pending task that targets `surface`.
    pub fn cancel_for(&mut self, surface: SurfaceId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.task.surface() != surface);
        self.debounced.retain(|task, _| task.surface() != surface);
        before - self.entries.len()
    }

    pub fn is_pending(&self, token: TaskToken) -> bool {
        self.entries.iter().any(|e| e.token == token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every task due at `now`, earliest first; ties keep
    /// scheduling order.
    pub fn take_due(&mut self, now: Instant) -> Vec<Task> {
        let mut due: Vec<Entry> = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].due <= now {
                due.push(self.entries.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|e| (e.due, e.token));
        for entry in &due {
            if self.debounced.get(&entry.task) == Some(&entry.token) {
                self.debounced.remove(&entry.task);
            }
        }
        due.into_iter().map(|e| e.task).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn runs_tasks_in_due_order() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(t0, ms(50), Task::FakeCloseHide(1));
        s.schedule(t0, ms(10), Task::ApplySizeConstraints(2));
        s.schedule(t0, ms(10), Task::BroadcastMaximize(3));

        assert!(s.take_due(t0 + ms(5)).is_empty());
        assert_eq!(
            s.take_due(t0 + ms(60)),
            vec![
                Task::ApplySizeConstraints(2),
                Task::BroadcastMaximize(3),
                Task::FakeCloseHide(1)
            ]
        );
        assert!(s.is_empty());
    }

    #[test]
    fn debounce_keeps_only_the_last_arming() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.debounce(t0, ms(80), Task::BroadcastMaximize(1));
        s.debounce(t0 + ms(50), ms(80), Task::BroadcastMaximize(1));
        s.debounce(t0 + ms(60), ms(80), Task::BroadcastMaximize(2));

        assert!(s.take_due(t0 + ms(100)).is_empty());
        assert_eq!(s.take_due(t0 + ms(130)), vec![Task::BroadcastMaximize(1)]);
        assert_eq!(s.take_due(t0 + ms(140)), vec![Task::BroadcastMaximize(2)]);

        // a fresh arming after the task ran schedules again
        s.debounce(t0 + ms(200), ms(80), Task::BroadcastMaximize(1));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn cancelled_tasks_never_run() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        let token = s.schedule(t0, ms(200), Task::FakeCloseHide(4));
        assert!(s.is_pending(token));
        assert!(s.cancel(token));
        assert!(!s.cancel(token));
        assert!(s.take_due(t0 + ms(500)).is_empty());
    }

    #[test]
    fn cancel_for_drops_every_task_of_a_surface() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(t0, ms(200), Task::FakeCloseHide(4));
        s.debounce(t0, ms(80), Task::BroadcastMaximize(4));
        s.schedule(t0, ms(16), Task::ApplySizeConstraints(5));

        assert_eq!(s.cancel_for(4), 2);
        assert_eq!(s.take_due(t0 + ms(500)), vec![Task::ApplySizeConstraints(5)]);
    }
}
