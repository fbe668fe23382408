use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::options::WindowName;
use crate::registry::{Visibility, WindowRegistry};
use crate::scheduler::{Scheduler, Task, TaskToken};
use crate::surface::{guarded, Backend, SurfaceId};

/// What a close request does to a given window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosePolicy {
    /// Destroy the native surface.
    Destroy,
    /// Hide it and keep it around for instant reuse.
    Hide,
}

impl ClosePolicy {
    pub fn for_window(name: WindowName) -> ClosePolicy {
        match name {
            WindowName::Setting => ClosePolicy::Hide,
            WindowName::Main | WindowName::Dialog => ClosePolicy::Destroy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Hidden(WindowName),
    Destroyed(WindowName),
    /// The surface is not registered under any name.
    Unmanaged,
}

/// Decides fake vs real close and cascades shutdown from the main window.
pub struct ShutdownCoordinator {
    minimize_to_tray: bool,
    fake_close_delay: Duration,
    pending_hides: HashMap<SurfaceId, TaskToken>,
}

impl ShutdownCoordinator {
    pub fn new(minimize_to_tray: bool, fake_close_delay: Duration) -> Self {
        Self {
            minimize_to_tray,
            fake_close_delay,
            pending_hides: HashMap::new(),
        }
    }

    pub fn set_minimize_to_tray(&mut self, enabled: bool) {
        self.minimize_to_tray = enabled;
    }

    /// Handle a close request for `surface`, then evaluate the cascade.
    /// A fake close the cascade then destroys reports `Destroyed`.
    pub fn close<B: Backend + ?Sized>(
        &mut self,
        registry: &mut WindowRegistry,
        backend: &mut B,
        scheduler: &mut Scheduler,
        now: Instant,
        surface: SurfaceId,
    ) -> CloseOutcome {
        let outcome = match registry.get_name(surface) {
            None => {
                guarded(backend, surface, "close", |b, id| b.close(id));
                CloseOutcome::Unmanaged
            }
            Some(name) => match ClosePolicy::for_window(name) {
                ClosePolicy::Hide => {
                    registry.mark_hidden(name);
                    // the hide waits so the requester's IPC reply can flush
                    let token = scheduler.schedule(
                        now,
                        self.fake_close_delay,
                        Task::FakeCloseHide(surface),
                    );
                    if let Some(previous) = self.pending_hides.insert(surface, token) {
                        scheduler.cancel(previous);
                    }
                    tracing::info!(window = %name, surface, "fake close, hiding");
                    CloseOutcome::Hidden(name)
                }
                ClosePolicy::Destroy => {
                    // cleared before the native close so a racing open()
                    // never reuses a half-closed surface
                    registry.clear(name);
                    self.cancel_pending_hide(scheduler, surface);
                    guarded(backend, surface, "close", |b, id| b.close(id));
                    tracing::info!(window = %name, surface, "closing");
                    CloseOutcome::Destroyed(name)
                }
            },
        };
        let doomed = self.cascade(registry, backend, scheduler);
        match outcome {
            CloseOutcome::Hidden(name) if doomed.contains(&name) => CloseOutcome::Destroyed(name),
            outcome => outcome,
        }
    }

    /// Run a deferred fake-close hide. A surface that was reopened or
    /// destroyed in the meantime is left alone.
    pub fn finish_fake_close<B: Backend + ?Sized>(
        &mut self,
        registry: &WindowRegistry,
        backend: &mut B,
        surface: SurfaceId,
    ) -> bool {
        self.pending_hides.remove(&surface);
        match registry.get_name(surface) {
            Some(name) if registry.is_hidden(name) => {
                guarded(backend, surface, "hide", |b, id| b.hide(id))
            }
            _ => false,
        }
    }

    pub fn cancel_pending_hide(&mut self, scheduler: &mut Scheduler, surface: SurfaceId) -> bool {
        match self.pending_hides.remove(&surface) {
            Some(token) => scheduler.cancel(token),
            None => false,
        }
    }

    pub fn forget(&mut self, surface: SurfaceId) {
        self.pending_hides.remove(&surface);
    }

    /// Destroy secondary windows that would otherwise outlive the main one.
    ///
    /// Once main has existed and is gone, every other window is destroyed.
    /// With tray mode off and main not on screen, every other window that
    /// is not on screen either is destroyed.
    pub fn cascade<B: Backend + ?Sized>(
        &mut self,
        registry: &mut WindowRegistry,
        backend: &mut B,
        scheduler: &mut Scheduler,
    ) -> Vec<WindowName> {
        let others: Vec<WindowName> = WindowName::ALL
            .into_iter()
            .filter(|name| *name != WindowName::Main)
            .filter(|name| registry.instance(*name).is_some())
            .collect();

        let doomed: Vec<WindowName> = match registry.instance(WindowName::Main) {
            None if registry.ever_created(WindowName::Main) => others,
            None => Vec::new(),
            Some(main) if backend.is_destroyed(main) => others,
            Some(_) if !self.minimize_to_tray && !on_screen(registry, backend, WindowName::Main) => {
                others
                    .into_iter()
                    .filter(|name| !on_screen(registry, backend, *name))
                    .collect()
            }
            Some(_) => Vec::new(),
        };

        for name in &doomed {
            if let Some(surface) = registry.clear(*name) {
                scheduler.cancel_for(surface);
                self.pending_hides.remove(&surface);
                guarded(backend, surface, "destroy", |b, id| b.destroy(id));
                tracing::info!(window = %name, surface, "destroyed by shutdown cascade");
            }
        }
        doomed
    }
}

fn on_screen<B: Backend + ?Sized>(registry: &WindowRegistry, backend: &B, name: WindowName) -> bool {
    registry.visibility(name) == Visibility::Visible
        && registry
            .instance(name)
            .is_some_and(|id| !backend.is_destroyed(id) && !backend.is_minimized(id))
}
