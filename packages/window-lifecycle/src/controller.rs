//! Window lifecycle orchestration.
//!
//! [`LifecycleController`] owns every component and is the only entry point
//! for opening windows, dispatching native events and control requests, and
//! running deferred work. It is driven from one thread: callers pass the
//! current [`Instant`] so deferred work stays deterministic under test.

use std::collections::HashMap;
use std::time::Instant;

use crate::config::OrchestratorConfig;
use crate::content::ContentTarget;
use crate::error::Result;
use crate::factory::{SurfaceFactory, Theme};
use crate::ipc::{self, ControlRequest, IS_MAXIMIZED_CHANNEL, MAX_MESSAGE_SIZE};
use crate::options::{SizeOptions, SurfaceOptions, WindowName};
use crate::overlay::LoadingOverlayManager;
use crate::registry::{Observer, Subscription, Visibility, WindowRegistry};
use crate::resize::ResizeBroadcaster;
use crate::scheduler::{Scheduler, Task};
use crate::shutdown::{CloseOutcome, ShutdownCoordinator};
use crate::surface::{guarded, Backend, SurfaceEvent, SurfaceId};

pub struct LifecycleController<B: Backend> {
    backend: B,
    config: OrchestratorConfig,
    registry: WindowRegistry,
    factory: SurfaceFactory,
    overlays: LoadingOverlayManager,
    resize: ResizeBroadcaster,
    shutdown: ShutdownCoordinator,
    scheduler: Scheduler,
    /// Every managed surface that has not reported `Destroyed` yet.
    live: HashMap<SurfaceId, WindowName>,
    /// Min/max sizes waiting for the surface's next show.
    pending_constraints: HashMap<SurfaceId, SizeOptions>,
    next_id: SurfaceId,
}

impl<B: Backend> LifecycleController<B> {
    pub fn new(backend: B, config: OrchestratorConfig) -> Self {
        let theme = Theme {
            dark: config.dark_theme,
        };
        Self {
            factory: SurfaceFactory::new(theme, config.icon.clone()),
            overlays: LoadingOverlayManager::new(theme.background_color()),
            resize: ResizeBroadcaster::new(config.resize_debounce),
            shutdown: ShutdownCoordinator::new(config.minimize_to_tray, config.fake_close_delay),
            scheduler: Scheduler::new(),
            registry: WindowRegistry::new(),
            live: HashMap::new(),
            pending_constraints: HashMap::new(),
            next_id: 1,
            backend,
            config,
        }
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn allocate_id(&mut self) -> SurfaceId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ---- Open ----

    /// Open the window `name`.
    ///
    /// Returns `None` when it is already visible. A fake-closed instance is
    /// shown again as is; otherwise a new surface is created behind a
    /// loading overlay. A failed native create leaves the registry as it was.
    pub fn open(
        &mut self,
        now: Instant,
        name: WindowName,
        size: &SizeOptions,
        overrides: Option<&SurfaceOptions>,
    ) -> Result<Option<SurfaceId>> {
        match self.registry.visibility(name) {
            Visibility::Visible => {
                tracing::debug!(window = %name, "already open");
                return Ok(None);
            }
            Visibility::Hidden => {
                if let Some(id) = self.reuse(name, size) {
                    return Ok(Some(id));
                }
            }
            Visibility::Absent => {}
        }
        self.create(now, name, size, overrides).map(Some)
    }

    fn reuse(&mut self, name: WindowName, size: &SizeOptions) -> Option<SurfaceId> {
        let id = self.registry.instance(name)?;
        if self.backend.is_destroyed(id) {
            tracing::info!(window = %name, surface = id, "hidden instance is gone, recreating");
            self.registry.clear(name);
            return None;
        }
        self.shutdown.cancel_pending_hide(&mut self.scheduler, id);
        self.registry.mark_visible(name);
        if size.has_constraints() {
            self.pending_constraints.insert(id, size.clone());
        }
        guarded(&mut self.backend, id, "show", |b, id| b.show(id));
        tracing::info!(window = %name, surface = id, "reusing hidden instance");
        Some(id)
    }

    fn create(
        &mut self,
        now: Instant,
        name: WindowName,
        size: &SizeOptions,
        overrides: Option<&SurfaceOptions>,
    ) -> Result<SurfaceId> {
        let id = self.allocate_id();
        self.factory.create(&mut self.backend, id, size, overrides)?;
        self.live.insert(id, name);
        self.resize.subscribe(id);

        let target = ContentTarget::for_window(&self.config, name);
        if let Err(e) = self.backend.load_content(id, &target) {
            tracing::warn!(window = %name, surface = id, error = %e, "failed to load content");
        }

        let overlay = self.allocate_id();
        match self.overlays.attach(&mut self.backend, id, overlay, size) {
            Ok(_) => {
                if self.overlays.arm(id) {
                    guarded(&mut self.backend, id, "show", |b, id| b.show(id));
                }
                if let Some(timeout) = self.config.overlay_timeout {
                    self.scheduler
                        .debounce(now, timeout, Task::OverlayTimeout(id));
                }
            }
            Err(e) => {
                tracing::warn!(window = %name, surface = id, error = %e, "no loading overlay, showing directly");
                guarded(&mut self.backend, id, "show", |b, id| b.show(id));
            }
        }

        if size.has_constraints() {
            self.pending_constraints.insert(id, size.clone());
        }
        self.registry.notify_created(name, id);
        self.registry.insert(name, id);
        tracing::info!(window = %name, surface = id, "window created");
        Ok(id)
    }

    // ---- Operations on a surface ----

    /// Close `surface` according to its window's close policy.
    pub fn close_window(&mut self, now: Instant, surface: SurfaceId) -> CloseOutcome {
        self.shutdown.close(
            &mut self.registry,
            &mut self.backend,
            &mut self.scheduler,
            now,
            surface,
        )
    }

    pub fn minimize(&mut self, surface: SurfaceId) -> bool {
        guarded(&mut self.backend, surface, "minimize", |b, id| b.minimize(id))
    }

    /// Maximize, or restore when already maximized.
    pub fn toggle_maximize(&mut self, surface: SurfaceId) -> bool {
        guarded(&mut self.backend, surface, "toggle maximize", |b, id| {
            if b.is_maximized(id) {
                b.unmaximize(id)
            } else {
                b.maximize(id)
            }
        })
    }

    pub fn is_maximized(&self, surface: SurfaceId) -> bool {
        self.backend.is_maximized(surface)
    }

    pub fn window_state(&self, name: WindowName) -> Visibility {
        self.registry.visibility(name)
    }

    pub fn set_minimize_to_tray(&mut self, enabled: bool) {
        self.shutdown.set_minimize_to_tray(enabled);
    }

    // ---- Observers ----

    pub fn register_on_create(&mut self, name: WindowName, observer: Observer) -> Subscription {
        self.registry.register_on_create(name, observer)
    }

    pub fn register_on_close(&mut self, name: WindowName, observer: Observer) -> Subscription {
        self.registry.register_on_close(name, observer)
    }

    pub fn unregister(&mut self, subscription: Subscription) -> bool {
        self.registry.unregister(subscription)
    }

    pub fn unregister_id(&mut self, id: u32) -> bool {
        self.registry.unregister_id(id)
    }

    // ---- Event loop ----

    /// Dispatch native events and run due deferred work until both are
    /// exhausted. Events raised while handling are processed in the same
    /// call, so a destroy cascade completes within one pump.
    pub fn pump(&mut self, now: Instant) {
        loop {
            let events = self.backend.drain_events();
            let tasks = self.scheduler.take_due(now);
            if events.is_empty() && tasks.is_empty() {
                break;
            }
            for event in events {
                self.handle_event(now, event);
            }
            for task in tasks {
                self.run_task(task);
            }
        }
    }

    fn handle_event(&mut self, now: Instant, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Shown(id) => {
                if self.pending_constraints.contains_key(&id) {
                    self.scheduler.debounce(
                        now,
                        self.config.size_constraint_delay,
                        Task::ApplySizeConstraints(id),
                    );
                }
            }
            SurfaceEvent::Resized(id) => self.resize.on_resized(&mut self.scheduler, now, id),
            SurfaceEvent::CloseRequested(id) => {
                self.close_window(now, id);
            }
            SurfaceEvent::Destroyed(id) => self.on_destroyed(id),
            SurfaceEvent::OverlayPainted { host } => {
                if self.overlays.on_overlay_painted(host) && self.is_wanted_on_screen(host) {
                    guarded(&mut self.backend, host, "show", |b, id| b.show(id));
                }
            }
            SurfaceEvent::Message { sender, body } => {
                if body.len() > MAX_MESSAGE_SIZE {
                    tracing::debug!(sender, len = body.len(), "oversized control message dropped");
                    return;
                }
                match ControlRequest::parse(&body) {
                    Ok(request) => self.handle_request(now, sender, request),
                    Err(e) => tracing::debug!(sender, error = %e, "ignoring control message"),
                }
            }
        }
    }

    fn handle_request(&mut self, now: Instant, sender: SurfaceId, request: ControlRequest) {
        tracing::debug!(sender, ?request, "control request");
        match request {
            ControlRequest::CloseWindow => {
                self.close_window(now, sender);
            }
            ControlRequest::MinimizeWindow => {
                self.minimize(sender);
            }
            ControlRequest::MaximizeWindow => {
                self.toggle_maximize(sender);
            }
            ControlRequest::IsWindowMaximized { request_id } => {
                let reply = ipc::maximized_reply(request_id, self.backend.is_maximized(sender));
                guarded(&mut self.backend, sender, "reply isWindowMaximized", |b, id| {
                    b.post_message(id, IS_MAXIMIZED_CHANNEL, reply)
                });
            }
            ControlRequest::ContentReady => {
                if self.overlays.on_content_ready(&mut self.backend, sender) {
                    self.scheduler
                        .cancel_debounced(Task::OverlayTimeout(sender));
                    // ready before the placeholder ever painted
                    if !self.backend.is_visible(sender) && self.is_wanted_on_screen(sender) {
                        guarded(&mut self.backend, sender, "show", |b, id| b.show(id));
                    }
                }
            }
        }
    }

    fn on_destroyed(&mut self, id: SurfaceId) {
        self.overlays.forget(id);
        self.resize.unsubscribe(&mut self.scheduler, id);
        self.scheduler.cancel_for(id);
        self.shutdown.forget(id);
        self.pending_constraints.remove(&id);

        let Some(name) = self.live.remove(&id) else {
            return;
        };
        tracing::info!(window = %name, surface = id, "window destroyed");
        self.registry.notify_closed(name, id);
        self.registry.clear_if(name, id);
        self.shutdown
            .cascade(&mut self.registry, &mut self.backend, &mut self.scheduler);
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::BroadcastMaximize(id) => {
                self.resize.broadcast(&mut self.backend, id);
            }
            Task::FakeCloseHide(id) => {
                self.shutdown
                    .finish_fake_close(&self.registry, &mut self.backend, id);
            }
            Task::ApplySizeConstraints(id) => {
                if let Some(size) = self.pending_constraints.remove(&id) {
                    guarded(&mut self.backend, id, "apply size constraints", |b, id| {
                        b.set_size_constraints(id, &size)
                    });
                }
            }
            Task::OverlayTimeout(id) => {
                if self.overlays.force_release(&mut self.backend, id) {
                    tracing::warn!(surface = id, "content never reported ready, showing anyway");
                    if self.is_wanted_on_screen(id) {
                        guarded(&mut self.backend, id, "show", |b, id| b.show(id));
                    }
                }
            }
        }
    }

    /// The surface is the registered instance of a window marked visible.
    fn is_wanted_on_screen(&self, id: SurfaceId) -> bool {
        self.live
            .get(&id)
            .is_some_and(|name| self.registry.get(*name) == Some(id))
    }
}
