//! In-memory backend for unit tests.
//!
//! Records every native call and raises the same events a real backend
//! would, synchronously, so tests can drive the controller with `pump`.

use std::collections::HashMap;

use serde_json::Value;

use crate::content::ContentTarget;
use crate::error::{Error, Result};
use crate::options::{SizeOptions, SurfaceOptions};
use crate::surface::{Backend, OverlaySpec, SurfaceEvent, SurfaceId, SurfacePolicy};

#[derive(Debug, Clone)]
pub struct FakeSurface {
    pub options: SurfaceOptions,
    pub policy: SurfacePolicy,
    pub visible: bool,
    pub minimized: bool,
    pub maximized: bool,
    pub destroyed: bool,
    pub content: Option<ContentTarget>,
    pub constraints: Vec<SizeOptions>,
    pub overlay: Option<(SurfaceId, OverlaySpec)>,
    pub messages: Vec<(String, Value)>,
    pub show_calls: u32,
    pub hide_calls: u32,
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    surfaces: HashMap<SurfaceId, FakeSurface>,
    events: Vec<SurfaceEvent>,
    /// Surface ids in creation order.
    pub created: Vec<SurfaceId>,
    pub attached_overlays: Vec<(SurfaceId, SurfaceId)>,
    pub detached_overlays: Vec<(SurfaceId, SurfaceId)>,
    /// Makes the next `create_surface` fail.
    pub fail_next_create: bool,
}

impl FakeBackend {
    pub fn surface(&self, id: SurfaceId) -> Option<&FakeSurface> {
        self.surfaces.get(&id)
    }

    /// Queue an event as if the native layer raised it.
    pub fn push_event(&mut self, event: SurfaceEvent) {
        self.events.push(event);
    }

    /// Queue a control message posted by the content of `sender`.
    pub fn post_from_content(&mut self, sender: SurfaceId, body: &str) {
        self.events.push(SurfaceEvent::Message {
            sender,
            body: body.to_string(),
        });
    }

    fn live(&mut self, id: SurfaceId) -> Result<&mut FakeSurface> {
        match self.surfaces.get_mut(&id) {
            None => Err(Error::UnknownSurface(id)),
            Some(s) if s.destroyed => Err(Error::SurfaceDestroyed(id)),
            Some(s) => Ok(s),
        }
    }

    fn teardown(&mut self, id: SurfaceId) -> Result<()> {
        let surface = self.live(id)?;
        surface.destroyed = true;
        surface.visible = false;
        surface.overlay = None;
        self.events.push(SurfaceEvent::Destroyed(id));
        Ok(())
    }
}

impl Backend for FakeBackend {
    fn create_surface(&mut self, id: SurfaceId, options: &SurfaceOptions) -> Result<()> {
        if std::mem::take(&mut self.fail_next_create) {
            return Err(Error::Backend("window creation failed".into()));
        }
        if self.surfaces.contains_key(&id) {
            return Err(Error::Backend(format!("surface {} already exists", id)));
        }
        let policy = SurfacePolicy::resolve(options)?;
        self.surfaces.insert(
            id,
            FakeSurface {
                options: options.clone(),
                policy,
                visible: policy.initially_visible,
                minimized: false,
                maximized: false,
                destroyed: false,
                content: None,
                constraints: Vec::new(),
                overlay: None,
                messages: Vec::new(),
                show_calls: 0,
                hide_calls: 0,
            },
        );
        self.created.push(id);
        Ok(())
    }

    fn load_content(&mut self, id: SurfaceId, target: &ContentTarget) -> Result<()> {
        self.live(id)?.content = Some(target.clone());
        Ok(())
    }

    fn show(&mut self, id: SurfaceId) -> Result<()> {
        let surface = self.live(id)?;
        surface.visible = true;
        surface.minimized = false;
        surface.show_calls += 1;
        self.events.push(SurfaceEvent::Shown(id));
        Ok(())
    }

    fn hide(&mut self, id: SurfaceId) -> Result<()> {
        let surface = self.live(id)?;
        surface.visible = false;
        surface.hide_calls += 1;
        Ok(())
    }

    fn close(&mut self, id: SurfaceId) -> Result<()> {
        self.teardown(id)
    }

    fn destroy(&mut self, id: SurfaceId) -> Result<()> {
        self.teardown(id)
    }

    fn minimize(&mut self, id: SurfaceId) -> Result<()> {
        self.live(id)?.minimized = true;
        Ok(())
    }

    fn maximize(&mut self, id: SurfaceId) -> Result<()> {
        self.live(id)?.maximized = true;
        self.events.push(SurfaceEvent::Resized(id));
        Ok(())
    }

    fn unmaximize(&mut self, id: SurfaceId) -> Result<()> {
        self.live(id)?.maximized = false;
        self.events.push(SurfaceEvent::Resized(id));
        Ok(())
    }

    fn set_size_constraints(&mut self, id: SurfaceId, size: &SizeOptions) -> Result<()> {
        self.live(id)?.constraints.push(size.clone());
        Ok(())
    }

    fn post_message(&mut self, id: SurfaceId, channel: &str, payload: Value) -> Result<()> {
        self.live(id)?.messages.push((channel.to_string(), payload));
        Ok(())
    }

    fn attach_overlay(&mut self, host: SurfaceId, overlay: SurfaceId, spec: &OverlaySpec) -> Result<()> {
        self.live(host)?.overlay = Some((overlay, spec.clone()));
        self.attached_overlays.push((host, overlay));
        Ok(())
    }

    fn detach_overlay(&mut self, host: SurfaceId, overlay: SurfaceId) -> Result<()> {
        let surface = self.live(host)?;
        if surface.overlay.as_ref().map(|(id, _)| *id) == Some(overlay) {
            surface.overlay = None;
        }
        self.detached_overlays.push((host, overlay));
        Ok(())
    }

    fn is_destroyed(&self, id: SurfaceId) -> bool {
        self.surfaces.get(&id).map_or(true, |s| s.destroyed)
    }

    fn is_visible(&self, id: SurfaceId) -> bool {
        self.surfaces
            .get(&id)
            .is_some_and(|s| !s.destroyed && s.visible)
    }

    fn is_minimized(&self, id: SurfaceId) -> bool {
        self.surfaces
            .get(&id)
            .is_some_and(|s| !s.destroyed && s.minimized)
    }

    fn is_maximized(&self, id: SurfaceId) -> bool {
        self.surfaces
            .get(&id)
            .is_some_and(|s| !s.destroyed && s.maximized)
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }
}
