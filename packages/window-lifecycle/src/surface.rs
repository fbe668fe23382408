use serde_json::Value;

use crate::content::ContentTarget;
use crate::error::{Error, Result};
use crate::options::{SizeOptions, SurfaceOptions};

/// Identity of a native surface. Allocated by the controller, never reused.
pub type SurfaceId = u32;

/// Notifications raised by the native layer, drained once per pump.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// The surface became visible.
    Shown(SurfaceId),
    Resized(SurfaceId),
    /// The user asked the OS to close the surface (title bar, Alt-F4).
    CloseRequested(SurfaceId),
    /// Native resources are gone. Raised exactly once per surface.
    Destroyed(SurfaceId),
    /// The loading placeholder stacked on `host` finished its first paint.
    OverlayPainted { host: SurfaceId },
    /// A control-channel message posted by the hosted content.
    Message { sender: SurfaceId, body: String },
}

/// Placeholder stacked over a freshly created surface.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySpec {
    pub width: f64,
    pub height: f64,
    pub html: &'static str,
    /// Applied to the placeholder once its document can be styled.
    pub background_color: String,
}

/// Schemes hosted content may never navigate to inside a sandboxed surface.
const BLOCKED_SCHEMES: [&str; 3] = ["javascript:", "data:", "blob:"];

/// What a backend enforces for one surface, resolved from its options.
///
/// Hosted content never gets host APIs beyond the lifecycle bridge, so a
/// request for node integration is refused rather than ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfacePolicy {
    /// Mapped at creation. Zero opacity keeps the surface off screen until
    /// the first `show`, which brings it up fully opaque.
    pub initially_visible: bool,
    /// Install the bridge as a frozen, non-writable global.
    pub isolated_bridge: bool,
    /// Block script, data and blob navigations.
    pub sandboxed: bool,
    pub background_throttling: bool,
}

impl SurfacePolicy {
    pub fn resolve(options: &SurfaceOptions) -> Result<Self> {
        if options.node_integration == Some(true) {
            return Err(Error::Config(
                "node integration is not available to hosted content".into(),
            ));
        }
        if let Some(opacity) = options.opacity {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(Error::Config(format!("opacity {} is outside 0..=1", opacity)));
            }
        }
        Ok(Self {
            initially_visible: options.visible.unwrap_or(true)
                && options.opacity.map_or(true, |o| o > 0.0),
            isolated_bridge: options.context_isolation.unwrap_or(true),
            sandboxed: options.sandbox.unwrap_or(true),
            background_throttling: options.background_throttling.unwrap_or(true),
        })
    }

    pub fn allows_navigation(&self, url: &str) -> bool {
        if !self.sandboxed {
            return true;
        }
        let lower = url.trim_start().to_ascii_lowercase();
        !BLOCKED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
    }
}

/// The native seam: everything the orchestrator does to a real window.
///
/// Queries on an unknown or destroyed surface answer "destroyed", "not
/// visible", "not maximized". Mutations on one return
/// [`Error::SurfaceDestroyed`](crate::error::Error::SurfaceDestroyed) or
/// [`Error::UnknownSurface`](crate::error::Error::UnknownSurface).
pub trait Backend {
    /// Create a native surface enforcing [`SurfacePolicy::resolve`] of
    /// `options`. Must not show it unless the policy is initially visible.
    fn create_surface(&mut self, id: SurfaceId, options: &SurfaceOptions) -> Result<()>;
    fn load_content(&mut self, id: SurfaceId, target: &ContentTarget) -> Result<()>;

    /// Show the surface. Raises [`SurfaceEvent::Shown`].
    fn show(&mut self, id: SurfaceId) -> Result<()>;
    fn hide(&mut self, id: SurfaceId) -> Result<()>;
    /// Ask the surface to close. Raises [`SurfaceEvent::Destroyed`].
    fn close(&mut self, id: SurfaceId) -> Result<()>;
    /// Tear the surface down unconditionally. Raises [`SurfaceEvent::Destroyed`].
    fn destroy(&mut self, id: SurfaceId) -> Result<()>;
    fn minimize(&mut self, id: SurfaceId) -> Result<()>;
    fn maximize(&mut self, id: SurfaceId) -> Result<()>;
    fn unmaximize(&mut self, id: SurfaceId) -> Result<()>;
    /// Apply the min/max fields of `size`; width/height are ignored.
    fn set_size_constraints(&mut self, id: SurfaceId, size: &SizeOptions) -> Result<()>;

    /// Push `payload` to the hosted content on `channel`.
    fn post_message(&mut self, id: SurfaceId, channel: &str, payload: Value) -> Result<()>;

    fn attach_overlay(&mut self, host: SurfaceId, overlay: SurfaceId, spec: &OverlaySpec)
        -> Result<()>;
    fn detach_overlay(&mut self, host: SurfaceId, overlay: SurfaceId) -> Result<()>;

    fn is_destroyed(&self, id: SurfaceId) -> bool;
    fn is_visible(&self, id: SurfaceId) -> bool;
    fn is_minimized(&self, id: SurfaceId) -> bool;
    fn is_maximized(&self, id: SurfaceId) -> bool;

    /// Take every event raised since the last call.
    fn drain_events(&mut self) -> Vec<SurfaceEvent>;
}

/// Run a mutating call after a liveness check.
///
/// A surface that is already gone is logged at info and skipped; other
/// failures are logged as warnings. Returns whether the call went through.
pub fn guarded<B, F>(backend: &mut B, id: SurfaceId, action: &str, f: F) -> bool
where
    B: Backend + ?Sized,
    F: FnOnce(&mut B, SurfaceId) -> Result<()>,
{
    if backend.is_destroyed(id) {
        tracing::info!(surface = id, action, "skipped, surface already destroyed");
        return false;
    }
    match f(backend, id) {
        Ok(()) => true,
        Err(e) if e.is_gone() => {
            tracing::info!(surface = id, action, "surface went away mid-call");
            false
        }
        Err(e) => {
            tracing::warn!(surface = id, action, error = %e, "native call failed");
            false
        }
    }
}
