//! Loading placeholder handoff.
//!
//! A freshly created surface starts invisible with a placeholder stacked on
//! top. The host is shown once the placeholder has painted, and the
//! placeholder is removed on the first `contentReady` from the host.

use std::collections::HashMap;

use crate::error::Result;
use crate::options::SizeOptions;
use crate::surface::{guarded, Backend, OverlaySpec, SurfaceId};

/// Static placeholder document. It reports its first paint over the IPC
/// bridge; the background is applied by an init script once the document
/// can be styled.
pub const LOADING_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  html, body { margin: 0; height: 100%; overflow: hidden; }
  body { display: flex; align-items: center; justify-content: center; }
  .spinner {
    width: 28px; height: 28px; border-radius: 50%;
    border: 3px solid rgba(128, 128, 128, 0.25);
    border-top-color: #BB5BE7;
    animation: spin 0.8s linear infinite;
  }
  @keyframes spin { to { transform: rotate(360deg); } }
</style>
</head>
<body>
<div class="spinner"></div>
<script>
  requestAnimationFrame(function () {
    requestAnimationFrame(function () {
      window.ipc.postMessage('{"type":"overlayPainted"}');
    });
  });
</script>
</body>
</html>"#;

/// Handoff state for one host surface.
#[derive(Debug)]
struct OverlayRecord {
    overlay: SurfaceId,
    /// Set by the first valid `contentReady`; later signals are ignored.
    handled: bool,
    painted: bool,
    /// The caller asked to show the host once the overlay has painted.
    show_armed: bool,
}

/// Handle returned by [`LoadingOverlayManager::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayHandle {
    pub host: SurfaceId,
    pub overlay: SurfaceId,
}

pub struct LoadingOverlayManager {
    records: HashMap<SurfaceId, OverlayRecord>,
    background_color: String,
}

impl LoadingOverlayManager {
    pub fn new(background_color: impl Into<String>) -> Self {
        Self {
            records: HashMap::new(),
            background_color: background_color.into(),
        }
    }

    /// Stack a placeholder sized to `size` over `host`.
    pub fn attach<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        host: SurfaceId,
        overlay: SurfaceId,
        size: &SizeOptions,
    ) -> Result<OverlayHandle> {
        let spec = OverlaySpec {
            width: size.width,
            height: size.height,
            html: LOADING_HTML,
            background_color: self.background_color.clone(),
        };
        backend.attach_overlay(host, overlay, &spec)?;
        self.records.insert(
            host,
            OverlayRecord {
                overlay,
                handled: false,
                painted: false,
                show_armed: false,
            },
        );
        tracing::debug!(host, overlay, "loading overlay attached");
        Ok(OverlayHandle { host, overlay })
    }

    /// Ask for the host to be shown once the placeholder has painted.
    /// Returns true when that already happened and the caller should show
    /// the host right away.
    pub fn arm(&mut self, host: SurfaceId) -> bool {
        match self.records.get_mut(&host) {
            Some(record) if record.painted => true,
            Some(record) => {
                record.show_armed = true;
                false
            }
            None => true,
        }
    }

    /// The placeholder on `host` painted. Returns true when the host should
    /// be shown now.
    pub fn on_overlay_painted(&mut self, host: SurfaceId) -> bool {
        match self.records.get_mut(&host) {
            Some(record) if !record.painted => {
                record.painted = true;
                let show = record.show_armed;
                record.show_armed = false;
                show
            }
            _ => false,
        }
    }

    /// `contentReady` received from `sender`. Removes the placeholder on the
    /// first valid signal; duplicates and unknown senders are ignored.
    /// Returns true if a placeholder was removed.
    pub fn on_content_ready<B: Backend + ?Sized>(&mut self, backend: &mut B, sender: SurfaceId) -> bool {
        let Some(record) = self.records.get_mut(&sender) else {
            tracing::debug!(sender, "contentReady from a surface without overlay, ignored");
            return false;
        };
        if record.handled {
            tracing::debug!(sender, "duplicate contentReady ignored");
            return false;
        }
        record.handled = true;
        let overlay = record.overlay;
        guarded(backend, sender, "detach overlay", |b, host| {
            b.detach_overlay(host, overlay)
        });
        tracing::info!(host = sender, "content ready, loading overlay removed");
        true
    }

    /// Discard the placeholder without a readiness signal. Returns true if
    /// the host still had one and should now be shown.
    pub fn force_release<B: Backend + ?Sized>(&mut self, backend: &mut B, host: SurfaceId) -> bool {
        match self.records.get_mut(&host) {
            Some(record) if !record.handled => {
                record.handled = true;
                record.show_armed = false;
                let overlay = record.overlay;
                guarded(backend, host, "detach overlay", |b, host| {
                    b.detach_overlay(host, overlay)
                });
                true
            }
            _ => false,
        }
    }

    /// Drop all state for a destroyed host.
    pub fn forget(&mut self, host: SurfaceId) -> bool {
        self.records.remove(&host).is_some()
    }

    /// True while `host` still waits for its content.
    pub fn is_pending(&self, host: SurfaceId) -> bool {
        self.records.get(&host).is_some_and(|r| !r.handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SurfaceOptions;
    use crate::testing::FakeBackend;

    fn setup() -> (LoadingOverlayManager, FakeBackend) {
        let mut backend = FakeBackend::default();
        backend.create_surface(1, &SurfaceOptions::default()).unwrap();
        backend.create_surface(2, &SurfaceOptions::default()).unwrap();
        (LoadingOverlayManager::new("#2C2C2C"), backend)
    }

    #[test]
    fn overlay_is_sized_and_themed() {
        let (mut overlays, mut backend) = setup();
        let handle = overlays
            .attach(&mut backend, 1, 10, &SizeOptions::new(1024.0, 768.0))
            .unwrap();
        assert_eq!(handle, OverlayHandle { host: 1, overlay: 10 });

        let (overlay, spec) = backend.surface(1).unwrap().overlay.clone().unwrap();
        assert_eq!(overlay, 10);
        assert_eq!((spec.width, spec.height), (1024.0, 768.0));
        assert_eq!(spec.background_color, "#2C2C2C");
        assert!(overlays.is_pending(1));
    }

    #[test]
    fn arm_waits_for_first_paint() {
        let (mut overlays, mut backend) = setup();
        overlays
            .attach(&mut backend, 1, 10, &SizeOptions::new(800.0, 600.0))
            .unwrap();
        assert!(!overlays.arm(1));
        assert!(overlays.on_overlay_painted(1));
        // a second paint notification does not show again
        assert!(!overlays.on_overlay_painted(1));
    }

    #[test]
    fn paint_before_arm_shows_on_arm() {
        let (mut overlays, mut backend) = setup();
        overlays
            .attach(&mut backend, 1, 10, &SizeOptions::new(800.0, 600.0))
            .unwrap();
        assert!(!overlays.on_overlay_painted(1));
        assert!(overlays.arm(1));
    }

    #[test]
    fn first_ready_signal_wins() {
        let (mut overlays, mut backend) = setup();
        overlays
            .attach(&mut backend, 1, 10, &SizeOptions::new(800.0, 600.0))
            .unwrap();

        assert!(overlays.on_content_ready(&mut backend, 1));
        assert!(!overlays.on_content_ready(&mut backend, 1));
        assert_eq!(backend.detached_overlays, vec![(1, 10)]);
        assert!(!overlays.is_pending(1));
    }

    #[test]
    fn ready_from_another_surface_is_ignored() {
        let (mut overlays, mut backend) = setup();
        overlays
            .attach(&mut backend, 1, 10, &SizeOptions::new(800.0, 600.0))
            .unwrap();
        assert!(!overlays.on_content_ready(&mut backend, 2));
        assert!(overlays.is_pending(1));
        assert!(backend.detached_overlays.is_empty());
    }

    #[test]
    fn ready_after_host_destroyed_is_ignored() {
        let (mut overlays, mut backend) = setup();
        overlays
            .attach(&mut backend, 1, 10, &SizeOptions::new(800.0, 600.0))
            .unwrap();
        backend.destroy(1).unwrap();
        assert!(overlays.forget(1));
        assert!(!overlays.on_content_ready(&mut backend, 1));
    }

    #[test]
    fn force_release_only_once_and_not_after_ready() {
        let (mut overlays, mut backend) = setup();
        overlays
            .attach(&mut backend, 1, 10, &SizeOptions::new(800.0, 600.0))
            .unwrap();
        overlays
            .attach(&mut backend, 2, 20, &SizeOptions::new(800.0, 600.0))
            .unwrap();

        assert!(overlays.force_release(&mut backend, 1));
        assert!(!overlays.force_release(&mut backend, 1));
        // late ready signal after a forced release is stale
        assert!(!overlays.on_content_ready(&mut backend, 1));

        assert!(overlays.on_content_ready(&mut backend, 2));
        assert!(!overlays.force_release(&mut backend, 2));
        assert_eq!(backend.detached_overlays, vec![(1, 10), (2, 20)]);
    }
}
