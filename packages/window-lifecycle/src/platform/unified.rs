//! Native backend on tao (windowing) and wry (webview).
//!
//! Every window hosts one content webview filling the window, and while it
//! loads, an overlay webview stacked on top as a child. Native callbacks
//! run inside `run_return` or inside wry handlers, so they only record
//! [`SurfaceEvent`]s into a thread-local buffer that `drain_events` empties.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;
use tao::dpi::{LogicalPosition, LogicalSize};
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop};
use tao::platform::run_return::EventLoopExtRunReturn;
use tao::window::{Theme, Window, WindowBuilder};
use wry::{BackgroundThrottlingPolicy, WebView, WebViewBuilder};

use crate::content::ContentTarget;
use crate::error::{Error, Result};
use crate::ipc::{self, OverlaySignal, MAX_MESSAGE_SIZE};
use crate::options::{SizeOptions, SurfaceOptions};
use crate::surface::{Backend, OverlaySpec, SurfaceEvent, SurfaceId, SurfacePolicy};

/// Events buffered between two drains before new ones are dropped.
const MAX_PENDING_EVENTS: usize = 10_000;

thread_local! {
    static PENDING_EVENTS: RefCell<Vec<SurfaceEvent>> = const { RefCell::new(Vec::new()) };
}

/// Record an event raised from a native callback, dropping it (with a
/// single warning) once the buffer is full.
macro_rules! capped_push {
    ($event:expr) => {
        PENDING_EVENTS.with(|p| {
            let mut buf = p.borrow_mut();
            if buf.len() >= MAX_PENDING_EVENTS {
                if buf.len() == MAX_PENDING_EVENTS {
                    tracing::warn!(limit = MAX_PENDING_EVENTS, "event buffer full, dropping events");
                }
                return;
            }
            buf.push($event);
        })
    };
}

/// Bridge object installed in every content webview. Pushes from the
/// orchestrator arrive as `window-lifecycle` DOM events carrying the envelope.
const BRIDGE_OBJECT: &str = r#"{
    receive: function (envelope) {
      window.dispatchEvent(new CustomEvent("window-lifecycle", { detail: envelope }));
    },
    send: function (message) {
      window.ipc.postMessage(JSON.stringify(message));
    },
  }"#;

/// Isolated surfaces get a frozen bridge that page scripts cannot replace.
fn bridge_script(isolated: bool) -> String {
    if isolated {
        format!(
            "(function () {{\n  Object.defineProperty(window, \"__windowLifecycle\", {{\n    value: Object.freeze({}),\n  }});\n}})();",
            BRIDGE_OBJECT
        )
    } else {
        format!("window.__windowLifecycle = {};", BRIDGE_OBJECT)
    }
}

fn backend_err(what: &str, e: impl std::fmt::Display) -> Error {
    Error::Backend(format!("{}: {}", what, e))
}

/// `#RRGGBB` to an opaque RGBA tuple.
fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?, 255))
}

/// Load a window icon from a PNG or ICO file. macOS has no per-window icons.
#[cfg(not(target_os = "macos"))]
fn load_icon(path: &str) -> Result<tao::window::Icon> {
    let rgba = image::open(path)
        .map_err(|e| Error::Config(format!("icon '{}': {}", path, e)))?
        .into_rgba8();
    let (width, height) = rgba.dimensions();
    tao::window::Icon::from_rgba(rgba.into_raw(), width, height)
        .map_err(|e| Error::Config(format!("icon '{}': {}", path, e)))
}

struct WindowEntry {
    window: Window,
    webview: WebView,
    overlay: Option<(SurfaceId, WebView)>,
}

pub struct Platform {
    /// Taken out while `run_return` dispatches.
    event_loop: Option<EventLoop<()>>,
    windows: HashMap<SurfaceId, WindowEntry>,
    window_ids: HashMap<tao::window::WindowId, SurfaceId>,
    /// Highest id ever created. Ids are allocated upward and never reused,
    /// so a missing id at or below it belonged to a dropped surface.
    high_water: SurfaceId,
}

impl Platform {
    pub fn new() -> Result<Self> {
        Ok(Self {
            event_loop: Some(EventLoop::new()),
            windows: HashMap::new(),
            window_ids: HashMap::new(),
            high_water: 0,
        })
    }

    fn missing(&self, id: SurfaceId) -> Error {
        if id <= self.high_water {
            Error::SurfaceDestroyed(id)
        } else {
            Error::UnknownSurface(id)
        }
    }

    fn entry(&self, id: SurfaceId) -> Result<&WindowEntry> {
        self.windows.get(&id).ok_or_else(|| self.missing(id))
    }

    fn entry_mut(&mut self, id: SurfaceId) -> Result<&mut WindowEntry> {
        if !self.windows.contains_key(&id) {
            return Err(self.missing(id));
        }
        self.windows
            .get_mut(&id)
            .ok_or(Error::UnknownSurface(id))
    }

    /// Drop the native window and both webviews, then report `Destroyed`.
    fn retire(&mut self, id: SurfaceId) -> Result<()> {
        let Some(entry) = self.windows.remove(&id) else {
            return Err(self.missing(id));
        };
        self.window_ids.remove(&entry.window.id());
        drop(entry);
        capped_push!(SurfaceEvent::Destroyed(id));
        Ok(())
    }

    fn build_window(&self, options: &SurfaceOptions, policy: SurfacePolicy) -> Result<Window> {
        let event_loop = self
            .event_loop
            .as_ref()
            .ok_or_else(|| Error::Backend("event loop is being pumped".into()))?;

        let mut builder = WindowBuilder::new()
            .with_title(options.title.as_deref().unwrap_or(""))
            .with_inner_size(LogicalSize::new(
                options.width.unwrap_or(800.0),
                options.height.unwrap_or(600.0),
            ))
            .with_resizable(options.resizable.unwrap_or(true))
            .with_decorations(options.decorations.unwrap_or(true))
            .with_always_on_top(options.always_on_top.unwrap_or(false))
            .with_transparent(options.transparent.unwrap_or(false))
            .with_visible(policy.initially_visible);
        if let (Some(x), Some(y)) = (options.x, options.y) {
            builder = builder.with_position(LogicalPosition::new(x, y));
        }
        if let Some(dark) = options.dark_theme {
            builder = builder.with_theme(Some(if dark { Theme::Dark } else { Theme::Light }));
        }

        let window = builder
            .build(event_loop)
            .map_err(|e| backend_err("failed to create window", e))?;

        #[cfg(not(target_os = "macos"))]
        if let Some(ref path) = options.icon {
            match load_icon(path) {
                Ok(icon) => window.set_window_icon(Some(icon)),
                Err(e) => tracing::warn!(error = %e, "window icon not applied"),
            }
        }
        Ok(window)
    }

    fn build_content_webview(
        &self,
        id: SurfaceId,
        window: &Window,
        options: &SurfaceOptions,
        policy: SurfacePolicy,
    ) -> Result<WebView> {
        let throttling = if policy.background_throttling {
            BackgroundThrottlingPolicy::Suspend
        } else {
            BackgroundThrottlingPolicy::Disabled
        };
        let mut builder = WebViewBuilder::new()
            .with_devtools(options.devtools.unwrap_or(false))
            .with_transparent(options.transparent.unwrap_or(false))
            .with_background_throttling(throttling)
            .with_initialization_script(&bridge_script(policy.isolated_bridge))
            .with_ipc_handler(move |req: http::Request<String>| {
                let body = req.into_body();
                if body.len() > MAX_MESSAGE_SIZE {
                    tracing::debug!(surface = id, len = body.len(), "oversized ipc message dropped");
                    return;
                }
                capped_push!(SurfaceEvent::Message { sender: id, body });
            })
            .with_navigation_handler(move |url: String| {
                let allowed = policy.allows_navigation(&url);
                if !allowed {
                    tracing::debug!(surface = id, %url, "navigation blocked");
                }
                allowed
            })
            .with_new_window_req_handler(|_url, _features| wry::NewWindowResponse::Deny);
        if let Some(color) = options.background_color.as_deref().and_then(parse_hex_color) {
            builder = builder.with_background_color(color);
        }

        #[cfg(target_os = "linux")]
        let webview = {
            use tao::platform::unix::WindowExtUnix;
            use wry::WebViewBuilderExtUnix;
            builder.build_gtk(window.gtk_window())
        };
        #[cfg(not(target_os = "linux"))]
        let webview = builder.build(window);

        webview.map_err(|e| backend_err("failed to create webview", e))
    }

    /// Pump the tao event loop without blocking and record the window
    /// events the orchestrator cares about.
    pub fn pump_events(&mut self) {
        if let Some(mut event_loop) = self.event_loop.take() {
            let window_ids = &self.window_ids;
            event_loop.run_return(|event, _target, control_flow| {
                *control_flow = ControlFlow::Poll;
                match event {
                    Event::WindowEvent {
                        window_id, event, ..
                    } => {
                        let Some(&id) = window_ids.get(&window_id) else {
                            return;
                        };
                        match event {
                            WindowEvent::Resized(_) => capped_push!(SurfaceEvent::Resized(id)),
                            WindowEvent::CloseRequested => {
                                capped_push!(SurfaceEvent::CloseRequested(id))
                            }
                            _ => {}
                        }
                    }
                    Event::MainEventsCleared => *control_flow = ControlFlow::Exit,
                    _ => {}
                }
            });
            self.event_loop = Some(event_loop);
        }

        #[cfg(target_os = "macos")]
        drain_macos_events();
    }
}

impl Backend for Platform {
    fn create_surface(&mut self, id: SurfaceId, options: &SurfaceOptions) -> Result<()> {
        if id <= self.high_water {
            return Err(Error::Backend(format!("surface {} already exists", id)));
        }
        let policy = SurfacePolicy::resolve(options)?;
        let window = self.build_window(options, policy)?;
        let webview = self.build_content_webview(id, &window, options, policy)?;
        self.high_water = id;
        self.window_ids.insert(window.id(), id);
        self.windows.insert(
            id,
            WindowEntry {
                window,
                webview,
                overlay: None,
            },
        );
        Ok(())
    }

    fn load_content(&mut self, id: SurfaceId, target: &ContentTarget) -> Result<()> {
        let url = target.to_url()?;
        self.entry(id)?
            .webview
            .load_url(&url)
            .map_err(|e| backend_err("load_url failed", e))
    }

    fn show(&mut self, id: SurfaceId) -> Result<()> {
        self.entry(id)?.window.set_visible(true);
        capped_push!(SurfaceEvent::Shown(id));
        Ok(())
    }

    fn hide(&mut self, id: SurfaceId) -> Result<()> {
        self.entry(id)?.window.set_visible(false);
        Ok(())
    }

    fn close(&mut self, id: SurfaceId) -> Result<()> {
        self.retire(id)
    }

    fn destroy(&mut self, id: SurfaceId) -> Result<()> {
        self.retire(id)
    }

    fn minimize(&mut self, id: SurfaceId) -> Result<()> {
        self.entry(id)?.window.set_minimized(true);
        Ok(())
    }

    fn maximize(&mut self, id: SurfaceId) -> Result<()> {
        self.entry(id)?.window.set_maximized(true);
        Ok(())
    }

    fn unmaximize(&mut self, id: SurfaceId) -> Result<()> {
        self.entry(id)?.window.set_maximized(false);
        Ok(())
    }

    fn set_size_constraints(&mut self, id: SurfaceId, size: &SizeOptions) -> Result<()> {
        let window = &self.entry(id)?.window;
        if let (Some(w), Some(h)) = (size.min_width, size.min_height) {
            window.set_min_inner_size(Some(LogicalSize::new(w, h)));
        }
        if let (Some(w), Some(h)) = (size.max_width, size.max_height) {
            window.set_max_inner_size(Some(LogicalSize::new(w, h)));
        }
        Ok(())
    }

    fn post_message(&mut self, id: SurfaceId, channel: &str, payload: Value) -> Result<()> {
        let envelope = ipc::envelope(channel, &payload)?;
        self.entry(id)?
            .webview
            .evaluate_script(&format!(
                "window.__windowLifecycle && window.__windowLifecycle.receive({});",
                envelope
            ))
            .map_err(|e| backend_err("evaluate_script failed", e))
    }

    fn attach_overlay(&mut self, host: SurfaceId, overlay: SurfaceId, spec: &OverlaySpec) -> Result<()> {
        let entry = self.entry_mut(host)?;
        let bounds = wry::Rect {
            position: wry::dpi::LogicalPosition::new(0.0, 0.0).into(),
            size: wry::dpi::LogicalSize::new(spec.width, spec.height).into(),
        };
        // the placeholder is styled once its own document exists
        let style_script = format!(
            "document.addEventListener('DOMContentLoaded', function () {{ document.body.style.background = {}; }}, {{ once: true }});",
            serde_json::to_string(&spec.background_color)?
        );

        let mut builder = WebViewBuilder::new()
            .with_bounds(bounds)
            .with_html(spec.html)
            .with_initialization_script(&style_script)
            .with_ipc_handler(move |req: http::Request<String>| {
                match OverlaySignal::parse(req.body()) {
                    Ok(OverlaySignal::OverlayPainted) => {
                        capped_push!(SurfaceEvent::OverlayPainted { host })
                    }
                    Err(e) => tracing::debug!(surface = host, error = %e, "ignoring overlay message"),
                }
            })
            // hidden windows may never run animation frames
            .with_on_page_load_handler(move |event, _url| {
                if matches!(event, wry::PageLoadEvent::Finished) {
                    capped_push!(SurfaceEvent::OverlayPainted { host });
                }
            })
            .with_new_window_req_handler(|_url, _features| wry::NewWindowResponse::Deny);
        if let Some(color) = parse_hex_color(&spec.background_color) {
            builder = builder.with_background_color(color);
        }

        let webview = builder
            .build_as_child(&entry.window)
            .map_err(|e| backend_err("failed to create loading overlay", e))?;
        entry.overlay = Some((overlay, webview));
        Ok(())
    }

    fn detach_overlay(&mut self, host: SurfaceId, overlay: SurfaceId) -> Result<()> {
        let entry = self.entry_mut(host)?;
        if entry.overlay.as_ref().is_some_and(|(id, _)| *id == overlay) {
            // dropping the child webview removes it from the window
            entry.overlay = None;
        }
        Ok(())
    }

    fn is_destroyed(&self, id: SurfaceId) -> bool {
        !self.windows.contains_key(&id)
    }

    fn is_visible(&self, id: SurfaceId) -> bool {
        self.windows.get(&id).is_some_and(|e| e.window.is_visible())
    }

    fn is_minimized(&self, id: SurfaceId) -> bool {
        self.windows.get(&id).is_some_and(|e| e.window.is_minimized())
    }

    fn is_maximized(&self, id: SurfaceId) -> bool {
        self.windows.get(&id).is_some_and(|e| e.window.is_maximized())
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        PENDING_EVENTS.with(|p| std::mem::take(&mut *p.borrow_mut()))
    }
}

/// Run the AppKit event queue and CFRunLoop sources dry after
/// `run_return`. WebKit schedules its loading and painting work on both;
/// a single tao iteration leaves most of it for the next pump.
#[cfg(target_os = "macos")]
fn drain_macos_events() {
    use objc2_app_kit::{NSApplication, NSEventMask};
    use objc2_foundation::{MainThreadMarker, NSDate, NSDefaultRunLoopMode};

    extern "C" {
        static kCFRunLoopDefaultMode: *const std::ffi::c_void;
        fn CFRunLoopRunInMode(
            mode: *const std::ffi::c_void,
            seconds: f64,
            return_after_source_handled: u8,
        ) -> i32;
    }
    const RUN_HANDLED_SOURCE: i32 = 4;

    let Some(mtm) = MainThreadMarker::new() else {
        tracing::warn!("event drain requested off the main thread, skipped");
        return;
    };
    let app = NSApplication::sharedApplication(mtm);
    loop {
        let mut busy = false;
        unsafe {
            while let Some(event) = app.nextEventMatchingMask_untilDate_inMode_dequeue(
                NSEventMask::Any,
                Some(&NSDate::distantPast()),
                NSDefaultRunLoopMode,
                true,
            ) {
                app.sendEvent(&event);
                busy = true;
            }
            if CFRunLoopRunInMode(kCFRunLoopDefaultMode, 0.0, 1) == RUN_HANDLED_SOURCE {
                busy = true;
            }
        }
        if !busy {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{bridge_script, parse_hex_color};

    #[test]
    fn isolated_bridge_is_frozen() {
        let isolated = bridge_script(true);
        assert!(isolated.contains("Object.freeze"));
        assert!(isolated.contains("defineProperty"));
        let open = bridge_script(false);
        assert!(open.starts_with("window.__windowLifecycle = {"));
        assert!(!open.contains("Object.freeze"));
    }

    #[test]
    fn parses_theme_colors() {
        assert_eq!(parse_hex_color("#2C2C2C"), Some((0x2c, 0x2c, 0x2c, 255)));
        assert_eq!(parse_hex_color("#FFFFFF"), Some((255, 255, 255, 255)));
        assert_eq!(parse_hex_color("2C2C2C"), None);
        assert_eq!(parse_hex_color("#FFF"), None);
    }
}
