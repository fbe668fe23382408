#[macro_use]
extern crate napi_derive;

pub mod config;
pub mod content;
pub mod controller;
pub mod error;
pub mod factory;
pub mod ipc;
pub mod options;
pub mod overlay;
pub mod platform;
pub mod registry;
pub mod resize;
pub mod scheduler;
pub mod shutdown;
pub mod surface;

#[cfg(test)]
mod testing;

use std::cell::RefCell;
use std::time::Instant;

use napi::threadsafe_function::{
    ErrorStrategy, ThreadSafeCallContext, ThreadsafeFunction, ThreadsafeFunctionCallMode,
};
use napi::JsFunction;
use tracing_subscriber::EnvFilter;

pub use config::OrchestratorConfig;
pub use controller::LifecycleController;
pub use error::{Error, Result};
pub use options::{OrchestratorOptions, SizeOptions, SurfaceOptions, WindowName};
pub use surface::{Backend, SurfaceEvent, SurfaceId};

use platform::Platform;

thread_local! {
    static ORCHESTRATOR: RefCell<Option<LifecycleController<Platform>>> = const { RefCell::new(None) };
}

fn with_orchestrator<T>(
    f: impl FnOnce(&mut LifecycleController<Platform>) -> Result<T>,
) -> napi::Result<T> {
    ORCHESTRATOR.with(|cell| {
        let mut slot = cell.borrow_mut();
        let orchestrator = slot.as_mut().ok_or(Error::NotInitialized)?;
        Ok(f(orchestrator)?)
    })
}

/// Callback receiving a surface id.
type SurfaceCallback = ThreadsafeFunction<u32, ErrorStrategy::Fatal>;

fn surface_callback(callback: JsFunction) -> napi::Result<SurfaceCallback> {
    callback.create_threadsafe_function(0, |ctx: ThreadSafeCallContext<u32>| {
        ctx.env.create_uint32(ctx.value).map(|v| vec![v])
    })
}

/// Initialize logging and the native window system.
/// Must be called once before any other function; later calls are no-ops.
#[napi]
pub fn init(options: Option<OrchestratorOptions>) -> napi::Result<()> {
    // an embedding host may already own the global subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("window_lifecycle=info")),
        )
        .try_init();

    ORCHESTRATOR.with(|cell| {
        if cell.borrow().is_some() {
            return Ok(());
        }
        let config = OrchestratorConfig::from_options(&options.unwrap_or_default())?;
        let platform = Platform::new()?;
        tracing::info!(
            minimize_to_tray = config.minimize_to_tray,
            dev_server = config.dev_server_url.as_deref().unwrap_or("-"),
            "window lifecycle initialized"
        );
        *cell.borrow_mut() = Some(LifecycleController::new(platform, config));
        Ok(())
    })
}

/// Process native events, control messages and due deferred work.
/// Call this periodically (e.g. every 16ms via setInterval).
#[napi]
pub fn pump_events() -> napi::Result<()> {
    with_orchestrator(|o| {
        o.backend_mut().pump_events();
        o.pump(Instant::now());
        Ok(())
    })
}

/// Open the window `name` ("main", "setting" or "dialog").
/// Returns its surface id, or null when it is already open.
#[napi]
pub fn open_window(
    name: String,
    size: SizeOptions,
    overrides: Option<SurfaceOptions>,
) -> napi::Result<Option<u32>> {
    let name: WindowName = name.parse()?;
    with_orchestrator(|o| o.open(Instant::now(), name, &size, overrides.as_ref()))
}

/// Close a surface according to its window's close policy.
#[napi]
pub fn close_window(surface_id: u32) -> napi::Result<()> {
    with_orchestrator(|o| {
        o.close_window(Instant::now(), surface_id);
        Ok(())
    })
}

#[napi]
pub fn minimize_window(surface_id: u32) -> napi::Result<bool> {
    with_orchestrator(|o| Ok(o.minimize(surface_id)))
}

/// Maximize the surface, or restore it when already maximized.
#[napi]
pub fn toggle_maximize(surface_id: u32) -> napi::Result<bool> {
    with_orchestrator(|o| Ok(o.toggle_maximize(surface_id)))
}

#[napi]
pub fn is_window_maximized(surface_id: u32) -> napi::Result<bool> {
    with_orchestrator(|o| Ok(o.is_maximized(surface_id)))
}

/// Keep hidden windows alive while the main window is off screen.
#[napi]
pub fn set_minimize_to_tray(enabled: bool) -> napi::Result<()> {
    with_orchestrator(|o| {
        o.set_minimize_to_tray(enabled);
        Ok(())
    })
}

/// "absent", "hidden" or "visible".
#[napi]
pub fn window_state(name: String) -> napi::Result<String> {
    let name: WindowName = name.parse()?;
    with_orchestrator(|o| Ok(o.window_state(name).as_str().to_string()))
}

/// Call `callback` with the surface id every time `name` gets a new surface.
/// Returns a subscription id for `unsubscribe`.
#[napi(ts_args_type = "name: string, callback: (surfaceId: number) => void")]
pub fn on_window_created(name: String, callback: JsFunction) -> napi::Result<u32> {
    let name: WindowName = name.parse()?;
    let tsfn = surface_callback(callback)?;
    with_orchestrator(|o| {
        let subscription = o.register_on_create(
            name,
            Box::new(move |_, id| {
                tsfn.call(id, ThreadsafeFunctionCallMode::NonBlocking);
            }),
        );
        Ok(subscription.id())
    })
}

/// Call `callback` with the surface id when a surface of `name` is destroyed.
#[napi(ts_args_type = "name: string, callback: (surfaceId: number) => void")]
pub fn on_window_closed(name: String, callback: JsFunction) -> napi::Result<u32> {
    let name: WindowName = name.parse()?;
    let tsfn = surface_callback(callback)?;
    with_orchestrator(|o| {
        let subscription = o.register_on_close(
            name,
            Box::new(move |_, id| {
                tsfn.call(id, ThreadsafeFunctionCallMode::NonBlocking);
            }),
        );
        Ok(subscription.id())
    })
}

#[napi]
pub fn unsubscribe(subscription_id: u32) -> napi::Result<bool> {
    with_orchestrator(|o| Ok(o.unregister_id(subscription_id)))
}
