#[cfg(feature = "webview")]
mod unified;

#[cfg(feature = "webview")]
pub use unified::Platform;

#[cfg(not(feature = "webview"))]
pub use unsupported::Platform;

/// Stand-in when the crate is built without a native webview toolkit.
/// It can never be constructed, so `init()` reports the build as
/// unsupported instead of failing later.
#[cfg(not(feature = "webview"))]
mod unsupported {
    use serde_json::Value;

    use crate::content::ContentTarget;
    use crate::error::{Error, Result};
    use crate::options::{SizeOptions, SurfaceOptions};
    use crate::surface::{Backend, OverlaySpec, SurfaceEvent, SurfaceId};

    pub enum Platform {}

    impl Platform {
        pub fn new() -> Result<Self> {
            Err(Error::Backend(
                "unsupported build: compile with the `webview` feature for native windows".into(),
            ))
        }

        pub fn pump_events(&mut self) {
            match *self {}
        }
    }

    impl Backend for Platform {
        fn create_surface(&mut self, _: SurfaceId, _: &SurfaceOptions) -> Result<()> {
            match *self {}
        }
        fn load_content(&mut self, _: SurfaceId, _: &ContentTarget) -> Result<()> {
            match *self {}
        }
        fn show(&mut self, _: SurfaceId) -> Result<()> {
            match *self {}
        }
        fn hide(&mut self, _: SurfaceId) -> Result<()> {
            match *self {}
        }
        fn close(&mut self, _: SurfaceId) -> Result<()> {
            match *self {}
        }
        fn destroy(&mut self, _: SurfaceId) -> Result<()> {
            match *self {}
        }
        fn minimize(&mut self, _: SurfaceId) -> Result<()> {
            match *self {}
        }
        fn maximize(&mut self, _: SurfaceId) -> Result<()> {
            match *self {}
        }
        fn unmaximize(&mut self, _: SurfaceId) -> Result<()> {
            match *self {}
        }
        fn set_size_constraints(&mut self, _: SurfaceId, _: &SizeOptions) -> Result<()> {
            match *self {}
        }
        fn post_message(&mut self, _: SurfaceId, _: &str, _: Value) -> Result<()> {
            match *self {}
        }
        fn attach_overlay(&mut self, _: SurfaceId, _: SurfaceId, _: &OverlaySpec) -> Result<()> {
            match *self {}
        }
        fn detach_overlay(&mut self, _: SurfaceId, _: SurfaceId) -> Result<()> {
            match *self {}
        }
        fn is_destroyed(&self, _: SurfaceId) -> bool {
            match *self {}
        }
        fn is_visible(&self, _: SurfaceId) -> bool {
            match *self {}
        }
        fn is_minimized(&self, _: SurfaceId) -> bool {
            match *self {}
        }
        fn is_maximized(&self, _: SurfaceId) -> bool {
            match *self {}
        }
        fn drain_events(&mut self) -> Vec<SurfaceEvent> {
            match *self {}
        }
    }
}
