use crate::error::Result;
use crate::options::{SizeOptions, SurfaceOptions};
use crate::surface::{Backend, SurfaceId};

const APP_TITLE: &str = "xq";

/// Light/dark palette used for window and placeholder backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub dark: bool,
}

impl Theme {
    pub fn background_color(&self) -> &'static str {
        if self.dark {
            "#2C2C2C"
        } else {
            "#FFFFFF"
        }
    }
}

/// Creates native surfaces from a shared baseline plus per-call overrides.
pub struct SurfaceFactory {
    baseline: SurfaceOptions,
}

impl SurfaceFactory {
    pub fn new(theme: Theme, icon: Option<String>) -> Self {
        let baseline = SurfaceOptions {
            title: Some(APP_TITLE.to_string()),
            // hidden until the loading overlay has painted
            visible: Some(false),
            opacity: Some(0.0),
            decorations: Some(false),
            dark_theme: Some(theme.dark),
            background_color: Some(theme.background_color().to_string()),
            icon,
            node_integration: Some(false),
            context_isolation: Some(true),
            sandbox: Some(true),
            background_throttling: Some(false),
            ..Default::default()
        };
        Self { baseline }
    }

    pub fn baseline(&self) -> &SurfaceOptions {
        &self.baseline
    }

    /// Baseline, then the size hints, then `overrides`. Later layers win.
    /// Min/max constraints are left out; they are applied after first show.
    pub fn options_for(&self, size: &SizeOptions, overrides: Option<&SurfaceOptions>) -> SurfaceOptions {
        let sized = self.baseline.merged_with(&SurfaceOptions::from(size));
        match overrides {
            Some(overrides) => sized.merged_with(overrides),
            None => sized,
        }
    }

    pub fn create<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        id: SurfaceId,
        size: &SizeOptions,
        overrides: Option<&SurfaceOptions>,
    ) -> Result<SurfaceOptions> {
        let options = self.options_for(size, overrides);
        backend.create_surface(id, &options)?;
        tracing::debug!(surface = id, width = size.width, height = size.height, "surface created");
        Ok(options)
    }
}
