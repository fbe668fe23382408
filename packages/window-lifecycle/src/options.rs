use std::fmt;
use std::str::FromStr;

use napi_derive::napi;

use crate::error::Error;

/// The fixed set of top-level windows the application can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowName {
    Main,
    Setting,
    Dialog,
}

impl WindowName {
    pub const ALL: [WindowName; 3] = [WindowName::Main, WindowName::Setting, WindowName::Dialog];

    pub const COUNT: usize = Self::ALL.len();

    /// Slot index in the registry arena.
    pub fn index(self) -> usize {
        match self {
            WindowName::Main => 0,
            WindowName::Setting => 1,
            WindowName::Dialog => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WindowName::Main => "main",
            WindowName::Setting => "setting",
            WindowName::Dialog => "dialog",
        }
    }
}

impl fmt::Display for WindowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WindowName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownWindow(s.to_string()))
    }
}

/// Placement hints for a window.
///
/// `width`/`height` are applied at creation. The min/max constraints are
/// applied only after the window has been shown for the first time.
#[napi(object)]
#[derive(Debug, Clone, PartialEq)]
pub struct SizeOptions {
    pub width: f64,
    pub height: f64,
    pub min_width: Option<f64>,
    pub min_height: Option<f64>,
    pub max_width: Option<f64>,
    pub max_height: Option<f64>,
}

impl SizeOptions {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            min_width: None,
            min_height: None,
            max_width: None,
            max_height: None,
        }
    }

    pub fn with_min(mut self, width: f64, height: f64) -> Self {
        self.min_width = Some(width);
        self.min_height = Some(height);
        self
    }

    pub fn with_max(mut self, width: f64, height: f64) -> Self {
        self.max_width = Some(width);
        self.max_height = Some(height);
        self
    }

    pub fn has_constraints(&self) -> bool {
        self.min_width.is_some()
            || self.min_height.is_some()
            || self.max_width.is_some()
            || self.max_height.is_some()
    }
}

/// Options for creating a native surface.
///
/// Every field is optional so per-call overrides can be laid over the
/// factory baseline one field at a time.
#[napi(object)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceOptions {
    /// Window title.
    pub title: Option<String>,
    /// Inner width in logical pixels.
    pub width: Option<f64>,
    /// Inner height in logical pixels.
    pub height: Option<f64>,
    /// X position in screen coordinates
    pub x: Option<f64>,
    /// Y position in screen coordinates
    pub y: Option<f64>,
    pub resizable: Option<bool>,
    /// Show the native title bar and borders.
    pub decorations: Option<bool>,
    pub transparent: Option<bool>,
    pub always_on_top: Option<bool>,
    /// Visible as soon as the surface is created.
    pub visible: Option<bool>,
    /// Initial opacity, 0.0 to 1.0. Zero keeps the surface unmapped until
    /// it is first shown.
    pub opacity: Option<f64>,
    /// Background color as `#RRGGBB`, painted before content loads.
    pub background_color: Option<String>,
    pub dark_theme: Option<bool>,
    pub devtools: Option<bool>,
    /// PNG or ICO file used as the window icon.
    pub icon: Option<String>,
    /// Must stay unset or false: hosted content never gets host APIs, and
    /// creation fails when this is true.
    pub node_integration: Option<bool>,
    /// Install the lifecycle bridge as a frozen, non-writable global.
    pub context_isolation: Option<bool>,
    /// Block script, data and blob navigations from the hosted content.
    pub sandbox: Option<bool>,
    /// Throttle timers while the surface is in the background.
    pub background_throttling: Option<bool>,
}

impl SurfaceOptions {
    /// Shallow merge: every field set on `overrides` wins.
    pub fn merged_with(&self, overrides: &SurfaceOptions) -> SurfaceOptions {
        SurfaceOptions {
            title: overrides.title.clone().or_else(|| self.title.clone()),
            width: overrides.width.or(self.width),
            height: overrides.height.or(self.height),
            x: overrides.x.or(self.x),
            y: overrides.y.or(self.y),
            resizable: overrides.resizable.or(self.resizable),
            decorations: overrides.decorations.or(self.decorations),
            transparent: overrides.transparent.or(self.transparent),
            always_on_top: overrides.always_on_top.or(self.always_on_top),
            visible: overrides.visible.or(self.visible),
            opacity: overrides.opacity.or(self.opacity),
            background_color: overrides
                .background_color
                .clone()
                .or_else(|| self.background_color.clone()),
            dark_theme: overrides.dark_theme.or(self.dark_theme),
            devtools: overrides.devtools.or(self.devtools),
            icon: overrides.icon.clone().or_else(|| self.icon.clone()),
            node_integration: overrides.node_integration.or(self.node_integration),
            context_isolation: overrides.context_isolation.or(self.context_isolation),
            sandbox: overrides.sandbox.or(self.sandbox),
            background_throttling: overrides
                .background_throttling
                .or(self.background_throttling),
        }
    }
}

impl From<&SizeOptions> for SurfaceOptions {
    fn from(size: &SizeOptions) -> Self {
        SurfaceOptions {
            width: Some(size.width),
            height: Some(size.height),
            ..Default::default()
        }
    }
}

/// Options accepted by `init()`. Unset fields fall back to defaults.
#[napi(object)]
#[derive(Debug, Clone, Default)]
pub struct OrchestratorOptions {
    /// Keep the process alive in the tray when the main window is hidden.
    /// Default: true
    pub minimize_to_tray: Option<bool>,
    /// Delay before a fake-closed window is hidden. Default: 200
    pub fake_close_delay_ms: Option<u32>,
    /// Quiet period before a maximize-state push. Default: 80
    pub resize_debounce_ms: Option<u32>,
    /// Delay between the first show and applying min/max sizes. Default: 16
    pub size_constraint_delay_ms: Option<u32>,
    /// Force-show a window whose content never reports ready.
    /// Default: unset (wait forever)
    pub overlay_timeout_ms: Option<u32>,
    /// Dev server base URL. When set, content is loaded from it instead of
    /// the packaged renderer directory.
    pub dev_server_url: Option<String>,
    /// Directory holding the packaged renderer (`html/*.html`).
    /// Default: "./renderer"
    pub renderer_root: Option<String>,
    /// Default: true
    pub dark_theme: Option<bool>,
    /// Window icon path applied to every window.
    pub icon: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_names_round_trip_through_strings() {
        for name in WindowName::ALL {
            assert_eq!(name.as_str().parse::<WindowName>().unwrap(), name);
        }
        assert!(matches!(
            "about".parse::<WindowName>(),
            Err(Error::UnknownWindow(n)) if n == "about"
        ));
    }

    #[test]
    fn indices_are_dense() {
        let mut seen = [false; WindowName::COUNT];
        for name in WindowName::ALL {
            seen[name.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn merge_prefers_overrides_field_by_field() {
        let base = SurfaceOptions {
            title: Some("xq".into()),
            visible: Some(false),
            sandbox: Some(true),
            background_color: Some("#FFFFFF".into()),
            ..Default::default()
        };
        let overrides = SurfaceOptions {
            title: Some("Settings".into()),
            resizable: Some(false),
            ..Default::default()
        };
        let merged = base.merged_with(&overrides);
        assert_eq!(merged.title.as_deref(), Some("Settings"));
        assert_eq!(merged.resizable, Some(false));
        assert_eq!(merged.visible, Some(false));
        assert_eq!(merged.sandbox, Some(true));
        assert_eq!(merged.background_color.as_deref(), Some("#FFFFFF"));
    }

    #[test]
    fn size_constraints_are_detected() {
        assert!(!SizeOptions::new(800.0, 600.0).has_constraints());
        assert!(SizeOptions::new(800.0, 600.0)
            .with_min(400.0, 300.0)
            .has_constraints());
    }
}
