use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::options::OrchestratorOptions;

/// Environment fallback for the dev server URL.
pub const DEV_SERVER_ENV: &str = "WINDOW_LIFECYCLE_DEV_SERVER_URL";

const DEFAULT_FAKE_CLOSE_DELAY: Duration = Duration::from_millis(200);
const DEFAULT_RESIZE_DEBOUNCE: Duration = Duration::from_millis(80);
const DEFAULT_SIZE_CONSTRAINT_DELAY: Duration = Duration::from_millis(16);

/// Resolved orchestrator settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Starting value. Runtime changes go to the shutdown coordinator.
    pub minimize_to_tray: bool,
    pub fake_close_delay: Duration,
    pub resize_debounce: Duration,
    pub size_constraint_delay: Duration,
    /// `None` keeps a window hidden until its content reports ready.
    pub overlay_timeout: Option<Duration>,
    pub dev_server_url: Option<String>,
    pub renderer_root: PathBuf,
    pub dark_theme: bool,
    pub icon: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            minimize_to_tray: true,
            fake_close_delay: DEFAULT_FAKE_CLOSE_DELAY,
            resize_debounce: DEFAULT_RESIZE_DEBOUNCE,
            size_constraint_delay: DEFAULT_SIZE_CONSTRAINT_DELAY,
            overlay_timeout: None,
            dev_server_url: None,
            renderer_root: PathBuf::from("renderer"),
            dark_theme: true,
            icon: None,
        }
    }
}

impl OrchestratorConfig {
    /// Resolve JS-facing options, reading the dev server URL from the
    /// environment when the options leave it unset.
    pub fn from_options(options: &OrchestratorOptions) -> Result<Self> {
        let env_url = std::env::var(DEV_SERVER_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());
        Self::resolve(options, env_url)
    }

    fn resolve(options: &OrchestratorOptions, env_url: Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let ms = |v: Option<u32>, d: Duration| v.map(|v| Duration::from_millis(v.into())).unwrap_or(d);

        let dev_server_url = match options.dev_server_url.clone().or(env_url) {
            Some(raw) => {
                let trimmed = raw.trim().to_string();
                let parsed = url::Url::parse(&trimmed)
                    .map_err(|e| Error::Config(format!("dev server url '{}': {}", trimmed, e)))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(Error::Config(format!(
                        "dev server url must be http(s), got '{}'",
                        parsed.scheme()
                    )));
                }
                Some(trimmed)
            }
            None => None,
        };

        if options.overlay_timeout_ms == Some(0) {
            return Err(Error::Config("overlayTimeoutMs must be positive".into()));
        }

        Ok(Self {
            minimize_to_tray: options.minimize_to_tray.unwrap_or(defaults.minimize_to_tray),
            fake_close_delay: ms(options.fake_close_delay_ms, defaults.fake_close_delay),
            resize_debounce: ms(options.resize_debounce_ms, defaults.resize_debounce),
            size_constraint_delay: ms(
                options.size_constraint_delay_ms,
                defaults.size_constraint_delay,
            ),
            overlay_timeout: options
                .overlay_timeout_ms
                .map(|v| Duration::from_millis(v.into())),
            dev_server_url,
            renderer_root: options
                .renderer_root
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or(defaults.renderer_root),
            dark_theme: options.dark_theme.unwrap_or(defaults.dark_theme),
            icon: options.icon.clone(),
        })
    }
}
