use std::path::PathBuf;

use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::options::WindowName;

/// Where a window's content is loaded from.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentTarget {
    /// A route on the dev server.
    Url(String),
    /// A page of the packaged renderer.
    File(PathBuf),
}

impl ContentTarget {
    /// Resolve the target for `name`.
    ///
    /// Dev server: `{base}/html/` for main, `{base}/html/{name}` otherwise.
    /// Packaged: `{root}/html/index.html` for main, `{root}/html/{name}.html`
    /// otherwise.
    pub fn for_window(config: &OrchestratorConfig, name: WindowName) -> ContentTarget {
        match config.dev_server_url {
            Some(ref base) => {
                let route = match name {
                    WindowName::Main => "",
                    other => other.as_str(),
                };
                ContentTarget::Url(format!("{}/html/{}", base.trim_end_matches('/'), route))
            }
            None => {
                let page = match name {
                    WindowName::Main => "index",
                    other => other.as_str(),
                };
                ContentTarget::File(
                    config
                        .renderer_root
                        .join("html")
                        .join(format!("{}.html", page)),
                )
            }
        }
    }

    /// URL the webview should navigate to.
    pub fn to_url(&self) -> Result<String> {
        match self {
            ContentTarget::Url(url) => Ok(url.clone()),
            ContentTarget::File(path) => {
                let absolute = std::path::absolute(path)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                url::Url::from_file_path(&absolute)
                    .map(String::from)
                    .map_err(|_| {
                        Error::Config(format!("cannot express {} as a URL", absolute.display()))
                    })
            }
        }
    }
}
