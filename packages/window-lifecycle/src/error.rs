use thiserror::Error;

use crate::surface::SurfaceId;

/// Errors raised by the orchestrator and its native backend.
///
/// Most of these never leave the crate: a surface that has already been
/// destroyed is an expected terminal state, so callers log and move on.
#[derive(Debug, Error)]
pub enum Error {
    #[error("window system not initialized, call init() first")]
    NotInitialized,

    #[error("surface {0} has been destroyed")]
    SurfaceDestroyed(SurfaceId),

    #[error("surface {0} is not known to the backend")]
    UnknownSurface(SurfaceId),

    #[error("unknown window name: {0}")]
    UnknownWindow(String),

    #[error("native backend error: {0}")]
    Backend(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed control message: {0}")]
    Ipc(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the error only says the surface is gone.
    pub fn is_gone(&self) -> bool {
        matches!(self, Error::SurfaceDestroyed(_) | Error::UnknownSurface(_))
    }
}

impl From<Error> for napi::Error {
    fn from(err: Error) -> Self {
        napi::Error::from_reason(err.to_string())
    }
}
