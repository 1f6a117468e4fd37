use std::path::PathBuf;
use std::time::Duration;

pub use crate::browser::manager::BrowserError;
pub use crate::credentials::CredentialError;

/// Fatal conditions for a capture run.
///
/// Every variant terminates the process; the `Display` text is the
/// diagnostic printed to the operator.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not find a page count for {url}. The page layout may have changed or access was denied (are the cookies still valid?)")]
    Enumeration { url: String },

    #[error("Timed out after {timeout:?} waiting for `{marker}` to load. Try increasing the timeout (-t) or the wait (-w)")]
    ReadinessTimeout { marker: String, timeout: Duration },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CaptureError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CaptureError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = CaptureError> = std::result::Result<T, E>;
