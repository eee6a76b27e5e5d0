use std::path::PathBuf;
use thiserror::Error;

/// Root-cause error kinds for a collection run.
///
/// Library functions return `anyhow::Result`; these variants sit at the
/// bottom of the context chain so callers can `downcast_ref` to find out
/// which collaborator failed.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("config error: {0}")]
    Config(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("playlist source error: {status} => {body}")]
    Source { status: u16, body: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed json at {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CollectError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollectError::Storage { path: path.into(), source }
    }

    pub fn malformed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        CollectError::Malformed { path: path.into(), source }
    }
}
