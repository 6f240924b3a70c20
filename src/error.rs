use std::path::PathBuf;
use thiserror::Error;

/// Why a single manifest file failed to download. These never abort the unpack; they are
/// logged and counted.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Refusing to write outside the output dir: {0}")]
    UnsafePath(String),

    #[error("Server gave bad response code: {0}")]
    BadStatus(reqwest::StatusCode),

    #[error("Connection timeout")]
    ConnectTimeout,

    #[error("Chunk download timeout")]
    ChunkTimeout,

    #[error("Error talking to server: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Error writing to {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("{algorithm} mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        algorithm: &'static str,
        expected: String,
        actual: String,
    },
}

impl DownloadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DownloadError::Io {
            path: path.into(),
            source,
        }
    }
}
