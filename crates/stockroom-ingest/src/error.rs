use std::path::PathBuf;
use stockroom_browser::BrowserError;
use stockroom_core::{DepositId, Stage};
use stockroom_gallery::GalleryError;
use thiserror::Error;

/// Message recorded for assets rejected by the size gate.
pub const SIZE_LIMIT_MESSAGE: &str =
    "File is too large to generate alt text. Shrink file and run again";

#[derive(Debug, Error)]
pub enum IngestError {
    /// Network or HTTP failure talking to the gallery
    #[error("{0}")]
    Transport(String),

    /// Gallery reported `stat: fail`
    #[error("{method} failed: {code} {message}")]
    Protocol {
        method: String,
        code: String,
        message: String,
    },

    /// An expected element or value did not show up in time
    #[error("timeout: {0}")]
    Timeout(String),

    /// Asset is too large for the alt-text tool
    #[error("{}", SIZE_LIMIT_MESSAGE)]
    SizeLimit { size: u64, limit: u64 },

    /// Source has no asset with this identifier
    #[error("asset {deposit_id} doesn't exist on the source site")]
    NotFound { deposit_id: DepositId },

    /// Page structure did not match what extraction expects
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input directory missing or unreadable
    #[error("cannot read input directory {}: {source}", .path.display())]
    InputDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Completion or failure log could not be opened or appended to
    #[error("cannot write log {}: {source}", .path.display())]
    Ledger {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<BrowserError> for IngestError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Timeout(detail) => Self::Timeout(detail),
            other => Self::Extraction(other.to_string()),
        }
    }
}

impl From<GalleryError> for IngestError {
    fn from(err: GalleryError) -> Self {
        match err {
            GalleryError::Protocol {
                method,
                code,
                message,
            } => Self::Protocol {
                method,
                code,
                message,
            },
            GalleryError::Io(e) => Self::Io(e),
            other => Self::Transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// An error tagged with the pipeline stage it happened in.
#[derive(Debug, Error)]
#[error("{stage}: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    pub error: IngestError,
}

/// Tag a fallible step with its stage.
pub trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageFailure>;
}

impl<T, E> AtStage<T> for std::result::Result<T, E>
where
    E: Into<IngestError>,
{
    fn at(self, stage: Stage) -> std::result::Result<T, StageFailure> {
        self.map_err(|e| StageFailure {
            stage,
            error: e.into(),
        })
    }
}
