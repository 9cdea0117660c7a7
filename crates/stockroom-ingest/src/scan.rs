//! Input directory scanning.
//!
//! Lists a directory (non-recursively) and keeps the files whose names follow
//! `<prefix><DepositID><marker>.<ext>`. Everything else is ignored silently.

use crate::error::{IngestError, Result};
use std::path::{Path, PathBuf};
use stockroom_core::{DepositId, IngestConfig};
use tokio::fs;
use tracing::{debug, warn};

/// Total reported for a scan that found nothing, so progress math never divides by zero.
pub const EMPTY_TOTAL: i64 = -1;

/// A local file selected for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    pub path: PathBuf,
    pub size: u64,
}

/// An asset together with the deposit ID parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub deposit_id: DepositId,
    pub asset: LocalAsset,
}

/// Result of scanning a directory.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Matching files, ordered by file name
    pub candidates: Vec<Candidate>,
    /// Candidate count, or [`EMPTY_TOTAL`] when there are none
    pub total: i64,
    /// Entries that did not follow the naming convention
    pub ignored: usize,
}

/// File naming convention for ingestible assets.
#[derive(Debug, Clone)]
pub struct AssetNaming {
    prefix: String,
    marker: String,
    extensions: Vec<String>,
}

impl AssetNaming {
    #[must_use]
    pub fn new(prefix: impl Into<String>, marker: impl Into<String>, extensions: &[String]) -> Self {
        Self {
            prefix: prefix.into(),
            marker: marker.into(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    #[must_use]
    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            config.file_prefix.clone(),
            config.file_marker.clone(),
            &config.extensions,
        )
    }

    /// Parse the deposit ID out of a file name, if it follows the convention.
    #[must_use]
    pub fn deposit_id(&self, file_name: &str) -> Option<DepositId> {
        let rest = file_name.strip_prefix(&self.prefix)?;
        let (stem, ext) = rest.rsplit_once('.')?;
        if !self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            return None;
        }
        let id = stem.strip_suffix(&self.marker)?;
        DepositId::new(id).ok()
    }
}

/// Scan `dir` for candidate assets.
///
/// Fails only when the directory itself cannot be listed.
pub async fn scan_directory(dir: &Path, naming: &AssetNaming) -> Result<ScanOutcome> {
    let input_error = |source| IngestError::InputDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(input_error)?;
    let mut candidates = Vec::new();
    let mut ignored = 0;

    while let Some(entry) = entries.next_entry().await.map_err(input_error)? {
        let file_name = entry.file_name();
        let Some(deposit_id) = file_name.to_str().and_then(|name| naming.deposit_id(name)) else {
            debug!("Ignoring {:?}", file_name);
            ignored += 1;
            continue;
        };

        // Follows symlinks, so linked images count as files.
        let metadata = match fs::metadata(entry.path()).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => {
                ignored += 1;
                continue;
            }
            Err(e) => {
                warn!("Failed to read metadata for {:?}: {}", entry.path(), e);
                ignored += 1;
                continue;
            }
        };

        candidates.push(Candidate {
            deposit_id,
            asset: LocalAsset {
                path: entry.path(),
                size: metadata.len(),
            },
        });
    }

    candidates.sort_by(|a, b| a.asset.path.cmp(&b.asset.path));

    let total = if candidates.is_empty() {
        EMPTY_TOTAL
    } else {
        i64::try_from(candidates.len()).unwrap_or(i64::MAX)
    };

    debug!(
        "Scanned {}: {} candidates, {} ignored",
        dir.display(),
        candidates.len(),
        ignored
    );

    Ok(ScanOutcome {
        candidates,
        total,
        ignored,
    })
}
