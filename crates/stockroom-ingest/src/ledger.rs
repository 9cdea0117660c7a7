//! Durable per-asset outcome logs.
//!
//! The completion log is append-only across runs and is the only record of
//! which assets are done. The failure log is recreated on every run and lists
//! only that run's failures. Both are flushed to disk after every row.

use crate::error::{IngestError, Result};
use crate::tsv;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use stockroom_core::{DepositId, RemoteId, Stage};

/// Hard upper bound on keywords stored per asset.
pub const MAX_KEYWORDS: usize = 50;

/// Header row of the completion log.
pub const COMPLETED_HEADER: [&str; 8] = [
    "LocalPath",
    "DepositID",
    "SourceURL",
    "Title",
    "Author",
    "AltText",
    "Keywords",
    "PiwigoID",
];

/// Header row of the failure log.
pub const FAILED_HEADER: [&str; 4] = ["LocalPath", "DepositID", "Stage", "Error"];

/// Column holding the deposit ID in both logs.
const DEPOSIT_ID_COLUMN: usize = 1;

/// Ordered keyword list, never longer than [`MAX_KEYWORDS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keywords(Vec<String>);

impl Keywords {
    /// Keep the first `cap` keywords (at most [`MAX_KEYWORDS`]) in their original order.
    #[must_use]
    pub fn capped(mut keywords: Vec<String>, cap: usize) -> Self {
        keywords.truncate(cap.min(MAX_KEYWORDS));
        Self(keywords)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Single log cell, `;`-joined.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0.join(";")
    }
}

/// A fully published asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub local_path: PathBuf,
    pub deposit_id: DepositId,
    pub source_url: String,
    pub title: String,
    pub author: String,
    pub alt_text: String,
    pub keywords: Keywords,
    pub remote_id: RemoteId,
}

impl CompletionRecord {
    fn fields(&self) -> [String; 8] {
        [
            self.local_path.display().to_string(),
            self.deposit_id.to_string(),
            self.source_url.clone(),
            self.title.clone(),
            self.author.clone(),
            self.alt_text.clone(),
            self.keywords.joined(),
            self.remote_id.to_string(),
        ]
    }
}

/// An asset that stopped at some stage during this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub local_path: PathBuf,
    pub deposit_id: DepositId,
    pub stage: Stage,
    pub error: String,
}

impl FailureRecord {
    fn fields(&self) -> [String; 4] {
        [
            self.local_path.display().to_string(),
            self.deposit_id.to_string(),
            self.stage.label().to_string(),
            self.error.clone(),
        ]
    }
}

fn ledger_error(path: &Path) -> impl FnOnce(std::io::Error) -> IngestError + '_ {
    move |source| IngestError::Ledger {
        path: path.to_path_buf(),
        source,
    }
}

/// Write a row and push it to disk before returning.
fn append_durably(file: &mut File, path: &Path, fields: &[String]) -> Result<()> {
    tsv::write_row(file, fields).map_err(ledger_error(path))?;
    file.flush().map_err(ledger_error(path))?;
    file.sync_data().map_err(ledger_error(path))
}

/// Completion log plus the in-memory set of completed deposit IDs.
#[derive(Debug)]
pub struct CompletionStore {
    path: PathBuf,
    file: File,
    completed: HashSet<DepositId>,
    committed_this_run: usize,
}

impl CompletionStore {
    /// Open the completion log, creating it with a header if absent or empty,
    /// and load every recorded deposit ID.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let is_empty = match std::fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(ledger_error(&path)(e)),
        };
        if is_empty {
            let mut file = File::create(&path).map_err(ledger_error(&path))?;
            let header = COMPLETED_HEADER.map(String::from);
            append_durably(&mut file, &path, &header)?;
            tracing::debug!("Created completion log {}", path.display());
        }

        let contents = std::fs::read_to_string(&path).map_err(ledger_error(&path))?;
        let mut completed = HashSet::new();
        for (line, row) in tsv::parse(&contents).into_iter().enumerate().skip(1) {
            match row.get(DEPOSIT_ID_COLUMN).map(|id| DepositId::new(id.as_str())) {
                Some(Ok(id)) => {
                    completed.insert(id);
                }
                _ => tracing::warn!(
                    "Skipping malformed row {} in {}",
                    line + 1,
                    path.display()
                ),
            }
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(ledger_error(&path))?;

        // An unterminated last row would swallow the next commit.
        if !contents.is_empty() && !contents.ends_with('\n') {
            tracing::warn!("Completion log {} ends mid-row, terminating it", path.display());
            file.write_all(b"\n").map_err(ledger_error(&path))?;
            file.flush().map_err(ledger_error(&path))?;
            file.sync_data().map_err(ledger_error(&path))?;
        }

        tracing::debug!(
            "Loaded {} completed IDs from {}",
            completed.len(),
            path.display()
        );

        Ok(Self {
            path,
            file,
            completed,
            committed_this_run: 0,
        })
    }

    #[must_use]
    pub fn is_completed(&self, id: &DepositId) -> bool {
        self.completed.contains(id)
    }

    /// Append a record and mark its deposit ID completed.
    ///
    /// Returns `false` without writing when the ID is already completed.
    /// The ID joins the completed set only once the row is on disk.
    pub fn commit(&mut self, record: &CompletionRecord) -> Result<bool> {
        if self.is_completed(&record.deposit_id) {
            return Ok(false);
        }

        append_durably(&mut self.file, &self.path, &record.fields())?;
        self.completed.insert(record.deposit_id.clone());
        self.committed_this_run += 1;
        Ok(true)
    }

    /// Number of completed IDs, from earlier runs and this one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.completed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    #[must_use]
    pub fn committed_this_run(&self) -> usize {
        self.committed_this_run
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Failure log for the current run.
#[derive(Debug)]
pub struct FailureLog {
    path: PathBuf,
    file: File,
    recorded: usize,
}

impl FailureLog {
    /// Truncate (or create) the failure log and write its header.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = File::create(&path).map_err(ledger_error(&path))?;
        let header = FAILED_HEADER.map(String::from);
        append_durably(&mut file, &path, &header)?;

        Ok(Self {
            path,
            file,
            recorded: 0,
        })
    }

    pub fn record(&mut self, record: &FailureRecord) -> Result<()> {
        append_durably(&mut self.file, &self.path, &record.fields())?;
        self.recorded += 1;
        Ok(())
    }

    /// Failures recorded during this run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recorded
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recorded == 0
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
