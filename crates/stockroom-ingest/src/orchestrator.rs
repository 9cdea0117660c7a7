//! Per-asset state machine and run loop.
//!
//! Every candidate moves strictly forward through
//! `Discovered → SizeChecked → AltTextExtracted → DetailScraped → KeywordsCollected → Published → Committed`
//! or drops out as `Failed`. Failures are recorded and the run moves on; only
//! log write errors abort the run.

use crate::error::{AtStage, IngestError, Result, StageFailure};
use crate::extract::{AltTextGenerator, DetailScraper};
use crate::gate::check_size;
use crate::ledger::{CompletionRecord, CompletionStore, FailureLog, FailureRecord, Keywords};
use crate::progress::ProgressReporter;
use crate::publish::{compose_description, AssetPublisher, PublishRequest};
use crate::scan::{Candidate, ScanOutcome};
use std::collections::HashSet;
use std::fmt;
use stockroom_core::{AppConfig, DepositId, RemoteId, Stage};
use tracing::{debug, info, warn};

/// Where an asset is in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetState {
    Discovered,
    SizeChecked,
    AltTextExtracted,
    DetailScraped,
    KeywordsCollected,
    Published,
    Committed,
    Failed { stage: Stage, reason: String },
}

impl AssetState {
    fn rank(&self) -> u8 {
        match self {
            Self::Discovered => 0,
            Self::SizeChecked => 1,
            Self::AltTextExtracted => 2,
            Self::DetailScraped => 3,
            Self::KeywordsCollected => 4,
            Self::Published => 5,
            Self::Committed | Self::Failed { .. } => 6,
        }
    }

    /// `Committed` and `Failed` accept no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Failed { .. })
    }

    fn advance(&mut self, next: Self, id: &DepositId) {
        debug_assert!(!self.is_terminal(), "{}: transition out of {:?}", id, self);
        debug_assert!(
            matches!(next, Self::Failed { .. }) || next.rank() > self.rank(),
            "{}: backward transition {:?} -> {:?}",
            id,
            self,
            next
        );
        debug!("{}: {:?} -> {:?}", id, self, next);
        *self = next;
    }
}

/// Details read from the asset's page at the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDetails {
    pub source_url: String,
    pub title: String,
    pub author: String,
}

/// How one candidate ended.
#[derive(Debug)]
pub enum AssetOutcome {
    /// Already in the completion log; nothing was called
    AlreadyCompleted,
    Committed(RemoteId),
    Failed(StageFailure),
}

/// Counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates: usize,
    pub skipped: usize,
    pub committed: usize,
    pub failed: usize,
    /// Failures caused by the size gate (also counted in `failed`)
    pub oversized: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidates: {} committed, {} failed ({} oversized), {} already completed",
            self.candidates, self.committed, self.failed, self.oversized, self.skipped
        )
    }
}

/// Fixed per-run settings.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub size_limit_bytes: u64,
    pub keyword_cap: usize,
    /// Publisher credited in descriptions
    pub publisher_name: String,
}

impl PipelineOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            size_limit_bytes: config.ingest.size_limit_bytes,
            keyword_cap: config.ingest.keyword_cap,
            publisher_name: config.source.publisher.clone(),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Runs candidates one at a time through extraction, publish and commit.
///
/// Owns the extraction session and both logs for the lifetime of the run.
pub struct IngestPipeline<E, P> {
    extractor: E,
    publisher: P,
    completed: CompletionStore,
    failures: FailureLog,
    options: PipelineOptions,
}

impl<E, P> IngestPipeline<E, P>
where
    E: AltTextGenerator + DetailScraper,
    P: AssetPublisher,
{
    pub fn new(
        extractor: E,
        publisher: P,
        completed: CompletionStore,
        failures: FailureLog,
        options: PipelineOptions,
    ) -> Self {
        Self {
            extractor,
            publisher,
            completed,
            failures,
            options,
        }
    }

    /// Process every candidate of a scan in order.
    ///
    /// # Errors
    /// Returns error only when a log cannot be written; per-asset failures are
    /// recorded in the failure log and counted.
    pub async fn run(&mut self, scan: ScanOutcome) -> Result<RunSummary> {
        let mut summary = RunSummary {
            candidates: scan.candidates.len(),
            ..RunSummary::default()
        };
        let mut progress = ProgressReporter::new(scan.total);
        let mut attempted: HashSet<DepositId> = HashSet::new();

        info!("Starting run over {} candidates", summary.candidates);

        for candidate in &scan.candidates {
            if !attempted.insert(candidate.deposit_id.clone()) {
                debug!(
                    "{} already attempted this run, skipping {}",
                    candidate.deposit_id,
                    candidate.asset.path.display()
                );
                summary.skipped += 1;
                continue;
            }

            match self.process(candidate).await? {
                AssetOutcome::AlreadyCompleted => summary.skipped += 1,
                AssetOutcome::Committed(_) => {
                    summary.committed += 1;
                    progress.record_commit();
                }
                AssetOutcome::Failed(failure) => {
                    summary.failed += 1;
                    if matches!(failure.error, IngestError::SizeLimit { .. }) {
                        summary.oversized += 1;
                    }
                }
            }
        }

        if summary.oversized > 0 {
            warn!(
                "{} file(s) were too large to generate alt text. Shrink them and run again",
                summary.oversized
            );
        }
        info!("Run finished: {}", summary);
        Ok(summary)
    }

    /// Take one candidate through the whole pipeline.
    ///
    /// # Errors
    /// Returns error only when the outcome cannot be logged.
    pub async fn process(&mut self, candidate: &Candidate) -> Result<AssetOutcome> {
        let id = &candidate.deposit_id;
        if self.completed.is_completed(id) {
            debug!("{} already completed, skipping", id);
            return Ok(AssetOutcome::AlreadyCompleted);
        }

        let mut state = AssetState::Discovered;
        match self.run_stages(candidate, &mut state).await {
            Ok(record) => {
                let remote_id = record.remote_id.clone();
                if !self.completed.commit(&record)? {
                    warn!("{} is already in the completion log, row not written", id);
                }
                state.advance(AssetState::Committed, id);
                info!("Committed {} as {}", id, remote_id);
                Ok(AssetOutcome::Committed(remote_id))
            }
            Err(failure) => {
                let reason = failure.error.to_string();
                warn!("{} failed at {}: {}", id, failure.stage, reason);
                self.failures.record(&FailureRecord {
                    local_path: candidate.asset.path.clone(),
                    deposit_id: id.clone(),
                    stage: failure.stage,
                    error: reason.clone(),
                })?;
                state.advance(
                    AssetState::Failed {
                        stage: failure.stage,
                        reason,
                    },
                    id,
                );
                Ok(AssetOutcome::Failed(failure))
            }
        }
    }

    async fn run_stages(
        &self,
        candidate: &Candidate,
        state: &mut AssetState,
    ) -> std::result::Result<CompletionRecord, StageFailure> {
        let id = &candidate.deposit_id;
        let path = &candidate.asset.path;

        check_size(&candidate.asset, self.options.size_limit_bytes).at(Stage::AltText)?;
        state.advance(AssetState::SizeChecked, id);

        let alt_text = self.extractor.generate(path).await.at(Stage::AltText)?;
        state.advance(AssetState::AltTextExtracted, id);

        let details = self.scrape_details(id).await?;
        state.advance(AssetState::DetailScraped, id);

        let scraped = self.extractor.keywords().await.at(Stage::Keywords)?;
        let keywords = Keywords::capped(scraped, self.options.keyword_cap);
        state.advance(AssetState::KeywordsCollected, id);

        let request = PublishRequest {
            path: path.clone(),
            title: details.title.clone(),
            author: details.author.clone(),
            description: compose_description(
                &alt_text,
                &details.source_url,
                &details.author,
                &self.options.publisher_name,
            ),
            tags: keywords.as_slice().to_vec(),
        };
        let remote_id = self.publisher.publish(&request).await.at(Stage::Publish)?;
        state.advance(AssetState::Published, id);

        Ok(CompletionRecord {
            local_path: path.clone(),
            deposit_id: id.clone(),
            source_url: details.source_url,
            title: details.title,
            author: details.author,
            alt_text,
            keywords,
            remote_id,
        })
    }

    async fn scrape_details(&self, id: &DepositId) -> std::result::Result<SourceDetails, StageFailure> {
        let source_url = self.extractor.open(id).await.at(Stage::Title)?;
        let title = self.extractor.title().await.at(Stage::Title)?;
        let author = self.extractor.author().await.at(Stage::Author)?;
        Ok(SourceDetails {
            source_url,
            title,
            author,
        })
    }

    #[must_use]
    pub fn completed(&self) -> &CompletionStore {
        &self.completed
    }

    #[must_use]
    pub fn failures(&self) -> &FailureLog {
        &self.failures
    }

    #[must_use]
    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    #[must_use]
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Release the extractor and publisher, closing both logs.
    pub fn into_parts(self) -> (E, P) {
        (self.extractor, self.publisher)
    }
}
