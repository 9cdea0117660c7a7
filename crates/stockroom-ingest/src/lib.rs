//! Stockroom Ingest - resumable enrichment pipeline for local image folders.
//!
//! A run scans a directory for `<prefix><DepositID><marker>.<ext>` files,
//! skips everything already in the completion log, and takes each remaining
//! asset through the size gate, alt-text generation, source-page scraping and
//! publishing. Successes are appended to the completion log one durable row at
//! a time; failures go to a per-run failure log tagged with their stage.
//!
//! # Example
//!
//! ```rust,ignore
//! use stockroom_ingest::{scan_directory, AssetNaming, CompletionStore, FailureLog, IngestPipeline};
//!
//! let scan = scan_directory(&dir, &AssetNaming::from_config(&config.ingest)).await?;
//! let completed = CompletionStore::open(&config.ingest.completed_log)?;
//! let failures = FailureLog::create(&config.ingest.failed_log)?;
//! let mut pipeline = IngestPipeline::new(extractor, publisher, completed, failures, options);
//! let summary = pipeline.run(scan).await?;
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod extract;
pub mod gate;
pub mod ledger;
pub mod orchestrator;
pub mod progress;
pub mod publish;
pub mod scan;
pub mod tsv;

pub use error::{AtStage, IngestError, Result, StageFailure, SIZE_LIMIT_MESSAGE};
pub use extract::{AltTextGenerator, BrowserExtractor, DetailScraper, ExtractTiming};
pub use gate::check_size;
pub use ledger::{
    CompletionRecord, CompletionStore, FailureLog, FailureRecord, Keywords, COMPLETED_HEADER,
    FAILED_HEADER, MAX_KEYWORDS,
};
pub use orchestrator::{
    AssetOutcome, AssetState, IngestPipeline, PipelineOptions, RunSummary, SourceDetails,
};
pub use progress::ProgressReporter;
pub use publish::{compose_description, AssetPublisher, GalleryPublisher, PublishRequest};
pub use scan::{scan_directory, AssetNaming, Candidate, LocalAsset, ScanOutcome, EMPTY_TOTAL};
