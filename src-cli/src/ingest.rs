//! The `ingest` command.
//!
//! Fatal checks run before any asset is touched, in order: configuration,
//! API key, input directory, both logs, browser launch.

use anyhow::{Context, Result};
use std::path::Path;
use stockroom_browser::BrowserEngine;
use stockroom_core::AppConfig;
use stockroom_gallery::GalleryClient;
use stockroom_ingest::{
    scan_directory, AssetNaming, BrowserExtractor, CompletionStore, ExtractTiming, FailureLog,
    GalleryPublisher, IngestPipeline, PipelineOptions,
};
use tracing::{info, warn};

pub async fn run(config_path: Option<&Path>, dir: &Path, headless: bool) -> Result<()> {
    let mut config = AppConfig::load_with_env(config_path).context("failed to load configuration")?;
    if headless {
        config.browser.headless = true;
    }

    let api_key = config.require_api_key()?.to_string();
    let client = GalleryClient::new(&config.gallery, &api_key)?;

    let scan = scan_directory(dir, &AssetNaming::from_config(&config.ingest)).await?;
    info!(
        "Found {} candidate(s) in {} ({} other entries ignored)",
        scan.candidates.len(),
        dir.display(),
        scan.ignored
    );

    let completed = CompletionStore::open(&config.ingest.completed_log)?;
    let failures = FailureLog::create(&config.ingest.failed_log)?;
    info!(
        "{} asset(s) already completed in {}",
        completed.len(),
        completed.path().display()
    );

    let engine = BrowserEngine::launch(&config.browser)
        .await
        .context("failed to launch browser")?;

    let extractor = BrowserExtractor::new(
        engine,
        config.source.clone(),
        ExtractTiming::from_config(&config),
    );
    let publisher = GalleryPublisher::new(client, config.gallery.category_id);
    let mut pipeline = IngestPipeline::new(
        extractor,
        publisher,
        completed,
        failures,
        PipelineOptions::from_config(&config),
    );

    let result = pipeline.run(scan).await;

    let (extractor, _) = pipeline.into_parts();
    if let Err(e) = extractor.into_inner().shutdown().await {
        warn!("Browser did not shut down cleanly: {}", e);
    }

    let summary = result?;
    if summary.failed > 0 {
        info!("Failures written to {}", config.ingest.failed_log.display());
    }
    Ok(())
}
