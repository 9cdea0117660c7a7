//! Metadata extraction.
//!
//! Two capabilities feed the pipeline: alt-text generation for a local file,
//! and step-wise scraping of the asset's detail page at the source. Both are
//! traits so the state machine can run against test doubles; [`BrowserExtractor`]
//! implements them on top of a single browser page.

use crate::error::{IngestError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use stockroom_browser::{force_render, BrowserActions};
use stockroom_core::{AppConfig, DepositId, SourceConfig};
use tokio::sync::Mutex;

/// Produces descriptive alt text for an image file.
#[async_trait]
pub trait AltTextGenerator: Send + Sync {
    async fn generate(&self, image: &Path) -> Result<String>;
}

/// Reads an asset's details from its page at the source.
///
/// `open` must be called first; the other steps read from the opened page.
#[async_trait]
pub trait DetailScraper: Send + Sync {
    /// Open the detail page and return its resolved URL.
    async fn open(&self, id: &DepositId) -> Result<String>;

    /// Normalized title. Fails with [`IngestError::NotFound`] when the source has no such asset.
    async fn title(&self) -> Result<String>;

    /// Normalized author name.
    async fn author(&self) -> Result<String>;

    /// Normalized keywords in page order.
    async fn keywords(&self) -> Result<Vec<String>>;
}

/// Strip the first matching decoration from the end of a heading.
#[must_use]
pub fn normalize_title(raw: &str, suffixes: &[String]) -> String {
    let title = raw.trim();
    suffixes
        .iter()
        .find_map(|suffix| title.strip_suffix(suffix.as_str()))
        .unwrap_or(title)
        .trim_end()
        .to_string()
}

/// Keep the name after a "<type> by " prefix, if any.
#[must_use]
pub fn normalize_author(raw: &str, prefixes: &[String]) -> String {
    let author = raw.trim();
    prefixes
        .iter()
        .find_map(|prefix| author.split_once(prefix.as_str()).map(|(_, name)| name))
        .unwrap_or(author)
        .trim()
        .to_string()
}

/// Trim and lower-case keywords, dropping empty ones.
#[must_use]
pub fn normalize_keywords(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Timing knobs for page interaction.
#[derive(Debug, Clone)]
pub struct ExtractTiming {
    pub element_timeout_ms: u64,
    pub settle: Duration,
    pub render_rounds: u32,
}

impl ExtractTiming {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            element_timeout_ms: config.browser.element_timeout_ms,
            settle: Duration::from_millis(config.browser.settle_delay_ms),
            render_rounds: config.browser.render_rounds,
        }
    }
}

/// Extraction over one shared browser page.
pub struct BrowserExtractor<B> {
    browser: B,
    source: SourceConfig,
    timing: ExtractTiming,
    current: Mutex<Option<DepositId>>,
}

impl<B: BrowserActions> BrowserExtractor<B> {
    pub fn new(browser: B, source: SourceConfig, timing: ExtractTiming) -> Self {
        Self {
            browser,
            source,
            timing,
            current: Mutex::new(None),
        }
    }

    /// Give back the browser, e.g. to shut it down.
    pub fn into_inner(self) -> B {
        self.browser
    }

    fn search_url(&self, id: &DepositId) -> Result<String> {
        let base = url::Url::parse(&self.source.search_url_base)
            .map_err(|e| IngestError::Extraction(format!("invalid search URL base: {e}")))?;
        base.join(id.as_str())
            .map(String::from)
            .map_err(|e| IngestError::Extraction(format!("invalid search URL for {id}: {e}")))
    }

    async fn opened(&self) -> Result<DepositId> {
        self.current
            .lock()
            .await
            .clone()
            .ok_or_else(|| IngestError::Extraction("no detail page open".to_string()))
    }
}

#[async_trait]
impl<B: BrowserActions> AltTextGenerator for BrowserExtractor<B> {
    async fn generate(&self, image: &Path) -> Result<String> {
        let timeout = self.timing.element_timeout_ms;

        self.browser.navigate(&self.source.alt_text_tool_url).await?;
        self.browser
            .wait_for_selector(&self.source.file_input_selector, timeout)
            .await?;
        self.browser
            .upload_file(&self.source.file_input_selector, image)
            .await?;

        let alt_text = self
            .browser
            .wait_for_value(&self.source.alt_text_selector, timeout)
            .await?;
        Ok(alt_text.trim().to_string())
    }
}

#[async_trait]
impl<B: BrowserActions> DetailScraper for BrowserExtractor<B> {
    async fn open(&self, id: &DepositId) -> Result<String> {
        let url = self.search_url(id)?;
        *self.current.lock().await = None;

        self.browser.navigate(&url).await?;
        let resolved = self.browser.current_url().await?;
        tracing::debug!("Detail page for {}: {}", id, resolved);

        *self.current.lock().await = Some(id.clone());
        Ok(resolved)
    }

    async fn title(&self) -> Result<String> {
        let id = self.opened().await?;
        self.browser
            .wait_for_selector(&self.source.title_selector, self.timing.element_timeout_ms)
            .await?;
        let raw = self.browser.extract_text(&self.source.title_selector).await?;

        let title = normalize_title(&raw, &self.source.title_suffixes);
        if title == self.source.not_found_title {
            return Err(IngestError::NotFound { deposit_id: id });
        }
        Ok(title)
    }

    async fn author(&self) -> Result<String> {
        self.opened().await?;
        self.browser
            .wait_for_selector(&self.source.author_selector, self.timing.element_timeout_ms)
            .await?;
        let raw = self.browser.extract_text(&self.source.author_selector).await?;
        Ok(normalize_author(&raw, &self.source.author_prefixes))
    }

    async fn keywords(&self) -> Result<Vec<String>> {
        self.opened().await?;
        let raw = force_render(
            &self.browser,
            &self.source.keyword_list_selector,
            &self.source.keyword_item_selector,
            self.timing.settle,
            self.timing.render_rounds,
        )
        .await?;
        Ok(normalize_keywords(raw))
    }
}
