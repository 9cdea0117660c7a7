use crate::error::{BrowserError, Result};
use std::path::Path;
use std::time::Duration;

/// Browser actions for automation
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// URL the page ended up on (after redirects)
    async fn current_url(&self) -> Result<String>;

    /// Wait for a selector to appear
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Extract text from an element
    async fn extract_text(&self, selector: &str) -> Result<String>;

    /// Extract the text of every `item` inside the last element matching `container`
    async fn extract_list(&self, container: &str, item: &str) -> Result<Vec<String>>;

    /// Attach a local file to a file input
    async fn upload_file(&self, selector: &str, path: &Path) -> Result<()>;

    /// Wait until a form field holds a non-empty value, then return it
    async fn wait_for_value(&self, selector: &str, timeout_ms: u64) -> Result<String>;

    /// Scroll the document
    async fn scroll(&self, target: ScrollTarget) -> Result<()>;
}

/// Scroll positions a page can be moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget {
    /// Top of the document
    Home,
    /// Bottom of the document
    End,
    /// One viewport up
    PageUp,
    /// One viewport down
    PageDown,
}

impl ScrollTarget {
    /// Script performing the scroll.
    #[must_use]
    pub fn script(self) -> &'static str {
        match self {
            Self::Home => "window.scrollTo(0, 0)",
            Self::End => "window.scrollTo(0, document.documentElement.scrollHeight)",
            Self::PageUp => "window.scrollBy(0, -window.innerHeight)",
            Self::PageDown => "window.scrollBy(0, window.innerHeight)",
        }
    }
}

/// One render-forcing sweep: visit the end of the document and walk back
/// through the middle so virtualized lists mount their items.
const RENDER_SWEEP: [ScrollTarget; 6] = [
    ScrollTarget::End,
    ScrollTarget::PageUp,
    ScrollTarget::PageUp,
    ScrollTarget::Home,
    ScrollTarget::PageDown,
    ScrollTarget::PageDown,
];

/// Force a lazily rendered list to mount and read its items.
///
/// Each round performs a scroll sweep with `settle` pauses, then reads the list.
/// Stops once two consecutive rounds see the same non-zero item count, or after
/// `max_rounds` rounds, returning what the last read saw. A container that has
/// not mounted yet reads as an empty list.
pub async fn force_render<B>(
    browser: &B,
    container: &str,
    item: &str,
    settle: Duration,
    max_rounds: u32,
) -> Result<Vec<String>>
where
    B: BrowserActions + ?Sized,
{
    let mut previous: Option<usize> = None;
    let mut items = Vec::new();

    for round in 1..=max_rounds.max(1) {
        for target in RENDER_SWEEP {
            browser.scroll(target).await?;
            tokio::time::sleep(settle).await;
        }

        items = match browser.extract_list(container, item).await {
            Ok(items) => items,
            Err(BrowserError::SelectorNotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        tracing::debug!("Render round {}: {} items in {}", round, items.len(), container);

        if !items.is_empty() && previous == Some(items.len()) {
            break;
        }
        previous = Some(items.len());
    }

    Ok(items)
}
