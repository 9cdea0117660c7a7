use crate::actions::{BrowserActions, ScrollTarget};
use crate::error::{BrowserError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::Page;
use futures::stream::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};
use stockroom_core::BrowserConfig;
use tokio::task::JoinHandle;

/// Delay between polls while waiting for an element or value.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Browser automation engine.
///
/// Owns one browser process and a single page that every action runs on,
/// so actions are serialized by construction.
pub struct BrowserEngine {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl BrowserEngine {
    /// Launch a browser and open the page all actions will use.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = ChromiumConfig::builder()
            .no_sandbox()
            .window_size(config.window_width, config.window_height);
        if !config.headless {
            builder = builder.with_head();
        }
        let chromium_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler event error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        tracing::debug!(
            "Browser launched (headless: {}, {}x{})",
            config.headless,
            config.window_width,
            config.window_height
        );

        Ok(Self {
            browser,
            page,
            handler,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        })
    }

    /// Close the browser and stop its event handler.
    pub async fn shutdown(mut self) -> Result<()> {
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::ChromiumError(e.to_string()));
        self.handler.abort();
        closed
    }

    async fn evaluate<T>(&self, script: String) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }
}

/// Quote a selector for embedding in a script.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[derive(Debug, Deserialize)]
struct ListSnapshot {
    found: bool,
    items: Vec<String>,
}

fn list_script(container: &str, item: &str) -> String {
    format!(
        "(() => {{ \
            const lists = document.querySelectorAll({container}); \
            if (lists.length === 0) return {{ found: false, items: [] }}; \
            const last = lists[lists.length - 1]; \
            const items = Array.from(last.querySelectorAll({item})).map(el => el.innerText || ''); \
            return {{ found: true, items }}; \
        }})()",
        container = js_string(container),
        item = js_string(item),
    )
}

fn value_script(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); return el && el.value ? el.value : ''; }})()",
        js_string(selector)
    )
}

#[async_trait::async_trait]
impl BrowserActions for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        url::Url::parse(url).map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {e}")))?;

        tracing::debug!("Navigating to {}", url);
        tokio::time::timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| {
                BrowserError::Timeout(format!(
                    "navigation to {url} exceeded {}s",
                    self.navigation_timeout.as_secs()
                ))
            })?
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.page
            .url()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?
            .ok_or_else(|| BrowserError::NavigationError("page has no URL".to_string()))
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "{selector} did not appear within {timeout_ms}ms"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;

        let text = element
            .inner_text()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(text.unwrap_or_default())
    }

    async fn extract_list(&self, container: &str, item: &str) -> Result<Vec<String>> {
        let snapshot: ListSnapshot = self.evaluate(list_script(container, item)).await?;
        if snapshot.found {
            Ok(snapshot.items)
        } else {
            Err(BrowserError::SelectorNotFound(container.to_string()))
        }
    }

    async fn upload_file(&self, selector: &str, path: &Path) -> Result<()> {
        let absolute = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| BrowserError::Upload(format!("{}: {e}", path.display())))?;

        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;

        let params = SetFileInputFilesParams::builder()
            .file(absolute.to_string_lossy().into_owned())
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(BrowserError::Upload)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| BrowserError::Upload(e.to_string()))?;
        Ok(())
    }

    async fn wait_for_value(&self, selector: &str, timeout_ms: u64) -> Result<String> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let script = value_script(selector);
        loop {
            let value: String = self.evaluate(script.clone()).await?;
            if !value.trim().is_empty() {
                return Ok(value);
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "{selector} stayed empty for {timeout_ms}ms"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn scroll(&self, target: ScrollTarget) -> Result<()> {
        self.page
            .evaluate(target.script())
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(())
    }
}
