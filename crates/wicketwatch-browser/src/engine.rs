use crate::error::{BrowserError, Result};
use crate::page::PageSource;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use std::time::{Duration, Instant};

/// Interval between DOM polls while waiting for a selector.
const WAIT_POLL_MS: u64 = 250;

/// Browser automation engine.
///
/// Launches one headless Chromium process; every tracked match gets its
/// own page (tab) from it, so workers never share page state.
pub struct BrowserEngine {
    browser: Browser,
}

impl BrowserEngine {
    /// Launch a Chromium instance with the given settings.
    pub async fn launch(config: &wicketwatch_core::BrowserConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage");
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Drive the CDP event loop for the lifetime of the browser
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {}", e);
                }
            }
        });

        tracing::info!("Browser launched (headless: {})", config.headless);
        Ok(Self { browser })
    }

    /// Open a fresh page for one match worker or discovery cycle.
    pub async fn new_page(&self) -> Result<MatchPage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(MatchPage { page })
    }

    /// Close the browser process.
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(())
    }
}

/// A single rendered page, backed by a chromiumoxide tab.
pub struct MatchPage {
    page: Page,
}

#[async_trait::async_trait]
impl PageSource for MatchPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(selector.to_string()));
            }
            tokio::time::sleep(Duration::from_millis(WAIT_POLL_MS)).await;
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(())
    }

    async fn text(&self, selector: &str) -> Result<Option<String>> {
        // Absent elements are a sentinel, not a failure
        let Ok(element) = self.page.find_element(selector).await else {
            return Ok(None);
        };
        let text = element
            .inner_text()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(text.map(|t| t.trim().to_string()))
    }

    async fn text_all(&self, selector: &str) -> Result<Vec<String>> {
        let Ok(elements) = self.page.find_elements(selector).await else {
            return Ok(Vec::new());
        };
        let mut texts = Vec::with_capacity(elements.len());
        for element in elements {
            let text = element
                .inner_text()
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
            if let Some(t) = text {
                texts.push(t.trim().to_string());
            }
        }
        Ok(texts)
    }

    async fn evaluate_json(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| BrowserError::Evaluation(e.to_string()))
    }
}
