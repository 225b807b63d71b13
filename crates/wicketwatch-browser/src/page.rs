use crate::error::Result;

/// Query capability over one rendered page.
///
/// This is the seam between the scraping engine and the browser: the
/// discovery cycle and the per-match workers are written against this
/// trait, so tests can substitute a fake page while production uses the
/// chromiumoxide-backed [`crate::MatchPage`].
///
/// Missing elements are reported as `Ok(None)` / empty collections by the
/// read methods; only transport-level failures (the browser connection
/// itself) surface as errors.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    /// Navigate the page to a URL and wait for the load event.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Wait for a selector to appear in the DOM, up to `timeout_ms`.
    async fn wait_for(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Click the first element matching the selector.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Inner text of the first element matching the selector, if present.
    async fn text(&self, selector: &str) -> Result<Option<String>>;

    /// Inner text of every element matching the selector.
    async fn text_all(&self, selector: &str) -> Result<Vec<String>>;

    /// Evaluate a JavaScript expression in the page and return its JSON value.
    async fn evaluate_json(&self, script: &str) -> Result<serde_json::Value>;
}
