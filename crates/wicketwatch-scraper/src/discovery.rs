//! Periodic discovery of live matches on the source site.
//!
//! Each cycle renders the listing page, collects the live match links,
//! diffs them against the persisted snapshot and reconciles the worker
//! set: one start per added identifier, one stop per removed one.

use crate::diff::{self, SnapshotDiff};
use crate::error::{Result, ScrapeError};
use crate::supervisor::WorkerSupervisor;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wicketwatch_browser::PageSource;
use wicketwatch_collector::{CollectorClient, Credential, TokenProvider};
use wicketwatch_core::{DiscoveryConfig, MatchId};
use wicketwatch_db::{tracked_matches, Database};

/// Selector that marks the listing page as settled.
const LIVE_CARD_SELECTOR: &str = "div.live-card";

/// Collect the href of every card carrying a live badge. The anchor
/// sits two levels above the badge, on the following sibling.
const LIVE_LINKS_JS: &str = r"
    () => {
        const links = [];
        document.querySelectorAll('div.live-card .live').forEach(badge => {
            const anchor = badge.parentElement.parentElement.nextElementSibling;
            const href = anchor ? anchor.getAttribute('href') : null;
            if (href) links.push(href);
        });
        return links;
    }
";

/// Runs discovery cycles and reconciles workers against the outcome.
pub struct DiscoveryService {
    db: Arc<Database>,
    supervisor: Arc<WorkerSupervisor>,
    collector: Arc<CollectorClient>,
    tokens: Arc<TokenProvider>,
    config: DiscoveryConfig,
    worker_stop_timeout: Duration,
}

impl DiscoveryService {
    #[must_use]
    pub fn new(
        db: Arc<Database>,
        supervisor: Arc<WorkerSupervisor>,
        collector: Arc<CollectorClient>,
        tokens: Arc<TokenProvider>,
        config: DiscoveryConfig,
        worker_stop_timeout: Duration,
    ) -> Self {
        Self {
            db,
            supervisor,
            collector,
            tokens,
            config,
            worker_stop_timeout,
        }
    }

    /// Run discovery cycles until cancelled, one every
    /// `interval_secs`. Cycle failures are logged and the loop carries
    /// on; a transient listing-page problem must not kill discovery.
    pub async fn run(&self, page: &dyn PageSource, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                tracing::info!("Discovery loop cancelled");
                return;
            }

            match self.run_cycle(page).await {
                Ok(diff) if diff.is_empty() => {
                    tracing::debug!("Discovery cycle found no changes");
                }
                Ok(diff) => {
                    tracing::info!(
                        "Discovery cycle: {} added, {} removed",
                        diff.added.len(),
                        diff.removed.len()
                    );
                }
                Err(e) => tracing::error!("Discovery cycle failed: {}", e),
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Discovery loop cancelled");
                    return;
                }
                () = tokio::time::sleep(Duration::from_secs(self.config.interval_secs)) => {}
            }
        }
    }

    /// One discovery cycle: scrape the listing, diff against the
    /// persisted snapshot, persist the new snapshot, notify the
    /// collector and reconcile the worker set.
    ///
    /// # Errors
    /// Fails when the listing page cannot be rendered or the snapshot
    /// cannot be read or written. Collector notification and individual
    /// worker transitions never fail the cycle.
    pub async fn run_cycle(&self, page: &dyn PageSource) -> Result<SnapshotDiff> {
        let current = self.scrape_live_links(page).await?;
        tracing::info!("Discovered {} live matches", current.len());

        let previous = tracked_matches::load_all(self.db.pool()).await?;
        let diff = diff::diff(&previous, &current);

        let snapshot: Vec<MatchId> = current.iter().cloned().collect();
        tracked_matches::upsert_all(self.db.pool(), &snapshot).await?;

        if !diff.is_empty() {
            self.notify_collector(&snapshot).await;
        }

        for id in &diff.added {
            match self.supervisor.start(id.clone()) {
                Ok(()) => {}
                Err(ScrapeError::AlreadyRunning(id)) => {
                    tracing::debug!("Worker for {} already running, skipping start", id);
                }
                Err(e) => tracing::error!("Failed to start worker for {}: {}", id, e),
            }
        }

        for id in &diff.removed {
            match self.supervisor.stop(id, self.worker_stop_timeout).await {
                Ok(()) => {}
                Err(ScrapeError::NotFound(id)) => {
                    // No worker to stop (e.g. after a restart), but the
                    // stale row still has to go
                    tracing::debug!("No worker for removed match {}", id);
                    tracked_matches::delete(self.db.pool(), &id).await?;
                }
                Err(e) => tracing::error!("Failed to stop worker for {}: {}", id, e),
            }
        }

        Ok(diff)
    }

    /// Render the listing page and return the absolutized live links.
    async fn scrape_live_links(&self, page: &dyn PageSource) -> Result<HashSet<MatchId>> {
        page.goto(&self.config.source_url).await?;
        page.wait_for(LIVE_CARD_SELECTOR, self.config.settle_ms)
            .await
            .map_err(|e| ScrapeError::Discovery(format!("live match cards never appeared: {e}")))?;

        let value = page.evaluate_json(LIVE_LINKS_JS).await?;
        let hrefs: Vec<String> = serde_json::from_value(value).unwrap_or_default();

        let base = self.config.source_url.trim_end_matches('/');
        Ok(hrefs
            .into_iter()
            .map(|href| {
                if href.starts_with('/') {
                    format!("{base}{href}")
                } else {
                    href
                }
            })
            .filter_map(|url| MatchId::new(url).ok())
            .collect())
    }

    /// Forward the full identifier list to the collector. Failures are
    /// logged; delivery is best effort.
    async fn notify_collector(&self, snapshot: &[MatchId]) {
        let credential = match self.tokens.fetch().await {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!("Token fetch failed, notifying without auth: {}", e);
                Credential::anonymous()
            }
        };

        if let Err(e) = self.collector.add_live_matches(snapshot, &credential).await {
            tracing::warn!("Failed to forward live match list: {}", e);
        }
    }
}
