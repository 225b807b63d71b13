//! The long-running per-match worker.
//!
//! One worker per tracked match: it owns a browser page, repeatedly
//! extracts the tracked field classes, suppresses unchanged values
//! through [`ChangeFilter`]s and delivers the rest to the collector.
//! Nothing that happens inside an iteration may kill the loop; the only
//! exits are cooperative cancellation and process shutdown.

use crate::extract::{self, LimitedOversOdds, TeamOdds, TeamScore};
use crate::filter::ChangeFilter;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wicketwatch_browser::{BrowserEngine, PageSource};
use wicketwatch_collector::{CollectorClient, Credential, TokenProvider};
use wicketwatch_core::{MatchId, MatchKind, WorkerConfig};

/// A runnable per-match worker.
///
/// The supervisor is written against this trait so lifecycle tests can
/// substitute stub workers for the browser-backed implementation.
#[async_trait::async_trait]
pub trait MatchWorker: Send + Sync {
    /// Run until the cancellation token is triggered.
    async fn run(&self, id: MatchId, cancel: CancellationToken);
}

/// Last-emitted value per tracked field class. Owned by one worker run,
/// reset implicitly on worker restart.
#[derive(Default)]
struct FieldState {
    lines: ChangeFilter<BTreeSet<String>>,
    score: ChangeFilter<TeamScore>,
    test_odds: ChangeFilter<Vec<TeamOdds>>,
    limited_odds: ChangeFilter<LimitedOversOdds>,
}

/// Extraction/compare/deliver logic of the worker, independent of the
/// browser session so it can be driven with a fake page.
pub struct MatchObserver {
    collector: Arc<CollectorClient>,
    config: WorkerConfig,
}

impl MatchObserver {
    /// Build an observer delivering through the given collector client.
    #[must_use]
    pub fn new(collector: Arc<CollectorClient>, config: WorkerConfig) -> Self {
        Self { collector, config }
    }

    /// Run the observation loop until cancelled.
    pub async fn observe_loop(
        &self,
        page: &dyn PageSource,
        id: &MatchId,
        credential: &Credential,
        mut odds_view_open: bool,
        cancel: &CancellationToken,
    ) {
        let kind = id.kind();
        let mut state = FieldState::default();

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let delivered = self
                .iterate(page, id, kind, credential, &mut odds_view_open, &mut state)
                .await;
            if delivered > 0 {
                tracing::debug!("Delivered {} changed record(s) for {}", delivered, id);
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)) => {}
            }
        }

        tracing::info!("Stopping scraping task for {}", id);
    }

    /// One extraction pass. Returns the number of records delivered.
    /// Field-level failures are logged and skipped, never propagated.
    async fn iterate(
        &self,
        page: &dyn PageSource,
        id: &MatchId,
        kind: MatchKind,
        credential: &Credential,
        odds_view_open: &mut bool,
        state: &mut FieldState,
    ) -> usize {
        let mut delivered = 0;

        if !*odds_view_open {
            tracing::debug!("Odds view toggle not yet active for {}, searching again", id);
            *odds_view_open =
                extract::activate_odds_view(page, self.config.odds_toggle_timeout_ms).await;
        }

        // Free-text result lines, compared as an order-insensitive set.
        // Newly appearing lines are delivered individually.
        match extract::result_lines(page).await {
            Ok(lines) => {
                let fresh: Vec<String> = match state.lines.last() {
                    Some(previous) => lines.difference(previous).cloned().collect(),
                    None => lines.iter().cloned().collect(),
                };
                if state.lines.observe(lines) {
                    for line in fresh {
                        delivered += self
                            .deliver(&json!({ "score_update": line }), credential, id)
                            .await;
                    }
                }
            }
            Err(e) => tracing::warn!("Failed to read result lines for {}: {}", id, e),
        }

        // Score block, bundled with run rate, summary line and overs.
        match self.match_update(page).await {
            Ok(Some((score, update))) => {
                if state.score.observe(score) {
                    delivered += self.deliver(&update, credential, id).await;
                }
            }
            Ok(None) => {
                // Block vanished (innings break, page reshuffle). Drop
                // the baseline so the score is re-delivered when the
                // block comes back, even if its value is unchanged.
                state.score.reset();
            }
            Err(e) => tracing::warn!("Failed to read score block for {}: {}", id, e),
        }

        // Odds, once the toggle is active; extraction shape per match kind.
        if *odds_view_open {
            match kind {
                MatchKind::Test => match extract::test_match_odds(page).await {
                    Ok(odds) if !odds.is_empty() => {
                        if state.test_odds.observe(odds.clone()) {
                            tracing::info!("Odds data changed for {}", id);
                            delivered += self.deliver(&json!(odds), credential, id).await;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Failed to read test odds for {}: {}", id, e),
                },
                MatchKind::LimitedOvers => match extract::limited_overs_odds(page).await {
                    Ok(odds) if !odds.is_empty() => {
                        if state.limited_odds.observe(odds.clone()) {
                            tracing::info!("Odds data changed for {}", id);
                            delivered += self.deliver(&json!(odds), credential, id).await;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Failed to read odds for {}: {}", id, e),
                },
            }
        }

        delivered
    }

    async fn match_update(
        &self,
        page: &dyn PageSource,
    ) -> wicketwatch_browser::Result<Option<(TeamScore, Value)>> {
        let Some(score) = extract::team_score(page).await? else {
            return Ok(None);
        };
        let crr = extract::run_rate(page).await?;
        let final_result = extract::final_result(page).await?;
        let overs = extract::overs(page).await?;

        let update = json!({
            "match_update": {
                "score": score,
                "crr": crr,
                "final_result_text": final_result,
            },
            "overs_data": overs,
        });
        Ok(Some((score, update)))
    }

    /// Deliver one record; transport failures are logged, not retried.
    /// Returns 1 for accounting regardless of transport outcome: the
    /// value was emitted and becomes the suppression baseline.
    async fn deliver(&self, record: &Value, credential: &Credential, id: &MatchId) -> usize {
        if let Err(e) = self.collector.send_match_data(record, credential, id).await {
            tracing::warn!("Failed to deliver data for {}: {}", id, e);
        }
        1
    }
}

/// Browser-backed worker: one page per match, token fetched at start.
pub struct LiveMatchWorker {
    engine: Arc<BrowserEngine>,
    tokens: Arc<TokenProvider>,
    observer: MatchObserver,
}

impl LiveMatchWorker {
    /// Build a worker factory bound to a shared browser engine.
    #[must_use]
    pub fn new(
        engine: Arc<BrowserEngine>,
        tokens: Arc<TokenProvider>,
        collector: Arc<CollectorClient>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            engine,
            tokens,
            observer: MatchObserver::new(collector, config),
        }
    }
}

#[async_trait::async_trait]
impl MatchWorker for LiveMatchWorker {
    async fn run(&self, id: MatchId, cancel: CancellationToken) {
        tracing::info!("Starting scraping task for {}", id);

        let credential = match self.tokens.fetch().await {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!("Token fetch failed, proceeding unauthenticated: {}", e);
                Credential::anonymous()
            }
        };

        let page = match self.engine.new_page().await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Could not open a page for {}: {}", id, e);
                return;
            }
        };

        // Navigation failure is degraded, not fatal: the loop keeps
        // retrying the odds toggle and extracting what it can see.
        if let Err(e) = page.goto(id.as_str()).await {
            tracing::error!("Error during navigation to {}: {}", id, e);
        }

        let odds_view_open =
            extract::activate_odds_view(&page, self.observer.config.odds_toggle_timeout_ms).await;
        tracing::info!("Odds view toggle found for {}: {}", id, odds_view_open);

        self.observer
            .observe_loop(&page, &id, &credential, odds_view_open, &cancel)
            .await;
    }
}
