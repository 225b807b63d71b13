//! End-to-end lifecycle: discovery cycles reconciling workers and the
//! persisted snapshot across listing changes.

use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wicketwatch_browser::{BrowserError, PageSource};
use wicketwatch_collector::{CollectorClient, TokenProvider};
use wicketwatch_core::{CollectorConfig, DiscoveryConfig, MatchId};
use wicketwatch_db::{tracked_matches, Database};
use wicketwatch_scraper::{DiscoveryService, MatchWorker, WorkerSupervisor};

/// Listing page double returning a configurable set of live links.
struct ListingPage {
    hrefs: Mutex<Vec<String>>,
}

impl ListingPage {
    fn new(hrefs: &[&str]) -> Self {
        Self {
            hrefs: Mutex::new(hrefs.iter().map(ToString::to_string).collect()),
        }
    }

    fn set_hrefs(&self, hrefs: &[&str]) {
        *self.hrefs.lock().expect("lock poisoned") =
            hrefs.iter().map(ToString::to_string).collect();
    }
}

#[async_trait::async_trait]
impl PageSource for ListingPage {
    async fn goto(&self, _url: &str) -> wicketwatch_browser::Result<()> {
        Ok(())
    }

    async fn wait_for(&self, _selector: &str, _timeout_ms: u64) -> wicketwatch_browser::Result<()> {
        Ok(())
    }

    async fn click(&self, selector: &str) -> wicketwatch_browser::Result<()> {
        Err(BrowserError::SelectorNotFound(selector.to_string()))
    }

    async fn text(&self, _selector: &str) -> wicketwatch_browser::Result<Option<String>> {
        Ok(None)
    }

    async fn text_all(&self, _selector: &str) -> wicketwatch_browser::Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn evaluate_json(&self, _script: &str) -> wicketwatch_browser::Result<Value> {
        Ok(json!(*self.hrefs.lock().expect("lock poisoned")))
    }
}

/// Worker double that parks until cancelled.
struct CountingWorker {
    active: AtomicUsize,
}

#[async_trait::async_trait]
impl MatchWorker for CountingWorker {
    async fn run(&self, _id: MatchId, cancel: CancellationToken) {
        self.active.fetch_add(1, Ordering::SeqCst);
        cancel.cancelled().await;
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

fn id(url: &str) -> MatchId {
    MatchId::new(url).expect("valid match id")
}

#[tokio::test]
async fn test_two_cycle_lifecycle() {
    let db = Arc::new(Database::in_memory().await.expect("open in-memory db"));
    db.run_migrations().await.expect("run migrations");

    let worker = Arc::new(CountingWorker {
        active: AtomicUsize::new(0),
    });
    let supervisor = Arc::new(WorkerSupervisor::new(worker.clone(), db.clone()));

    // Unroutable collector: notification failures are best effort
    let mut collector_config = CollectorConfig::default();
    collector_config.base_url = "http://127.0.0.1:9".to_string();
    collector_config.timeout_secs = 1;

    let service = DiscoveryService::new(
        db.clone(),
        supervisor.clone(),
        Arc::new(CollectorClient::new(&collector_config).expect("build client")),
        Arc::new(TokenProvider::new(&collector_config).expect("build provider")),
        DiscoveryConfig::default(),
        Duration::from_secs(2),
    );

    // Cycle 1: empty store, two live matches discovered
    let page = ListingPage::new(&["/m/1", "/m/2"]);
    let diff = service.run_cycle(&page).await.expect("first cycle");
    assert_eq!(diff.added.len(), 2);
    assert!(diff.removed.is_empty());

    tokio::task::yield_now().await;
    assert_eq!(supervisor.running().len(), 2);
    assert_eq!(worker.active.load(Ordering::SeqCst), 2);

    let stored = tracked_matches::load_all(db.pool()).await.expect("load");
    let expected: HashSet<MatchId> = [id("https://crex.live/m/1"), id("https://crex.live/m/2")]
        .into_iter()
        .collect();
    assert_eq!(stored, expected);
    assert_eq!(
        tracked_matches::deletion_attempts(db.pool(), &id("https://crex.live/m/1"))
            .await
            .expect("query"),
        Some(0)
    );

    // Cycle 2: match 2 fell off the listing
    page.set_hrefs(&["/m/1"]);
    let diff = service.run_cycle(&page).await.expect("second cycle");
    assert!(diff.added.is_empty());
    assert_eq!(diff.removed.len(), 1);
    assert!(diff.removed.contains(&id("https://crex.live/m/2")));

    assert_eq!(supervisor.running().len(), 1);
    assert!(supervisor.is_tracking(&id("https://crex.live/m/1")));
    assert_eq!(worker.active.load(Ordering::SeqCst), 1);

    let stored = tracked_matches::load_all(db.pool()).await.expect("load");
    let expected: HashSet<MatchId> = [id("https://crex.live/m/1")].into_iter().collect();
    assert_eq!(stored, expected);

    supervisor.shutdown(Duration::from_secs(2)).await;
    assert_eq!(worker.active.load(Ordering::SeqCst), 0);
}
