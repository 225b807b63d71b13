//! HTTP control surface for the scraping service.
//!
//! Three endpoints drive everything: one kicks off the periodic live
//! match discovery loop, the other two start and stop a worker for a
//! single match URL. All heavy lifting lives in the library crates; the
//! handlers only translate between HTTP and the supervisor/discovery
//! APIs.

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wicketwatch_browser::BrowserEngine;
use wicketwatch_collector::{CollectorClient, TokenProvider};
use wicketwatch_core::{AppConfig, MatchId};
use wicketwatch_db::Database;
use wicketwatch_scraper::{DiscoveryService, LiveMatchWorker, ScrapeError, WorkerSupervisor};

/// Launches the discovery loop task. Injected so the router can be
/// exercised in tests without a browser process behind it.
type DiscoverySpawner = Box<dyn Fn(CancellationToken) -> JoinHandle<()> + Send + Sync>;

struct AppState {
    supervisor: Arc<WorkerSupervisor>,
    spawn_discovery: DiscoverySpawner,
    /// Handle of the single discovery loop, if one was ever started.
    discovery_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
    stop_timeout: Duration,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wicketwatch=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load_with_env()?;

    let db = Arc::new(Database::open(&config.database.path).await?);
    db.run_migrations().await?;
    info!("Database ready at {}", config.database.path);

    let collector = Arc::new(CollectorClient::new(&config.collector)?);
    let tokens = Arc::new(TokenProvider::new(&config.collector)?);
    let engine = Arc::new(BrowserEngine::launch(&config.browser).await?);

    let worker = Arc::new(LiveMatchWorker::new(
        engine.clone(),
        tokens.clone(),
        collector.clone(),
        config.worker.clone(),
    ));
    let supervisor = Arc::new(WorkerSupervisor::new(worker, db.clone()));

    let stop_timeout = Duration::from_secs(config.worker.stop_timeout_secs);
    let discovery = Arc::new(DiscoveryService::new(
        db,
        supervisor.clone(),
        collector,
        tokens,
        config.discovery.clone(),
        stop_timeout,
    ));

    let spawn_discovery: DiscoverySpawner = Box::new(move |cancel| {
        let discovery = discovery.clone();
        let engine = engine.clone();
        tokio::spawn(async move {
            let page = match engine.new_page().await {
                Ok(page) => page,
                Err(e) => {
                    error!("Could not open a page for discovery: {}", e);
                    return;
                }
            };
            discovery.run(&page, cancel).await;
        })
    });

    let state = Arc::new(AppState {
        supervisor: supervisor.clone(),
        spawn_discovery,
        discovery_task: Mutex::new(None),
        shutdown: CancellationToken::new(),
        stop_timeout,
    });

    let app = create_app(state.clone());

    let port = std::env::var("WICKETWATCH_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(5000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting Wicketwatch server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, draining workers");
    state.shutdown.cancel();
    supervisor.shutdown(stop_timeout).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/scrape-live-matches-link", get(discover_handler))
        .route("/start-scrape", post(start_scrape_handler))
        .route("/stop-scrape", post(stop_scrape_handler))
        .route("/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Deserialize)]
struct ScrapeRequest {
    #[serde(default)]
    url: Option<String>,
}

/// Kick off the periodic discovery loop. Idempotent: a second call while
/// the loop is alive reports it instead of starting another.
async fn discover_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut task = state.discovery_task.lock().expect("discovery lock poisoned");
    if let Some(handle) = task.as_ref() {
        if !handle.is_finished() {
            return Json(json!({ "status": "Live match discovery is already running" }));
        }
    }

    *task = Some((state.spawn_discovery)(state.shutdown.child_token()));

    info!("Live match discovery initiated");
    Json(json!({ "status": "Scraping live match links initiated" }))
}

async fn start_scrape_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScrapeRequest>,
) -> (StatusCode, Json<Value>) {
    // MatchId rejects exactly the empty/whitespace urls, so an absent
    // field and a blank one take the same path
    let Ok(id) = MatchId::new(request.url.unwrap_or_default()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "No url provided" })),
        );
    };

    match state.supervisor.start(id.clone()) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": format!("Scraping started for {id}") })),
        ),
        Err(ScrapeError::AlreadyRunning(id)) => (
            StatusCode::OK,
            Json(json!({ "status": format!("Scraping is already running for {id}") })),
        ),
        Err(e) => {
            error!("Failed to start scraping: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": e.to_string() })),
            )
        }
    }
}

async fn stop_scrape_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScrapeRequest>,
) -> (StatusCode, Json<Value>) {
    // MatchId rejects exactly the empty/whitespace urls, so an absent
    // field and a blank one take the same path
    let Ok(id) = MatchId::new(request.url.unwrap_or_default()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "No url provided" })),
        );
    };

    match state.supervisor.stop(&id, state.stop_timeout).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": format!("Scraping stopped for {id}") })),
        ),
        Err(ScrapeError::NotFound(id)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": format!("No scraping task found for url: {id}") })),
        ),
        Err(e) => {
            error!("Failed to stop scraping: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": e.to_string() })),
            )
        }
    }
}

/// Running workers and their lifecycle state.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let workers: Vec<Value> = state
        .supervisor
        .running()
        .into_iter()
        .map(|(id, status)| json!({ "url": id, "status": format!("{status:?}") }))
        .collect();
    Json(json!({ "workers": workers }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use wicketwatch_scraper::MatchWorker;

    struct IdleWorker;

    #[async_trait::async_trait]
    impl MatchWorker for IdleWorker {
        async fn run(&self, _id: MatchId, cancel: CancellationToken) {
            cancel.cancelled().await;
        }
    }

    async fn test_app() -> Router {
        let db = Arc::new(Database::in_memory().await.expect("open in-memory db"));
        db.run_migrations().await.expect("run migrations");
        let supervisor = Arc::new(WorkerSupervisor::new(Arc::new(IdleWorker), db));

        let state = Arc::new(AppState {
            supervisor,
            spawn_discovery: Box::new(|cancel| {
                tokio::spawn(async move { cancel.cancelled().await })
            }),
            discovery_task: Mutex::new(None),
            shutdown: CancellationToken::new(),
            stop_timeout: Duration::from_secs(1),
        });
        create_app(state)
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("build request"),
            )
            .await
            .expect("route request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn test_start_scrape_missing_url() {
        let (status, body) = post_json(test_app().await, "/start-scrape", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "status": "No url provided" }));
    }

    #[tokio::test]
    async fn test_start_scrape_blank_url() {
        let (status, body) = post_json(test_app().await, "/start-scrape", r#"{"url": "  "}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "status": "No url provided" }));
    }

    #[tokio::test]
    async fn test_stop_scrape_missing_url() {
        let (status, body) = post_json(test_app().await, "/stop-scrape", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "status": "No url provided" }));
    }

    #[tokio::test]
    async fn test_stop_scrape_unknown_url() {
        let (status, body) = post_json(
            test_app().await,
            "/stop-scrape",
            r#"{"url": "https://crex.live/m/404"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "status": "No scraping task found for url: https://crex.live/m/404" })
        );
    }

    #[tokio::test]
    async fn test_start_then_duplicate_start() {
        let app = test_app().await;

        let (status, body) = post_json(
            app.clone(),
            "/start-scrape",
            r#"{"url": "https://crex.live/m/1"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "Scraping started for https://crex.live/m/1" })
        );

        let (status, body) = post_json(
            app,
            "/start-scrape",
            r#"{"url": "https://crex.live/m/1"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "Scraping is already running for https://crex.live/m/1" })
        );
    }

    #[tokio::test]
    async fn test_discover_endpoint_reports_repeat() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/scrape-live-matches-link")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("route request");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/scrape-live-matches-link")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("route request");
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body: Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(
            body,
            json!({ "status": "Live match discovery is already running" })
        );
    }

    #[test]
    fn test_scrape_request_with_url() {
        let request: ScrapeRequest =
            serde_json::from_str(r#"{"url": "https://crex.live/m/1"}"#).expect("parse");
        assert_eq!(request.url.as_deref(), Some("https://crex.live/m/1"));
    }

    #[test]
    fn test_scrape_request_missing_url() {
        let request: ScrapeRequest = serde_json::from_str("{}").expect("parse");
        assert!(request.url.is_none());
    }
}
