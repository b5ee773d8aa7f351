//! HTTP control surface for the favorites scheduler using Axum

use axum::{
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use crate::core::scheduler::{FavoritesScheduler, SchedulerStatus};
use crate::metrics::Metrics;
use crate::models::ScheduledAnalysis;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<FavoritesScheduler>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    /// Allowed browser origins; empty means any origin
    pub cors_origins: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(scheduler: Arc<FavoritesScheduler>, metrics: Arc<Metrics>) -> Self {
        Self {
            scheduler,
            metrics,
            start_time: Arc::new(Instant::now()),
            cors_origins: Arc::new(Vec::new()),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Arc::new(origins);
        self
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "service": "tradedash-api",
        "scheduler_running": state.scheduler.is_running(),
    }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();
    state.metrics.http_requests_in_flight.dec();

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis() as u64,
            "HTTP request error"
        );
    }

    response
}

#[derive(Debug, Deserialize)]
pub struct IntervalRequest {
    pub minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct RunNowResponse {
    pub message: String,
    pub analyses_count: usize,
    pub analyses: Vec<ScheduledAnalysis>,
}

async fn scheduler_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.get_status().await)
}

async fn list_analyses(State(state): State<AppState>) -> Json<Vec<ScheduledAnalysis>> {
    Json(state.scheduler.get_all_analyses().await)
}

/// Exact-match lookup; the cache is keyed by the symbol as the favorites
/// provider spells it.
async fn get_analysis(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ScheduledAnalysis>, (StatusCode, Json<Value>)> {
    state
        .scheduler
        .get_analysis(&symbol)
        .await
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "detail": format!("No scheduled analysis found for {}", symbol)
                })),
            )
        })
}

async fn start_scheduler(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.start().await)
}

async fn stop_scheduler(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.stop().await)
}

async fn run_now(State(state): State<AppState>) -> Json<RunNowResponse> {
    let analyses = state.scheduler.run_now().await;
    Json(RunNowResponse {
        message: format!("Analysis completed for {} symbols", analyses.len()),
        analyses_count: analyses.len(),
        analyses,
    })
}

async fn set_interval(
    State(state): State<AppState>,
    Json(request): Json<IntervalRequest>,
) -> Json<SchedulerStatus> {
    Json(state.scheduler.set_interval(request.minutes).await)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_router(state: AppState) -> Router {
    let scheduler_routes = Router::new()
        .route("/status", get(scheduler_status))
        .route("/analyses", get(list_analyses))
        .route("/analyses/{symbol}", get(get_analysis))
        .route("/start", post(start_scheduler))
        .route("/stop", post(stop_scheduler))
        .route("/run-now", post(run_now))
        .route("/interval", put(set_interval));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1/scheduler", scheduler_routes)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(cors_layer(&state.cors_origins)),
        )
        .with_state(state)
}

/// Serve the API until `shutdown` is cancelled
pub async fn start_server(
    port: u16,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port = port, "HTTP server listening on port {}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
