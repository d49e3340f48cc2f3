//! HTTP API server.
//!
//! Every failure is answered with HTTP 200 and an `error` field. Malformed
//! JSON bodies are treated as bodies with every field missing.

use crate::cli::Output;
use crate::config::Settings;
use crate::coordinator::RequestCoordinator;
use crate::error::RequestError;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    pub coordinator: RequestCoordinator,
}

/// Run the HTTP API server until Ctrl+C.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    let coordinator = RequestCoordinator::from_settings(&settings)?;
    let state = Arc::new(AppState { coordinator });
    let cors = cors_layer(&settings.server.allowed_origin)?;
    let app = router(state, cors);

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("vidbrief API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Summarize URL", "GET  /get_summary?video_url=...");
    Output::kv("Ask URL", "POST /ask_question");
    Output::kv("Summarize text", "POST /generate_summary");
    Output::kv("Ask text", "POST /answer_question_with_transcript");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Output::info("Server stopped.");
    Ok(())
}

/// Build the API router.
pub fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/get_summary", get(get_summary))
        .route("/ask_question", post(ask_question))
        .route("/generate_summary", post(generate_summary))
        .route(
            "/answer_question_with_transcript",
            post(answer_question_with_transcript),
        )
        .layer(cors)
        .with_state(state)
}

/// CORS for `allowed_origin`; `*` allows any origin without credentials.
pub fn cors_layer(allowed_origin: &str) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origin.trim() == "*" {
        return Ok(layer.allow_origin(Any));
    }

    let origin = HeaderValue::from_str(allowed_origin.trim())
        .map_err(|e| anyhow::anyhow!("Invalid allowed origin {:?}: {}", allowed_origin, e))?;
    Ok(layer.allow_origin(AllowOrigin::exact(origin)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// === Request/Response Types ===

#[derive(Deserialize, Default)]
struct SummaryQuery {
    video_url: Option<String>,
}

#[derive(Deserialize, Default)]
struct AskQuestionRequest {
    video_url: Option<String>,
    question: Option<String>,
}

#[derive(Deserialize, Default)]
struct GenerateSummaryRequest {
    transcript: Option<String>,
}

#[derive(Deserialize, Default)]
struct TranscriptQuestionRequest {
    transcript: Option<String>,
    question: Option<String>,
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Parse a JSON body, falling back to an empty request.
fn lenient_json<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

/// Run `handler` in a request span with a cancellation token that fires
/// if the handler future is dropped before completion.
async fn in_request<F, Fut>(route: &'static str, handler: F) -> Result<String, RequestError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<String, RequestError>>,
{
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let span = info_span!("request", id = %Uuid::new_v4(), route);

    async move {
        let result = handler(cancel).await;
        match &result {
            Ok(_) => info!("Request succeeded"),
            Err(e) => info!(error = %e, "Request failed"),
        }
        result
    }
    .instrument(span)
    .await
}

fn reply<T: Serialize>(result: Result<String, RequestError>, wrap: fn(String) -> T) -> Response {
    match result {
        Ok(text) => Json(wrap(text)).into_response(),
        Err(e) => Json(ErrorResponse {
            error: e.to_string(),
        })
        .into_response(),
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "api": "vidbrief",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn get_summary(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Response {
    // An unreadable query string counts as one with no parameters.
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let result = in_request("/get_summary", |cancel| async move {
        state
            .coordinator
            .summarize_by_url(query.video_url.as_deref(), &cancel)
            .await
    })
    .await;
    reply(result, |summary| SummaryResponse { summary })
}

async fn ask_question(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: AskQuestionRequest = lenient_json(&body);
    let result = in_request("/ask_question", |cancel| async move {
        state
            .coordinator
            .answer_by_url(req.video_url.as_deref(), req.question.as_deref(), &cancel)
            .await
    })
    .await;
    reply(result, |answer| AnswerResponse { answer })
}

async fn generate_summary(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: GenerateSummaryRequest = lenient_json(&body);
    let result = in_request("/generate_summary", |_| async move {
        state
            .coordinator
            .summarize_transcript(req.transcript.as_deref())
            .await
    })
    .await;
    reply(result, |summary| SummaryResponse { summary })
}

async fn answer_question_with_transcript(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    let req: TranscriptQuestionRequest = lenient_json(&body);
    let result = in_request("/answer_question_with_transcript", |_| async move {
        state
            .coordinator
            .answer_transcript(req.transcript.as_deref(), req.question.as_deref())
            .await
    })
    .await;
    reply(result, |answer| AnswerResponse { answer })
}
