use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::analysis::stabilizer::StabilizerPhase;
use crate::dispatch::DispatchOutput;
use crate::engine::core::{GesturePipeline, SampleView};
use crate::ingest::IngestStats;
use crate::telemetry::TelemetrySnapshot;

use super::sse;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub pipeline: Arc<GesturePipeline>,
}

impl HttpState {
    pub fn new(pipeline: Arc<GesturePipeline>) -> Self {
        Self { pipeline }
    }
}

/// Query payload for `/output`.
#[derive(Debug, Default, Deserialize)]
pub struct OutputQuery {
    pub lang: Option<String>,
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    BadRequest(&'static str),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub polling: bool,
    pub polls: u64,
    pub sequence: u64,
    pub live: bool,
}

/// Metrics endpoint response payload.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub epoch: u64,
    pub language: String,
    pub phase: StabilizerPhase,
    pub ingest: IngestStats,
    pub telemetry: TelemetrySnapshot,
}

/// Ingest endpoint acknowledgement.
#[derive(Debug, Serialize)]
pub struct IngestAck {
    pub accepted: usize,
    pub sequence: u64,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/output", get(output))
        .route("/sample", get(sample))
        .route("/metrics", get(metrics))
        .route("/ingest", post(ingest))
        .route("/stream", get(output_stream_handler))
        .route("/events", get(event_stream_handler))
        .with_state(state)
}

/// Run the HTTP server until `shutdown` turns true.
pub async fn run_http_server(
    state: HttpState,
    addr: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding HTTP listener on {addr}"))?;
    log::info!("[Http] serving on {}", addr);
    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .context("serving HTTP router")?;
    log::info!("[Http] server stopped");
    Ok(())
}

pub async fn health(State(state): State<HttpState>) -> Json<HealthResponse> {
    let view = state.pipeline.sample_view();
    Json(HealthResponse {
        status: "ok",
        polling: state.pipeline.is_running(),
        polls: state.pipeline.polls(),
        sequence: view.stored.sequence,
        live: view.live,
    })
}

/// Latest output; `?lang=` renders it in that language and switches the
/// language for later confirmations.
pub async fn output(
    State(state): State<HttpState>,
    Query(query): Query<OutputQuery>,
) -> Result<Json<DispatchOutput>, HttpServerError> {
    let dispatcher = state.pipeline.dispatcher();
    match query.lang.as_deref() {
        Some(lang) if lang.trim().is_empty() => {
            Err(HttpServerError::BadRequest("lang must not be empty"))
        }
        Some(lang) => {
            dispatcher.set_language(lang);
            Ok(Json(dispatcher.latest_in(lang)))
        }
        None => Ok(Json(dispatcher.latest())),
    }
}

pub async fn sample(State(state): State<HttpState>) -> Json<SampleView> {
    Json(state.pipeline.sample_view())
}

pub async fn metrics(State(state): State<HttpState>) -> Json<MetricsResponse> {
    let pipeline = &state.pipeline;
    let dispatcher = pipeline.dispatcher();
    Json(MetricsResponse {
        epoch: dispatcher.epoch(),
        language: dispatcher.language(),
        phase: pipeline.stabilizer_phase(),
        ingest: pipeline.adapter().stats(),
        telemetry: pipeline.telemetry().snapshot(),
    })
}

/// Feed raw sample lines through the same path as the socket transports.
pub async fn ingest(
    State(state): State<HttpState>,
    body: String,
) -> Result<Json<IngestAck>, HttpServerError> {
    if body.trim().is_empty() {
        return Err(HttpServerError::BadRequest("body must contain sample lines"));
    }
    let adapter = state.pipeline.adapter();
    let accepted = adapter.ingest_chunk(&body);
    if accepted == 0 {
        return Err(HttpServerError::BadRequest("no valid sample lines"));
    }
    Ok(Json(IngestAck {
        accepted,
        sequence: adapter.store().sequence(),
    }))
}

pub async fn output_stream_handler(State(state): State<HttpState>) -> sse::EventStream {
    sse::outputs(&state.pipeline)
}

pub async fn event_stream_handler(State(state): State<HttpState>) -> sse::EventStream {
    sse::pipeline_events(&state.pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::dispatch::PassthroughEnhancer;
    use crate::telemetry::{GestureSource, TelemetryHub};

    fn make_pipeline() -> Arc<GesturePipeline> {
        let mut config = AppConfig::default();
        config.dispatch.enhance = false;
        Arc::new(
            GesturePipeline::new(
                config,
                Arc::new(PassthroughEnhancer),
                Arc::new(TelemetryHub::default()),
            )
            .expect("default config is valid"),
        )
    }

    fn make_router(pipeline: &Arc<GesturePipeline>) -> Router {
        build_router(HttpState::new(Arc::clone(pipeline)))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("GET request")
    }

    async fn response_json(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body bytes");
        let json = serde_json::from_slice::<Value>(&bytes).expect("JSON body");
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_no_sample_yet() {
        let pipeline = make_pipeline();
        let (status, json) = response_json(
            make_router(&pipeline)
                .oneshot(get_request("/health"))
                .await
                .expect("health call"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["sequence"], 0);
        assert_eq!(json["live"], false);
        assert_eq!(json["polling"], false);
    }

    #[tokio::test]
    async fn output_starts_waiting() {
        let pipeline = make_pipeline();
        let (status, json) = response_json(
            make_router(&pipeline)
                .oneshot(get_request("/output"))
                .await
                .expect("output call"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sentence_text"], crate::dispatch::WAITING_SENTENCE);
        assert_eq!(json["epoch"], 0);
        assert!(json["gesture_label"].is_null());
    }

    #[tokio::test]
    async fn output_lang_applies_to_next_confirmation() {
        let pipeline = make_pipeline();
        let (status, json) = response_json(
            make_router(&pipeline)
                .oneshot(get_request("/output?lang=hi"))
                .await
                .expect("output call"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // Nothing confirmed yet: still the waiting output
        assert!(json["gesture_label"].is_null());
        assert_eq!(json["sentence_text"], crate::dispatch::WAITING_SENTENCE);

        pipeline
            .dispatcher()
            .confirm("HELLO", GestureSource::Posture);
        let (_, json) = response_json(
            make_router(&pipeline)
                .oneshot(get_request("/output"))
                .await
                .expect("output call"),
        )
        .await;
        assert_eq!(json["language"], "hi");
        assert_eq!(json["gesture_label"], "HELLO");
        assert_eq!(json["epoch"], 1);
    }

    #[tokio::test]
    async fn output_lang_re_resolves_published_sentence() {
        let pipeline = make_pipeline();
        pipeline
            .dispatcher()
            .confirm("HELLO", GestureSource::Posture);

        let (status, json) = response_json(
            make_router(&pipeline)
                .oneshot(get_request("/output?lang=mr"))
                .await
                .expect("output call"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["language"], "mr");
        assert_eq!(json["sentence_text"], "नमस्कार, मी यश आहे.");
        assert_eq!(json["gesture_label"], "HELLO");
        assert_eq!(json["epoch"], 1);
        assert_eq!(json["source"], "TEMPLATE");

        // Each poll renders in its own language
        let (_, json) = response_json(
            make_router(&pipeline)
                .oneshot(get_request("/output?lang=en"))
                .await
                .expect("output call"),
        )
        .await;
        assert_eq!(json["language"], "en");
        assert_eq!(json["sentence_text"], "Hello, I am Yash.");
        assert_eq!(pipeline.dispatcher().epoch(), 1);
    }

    #[tokio::test]
    async fn output_rejects_empty_lang() {
        let pipeline = make_pipeline();
        let (status, json) = response_json(
            make_router(&pipeline)
                .oneshot(get_request("/output?lang=%20"))
                .await
                .expect("output call"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "lang must not be empty");
    }

    #[tokio::test]
    async fn ingest_then_sample_shows_breakdown() {
        let pipeline = make_pipeline();
        let (status, json) = response_json(
            make_router(&pipeline)
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/ingest")
                        .body(Body::from("FLEX:1,2,3,4,5|ACC:0,0,1|GYR:0,0,0\nbogus\n"))
                        .expect("ingest request"),
                )
                .await
                .expect("ingest call"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["accepted"], 1);
        assert_eq!(json["sequence"], 1);

        let (status, json) = response_json(
            make_router(&pipeline)
                .oneshot(get_request("/sample"))
                .await
                .expect("sample call"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sequence"], 1);
        assert_eq!(json["live"], true);
        assert!(json["classification"]["fingers"].is_array());
    }

    #[tokio::test]
    async fn ingest_rejects_garbage() {
        let pipeline = make_pipeline();
        let (status, json) = response_json(
            make_router(&pipeline)
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/ingest")
                        .body(Body::from("not,a,sample"))
                        .expect("ingest request"),
                )
                .await
                .expect("ingest call"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "no valid sample lines");
        assert_eq!(pipeline.adapter().stats().rejected, 1);
    }

    #[tokio::test]
    async fn metrics_include_counters() {
        let pipeline = make_pipeline();
        pipeline.adapter().ingest_line("1,2,3");
        pipeline
            .dispatcher()
            .confirm("I", GestureSource::Posture);

        let (status, json) = response_json(
            make_router(&pipeline)
                .oneshot(get_request("/metrics"))
                .await
                .expect("metrics call"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["epoch"], 1);
        assert_eq!(json["ingest"]["rejected"], 1);
        assert_eq!(json["telemetry"]["counters"]["lines_rejected"], 1);
        assert_eq!(json["telemetry"]["counters"]["confirmations"], 1);
        assert_eq!(json["phase"]["phase"], "WAITING");
    }

    #[tokio::test]
    async fn stream_endpoint_is_event_stream() {
        let pipeline = make_pipeline();
        let response = make_router(&pipeline)
            .oneshot(get_request("/stream"))
            .await
            .expect("stream call");

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/event-stream"));
    }
}
