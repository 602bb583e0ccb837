use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use serde_json::{Value, json};
use tokio::{
    net::TcpListener,
    signal::unix::{SignalKind, signal},
};

use crate::{
    config::Config,
    gateway::{
        backend::GeminiBackend, dispatcher::ActionDispatcher, gateway::ActionGateway,
        rate_limit::FixedWindowLimiter,
    },
};

const ALLOWED_METHODS: &str = "POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

#[derive(Clone)]
struct AppState {
    gateway: Arc<ActionGateway>,
    allowed_origins: Arc<Vec<String>>,
}

/// Wires the process-scoped gateway from configuration: backend client,
/// dispatcher, and the rate limiter singleton. The credential is resolved
/// once here; per-request handling only checks its presence.
pub fn build_gateway(config: &Config) -> ActionGateway {
    let credential = config.gateway.credential.resolve();
    let backend = Arc::new(GeminiBackend::new(
        config.gateway.endpoint.clone(),
        credential.clone().unwrap_or_default(),
        config.gateway.request_timeout_ms,
    ));
    let dispatcher = ActionDispatcher::new(
        backend,
        config.gateway.models.clone(),
        config.gateway.thinking_budget,
    );
    let limiter = Arc::new(FixedWindowLimiter::new(config.gateway.rate_limit.clone()));
    ActionGateway::new(limiter, dispatcher, credential.is_some())
}

pub async fn run(config: Config) -> Result<()> {
    let state = AppState {
        gateway: Arc::new(build_gateway(&config)),
        allowed_origins: Arc::new(config.http.allowed_origins.clone()),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/", any(handle_action))
        .with_state(state);

    let listener = TcpListener::bind(&config.http.bind_addr)
        .await
        .with_context(|| format!("unable to bind {}", config.http.bind_addr))?;
    tracing::info!(target: "server", bind_addr = %config.http.bind_addr, "listening");

    let mut sigint = signal(SignalKind::interrupt()).context("unable to listen for SIGINT")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => tracing::info!(target: "server", "received SIGINT, shutting down"),
            _ = sigterm.recv() => tracing::info!(target: "server", "received SIGTERM, shutting down"),
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server terminated unexpectedly")
}

async fn healthz() -> &'static str {
    "ok"
}

async fn handle_action(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let cors = cors_headers(&state.allowed_origins, &headers);

    if method == Method::OPTIONS {
        return with_cors(StatusCode::OK, None, cors);
    }

    if method != Method::POST {
        return with_cors(
            StatusCode::METHOD_NOT_ALLOWED,
            Some(json!({ "error": "Method not allowed" })),
            cors,
        );
    }

    // A body that is not JSON at all flows into validation as null and is
    // rejected there, keeping one error path for malformed input.
    let parsed = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    let identifier = client_identifier(&headers);

    match state.gateway.handle(&identifier, &parsed).await {
        Ok(reply) => match serde_json::to_value(&reply) {
            Ok(body) => with_cors(StatusCode::OK, Some(body), cors),
            Err(err) => {
                tracing::error!(target: "server", error = %err, "reply serialization failed");
                with_cors(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Some(json!({ "error": "Failed to process AI request." })),
                    cors,
                )
            }
        },
        Err(err) => {
            let status = StatusCode::from_u16(err.http_status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            with_cors(status, Some(json!({ "error": err.message })), cors)
        }
    }
}

/// Fixed CORS headers plus `Access-Control-Allow-Origin`, echoed only when
/// the request origin is on the configured allow-list.
fn cors_headers(allowed_origins: &[String], headers: &HeaderMap) -> HeaderMap {
    let mut cors = HeaderMap::new();
    cors.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    cors.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    cors.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );

    if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        if allowed_origins.iter().any(|allowed| allowed == origin) {
            if let Ok(value) = HeaderValue::from_str(origin) {
                cors.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
            }
        }
    }

    cors
}

fn with_cors(status: StatusCode, body: Option<Value>, cors: HeaderMap) -> Response {
    let mut response = match body {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    };
    response.headers_mut().extend(cors);
    response
}

/// Opaque rate-limit identifier from caller-identifying request metadata.
fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    "unknown".to_string()
}
