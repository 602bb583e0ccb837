use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use serde_json::{Value, json};

use studygate::gateway::{
    backend::{BackendCallError, GenerateOptions, GenerativeBackend},
    dispatcher::ActionDispatcher,
    error::GatewayErrorKind,
    gateway::ActionGateway,
    rate_limit::{FixedWindowLimiter, RateLimitSettings},
    types::{ModelRoster, SourceKind},
};

struct CannedBackend {
    response: Value,
    calls: Arc<AtomicUsize>,
}

impl CannedBackend {
    fn text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            response: json!({
                "candidates": [{ "content": { "parts": [{ "text": text }] } }]
            }),
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn raw(response: Value) -> Arc<Self> {
        Arc::new(Self {
            response,
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl GenerativeBackend for CannedBackend {
    async fn generate(
        &self,
        _model: &str,
        _contents: &str,
        _options: &GenerateOptions,
    ) -> Result<Value, BackendCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

struct FailingBackend {
    status: u16,
    body: &'static str,
}

#[async_trait]
impl GenerativeBackend for FailingBackend {
    async fn generate(
        &self,
        _model: &str,
        _contents: &str,
        _options: &GenerateOptions,
    ) -> Result<Value, BackendCallError> {
        Err(BackendCallError::Api {
            status: self.status,
            body: self.body.to_string(),
        })
    }
}

fn gateway_with(backend: Arc<dyn GenerativeBackend>, credential_configured: bool) -> ActionGateway {
    let dispatcher = ActionDispatcher::new(backend, ModelRoster::default(), 8_192);
    let limiter = Arc::new(FixedWindowLimiter::new(RateLimitSettings::default()));
    ActionGateway::new(limiter, dispatcher, credential_configured)
}

fn generate_text_body(prompt: &str) -> Value {
    json!({ "action": "generateText", "payload": { "prompt": prompt } })
}

#[tokio::test]
async fn given_healthy_backend_when_generate_text_then_backend_text_is_returned() {
    let gateway = gateway_with(CannedBackend::text("Backend text"), true);

    let reply = gateway
        .handle("alice", &generate_text_body("Hello"))
        .await
        .expect("healthy request should succeed");

    assert_eq!(reply.text, "Backend text");
    assert!(reply.sources.is_none());
}

#[tokio::test]
async fn given_unknown_action_then_validation_error_echoes_the_value() {
    let gateway = gateway_with(CannedBackend::text("unused"), true);

    let err = gateway
        .handle("alice", &json!({ "action": "bogus", "payload": {} }))
        .await
        .expect_err("unknown action must fail");

    assert_eq!(err.kind, GatewayErrorKind::Validation);
    assert_eq!(err.http_status, 400);
    assert_eq!(err.message, "Invalid action: bogus");
}

#[tokio::test]
async fn given_31_rapid_requests_then_the_31st_is_rate_limited() {
    let gateway = gateway_with(CannedBackend::text("ok"), true);

    for attempt in 0..30 {
        let reply = gateway
            .handle("burst-caller", &generate_text_body("Hello"))
            .await;
        assert!(reply.is_ok(), "attempt {attempt} should be admitted");
    }

    let err = gateway
        .handle("burst-caller", &generate_text_body("Hello"))
        .await
        .expect_err("31st request must be rejected");
    assert_eq!(err.kind, GatewayErrorKind::RateLimited);
    assert_eq!(err.http_status, 429);
}

#[tokio::test]
async fn given_rate_limit_reached_then_rejection_happens_before_validation() {
    let gateway = gateway_with(CannedBackend::text("ok"), true);
    let invalid_body = json!({ "action": "bogus", "payload": {} });

    for _ in 0..30 {
        let err = gateway
            .handle("order-caller", &invalid_body)
            .await
            .expect_err("invalid body must fail validation");
        assert_eq!(err.kind, GatewayErrorKind::Validation);
    }

    // Invalid requests still consume the window, and once it is spent the
    // limiter answers before the validator does.
    let err = gateway
        .handle("order-caller", &invalid_body)
        .await
        .expect_err("31st request must fail");
    assert_eq!(err.kind, GatewayErrorKind::RateLimited);
}

#[tokio::test]
async fn given_missing_credential_then_unconfigured_error_before_any_backend_call() {
    let backend = CannedBackend::text("should never be used");
    let calls = Arc::clone(&backend.calls);
    let gateway = gateway_with(backend, false);

    let err = gateway
        .handle("alice", &generate_text_body("Hello"))
        .await
        .expect_err("unconfigured gateway must refuse dispatch");

    assert_eq!(err.kind, GatewayErrorKind::Unconfigured);
    assert_eq!(err.http_status, 500);
    assert_eq!(err.message, "AI service not configured. Please contact support.");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn given_quota_failure_then_generic_quota_error_without_backend_text() {
    let gateway = gateway_with(
        Arc::new(FailingBackend {
            status: 429,
            body: "RESOURCE_EXHAUSTED: per-project request quota reached",
        }),
        true,
    );

    let err = gateway
        .handle("alice", &generate_text_body("Hello"))
        .await
        .expect_err("quota failure must surface as an error");

    assert_eq!(err.kind, GatewayErrorKind::QuotaExceeded);
    assert_eq!(err.http_status, 429);
    assert!(!err.message.contains("RESOURCE_EXHAUSTED"));
    assert!(!err.message.contains("per-project"));
}

#[tokio::test]
async fn given_auth_failure_then_generic_auth_error() {
    let gateway = gateway_with(
        Arc::new(FailingBackend {
            status: 400,
            body: "API key not valid. Please pass a valid API key.",
        }),
        true,
    );

    let err = gateway
        .handle("alice", &generate_text_body("Hello"))
        .await
        .expect_err("auth failure must surface as an error");

    assert_eq!(err.kind, GatewayErrorKind::AuthFailure);
    assert_eq!(err.http_status, 500);
    assert_eq!(err.message, "AI service authentication failed");
}

#[tokio::test]
async fn given_safety_blocked_response_then_sentinel_is_a_success_not_an_error() {
    let gateway = gateway_with(
        CannedBackend::raw(json!({
            "candidates": [{
                "finishReason": "SAFETY",
                "content": { "parts": [{ "text": "partial output" }] }
            }]
        })),
        true,
    );

    let reply = gateway
        .handle("alice", &generate_text_body("Hello"))
        .await
        .expect("blocked response must still answer successfully");
    assert_eq!(reply.text, "[Content generation blocked: SAFETY]");
}

#[tokio::test]
async fn given_malformed_backend_response_then_sentinel_is_a_success_not_an_error() {
    let gateway = gateway_with(CannedBackend::raw(json!({ "candidates": "garbled" })), true);

    let reply = gateway
        .handle("alice", &generate_text_body("Hello"))
        .await
        .expect("malformed response must degrade to sentinel text");
    assert_eq!(reply.text, "[Error processing AI response]");
}

#[tokio::test]
async fn given_estimate_time_then_reply_text_is_trimmed() {
    let gateway = gateway_with(CannedBackend::text("  about 3 hours\n"), true);

    let reply = gateway
        .handle(
            "alice",
            &json!({
                "action": "estimateTime",
                "payload": {
                    "assignmentName": "Lab report",
                    "description": "Sections 1-3",
                    "points": 10.0
                }
            }),
        )
        .await
        .expect("estimate request should succeed");
    assert_eq!(reply.text, "about 3 hours");
}

#[tokio::test]
async fn given_grounded_action_then_sources_ride_along_with_the_text() {
    let gateway = gateway_with(
        CannedBackend::raw(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Grounded answer" }] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://a.example", "title": "A" } },
                    { "maps": { "uri": "https://maps.example/p1" } }
                ] }
            }]
        })),
        true,
    );

    let reply = gateway
        .handle(
            "alice",
            &json!({
                "action": "generateGroundedText",
                "payload": { "prompt": "Where can I study nearby?" }
            }),
        )
        .await
        .expect("grounded request should succeed");

    assert_eq!(reply.text, "Grounded answer");
    let sources = reply.sources.expect("grounded replies carry sources");
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].kind, SourceKind::Web);
    assert_eq!(sources[1].kind, SourceKind::Map);
    assert_eq!(sources[1].title, "Untitled Place");
}

#[tokio::test]
async fn given_undispatched_action_then_error_is_distinct_from_validation() {
    let gateway = gateway_with(CannedBackend::text("unused"), true);

    let err = gateway
        .handle(
            "alice",
            &json!({ "action": "analyzeImage", "payload": {} }),
        )
        .await
        .expect_err("undispatched action must be rejected");

    assert_eq!(err.kind, GatewayErrorKind::NotImplemented);
    assert_eq!(err.http_status, 400);
    assert_eq!(err.message, "Action not implemented: analyzeImage");
}

#[tokio::test]
async fn given_payload_missing_required_field_then_failure_is_unknown_not_validation() {
    let gateway = gateway_with(CannedBackend::text("unused"), true);

    let err = gateway
        .handle(
            "alice",
            &json!({ "action": "generateText", "payload": { "question": "hi" } }),
        )
        .await
        .expect_err("payload mismatch must fail");

    assert_eq!(err.kind, GatewayErrorKind::Unknown);
    assert_eq!(err.http_status, 500);
}
