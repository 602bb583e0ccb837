use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::gateway::{
    classifier::{self, UNKNOWN_FAILURE_MESSAGE},
    dispatcher::{ActionDispatcher, DispatchError},
    error::{GatewayError, GatewayErrorKind, not_implemented, rate_limited, unconfigured},
    normalizer,
    rate_limit::RateLimiter,
    types::{ActionKind, ActionReply},
    validator,
};

/// The request pipeline. Stage ordering is part of the contract: rate
/// limit, then envelope validation, then the credential check, then
/// sanitize-and-dispatch, then normalization. Exactly one reply per
/// request; the backend is never retried.
pub struct ActionGateway {
    limiter: Arc<dyn RateLimiter>,
    dispatcher: ActionDispatcher,
    credential_configured: bool,
}

impl ActionGateway {
    pub fn new(
        limiter: Arc<dyn RateLimiter>,
        dispatcher: ActionDispatcher,
        credential_configured: bool,
    ) -> Self {
        Self {
            limiter,
            dispatcher,
            credential_configured,
        }
    }

    pub async fn handle(&self, identifier: &str, body: &Value) -> Result<ActionReply, GatewayError> {
        let request_id = Uuid::now_v7().to_string();

        if !self.limiter.check(identifier).await {
            tracing::warn!(
                target: "gateway",
                request_id = %request_id,
                identifier = %identifier,
                "request_rate_limited"
            );
            return Err(rate_limited());
        }

        let request = validator::validate(body).map_err(|err| {
            tracing::debug!(
                target: "gateway",
                request_id = %request_id,
                identifier = %identifier,
                error = %err.message,
                "request_rejected"
            );
            err
        })?;

        if !self.credential_configured {
            tracing::error!(
                target: "gateway",
                request_id = %request_id,
                "backend_credential_missing"
            );
            return Err(unconfigured());
        }

        let span = tracing::info_span!(
            target: "gateway",
            "action_request",
            request_id = %request_id,
            action = request.action.as_wire(),
            identifier = %identifier
        );

        let raw = match self
            .dispatcher
            .invoke(request.action, request.payload)
            .instrument(span)
            .await
        {
            Ok(raw) => raw,
            Err(DispatchError::NotImplemented(action)) => {
                tracing::warn!(
                    target: "gateway",
                    request_id = %request_id,
                    action = action.as_wire(),
                    "action_not_implemented"
                );
                return Err(not_implemented(action.as_wire()));
            }
            Err(DispatchError::Payload(err)) => {
                tracing::warn!(
                    target: "gateway",
                    request_id = %request_id,
                    action = request.action.as_wire(),
                    error = %err,
                    "payload_parse_failed"
                );
                return Err(GatewayError::new(
                    GatewayErrorKind::Unknown,
                    500,
                    UNKNOWN_FAILURE_MESSAGE,
                ));
            }
            Err(DispatchError::Backend(err)) => {
                let classified = classifier::classify(&err);
                tracing::warn!(
                    target: "gateway",
                    request_id = %request_id,
                    action = request.action.as_wire(),
                    kind = ?classified.kind,
                    error = %err,
                    "backend_call_failed"
                );
                return Err(classified);
            }
        };

        let mut text = normalizer::extract_text(&raw);
        if request.action == ActionKind::EstimateTime {
            text = text.trim().to_string();
        }

        let sources = (request.action == ActionKind::GenerateGroundedText)
            .then(|| normalizer::extract_sources(&raw));

        tracing::debug!(
            target: "gateway",
            request_id = %request_id,
            action = request.action.as_wire(),
            source_count = sources.as_ref().map(Vec::len).unwrap_or(0),
            "request_completed"
        );

        Ok(ActionReply { text, sources })
    }
}
