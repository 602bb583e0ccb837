use serde_json::Value;

use crate::gateway::{
    error::{GatewayError, validation},
    types::{ActionKind, ActionRequest},
};

/// Structural validation of the incoming envelope. Per-action payload shape
/// is the dispatcher's responsibility; failures there surface as Unknown
/// errors, not validation errors.
pub fn validate(body: &Value) -> Result<ActionRequest, GatewayError> {
    let Some(object) = body.as_object() else {
        return Err(validation("Request body must be a JSON object"));
    };

    let Some(action_text) = object.get("action").and_then(Value::as_str) else {
        return Err(validation("Missing or invalid action"));
    };

    let Some(action) = ActionKind::from_wire(action_text) else {
        return Err(validation(format!("Invalid action: {action_text}")));
    };

    let payload = match object.get("payload") {
        Some(value) if !value.is_null() => value.clone(),
        _ => return Err(validation("Missing payload")),
    };

    Ok(ActionRequest { action, payload })
}
