use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value as JsonValue};

use crate::{error::Result, AppState};

/// Ingress for Easypost event notifications. Any JSON body is accepted and
/// stored; failures are recorded on the call and answered with `{"error": ..}`.
pub async fn handle_webhook(
    State(state): State<AppState>,
    Json(payload): Json<JsonValue>,
) -> Result<(StatusCode, Json<JsonValue>)> {
    let call = state.processor.receive(payload).await?;

    Ok((StatusCode::OK, Json(json!({ "ok": true, "id": call.id }))))
}
