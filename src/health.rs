//! Liveness probe for load balancers and uptime checks.

use axum::Json;
use serde_json::{Value, json};

/// Report that the server is up.
///
/// Mounted outside the session layer, so it never reads or writes a session.
pub async fn get_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
