//! The route the client pings while the user is active on a page.

use axum::Json;
use serde_json::{Value, json};

/// Acknowledge a keepalive ping.
///
/// The session middleware has already refreshed the session's last activity
/// by the time this runs.
pub async fn keepalive() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
