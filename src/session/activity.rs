//! Idle timeout tracking for logged in sessions.

use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};

use crate::endpoints;

/// Whether a logged in session may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// The session is in use, its last activity should be set to now.
    Active,
    /// The session was idle for longer than the timeout and must be flushed.
    Expired,
}

/// Decide whether a session with the recorded `last_activity` has expired.
///
/// A missing timestamp counts as active. So does a malformed one, which is
/// logged and then overwritten by the caller. Requests to exempt paths never
/// expire a session.
pub fn check_activity(
    last_activity: Option<&str>,
    now: OffsetDateTime,
    idle_timeout: Duration,
    path_is_exempt: bool,
) -> Activity {
    let Some(raw_timestamp) = last_activity else {
        return Activity::Active;
    };

    let last_activity = match parse_timestamp(raw_timestamp) {
        Ok(timestamp) => timestamp,
        Err(error) => {
            tracing::warn!(
                "Resetting malformed session timestamp \"{raw_timestamp}\": {error}"
            );
            return Activity::Active;
        }
    };

    if now - last_activity > idle_timeout && !path_is_exempt {
        Activity::Expired
    } else {
        Activity::Active
    }
}

/// Whether requests to `path` are exempt from the idle timeout.
///
/// These are the log-in and log-out routes for both realms and the
/// keepalive route.
pub fn is_exempt_path(path: &str) -> bool {
    [
        endpoints::LOG_IN_VIEW,
        endpoints::LOG_IN_API,
        endpoints::LOG_OUT,
        endpoints::KEEPALIVE,
        endpoints::ADMIN_LOG_OUT,
    ]
    .contains(&path)
        || path.starts_with(endpoints::ADMIN_LOG_IN)
}

pub fn format_timestamp(timestamp: OffsetDateTime) -> Result<String, time::error::Format> {
    timestamp.format(&Rfc3339)
}

pub fn parse_timestamp(raw_timestamp: &str) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(raw_timestamp, &Rfc3339)
}
