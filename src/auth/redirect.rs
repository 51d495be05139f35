//! Helpers for the `next` URL that sends a user back where they were after logging in.

use axum::http::{HeaderMap, Uri};
use tracing::{error, warn};

use crate::endpoints;

/// The query parameter holding the URL to return to after logging in.
pub const NEXT_PARAM: &str = "next";

fn is_safe_redirect_url(redirect_url: &str) -> bool {
    if !redirect_url.starts_with('/') || redirect_url.starts_with("//") {
        return false;
    }

    let path = redirect_url
        .split_once('?')
        .map(|(path, _)| path)
        .unwrap_or(redirect_url);

    path != endpoints::LOG_IN_VIEW && path != endpoints::ADMIN_LOG_IN
}

/// Reduce `raw_url` to a path and query on this site.
///
/// Returns `None` for absolute URLs, protocol relative URLs and the log-in
/// pages, so a crafted `next` parameter cannot send users to another site.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_url(path_and_query).then(|| path_and_query.to_owned())
}

// HTMX sends the full URL of the page, so the host is dropped here.
fn normalize_hx_current_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_url(path_and_query).then(|| path_and_query.to_owned())
}

/// The URL of `log_in_path` with a `next` parameter pointing back at the request.
///
/// For `/api` requests the page the user was on is taken from the
/// `HX-Current-URL` header. If no safe target can be found the user is sent
/// back to `fallback` after logging in.
pub fn build_log_in_redirect_url(
    uri: &Uri,
    headers: &HeaderMap,
    log_in_path: &str,
    fallback: &str,
) -> String {
    let target = if uri.path().starts_with("/api") {
        redirect_target_from_hx_headers(headers)
    } else {
        uri.path_and_query()
            .and_then(|path_and_query| normalize_redirect_url(path_and_query.as_str()))
    };

    let target = target.unwrap_or_else(|| {
        warn!("No safe redirect target for {uri}, falling back to {fallback}.");
        fallback.to_owned()
    });

    build_log_in_redirect_url_from_target(log_in_path, &target)
}

pub fn build_log_in_redirect_url_from_target(log_in_path: &str, target: &str) -> String {
    match serde_urlencoded::to_string([(NEXT_PARAM, target)]) {
        Ok(param) => format!("{log_in_path}?{param}"),
        Err(err) => {
            error!("Could not encode redirect URL {target}: {err}");
            log_in_path.to_owned()
        }
    }
}

fn redirect_target_from_hx_headers(headers: &HeaderMap) -> Option<String> {
    let hx_request = headers
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .map(|header| header.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if !hx_request {
        warn!("Missing HX-Request header for /api request.");
        return None;
    }

    let current_url = headers
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())?;

    let redirect_url = normalize_hx_current_url(current_url);
    if redirect_url.is_none() {
        warn!("Invalid HX-Current-URL header value: {current_url}");
    }

    redirect_url
}
