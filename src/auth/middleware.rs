//! Authentication middleware that checks the session has a logged in user and handles redirects.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::build_log_in_redirect_url,
    endpoints,
    session::Session,
    user::{UserID, get_user_by_id},
};

fn logged_in_user(request: &Request) -> Option<UserID> {
    match request.extensions().get::<Session>() {
        Some(session) => session.user_id(),
        None => {
            tracing::error!(
                "Auth guard on {} is not behind the session layer.",
                request.uri()
            );
            None
        }
    }
}

#[inline]
async fn auth_guard_internal(
    mut request: Request,
    next: Next,
    get_redirect: impl Fn(String) -> Response,
) -> Response {
    let Some(user_id) = logged_in_user(&request) else {
        let redirect_url = build_log_in_redirect_url(
            request.uri(),
            request.headers(),
            endpoints::LOG_IN_VIEW,
            endpoints::DASHBOARD_VIEW,
        );
        return get_redirect(redirect_url);
    };

    request.extensions_mut().insert(user_id);
    next.run(request).await
}

/// Middleware function that checks the session belongs to a logged in user.
/// The user ID is placed into request and then the request executed normally if there is one, otherwise a redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
///
/// **Note**: Must be layered inside the session middleware.
pub async fn auth_guard(request: Request, next: Next) -> Response {
    auth_guard_internal(request, next, |redirect_url| {
        Redirect::to(&redirect_url).into_response()
    })
    .await
}

/// Same as [auth_guard], but the redirect is sent as a HTMX redirect.
pub async fn auth_guard_hx(request: Request, next: Next) -> Response {
    auth_guard_internal(request, next, |redirect_url| {
        (HxRedirect(redirect_url), StatusCode::OK).into_response()
    })
    .await
}

/// The state needed for the staff guard.
#[derive(Debug, Clone)]
pub struct StaffGuardState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for StaffGuardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Middleware for the admin pages: only staff users may pass.
///
/// Anyone else is sent to the admin log-in page. The user ID is placed into
/// the request like [auth_guard] does.
pub async fn staff_guard(
    State(state): State<StaffGuardState>,
    mut request: Request,
    next: Next,
) -> Response {
    let redirect_to_log_in = |request: &Request| {
        let redirect_url = build_log_in_redirect_url(
            request.uri(),
            request.headers(),
            endpoints::ADMIN_LOG_IN,
            endpoints::ADMIN_VIEW,
        );
        Redirect::to(&redirect_url).into_response()
    };

    let Some(user_id) = logged_in_user(&request) else {
        return redirect_to_log_in(&request);
    };

    let is_staff = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match get_user_by_id(user_id, &connection) {
            Ok(user) => user.is_staff,
            Err(Error::NotFound) => false,
            Err(error) => {
                tracing::error!("Could not get user {user_id}: {error}");
                return error.into_response();
            }
        }
    };

    if !is_staff {
        tracing::warn!("User {user_id} is not staff, redirecting to admin log-in.");
        return redirect_to_log_in(&request);
    }

    request.extensions_mut().insert(user_id);
    next.run(request).await
}
