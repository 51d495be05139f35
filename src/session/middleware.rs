//! Middleware that loads the session for a request, ends it when it has been
//! idle for too long, and saves it afterwards.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    AppState, Error,
    auth::build_log_in_redirect_url,
    endpoints,
    session::{
        activity::{Activity, check_activity, format_timestamp, is_exempt_path},
        cookie::{get_session_id, invalidate_session_cookie, set_session_cookie},
        realm::Realm,
        store::{SessionData, SessionStore, SqliteSessionStore},
    },
    user::UserID,
};

/// The default time a session may be idle before it is ended.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::minutes(60);

/// Settings for session handling.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// How long a logged in session may go without a request before it is ended.
    pub idle_timeout: Duration,
}

impl SessionConfig {
    pub fn from_minutes(idle_timeout_minutes: u32) -> Self {
        Self {
            idle_timeout: Duration::minutes(idle_timeout_minutes.into()),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// The state needed for the session middleware.
#[derive(Debug, Clone)]
pub struct SessionState<S> {
    pub store: S,
    /// The key to be used for encrypting the session cookies.
    pub cookie_key: Key,
    pub config: SessionConfig,
}

impl FromRef<AppState> for SessionState<SqliteSessionStore> {
    fn from_ref(state: &AppState) -> Self {
        Self {
            store: SqliteSessionStore::new(state.db_connection.clone()),
            cookie_key: state.cookie_key.clone(),
            config: state.session_config.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    /// The ID the session was loaded with, `None` for a new session.
    id: Option<String>,
    data: SessionData,
    /// Save the session under a new ID and delete the old one.
    cycle_id: bool,
    /// Delete the stored session and its cookie.
    flushed: bool,
}

/// The session for the current request.
///
/// Handlers behind the session middleware can take this as an argument to
/// log users in or out. Changes are saved when the response is sent.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    fn new(id: Option<String>, data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                id,
                data,
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        // A panic while holding the lock cannot leave the data half written.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The logged in user, if any.
    pub fn user_id(&self) -> Option<UserID> {
        self.lock().data.user_id
    }

    /// The RFC 3339 timestamp of the last request made with this session.
    pub fn last_activity(&self) -> Option<String> {
        self.lock().data.last_activity.clone()
    }

    /// Log in `user_id`, replacing any existing session data.
    ///
    /// The session ID is changed so an ID known before logging in cannot be used afterwards.
    pub fn log_in(&self, user_id: UserID) {
        let mut inner = self.lock();
        inner.data = SessionData {
            user_id: Some(user_id),
            last_activity: format_timestamp(OffsetDateTime::now_utc()).ok(),
        };
        inner.cycle_id = true;
        inner.flushed = false;
    }

    /// Clear the session data and delete the session.
    pub fn flush(&self) {
        let mut inner = self.lock();
        inner.data = SessionData::default();
        inner.cycle_id = false;
        inner.flushed = true;
    }

    fn touch(&self, now: OffsetDateTime) {
        match format_timestamp(now) {
            Ok(timestamp) => self.lock().data.last_activity = Some(timestamp),
            Err(error) => tracing::error!("Could not format session timestamp: {error}"),
        }
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            tracing::error!("Session requested for {} without the session layer", parts.uri);
            Error::SessionDataError("the session middleware is not installed".to_owned())
        })
    }
}

/// Middleware that provides the [Session] for a request.
///
/// The session cookie is chosen by the request path, see [Realm]. Logged in
/// sessions that have been idle for longer than the configured timeout are
/// flushed and the client is redirected to the realm's log-in page, unless
/// the path is exempt. Anonymous requests are passed through untouched.
pub async fn session_middleware<S: SessionStore>(
    State(state): State<SessionState<S>>,
    mut request: Request,
    next: Next,
) -> Response {
    let inbound_realm = Realm::for_path(request.uri().path(), endpoints::ADMIN_PREFIX);
    let jar = PrivateCookieJar::from_headers(request.headers(), state.cookie_key.clone());
    let session = load_session(&state.store, get_session_id(&jar, inbound_realm));

    if let Some(user_id) = session.user_id() {
        let now = OffsetDateTime::now_utc();
        let path_is_exempt = is_exempt_path(request.uri().path());
        let last_activity = session.last_activity();

        match check_activity(
            last_activity.as_deref(),
            now,
            state.config.idle_timeout,
            path_is_exempt,
        ) {
            Activity::Expired => {
                tracing::info!("Session for user {user_id} expired after being idle.");
                session.flush();

                let redirect_url = build_log_in_redirect_url(
                    request.uri(),
                    request.headers(),
                    inbound_realm.log_in_path(),
                    endpoints::DASHBOARD_VIEW,
                );
                let response = if request.uri().path().starts_with("/api") {
                    (HxRedirect(redirect_url), StatusCode::OK).into_response()
                } else {
                    Redirect::to(&redirect_url).into_response()
                };

                let outbound_realm = Realm::for_path(request.uri().path(), endpoints::ADMIN_PREFIX);
                return save_session(&state.store, outbound_realm, &session, jar, response);
            }
            Activity::Active => session.touch(now),
        }
    }

    let path = request.uri().path().to_owned();
    request.extensions_mut().insert(session.clone());
    let response = next.run(request).await;

    let outbound_realm = Realm::for_path(&path, endpoints::ADMIN_PREFIX);
    save_session(&state.store, outbound_realm, &session, jar, response)
}

fn load_session(store: &impl SessionStore, session_id: Option<String>) -> Session {
    let Some(session_id) = session_id else {
        return Session::default();
    };

    match store.load(&session_id) {
        Ok(Some(data)) => Session::new(Some(session_id), data),
        Ok(None) => Session::default(),
        Err(error) => {
            tracing::error!("Could not load session, starting a new one: {error}");
            Session::default()
        }
    }
}

fn save_session(
    store: &impl SessionStore,
    realm: Realm,
    session: &Session,
    jar: PrivateCookieJar,
    response: Response,
) -> Response {
    let (old_id, data, cycle_id, flushed) = {
        let inner = session.lock();
        (inner.id.clone(), inner.data.clone(), inner.cycle_id, inner.flushed)
    };

    if let Some(old_id) = &old_id {
        if cycle_id || flushed {
            if let Err(error) = store.delete(old_id) {
                tracing::error!("Could not delete session: {error}");
            }
        }
    }

    let jar = if data.user_id.is_some() {
        let session_id = match old_id {
            Some(old_id) if !cycle_id => old_id,
            _ => Uuid::new_v4().to_string(),
        };

        match store.save(&session_id, &data) {
            Ok(()) => set_session_cookie(jar, realm, session_id),
            Err(error) => {
                tracing::error!("Could not save session: {error}");
                jar
            }
        }
    } else if flushed {
        invalidate_session_cookie(jar, realm)
    } else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}
