//! This file defines the routes for displaying the log-in page and handling log-in requests.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::{google::google_sign_in_button, normalize_redirect_url},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, loading_spinner,
        log_in_card, password_input,
    },
    session::Session,
    user::{User, get_user_by_username},
};

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Incorrect username or password.";

/// The state needed for the log-in page and endpoint.
#[derive(Debug, Clone)]
pub struct LogInState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// Shows the Google sign-in button when set.
    pub google_client_id: Option<String>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            google_client_id: state.google_client_id.clone(),
        }
    }
}

/// The `next` query parameter of the log-in pages.
#[derive(Debug, Default, Deserialize)]
pub struct LogInQuery {
    pub next: Option<String>,
}

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password hash in the database.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    pub username: String,
    pub password: String,
    /// Optional URL to redirect to after logging in.
    pub next: Option<String>,
}

/// Drop `raw_url` unless it is a path on this site.
pub(crate) fn parse_next_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(next_url) => Some(next_url),
        None => {
            if let Some(next_url) = raw_url.filter(|url| !url.is_empty()) {
                tracing::warn!("Invalid redirect URL from {source}: {next_url}");
            }
            None
        }
    }
}

fn log_in_form(username: &str, error_message: Option<&str>, next: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-target-error="#alert-container"
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(next) = next {
                input type="hidden" name="next" value=(next);
            }

            div
            {
                label for="username" class=(FORM_LABEL_STYLE) { "Username" }

                input
                    type="text"
                    name="username"
                    id="username"
                    value=(username)
                    autocomplete="username"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required;
            }

            (password_input(error_message))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }
        }
    }
}

/// The full log-in page, also used to report failed Google sign-ins.
pub(crate) fn log_in_page(
    error_message: Option<&str>,
    next: Option<&str>,
    google_client_id: Option<&str>,
) -> Markup {
    let form = html! {
        (log_in_form("", None, next))

        @if let Some(error_message) = error_message {
            p id="sign-in-error" class="text-red-600 dark:text-red-400" { (error_message) }
        }

        @if let Some(client_id) = google_client_id {
            (google_sign_in_button(client_id, next))
        }
    };
    let content = log_in_card("Log in to your account", &form);

    base("Log In", &[], &content)
}

/// Check `password` against the stored hash of the user called `username`.
///
/// Returns [Error::InvalidCredentials] for unknown users, wrong passwords and
/// accounts that have no password.
pub(crate) fn authenticate(
    username: &str,
    password: &str,
    connection: &Connection,
) -> Result<User, Error> {
    let user = match get_user_by_username(username.trim(), connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    // Accounts created by Google sign-in have no password.
    let Some(password_hash) = &user.password_hash else {
        return Err(Error::InvalidCredentials);
    };

    if password_hash.verify(password)? {
        Ok(user)
    } else {
        Err(Error::InvalidCredentials)
    }
}

/// Display the log-in page.
pub async fn get_log_in_page(
    State(state): State<LogInState>,
    Query(query): Query<LogInQuery>,
) -> Response {
    let next = parse_next_url(query.next.as_deref(), "log-in query");

    log_in_page(None, next.as_deref(), state.google_client_id.as_deref()).into_response()
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request the session is logged in and the client is
/// redirected to the `next` URL or the dashboard. Otherwise, the form is
/// returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LogInState>,
    session: Session,
    Form(log_in_data): Form<LogInData>,
) -> Response {
    let next = parse_next_url(log_in_data.next.as_deref(), "log-in form");
    let next = next.as_deref();
    let form_with_error =
        |message: &str| log_in_form(&log_in_data.username, Some(message), next).into_response();

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_alert_response();
            }
        };

        match authenticate(&log_in_data.username, &log_in_data.password, &connection) {
            Ok(user) => user,
            Err(Error::InvalidCredentials) => return form_with_error(INVALID_CREDENTIALS_ERROR_MSG),
            Err(error) => {
                tracing::error!("Unhandled error while verifying credentials: {error}");
                return form_with_error("An internal error occurred. Please try again later.");
            }
        }
    };

    session.log_in(user.id);
    tracing::info!("User {} logged in.", user.id);

    (
        HxRedirect(next.unwrap_or(endpoints::DASHBOARD_VIEW).to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod log_in_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Query, State},
        http::StatusCode,
    };
    use scraper::Selector;

    use crate::{
        endpoints,
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_valid_html,
            get_test_connection, must_get_form, parse_html_document,
        },
    };

    use super::{LogInQuery, LogInState, get_log_in_page};

    fn get_state(google_client_id: Option<&str>) -> LogInState {
        LogInState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
            google_client_id: google_client_id.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn log_in_page_displays_form() {
        let response = get_log_in_page(State(get_state(None)), Query(LogInQuery::default())).await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::LOG_IN_API, "hx-post");
        assert_form_input(&form, "username", "text");
        assert_form_input(&form, "password", "password");
        assert_form_submit_button(&form);
        let google = Selector::parse("#g_id_onload").unwrap();
        assert!(document.select(&google).next().is_none());
    }

    #[tokio::test]
    async fn log_in_page_keeps_safe_next_url() {
        let query = LogInQuery {
            next: Some("/reports/pivot?year=2024".to_owned()),
        };

        let response = get_log_in_page(State(get_state(None)), Query(query)).await;

        let document = parse_html_document(response).await;
        let next = Selector::parse("input[name=next]").unwrap();
        let next = document.select(&next).next().expect("missing next input");
        assert_eq!(next.value().attr("value"), Some("/reports/pivot?year=2024"));
    }

    #[tokio::test]
    async fn log_in_page_drops_external_next_url() {
        let query = LogInQuery {
            next: Some("https://evil.example.com".to_owned()),
        };

        let response = get_log_in_page(State(get_state(None)), Query(query)).await;

        let document = parse_html_document(response).await;
        let next = Selector::parse("input[name=next]").unwrap();
        assert!(document.select(&next).next().is_none());
    }

    #[tokio::test]
    async fn log_in_page_shows_google_button_when_configured() {
        let response = get_log_in_page(
            State(get_state(Some("client-123"))),
            Query(LogInQuery::default()),
        )
        .await;

        let document = parse_html_document(response).await;
        let google = Selector::parse("#g_id_onload").unwrap();
        let google = document.select(&google).next().expect("missing Google button");
        assert_eq!(google.value().attr("data-client_id"), Some("client-123"));
        assert_eq!(
            google.value().attr("data-login_uri"),
            Some(endpoints::GOOGLE_SIGN_IN)
        );
    }
}

#[cfg(test)]
mod post_log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, middleware, routing::post};
    use axum_extra::extract::cookie::Key;
    use axum_test::TestServer;

    use crate::{
        endpoints,
        session::{
            MemorySessionStore, SessionConfig, SessionState, USER_SESSION_COOKIE,
            session_middleware,
        },
        test_utils::{TEST_PASSWORD, create_test_user, get_test_connection},
        user::{NewUser, create_user},
    };

    use super::{INVALID_CREDENTIALS_ERROR_MSG, LogInData, LogInState, post_log_in};

    fn get_test_server() -> TestServer {
        let connection = get_test_connection();
        create_test_user("alice", &connection);
        create_user(
            NewUser {
                username: "google-user@example.com".to_owned(),
                email: Some("google-user@example.com".to_owned()),
                password_hash: None,
                is_staff: false,
                is_superuser: false,
            },
            &connection,
        )
        .unwrap();

        let state = LogInState {
            db_connection: Arc::new(Mutex::new(connection)),
            google_client_id: None,
        };
        let session_state = SessionState {
            store: MemorySessionStore::default(),
            cookie_key: Key::generate(),
            config: SessionConfig::default(),
        };

        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .layer(middleware::from_fn_with_state(
                session_state,
                session_middleware::<MemorySessionStore>,
            ))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn form(username: &str, password: &str, next: Option<&str>) -> LogInData {
        LogInData {
            username: username.to_owned(),
            password: password.to_owned(),
            next: next.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&form("alice", TEST_PASSWORD, None))
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("hx-redirect"), endpoints::DASHBOARD_VIEW);
        assert!(response.maybe_cookie(USER_SESSION_COOKIE).is_some());
    }

    #[tokio::test]
    async fn log_in_redirects_to_next_url() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&form("alice", TEST_PASSWORD, Some("/expenses?page=2")))
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("hx-redirect"), "/expenses?page=2");
    }

    #[tokio::test]
    async fn log_in_ignores_external_next_url() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&form("alice", TEST_PASSWORD, Some("//evil.example.com")))
            .await;

        assert_eq!(response.header("hx-redirect"), endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&form("alice", "wrongpassword", None))
            .await;

        response.assert_status_ok();
        assert!(response.text().contains(INVALID_CREDENTIALS_ERROR_MSG));
        assert!(response.maybe_cookie(USER_SESSION_COOKIE).is_none());
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_username() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&form("mallory", TEST_PASSWORD, None))
            .await;

        response.assert_status_ok();
        assert!(response.text().contains(INVALID_CREDENTIALS_ERROR_MSG));
    }

    #[tokio::test]
    async fn log_in_fails_for_account_without_password() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&form("google-user@example.com", "", None))
            .await;

        response.assert_status_ok();
        assert!(response.text().contains(INVALID_CREDENTIALS_ERROR_MSG));
    }
}
