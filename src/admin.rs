//! The admin realm: a staff-only log-in and a landing page with record counts.
//!
//! Admin pages live under [endpoints::ADMIN_PREFIX] and use their own
//! session cookie, so logging in here does not log the user into the main
//! site and vice versa.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::{
        INVALID_CREDENTIALS_ERROR_MSG, LogInData, LogInQuery, authenticate, parse_next_url,
    },
    category::count_categories,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, base, loading_spinner, log_in_card, password_input,
    },
    session::Session,
    user::{UserID, count_users, get_user_by_id},
};

const NOT_STAFF_ERROR_MSG: &str = "This account does not have access to the admin site.";

/// The state needed for the admin pages.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AdminState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The number of records in each table, shown on the admin landing page.
#[derive(Debug, Clone, PartialEq)]
struct RecordCounts {
    users: usize,
    categories: usize,
    subcategories: usize,
    expenses: usize,
}

impl RecordCounts {
    fn load(connection: &Connection) -> Result<Self, Error> {
        let count = |table: &str| -> Result<usize, Error> {
            connection
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get::<_, i64>(0)
                })
                .map(|count| count as usize)
                .map_err(Error::from)
        };

        Ok(Self {
            users: count_users(connection)?,
            categories: count_categories(connection)?,
            subcategories: count("subcategory")?,
            expenses: count("expense")?,
        })
    }
}

fn admin_log_in_form(username: &str, error_message: Option<&str>, next: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::ADMIN_LOG_IN)
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

/// Display the admin log-in page.
pub async fn get_admin_log_in_page(Query(query): Query<LogInQuery>) -> Response {
    let next = parse_next_url(query.next.as_deref(), "admin log-in query");
    let form = admin_log_in_form("", None, next.as_deref());
    let content = log_in_card("Log in to the admin site", &form);

    base("Admin Log In", &[], &content).into_response()
}

/// Log a staff user into the admin realm.
///
/// Users that are not staff get the form back with an error, even if their
/// password is correct.
pub async fn post_admin_log_in(
    State(state): State<AdminState>,
    session: Session,
    Form(log_in_data): Form<LogInData>,
) -> Response {
    let next = parse_next_url(log_in_data.next.as_deref(), "admin log-in form");
    let next = next.as_deref();
    let form_with_error = |message: &str| {
        admin_log_in_form(&log_in_data.username, Some(message), next).into_response()
    };

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
            Err(Error::InvalidCredentials) => {
                return form_with_error(INVALID_CREDENTIALS_ERROR_MSG);
            }
            Err(error) => {
                tracing::error!("Unhandled error while verifying admin credentials: {error}");
                return form_with_error("An internal error occurred. Please try again later.");
            }
        }
    };

    if !user.is_staff {
        tracing::warn!("User {} tried to log in to the admin site.", user.id);
        return form_with_error(NOT_STAFF_ERROR_MSG);
    }

    session.log_in(user.id);
    tracing::info!("Staff user {} logged in to the admin site.", user.id);

    (
        HxRedirect(next.unwrap_or(endpoints::ADMIN_VIEW).to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// End the admin session and return to the admin log-in page.
pub async fn get_admin_log_out(session: Session) -> Response {
    session.flush();

    Redirect::to(endpoints::ADMIN_LOG_IN).into_response()
}

/// The admin landing page.
pub async fn get_admin_page(
    State(state): State<AdminState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;
    let counts = RecordCounts::load(&connection)?;

    Ok(admin_page_view(&user.username, &counts).into_response())
}

fn admin_page_view(username: &str, counts: &RecordCounts) -> Markup {
    let rows = [
        ("users", "Users", counts.users),
        ("categories", "Categories", counts.categories),
        ("subcategories", "Subcategories", counts.subcategories),
        ("expenses", "Expenses", counts.expenses),
    ];

    let content = html! {
        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6 w-full lg:max-w-3xl"
            {
                header class="flex justify-between items-end"
                {
                    h1 class="text-xl font-bold" { "Site administration" }

                    p
                    {
                        "Logged in as " strong { (username) } ". "
                        a href=(endpoints::ADMIN_LOG_OUT) class=(LINK_STYLE) { "Log out" }
                    }
                }

                dl id="record-counts" class="grid grid-cols-2 gap-4"
                {
                    @for (id, label, count) in rows {
                        div id=(id) class="p-4 rounded-lg shadow bg-gray-50 dark:bg-gray-800"
                        {
                            dt class="text-sm text-gray-500 dark:text-gray-400" { (label) }
                            dd class="text-2xl font-bold text-gray-900 dark:text-white" { (count) }
                        }
                    }
                }
            }
        }
    };

    base("Admin", &[], &content)
}

#[cfg(test)]
mod admin_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router, middleware,
        routing::{get, post},
    };
    use axum_extra::extract::cookie::Key;
    use axum_test::TestServer;
    use scraper::{Html, Selector};

    use crate::{
        auth::{INVALID_CREDENTIALS_ERROR_MSG, LogInData, StaffGuardState, staff_guard},
        endpoints,
        password::{PasswordHash, ValidatedPassword},
        session::{
            ADMIN_SESSION_COOKIE, MemorySessionStore, SessionConfig, SessionState,
            USER_SESSION_COOKIE, session_middleware,
        },
        test_utils::{
            TEST_PASSWORD, create_test_category, create_test_user, get_test_connection,
        },
        user::{NewUser, create_user},
    };

    use super::{
        AdminState, NOT_STAFF_ERROR_MSG, get_admin_log_in_page, get_admin_log_out,
        get_admin_page, post_admin_log_in,
    };

    fn get_test_server() -> TestServer {
        let connection = get_test_connection();
        create_test_user("alice", &connection);
        create_test_category("Food", &connection);
        create_user(
            NewUser {
                username: "admin".to_owned(),
                email: Some("admin@example.com".to_owned()),
                password_hash: Some(
                    PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4)
                        .unwrap(),
                ),
                is_staff: true,
                is_superuser: true,
            },
            &connection,
        )
        .unwrap();

        let db_connection = Arc::new(Mutex::new(connection));
        let session_state = SessionState {
            store: MemorySessionStore::default(),
            cookie_key: Key::generate(),
            config: SessionConfig::default(),
        };

        let app = Router::new()
            .route(endpoints::ADMIN_VIEW, get(get_admin_page))
            .layer(middleware::from_fn_with_state(
                StaffGuardState {
                    db_connection: db_connection.clone(),
                },
                staff_guard,
            ))
            .route(
                endpoints::ADMIN_LOG_IN,
                get(get_admin_log_in_page).post(post_admin_log_in),
            )
            .route(endpoints::ADMIN_LOG_OUT, get(get_admin_log_out))
            .layer(middleware::from_fn_with_state(
                session_state,
                session_middleware::<MemorySessionStore>,
            ))
            .with_state(AdminState { db_connection });

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn form(username: &str, password: &str) -> LogInData {
        LogInData {
            username: username.to_owned(),
            password: password.to_owned(),
            next: None,
        }
    }

    #[tokio::test]
    async fn log_in_page_posts_to_admin_log_in() {
        let server = get_test_server();

        let response = server.get(endpoints::ADMIN_LOG_IN).await;

        response.assert_status_ok();
        let document = Html::parse_document(&response.text());
        let form = Selector::parse("form").unwrap();
        let form = document.select(&form).next().unwrap();
        assert_eq!(form.value().attr("hx-post"), Some(endpoints::ADMIN_LOG_IN));
    }

    #[tokio::test]
    async fn staff_log_in_sets_admin_cookie_only() {
        let server = get_test_server();

        let response = server
            .post(endpoints::ADMIN_LOG_IN)
            .form(&form("admin", TEST_PASSWORD))
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("hx-redirect"), endpoints::ADMIN_VIEW);
        assert!(response.maybe_cookie(ADMIN_SESSION_COOKIE).is_some());
        assert!(response.maybe_cookie(USER_SESSION_COOKIE).is_none());
    }

    #[tokio::test]
    async fn non_staff_cannot_log_in() {
        let server = get_test_server();

        let response = server
            .post(endpoints::ADMIN_LOG_IN)
            .form(&form("alice", TEST_PASSWORD))
            .await;

        response.assert_status_ok();
        assert!(response.text().contains(NOT_STAFF_ERROR_MSG));
        assert!(response.maybe_cookie(ADMIN_SESSION_COOKIE).is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let server = get_test_server();

        let response = server
            .post(endpoints::ADMIN_LOG_IN)
            .form(&form("admin", "nope"))
            .await;

        response.assert_status_ok();
        assert!(response.text().contains(INVALID_CREDENTIALS_ERROR_MSG));
    }

    #[tokio::test]
    async fn landing_page_shows_record_counts() {
        let server = get_test_server();
        let cookie = server
            .post(endpoints::ADMIN_LOG_IN)
            .form(&form("admin", TEST_PASSWORD))
            .await
            .cookie(ADMIN_SESSION_COOKIE);

        let response = server.get(endpoints::ADMIN_VIEW).add_cookie(cookie).await;

        response.assert_status_ok();
        let document = Html::parse_document(&response.text());
        let count = |id: &str| {
            let selector = Selector::parse(&format!("#{id} dd")).unwrap();
            document
                .select(&selector)
                .next()
                .unwrap()
                .text()
                .collect::<String>()
        };
        assert_eq!(count("users"), "2");
        assert_eq!(count("categories"), "1");
        assert_eq!(count("subcategories"), "0");
        assert_eq!(count("expenses"), "0");
    }

    #[tokio::test]
    async fn landing_page_requires_log_in() {
        let server = get_test_server();

        let response = server.get(endpoints::ADMIN_VIEW).await;

        response.assert_status_see_other();
        assert_eq!(
            response.header("location"),
            format!("{}?next=%2Fadmin", endpoints::ADMIN_LOG_IN)
        );
    }

    #[tokio::test]
    async fn log_out_ends_admin_session() {
        let server = get_test_server();
        let cookie = server
            .post(endpoints::ADMIN_LOG_IN)
            .form(&form("admin", TEST_PASSWORD))
            .await
            .cookie(ADMIN_SESSION_COOKIE);

        let response = server
            .get(endpoints::ADMIN_LOG_OUT)
            .add_cookie(cookie.clone())
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::ADMIN_LOG_IN);
        server
            .get(endpoints::ADMIN_VIEW)
            .add_cookie(cookie)
            .await
            .assert_status_see_other();
    }
}
