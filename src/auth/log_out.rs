//! Log-out route handler that ends the session and redirects users.

use axum::response::{IntoResponse, Redirect, Response};

use crate::{endpoints, session::Session};

/// End the session and redirect the client to the log-in page.
///
/// The session middleware deletes the stored session and expires the cookie.
pub async fn get_log_out(session: Session) -> Response {
    if let Some(user_id) = session.user_id() {
        tracing::info!("User {user_id} logged out.");
    }
    session.flush();

    Redirect::to(endpoints::LOG_IN_VIEW).into_response()
}

#[cfg(test)]
mod log_out_tests {
    use axum::http::StatusCode;

    use crate::{endpoints, session::Session, user::UserID};

    use super::get_log_out;

    #[tokio::test]
    async fn log_out_clears_session_and_redirects() {
        let session = Session::default();
        session.log_in(UserID::new(123));

        let response = get_log_out(session.clone()).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            endpoints::LOG_IN_VIEW
        );
        assert_eq!(session.user_id(), None);
        assert_eq!(session.last_activity(), None);
    }
}
