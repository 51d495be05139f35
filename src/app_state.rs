//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};

use crate::{
    Error, auth::IdTokenVerifier, db::initialize, pagination::PaginationConfig,
    session::SessionConfig,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,

    /// The config that controls how to display pages of data.
    pub pagination_config: PaginationConfig,

    /// Controls how long an idle session stays logged in.
    pub session_config: SessionConfig,

    /// The OAuth client ID that Google ID tokens must be issued for.
    ///
    /// Google sign-in is disabled when this is `None`.
    pub google_client_id: Option<String>,

    /// Checks the signature, audience and expiry of Google ID tokens.
    pub id_token_verifier: Option<Arc<dyn IdTokenVerifier>>,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Asia/Kolkata".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        local_timezone: &str,
        pagination_config: PaginationConfig,
        session_config: SessionConfig,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            local_timezone: local_timezone.to_owned(),
            pagination_config,
            session_config,
            google_client_id: None,
            id_token_verifier: None,
            db_connection: connection,
        })
    }

    /// Enable Google sign-in for tokens issued to `client_id`.
    pub fn with_google_sign_in(
        mut self,
        client_id: &str,
        verifier: Arc<dyn IdTokenVerifier>,
    ) -> Self {
        self.google_client_id = Some(client_id.to_owned());
        self.id_token_verifier = Some(verifier);
        self
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
