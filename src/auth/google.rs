//! Sign in with a Google account.
//!
//! The Google sign-in button posts an ID token (a signed JWT) to
//! [endpoints::GOOGLE_SIGN_IN]. The token is verified with an
//! [IdTokenVerifier], then the user with the token's email address is logged
//! in, creating the user on their first sign-in.

use std::{
    fmt::Debug,
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, jwk::JwkSet};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{
        build_log_in_redirect_url_from_target,
        log_in::{LogInQuery, log_in_page, parse_next_url},
    },
    endpoints,
    session::Session,
    user::{NewUser, User, create_user, get_user_by_email},
};

/// The values Google uses for the `iss` claim.
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// The claims read from a verified ID token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IdTokenClaims {
    #[serde(rename = "iss")]
    pub issuer: String,
    /// The provider's ID for the account.
    #[serde(rename = "sub")]
    pub subject_id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
}

/// The reasons an ID token can fail verification.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TokenError {
    /// The token is not a well formed JWT.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token was signed with a key that is not in the key set.
    #[error("no key with the ID {0:?}")]
    UnknownKey(Option<String>),

    /// The signature, audience or expiry check failed.
    #[error("invalid token: {0}")]
    Invalid(String),

    /// The key set could not be loaded.
    #[error("could not load key set: {0}")]
    KeySet(String),
}

/// Checks the signature, audience and expiry of an identity provider's ID token.
pub trait IdTokenVerifier: Debug + Send + Sync {
    /// Verify `token` was issued for `expected_audience` and return its claims.
    ///
    /// The issuer is not checked, callers compare [IdTokenClaims::issuer]
    /// against the issuers they accept.
    fn verify(&self, token: &str, expected_audience: &str) -> Result<IdTokenClaims, TokenError>;
}

/// Verifies RS256 signed ID tokens against a JSON Web Key Set.
#[derive(Debug, Clone)]
pub struct JwksIdTokenVerifier {
    key_set: JwkSet,
}

impl JwksIdTokenVerifier {
    pub fn new(key_set: JwkSet) -> Self {
        Self { key_set }
    }

    /// Load the key set from a JSON file, such as a saved copy of
    /// <https://www.googleapis.com/oauth2/v3/certs>.
    pub fn from_file(path: &Path) -> Result<Self, TokenError> {
        let raw_key_set = fs::read_to_string(path)
            .map_err(|error| TokenError::KeySet(format!("{}: {error}", path.display())))?;
        let key_set: JwkSet = serde_json::from_str(&raw_key_set)
            .map_err(|error| TokenError::KeySet(format!("{}: {error}", path.display())))?;

        Ok(Self::new(key_set))
    }
}

impl IdTokenVerifier for JwksIdTokenVerifier {
    fn verify(&self, token: &str, expected_audience: &str) -> Result<IdTokenClaims, TokenError> {
        let header = decode_header(token).map_err(|error| TokenError::Malformed(error.to_string()))?;

        let jwk = header
            .kid
            .as_deref()
            .and_then(|key_id| self.key_set.find(key_id))
            .ok_or_else(|| TokenError::UnknownKey(header.kid.clone()))?;
        let key = DecodingKey::from_jwk(jwk).map_err(|error| TokenError::KeySet(error.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[expected_audience]);

        decode::<IdTokenClaims>(token, &key, &validation)
            .map(|token_data| token_data.claims)
            .map_err(|error| TokenError::Invalid(error.to_string()))
    }
}

/// Why a Google sign-in was rejected.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GoogleSignInError {
    #[error("Google sign-in is not configured on this server.")]
    NotConfigured,

    #[error("The Google sign-in token could not be verified. Please try again.")]
    InvalidToken,

    #[error("The sign-in token was not issued by Google.")]
    WrongIssuer,

    #[error("Your Google account did not provide an email address.")]
    MissingEmail,

    #[error("Your Google email address has not been verified.")]
    EmailNotVerified,
}

/// The state needed for Google sign-in.
#[derive(Debug, Clone)]
pub struct GoogleSignInState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub google_client_id: Option<String>,
    pub id_token_verifier: Option<Arc<dyn IdTokenVerifier>>,
}

impl FromRef<AppState> for GoogleSignInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            google_client_id: state.google_client_id.clone(),
            id_token_verifier: state.id_token_verifier.clone(),
        }
    }
}

/// The form posted by the Google sign-in button.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleSignInData {
    /// The ID token.
    pub credential: String,
    /// Google's double-submit token, also set as a cookie of the same name.
    pub g_csrf_token: Option<String>,
}

const CSRF_COOKIE: &str = "g_csrf_token";

/// Check the posted token and return the verified email address.
pub fn verify_google_credential(
    credential: &str,
    google_client_id: Option<&str>,
    verifier: Option<&dyn IdTokenVerifier>,
) -> Result<String, GoogleSignInError> {
    let (Some(client_id), Some(verifier)) = (google_client_id, verifier) else {
        return Err(GoogleSignInError::NotConfigured);
    };

    let claims = verifier.verify(credential, client_id).map_err(|error| {
        tracing::warn!("Rejected Google ID token: {error}");
        GoogleSignInError::InvalidToken
    })?;

    if !GOOGLE_ISSUERS.contains(&claims.issuer.as_str()) {
        tracing::warn!("Rejected Google ID token from issuer {}", claims.issuer);
        return Err(GoogleSignInError::WrongIssuer);
    }

    let email = claims
        .email
        .filter(|email| !email.trim().is_empty())
        .ok_or(GoogleSignInError::MissingEmail)?;

    if !claims.email_verified {
        return Err(GoogleSignInError::EmailNotVerified);
    }

    Ok(email)
}

/// How many usernames are tried for a new Google user before giving up.
const MAX_USERNAME_ATTEMPTS: u32 = 10;

/// Get the user with `email`, creating one without a password if there is none.
///
/// A new user's username is their email address. If another account already
/// uses that as its username, a numeric suffix is added, e.g. "bob@example.com-2".
pub fn get_or_create_google_user(email: &str, connection: &Connection) -> Result<User, Error> {
    match get_user_by_email(email, connection) {
        Ok(user) => return Ok(user),
        Err(Error::NotFound) => {}
        Err(error) => return Err(error),
    }

    tracing::info!("Creating user for first Google sign-in.");

    let mut username = email.to_owned();
    for attempt in 2..=MAX_USERNAME_ATTEMPTS {
        let new_user = NewUser {
            username: username.clone(),
            email: Some(email.to_owned()),
            password_hash: None,
            is_staff: false,
            is_superuser: false,
        };

        match create_user(new_user, connection) {
            Err(Error::DuplicateUsername(taken)) => {
                tracing::warn!("The username {taken} is taken, trying another.");
                username = format!("{email}-{attempt}");
            }
            result => return result,
        }
    }

    Err(Error::DuplicateUsername(username))
}

/// The Google sign-in button, which posts the ID token to [endpoints::GOOGLE_SIGN_IN].
pub fn google_sign_in_button(client_id: &str, next: Option<&str>) -> Markup {
    let login_uri = match next {
        Some(next) => build_log_in_redirect_url_from_target(endpoints::GOOGLE_SIGN_IN, next),
        None => endpoints::GOOGLE_SIGN_IN.to_owned(),
    };

    html! {
        script src="https://accounts.google.com/gsi/client" async {}

        div
            id="g_id_onload"
            data-client_id=(client_id)
            data-login_uri=(login_uri)
            data-ux_mode="redirect"
            data-auto_prompt="false"
        {}

        div class="flex justify-center"
        {
            div
                class="g_id_signin"
                data-type="standard"
                data-text="signin_with"
                data-shape="rectangular"
            {}
        }
    }
}

fn sign_in_error_response(
    error: GoogleSignInError,
    next: Option<&str>,
    google_client_id: Option<&str>,
) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        log_in_page(Some(&error.to_string()), next, google_client_id),
    )
        .into_response()
}

/// Google's redirect flow sets the `g_csrf_token` cookie and posts the same
/// value in the form, both must be present and equal.
fn csrf_tokens_match(form_token: Option<&str>, cookie_token: Option<&str>) -> bool {
    match (form_token, cookie_token) {
        (Some(form_token), Some(cookie_token)) => {
            !form_token.is_empty() && form_token == cookie_token
        }
        _ => false,
    }
}

/// Handle the ID token posted by the Google sign-in button.
///
/// On success the user is logged in and redirected to the `next` URL or the
/// dashboard. A rejected token shows the log-in page with the reason and a
/// 401 status.
pub async fn google_sign_in(
    State(state): State<GoogleSignInState>,
    session: Session,
    jar: CookieJar,
    Query(query): Query<LogInQuery>,
    Form(data): Form<GoogleSignInData>,
) -> Response {
    let next = parse_next_url(query.next.as_deref(), "Google sign-in");
    let google_client_id = state.google_client_id.as_deref();

    let cookie_token = jar.get(CSRF_COOKIE).map(|cookie| cookie.value().to_owned());
    if !csrf_tokens_match(data.g_csrf_token.as_deref(), cookie_token.as_deref()) {
        tracing::warn!("Google sign-in CSRF token missing or mismatched.");
        return sign_in_error_response(
            GoogleSignInError::InvalidToken,
            next.as_deref(),
            google_client_id,
        );
    }

    let email = match verify_google_credential(
        &data.credential,
        google_client_id,
        state.id_token_verifier.as_deref(),
    ) {
        Ok(email) => email,
        Err(error) => return sign_in_error_response(error, next.as_deref(), google_client_id),
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match get_or_create_google_user(&email, &connection) {
            Ok(user) => user,
            Err(error) => {
                tracing::error!("Could not get or create user for Google sign-in: {error}");
                return error.into_response();
            }
        }
    };

    session.log_in(user.id);
    tracing::info!("User {} signed in with Google.", user.id);

    Redirect::to(next.as_deref().unwrap_or(endpoints::DASHBOARD_VIEW)).into_response()
}


#[cfg(test)]
pub(crate) mod test_verifier {
    use super::{IdTokenClaims, IdTokenVerifier, TokenError};

    /// Accepts one token and returns fixed claims for it.
    #[derive(Debug, Clone)]
    pub(crate) struct StubVerifier {
        pub token: &'static str,
        pub audience: &'static str,
        pub claims: IdTokenClaims,
    }

    impl StubVerifier {
        pub(crate) fn with_claims(claims: IdTokenClaims) -> Self {
            Self {
                token: "good-token",
                audience: "client-123",
                claims,
            }
        }
    }

    impl IdTokenVerifier for StubVerifier {
        fn verify(
            &self,
            token: &str,
            expected_audience: &str,
        ) -> Result<IdTokenClaims, TokenError> {
            if token != self.token {
                return Err(TokenError::Invalid("bad signature".to_owned()));
            }
            if expected_audience != self.audience {
                return Err(TokenError::Invalid("wrong audience".to_owned()));
            }

            Ok(self.claims.clone())
        }
    }

    pub(crate) fn google_claims(email: Option<&str>, email_verified: bool) -> IdTokenClaims {
        IdTokenClaims {
            issuer: "https://accounts.google.com".to_owned(),
            subject_id: "1234567890".to_owned(),
            email: email.map(str::to_owned),
            email_verified,
            name: Some("Alice".to_owned()),
        }
    }
}

#[cfg(test)]
mod verify_credential_tests {
    use super::{
        GoogleSignInError, IdTokenClaims,
        test_verifier::{StubVerifier, google_claims},
        verify_google_credential,
    };

    fn verify(claims: IdTokenClaims, token: &str) -> Result<String, GoogleSignInError> {
        let verifier = StubVerifier::with_claims(claims);

        verify_google_credential(token, Some("client-123"), Some(&verifier))
    }

    #[test]
    fn accepts_verified_email() {
        let result = verify(google_claims(Some("alice@example.com"), true), "good-token");

        assert_eq!(result, Ok("alice@example.com".to_owned()));
    }

    #[test]
    fn not_configured_without_client_id_or_verifier() {
        let verifier = StubVerifier::with_claims(google_claims(Some("a@example.com"), true));

        assert_eq!(
            verify_google_credential("good-token", None, Some(&verifier)),
            Err(GoogleSignInError::NotConfigured)
        );
        assert_eq!(
            verify_google_credential("good-token", Some("client-123"), None),
            Err(GoogleSignInError::NotConfigured)
        );
    }

    #[test]
    fn rejects_invalid_token() {
        let result = verify(google_claims(Some("alice@example.com"), true), "forged-token");

        assert_eq!(result, Err(GoogleSignInError::InvalidToken));
    }

    #[test]
    fn rejects_wrong_issuer() {
        let claims = IdTokenClaims {
            issuer: "https://evil.example.com".to_owned(),
            ..google_claims(Some("alice@example.com"), true)
        };

        assert_eq!(verify(claims, "good-token"), Err(GoogleSignInError::WrongIssuer));
    }

    #[test]
    fn rejects_missing_email() {
        assert_eq!(
            verify(google_claims(None, true), "good-token"),
            Err(GoogleSignInError::MissingEmail)
        );
        assert_eq!(
            verify(google_claims(Some(" "), true), "good-token"),
            Err(GoogleSignInError::MissingEmail)
        );
    }

    #[test]
    fn rejects_unverified_email() {
        assert_eq!(
            verify(google_claims(Some("alice@example.com"), false), "good-token"),
            Err(GoogleSignInError::EmailNotVerified)
        );
    }
}


#[cfg(test)]
mod csrf_tests {
    use super::csrf_tokens_match;

    #[test]
    fn tokens_must_both_be_present_and_equal() {
        assert!(csrf_tokens_match(Some("abc"), Some("abc")));
        assert!(!csrf_tokens_match(Some("abc"), Some("xyz")));
        assert!(!csrf_tokens_match(None, Some("abc")));
        assert!(!csrf_tokens_match(Some("abc"), None));
        assert!(!csrf_tokens_match(None, None));
        assert!(!csrf_tokens_match(Some(""), Some("")));
    }
}
