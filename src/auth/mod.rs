//! Logging users in and out, and the middleware that keeps pages behind a log-in.

mod google;
mod log_in;
mod log_out;
mod middleware;
mod redirect;

pub use google::{IdTokenClaims, IdTokenVerifier, JwksIdTokenVerifier, TokenError, google_sign_in};
pub use log_in::{INVALID_CREDENTIALS_ERROR_MSG, LogInData, LogInQuery, get_log_in_page, post_log_in};
pub(crate) use log_in::{authenticate, parse_next_url};
pub use log_out::get_log_out;
pub use middleware::{StaffGuardState, auth_guard, auth_guard_hx, staff_guard};
pub use redirect::{
    build_log_in_redirect_url, build_log_in_redirect_url_from_target, normalize_redirect_url,
};
