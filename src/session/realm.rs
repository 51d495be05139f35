//! Picks the session cookie for a request from its path, so that admin and
//! user sessions on the same host never share a cookie.

use crate::endpoints;

/// The name of the session cookie for ordinary users.
pub const USER_SESSION_COOKIE: &str = "sessionid";
/// The name of the session cookie for the admin pages.
pub const ADMIN_SESSION_COOKIE: &str = "admin_sessionid";

/// The part of the site a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Realm {
    Admin,
    User,
}

impl Realm {
    /// The realm for `path`.
    ///
    /// `admin_prefix` itself and everything below it (`{admin_prefix}/...`)
    /// is the admin realm. Paths that merely start with the same characters,
    /// such as `/administrator`, are not.
    pub fn for_path(path: &str, admin_prefix: &str) -> Self {
        match path.strip_prefix(admin_prefix) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => Realm::Admin,
            _ => Realm::User,
        }
    }

    pub fn cookie_name(self) -> &'static str {
        match self {
            Realm::Admin => ADMIN_SESSION_COOKIE,
            Realm::User => USER_SESSION_COOKIE,
        }
    }

    /// Where to send someone whose session in this realm has ended.
    pub fn log_in_path(self) -> &'static str {
        match self {
            Realm::Admin => endpoints::ADMIN_LOG_IN,
            Realm::User => endpoints::LOG_IN_VIEW,
        }
    }
}
