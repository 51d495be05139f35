//! Reading and writing the encrypted session ID cookie for a realm.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::session::realm::Realm;

/// Get the session ID stored in the cookie for `realm`, if any.
pub fn get_session_id(jar: &PrivateCookieJar, realm: Realm) -> Option<String> {
    jar.get(realm.cookie_name())
        .map(|cookie| cookie.value().to_owned())
        .filter(|session_id| !session_id.is_empty())
}

/// Add the session cookie for `realm` holding `session_id` to the jar.
///
/// The cookie has no expiry so it lasts until the browser is closed; idle
/// sessions are ended on the server.
pub fn set_session_cookie(
    jar: PrivateCookieJar,
    realm: Realm,
    session_id: String,
) -> PrivateCookieJar {
    jar.add(
        Cookie::build((realm.cookie_name(), session_id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(true),
    )
}

/// Set the session cookie for `realm` to an invalid value and set its max
/// age to zero, which should delete the cookie on the client side.
pub fn invalidate_session_cookie(jar: PrivateCookieJar, realm: Realm) -> PrivateCookieJar {
    jar.add(
        Cookie::build((realm.cookie_name(), "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(true),
    )
}
