//! Server side sessions with an idle timeout and separate cookies for the
//! admin and user parts of the site.

mod activity;
mod cookie;
mod keepalive;
mod middleware;
mod realm;
mod store;

pub use activity::{Activity, check_activity, is_exempt_path};
pub use keepalive::keepalive;
pub use middleware::{DEFAULT_IDLE_TIMEOUT, Session, SessionConfig, SessionState, session_middleware};
pub use realm::{ADMIN_SESSION_COOKIE, Realm, USER_SESSION_COOKIE};
pub use store::{SessionData, SessionStore, SqliteSessionStore, create_session_table};

#[cfg(test)]
pub(crate) use store::MemorySessionStore;
