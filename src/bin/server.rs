use std::{
    env::{self},
    fs::OpenOptions,
    net::SocketAddr,
    path::PathBuf,
    process::exit,
    sync::Arc,
    time::Duration,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use axum::middleware;
#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use expense_ledger::{
    AppState, JwksIdTokenVerifier, PaginationConfig, SessionConfig, SqliteSessionStore,
    build_router, graceful_shutdown, seed_default_categories_if_empty,
};

#[cfg(debug_assertions)]
use expense_ledger::logging_middleware;

/// How often sessions idle for longer than the timeout are deleted.
const STALE_SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(15 * 60);

/// The web server for Expense Ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// File path to an SSL certificate `cert.pem` and key `key.pem`.
    #[arg(long)]
    cert_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// How many minutes a logged in session may be idle before it is ended.
    #[arg(long, env = "IDLE_TIMEOUT_MINUTES", default_value_t = 60)]
    idle_timeout_minutes: u32,

    /// The OAuth client ID for Google sign-in. Google sign-in is disabled when not set.
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    google_client_id: Option<String>,

    /// File path to Google's JSON Web Key Set, used to verify Google ID tokens.
    #[arg(long, env = "GOOGLE_JWKS_PATH")]
    google_jwks_path: Option<PathBuf>,

    /// The canonical name of the local timezone, e.g. "Asia/Kolkata".
    #[arg(long, env = "TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let tls_config = RustlsConfig::from_pem_file(
        PathBuf::from(&args.cert_path).join("cert.pem"),
        PathBuf::from(&args.cert_path).join("key.pem"),
    )
    .await
    .expect("Could not open TLS certificates.");

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    let connection = Connection::open(&args.db_path).expect("Could not open the database.");
    let state = AppState::new(
        connection,
        &secret,
        &args.timezone,
        PaginationConfig::default(),
        SessionConfig::from_minutes(args.idle_timeout_minutes),
    )
    .expect("Could not initialize the database.");

    let state = configure_google_sign_in(state, &args);

    prepare_database(&state);

    tokio::spawn(
        SqliteSessionStore::new(state.db_connection.clone()).sweep_stale_sessions(
            state.session_config.idle_timeout,
            STALE_SESSION_SWEEP_PERIOD,
        ),
    );

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state));

    #[cfg(debug_assertions)]
    let router = router
        .layer(middleware::from_fn(logging_middleware))
        .layer(LiveReloadLayer::new());

    tracing::info!("HTTPS server listening on {}", addr);
    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly.");
}

fn configure_google_sign_in(state: AppState, args: &Args) -> AppState {
    match (&args.google_client_id, &args.google_jwks_path) {
        (Some(client_id), Some(jwks_path)) => match JwksIdTokenVerifier::from_file(jwks_path) {
            Ok(verifier) => {
                tracing::info!("Google sign-in enabled.");
                state.with_google_sign_in(client_id, Arc::new(verifier))
            }
            Err(error) => {
                tracing::error!("Could not load the Google key set: {error}");
                exit(1);
            }
        },
        (Some(_), None) => {
            tracing::warn!(
                "GOOGLE_CLIENT_ID is set without GOOGLE_JWKS_PATH, Google sign-in is disabled."
            );
            state
        }
        _ => state,
    }
}

/// Load the default categories into an empty database.
fn prepare_database(state: &AppState) {
    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire the database lock.");

    match seed_default_categories_if_empty(&connection) {
        Ok(true) => tracing::info!("Loaded the default categories."),
        Ok(false) => {}
        Err(error) => tracing::error!("Could not load the default categories: {error}"),
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
