//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    admin::{get_admin_log_in_page, get_admin_log_out, get_admin_page, post_admin_log_in},
    auth::{
        auth_guard, auth_guard_hx, get_log_in_page, get_log_out, google_sign_in, post_log_in,
        staff_guard,
    },
    category::{
        create_category_endpoint, create_subcategory_endpoint, get_categories_page,
        get_new_category_page, get_new_subcategory_page, get_subcategories_page,
    },
    dashboard::{get_dashboard_page, quick_add_expense_endpoint},
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, get_edit_expense_page,
        get_expenses_page, get_new_expense_page, update_expense_endpoint,
    },
    health::get_health,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    report::{export_expenses, get_pivot_page},
    session::{SqliteSessionStore, keepalive, session_middleware},
};

/// Return a router with all the app's routes.
///
/// Everything except the health check and static files runs behind the
/// session middleware, which picks the user or admin session cookie from the
/// request path.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::GOOGLE_SIGN_IN, post(google_sign_in))
        .route(
            endpoints::ADMIN_LOG_IN,
            get(get_admin_log_in_page).post(post_admin_log_in),
        )
        .route(endpoints::ADMIN_LOG_OUT, get(get_admin_log_out))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::EXPENSES_VIEW, get(get_expenses_page))
        .route(endpoints::NEW_EXPENSE_VIEW, get(get_new_expense_page))
        .route(endpoints::EDIT_EXPENSE_VIEW, get(get_edit_expense_page))
        .route(endpoints::EXPORT_EXPENSES, get(export_expenses))
        .route(endpoints::PIVOT_VIEW, get(get_pivot_page))
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(endpoints::NEW_CATEGORY_VIEW, get(get_new_category_page))
        .route(endpoints::SUBCATEGORIES_VIEW, get(get_subcategories_page))
        .route(
            endpoints::NEW_SUBCATEGORY_VIEW,
            get(get_new_subcategory_page),
        )
        .layer(middleware::from_fn(auth_guard));

    // These routes are called by HTMX and need the HX-Redirect header for auth redirects to work.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::KEEPALIVE, get(keepalive).post(keepalive))
            .route(endpoints::EXPENSES_API, post(create_expense_endpoint))
            .route(
                endpoints::EXPENSE,
                put(update_expense_endpoint).delete(delete_expense_endpoint),
            )
            .route(
                endpoints::QUICK_ADD_EXPENSE,
                post(quick_add_expense_endpoint),
            )
            .route(endpoints::CATEGORIES_API, post(create_category_endpoint))
            .route(
                endpoints::SUBCATEGORIES_API,
                post(create_subcategory_endpoint),
            )
            .layer(middleware::from_fn(auth_guard_hx)),
    );

    let admin_routes = Router::new()
        .route(endpoints::ADMIN_VIEW, get(get_admin_page))
        .layer(middleware::from_fn_with_state(state.clone(), staff_guard));

    protected_routes
        .merge(admin_routes)
        .merge(unprotected_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware::<SqliteSessionStore>,
        ))
        .route(endpoints::HEALTH, get(get_health))
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
