//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/expenses/{expense_id}', use [format_endpoint].

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for displaying a user's expenses.
pub const EXPENSES_VIEW: &str = "/expenses";
/// The page for creating a new expense.
pub const NEW_EXPENSE_VIEW: &str = "/expenses/new";
/// The page for editing an existing expense.
pub const EDIT_EXPENSE_VIEW: &str = "/expenses/{expense_id}/edit";
/// The route for downloading a month of expenses as CSV.
pub const EXPORT_EXPENSES: &str = "/expenses/export";
/// The category by month pivot report.
pub const PIVOT_VIEW: &str = "/reports/pivot";
/// The page listing categories and their subcategories.
pub const CATEGORIES_VIEW: &str = "/categories";
/// The page for creating a new category.
pub const NEW_CATEGORY_VIEW: &str = "/categories/new";
/// The page listing subcategories.
pub const SUBCATEGORIES_VIEW: &str = "/subcategories";
/// The page for creating a new subcategory.
pub const NEW_SUBCATEGORY_VIEW: &str = "/subcategories/new";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// Liveness probe for load balancers.
pub const HEALTH: &str = "/health";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route that receives the ID token from the Google sign-in button.
pub const GOOGLE_SIGN_IN: &str = "/api/google_sign_in";
/// The route the client pings to keep an active session from idling out.
pub const KEEPALIVE: &str = "/api/keepalive";
/// The route to create expenses.
pub const EXPENSES_API: &str = "/api/expenses";
/// The route to update or delete a single expense.
pub const EXPENSE: &str = "/api/expenses/{expense_id}";
/// The route for the dashboard's quick add form.
pub const QUICK_ADD_EXPENSE: &str = "/api/dashboard/expenses";
/// The route to create a category.
pub const CATEGORIES_API: &str = "/api/categories";
/// The route to create a subcategory.
pub const SUBCATEGORIES_API: &str = "/api/subcategories";

/// Every path under this prefix belongs to the admin realm.
pub const ADMIN_PREFIX: &str = "/admin";
/// The admin landing page.
pub const ADMIN_VIEW: &str = "/admin";
/// The admin log-in page and form target.
pub const ADMIN_LOG_IN: &str = "/admin/login";
/// The route for logging out of the admin realm.
pub const ADMIN_LOG_OUT: &str = "/admin/log_out";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/expenses/{expense_id}', '{expense_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let param_start = match endpoint_path.find('{') {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
