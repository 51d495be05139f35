//! The page and endpoint for recording a new expense.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    expense::{
        ExpenseFormData, create_expense,
        form::{ExpenseForm, FormChoices, FormMethod, subcategory_filter_script},
    },
    html::{FORM_CONTAINER_STYLE, base, keepalive_script},
    navigation::NavBar,
    timezone::get_local_date,
    user::UserID,
};

/// The state needed by the pages and endpoints that show an expense form.
#[derive(Debug, Clone)]
pub struct ExpenseFormState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for ExpenseFormState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the page for adding an expense, with the date set to today.
pub async fn get_new_expense_page(State(state): State<ExpenseFormState>) -> Result<Response, Error> {
    let today = get_local_date(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let choices = FormChoices::load(&connection)?;
    let values = ExpenseFormData {
        date: today.to_string(),
        ..Default::default()
    };

    let form = ExpenseForm {
        endpoint: endpoints::EXPENSES_API,
        method: FormMethod::Post,
        choices: &choices,
        values: &values,
        error_message: "",
        submit_label: "Add Expense",
    }
    .into_html();

    let nav_bar = NavBar::new(endpoints::NEW_EXPENSE_VIEW).into_html();
    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    Ok(base(
        "Add Expense",
        &[keepalive_script(), subcategory_filter_script()],
        &content,
    )
    .into_response())
}

/// Handle the new expense form, redirecting to the expenses page on success.
pub async fn create_expense_endpoint(
    State(state): State<ExpenseFormState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ExpenseFormData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    create_expense_from_form(
        user_id,
        &form,
        endpoints::EXPENSES_API,
        endpoints::EXPENSES_VIEW,
        &connection,
    )
}

/// Validate `form` and save it as a new expense for `user_id`.
///
/// Invalid input re-renders the form, posting to `form_endpoint`, with the
/// error shown. On success the client is redirected to `redirect_url`.
pub(crate) fn create_expense_from_form(
    user_id: UserID,
    form: &ExpenseFormData,
    form_endpoint: &str,
    redirect_url: &str,
    connection: &Connection,
) -> Response {
    let choices = match FormChoices::load(connection) {
        Ok(choices) => choices,
        Err(error) => return error.into_alert_response(),
    };

    let new_expense = match form.validate(&choices.subcategory_map) {
        Ok(new_expense) => new_expense,
        Err(error) => {
            return ExpenseForm {
                endpoint: form_endpoint,
                method: FormMethod::Post,
                choices: &choices,
                values: form,
                error_message: &format!("Error: {error}"),
                submit_label: "Add Expense",
            }
            .into_html()
            .into_response();
        }
    };

    match create_expense(user_id, &new_expense, connection) {
        Ok(expense) => {
            tracing::debug!("User {user_id} created expense {}", expense.id);
            (HxRedirect(redirect_url.to_owned()), StatusCode::SEE_OTHER).into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}
