//! The page and endpoint for editing an expense.

use axum::{
    Extension, Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::html;

use crate::{
    Error,
    endpoints::{self, format_endpoint},
    expense::{
        ExpenseFormData, ExpenseId,
        create::ExpenseFormState,
        form::{ExpenseForm, FormChoices, FormMethod, subcategory_filter_script},
        get_expense, update_expense,
    },
    html::{FORM_CONTAINER_STYLE, base, keepalive_script},
    navigation::NavBar,
    user::UserID,
};

/// Render the form for editing one of the user's expenses.
///
/// Responds with the 404 page if the expense does not belong to the user.
pub async fn get_edit_expense_page(
    State(state): State<ExpenseFormState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<ExpenseId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let expense = get_expense(expense_id, user_id, &connection)?;
    let choices = FormChoices::load(&connection)?;
    let endpoint = format_endpoint(endpoints::EXPENSE, expense_id);

    let form = ExpenseForm {
        endpoint: &endpoint,
        method: FormMethod::Put,
        choices: &choices,
        values: &ExpenseFormData::from(&expense),
        error_message: "",
        submit_label: "Save Changes",
    }
    .into_html();

    let nav_bar = NavBar::new(endpoints::EDIT_EXPENSE_VIEW).into_html();
    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    Ok(base(
        "Edit Expense",
        &[keepalive_script(), subcategory_filter_script()],
        &content,
    )
    .into_response())
}

/// Handle the edit expense form, redirecting to the expenses page on success.
pub async fn update_expense_endpoint(
    State(state): State<ExpenseFormState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<ExpenseId>,
    Form(form): Form<ExpenseFormData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let choices = match FormChoices::load(&connection) {
        Ok(choices) => choices,
        Err(error) => return error.into_alert_response(),
    };

    let new_expense = match form.validate(&choices.subcategory_map) {
        Ok(new_expense) => new_expense,
        Err(error) => {
            let endpoint = format_endpoint(endpoints::EXPENSE, expense_id);

            return ExpenseForm {
                endpoint: &endpoint,
                method: FormMethod::Put,
                choices: &choices,
                values: &form,
                error_message: &format!("Error: {error}"),
                submit_label: "Save Changes",
            }
            .into_html()
            .into_response();
        }
    };

    match update_expense(expense_id, user_id, &new_expense, &connection) {
        Ok(()) => (
            HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::warn!("Could not update expense {expense_id} for user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Form,
        extract::{Path, State},
        http::StatusCode,
    };
    use time::macros::date;

    use crate::{
        Amount,
        endpoints::{self, format_endpoint},
        expense::{
            ExpenseFormData, NewExpense, create::ExpenseFormState, create_expense,
            get_edit_expense_page, get_expense, update_expense_endpoint,
        },
        test_utils::{
            assert_form_input_with_value, assert_hx_endpoint, assert_hx_redirect,
            assert_valid_html, create_test_category, create_test_user, get_test_connection,
            must_get_form, parse_html_document,
        },
        user::UserID,
    };

    fn set_up() -> (ExpenseFormState, UserID, UserID, i64, i64) {
        let connection = get_test_connection();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);
        let category = create_test_category("Food", &connection);
        let expense = create_expense(
            alice.id,
            &NewExpense {
                category_id: category.id,
                subcategory_id: None,
                amount: Amount::from_cents(1000),
                description: "lunch".to_owned(),
                date: date!(2024 - 01 - 15),
            },
            &connection,
        )
        .unwrap();

        let state = ExpenseFormState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        (state, alice.id, bob.id, category.id, expense.id)
    }

    #[tokio::test]
    async fn edit_page_shows_current_values() {
        let (state, alice, _, _, expense_id) = set_up();

        let response = get_edit_expense_page(State(state), Extension(alice), Path(expense_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &format_endpoint(endpoints::EXPENSE, expense_id),
            "hx-put",
        );
        assert_form_input_with_value(&form, "amount", "number", "10.00");
        assert_form_input_with_value(&form, "date", "date", "2024-01-15");
    }

    #[tokio::test]
    async fn other_users_expense_is_not_found() {
        let (state, _, bob, _, expense_id) = set_up();

        let result = get_edit_expense_page(State(state), Extension(bob), Path(expense_id)).await;

        assert_eq!(result.err(), Some(crate::Error::NotFound));
    }

    #[tokio::test]
    async fn can_update_expense() {
        let (state, alice, _, category_id, expense_id) = set_up();
        let form = ExpenseFormData {
            category_id: category_id.to_string(),
            subcategory_id: "".to_owned(),
            amount: "12.34".to_owned(),
            description: "dinner".to_owned(),
            date: "2024-01-16".to_owned(),
        };

        let response = update_expense_endpoint(
            State(state.clone()),
            Extension(alice),
            Path(expense_id),
            Form(form),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::EXPENSES_VIEW);
        let expense = get_expense(expense_id, alice, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(expense.amount, Amount::from_cents(1234));
        assert_eq!(expense.description, "dinner");
        assert_eq!(expense.date, date!(2024 - 01 - 16));
    }

    #[tokio::test]
    async fn updating_other_users_expense_returns_not_found() {
        let (state, _, bob, category_id, expense_id) = set_up();
        let form = ExpenseFormData {
            category_id: category_id.to_string(),
            subcategory_id: "".to_owned(),
            amount: "1.00".to_owned(),
            description: "".to_owned(),
            date: "2024-01-16".to_owned(),
        };

        let response =
            update_expense_endpoint(State(state), Extension(bob), Path(expense_id), Form(form))
                .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
