use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{Html, IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    expense::{ExpenseId, delete_expense},
    user::UserID,
};

/// The state needed to delete an expense.
#[derive(Debug, Clone)]
pub struct DeleteExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting one of the user's expenses.
///
/// Responds with an empty body so HTMX removes the table row, or an alert if
/// the user has no such expense.
pub async fn delete_expense_endpoint(
    State(state): State<DeleteExpenseState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<ExpenseId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_expense(expense_id, user_id, &connection) {
        // The status code has to be 200 OK or HTMX will not delete the table row.
        Ok(()) => Html("").into_response(),
        Err(error) => error.into_alert_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use time::macros::date;

    use crate::{
        Amount,
        expense::{
            NewExpense, count_expenses, create_expense, delete::DeleteExpenseState,
            delete_expense_endpoint,
        },
        test_utils::{create_test_category, create_test_user, get_test_connection},
    };

    #[tokio::test]
    async fn only_owner_can_delete() {
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
                description: "".to_owned(),
                date: date!(2024 - 01 - 15),
            },
            &connection,
        )
        .unwrap();
        let state = DeleteExpenseState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response =
            delete_expense_endpoint(State(state.clone()), Extension(bob.id), Path(expense.id))
                .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            delete_expense_endpoint(State(state.clone()), Extension(alice.id), Path(expense.id))
                .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            count_expenses(alice.id, &state.db_connection.lock().unwrap()),
            Ok(0)
        );
    }
}
