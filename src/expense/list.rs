//! The paginated list of a user's expenses.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    endpoints::{self, format_endpoint},
    expense::{ExpenseWithNames, UNCATEGORIZED, count_expenses, get_expense_page},
    html::{
        BUTTON_DELETE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, keepalive_script,
    },
    navigation::NavBar,
    pagination::{
        PaginationConfig, create_pagination_indicators, page_count, pagination_view, parse_page,
    },
    user::UserID,
};

/// The state needed for the expenses page.
#[derive(Debug, Clone)]
pub struct ExpensesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for ExpensesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The query parameters for the expenses page.
#[derive(Debug, Default, Deserialize)]
pub struct ExpensesQuery {
    pub page: Option<String>,
}

/// Render one page of the user's expenses, newest first.
///
/// A missing or malformed page number shows the first page, and a page past
/// the end shows an empty table.
pub async fn get_expenses_page(
    State(state): State<ExpensesPageState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ExpensesQuery>,
) -> Result<Response, Error> {
    let page_size = state.pagination_config.page_size;
    let curr_page = parse_page(query.page.as_deref());

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let expense_count = count_expenses(user_id, &connection)?;
    let offset = (curr_page - 1).saturating_mul(page_size);
    let expenses = get_expense_page(user_id, page_size, offset, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve expenses: {error}"))?;

    let page_count = page_count(expense_count, page_size);
    let indicators =
        create_pagination_indicators(curr_page, page_count, state.pagination_config.max_pages);
    let pagination = pagination_view(endpoints::EXPENSES_VIEW, &indicators);

    Ok(expenses_view(&expenses, &pagination).into_response())
}

fn expense_row_view(row: &ExpenseWithNames) -> Markup {
    let expense = &row.expense;
    let edit_url = format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense.id);
    let delete_url = format_endpoint(endpoints::EXPENSE, expense.id);

    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (expense.date) }
            td class=(TABLE_CELL_STYLE)
            {
                (row.category_name.as_deref().unwrap_or(UNCATEGORIZED))
                @if let Some(subcategory_name) = &row.subcategory_name {
                    " > " (subcategory_name)
                }
            }
            td class="px-6 py-4 text-right" { (format_currency(expense.amount)) }
            td class=(TABLE_CELL_STYLE) { (expense.description) }
            td class=(TABLE_CELL_STYLE)
            {
                div class="flex gap-4"
                {
                    a href=(edit_url) class=(LINK_STYLE) { "Edit" }

                    button
                        hx-delete=(delete_url)
                        hx-confirm="Are you sure you want to delete this expense?"
                        hx-target="closest tr"
                        hx-target-error="#alert-container"
                        hx-swap="outerHTML"
                        class=(BUTTON_DELETE_STYLE)
                    {
                        "Delete"
                    }
                }
            }
        }
    }
}

fn expenses_view(expenses: &[ExpenseWithNames], pagination: &Markup) -> Markup {
    let nav_bar = NavBar::new(endpoints::EXPENSES_VIEW).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    h1 class="text-xl font-bold" { "Expenses" }

                    a href=(endpoints::NEW_EXPENSE_VIEW) class=(LINK_STYLE) { "Add Expense" }
                }

                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class="px-6 py-4 text-right" { "Amount" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for row in expenses {
                            (expense_row_view(row))
                        }

                        @if expenses.is_empty() {
                            tr
                            {
                                td colspan="5" class="px-6 py-4 text-center"
                                {
                                    "No expenses here. "
                                    a href=(endpoints::NEW_EXPENSE_VIEW) class=(LINK_STYLE)
                                    {
                                        "Add an expense"
                                    }
                                }
                            }
                        }
                    }
                }

                (pagination)
            }
        }
    };

    base("Expenses", &[keepalive_script()], &content)
}
