//! The dashboard: totals for a selected month and a quick-add expense form.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{Date, Month};

use crate::{
    AppState, Amount, Error, endpoints,
    expense::{
        ExpenseFilter, ExpenseForm, ExpenseFormData, ExpenseWithNames, FormChoices, FormMethod,
        UNCATEGORIZED, create_expense_from_form, find_distinct_category_ids,
        find_expenses_in_date_range, month_date_range, subcategory_filter_script, sum_amount,
    },
    html::{
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency, keepalive_script,
    },
    navigation::NavBar,
    report::{
        MonthSummary, ReportQuery, compute_month_summary, month_names, parse_month, parse_year,
        year_options,
    },
    timezone::get_local_date,
    user::UserID,
};

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq)]
struct DashboardView {
    selected_year: i32,
    selected_month: Month,
    summary: MonthSummary,
    /// The number of categories used in the selected month.
    category_count: usize,
}

impl DashboardView {
    fn new(
        user_id: UserID,
        selected_year: i32,
        selected_month: Month,
        today: Date,
        connection: &Connection,
    ) -> Result<Self, Error> {
        let (start, end) = month_date_range(selected_year, selected_month)
            .ok_or_else(|| Error::InvalidDate(selected_year.to_string()))?;
        let expenses = find_expenses_in_date_range(user_id, start, end, connection)?;
        let mut summary = compute_month_summary(&expenses, selected_year, selected_month, today);

        let month_filter = ExpenseFilter {
            user_id,
            year: selected_year,
            month: Some(selected_month),
            category_id: None,
        };

        // Only the selected month's rows are loaded, so the year total is summed by the store.
        summary.year_total = sum_amount(
            &ExpenseFilter {
                month: None,
                ..month_filter
            },
            connection,
        )?;

        let category_count = find_distinct_category_ids(&month_filter, connection)?.len();

        Ok(Self {
            selected_year,
            selected_month,
            summary,
            category_count,
        })
    }
}

/// Display the dashboard for the month in the `year` and `month` query
/// parameters, defaulting to the current month.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Error> {
    let today = get_local_date(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let selected_year = parse_year(query.year.as_deref(), today.year());
    let selected_month = parse_month(query.month.as_deref(), today.month());

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let view = DashboardView::new(user_id, selected_year, selected_month, today, &connection)?;
    let choices = FormChoices::load(&connection)?;
    let quick_add_values = ExpenseFormData {
        date: today.to_string(),
        ..Default::default()
    };

    Ok(dashboard_view(&view, &choices, &quick_add_values, today.year()).into_response())
}

/// Handle the dashboard's quick-add form.
///
/// On success the client is sent back to the dashboard. Invalid input
/// re-renders the form with the error.
pub async fn quick_add_expense_endpoint(
    State(state): State<DashboardState>,
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
        endpoints::QUICK_ADD_EXPENSE,
        endpoints::DASHBOARD_VIEW,
        &connection,
    )
}

fn month_picker_view(view: &DashboardView, current_year: i32) -> Markup {
    html! {
        form method="get" action=(endpoints::DASHBOARD_VIEW) class="flex items-end gap-2"
        {
            select name="month" aria-label="Month" class="p-2 rounded text-sm bg-gray-50 dark:bg-gray-700"
            {
                @for (index, month_name) in month_names().iter().enumerate() {
                    @let month_number = index as u8 + 1;
                    option
                        value=(month_number)
                        selected[month_number == u8::from(view.selected_month)]
                    {
                        (month_name)
                    }
                }
            }

            select name="year" aria-label="Year" class="p-2 rounded text-sm bg-gray-50 dark:bg-gray-700"
            {
                @for year in year_options(current_year) {
                    option value=(year) selected[year == view.selected_year] { (year) }
                }
            }

            button type="submit" class="px-4 py-2 bg-blue-500 hover:enabled:bg-blue-600 text-white rounded"
            {
                "Show"
            }
        }
    }
}

fn stat_card(id: &str, label: &str, value: &str) -> Markup {
    html! {
        div id=(id) class="p-4 rounded-lg shadow bg-gray-50 dark:bg-gray-800"
        {
            dt class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            dd class="text-2xl font-bold text-gray-900 dark:text-white" { (value) }
        }
    }
}

fn today_expenses_view(expenses: &[ExpenseWithNames], today_total: Amount) -> Markup {
    if expenses.is_empty() {
        return html! {
            p class="text-gray-500 dark:text-gray-400" { "Nothing recorded today." }
        };
    }

    html! {
        table id="today-expenses" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                    th scope="col" class="px-6 py-4 text-right" { "Amount" }
                }
            }

            tbody
            {
                @for expense in expenses {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td class=(TABLE_CELL_STYLE)
                        {
                            (expense.category_name.as_deref().unwrap_or(UNCATEGORIZED))
                            @if let Some(subcategory_name) = &expense.subcategory_name {
                                " > " (subcategory_name)
                            }
                        }
                        td class=(TABLE_CELL_STYLE) { (expense.expense.description) }
                        td class="px-6 py-4 text-right" { (format_currency(expense.expense.amount)) }
                    }
                }
            }

            tfoot
            {
                tr class="font-semibold text-gray-900 dark:text-white"
                {
                    th scope="row" colspan="2" class=(TABLE_CELL_STYLE) { "Today" }
                    td class="px-6 py-4 text-right" { (format_currency(today_total)) }
                }
            }
        }
    }
}

fn dashboard_view(
    view: &DashboardView,
    choices: &FormChoices,
    quick_add_values: &ExpenseFormData,
    current_year: i32,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();
    let month_name = month_names()[u8::from(view.selected_month) as usize - 1];
    let quick_add_form = ExpenseForm {
        endpoint: endpoints::QUICK_ADD_EXPENSE,
        method: FormMethod::Post,
        choices,
        values: quick_add_values,
        error_message: "",
        submit_label: "Add Expense",
    }
    .into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    h1 class="text-xl font-bold"
                    {
                        "Dashboard, " (month_name) " " (view.selected_year)
                    }
                    (month_picker_view(view, current_year))
                }

                dl id="dashboard-summary" class="grid grid-cols-1 sm:grid-cols-3 gap-4"
                {
                    (stat_card("month-total", "This month", &format_currency(view.summary.month_total)))
                    (stat_card("year-total", "This year", &format_currency(view.summary.year_total)))
                    (stat_card("category-count", "Categories this month", &view.category_count.to_string()))
                }

                div class="grid grid-cols-1 lg:grid-cols-2 gap-6"
                {
                    section class="space-y-4"
                    {
                        h2 class="text-lg font-semibold" { "Today" }
                        (today_expenses_view(&view.summary.today_expenses, view.summary.today_total))
                    }

                    section id="quick-add" class="space-y-4"
                    {
                        h2 class="text-lg font-semibold" { "Quick Add" }
                        (quick_add_form)
                    }
                }
            }
        }
    };

    base(
        "Dashboard",
        &[keepalive_script(), subcategory_filter_script()],
        &content,
    )
}

#[cfg(test)]
mod dashboard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Form,
        extract::{Query, State},
        http::StatusCode,
    };
    use scraper::Selector;
    use time::{Duration, Month};

    use crate::{
        Amount, endpoints,
        expense::{ExpenseFormData, NewExpense, count_expenses, create_expense},
        report::ReportQuery,
        test_utils::{
            assert_hx_endpoint, assert_hx_redirect, assert_valid_html, create_test_category,
            create_test_user, get_test_connection, parse_html_document,
        },
        timezone::get_local_date,
        user::UserID,
    };

    use super::{DashboardState, DashboardView, get_dashboard_page, quick_add_expense_endpoint};

    struct Fixture {
        state: DashboardState,
        user_id: UserID,
        category_id: i64,
    }

    fn set_up() -> Fixture {
        let connection = get_test_connection();
        let user = create_test_user("alice", &connection);
        let category = create_test_category("Food", &connection);

        Fixture {
            state: DashboardState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user_id: user.id,
            category_id: category.id,
        }
    }

    fn add_expense(fixture: &Fixture, cents: i64, date: time::Date) {
        create_expense(
            fixture.user_id,
            &NewExpense {
                category_id: fixture.category_id,
                subcategory_id: None,
                amount: Amount::from_cents(cents),
                description: "snack".to_owned(),
                date,
            },
            &fixture.state.db_connection.lock().unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn view_sums_month_year_and_today() {
        let fixture = set_up();
        let today = time::macros::date!(2024 - 03 - 15);
        add_expense(&fixture, 1_000, today);
        add_expense(&fixture, 250, today - Duration::days(1));
        add_expense(&fixture, 5_000, time::macros::date!(2024 - 01 - 10));
        add_expense(&fixture, 9_999, time::macros::date!(2023 - 03 - 15));

        let view = DashboardView::new(
            fixture.user_id,
            2024,
            Month::March,
            today,
            &fixture.state.db_connection.lock().unwrap(),
        )
        .unwrap();

        assert_eq!(view.summary.month_total, Amount::from_cents(1_250));
        assert_eq!(view.summary.year_total, Amount::from_cents(6_250));
        assert_eq!(view.summary.today_total, Amount::from_cents(1_000));
        assert_eq!(view.summary.today_expenses.len(), 1);
        assert_eq!(view.category_count, 1);
    }

    #[test]
    fn other_month_has_no_today_figures() {
        let fixture = set_up();
        let today = time::macros::date!(2024 - 03 - 15);
        add_expense(&fixture, 1_000, today);

        let view = DashboardView::new(
            fixture.user_id,
            2024,
            Month::February,
            today,
            &fixture.state.db_connection.lock().unwrap(),
        )
        .unwrap();

        assert_eq!(view.summary.month_total, Amount::ZERO);
        assert_eq!(view.summary.today_total, Amount::ZERO);
        assert!(view.summary.today_expenses.is_empty());
        assert_eq!(view.category_count, 0);
    }

    #[tokio::test]
    async fn page_shows_totals_and_quick_add_form() {
        let fixture = set_up();
        let today = get_local_date("Etc/UTC").unwrap();
        add_expense(&fixture, 1_550, today);

        let response = get_dashboard_page(
            State(fixture.state.clone()),
            Extension(fixture.user_id),
            Query(ReportQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let month_total = Selector::parse("#month-total dd").unwrap();
        let month_total = document.select(&month_total).next().unwrap();
        assert_eq!(month_total.text().collect::<String>(), "₹15.50");

        let today_rows = Selector::parse("#today-expenses tbody tr").unwrap();
        assert_eq!(document.select(&today_rows).count(), 1);

        let form = Selector::parse("#quick-add form").unwrap();
        let form = document.select(&form).next().expect("missing quick-add form");
        assert_hx_endpoint(&form, endpoints::QUICK_ADD_EXPENSE, "hx-post");
    }

    #[tokio::test]
    async fn malformed_month_falls_back_to_current_month() {
        let fixture = set_up();

        let response = get_dashboard_page(
            State(fixture.state.clone()),
            Extension(fixture.user_id),
            Query(ReportQuery {
                year: Some("soon".to_owned()),
                month: Some("13".to_owned()),
                category: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let today = get_local_date("Etc/UTC").unwrap();
        let document = parse_html_document(response).await;
        let selected = Selector::parse("select[name=month] option[selected]").unwrap();
        let selected = document.select(&selected).next().unwrap();
        assert_eq!(
            selected.value().attr("value"),
            Some(u8::from(today.month()).to_string().as_str())
        );
    }

    #[tokio::test]
    async fn quick_add_creates_expense_and_redirects() {
        let fixture = set_up();
        let form = ExpenseFormData {
            category_id: fixture.category_id.to_string(),
            subcategory_id: String::new(),
            amount: "12.30".to_owned(),
            description: "coffee".to_owned(),
            date: "2024-03-15".to_owned(),
        };

        let response = quick_add_expense_endpoint(
            State(fixture.state.clone()),
            Extension(fixture.user_id),
            Form(form),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
        assert_eq!(
            count_expenses(fixture.user_id, &fixture.state.db_connection.lock().unwrap()),
            Ok(1)
        );
    }

    #[tokio::test]
    async fn quick_add_rerenders_form_on_error() {
        let fixture = set_up();
        let form = ExpenseFormData {
            category_id: String::new(),
            amount: "12.30".to_owned(),
            date: "2024-03-15".to_owned(),
            ..Default::default()
        };

        let response = quick_add_expense_endpoint(
            State(fixture.state.clone()),
            Extension(fixture.user_id),
            Form(form),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("Category is required."));
        assert!(body.contains(endpoints::QUICK_ADD_EXPENSE));
    }
}
