//! The category × month pivot report page.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Month;

use crate::{
    AppState, Amount, Error,
    category::{Category, get_all_categories},
    endpoints,
    expense::find_pivot_expenses,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
        keepalive_script,
    },
    navigation::NavBar,
    report::{
        aggregation::{PivotRow, compute_pivot},
        filters::{ReportQuery, month_names, parse_year, year_options},
    },
    timezone::get_local_date,
    user::UserID,
};

/// The state needed for the pivot report.
#[derive(Debug, Clone)]
pub struct PivotState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for PivotState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Everything shown on the pivot report page.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotView {
    pub rows: Vec<PivotRow>,
    pub month_names: [&'static str; 12],
    pub month_totals: [Amount; 12],
    pub selected_year: i32,
    /// Six years, newest first, starting from the current year.
    pub year_options: Vec<i32>,
    pub overall_total: Amount,
    pub distinct_category_count: usize,
    pub row_count: usize,
}

impl PivotView {
    /// Build the view for `selected_year` from the user's expenses in that year.
    pub fn new(
        user_id: UserID,
        selected_year: i32,
        current_year: i32,
        connection: &Connection,
    ) -> Result<Self, Error> {
        let expenses = find_pivot_expenses(user_id, selected_year, connection)?;
        let pivot = compute_pivot(&expenses, selected_year);

        Ok(Self {
            rows: pivot.rows,
            month_names: month_names(),
            month_totals: pivot.month_totals,
            selected_year,
            year_options: year_options(current_year),
            overall_total: pivot.overall_total,
            distinct_category_count: pivot.distinct_category_count,
            row_count: pivot.row_count,
        })
    }
}

/// Render the pivot table for the year in the `year` query parameter.
///
/// A missing or malformed year shows the current year.
pub async fn get_pivot_page(
    State(state): State<PivotState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Error> {
    let today = get_local_date(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let selected_year = parse_year(query.year.as_deref(), today.year());

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let view = PivotView::new(user_id, selected_year, today.year(), &connection)?;
    let categories = get_all_categories(&connection)?;

    Ok(pivot_page_view(&view, &categories, today.month()).into_response())
}

fn year_select(view: &PivotView, id: &str) -> Markup {
    html! {
        select id=(id) name="year" class=(FORM_TEXT_INPUT_STYLE)
        {
            @for year in &view.year_options {
                option value=(year) selected[*year == view.selected_year] { (year) }
            }
        }
    }
}

fn pivot_table_view(view: &PivotView) -> Markup {
    if view.rows.is_empty() {
        return html! {
            p class="text-gray-500 dark:text-gray-400"
            {
                "No expenses recorded in " (view.selected_year) "."
            }
        };
    }

    html! {
        div class="overflow-x-auto rounded-lg shadow"
        {
            table id="pivot-table" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class="px-3 py-3" { "Category" }
                        th scope="col" class="px-3 py-3" { "Subcategory" }
                        @for month_name in view.month_names {
                            th scope="col" class="px-3 py-3 text-right" { (month_name) }
                        }
                        th scope="col" class="px-3 py-3 text-right font-bold" { "Total" }
                    }
                }

                tbody
                {
                    @for row in &view.rows {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            th scope="row" class="px-3 py-4 font-medium text-gray-900 dark:text-white"
                            {
                                (row.category)
                            }
                            td class="px-3 py-4" { (row.subcategory) }
                            @for total in row.monthly_totals {
                                td class="px-3 py-4 text-right whitespace-nowrap"
                                {
                                    @if total != Amount::ZERO { (format_currency(total)) }
                                }
                            }
                            td class="px-3 py-4 text-right whitespace-nowrap font-bold"
                            {
                                (format_currency(row.row_total))
                            }
                        }
                    }
                }

                tfoot
                {
                    tr class="font-semibold text-gray-900 dark:text-white"
                    {
                        th scope="row" colspan="2" class="px-3 py-3" { "Total" }
                        @for total in view.month_totals {
                            td class="px-3 py-3 text-right whitespace-nowrap"
                            {
                                (format_currency(total))
                            }
                        }
                        td class="px-3 py-3 text-right whitespace-nowrap font-bold"
                        {
                            (format_currency(view.overall_total))
                        }
                    }
                }
            }
        }
    }
}

fn export_form_view(view: &PivotView, categories: &[Category], current_month: Month) -> Markup {
    html! {
        form
            method="get"
            action=(endpoints::EXPORT_EXPENSES)
            class="flex flex-wrap items-end gap-4"
        {
            div
            {
                label for="export-year" class=(FORM_LABEL_STYLE) { "Year" }
                (year_select(view, "export-year"))
            }

            div
            {
                label for="export-month" class=(FORM_LABEL_STYLE) { "Month" }
                select id="export-month" name="month" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for (index, month_name) in view.month_names.iter().enumerate() {
                        @let month_number = index as u8 + 1;
                        option
                            value=(month_number)
                            selected[month_number == u8::from(current_month)]
                        {
                            (month_name)
                        }
                    }
                }
            }

            div
            {
                label for="export-category" class=(FORM_LABEL_STYLE) { "Category" }
                select id="export-category" name="category" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="all" { "All categories" }
                    @for category in categories {
                        option value=(category.id) { (category.name) }
                    }
                }
            }

            div
            {
                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Export CSV" }
            }
        }
    }
}

fn pivot_page_view(view: &PivotView, categories: &[Category], current_month: Month) -> Markup {
    let nav_bar = NavBar::new(endpoints::PIVOT_VIEW).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6 w-full lg:max-w-7xl"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    h1 class="text-xl font-bold" { "Expenses by Category, " (view.selected_year) }

                    form method="get" action=(endpoints::PIVOT_VIEW) class="flex items-end gap-2"
                    {
                        label for="year" class="sr-only" { "Year" }
                        (year_select(view, "year"))
                        button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Show" }
                    }
                }

                dl id="pivot-summary" class="grid grid-cols-3 gap-4"
                {
                    div class=(TABLE_CELL_STYLE)
                    {
                        dt class="text-sm" { "Total" }
                        dd class="text-lg font-bold" { (format_currency(view.overall_total)) }
                    }
                    div class=(TABLE_CELL_STYLE)
                    {
                        dt class="text-sm" { "Categories" }
                        dd class="text-lg font-bold" { (view.distinct_category_count) }
                    }
                    div class=(TABLE_CELL_STYLE)
                    {
                        dt class="text-sm" { "Rows" }
                        dd class="text-lg font-bold" { (view.row_count) }
                    }
                }

                (pivot_table_view(view))

                h2 class="text-lg font-semibold" { "Export" }
                (export_form_view(view, categories, current_month))
            }
        }
    };

    base("Reports", &[keepalive_script()], &content)
}
