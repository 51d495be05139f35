//! CSV export of a user's expenses for one month.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    expense::{ExpenseFilter, ExportRow, UNCATEGORIZED, find_export_rows},
    report::filters::{ReportQuery, parse_category_filter, parse_month, parse_year},
    timezone::get_local_date,
    user::UserID,
};

/// The state needed for exporting expenses.
#[derive(Debug, Clone)]
pub struct ExportState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for ExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Download the user's expenses for a month as a CSV attachment.
///
/// The query parameters `year`, `month` and `category` default to the
/// current year, the current month and all categories.
pub async fn export_expenses(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Error> {
    let today = get_local_date(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let filter = ExpenseFilter {
        user_id,
        year: parse_year(query.year.as_deref(), today.year()),
        month: Some(parse_month(query.month.as_deref(), today.month())),
        category_id: parse_category_filter(query.category.as_deref()),
    };

    let rows = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        find_export_rows(&filter, &connection)?
    };

    let body = write_csv(&rows)?;
    let month = filter.month.map(u8::from).unwrap_or_default();
    let file_name = format!("expenses_{user_id}_{}_{month}.csv", filter.year);

    Ok((
        [
            (CONTENT_TYPE, "text/csv".to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}

/// Write one line per row with the columns date, category, subcategory,
/// amount and description. No header line is written.
pub fn write_csv(rows: &[ExportRow]) -> Result<String, Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    for row in rows {
        writer
            .write_record([
                row.date.to_string(),
                row.category.as_deref().unwrap_or(UNCATEGORIZED).to_owned(),
                row.subcategory
                    .as_deref()
                    .unwrap_or(UNCATEGORIZED)
                    .to_owned(),
                row.amount.to_string(),
                row.description.clone(),
            ])
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        body::to_bytes,
        extract::{Query, State},
        http::StatusCode,
    };
    use time::macros::date;

    use crate::{
        Amount,
        expense::{ExportRow, NewExpense, create_expense},
        report::{
            export::{ExportState, export_expenses, write_csv},
            filters::ReportQuery,
        },
        test_utils::{
            assert_content_type, create_test_category, create_test_subcategory, create_test_user,
            get_header, get_test_connection,
        },
        user::UserID,
    };

    struct Fixture {
        state: ExportState,
        user_id: UserID,
        travel_id: i64,
        food_id: i64,
    }

    fn set_up() -> Fixture {
        let connection = get_test_connection();
        let user = create_test_user("alice", &connection);
        let travel = create_test_category("Travel", &connection);
        let food = create_test_category("Food", &connection);
        let flights = create_test_subcategory(&travel, "Flights", &connection);

        create_expense(
            user.id,
            &NewExpense {
                category_id: travel.id,
                subcategory_id: Some(flights.id),
                amount: Amount::from_cents(25000),
                description: String::new(),
                date: date!(2024 - 03 - 01),
            },
            &connection,
        )
        .unwrap();

        Fixture {
            state: ExportState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user_id: user.id,
            travel_id: travel.id,
            food_id: food.id,
        }
        .with_expense(food.id, 1234, date!(2024 - 04 - 02))
    }

    impl Fixture {
        fn with_expense(self, category_id: i64, cents: i64, date: time::Date) -> Self {
            create_expense(
                self.user_id,
                &NewExpense {
                    category_id,
                    subcategory_id: None,
                    amount: Amount::from_cents(cents),
                    description: "lunch, with friends".to_owned(),
                    date,
                },
                &self.state.db_connection.lock().unwrap(),
            )
            .unwrap();

            self
        }
    }

    async fn export(fixture: &Fixture, year: &str, month: &str, category: &str) -> (String, String) {
        let query = ReportQuery {
            year: Some(year.to_owned()),
            month: Some(month.to_owned()),
            category: Some(category.to_owned()),
        };

        let response = export_expenses(
            State(fixture.state.clone()),
            Extension(fixture.user_id),
            Query(query),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/csv");
        let disposition = get_header(&response, "content-disposition");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (disposition, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn exports_single_expense_as_one_line() {
        let fixture = set_up();

        let (disposition, body) = export(&fixture, "2024", "3", "all").await;

        assert_eq!(body, "2024-03-01,Travel,Flights,250.00,\n");
        assert_eq!(
            disposition,
            format!(
                "attachment; filename=\"expenses_{}_2024_3.csv\"",
                fixture.user_id
            )
        );
    }

    #[tokio::test]
    async fn filters_by_category() {
        let fixture = set_up();
        let food_id = fixture.food_id;
        let fixture = fixture.with_expense(food_id, 500, date!(2024 - 03 - 05));

        let (_, body) = export(&fixture, "2024", "3", &fixture.travel_id.to_string()).await;

        assert_eq!(body, "2024-03-01,Travel,Flights,250.00,\n");
    }

    #[tokio::test]
    async fn quotes_descriptions_with_commas() {
        let fixture = set_up();

        let (_, body) = export(&fixture, "2024", "4", "all").await;

        assert_eq!(body, "2024-04-02,Food,Uncategorized,12.34,\"lunch, with friends\"\n");
    }

    #[tokio::test]
    async fn empty_month_exports_nothing() {
        let fixture = set_up();

        let (_, body) = export(&fixture, "2024", "5", "all").await;

        assert_eq!(body, "");
    }

    #[test]
    fn missing_names_are_uncategorized() {
        let rows = [ExportRow {
            date: date!(2024 - 01 - 20),
            category: None,
            subcategory: None,
            amount: Amount::from_cents(325),
            description: String::new(),
        }];

        assert_eq!(
            write_csv(&rows).unwrap(),
            "2024-01-20,Uncategorized,Uncategorized,3.25,\n"
        );
    }
}
