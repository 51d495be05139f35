//! Database operations for expenses.

use std::collections::BTreeSet;

use rusqlite::{Connection, Row, named_params};
use time::{Date, Month, OffsetDateTime};

use crate::{
    Amount, Error,
    category::CategoryId,
    expense::{
        Expense, ExpenseId, ExpenseWithNames, NewExpense,
        core::{month_date_range, year_date_range},
    },
    report::PivotExpense,
    user::UserID,
};

/// Selects the expenses for one user, e.g. for totals and CSV export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpenseFilter {
    pub user_id: UserID,
    pub year: i32,
    /// `None` selects the whole year.
    pub month: Option<Month>,
    /// `None` selects every category.
    pub category_id: Option<CategoryId>,
}

impl ExpenseFilter {
    /// The inclusive date range covered by the filter.
    fn date_range(&self) -> Result<(Date, Date), Error> {
        let range = match self.month {
            Some(month) => month_date_range(self.year, month),
            None => year_date_range(self.year),
        };

        range.ok_or_else(|| Error::InvalidDate(self.year.to_string()))
    }
}

/// One line of a CSV export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub date: Date,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub amount: Amount,
    pub description: String,
}

/// Create the expense table.
///
/// Deleting a user or category deletes their expenses, while deleting a
/// subcategory only clears it from its expenses.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            category_id INTEGER,
            subcategory_id INTEGER,
            amount INTEGER NOT NULL CHECK (amount > 0),
            description TEXT NOT NULL DEFAULT '',
            date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON DELETE CASCADE,
            FOREIGN KEY(subcategory_id) REFERENCES subcategory(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date);",
    )?;

    Ok(())
}

fn map_foreign_key_error(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::InvalidCategory,
        error => error.into(),
    }
}

/// Create an expense for `user_id`.
///
/// # Errors
///
/// Returns [Error::InvalidCategory] if the category or subcategory does not exist.
pub fn create_expense(
    user_id: UserID,
    new_expense: &NewExpense,
    connection: &Connection,
) -> Result<Expense, Error> {
    connection
        .prepare(
            "INSERT INTO expense
                (user_id, category_id, subcategory_id, amount, description, date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id, user_id, category_id, subcategory_id, amount, description, date, created_at",
        )?
        .query_row(
            (
                user_id.as_i64(),
                new_expense.category_id,
                new_expense.subcategory_id,
                new_expense.amount,
                &new_expense.description,
                new_expense.date,
                OffsetDateTime::now_utc(),
            ),
            map_expense_row,
        )
        .map_err(map_foreign_key_error)
}

/// Get the expense `expense_id` if it belongs to `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the expense does not exist or belongs to another user.
pub fn get_expense(
    expense_id: ExpenseId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Expense, Error> {
    connection
        .prepare(
            "SELECT id, user_id, category_id, subcategory_id, amount, description, date, created_at
            FROM expense WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            named_params! {":id": expense_id, ":user_id": user_id.as_i64()},
            map_expense_row,
        )
        .map_err(Error::from)
}

/// Overwrite the fields of the expense `expense_id` owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::UpdateMissingExpense] if the user has no such expense.
pub fn update_expense(
    expense_id: ExpenseId,
    user_id: UserID,
    new_expense: &NewExpense,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE expense
            SET category_id = :category_id, subcategory_id = :subcategory_id,
                amount = :amount, description = :description, date = :date
            WHERE id = :id AND user_id = :user_id",
            named_params! {
                ":category_id": new_expense.category_id,
                ":subcategory_id": new_expense.subcategory_id,
                ":amount": new_expense.amount,
                ":description": &new_expense.description,
                ":date": new_expense.date,
                ":id": expense_id,
                ":user_id": user_id.as_i64(),
            },
        )
        .map_err(map_foreign_key_error)?;

    match rows_affected {
        0 => Err(Error::UpdateMissingExpense),
        _ => Ok(()),
    }
}

/// Delete the expense `expense_id` owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::DeleteMissingExpense] if the user has no such expense.
pub fn delete_expense(
    expense_id: ExpenseId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM expense WHERE id = :id AND user_id = :user_id",
        named_params! {":id": expense_id, ":user_id": user_id.as_i64()},
    )?;

    match rows_affected {
        0 => Err(Error::DeleteMissingExpense),
        _ => Ok(()),
    }
}

/// The number of expenses recorded by `user_id`.
pub fn count_expenses(user_id: UserID, connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM expense WHERE user_id = ?1",
            [user_id.as_i64()],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

const SELECT_EXPENSE_WITH_NAMES: &str = "SELECT expense.id, expense.user_id, \
    expense.category_id, expense.subcategory_id, expense.amount, expense.description, \
    expense.date, expense.created_at, category.name, subcategory.name \
    FROM expense \
    LEFT JOIN category ON category.id = expense.category_id \
    LEFT JOIN subcategory ON subcategory.id = expense.subcategory_id";

/// Get one page of a user's expenses, newest first.
pub fn get_expense_page(
    user_id: UserID,
    limit: u64,
    offset: u64,
    connection: &Connection,
) -> Result<Vec<ExpenseWithNames>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE_WITH_NAMES} WHERE expense.user_id = :user_id \
            ORDER BY expense.date DESC, expense.created_at DESC, expense.id DESC \
            LIMIT :limit OFFSET :offset"
        ))?
        .query_map(
            named_params! {
                ":user_id": user_id.as_i64(),
                ":limit": limit as i64,
                ":offset": offset as i64,
            },
            map_expense_with_names_row,
        )?
        .map(|maybe_expense| maybe_expense.map_err(Error::from))
        .collect()
}

/// Get the expenses of `user_id` dated between `start` and `end` inclusive, newest first.
pub fn find_expenses_in_date_range(
    user_id: UserID,
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<Vec<ExpenseWithNames>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_EXPENSE_WITH_NAMES} WHERE expense.user_id = :user_id \
            AND expense.date BETWEEN :start AND :end \
            ORDER BY expense.date DESC, expense.created_at DESC, expense.id DESC"
        ))?
        .query_map(
            named_params! {":user_id": user_id.as_i64(), ":start": start, ":end": end},
            map_expense_with_names_row,
        )?
        .map(|maybe_expense| maybe_expense.map_err(Error::from))
        .collect()
}

/// Get the category names, amount and date of every expense of `user_id` in `year`.
///
/// Names are joined in the same query so the pivot needs no further lookups.
pub fn find_pivot_expenses(
    user_id: UserID,
    year: i32,
    connection: &Connection,
) -> Result<Vec<PivotExpense>, Error> {
    let (start, end) = year_date_range(year).ok_or_else(|| Error::InvalidDate(year.to_string()))?;

    connection
        .prepare(
            "SELECT category.name, subcategory.name, expense.amount, expense.date
            FROM expense
            LEFT JOIN category ON category.id = expense.category_id
            LEFT JOIN subcategory ON subcategory.id = expense.subcategory_id
            WHERE expense.user_id = :user_id AND expense.date BETWEEN :start AND :end",
        )?
        .query_map(
            named_params! {":user_id": user_id.as_i64(), ":start": start, ":end": end},
            |row| {
                Ok(PivotExpense {
                    category: row.get(0)?,
                    subcategory: row.get(1)?,
                    amount: row.get(2)?,
                    date: row.get(3)?,
                })
            },
        )?
        .map(|maybe_expense| maybe_expense.map_err(Error::from))
        .collect()
}

/// The total amount of the expenses selected by `filter`.
pub fn sum_amount(filter: &ExpenseFilter, connection: &Connection) -> Result<Amount, Error> {
    let (start, end) = filter.date_range()?;

    connection
        .query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM expense
            WHERE user_id = :user_id AND date BETWEEN :start AND :end
            AND (:category_id IS NULL OR category_id = :category_id)",
            named_params! {
                ":user_id": filter.user_id.as_i64(),
                ":start": start,
                ":end": end,
                ":category_id": filter.category_id,
            },
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// The IDs of the categories used by the expenses selected by `filter`.
pub fn find_distinct_category_ids(
    filter: &ExpenseFilter,
    connection: &Connection,
) -> Result<BTreeSet<CategoryId>, Error> {
    let (start, end) = filter.date_range()?;

    connection
        .prepare(
            "SELECT DISTINCT category_id FROM expense
            WHERE user_id = :user_id AND date BETWEEN :start AND :end
            AND category_id IS NOT NULL
            AND (:category_id IS NULL OR category_id = :category_id)",
        )?
        .query_map(
            named_params! {
                ":user_id": filter.user_id.as_i64(),
                ":start": start,
                ":end": end,
                ":category_id": filter.category_id,
            },
            |row| row.get(0),
        )?
        .map(|maybe_id| maybe_id.map_err(Error::from))
        .collect()
}

/// The rows to export for the expenses selected by `filter`, oldest first.
pub fn find_export_rows(
    filter: &ExpenseFilter,
    connection: &Connection,
) -> Result<Vec<ExportRow>, Error> {
    let (start, end) = filter.date_range()?;

    connection
        .prepare(
            "SELECT expense.date, category.name, subcategory.name, expense.amount,
                expense.description
            FROM expense
            LEFT JOIN category ON category.id = expense.category_id
            LEFT JOIN subcategory ON subcategory.id = expense.subcategory_id
            WHERE expense.user_id = :user_id AND expense.date BETWEEN :start AND :end
            AND (:category_id IS NULL OR expense.category_id = :category_id)
            ORDER BY expense.date ASC, expense.created_at ASC, expense.id ASC",
        )?
        .query_map(
            named_params! {
                ":user_id": filter.user_id.as_i64(),
                ":start": start,
                ":end": end,
                ":category_id": filter.category_id,
            },
            |row| {
                Ok(ExportRow {
                    date: row.get(0)?,
                    category: row.get(1)?,
                    subcategory: row.get(2)?,
                    amount: row.get(3)?,
                    description: row.get(4)?,
                })
            },
        )?
        .map(|maybe_row| maybe_row.map_err(Error::from))
        .collect()
}

fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    Ok(Expense {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        category_id: row.get(2)?,
        subcategory_id: row.get(3)?,
        amount: row.get(4)?,
        description: row.get(5)?,
        date: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_expense_with_names_row(row: &Row) -> Result<ExpenseWithNames, rusqlite::Error> {
    Ok(ExpenseWithNames {
        expense: map_expense_row(row)?,
        category_name: row.get(8)?,
        subcategory_name: row.get(9)?,
    })
}
