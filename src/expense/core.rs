//! The expense types and the validation applied to submitted expense forms.

use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime, macros::format_description};

use crate::{
    Amount, Error,
    category::{CategoryId, SubcategoryCategoryMap, SubcategoryId},
    user::UserID,
};

/// The maximum number of characters in an expense description.
pub const MAX_DESCRIPTION_LENGTH: usize = 255;

/// The name shown in place of a missing category or subcategory.
pub const UNCATEGORIZED: &str = "Uncategorized";

pub type ExpenseId = i64;

/// An amount of money spent by a user on a given day.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: ExpenseId,
    pub user_id: UserID,
    pub category_id: Option<CategoryId>,
    pub subcategory_id: Option<SubcategoryId>,
    /// Always at least [Amount::MIN_EXPENSE].
    pub amount: Amount,
    pub description: String,
    pub date: Date,
    pub created_at: OffsetDateTime,
}

/// An expense along with the names of its category and subcategory.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseWithNames {
    pub expense: Expense,
    pub category_name: Option<String>,
    pub subcategory_name: Option<String>,
}

/// The validated fields for creating or updating an expense.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub category_id: CategoryId,
    pub subcategory_id: Option<SubcategoryId>,
    pub amount: Amount,
    pub description: String,
    pub date: Date,
}

/// The raw form data submitted by the expense forms.
///
/// Every field is a string so that bad input is reported next to the form
/// instead of being rejected by the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseFormData {
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub subcategory_id: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
}

impl ExpenseFormData {
    /// Check the form fields and convert them into a [NewExpense].
    ///
    /// `subcategory_map` is used to check that the subcategory belongs to the
    /// chosen category.
    ///
    /// # Errors
    ///
    /// Returns the first problem found:
    /// - [Error::MissingCategory] if no category was chosen,
    /// - [Error::InvalidCategory] if a subcategory is not in `subcategory_map`,
    /// - [Error::SubcategoryCategoryMismatch] if the subcategory belongs to another category,
    /// - [Error::InvalidAmount], [Error::AmountTooSmall] or [Error::AmountTooLarge]
    ///   for a bad amount,
    /// - [Error::InvalidDate] if the date is not formatted as YYYY-MM-DD,
    /// - [Error::DescriptionTooLong] if the description is too long.
    pub fn validate(&self, subcategory_map: &SubcategoryCategoryMap) -> Result<NewExpense, Error> {
        let category_id = match self.category_id.trim() {
            "" => return Err(Error::MissingCategory),
            raw => raw
                .parse::<CategoryId>()
                .map_err(|_| Error::InvalidCategory)?,
        };

        let subcategory_id = match self.subcategory_id.trim() {
            "" => None,
            raw => {
                let subcategory_id = raw
                    .parse::<SubcategoryId>()
                    .map_err(|_| Error::InvalidCategory)?;

                match subcategory_map.get(&subcategory_id) {
                    None => return Err(Error::InvalidCategory),
                    Some(&owner) if owner != category_id => {
                        return Err(Error::SubcategoryCategoryMismatch);
                    }
                    Some(_) => Some(subcategory_id),
                }
            }
        };

        let amount: Amount = self.amount.parse()?;
        if amount < Amount::MIN_EXPENSE {
            return Err(Error::AmountTooSmall);
        } else if amount > Amount::MAX_EXPENSE {
            return Err(Error::AmountTooLarge);
        }

        let date = parse_date(&self.date)?;

        let description = self.description.trim().to_owned();
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(Error::DescriptionTooLong(MAX_DESCRIPTION_LENGTH));
        }

        Ok(NewExpense {
            category_id,
            subcategory_id,
            amount,
            description,
            date,
        })
    }
}

impl From<&Expense> for ExpenseFormData {
    fn from(expense: &Expense) -> Self {
        Self {
            category_id: expense
                .category_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            subcategory_id: expense
                .subcategory_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            amount: expense.amount.to_string(),
            description: expense.description.clone(),
            date: expense.date.to_string(),
        }
    }
}

/// Parse a date in the format YYYY-MM-DD.
pub fn parse_date(raw_date: &str) -> Result<Date, Error> {
    Date::parse(
        raw_date.trim(),
        format_description!("[year]-[month]-[day]"),
    )
    .map_err(|_| Error::InvalidDate(raw_date.to_owned()))
}

/// The first and last day of `month` in `year`.
pub fn month_date_range(year: i32, month: Month) -> Option<(Date, Date)> {
    let start = Date::from_calendar_date(year, month, 1).ok()?;
    let end =
        Date::from_calendar_date(year, month, time::util::days_in_year_month(year, month)).ok()?;

    Some((start, end))
}

/// The first and last day of `year`.
pub fn year_date_range(year: i32) -> Option<(Date, Date)> {
    let start = Date::from_calendar_date(year, Month::January, 1).ok()?;
    let end = Date::from_calendar_date(year, Month::December, 31).ok()?;

    Some((start, end))
}
