//! Expense aggregation for the pivot report and the dashboard summary.
//!
//! All sums use [Amount], so totals are exact regardless of how many
//! expenses are added together.

use std::collections::{BTreeSet, HashMap};

use time::{Date, Month};

use crate::{
    Amount,
    expense::{ExpenseWithNames, UNCATEGORIZED},
};

/// The fields of an expense needed to place it in the pivot grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotExpense {
    /// The category name, `None` if the expense has no category.
    pub category: Option<String>,
    /// The subcategory name, `None` if the expense has no subcategory.
    pub subcategory: Option<String>,
    pub amount: Amount,
    pub date: Date,
}

/// The monthly totals for one (category, subcategory) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    pub category: String,
    pub subcategory: String,
    /// Indexed by month, January is index 0.
    pub monthly_totals: [Amount; 12],
    pub row_total: Amount,
}

/// The pivot grid for one year along with its aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotResult {
    /// Sorted by category then subcategory.
    pub rows: Vec<PivotRow>,
    /// The column totals, indexed by month.
    pub month_totals: [Amount; 12],
    pub overall_total: Amount,
    pub distinct_category_count: usize,
    pub row_count: usize,
}

/// Group `expenses` dated in `year` by category and subcategory and sum them per month.
///
/// Missing names are grouped under "Uncategorized". Expenses from other years
/// are ignored.
pub fn compute_pivot(expenses: &[PivotExpense], year: i32) -> PivotResult {
    let mut groups: HashMap<(&str, &str), [Amount; 12]> = HashMap::new();

    for expense in expenses.iter().filter(|expense| expense.date.year() == year) {
        let key = (
            expense.category.as_deref().unwrap_or(UNCATEGORIZED),
            expense.subcategory.as_deref().unwrap_or(UNCATEGORIZED),
        );
        let month_index = month_index(expense.date.month());

        groups.entry(key).or_insert([Amount::ZERO; 12])[month_index] += expense.amount;
    }

    let mut rows: Vec<PivotRow> = groups
        .into_iter()
        .map(|((category, subcategory), monthly_totals)| PivotRow {
            category: category.to_owned(),
            subcategory: subcategory.to_owned(),
            row_total: monthly_totals.iter().sum(),
            monthly_totals,
        })
        .collect();
    rows.sort_unstable_by(|a, b| {
        (&a.category, &a.subcategory).cmp(&(&b.category, &b.subcategory))
    });

    let mut month_totals = [Amount::ZERO; 12];
    for row in &rows {
        for (total, amount) in month_totals.iter_mut().zip(row.monthly_totals) {
            *total += amount;
        }
    }

    let distinct_category_count = rows
        .iter()
        .map(|row| row.category.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    PivotResult {
        overall_total: rows.iter().map(|row| row.row_total).sum(),
        distinct_category_count,
        row_count: rows.len(),
        month_totals,
        rows,
    }
}

fn month_index(month: Month) -> usize {
    u8::from(month) as usize - 1
}

/// The totals shown on the dashboard for a selected month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthSummary {
    pub month_total: Amount,
    pub year_total: Amount,
    /// Zero unless the selected month is the current month.
    pub today_total: Amount,
    /// Empty unless the selected month is the current month.
    pub today_expenses: Vec<ExpenseWithNames>,
}

/// Sum `expenses` for the selected `year` and `month`, and for `today` when
/// the selected month is the current one.
pub fn compute_month_summary(
    expenses: &[ExpenseWithNames],
    year: i32,
    month: Month,
    today: Date,
) -> MonthSummary {
    let in_year = || {
        expenses
            .iter()
            .filter(move |expense| expense.expense.date.year() == year)
    };

    let year_total = in_year().map(|expense| expense.expense.amount).sum();
    let month_total = in_year()
        .filter(|expense| expense.expense.date.month() == month)
        .map(|expense| expense.expense.amount)
        .sum();

    let today_expenses: Vec<ExpenseWithNames> =
        if today.year() == year && today.month() == month {
            expenses
                .iter()
                .filter(|expense| expense.expense.date == today)
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

    MonthSummary {
        month_total,
        year_total,
        today_total: today_expenses
            .iter()
            .map(|expense| expense.expense.amount)
            .sum(),
        today_expenses,
    }
}
