//! Reports computed from a user's expenses: the pivot table, the dashboard
//! summary and the CSV export.

mod aggregation;
mod export;
mod filters;
mod pivot;

pub use aggregation::{
    MonthSummary, PivotExpense, PivotResult, PivotRow, compute_month_summary, compute_pivot,
};
pub use export::export_expenses;
pub use filters::{ReportQuery, month_names, parse_month, parse_year, year_options};
pub use pivot::get_pivot_page;
