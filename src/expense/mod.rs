//! Expenses recorded by users, and the pages for managing them.

mod core;
mod create;
mod db;
mod delete;
mod edit;
mod form;
mod list;

pub use core::{
    Expense, ExpenseFormData, ExpenseId, ExpenseWithNames, NewExpense, UNCATEGORIZED,
    month_date_range,
};
pub use create::{ExpenseFormState, create_expense_endpoint, get_new_expense_page};
pub(crate) use create::create_expense_from_form;
pub use db::{
    ExpenseFilter, ExportRow, count_expenses, create_expense, create_expense_table,
    delete_expense, find_distinct_category_ids, find_expenses_in_date_range, find_export_rows,
    find_pivot_expenses, get_expense, get_expense_page, sum_amount, update_expense,
};
pub use delete::delete_expense_endpoint;
pub use edit::{get_edit_expense_page, update_expense_endpoint};
pub(crate) use form::{ExpenseForm, FormChoices, FormMethod, subcategory_filter_script};
pub use list::get_expenses_page;
