//! Database schema set up.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    category::{create_category_table, create_subcategory_table},
    expense::create_expense_table,
    session::create_session_table,
    user::create_user_table,
};

/// Create the tables for all of the domain models if they do not exist.
///
/// Foreign key enforcement is switched on for `connection` first, since
/// SQLite leaves it off by default and the cascade rules depend on it.
///
/// # Errors
/// Returns an error if any of the tables could not be created, in which
/// case no tables are created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_subcategory_table(&transaction)?;
    create_expense_table(&transaction)?;
    create_session_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
