use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use expense_ledger::{initialize_db, populate_default_categories};

/// Add the default categories and subcategories that are missing from the database.
///
/// Safe to run more than once: existing categories are left alone.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,
}

fn main() {
    let args = Args::parse();

    let connection = match Connection::open(&args.db_path) {
        Ok(connection) => connection,
        Err(error) => {
            eprintln!("Could not open the database at {}: {error}", args.db_path);
            exit(1);
        }
    };

    if let Err(error) = initialize_db(&connection) {
        eprintln!("Could not initialize the database: {error}");
        exit(1);
    }

    match populate_default_categories(&connection) {
        Ok(0) => println!("All default categories already exist."),
        Ok(created_count) => println!("Created {created_count} categories and subcategories."),
        Err(error) => {
            eprintln!("Could not create the default categories: {error}");
            exit(1);
        }
    }
}
