use std::{env, process::exit};

use clap::Parser;
use rusqlite::Connection;

use expense_ledger::{
    Error, NewUser, PasswordHash, ValidatedPassword, create_user, get_user_by_username,
    initialize_db,
};

/// Create a staff superuser from the `SUPERUSER_USERNAME`, `SUPERUSER_EMAIL`
/// and `SUPERUSER_PASSWORD` environment variables.
///
/// Does nothing when any of the variables is missing or the user already exists.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,
}

fn read_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn main() {
    let args = Args::parse();

    let (Some(username), Some(email), Some(password)) = (
        read_env("SUPERUSER_USERNAME"),
        read_env("SUPERUSER_EMAIL"),
        read_env("SUPERUSER_PASSWORD"),
    ) else {
        println!(
            "SUPERUSER_USERNAME, SUPERUSER_EMAIL and SUPERUSER_PASSWORD must all be set, \
            skipping superuser creation."
        );
        return;
    };

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

    match get_user_by_username(&username, &connection) {
        Ok(_) => {
            println!("The user {username} already exists, skipping superuser creation.");
            return;
        }
        Err(Error::NotFound) => {}
        Err(error) => {
            eprintln!("Could not look up the user {username}: {error}");
            exit(1);
        }
    }

    let password = match ValidatedPassword::new(&password, &[&username, &email]) {
        Ok(password) => password,
        Err(error) => {
            eprintln!("Could not use SUPERUSER_PASSWORD: {error}");
            exit(1);
        }
    };

    let password_hash = match PasswordHash::new(password, PasswordHash::DEFAULT_COST) {
        Ok(password_hash) => password_hash,
        Err(error) => {
            eprintln!("Could not hash the password: {error}");
            exit(1);
        }
    };

    let new_user = NewUser {
        username,
        email: Some(email),
        password_hash: Some(password_hash),
        is_staff: true,
        is_superuser: true,
    };

    match create_user(new_user, &connection) {
        Ok(user) => println!("Created superuser {} with ID {}.", user.username, user.id),
        Err(error) => {
            eprintln!("Could not create the superuser: {error}");
            exit(1);
        }
    }
}
