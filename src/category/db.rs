//! Database operations for categories and subcategories.

use rusqlite::{Connection, OptionalExtension, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    category::{Category, CategoryId, CategoryName, Subcategory, SubcategoryId, SubcategoryName},
};

/// Create a category and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::DuplicateCategoryName] if a category with the same name exists.
pub fn create_category(name: CategoryName, connection: &Connection) -> Result<Category, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO category (name, created_at) VALUES (?1, ?2);",
            (name.as_ref(), created_at),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(name.to_string()),
            error => error.into(),
        })?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        name,
        created_at,
    })
}

/// Retrieve all categories ordered alphabetically by name.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, created_at FROM category ORDER BY name ASC;")?
        .query_map([], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Get the number of categories in the database.
pub fn count_categories(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM category;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Find the category called `name`, creating it if it does not exist.
///
/// Returns the category and whether it was created.
pub fn get_or_create_category(
    name: CategoryName,
    connection: &Connection,
) -> Result<(Category, bool), Error> {
    let existing = connection
        .prepare("SELECT id, name, created_at FROM category WHERE name = :name;")?
        .query_row(&[(":name", name.as_ref())], map_category_row)
        .optional()?;

    match existing {
        Some(category) => Ok((category, false)),
        None => create_category(name, connection).map(|category| (category, true)),
    }
}

/// Create a subcategory under `category_id`.
///
/// # Errors
///
/// Returns:
/// - [Error::InvalidCategory] if `category_id` does not refer to a category,
/// - [Error::DuplicateSubcategoryName] if the category already has a subcategory with the same name.
pub fn create_subcategory(
    category_id: CategoryId,
    name: SubcategoryName,
    connection: &Connection,
) -> Result<Subcategory, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO subcategory (category_id, name, created_at) VALUES (?1, ?2, ?3);",
            (category_id, name.as_ref(), created_at),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateSubcategoryName(name.to_string()),
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory,
            error => error.into(),
        })?;

    get_subcategory(connection.last_insert_rowid(), connection)
}

/// Retrieve a single subcategory by ID, along with its category's name.
pub fn get_subcategory(
    subcategory_id: SubcategoryId,
    connection: &Connection,
) -> Result<Subcategory, Error> {
    connection
        .prepare(&format!("{SELECT_SUBCATEGORY} WHERE subcategory.id = :id;"))?
        .query_row(&[(":id", &subcategory_id)], map_subcategory_row)
        .map_err(|error| error.into())
}

/// Retrieve all subcategories ordered by category name, then subcategory name.
pub fn get_all_subcategories(connection: &Connection) -> Result<Vec<Subcategory>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_SUBCATEGORY} ORDER BY category.name ASC, subcategory.name ASC;"
        ))?
        .query_map([], map_subcategory_row)?
        .map(|maybe_subcategory| maybe_subcategory.map_err(|error| error.into()))
        .collect()
}

/// Find the subcategory called `name` under `category_id`, creating it if it does not exist.
///
/// Returns the subcategory and whether it was created.
pub fn get_or_create_subcategory(
    category_id: CategoryId,
    name: SubcategoryName,
    connection: &Connection,
) -> Result<(Subcategory, bool), Error> {
    let existing = connection
        .prepare(&format!(
            "{SELECT_SUBCATEGORY} WHERE subcategory.category_id = :category_id \
            AND subcategory.name = :name;"
        ))?
        .query_row(
            rusqlite::named_params! {":category_id": category_id, ":name": name.as_ref()},
            map_subcategory_row,
        )
        .optional()?;

    match existing {
        Some(subcategory) => Ok((subcategory, false)),
        None => create_subcategory(category_id, name, connection)
            .map(|subcategory| (subcategory, true)),
    }
}

/// Initialize the category table.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        );",
    )?;

    Ok(())
}

/// Initialize the subcategory table and indexes.
///
/// Deleting a category deletes its subcategories.
pub fn create_subcategory_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS subcategory (
            id INTEGER PRIMARY KEY,
            category_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(category_id, name),
            FOREIGN KEY(category_id) REFERENCES category(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_subcategory_category ON subcategory(category_id);",
    )?;

    Ok(())
}

const SELECT_SUBCATEGORY: &str = "SELECT subcategory.id, subcategory.category_id, \
    category.name, subcategory.name, subcategory.created_at \
    FROM subcategory INNER JOIN category ON category.id = subcategory.category_id";

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(1)?;

    Ok(Category {
        id: row.get(0)?,
        name: CategoryName::new_unchecked(&raw_name),
        created_at: row.get(2)?,
    })
}

fn map_subcategory_row(row: &Row) -> Result<Subcategory, rusqlite::Error> {
    let raw_category_name: String = row.get(2)?;
    let raw_name: String = row.get(3)?;

    Ok(Subcategory {
        id: row.get(0)?,
        category_id: row.get(1)?,
        category_name: CategoryName::new_unchecked(&raw_category_name),
        name: SubcategoryName::new_unchecked(&raw_name),
        created_at: row.get(4)?,
    })
}
