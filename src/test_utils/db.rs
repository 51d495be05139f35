use rusqlite::Connection;

use crate::{
    PasswordHash, ValidatedPassword,
    category::{
        Category, CategoryName, Subcategory, SubcategoryName, create_category, create_subcategory,
    },
    db::initialize,
    user::{NewUser, User, create_user},
};

/// The plain text password of users made by [create_test_user].
pub(crate) const TEST_PASSWORD: &str = "averysafeandsecurepassword";

#[track_caller]
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");
    connection
}

/// Insert a user that can log in with [TEST_PASSWORD].
///
/// Uses the minimum bcrypt cost to keep tests fast.
#[track_caller]
pub(crate) fn create_test_user(username: &str, connection: &Connection) -> User {
    let password_hash = PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4)
        .expect("Could not hash test password");

    create_user(
        NewUser {
            username: username.to_owned(),
            email: Some(format!("{username}@example.com")),
            password_hash: Some(password_hash),
            is_staff: false,
            is_superuser: false,
        },
        connection,
    )
    .expect("Could not create test user")
}

#[track_caller]
pub(crate) fn create_test_category(name: &str, connection: &Connection) -> Category {
    create_category(CategoryName::new_unchecked(name), connection)
        .expect("Could not create test category")
}

#[track_caller]
pub(crate) fn create_test_subcategory(
    category: &Category,
    name: &str,
    connection: &Connection,
) -> Subcategory {
    create_subcategory(category.id, SubcategoryName::new_unchecked(name), connection)
        .expect("Could not create test subcategory")
}
