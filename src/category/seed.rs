//! The default category taxonomy and the routines that load it.

use rusqlite::Connection;

use crate::{
    Error,
    category::{
        CategoryName, SubcategoryName, count_categories, get_or_create_category,
        get_or_create_subcategory,
    },
};

/// The categories, and their subcategories, that a new database starts with.
pub const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Food & Dining",
        &[
            "Groceries",
            "Restaurants",
            "Fast Food",
            "Coffee Shops",
            "Delivery",
        ],
    ),
    (
        "Transportation",
        &[
            "Fuel",
            "Public Transport",
            "Taxi/Rideshare",
            "Parking",
            "Car Maintenance",
            "Car Insurance",
        ],
    ),
    (
        "Housing",
        &[
            "Rent",
            "Mortgage",
            "Utilities",
            "Internet",
            "Home Insurance",
            "Repairs & Maintenance",
        ],
    ),
    (
        "Health & Fitness",
        &[
            "Doctor Visits",
            "Pharmacy",
            "Gym Membership",
            "Sports Equipment",
            "Health Insurance",
        ],
    ),
    (
        "Entertainment",
        &[
            "Movies",
            "Games",
            "Streaming Services",
            "Concerts",
            "Hobbies",
        ],
    ),
    (
        "Shopping",
        &[
            "Clothing",
            "Electronics",
            "Home Goods",
            "Books",
            "Personal Care",
        ],
    ),
    (
        "Education",
        &["Tuition", "Books", "Online Courses", "School Supplies"],
    ),
    (
        "Travel",
        &["Flights", "Hotels", "Vacation", "Travel Insurance"],
    ),
    (
        "Bills & Utilities",
        &["Electricity", "Water", "Gas", "Phone", "Internet"],
    ),
    (
        "Personal Care",
        &["Haircut", "Cosmetics", "Clothing", "Toiletries"],
    ),
    (
        "Insurance",
        &[
            "Health Insurance",
            "Car Insurance",
            "Home Insurance",
            "Life Insurance",
        ],
    ),
    (
        "Savings & Investments",
        &["Emergency Fund", "Retirement", "Investments"],
    ),
    ("Gifts & Donations", &["Gifts", "Charity", "Donations"]),
    ("Other", &["Miscellaneous", "Unexpected Expenses"]),
];

/// Add any missing default categories and subcategories.
///
/// Existing rows are left alone, so this is safe to run repeatedly.
/// Returns how many categories and subcategories were created.
///
/// # Errors
///
/// Returns an error if a query fails, in which case nothing is written.
pub fn populate_default_categories(connection: &Connection) -> Result<usize, Error> {
    let transaction = connection.unchecked_transaction()?;
    let mut created_count = 0;

    for (category_name, subcategory_names) in DEFAULT_CATEGORIES {
        let (category, created) =
            get_or_create_category(CategoryName::new_unchecked(category_name), &transaction)?;

        if created {
            created_count += 1;
            tracing::debug!("Created category: {category_name}");
        }

        for subcategory_name in subcategory_names.iter() {
            let (_, created) = get_or_create_subcategory(
                category.id,
                SubcategoryName::new_unchecked(subcategory_name),
                &transaction,
            )?;

            if created {
                created_count += 1;
                tracing::debug!("Created subcategory: {category_name} > {subcategory_name}");
            }
        }
    }

    transaction.commit()?;

    Ok(created_count)
}

/// Load the default taxonomy if there are no categories yet.
///
/// Returns `true` if the categories were loaded.
pub fn seed_default_categories_if_empty(connection: &Connection) -> Result<bool, Error> {
    if count_categories(connection)? > 0 {
        return Ok(false);
    }

    let created_count = populate_default_categories(connection)?;
    tracing::info!("Seeded {created_count} default categories and subcategories");

    Ok(true)
}
