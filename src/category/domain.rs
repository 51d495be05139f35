//! Core category and subcategory types.

use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::Error;

/// The maximum number of characters in a category or subcategory name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Database identifier for a category.
pub type CategoryId = i64;

/// Database identifier for a subcategory.
pub type SubcategoryId = i64;

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is blank,
    /// or [Error::NameTooLong] if it is longer than [MAX_NAME_LENGTH] characters.
    pub fn new(name: &str) -> Result<Self, Error> {
        validate_name(name, Error::EmptyCategoryName).map(Self)
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated, non-empty subcategory name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct SubcategoryName(String);

impl SubcategoryName {
    /// Create a subcategory name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptySubcategoryName] if `name` is blank,
    /// or [Error::NameTooLong] if it is longer than [MAX_NAME_LENGTH] characters.
    pub fn new(name: &str) -> Result<Self, Error> {
        validate_name(name, Error::EmptySubcategoryName).map(Self)
    }

    /// Create a subcategory name without validation.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for SubcategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for SubcategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate_name(name: &str, empty_error: Error) -> Result<String, Error> {
    let name = name.trim();

    if name.is_empty() {
        Err(empty_error)
    } else if name.chars().count() > MAX_NAME_LENGTH {
        Err(Error::NameTooLong(MAX_NAME_LENGTH))
    } else {
        Ok(name.to_string())
    }
}

/// A top level grouping for expenses, shared by all users.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The unique name of the category.
    pub name: CategoryName,
    /// When the category was created.
    pub created_at: OffsetDateTime,
}

/// A finer grouping within a category.
#[derive(Debug, Clone, PartialEq)]
pub struct Subcategory {
    /// The ID of the subcategory.
    pub id: SubcategoryId,
    /// The category the subcategory belongs to.
    pub category_id: CategoryId,
    /// The name of the owning category, loaded alongside the subcategory.
    pub category_name: CategoryName,
    /// The name of the subcategory, unique within its category.
    pub name: SubcategoryName,
    /// When the subcategory was created.
    pub created_at: OffsetDateTime,
}

impl Subcategory {
    /// The display name including the category, e.g. "Travel > Flights".
    pub fn full_name(&self) -> String {
        format!("{} > {}", self.category_name, self.name)
    }
}

/// Maps each subcategory to the category it belongs to.
///
/// Expense forms render this as JSON so the subcategory drop-down can be
/// filtered on the client when the category changes.
pub type SubcategoryCategoryMap = BTreeMap<SubcategoryId, CategoryId>;

/// Build the [SubcategoryCategoryMap] for `subcategories` in one pass.
pub fn build_subcategory_category_map(subcategories: &[Subcategory]) -> SubcategoryCategoryMap {
    subcategories
        .iter()
        .map(|subcategory| (subcategory.id, subcategory.category_id))
        .collect()
}

/// The form data for creating a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryFormData {
    /// The name of the new category.
    pub name: String,
}

/// The form data for creating a subcategory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcategoryFormData {
    /// The ID of the owning category.
    pub category_id: CategoryId,
    /// The name of the new subcategory.
    pub name: String,
}
