//! The shared taxonomy of categories and subcategories that expenses are filed under.

mod create;
mod db;
mod domain;
mod list;
mod seed;

pub use create::{
    create_category_endpoint, create_subcategory_endpoint, get_new_category_page,
    get_new_subcategory_page,
};
pub use db::{
    count_categories, create_category, create_category_table, create_subcategory,
    create_subcategory_table, get_all_categories, get_all_subcategories,
    get_or_create_category, get_or_create_subcategory, get_subcategory,
};
pub use domain::{
    Category, CategoryFormData, CategoryId, CategoryName, Subcategory, SubcategoryCategoryMap,
    SubcategoryFormData, SubcategoryId, SubcategoryName, build_subcategory_category_map,
};
pub use list::{get_categories_page, get_subcategories_page};
pub use seed::{DEFAULT_CATEGORIES, populate_default_categories, seed_default_categories_if_empty};
