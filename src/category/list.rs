//! Category and subcategory listing pages.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{Category, Subcategory, get_all_categories, get_all_subcategories},
    endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, keepalive_script,
    },
    navigation::NavBar,
};

/// The state needed for the category listing pages.
#[derive(Debug, Clone)]
pub struct CategoriesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the categories page, showing each category with its subcategories.
pub async fn get_categories_page(
    State(state): State<CategoriesPageState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;
    let subcategories = get_all_subcategories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve subcategories: {error}"))?;

    Ok(categories_view(&categories, &subcategories).into_response())
}

/// Render the subcategories page, ordered by category then subcategory name.
pub async fn get_subcategories_page(
    State(state): State<CategoriesPageState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let subcategories = get_all_subcategories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve subcategories: {error}"))?;

    Ok(subcategories_view(&subcategories).into_response())
}

fn page_header(title: &str, new_url: &str, new_label: &str) -> Markup {
    html! {
        header class="flex justify-between flex-wrap items-end gap-4"
        {
            h1 class="text-xl font-bold" { (title) }

            a href=(new_url) class=(LINK_STYLE) { (new_label) }
        }
    }
}

fn categories_view(categories: &[Category], subcategories: &[Subcategory]) -> Markup {
    let nav_bar = NavBar::new(endpoints::CATEGORIES_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                (page_header("Categories", endpoints::NEW_CATEGORY_VIEW, "Create Category"))

                p
                {
                    a href=(endpoints::SUBCATEGORIES_VIEW) class=(LINK_STYLE) { "All subcategories" }
                }

                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Subcategories" }
                        }
                    }

                    tbody
                    {
                        @for category in categories {
                            tr class=(TABLE_ROW_STYLE) data-category-id=(category.id)
                            {
                                td class=(TABLE_CELL_STYLE) { (category.name) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    (subcategories
                                        .iter()
                                        .filter(|subcategory| subcategory.category_id == category.id)
                                        .map(|subcategory| subcategory.name.as_ref())
                                        .collect::<Vec<_>>()
                                        .join(", "))
                                }
                            }
                        }

                        @if categories.is_empty() {
                            tr
                            {
                                td colspan="2" class="px-6 py-4 text-center"
                                {
                                    "No categories created yet. "
                                    a href=(endpoints::NEW_CATEGORY_VIEW) class=(LINK_STYLE)
                                    {
                                        "Create your first category"
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Categories", &[keepalive_script()], &content)
}

fn subcategories_view(subcategories: &[Subcategory]) -> Markup {
    let nav_bar = NavBar::new(endpoints::SUBCATEGORIES_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                (page_header("Subcategories", endpoints::NEW_SUBCATEGORY_VIEW, "Create Subcategory"))

                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Subcategory" }
                        }
                    }

                    tbody
                    {
                        @for subcategory in subcategories {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (subcategory.full_name()) }
                            }
                        }

                        @if subcategories.is_empty() {
                            tr
                            {
                                td class="px-6 py-4 text-center" { "No subcategories yet." }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Subcategories", &[keepalive_script()], &content)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use scraper::Selector;

    use crate::{
        category::{
            CategoryName, SubcategoryName, create_category, create_subcategory,
            get_categories_page, get_subcategories_page, list::CategoriesPageState,
        },
        test_utils::{assert_status_ok, assert_valid_html, get_test_connection, parse_html_document},
    };

    fn get_state() -> CategoriesPageState {
        let connection = get_test_connection();
        let travel = create_category(CategoryName::new_unchecked("Travel"), &connection).unwrap();
        create_category(CategoryName::new_unchecked("Food"), &connection).unwrap();
        create_subcategory(travel.id, SubcategoryName::new_unchecked("Hotels"), &connection)
            .unwrap();
        create_subcategory(travel.id, SubcategoryName::new_unchecked("Flights"), &connection)
            .unwrap();

        CategoriesPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn categories_page_lists_categories_by_name_with_subcategories() {
        let response = get_categories_page(State(get_state())).await.unwrap();

        assert_status_ok(&response);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let row_selector = Selector::parse("tbody tr").unwrap();
        let rows: Vec<Vec<String>> = html
            .select(&row_selector)
            .map(|row| {
                row.select(&Selector::parse("td").unwrap())
                    .map(|cell| cell.text().collect::<String>().trim().to_owned())
                    .collect()
            })
            .collect();

        assert_eq!(
            rows,
            vec![
                vec!["Food".to_owned(), "".to_owned()],
                vec!["Travel".to_owned(), "Flights, Hotels".to_owned()],
            ]
        );
    }

    #[tokio::test]
    async fn subcategories_page_shows_full_names() {
        let response = get_subcategories_page(State(get_state())).await.unwrap();

        assert_status_ok(&response);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let cells: Vec<String> = html
            .select(&Selector::parse("tbody td").unwrap())
            .map(|cell| cell.text().collect::<String>())
            .collect();

        assert_eq!(cells, ["Travel > Flights", "Travel > Hotels"]);
    }
}
