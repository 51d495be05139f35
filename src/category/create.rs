//! Pages and endpoints for creating categories and subcategories.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{
        Category, CategoryFormData, CategoryName, SubcategoryFormData, SubcategoryName,
        create_category, create_subcategory, get_all_categories,
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        keepalive_script,
    },
    navigation::NavBar,
};

/// The state needed for creating categories and subcategories.
#[derive(Debug, Clone)]
pub struct CreateCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the category creation page.
pub async fn get_new_category_page() -> Response {
    let nav_bar = NavBar::new(endpoints::NEW_CATEGORY_VIEW).into_html();
    let form = new_category_form_view("");

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Create Category", &[keepalive_script()], &content).into_response()
}

/// Handle category creation form submission.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryState>,
    Form(form): Form<CategoryFormData>,
) -> Response {
    let name = match CategoryName::new(&form.name) {
        Ok(name) => name,
        Err(error) => {
            return new_category_form_view(&format!("Error: {error}")).into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_category(name, &connection) {
        Ok(category) => {
            tracing::info!("Created category {}", category.name);
            (
                HxRedirect(endpoints::CATEGORIES_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}

/// Render the subcategory creation page.
pub async fn get_new_subcategory_page(State(state): State<CreateCategoryState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    let categories = match get_all_categories(&connection) {
        Ok(categories) => categories,
        Err(error) => return error.into_response(),
    };

    let nav_bar = NavBar::new(endpoints::NEW_SUBCATEGORY_VIEW).into_html();
    let form = new_subcategory_form_view(&categories, "");

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Create Subcategory", &[keepalive_script()], &content).into_response()
}

/// Handle subcategory creation form submission.
pub async fn create_subcategory_endpoint(
    State(state): State<CreateCategoryState>,
    Form(form): Form<SubcategoryFormData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let name = match SubcategoryName::new(&form.name) {
        Ok(name) => name,
        Err(error) => {
            return match get_all_categories(&connection) {
                Ok(categories) => {
                    new_subcategory_form_view(&categories, &format!("Error: {error}"))
                        .into_response()
                }
                Err(error) => error.into_alert_response(),
            };
        }
    };

    match create_subcategory(form.category_id, name, &connection) {
        Ok(subcategory) => {
            tracing::info!("Created subcategory {}", subcategory.full_name());
            (
                HxRedirect(endpoints::SUBCATEGORIES_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}

fn error_message_view(error_message: &str) -> Markup {
    html! {
        @if !error_message.is_empty() {
            p class="text-red-600 dark:text-red-400"
            {
                (error_message)
            }
        }
    }
}

fn new_category_form_view(error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::CATEGORIES_API)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Category Name" }

                input
                    id="name"
                    type="text"
                    name="name"
                    placeholder="Category Name"
                    maxlength="100"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (error_message_view(error_message))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Category" }
        }
    }
}

fn new_subcategory_form_view(categories: &[Category], error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::SUBCATEGORIES_API)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }

                select
                    id="category_id"
                    name="category_id"
                    required
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for category in categories {
                        option value=(category.id) { (category.name) }
                    }
                }
            }

            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Subcategory Name" }

                input
                    id="name"
                    type="text"
                    name="name"
                    placeholder="Subcategory Name"
                    maxlength="100"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (error_message_view(error_message))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Subcategory" }
        }
    }
}

#[cfg(test)]
mod new_category_page_tests {
    use crate::{
        category::get_new_category_page,
        endpoints,
        test_utils::{
            assert_content_type, assert_form_input, assert_form_submit_button,
            assert_hx_endpoint, assert_status_ok, assert_valid_html, must_get_form,
            parse_html_document,
        },
    };

    #[tokio::test]
    async fn render_page() {
        let response = get_new_category_page().await;

        assert_status_ok(&response);
        assert_content_type(&response, "text/html; charset=utf-8");
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::CATEGORIES_API, "hx-post");
        assert_form_input(&form, "name", "text");
        assert_form_submit_button(&form);
    }
}

#[cfg(test)]
mod create_category_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Form, extract::State, http::StatusCode};

    use crate::{
        category::{
            CategoryFormData, create::CreateCategoryState, create_category_endpoint,
            get_all_categories,
        },
        endpoints,
        test_utils::{
            assert_form_error_message, assert_hx_redirect, assert_valid_html,
            get_test_connection, must_get_form, parse_html_fragment,
        },
    };

    fn get_state() -> CreateCategoryState {
        CreateCategoryState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
        }
    }

    #[tokio::test]
    async fn can_create_category() {
        let state = get_state();
        let form = CategoryFormData {
            name: "Pets".to_owned(),
        };

        let response = create_category_endpoint(State(state.clone()), Form(form)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::CATEGORIES_VIEW);
        let categories = get_all_categories(&state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name.as_ref(), "Pets");
    }

    #[tokio::test]
    async fn empty_name_renders_form_with_error() {
        let state = get_state();
        let form = CategoryFormData {
            name: "   ".to_owned(),
        };

        let response = create_category_endpoint(State(state), Form(form)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_form_error_message(&form, "Error: Category name cannot be empty");
    }

    #[tokio::test]
    async fn duplicate_name_returns_bad_request() {
        let state = get_state();
        let form = || CategoryFormData {
            name: "Pets".to_owned(),
        };

        create_category_endpoint(State(state.clone()), Form(form())).await;
        let response = create_category_endpoint(State(state), Form(form())).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
