//! The form shared by the create, edit and dashboard quick add views.

use maud::{Markup, PreEscaped, html};
use rusqlite::Connection;

use crate::{
    Error,
    category::{
        Category, Subcategory, SubcategoryCategoryMap, build_subcategory_category_map,
        get_all_categories, get_all_subcategories,
    },
    expense::{ExpenseFormData, core::MAX_DESCRIPTION_LENGTH},
    html::{BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement},
};

/// How the form is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Post,
    Put,
}

/// The categories and subcategories an expense can be filed under.
#[derive(Debug, Clone, PartialEq)]
pub struct FormChoices {
    pub categories: Vec<Category>,
    pub subcategories: Vec<Subcategory>,
    pub subcategory_map: SubcategoryCategoryMap,
}

impl FormChoices {
    /// Load the choices, building the subcategory map once for the render.
    pub fn load(connection: &Connection) -> Result<Self, Error> {
        let categories = get_all_categories(connection)?;
        let subcategories = get_all_subcategories(connection)?;
        let subcategory_map = build_subcategory_category_map(&subcategories);

        Ok(Self {
            categories,
            subcategories,
            subcategory_map,
        })
    }
}

/// Everything needed to render an expense form.
pub struct ExpenseForm<'a> {
    pub endpoint: &'a str,
    pub method: FormMethod,
    pub choices: &'a FormChoices,
    pub values: &'a ExpenseFormData,
    pub error_message: &'a str,
    pub submit_label: &'a str,
}

impl ExpenseForm<'_> {
    pub fn into_html(self) -> Markup {
        // serde_json cannot fail on a map of integers.
        let subcategory_map_json = serde_json::to_string(&self.choices.subcategory_map)
            .unwrap_or_else(|_| "{}".to_owned());

        html! {
            form
                hx-post=[(self.method == FormMethod::Post).then_some(self.endpoint)]
                hx-put=[(self.method == FormMethod::Put).then_some(self.endpoint)]
                hx-target-error="#alert-container"
                hx-swap="outerHTML"
                data-subcategory-map=(subcategory_map_json)
                class="expense-form w-full space-y-4 md:space-y-6"
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
                        option value="" { "---------" }

                        @for category in &self.choices.categories {
                            @let id = category.id.to_string();
                            option value=(id) selected[id == self.values.category_id] {
                                (category.name)
                            }
                        }
                    }
                }

                div
                {
                    label for="subcategory_id" class=(FORM_LABEL_STYLE) { "Subcategory" }

                    select
                        id="subcategory_id"
                        name="subcategory_id"
                        class=(FORM_TEXT_INPUT_STYLE)
                    {
                        option value="" { "---------" }

                        @for subcategory in &self.choices.subcategories {
                            @let id = subcategory.id.to_string();
                            option
                                value=(id)
                                data-category-id=(subcategory.category_id)
                                selected[id == self.values.subcategory_id]
                            {
                                (subcategory.name)
                            }
                        }
                    }
                }

                div
                {
                    label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                    input
                        id="amount"
                        type="number"
                        name="amount"
                        step="0.01"
                        min="0.01"
                        placeholder="0.00"
                        value=(self.values.amount)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                    input
                        id="description"
                        type="text"
                        name="description"
                        placeholder="Optional description"
                        maxlength=(MAX_DESCRIPTION_LENGTH)
                        value=(self.values.description)
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                    input
                        id="date"
                        type="date"
                        name="date"
                        value=(self.values.date)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                @if !self.error_message.is_empty() {
                    p class="text-red-600 dark:text-red-400"
                    {
                        (self.error_message)
                    }
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { (self.submit_label) }
            }
        }
    }
}

/// Hide the subcategories that do not belong to the selected category.
///
/// Reads the map rendered into the form's `data-subcategory-map` attribute.
pub fn subcategory_filter_script() -> HeadElement {
    HeadElement::ScriptSource(PreEscaped(
        r#"
        document.addEventListener("change", (event) => {
            if (event.target.name !== "category_id") return;
            const form = event.target.closest("form.expense-form");
            if (!form) return;
            const map = JSON.parse(form.dataset.subcategoryMap || "{}");
            const subcategorySelect = form.querySelector("select[name=subcategory_id]");
            for (const option of subcategorySelect.options) {
                if (!option.value) continue;
                const visible = String(map[option.value]) === event.target.value;
                option.hidden = !visible;
                if (!visible && option.selected) subcategorySelect.value = "";
            }
        });
        "#
        .to_owned(),
    ))
}
