//! This modules defines the common functionality for paging through lists of expenses.

use maud::{Markup, html};

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The maximum number of rows to display per page.
    pub page_size: u64,
    /// The maximum number of page links to show in the pagination indicator.
    pub max_pages: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_pages: 5,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PaginationIndicator {
    Page(u64),
    CurrPage(u64),
    Ellipsis,
    NextButton(u64),
    BackButton(u64),
}

/// Parse the `page` query parameter, falling back to the first page when it
/// is missing, malformed, or zero.
pub fn parse_page(raw_page: Option<&str>) -> u64 {
    raw_page
        .and_then(|page| page.trim().parse::<u64>().ok())
        .filter(|&page| page > 0)
        .unwrap_or(1)
}

/// The number of pages needed to show `row_count` rows, at least one.
pub fn page_count(row_count: u64, page_size: u64) -> u64 {
    row_count.div_ceil(page_size.max(1)).max(1)
}

/// Decide which page links to show for `curr_page` out of `page_count` pages.
///
/// At most `max_pages` consecutive page numbers are shown around the current
/// page, with the first and last pages and ellipses filling the gaps.
pub fn create_pagination_indicators(
    curr_page: u64,
    page_count: u64,
    max_pages: u64,
) -> Vec<PaginationIndicator> {
    let half = max_pages / 2;
    let map_page = |page| {
        if page == curr_page {
            PaginationIndicator::CurrPage(page)
        } else {
            PaginationIndicator::Page(page)
        }
    };

    let window = if page_count <= max_pages {
        1..=page_count
    } else if curr_page <= half {
        1..=max_pages
    } else if curr_page > page_count - half {
        (page_count - max_pages + 1)..=page_count
    } else {
        (curr_page - half)..=(curr_page + half)
    };

    let mut indicators: Vec<PaginationIndicator> = window.map(map_page).collect();

    if page_count > max_pages {
        if curr_page > half + 1 {
            indicators.insert(0, PaginationIndicator::Page(1));
            indicators.insert(1, PaginationIndicator::Ellipsis);
        }

        if curr_page < page_count - half {
            indicators.push(PaginationIndicator::Ellipsis);
            indicators.push(PaginationIndicator::Page(page_count));
        }
    }

    if curr_page > 1 {
        indicators.insert(0, PaginationIndicator::BackButton(curr_page - 1));
    }

    if curr_page < page_count {
        indicators.push(PaginationIndicator::NextButton(curr_page + 1));
    }

    indicators
}

/// Render the indicators as links to `base_url` with a `page` query parameter.
pub fn pagination_view(base_url: &str, indicators: &[PaginationIndicator]) -> Markup {
    let link_style = "px-3 py-2 leading-tight text-gray-500 bg-white border \
        border-gray-300 hover:bg-gray-100 hover:text-gray-700 dark:bg-gray-800 \
        dark:border-gray-700 dark:text-gray-400 dark:hover:bg-gray-700 dark:hover:text-white";
    let current_style = "px-3 py-2 leading-tight text-blue-600 border border-gray-300 \
        bg-blue-50 dark:border-gray-700 dark:bg-gray-700 dark:text-white";

    html! {
        nav aria-label="Pagination" class="my-4"
        {
            ul class="inline-flex -space-x-px text-sm"
            {
                @for indicator in indicators {
                    li {
                        @match indicator {
                            PaginationIndicator::BackButton(page) => {
                                a href={(base_url) "?page=" (page)} class=(link_style) { "Back" }
                            }
                            PaginationIndicator::Page(page) => {
                                a href={(base_url) "?page=" (page)} class=(link_style) { (page) }
                            }
                            PaginationIndicator::CurrPage(page) => {
                                a aria-current="page" class=(current_style) { (page) }
                            }
                            PaginationIndicator::Ellipsis => {
                                span class=(link_style) { "..." }
                            }
                            PaginationIndicator::NextButton(page) => {
                                a href={(base_url) "?page=" (page)} class=(link_style) { "Next" }
                            }
                        }
                    }
                }
            }
        }
    }
}
