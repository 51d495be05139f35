//! Lenient parsing of the report query parameters.
//!
//! Bad values fall back to a default instead of rejecting the request.

use serde::Deserialize;
use time::Month;

use crate::category::CategoryId;

/// The number of years offered in the year selectors.
pub const YEAR_OPTION_COUNT: i32 = 6;

/// The raw `year`, `month` and `category` query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub year: Option<String>,
    pub month: Option<String>,
    pub category: Option<String>,
}

/// Parse a four digit year, falling back to `default`.
pub fn parse_year(raw_year: Option<&str>, default: i32) -> i32 {
    raw_year
        .and_then(|year| year.trim().parse::<i32>().ok())
        .filter(|year| (1..=9999).contains(year))
        .unwrap_or(default)
}

/// Parse a month number between 1 and 12, falling back to `default`.
pub fn parse_month(raw_month: Option<&str>, default: Month) -> Month {
    raw_month
        .and_then(|month| month.trim().parse::<u8>().ok())
        .and_then(|month| Month::try_from(month).ok())
        .unwrap_or(default)
}

/// Parse a category ID. `None` means all categories, which is also the
/// fallback for "all" and anything that is not an ID.
pub fn parse_category_filter(raw_category: Option<&str>) -> Option<CategoryId> {
    raw_category.and_then(|category| category.trim().parse::<CategoryId>().ok())
}

/// The years offered in the year selectors, newest first.
pub fn year_options(current_year: i32) -> Vec<i32> {
    (0..YEAR_OPTION_COUNT)
        .map(|offset| current_year - offset)
        .collect()
}

/// Three letter names for the months, January first.
pub fn month_names() -> [&'static str; 12] {
    [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ]
}

#[cfg(test)]
mod tests {
    use time::Month;

    use super::{month_names, parse_category_filter, parse_month, parse_year, year_options};

    #[test]
    fn parses_year_or_falls_back() {
        assert_eq!(parse_year(Some("2023"), 2025), 2023);
        assert_eq!(parse_year(Some("twenty"), 2025), 2025);
        assert_eq!(parse_year(Some("-4"), 2025), 2025);
        assert_eq!(parse_year(None, 2025), 2025);
    }

    #[test]
    fn parses_month_or_falls_back() {
        assert_eq!(parse_month(Some("3"), Month::June), Month::March);
        assert_eq!(parse_month(Some("13"), Month::June), Month::June);
        assert_eq!(parse_month(Some("0"), Month::June), Month::June);
        assert_eq!(parse_month(Some("march"), Month::June), Month::June);
        assert_eq!(parse_month(None, Month::June), Month::June);
    }

    #[test]
    fn parses_category_or_all() {
        assert_eq!(parse_category_filter(Some("4")), Some(4));
        assert_eq!(parse_category_filter(Some("all")), None);
        assert_eq!(parse_category_filter(Some("")), None);
        assert_eq!(parse_category_filter(None), None);
    }

    #[test]
    fn year_options_descend_from_current_year() {
        assert_eq!(year_options(2024), [2024, 2023, 2022, 2021, 2020, 2019]);
    }

    #[test]
    fn month_names_start_in_january() {
        assert_eq!(month_names()[0], "Jan");
        assert_eq!(month_names()[11], "Dec");
    }
}
