//! A fixed-point money type.
//!
//! Amounts are stored as a whole number of cents so that summing many
//! expenses never accumulates binary floating-point error.

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign},
    str::FromStr,
};

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::Error;

/// An amount of money with exactly two decimal places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// The smallest amount an expense may have, i.e. 0.01.
    pub const MIN_EXPENSE: Amount = Amount(1);

    /// The largest amount an expense may have, i.e. 99,999,999.99.
    pub const MAX_EXPENSE: Amount = Amount(9_999_999_999);

    /// Create an amount from a number of cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount as a whole number of cents.
    pub const fn as_cents(&self) -> i64 {
        self.0
    }

    /// The amount as a decimal number with a scale of two.
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl FromStr for Amount {
    type Err = Error;

    /// Parse a decimal string such as "12", "12.5" or "12.50".
    ///
    /// More than two decimal places, signs other than a leading '-', and
    /// anything that is not a digit are rejected with [Error::InvalidAmount].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidAmount(s.to_owned());
        let trimmed = s.trim();

        let (sign, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", trimmed),
        };

        // Decimal also accepts '+', '_' and exponents, none of which belong in a form field.
        if !unsigned.chars().any(|c| c.is_ascii_digit())
            || !unsigned.chars().all(|c| c.is_ascii_digit() || c == '.')
        {
            return Err(invalid());
        }

        let decimal = match unsigned.strip_prefix('.') {
            Some(fraction) => Decimal::from_str_exact(&format!("{sign}0.{fraction}")),
            None => Decimal::from_str_exact(trimmed),
        }
        .map_err(|_| invalid())?;

        if decimal.scale() > 2 {
            return Err(invalid());
        }

        decimal
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// Addition saturates at the bounds of `i64` cents instead of overflowing.
impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Amount)
    }
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::Amount;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!("12".parse::<Amount>(), Ok(Amount::from_cents(1200)));
        assert_eq!("12.5".parse::<Amount>(), Ok(Amount::from_cents(1250)));
        assert_eq!("12.05".parse::<Amount>(), Ok(Amount::from_cents(1205)));
        assert_eq!(".99".parse::<Amount>(), Ok(Amount::from_cents(99)));
        assert_eq!(" 0.01 ".parse::<Amount>(), Ok(Amount::MIN_EXPENSE));
        assert_eq!("-3.25".parse::<Amount>(), Ok(Amount::from_cents(-325)));
    }

    #[test]
    fn rejects_malformed_amounts() {
        for input in [
            "", ".", "abc", "1.234", "1,000", "+5", "1.2.3", "--1", "1e3", "1_000",
        ] {
            assert_eq!(
                input.parse::<Amount>(),
                Err(Error::InvalidAmount(input.to_owned())),
                "want {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn displays_two_decimal_places() {
        assert_eq!(Amount::from_cents(1550).to_string(), "15.50");
        assert_eq!(Amount::from_cents(5).to_string(), "0.05");
        assert_eq!(Amount::ZERO.to_string(), "0.00");
        assert_eq!(Amount::from_cents(-325).to_string(), "-3.25");
    }

    #[test]
    fn sums_without_drift() {
        let total: Amount = std::iter::repeat_n(Amount::from_cents(10), 1000).sum();

        assert_eq!(total, Amount::from_cents(10_000));
        assert_eq!(total.to_string(), "100.00");
    }

    #[test]
    fn rejects_amounts_too_large_for_cents() {
        let input = "999999999999999999999.99";

        assert_eq!(
            input.parse::<Amount>(),
            Err(Error::InvalidAmount(input.to_owned()))
        );
    }

    #[test]
    fn parses_largest_expense() {
        assert_eq!("99999999.99".parse::<Amount>(), Ok(Amount::MAX_EXPENSE));
    }

    #[test]
    fn addition_saturates_instead_of_overflowing() {
        let huge = Amount::from_cents(i64::MAX - 1);

        assert_eq!(huge + huge, Amount::from_cents(i64::MAX));

        let mut total = huge;
        total += Amount::from_cents(10);
        assert_eq!(total, Amount::from_cents(i64::MAX));
    }

    #[test]
    fn summing_many_largest_expenses_is_exact() {
        let total: Amount = std::iter::repeat_n(Amount::MAX_EXPENSE, 10_000).sum();

        assert_eq!(total, Amount::from_cents(9_999_999_999 * 10_000));
    }
}
