//! Expense records and their value types.
//!
//! An [`Expense`] is never hard-deleted by the sync core. Soft-deleted rows
//! keep their data and carry a `deleted_at` marker so pull-based clients can
//! learn about deletions after the fact.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use super::field_error::{FieldError, bounded_text};
use super::{CategoryId, UserId};

/// Maximum stored product name length.
pub const PRODUCT_NAME_MAX: usize = 255;
/// Maximum accepted client identifier length.
pub const LOCAL_ID_MAX: usize = 255;

const PRICE_SCALE: u32 = 2;
const PRICE_LIMIT_LABEL: &str = "10000000000";

/// Server-assigned, stable expense identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpenseId(i64);

impl ExpenseId {
    /// Wrap a store-assigned identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Validate a client-supplied integer identifier.
    pub const fn from_client(value: i64) -> Result<Self, FieldError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(FieldError::InvalidId)
        }
    }

    /// Raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl FromStr for ExpenseId {
    type Err = FieldError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<i64>()
            .map_err(|_| FieldError::InvalidId)
            .and_then(Self::from_client)
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque client-generated identifier echoed back in create mappings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalId(String);

impl LocalId {
    /// Validate a client identifier.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, FieldError> {
        bounded_text(raw.as_ref(), LOCAL_ID_MAX).map(Self)
    }

    /// Identifier as received.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Product description of an expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductName(String);

impl ProductName {
    /// Trim and validate a product name.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, FieldError> {
        bounded_text(raw.as_ref(), PRODUCT_NAME_MAX).map(Self)
    }

    /// Name as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lookup key used by duplicate detection.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for ProductName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monetary amount with two decimal places.
///
/// Fits a `NUMERIC(12, 2)` column, so magnitudes must stay below 10^10.
///
/// # Examples
/// ```
/// use spendsync::domain::Price;
///
/// let price = Price::from_f64(3.499).expect("valid price");
/// assert_eq!(price.to_string(), "3.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Price(Decimal);

impl Price {
    /// Round half away from zero to cents and range-check the amount.
    pub fn new(amount: Decimal) -> Result<Self, FieldError> {
        let limit = Decimal::new(10_000_000_000, 0);
        let rounded =
            amount.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
        if rounded.abs() >= limit {
            return Err(FieldError::AmountOutOfRange {
                limit: PRICE_LIMIT_LABEL,
            });
        }
        let mut scaled = rounded;
        scaled.rescale(PRICE_SCALE);
        Ok(Self(scaled))
    }

    /// Convert a JSON number.
    pub fn from_f64(amount: f64) -> Result<Self, FieldError> {
        Decimal::from_f64(amount)
            .ok_or(FieldError::AmountOutOfRange {
                limit: PRICE_LIMIT_LABEL,
            })
            .and_then(Self::new)
    }

    /// Parse a numeric string such as `"3.50"`.
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        Decimal::from_str(raw.trim())
            .map_err(|_| FieldError::WrongType { expected: "number" })
            .and_then(Self::new)
    }

    /// Exact decimal amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Floating-point rendering used by JSON exports.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A stored expense.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: ExpenseId,
    pub user_id: UserId,
    pub local_id: Option<LocalId>,
    pub product: ProductName,
    pub price: Price,
    pub category_id: Option<CategoryId>,
    /// User-meaningful event time.
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Server write time, bumped on every mutation including soft delete.
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Expense {
    /// Whether the expense carries a soft-delete marker.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Values for a new expense row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub user_id: UserId,
    pub local_id: Option<LocalId>,
    pub product: ProductName,
    pub price: Price,
    pub category_id: Option<CategoryId>,
    pub timestamp: DateTime<Utc>,
}

/// Client-editable fields applied to an existing expense.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseChanges {
    pub product: ProductName,
    pub price: Price,
    pub category_id: Option<CategoryId>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("42", Ok(ExpenseId::new(42)))]
    #[case(" 7 ", Ok(ExpenseId::new(7)))]
    #[case("0", Err(FieldError::InvalidId))]
    #[case("-3", Err(FieldError::InvalidId))]
    #[case("abc", Err(FieldError::InvalidId))]
    fn parses_client_expense_ids(#[case] raw: &str, #[case] expected: Result<ExpenseId, FieldError>) {
        assert_eq!(raw.parse::<ExpenseId>(), expected);
    }

    #[rstest]
    #[case(3.5, "3.50")]
    #[case(0.1, "0.10")]
    #[case(-12.346, "-12.35")]
    fn prices_round_to_cents(#[case] raw: f64, #[case] expected: &str) {
        let price = Price::from_f64(raw).expect("valid price");
        assert_eq!(price.to_string(), expected);
    }

    #[rstest]
    #[case("12.345", "12.35")]
    #[case("0.005", "0.01")]
    #[case("2.125", "2.13")]
    #[case("-0.125", "-0.13")]
    fn half_cents_round_away_from_zero(#[case] raw: &str, #[case] expected: &str) {
        let price = Price::parse(raw).expect("valid price");
        assert_eq!(price.to_string(), expected);
    }

    #[rstest]
    fn price_rejects_non_finite_values() {
        assert!(Price::from_f64(f64::NAN).is_err());
        assert!(Price::from_f64(f64::INFINITY).is_err());
    }

    #[rstest]
    fn price_rejects_overflowing_amounts() {
        assert_eq!(
            Price::from_f64(1e12),
            Err(FieldError::AmountOutOfRange {
                limit: PRICE_LIMIT_LABEL
            })
        );
    }

    #[rstest]
    fn price_parses_numeric_strings() {
        let price = Price::parse("19.9").expect("valid price");
        assert_eq!(price.to_string(), "19.90");
        assert!((price.as_f64() - 19.9).abs() < f64::EPSILON);
    }

    #[rstest]
    fn product_normalisation_ignores_case() {
        let upper = ProductName::new("MILK").expect("valid product");
        let lower = ProductName::new("milk").expect("valid product");
        assert_eq!(upper.normalized(), lower.normalized());
    }
}
