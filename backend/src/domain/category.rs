//! Expense categories.
//!
//! Categories are per-user and unique under case-insensitive comparison. The
//! first spelling a user submits is the one that gets stored and exported.

use std::fmt;

use super::field_error::{FieldError, bounded_text};
use super::UserId;

/// Maximum stored category name length.
pub const CATEGORY_NAME_MAX: usize = 255;

/// Server-assigned category identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(i64);

impl CategoryId {
    /// Wrap a store-assigned identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Free-text category name with its original casing preserved.
///
/// # Examples
/// ```
/// use spendsync::domain::CategoryName;
///
/// let name = CategoryName::new(" Groceries ").expect("valid name");
/// assert_eq!(name.as_str(), "Groceries");
/// assert_eq!(name.normalized(), "groceries");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryName(String);

impl CategoryName {
    /// Trim and validate a category name.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, FieldError> {
        bounded_text(raw.as_ref(), CATEGORY_NAME_MAX).map(Self)
    }

    /// Name as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lookup key used for case-insensitive matching.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for CategoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user's category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: UserId,
    pub name: CategoryName,
}
