//! Shared validation helpers for inbound HTTP adapters.
//!
//! Request bodies are deserialised into loose `serde_json::Value` fields and
//! checked here in a single pass. Every violation is collected with its
//! dotted field path so the client can fix all of them at once; nothing
//! reaches the domain until the whole request is valid.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::{
    CategoryName, Error, ExpenseId, FieldError, FieldViolation, LocalId, Price, ProductName,
    parse_client_timestamp,
};

/// Dotted path to a request field, such as `created.0.productName`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldPath(String);

impl FieldPath {
    pub(crate) fn root(name: &str) -> Self {
        Self(name.to_owned())
    }

    pub(crate) fn index(&self, index: usize) -> Self {
        Self(format!("{}.{index}", self.0))
    }

    pub(crate) fn key(&self, name: &str) -> Self {
        Self(format!("{}.{name}", self.0))
    }

    pub(crate) fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Collects violations across a request.
#[derive(Debug, Default)]
pub(crate) struct Violations(Vec<FieldViolation>);

impl Violations {
    /// Record the failure of `result`, returning the value on success.
    pub(crate) fn check<T>(&mut self, path: &FieldPath, result: Result<T, FieldError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.0.push(FieldViolation::new(path.as_str(), error));
                None
            }
        }
    }

    /// Turn collected violations into a `validation_failed` error.
    pub(crate) fn finish(self) -> Result<(), Error> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(&self.0))
        }
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|inner| !inner.is_null())
}

/// Required string field.
pub(crate) fn required_str(value: Option<&Value>) -> Result<&str, FieldError> {
    match present(value) {
        None => Err(FieldError::Empty),
        Some(Value::String(text)) => Ok(text.as_str()),
        Some(_) => Err(FieldError::WrongType { expected: "string" }),
    }
}

/// Optional array field; absent and `null` read as empty.
pub(crate) fn optional_array(value: Option<&Value>) -> Result<&[Value], FieldError> {
    match present(value) {
        None => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(FieldError::WrongType { expected: "array" }),
    }
}

/// Required array field.
pub(crate) fn required_array(value: Option<&Value>) -> Result<&[Value], FieldError> {
    match present(value) {
        None => Err(FieldError::Empty),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(FieldError::WrongType { expected: "array" }),
    }
}

pub(crate) fn local_id(value: Option<&Value>) -> Result<LocalId, FieldError> {
    required_str(value).and_then(LocalId::new)
}

pub(crate) fn optional_local_id(value: Option<&Value>) -> Result<Option<LocalId>, FieldError> {
    present(value).map(|inner| local_id(Some(inner))).transpose()
}

pub(crate) fn product(value: Option<&Value>) -> Result<ProductName, FieldError> {
    required_str(value).and_then(ProductName::new)
}

pub(crate) fn category(value: Option<&Value>) -> Result<CategoryName, FieldError> {
    required_str(value).and_then(CategoryName::new)
}

/// Prices may arrive as JSON numbers or numeric strings.
pub(crate) fn price(value: Option<&Value>) -> Result<Price, FieldError> {
    match present(value) {
        None => Err(FieldError::Empty),
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or(FieldError::WrongType { expected: "number" })
            .and_then(Price::from_f64),
        Some(Value::String(text)) => Price::parse(text),
        Some(_) => Err(FieldError::WrongType { expected: "number" }),
    }
}

pub(crate) fn timestamp(value: Option<&Value>) -> Result<DateTime<Utc>, FieldError> {
    required_str(value).and_then(parse_client_timestamp)
}

/// Server ids may arrive as JSON integers or decimal strings.
pub(crate) fn expense_id(value: Option<&Value>) -> Result<ExpenseId, FieldError> {
    match present(value) {
        None => Err(FieldError::Empty),
        Some(Value::Number(number)) => number
            .as_i64()
            .ok_or(FieldError::InvalidId)
            .and_then(ExpenseId::from_client),
        Some(Value::String(text)) => text.parse(),
        Some(_) => Err(FieldError::InvalidId),
    }
}

pub(crate) fn optional_expense_id(value: Option<&Value>) -> Result<Option<ExpenseId>, FieldError> {
    present(value).map(|inner| expense_id(Some(inner))).transpose()
}
