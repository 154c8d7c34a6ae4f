//! Value-level validation failures shared by the sync domain types.

/// Reason a single client-supplied value was rejected.
///
/// Adapters attach the offending field path and surface the [`code`] so
/// clients can react programmatically.
///
/// [`code`]: FieldError::code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// Required value was missing or blank.
    #[error("must not be empty")]
    Empty,
    /// Text exceeded the column width.
    #[error("must be at most {max} characters")]
    TooLong { max: usize },
    /// Value was not of the expected JSON type.
    #[error("must be a {expected}")]
    WrongType { expected: &'static str },
    /// Numeric value was not representable as a monetary amount.
    #[error("must be a finite amount below {limit} in magnitude")]
    AmountOutOfRange { limit: &'static str },
    /// Identifier was not a positive integer.
    #[error("must be a positive integer identifier")]
    InvalidId,
    /// Timestamp could not be parsed.
    #[error("must be an ISO-8601 date or timestamp")]
    InvalidTimestamp,
}

impl FieldError {
    /// Stable machine-readable code for the failure.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Empty => "missing_field",
            Self::TooLong { .. } => "too_long",
            Self::WrongType { .. } => "invalid_type",
            Self::AmountOutOfRange { .. } => "invalid_amount",
            Self::InvalidId => "invalid_id",
            Self::InvalidTimestamp => "invalid_timestamp",
        }
    }
}

/// Trim `raw` and enforce the non-empty and maximum-length rules used by
/// every text column in the sync schema.
pub(crate) fn bounded_text(raw: &str, max: usize) -> Result<String, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Empty);
    }
    if trimmed.chars().count() > max {
        return Err(FieldError::TooLong { max });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("  Milk  ", Ok("Milk".to_owned()))]
    #[case("   ", Err(FieldError::Empty))]
    #[case("abcdef", Err(FieldError::TooLong { max: 5 }))]
    fn bounded_text_trims_and_checks_width(
        #[case] raw: &str,
        #[case] expected: Result<String, FieldError>,
    ) {
        assert_eq!(bounded_text(raw, 5), expected);
    }

    #[rstest]
    fn width_counts_characters_not_bytes() {
        assert_eq!(bounded_text("ééééé", 5), Ok("ééééé".to_owned()));
    }
}
