//! Helper macro generating port error enums with snake_case constructors.

/// Declare a `thiserror` enum for a port together with one constructor per
/// variant. Constructor parameters accept anything convertible into the
/// field type, so `Error::query("boom")` works for `String` fields.
macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }
        }
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    define_port_error! {
        pub enum LedgerPortError {
            Offline => "ledger offline",
            Rejected { message: String } => "ledger rejected: {message}",
            Partial { message: String, applied: u64 } => "partial ({applied}): {message}",
        }
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(LedgerPortError::offline().to_string(), "ledger offline");
    }

    #[test]
    fn string_fields_accept_str() {
        let err = LedgerPortError::rejected("bad row");
        assert_eq!(err, LedgerPortError::Rejected { message: "bad row".to_owned() });
    }

    #[test]
    fn mixed_fields_keep_their_types() {
        let err = LedgerPortError::partial("timeout", 3_u64);
        assert_eq!(err.to_string(), "partial (3): timeout");
    }
}
