//! Helper macro for generating domain port error enums.

/// Define a `thiserror`-backed port error enum whose constructors accept
/// `impl Into<T>` for every field.
macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { $($field:ident : $ty:ty),* $(,)? } => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant { $($field : $ty),* },
            )*
        }

        ::paste::paste! {
            impl $name {
                $(
                    #[doc = concat!("Construct the `", stringify!($variant), "` variant.")]
                    pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                        Self::$variant { $($field: $field.into()),* }
                    }
                )*
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        /// Example error for macro coverage.
        pub enum ExamplePortError {
            /// Connection failure.
            Connection { message: String } => "connect: {message}",
            /// Query failure with context.
            Timeout { message: String, seconds: u64 } => "timeout after {seconds}s: {message}",
        }
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = ExamplePortError::connection("refused");
        assert_eq!(err.to_string(), "connect: refused");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = ExamplePortError::timeout("slow backend", 30u64);
        assert_eq!(err.to_string(), "timeout after 30s: slow backend");
    }
}
