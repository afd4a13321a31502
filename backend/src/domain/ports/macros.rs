//! `define_port_error!`: declares a port error enum together with snake_case
//! constructor helpers, so adapters can write
//! `TripRepositoryError::connection("pool exhausted")`.
//!
//! Variants prefixed with `[transient]` report `is_transient() == true`.

macro_rules! define_port_error {
    (@constructor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@constructor $variant:ident { $($field:ident : $ty:ty),* }) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }
        }
    };

    (@marker transient) => {
        true
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $([$marker:ident])?
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
                define_port_error!(@constructor $variant $( { $($field : $ty),* } )?);
            )*

            /// Whether retrying the same call may succeed.
            #[must_use]
            pub fn is_transient(&self) -> bool {
                match self {
                    $($(Self::$variant { .. } => define_port_error!(@marker $marker),)?)*
                    _ => false,
                }
            }
        }
    };
}

pub(crate) use define_port_error;
