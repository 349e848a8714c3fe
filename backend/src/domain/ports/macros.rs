//! Helper macro for declaring port error enums.
//!
//! Each declared enum derives `thiserror::Error`, gets one snake_case
//! constructor per variant (fields accept `impl Into<T>`), and a `kind()`
//! accessor returning the snake_case variant name for structured logs.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };

    (@pattern $variant:ident) => { Self::$variant };
    (@pattern $variant:ident { $($field:ident : $ty:ty),* }) => { Self::$variant { .. } };

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

            /// Snake-case variant name, stable across releases.
            pub fn kind(&self) -> &'static str {
                match self {
                    $(
                        define_port_error!(@pattern $variant $( { $($field : $ty),* } )?) => {
                            ::paste::paste! { stringify!([<$variant:snake>]) }
                        }
                    )*
                }
            }
        }
    };
}

pub(crate) use define_port_error;
