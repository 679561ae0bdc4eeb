//! `define_port_error!` declares an adapter error enum in one block: each
//! variant gets a `thiserror` message, a snake_case constructor taking
//! `impl Into<_>` arguments, and a `kind()` label for log fields.

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

    (
        @ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*)
        $field:ident : $ty:ty, $($rest:tt)*
    ) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
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

            /// Variant name, suitable for structured log fields.
            #[must_use]
            pub const fn kind(&self) -> &'static str {
                match self {
                    $(
                        Self::$variant { .. } => stringify!($variant),
                    )*
                }
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    define_port_error! {
        pub enum CounterStoreError {
            Unavailable { message: String } => "counter store unavailable: {message}",
            Overflow { window: u64 } => "counter overflowed in window {window}",
            Rejected { message: String, window: u64 } => "rejected {message} in window {window}",
            Closed => "counter store closed",
        }
    }

    #[rstest]
    #[case(CounterStoreError::unavailable("redis down"), "counter store unavailable: redis down")]
    #[case(CounterStoreError::overflow(7_u64), "counter overflowed in window 7")]
    #[case(CounterStoreError::rejected("offer_accept", 3_u64), "rejected offer_accept in window 3")]
    #[case(CounterStoreError::closed(), "counter store closed")]
    fn constructors_render_their_messages(
        #[case] error: CounterStoreError,
        #[case] expected: &str,
    ) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    fn kind_is_the_variant_name() {
        assert_eq!(CounterStoreError::unavailable(String::new()).kind(), "Unavailable");
        assert_eq!(CounterStoreError::closed().kind(), "Closed");
    }
}
