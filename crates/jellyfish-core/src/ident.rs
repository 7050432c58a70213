macro_rules! identifier {
    ($(#[$meta: meta])* $name: ident, $inner: ty) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Display,
            derive_more::FromStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// ID 0.
            pub const ZERO: $name = Self::new(0);

            /// Creates a new ID.
            pub const fn new(val: $inner) -> Self {
                Self(val)
            }

            /// Returns the inner representation of the ID.
            pub const fn inner(self) -> $inner {
                self.0
            }
        }
    };
}
