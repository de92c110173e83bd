use derive_more::Display;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
        pub struct $name(String);
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

identifier!(
    /// Opaque identifier of a [`Work`](crate::Work).
    WorkId
);
identifier!(
    /// Opaque identifier of a [`Chapter`](crate::Chapter).
    ChapterId
);
identifier!(
    /// Opaque identifier of a [`Series`](crate::Series).
    SeriesId
);
