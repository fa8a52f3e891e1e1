//! Strongly typed native handles.
//!
//! The native backend hands out plain integer identifiers; wrapping each kind in its own
//! newtype keeps a dataspace from ever being passed where a dataset is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            #[must_use]
            pub const fn raw(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

native_handle!(
    /// A file or dataset opened by the native backend.
    ObjectId,
    "object"
);
native_handle!(
    /// A dataspace (shape plus optional selection).
    SpaceId,
    "space"
);
native_handle!(
    /// A property list (file access, dataset creation/access, transfer).
    PlistId,
    "plist"
);
native_handle!(
    /// A registered connector or driver.
    ConnectorId,
    "connector"
);

impl PlistId {
    /// The library's default property list of whatever class the call expects.
    pub const DEFAULT: Self = Self(0);

    #[must_use]
    pub const fn is_default(self) -> bool {
        self.0 == Self::DEFAULT.0
    }
}
