//! Role and permission names.
//!
//! Both are opaque strings at this layer; the API decides which roles grant
//! which permissions.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

macro_rules! rbac_name {
    ($(#[$meta:meta])* $t:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Cow<'static, str>);

        impl $t {
            pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

rbac_name!(
    /// Role carried in a token (`admin`, `staff`, ...).
    Role
);

rbac_name!(
    /// Dotted permission name, e.g. `inventory.records.adjust`.
    Permission
);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const STAFF: Role = Role(Cow::Borrowed("staff"));
}

impl Permission {
    /// Grants every permission.
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub fn is_wildcard(&self) -> bool {
        *self == Self::WILDCARD
    }
}
