//! Typed identifiers for every persisted record.
//!
//! # Responsibility
//! - Give each record family its own UUID newtype.
//! - Keep textual storage form (hyphenated UUID) in one place.
//!
//! # Invariants
//! - Identifiers of different families cannot be mixed at compile time.
//! - `Display` output is the exact value stored in SQLite `TEXT` columns.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_uuid_id!(
    /// Identifier of a platform user.
    UserId
);
define_uuid_id!(
    /// Identifier of a team.
    TeamId
);
define_uuid_id!(
    /// Identifier of an organization.
    OrganizationId
);
define_uuid_id!(
    /// Identifier of an owner row.
    OwnerId
);
define_uuid_id!(
    /// Identifier of a project.
    ProjectId
);
define_uuid_id!(
    /// Identifier of a project dependent (experiment, job, ...).
    ///
    /// Unique across all dependent kinds.
    DependentId
);

#[cfg(test)]
mod tests {
    use super::{ProjectId, UserId};
    use std::str::FromStr;

    #[test]
    fn display_and_parse_are_symmetric() {
        let id = ProjectId::new();
        let parsed = ProjectId::from_str(&id.to_string()).expect("hyphenated uuid should parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(UserId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn serializes_as_plain_uuid_string() {
        let id = UserId::new();
        let json = serde_json::to_value(id).expect("id should serialize");
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }
}
