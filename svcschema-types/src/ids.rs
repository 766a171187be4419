//! Identifier types used throughout svcschema.
//!
//! Uses UUID v7 for time-ordered, globally unique identifiers. Every
//! collaborator record gets its own newtype so a pool id can never be
//! passed where a service id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new identifier with the current timestamp.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Parses an identifier from a string.
            pub fn parse(s: &str) -> crate::Result<Self> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_id!(
    /// Identifier of a service instance, the resource whose properties are validated.
    ServiceId
);
define_id!(
    /// Identifier of a service type (the "kind" of a service).
    ServiceTypeId
);
define_id!(
    /// Identifier of a participant acting as provider or consumer.
    ParticipantId
);
define_id!(
    /// Identifier of a service group.
    ServiceGroupId
);
define_id!(
    /// Identifier of a pool set, the scope resource pools live in.
    PoolSetId
);
define_id!(
    /// Identifier of a resource pool.
    PoolId
);
define_id!(
    /// Identifier of a single allocatable pool value.
    PoolValueId
);
define_id!(
    /// Identifier of a service option type (a logical option category).
    OptionTypeId
);
define_id!(
    /// Identifier of a provider's service option.
    ServiceOptionId
);
