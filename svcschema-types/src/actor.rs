//! Who is acting, and what they are doing.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The already-resolved role of the caller issuing a request.
///
/// Authentication happens upstream; the engine only sees the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    Admin,
    Participant,
    Agent,
}

impl ActorKind {
    /// The property source this actor originates values from.
    #[must_use]
    pub const fn source(self) -> PropertySource {
        match self {
            Self::Agent => PropertySource::Agent,
            Self::Admin | Self::Participant => PropertySource::Input,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Participant => "participant",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "participant" => Ok(Self::Participant),
            "agent" => Ok(Self::Agent),
            other => Err(Error::UnknownVariant {
                kind: "actor kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Which actor category may originate a property's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertySource {
    /// Supplied by the requesting participant or admin.
    #[default]
    Input,
    /// Reported by the provider's agent.
    Agent,
}

impl PropertySource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for PropertySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertySource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Self::Input),
            "agent" => Ok(Self::Agent),
            other => Err(Error::UnknownVariant {
                kind: "property source",
                value: other.to_string(),
            }),
        }
    }
}

/// The mutation a property set is being checked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
}

impl Operation {
    #[must_use]
    pub const fn is_update(self) -> bool {
        matches!(self, Self::Update)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
        }
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            other => Err(Error::UnknownVariant {
                kind: "operation",
                value: other.to_string(),
            }),
        }
    }
}
