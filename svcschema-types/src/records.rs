//! Records owned by the engine's collaborators.
//!
//! The engine never creates services, service types or options; it reads
//! them through the store. Pool values are the exception: allocation
//! strategies create and update them, always through the store.

use crate::{
    Error, OptionTypeId, ParticipantId, PoolId, PoolSetId, PoolValueId, ServiceGroupId,
    ServiceId, ServiceOptionId, ServiceTypeId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A provisioned service, as far as property validation needs to see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub id: ServiceId,
    pub service_type_id: ServiceTypeId,
    pub provider_id: ParticipantId,
    pub consumer_id: ParticipantId,
    pub group_id: ServiceGroupId,
    /// Pool set the service draws generated values from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_set_id: Option<PoolSetId>,
    /// Current lifecycle state name (e.g. "Started", "Stopped").
    pub current_state: String,
    /// Raw persisted property values.
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// The "kind" of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTypeRecord {
    pub id: ServiceTypeId,
    pub name: String,
}

/// A logical option category (e.g. "flavor", "region").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOptionType {
    pub id: OptionTypeId,
    pub name: String,
    /// Lookup key used by schemas to refer to this category.
    pub option_type: String,
}

/// One option a provider offers within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOption {
    pub id: ServiceOptionId,
    pub provider_id: ParticipantId,
    pub option_type_id: OptionTypeId,
    pub name: String,
    pub value: serde_json::Value,
    pub enabled: bool,
}

/// Allocation strategy of a resource pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolGeneratorType {
    /// Pre-seeded values handed out in order.
    List,
    /// Addresses carved out of a CIDR block on demand.
    Subnet,
}

impl fmt::Display for PoolGeneratorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => f.write_str("list"),
            Self::Subnet => f.write_str("subnet"),
        }
    }
}

impl FromStr for PoolGeneratorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(Self::List),
            "subnet" => Ok(Self::Subnet),
            other => Err(Error::UnknownVariant {
                kind: "pool generator type",
                value: other.to_string(),
            }),
        }
    }
}

/// A named, typed collection of allocatable values scoped to a pool set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePool {
    pub id: PoolId,
    pub pool_set_id: PoolSetId,
    pub name: String,
    /// Logical category schemas ask for (e.g. "public_ip").
    pub pool_type: String,
    pub generator_type: PoolGeneratorType,
    /// Strategy-specific configuration (the subnet block for `Subnet`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_config: Option<serde_json::Value>,
}

/// Who consumes an allocated pool value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub service_id: ServiceId,
    pub property_name: String,
    pub allocated_at: DateTime<Utc>,
}

/// One allocatable unit of a resource pool.
///
/// The three allocation fields live in a single [`Allocation`], so a value
/// is never partially allocated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolValue {
    pub id: PoolValueId,
    pub pool_id: PoolId,
    pub name: String,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Allocation>,
}

impl PoolValue {
    /// Creates an unallocated pool value.
    #[must_use]
    pub fn new(pool_id: PoolId, name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            id: PoolValueId::new(),
            pool_id,
            name: name.into(),
            value,
            allocation: None,
        }
    }

    /// Marks this value as consumed by `service_id` for `property_name`.
    pub fn allocate(
        &mut self,
        service_id: ServiceId,
        property_name: impl Into<String>,
        at: DateTime<Utc>,
    ) {
        self.allocation = Some(Allocation {
            service_id,
            property_name: property_name.into(),
            allocated_at: at,
        });
    }

    /// Clears the allocation.
    pub fn release(&mut self) {
        self.allocation = None;
    }

    pub fn is_allocated(&self) -> bool {
        self.allocation.is_some()
    }

    /// The consuming service, when allocated.
    pub fn service_id(&self) -> Option<ServiceId> {
        self.allocation.as_ref().map(|a| a.service_id)
    }
}
