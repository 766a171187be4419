//! Core type definitions for svcschema.
//!
//! This crate holds the plugin-agnostic vocabulary shared by the schema
//! model, the store and the engine:
//! - Resource identifiers (UUID v7)
//! - Actor kinds, property sources and operations
//! - Records owned by external collaborators (services, service types,
//!   service options, resource pools and pool values)
//!
//! Nothing here touches storage or performs validation.

mod actor;
mod ids;
mod records;

pub use actor::{ActorKind, Operation, PropertySource};
pub use ids::{
    OptionTypeId, ParticipantId, PoolId, PoolSetId, PoolValueId, ServiceGroupId, ServiceId,
    ServiceOptionId, ServiceTypeId,
};
pub use records::{
    Allocation, PoolGeneratorType, PoolValue, ResourcePool, ServiceOption, ServiceOptionType,
    ServiceRecord, ServiceTypeRecord,
};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}
