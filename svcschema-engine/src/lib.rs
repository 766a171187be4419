//! Schema engine for svcschema.
//!
//! Turns a raw, dynamically typed property map into a normalized
//! [`PropertyMap`] for a service, or a precise list of field errors:
//! - [`normalize`]: raw JSON to [`StandardValue`] per declared type
//! - [`validator`]: built-in and pluggable value checks
//! - [`authorizer`]: who may set a property, and in which states
//! - [`generator`] / [`pool`]: values for omitted properties, drawn from
//!   list or subnet resource pools
//! - [`Engine`]: the facade composing all of the above
//!
//! The engine is synchronous and keeps no state between calls. Everything
//! it needs per request travels in an [`EngineContext`]; everything it
//! reads or writes goes through the [`svcschema_store::Store`] in that
//! context.

pub mod authorizer;
mod context;
mod engine;
mod error;
pub mod generator;
pub mod normalize;
pub mod pool;
mod registry;
pub mod validator;

pub use authorizer::Authorizer;
pub use context::{EngineContext, ServiceTarget};
pub use engine::{Engine, run_atomic};
pub use error::{EngineError, EngineResult, FieldError, ValidationErrors, ValidatorFailure};
pub use generator::Generator;
pub use pool::{PoolAllocator, Subnet, SubnetConfig};
pub use registry::{EngineBuilder, Registry};
pub use svcschema_model::{PropertyMap, Schema, StandardValue};
pub use validator::Validator;
