//! Property schema model for svcschema.
//!
//! Defines the data every other layer of the engine agrees on:
//! - [`Schema`] / [`PropertyDefinition`]: the recursive, user-authored
//!   description of which properties a service type accepts
//! - [`StandardValue`]: the normalized runtime form of a property value
//! - [`apply_defaults`]: the default-filling pre-pass
//! - [`validate_properties_for_creation`] and
//!   [`validate_properties_for_update`]: the source and updatability gate
//!
//! Everything here is pure: no store access, no registries. The engine
//! crate layers normalization, validators, authorizers and generators on
//! top of these types.

mod defaults;
mod error;
pub mod path;
mod rules;
mod schema;
mod value;

pub use defaults::apply_defaults;
pub use error::{RuleError, RuleResult, SchemaError, SchemaErrors};
pub use rules::{validate_properties_for_creation, validate_properties_for_update};
pub use schema::{
    AuthorizerSpec, ComponentSpec, GeneratorSpec, PropertyDefinition, PropertyType, Schema,
    Updatable, ValidatorSpec,
};
pub use svcschema_types::PropertySource;
pub use value::{PropertyMap, StandardValue, ValueError};
