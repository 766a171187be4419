use crate::error::{SchemaError, SchemaErrors};
use crate::path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use svcschema_types::PropertySource;

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    /// Identifier of another service that must exist.
    Reference,
    /// Any JSON value, converted structurally.
    Json,
}

impl PropertyType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Reference => "reference",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether and when a property may change after creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Updatable {
    #[default]
    Always,
    Never,
    /// Only while the service is in one of `updatableIn`.
    Statuses,
}

/// A `{type, value}` pair selecting a registered validator, authorizer or
/// generator and carrying its configuration.
///
/// The configuration is opaque here; each implementation type-checks its
/// own `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ComponentSpec {
    pub fn new(kind: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }
}

pub type ValidatorSpec = ComponentSpec;
pub type AuthorizerSpec = ComponentSpec;
pub type GeneratorSpec = ComponentSpec;

/// One schema node.
///
/// Unknown keys on the wire are ignored so older engines accept newer
/// schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// Display hint only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Untyped literal applied before validation when the value is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<ValidatorSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorizers: Vec<AuthorizerSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorSpec>,
    /// Sub-schema, objects only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Schema>,
    /// Element definition, arrays only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertyDefinition>>,
    #[serde(default)]
    pub source: PropertySource,
    #[serde(default)]
    pub updatable: Updatable,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updatable_in: Vec<String>,
}

impl PropertyDefinition {
    /// A plain, optional property of the given type.
    pub fn new(property_type: PropertyType) -> Self {
        Self {
            property_type,
            label: None,
            required: false,
            default: None,
            validators: Vec::new(),
            authorizers: Vec::new(),
            generator: None,
            properties: None,
            items: None,
            source: PropertySource::Input,
            updatable: Updatable::Always,
            updatable_in: Vec::new(),
        }
    }

    /// Shorthand for a string property.
    pub fn string() -> Self {
        Self::new(PropertyType::String)
    }

    /// Shorthand for an integer property.
    pub fn integer() -> Self {
        Self::new(PropertyType::Integer)
    }

    /// Shorthand for an object property with the given sub-schema.
    pub fn object(properties: Schema) -> Self {
        Self::new(PropertyType::Object).with_properties(properties)
    }

    /// Shorthand for an array property whose elements follow `items`.
    pub fn array(items: PropertyDefinition) -> Self {
        Self::new(PropertyType::Array).with_items(items)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_validator(mut self, kind: &str, value: serde_json::Value) -> Self {
        self.validators.push(ComponentSpec::new(kind, value));
        self
    }

    pub fn with_authorizer(mut self, kind: &str, value: serde_json::Value) -> Self {
        self.authorizers.push(ComponentSpec::new(kind, value));
        self
    }

    pub fn with_generator(mut self, kind: &str, value: serde_json::Value) -> Self {
        self.generator = Some(ComponentSpec::new(kind, value));
        self
    }

    pub fn with_properties(mut self, properties: Schema) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn with_items(mut self, items: PropertyDefinition) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    pub fn with_source(mut self, source: PropertySource) -> Self {
        self.source = source;
        self
    }

    pub fn never_updatable(mut self) -> Self {
        self.updatable = Updatable::Never;
        self.updatable_in.clear();
        self
    }

    /// Updatable only while the service is in one of `states`.
    pub fn updatable_in<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.updatable = Updatable::Statuses;
        self.updatable_in = states.into_iter().map(Into::into).collect();
        self
    }

    fn check_into(&self, path: &str, errors: &mut Vec<SchemaError>) {
        match (self.property_type, &self.properties) {
            (PropertyType::Object, Some(nested)) => nested.check_into(path, errors),
            (_, Some(_)) => errors.push(SchemaError::PropertiesOnNonObject {
                path: path.to_string(),
            }),
            _ => {}
        }

        match (self.property_type, &self.items) {
            (PropertyType::Array, Some(items)) => items.check_into(&path::items(path), errors),
            (PropertyType::Array, None) => errors.push(SchemaError::MissingItems {
                path: path.to_string(),
            }),
            (_, Some(_)) => errors.push(SchemaError::ItemsOnNonArray {
                path: path.to_string(),
            }),
            _ => {}
        }

        match self.updatable {
            Updatable::Statuses if self.updatable_in.is_empty() => {
                errors.push(SchemaError::EmptyUpdatableIn {
                    path: path.to_string(),
                });
            }
            Updatable::Always | Updatable::Never if !self.updatable_in.is_empty() => {
                errors.push(SchemaError::UnexpectedUpdatableIn {
                    path: path.to_string(),
                });
            }
            _ => {}
        }

        let specs = self
            .validators
            .iter()
            .map(|s| ("validator", s))
            .chain(self.authorizers.iter().map(|s| ("authorizer", s)))
            .chain(self.generator.iter().map(|s| ("generator", s)));
        for (role, spec) in specs {
            if spec.kind.trim().is_empty() {
                errors.push(SchemaError::MissingSpecType {
                    path: path.to_string(),
                    role,
                });
            }
        }
    }
}

/// Mapping from property name to definition.
///
/// Backed by a `BTreeMap` so every walk over a schema visits properties in
/// name order and error lists come out deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(BTreeMap<String, PropertyDefinition>);

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a property.
    pub fn with(mut self, name: impl Into<String>, definition: PropertyDefinition) -> Self {
        self.0.insert(name.into(), definition);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, definition: PropertyDefinition) {
        self.0.insert(name.into(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDefinition> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyDefinition)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses a schema from its JSON wire form.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Structural authoring check, independent of any request.
    ///
    /// Reports every problem found, each addressed by its property path.
    /// Registry-dependent checks (unknown validator names, malformed
    /// validator configs) belong to the engine.
    pub fn check(&self) -> Result<(), SchemaErrors> {
        let mut errors = Vec::new();
        self.check_into("", &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaErrors(errors))
        }
    }

    fn check_into(&self, parent: &str, errors: &mut Vec<SchemaError>) {
        for (name, definition) in &self.0 {
            let path = path::child(parent, name);
            if name.trim().is_empty() {
                errors.push(SchemaError::EmptyName { path: path.clone() });
            }
            definition.check_into(&path, errors);
        }
    }
}

impl FromIterator<(String, PropertyDefinition)> for Schema {
    fn from_iter<T: IntoIterator<Item = (String, PropertyDefinition)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = (&'a String, &'a PropertyDefinition);
    type IntoIter = std::collections::btree_map::Iter<'a, String, PropertyDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
