//! Name → implementation tables for validators, authorizers and generators.

use crate::authorizer::{self, Authorizer};
use crate::engine::Engine;
use crate::generator::{self, Generator};
use crate::validator::{self, Validator};
use std::collections::HashMap;
use std::sync::Arc;

/// The components an engine can resolve by name.
///
/// Assembled once by [`EngineBuilder`] and frozen inside the [`Engine`].
#[derive(Clone, Default)]
pub struct Registry {
    validators: HashMap<String, Arc<dyn Validator>>,
    authorizers: HashMap<String, Arc<dyn Authorizer>>,
    generators: HashMap<String, Arc<dyn Generator>>,
}

impl Registry {
    /// Registry with every built-in component.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        for (name, v) in validator::builtin() {
            registry.validators.insert(name.to_string(), v);
        }
        for (name, a) in authorizer::builtin() {
            registry.authorizers.insert(name.to_string(), a);
        }
        for (name, g) in generator::builtin() {
            registry.generators.insert(name.to_string(), g);
        }
        registry
    }

    pub fn validator(&self, name: &str) -> Option<&dyn Validator> {
        self.validators.get(name).map(Arc::as_ref)
    }

    pub fn authorizer(&self, name: &str) -> Option<&dyn Authorizer> {
        self.authorizers.get(name).map(Arc::as_ref)
    }

    pub fn generator(&self, name: &str) -> Option<&dyn Generator> {
        self.generators.get(name).map(Arc::as_ref)
    }

    /// Registered validator names, sorted.
    pub fn validator_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Builds an [`Engine`] with a customised registry.
///
/// Starts from the built-ins; `with_*` adds or replaces an entry under a
/// name, `without_validator` drops one.
pub struct EngineBuilder {
    registry: Registry,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            registry: Registry::builtin(),
        }
    }

    /// A builder with nothing registered.
    pub fn empty() -> Self {
        Self {
            registry: Registry::default(),
        }
    }

    pub fn with_validator(
        mut self,
        name: impl Into<String>,
        validator: impl Validator + 'static,
    ) -> Self {
        self.registry
            .validators
            .insert(name.into(), Arc::new(validator));
        self
    }

    pub fn without_validator(mut self, name: &str) -> Self {
        self.registry.validators.remove(name);
        self
    }

    pub fn with_authorizer(
        mut self,
        name: impl Into<String>,
        authorizer: impl Authorizer + 'static,
    ) -> Self {
        self.registry
            .authorizers
            .insert(name.into(), Arc::new(authorizer));
        self
    }

    pub fn with_generator(
        mut self,
        name: impl Into<String>,
        generator: impl Generator + 'static,
    ) -> Self {
        self.registry
            .generators
            .insert(name.into(), Arc::new(generator));
        self
    }

    pub fn build(self) -> Engine {
        Engine::from_registry(self.registry)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_resolves_every_role() {
        let registry = Registry::builtin();
        assert!(registry.validator("minLength").is_some());
        assert!(registry.validator("serviceReference").is_some());
        assert!(registry.authorizer("actor").is_some());
        assert!(registry.authorizer("state").is_some());
        assert!(registry.generator("pool").is_some());
        assert!(registry.validator("nope").is_none());
        assert_eq!(registry.validator_names().len(), 13);
    }

    #[test]
    fn empty_builder_registers_nothing() {
        let engine = EngineBuilder::empty().build();
        assert!(engine.registry().validator_names().is_empty());
    }
}
