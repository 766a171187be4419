//! The engine facade.
//!
//! Walks a schema tree and, per property, normalizes the supplied value and
//! its nested objects and array elements, then runs the property's
//! validators on the result. Field errors accumulate across the whole tree;
//! store failures abort immediately. Authorization and generation are a
//! separate pass over the normalized result.

use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult, ValidationErrors, ValidatorFailure};
use crate::normalize::normalize;
use crate::registry::{EngineBuilder, Registry};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use svcschema_model::{
    PropertyDefinition, PropertyMap, PropertySource, PropertyType, Schema, SchemaError,
    SchemaErrors, StandardValue, path,
};
use svcschema_store::{Store, StoreError};
use tracing::{debug, warn};

/// Validates, authorizes and generates service properties against a schema.
///
/// Stateless between calls; share one instance freely.
#[derive(Clone)]
pub struct Engine {
    registry: Registry,
}

impl Engine {
    /// An engine with every built-in component.
    pub fn new() -> Self {
        EngineBuilder::new().build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub(crate) fn from_registry(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ── Schema authoring ─────────────────────────────────────────

    /// Checks a schema before it is used: structure, plus every validator,
    /// authorizer and generator name and configuration.
    pub fn check_schema(&self, schema: &Schema) -> EngineResult<()> {
        let mut errors = match schema.check() {
            Ok(()) => Vec::new(),
            Err(SchemaErrors(errors)) => errors,
        };
        self.check_components(schema, "", &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Schema(SchemaErrors(errors)))
        }
    }

    fn check_components(&self, schema: &Schema, parent: &str, errors: &mut Vec<SchemaError>) {
        for (name, definition) in schema {
            let path = path::child(parent, name);
            self.check_definition(definition, &path, errors);
        }
    }

    fn check_definition(
        &self,
        definition: &PropertyDefinition,
        path: &str,
        errors: &mut Vec<SchemaError>,
    ) {
        let mut report = |role: &'static str, name: &str, outcome: Option<Result<(), String>>| {
            let error = match outcome {
                None => SchemaError::UnknownComponent {
                    path: path.to_string(),
                    role,
                    name: name.to_string(),
                },
                Some(Err(reason)) => SchemaError::InvalidConfig {
                    path: path.to_string(),
                    role,
                    name: name.to_string(),
                    reason,
                },
                Some(Ok(())) => return,
            };
            errors.push(error);
        };

        // Empty names are already reported by the structural check.
        for spec in definition.validators.iter().filter(|s| !s.kind.trim().is_empty()) {
            let outcome = self
                .registry
                .validator(&spec.kind)
                .map(|v| v.validate_config(&spec.value));
            report("validator", &spec.kind, outcome);
        }
        for spec in definition.authorizers.iter().filter(|s| !s.kind.trim().is_empty()) {
            let outcome = self
                .registry
                .authorizer(&spec.kind)
                .map(|a| a.validate_config(&spec.value));
            report("authorizer", &spec.kind, outcome);
        }
        if let Some(spec) = definition.generator.as_ref().filter(|s| !s.kind.trim().is_empty()) {
            let outcome = self
                .registry
                .generator(&spec.kind)
                .map(|g| g.validate_config(&spec.value));
            report("generator", &spec.kind, outcome);
        }

        if let Some(nested) = &definition.properties {
            self.check_components(nested, path, errors);
        }
        if let Some(items) = &definition.items {
            self.check_definition(items, &path::items(path), errors);
        }
    }

    // ── Validation ───────────────────────────────────────────────

    /// Fills declared defaults for absent properties. Idempotent.
    pub fn apply_defaults(&self, raw: &Map<String, Value>, schema: &Schema) -> Map<String, Value> {
        svcschema_model::apply_defaults(raw, schema)
    }

    /// Validates a raw property set and returns its normalized form.
    ///
    /// On update `raw` holds only the changes: it is laid over the stored
    /// properties first, and stored values left as they were skip their
    /// validators. Defaults are applied next. Every field error in the tree
    /// is collected into one [`EngineError::Validation`]; a store failure
    /// aborts with [`EngineError::Store`].
    pub fn validate_and_normalize(
        &self,
        schema: &Schema,
        raw: &Map<String, Value>,
        ctx: &EngineContext<'_>,
    ) -> EngineResult<PropertyMap> {
        let stored = ctx.is_update().then_some(&ctx.service.properties);
        let merged;
        let raw = match stored {
            Some(stored) => {
                merged = overlay(stored, raw);
                &merged
            }
            None => raw,
        };

        let filled = svcschema_model::apply_defaults(raw, schema);
        let mut errors = ValidationErrors::new();
        let normalized = self.validate_object(schema, &filled, stored, "", ctx, &mut errors)?;

        match normalized {
            Some(normalized) if errors.is_empty() => {
                debug!("Validated {} properties", normalized.len());
                Ok(normalized)
            }
            _ => {
                debug!("Rejected property set with {} field error(s)", errors.len());
                Err(EngineError::Validation(errors))
            }
        }
    }

    /// `None` when a present child failed its type check.
    fn validate_object(
        &self,
        schema: &Schema,
        raw: &Map<String, Value>,
        stored: Option<&Map<String, Value>>,
        parent: &str,
        ctx: &EngineContext<'_>,
        errors: &mut ValidationErrors,
    ) -> EngineResult<Option<BTreeMap<String, StandardValue>>> {
        for name in raw.keys().filter(|name| !schema.contains(name)) {
            errors.push(path::child(parent, name), "unknown property");
        }

        let mut out = BTreeMap::new();
        let mut intact = true;
        for (name, definition) in schema {
            let path = path::child(parent, name);
            let before = stored.and_then(|s| s.get(name));
            match raw.get(name).filter(|v| !v.is_null()) {
                // Generated properties are filled, or fail, in the next pass.
                None if definition.required && definition.generator.is_none() => {
                    errors.push(path, "required field is missing")
                }
                None => {}
                Some(value) => {
                    match self.validate_value(definition, value, before, &path, ctx, errors)? {
                        Some(normalized) => {
                            out.insert(name.clone(), normalized);
                        }
                        None => intact = false,
                    }
                }
            }
        }
        Ok(intact.then_some(out))
    }

    /// Normalizes `raw`, then its children, then runs the property's
    /// validators on the fully normalized value.
    ///
    /// Returns `None` when the value or any element below it has the wrong
    /// type; the property's own validators are skipped in that case.
    fn validate_value(
        &self,
        definition: &PropertyDefinition,
        raw: &Value,
        stored: Option<&Value>,
        path: &str,
        ctx: &EngineContext<'_>,
        errors: &mut ValidationErrors,
    ) -> EngineResult<Option<StandardValue>> {
        let value = match normalize(raw, definition.property_type, ctx) {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(None),
            Err(ValidatorFailure::Invalid(message)) => {
                errors.push(path, message);
                return Ok(None);
            }
            Err(ValidatorFailure::Store(e)) => {
                return Err(EngineError::store(format!("resolving {path}"), e));
            }
        };

        let value = match (definition.property_type, raw) {
            (PropertyType::Object, Value::Object(children)) => match &definition.properties {
                Some(nested) => {
                    let stored = stored.and_then(Value::as_object);
                    match self.validate_object(nested, children, stored, path, ctx, errors)? {
                        Some(children) => StandardValue::Object(children),
                        None => return Ok(None),
                    }
                }
                None => value,
            },
            (PropertyType::Array, Value::Array(elements)) => match &definition.items {
                Some(items) => {
                    let stored = stored.and_then(Value::as_array);
                    let mut out = Vec::with_capacity(elements.len());
                    let mut intact = true;
                    for (i, element) in elements.iter().enumerate() {
                        let before = stored.and_then(|s| s.get(i));
                        let element_path = path::index(path, i);
                        let validated = self.validate_value(
                            items,
                            element,
                            before,
                            &element_path,
                            ctx,
                            errors,
                        )?;
                        match validated {
                            Some(v) => out.push(v),
                            None => intact = false,
                        }
                    }
                    if !intact {
                        return Ok(None);
                    }
                    StandardValue::Array(out)
                }
                None => value,
            },
            _ => value,
        };

        if stored != Some(raw) {
            self.run_validators(definition, &value, path, ctx, errors)?;
        }
        Ok(Some(value))
    }

    fn run_validators(
        &self,
        definition: &PropertyDefinition,
        value: &StandardValue,
        path: &str,
        ctx: &EngineContext<'_>,
        errors: &mut ValidationErrors,
    ) -> EngineResult<()> {
        for spec in &definition.validators {
            let Some(validator) = self.registry.validator(&spec.kind) else {
                errors.push(path, format!("unknown validator type: {}", spec.kind));
                continue;
            };
            if let Err(reason) = validator.validate_config(&spec.value) {
                errors.push(path, format!("invalid {} validator config: {reason}", spec.kind));
                continue;
            }
            match validator.validate(ctx, path, value, &spec.value) {
                Ok(()) => {}
                Err(ValidatorFailure::Invalid(message)) => errors.push(path, message),
                Err(ValidatorFailure::Store(e)) => {
                    return Err(EngineError::store(
                        format!("{} validator at {path}", spec.kind),
                        e,
                    ));
                }
            }
        }
        Ok(())
    }

    // ── Authorization and generation ─────────────────────────────

    /// Runs authorizers on every property `supplied` changes and generators
    /// on every omitted one, inserting generated values into `properties`.
    ///
    /// `supplied` is the raw input the caller received; defaulted and
    /// unchanged stored values are never authorized. The first refusal or
    /// generation failure aborts. Call inside an atomic unit when generators
    /// may allocate from pools.
    pub fn authorize_and_generate(
        &self,
        schema: &Schema,
        supplied: &Map<String, Value>,
        properties: &mut PropertyMap,
        ctx: &EngineContext<'_>,
    ) -> EngineResult<()> {
        let stored = &ctx.service.properties;
        self.authorize_object(schema, supplied, properties, Some(stored), "", ctx)
    }

    fn authorize_object(
        &self,
        schema: &Schema,
        supplied: &Map<String, Value>,
        properties: &mut BTreeMap<String, StandardValue>,
        stored: Option<&Map<String, Value>>,
        parent: &str,
        ctx: &EngineContext<'_>,
    ) -> EngineResult<()> {
        let nothing = Map::new();
        for (name, definition) in schema {
            let path = path::child(parent, name);
            let existing = stored.and_then(|s| s.get(name)).filter(|v| !v.is_null());
            let offered = supplied.get(name);

            match properties.get_mut(name) {
                Some(value) => {
                    if offered.is_some_and(|v| !v.is_null()) && !unchanged(value, existing) {
                        self.authorize(definition, &path, ctx)?;
                    }
                    if let (Some(nested), StandardValue::Object(children)) =
                        (&definition.properties, value)
                    {
                        let nested_supplied =
                            offered.and_then(Value::as_object).unwrap_or(&nothing);
                        let nested_stored = existing.and_then(Value::as_object);
                        self.authorize_object(
                            nested,
                            nested_supplied,
                            children,
                            nested_stored,
                            &path,
                            ctx,
                        )?;
                    }
                }
                None => {
                    // Clearing a stored value changes it too.
                    if offered.is_some_and(Value::is_null) && existing.is_some() {
                        self.authorize(definition, &path, ctx)?;
                    }
                    let Some(spec) = &definition.generator else {
                        continue;
                    };
                    let existing =
                        existing.and_then(|v| StandardValue::from_json(v).ok().flatten());
                    let Some(generator) = self.registry.generator(&spec.kind) else {
                        return Err(EngineError::generation(
                            path,
                            format!("unknown generator type: {}", spec.kind),
                        ));
                    };
                    let (value, generated) = generator
                        .generate(ctx, &path, existing.as_ref(), &spec.value)
                        .inspect_err(|e| warn!("Generator {} failed: {}", spec.kind, e))?;
                    match (value, generated) {
                        (Some(value), true) => {
                            debug!("Generated {} = {}", path, value);
                            properties.insert(name.clone(), value);
                        }
                        (None, _) if definition.required => {
                            return Err(EngineError::generation(
                                path,
                                format!("{} generator produced no value", spec.kind),
                            ));
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    fn authorize(
        &self,
        definition: &PropertyDefinition,
        path: &str,
        ctx: &EngineContext<'_>,
    ) -> EngineResult<()> {
        for spec in &definition.authorizers {
            let Some(authorizer) = self.registry.authorizer(&spec.kind) else {
                return Err(EngineError::unauthorized(
                    path,
                    format!("unknown authorizer type: {}", spec.kind),
                ));
            };
            if let Err(reason) = authorizer.authorize(ctx, path, &spec.value) {
                warn!(
                    "{} authorizer rejected {} for actor {}: {}",
                    spec.kind, path, ctx.actor, reason
                );
                return Err(EngineError::unauthorized(path, reason));
            }
        }
        Ok(())
    }

    /// Releases everything the schema's generators took for the service,
    /// e.g. when the service is deleted.
    pub fn release_generated(&self, schema: &Schema, ctx: &EngineContext<'_>) -> EngineResult<()> {
        for (name, definition) in schema {
            self.release_definition(definition, &path::child("", name), ctx)?;
        }
        Ok(())
    }

    fn release_definition(
        &self,
        definition: &PropertyDefinition,
        path: &str,
        ctx: &EngineContext<'_>,
    ) -> EngineResult<()> {
        if let Some(spec) = &definition.generator {
            let Some(generator) = self.registry.generator(&spec.kind) else {
                return Err(EngineError::generation(
                    path,
                    format!("unknown generator type: {}", spec.kind),
                ));
            };
            generator.release(ctx, path, &spec.value)?;
        }
        if let Some(nested) = &definition.properties {
            for (name, child) in nested {
                self.release_definition(child, &path::child(path, name), ctx)?;
            }
        }
        Ok(())
    }

    // ── Source / updatability ────────────────────────────────────

    /// Gate on which top-level properties `source` may supply at creation.
    pub fn validate_properties_for_creation(
        &self,
        properties: &Map<String, Value>,
        schema: Option<&Schema>,
        source: PropertySource,
    ) -> EngineResult<()> {
        svcschema_model::validate_properties_for_creation(properties, schema, source)
            .inspect_err(|e| debug!("Creation gate: {}", e))
            .map_err(EngineError::from)
    }

    /// Gate on which top-level properties `source` may change while the
    /// service is in `current_state`.
    pub fn validate_properties_for_update(
        &self,
        updates: &Map<String, Value>,
        current_state: &str,
        schema: Option<&Schema>,
        source: PropertySource,
    ) -> EngineResult<()> {
        svcschema_model::validate_properties_for_update(updates, current_state, schema, source)
            .inspect_err(|e| debug!("Update gate: {}", e))
            .map_err(EngineError::from)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `work` as one atomic unit of `store`.
///
/// `work` receives the handle to read and write through (rebind contexts
/// with [`EngineContext::with_store`]). An `Err` from `work` rolls the unit
/// back and is returned unchanged.
pub fn run_atomic<T>(
    store: &dyn Store,
    mut work: impl FnMut(&dyn Store) -> EngineResult<T>,
) -> EngineResult<T> {
    let mut outcome: Option<EngineResult<T>> = None;
    let committed = store.atomic(&mut |tx: &dyn Store| match work(tx) {
        Ok(value) => {
            outcome = Some(Ok(value));
            Ok(())
        }
        Err(e) => {
            let reason = e.to_string();
            outcome = Some(Err(e));
            Err(StoreError::Aborted(reason))
        }
    });

    match (committed, outcome) {
        (Ok(()), Some(result)) => result,
        (Err(StoreError::Aborted(_)), Some(Err(e))) => Err(e),
        (Err(e), _) => Err(EngineError::store("atomic unit", e)),
        (Ok(()), None) => Err(EngineError::store(
            "atomic unit",
            StoreError::Aborted("unit committed without running".to_string()),
        )),
    }
}

/// `stored` with every entry of `updates` written over it.
fn overlay(stored: &Map<String, Value>, updates: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = stored.clone();
    merged.extend(updates.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Whether `value` equals the stored value it would replace.
fn unchanged(value: &StandardValue, stored: Option<&Value>) -> bool {
    match stored.map(StandardValue::from_json) {
        Some(Ok(Some(old))) => value.deep_eq(&old),
        _ => false,
    }
}
