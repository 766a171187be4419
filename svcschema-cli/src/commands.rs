//! The work behind each subcommand.
//!
//! Every command returns an [`Outcome`]: a JSON document plus whether the
//! request was accepted. Rejections (field errors, refused mutations,
//! exhausted pools) are outcomes, not errors; `Err` is reserved for I/O
//! and store failures.

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Map, Value, json};
use std::path::Path;
use svcschema_engine::{Engine, EngineContext, EngineError, PropertyMap, Schema, run_atomic};
use svcschema_store::{SqliteStore, Store};
use svcschema_types::{
    ActorKind, Operation, ParticipantId, ServiceGroupId, ServiceId, ServiceRecord, ServiceTypeId,
};
use tracing::{debug, info};

/// Result of a command, ready to print.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(Value),
    Rejected(Value),
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn document(&self) -> &Value {
        match self {
            Self::Accepted(doc) | Self::Rejected(doc) => doc,
        }
    }
}

/// Turns an engine rejection into an outcome; other failures stay errors.
fn rejection(err: EngineError) -> Result<Outcome> {
    if let Some(errors) = err.field_errors() {
        return Ok(Outcome::Rejected(json!({ "errors": errors })));
    }
    let errors = match err {
        EngineError::Unauthorized { path, reason } | EngineError::Generation { path, reason } => {
            json!([{ "path": path, "message": reason }])
        }
        EngineError::Schema(errors) => errors
            .0
            .iter()
            .map(|e| json!({ "path": e.path(), "message": e.to_string() }))
            .collect(),
        other => return Err(anyhow::Error::new(other)),
    };
    Ok(Outcome::Rejected(json!({ "errors": errors })))
}

fn to_json(properties: &PropertyMap) -> Map<String, Value> {
    properties
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}

// ── Input files ──────────────────────────────────────────────────

pub fn load_schema(path: &Path) -> Result<Schema> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Schema {} is not valid JSON", path.display()))?;
    Schema::from_json(value).with_context(|| format!("Malformed schema {}", path.display()))
}

pub fn load_properties(path: &Path) -> Result<Map<String, Value>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read properties {}", path.display()))?;
    match serde_json::from_str::<Value>(&contents)
        .with_context(|| format!("Properties {} are not valid JSON", path.display()))?
    {
        Value::Object(map) => Ok(map),
        other => bail!("Properties {} must be a JSON object, got {other}", path.display()),
    }
}

fn find_service(store: &SqliteStore, id: ServiceId) -> Result<ServiceRecord> {
    store
        .find_service(&id)
        .with_context(|| format!("Failed to look up service {id}"))?
        .ok_or_else(|| anyhow!("service not found: {id}"))
}

/// Stand-in for a service that does not exist yet: fresh ids, no pool set,
/// no state.
fn unsaved_service() -> ServiceRecord {
    ServiceRecord {
        id: ServiceId::new(),
        service_type_id: ServiceTypeId::new(),
        provider_id: ParticipantId::new(),
        consumer_id: ParticipantId::new(),
        group_id: ServiceGroupId::new(),
        pool_set_id: None,
        current_state: String::new(),
        properties: Map::new(),
    }
}

// ── check-schema ─────────────────────────────────────────────────

pub fn check_schema(engine: &Engine, schema: &Schema) -> Result<Outcome> {
    match engine.check_schema(schema) {
        Ok(()) => Ok(Outcome::Accepted(json!({ "valid": true }))),
        Err(e) => rejection(e),
    }
}

// ── validate ─────────────────────────────────────────────────────

/// Arguments of `validate`.
#[derive(Debug, Clone)]
pub struct ValidateRequest {
    pub schema: Schema,
    pub properties: Map<String, Value>,
    pub operation: Operation,
    pub actor: ActorKind,
    /// Required for updates; creation may target a not-yet-stored service.
    pub service: Option<ServiceId>,
}

/// Runs the full pipeline: source / updatability gate, normalization and
/// validation, then authorization and generation in one atomic unit.
///
/// On update `properties` holds only the changes; the accepted document is
/// the service's full property set with them applied.
pub fn validate(engine: &Engine, store: &SqliteStore, request: &ValidateRequest) -> Result<Outcome> {
    let service = match (request.service, request.operation) {
        (Some(id), _) => find_service(store, id)?,
        (None, Operation::Create) => unsaved_service(),
        (None, Operation::Update) => bail!("--service is required for updates"),
    };
    let ctx = EngineContext::new(store, request.actor, request.operation, &service);
    let schema = &request.schema;

    let gate = match request.operation {
        Operation::Create => {
            engine.validate_properties_for_creation(&request.properties, Some(schema), ctx.source())
        }
        Operation::Update => engine.validate_properties_for_update(
            &request.properties,
            &service.current_state,
            Some(schema),
            ctx.source(),
        ),
    };
    if let Err(e) = gate {
        return rejection(e);
    }

    let mut normalized = match engine.validate_and_normalize(schema, &request.properties, &ctx) {
        Ok(normalized) => normalized,
        Err(e) => return rejection(e),
    };
    let generated = run_atomic(store, |tx| {
        engine.authorize_and_generate(
            schema,
            &request.properties,
            &mut normalized,
            &ctx.with_store(tx),
        )
    });
    if let Err(e) = generated {
        return rejection(e);
    }

    info!(
        "Accepted {} of service {} ({} properties)",
        request.operation,
        service.id,
        normalized.len()
    );
    Ok(Outcome::Accepted(json!({ "properties": to_json(&normalized) })))
}

// ── pool ─────────────────────────────────────────────────────────

/// Generates every generated property the service lacks and records the
/// values on the service.
pub fn allocate(
    engine: &Engine,
    store: &SqliteStore,
    schema: &Schema,
    service_id: ServiceId,
    actor: ActorKind,
) -> Result<Outcome> {
    let mut service = find_service(store, service_id)?;
    let mut generated = PropertyMap::new();
    let nothing_supplied = Map::new();
    let result = {
        let ctx = EngineContext::new(store, actor, Operation::Update, &service);
        run_atomic(store, |tx| {
            engine.authorize_and_generate(
                schema,
                &nothing_supplied,
                &mut generated,
                &ctx.with_store(tx),
            )
        })
    };
    if let Err(e) = result {
        return rejection(e);
    }

    let allocated = to_json(&generated);
    service.properties.extend(allocated.clone());
    store
        .insert_service(&service)
        .with_context(|| format!("Failed to save service {service_id}"))?;
    debug!("Recorded {} generated properties", allocated.len());
    Ok(Outcome::Accepted(json!({
        "service": service_id,
        "allocated": allocated,
    })))
}

/// Returns the service's pool values and clears the generated top-level
/// properties from it.
pub fn release(
    engine: &Engine,
    store: &SqliteStore,
    schema: &Schema,
    service_id: ServiceId,
    actor: ActorKind,
) -> Result<Outcome> {
    let mut service = find_service(store, service_id)?;
    let result = {
        let ctx = EngineContext::new(store, actor, Operation::Update, &service);
        run_atomic(store, |tx| engine.release_generated(schema, &ctx.with_store(tx)))
    };
    if let Err(e) = result {
        return rejection(e);
    }

    let cleared: Vec<String> = schema
        .iter()
        .filter(|(_, definition)| definition.generator.is_some())
        .filter_map(|(name, _)| service.properties.remove(name).map(|_| name.clone()))
        .collect();
    store
        .insert_service(&service)
        .with_context(|| format!("Failed to save service {service_id}"))?;
    Ok(Outcome::Accepted(json!({
        "service": service_id,
        "released": cleared,
    })))
}
