//! Shared test helpers for engine tests.

#![allow(dead_code)]

use serde_json::{Map, Value, json};
use svcschema_engine::{EngineContext, EngineError, ValidationErrors};
use svcschema_store::{SqliteStore, Store};
use svcschema_types::{
    ActorKind, Operation, ParticipantId, PoolGeneratorType, PoolId, PoolSetId, PoolValue,
    ResourcePool, ServiceGroupId, ServiceId, ServiceRecord, ServiceTypeId, ServiceTypeRecord,
};

/// An in-memory store plus the service being validated.
pub struct Fixture {
    pub store: SqliteStore,
    pub service: ServiceRecord,
}

impl Fixture {
    /// A started service with its own (empty) pool set.
    pub fn new() -> Self {
        let store = SqliteStore::open_in_memory().unwrap();
        let service = make_service(Some(PoolSetId::new()), "Started");
        store.insert_service(&service).unwrap();
        Self { store, service }
    }

    pub fn ctx(&self, actor: ActorKind, operation: Operation) -> EngineContext<'_> {
        EngineContext::new(&self.store, actor, operation, &self.service)
    }

    /// Participant creating the service.
    pub fn create_ctx(&self) -> EngineContext<'_> {
        self.ctx(ActorKind::Participant, Operation::Create)
    }

    /// Participant updating the service.
    pub fn update_ctx(&self) -> EngineContext<'_> {
        self.ctx(ActorKind::Participant, Operation::Update)
    }

    pub fn set_state(&mut self, state: &str) {
        self.service.current_state = state.to_string();
    }

    /// Stores another service of the named type, sharing this service's
    /// consumer and group unless changed afterwards.
    pub fn add_sibling(&self, type_name: &str) -> ServiceRecord {
        let kind = ServiceTypeRecord {
            id: ServiceTypeId::new(),
            name: type_name.to_string(),
        };
        self.store.insert_service_type(&kind).unwrap();
        let mut sibling = make_service(None, "Started");
        sibling.service_type_id = kind.id;
        sibling.consumer_id = self.service.consumer_id;
        sibling.group_id = self.service.group_id;
        self.store.insert_service(&sibling).unwrap();
        sibling
    }

    /// Adds a list pool of `pool_type` to the service's pool set, seeded
    /// with `values`.
    pub fn add_list_pool(&self, pool_type: &str, values: &[&str]) -> ResourcePool {
        let pool = ResourcePool {
            id: PoolId::new(),
            pool_set_id: self.pool_set(),
            name: format!("{pool_type}-list"),
            pool_type: pool_type.to_string(),
            generator_type: PoolGeneratorType::List,
            generator_config: None,
        };
        self.store.insert_pool(&pool).unwrap();
        for value in values {
            self.store
                .insert_pool_value(&PoolValue::new(pool.id, *value, json!(value)))
                .unwrap();
        }
        pool
    }

    /// Adds a subnet pool of `pool_type` to the service's pool set.
    pub fn add_subnet_pool(
        &self,
        pool_type: &str,
        cidr: &str,
        exclude_first: u64,
        exclude_last: u64,
    ) -> ResourcePool {
        let mut pool = subnet_pool(self.pool_set(), pool_type, cidr);
        pool.generator_config = Some(json!({
            "cidr": cidr,
            "excludeFirst": exclude_first,
            "excludeLast": exclude_last,
        }));
        self.store.insert_pool(&pool).unwrap();
        pool
    }

    /// Pool values currently allocated to the service.
    pub fn held_values(&self) -> Vec<PoolValue> {
        self.store
            .list_pool_values_by_service(&self.service.id)
            .unwrap()
    }

    pub fn pool_set(&self) -> PoolSetId {
        self.service.pool_set_id.unwrap()
    }
}

pub fn make_service(pool_set: Option<PoolSetId>, state: &str) -> ServiceRecord {
    ServiceRecord {
        id: ServiceId::new(),
        service_type_id: ServiceTypeId::new(),
        provider_id: ParticipantId::new(),
        consumer_id: ParticipantId::new(),
        group_id: ServiceGroupId::new(),
        pool_set_id: pool_set,
        current_state: state.to_string(),
        properties: Map::new(),
    }
}

/// A subnet pool over `cidr` with nothing excluded.
pub fn subnet_pool(pool_set: PoolSetId, pool_type: &str, cidr: &str) -> ResourcePool {
    ResourcePool {
        id: PoolId::new(),
        pool_set_id: pool_set,
        name: format!("{pool_type}-subnet"),
        pool_type: pool_type.to_string(),
        generator_type: PoolGeneratorType::Subnet,
        generator_config: Some(json!({ "cidr": cidr })),
    }
}

/// A JSON object literal as a property map.
pub fn props(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// The field errors of a failed validation.
pub fn field_errors(result: Result<impl Sized, EngineError>) -> ValidationErrors {
    match result {
        Err(EngineError::Validation(errors)) => errors,
        Err(other) => panic!("expected validation errors, got {other}"),
        Ok(_) => panic!("expected validation errors, got success"),
    }
}

/// `(path, message)` pairs, for compact assertions.
pub fn pairs(errors: &ValidationErrors) -> Vec<(String, String)> {
    errors
        .iter()
        .map(|e| (e.path.clone(), e.message.clone()))
        .collect()
}
