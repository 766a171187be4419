//! SQLite-backed [`Store`].
//!
//! One connection behind a mutex. Atomic units take a second gate mutex
//! for their whole duration and run inside `BEGIN IMMEDIATE`, so two
//! allocations issued through the same handle never interleave.

use crate::error::{StoreError, StoreResult};
use crate::store::Store;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use svcschema_types::{
    Allocation, OptionTypeId, ParticipantId, PoolGeneratorType, PoolId, PoolSetId, PoolValue,
    ResourcePool, ServiceId, ServiceOption, ServiceOptionType, ServiceRecord, ServiceTypeId,
    ServiceTypeRecord,
};
use tracing::{debug, warn};

const POOL_VALUE_COLUMNS: &str =
    "id, pool_id, name, value, service_id, property_name, allocated_at";

/// Persistent store backed by SQLite.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    tx_gate: Arc<Mutex<()>>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            tx_gate: Arc::new(Mutex::new(())),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS service_types (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS services (
                id TEXT PRIMARY KEY,
                service_type_id TEXT NOT NULL,
                provider_id TEXT NOT NULL,
                consumer_id TEXT NOT NULL,
                group_id TEXT NOT NULL,
                pool_set_id TEXT,
                current_state TEXT NOT NULL,
                properties TEXT NOT NULL DEFAULT '{}'
            );

            CREATE TABLE IF NOT EXISTS service_option_types (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                option_type TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS service_options (
                id TEXT PRIMARY KEY,
                provider_id TEXT NOT NULL,
                option_type_id TEXT NOT NULL,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                enabled INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS resource_pools (
                id TEXT PRIMARY KEY,
                pool_set_id TEXT NOT NULL,
                name TEXT NOT NULL,
                pool_type TEXT NOT NULL,
                generator_type TEXT NOT NULL,
                generator_config TEXT
            );

            CREATE TABLE IF NOT EXISTS pool_values (
                id TEXT PRIMARY KEY,
                pool_id TEXT NOT NULL,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                service_id TEXT,
                property_name TEXT,
                allocated_at TEXT,
                CHECK ((service_id IS NULL) = (property_name IS NULL)),
                CHECK ((service_id IS NULL) = (allocated_at IS NULL))
            );

            CREATE INDEX IF NOT EXISTS idx_pool_values_pool ON pool_values(pool_id);
            CREATE INDEX IF NOT EXISTS idx_pool_values_service ON pool_values(service_id);
            ",
        )?;
        debug!("svcschema store schema ready");
        Ok(())
    }

    // ── Seeding ──────────────────────────────────────────────────

    /// Saves (or replaces) a service record.
    pub fn insert_service(&self, service: &ServiceRecord) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO services
                (id, service_type_id, provider_id, consumer_id, group_id, pool_set_id, current_state, properties)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                service.id.to_string(),
                service.service_type_id.to_string(),
                service.provider_id.to_string(),
                service.consumer_id.to_string(),
                service.group_id.to_string(),
                service.pool_set_id.map(|id| id.to_string()),
                service.current_state,
                serde_json::to_string(&service.properties)?,
            ],
        )?;
        Ok(())
    }

    /// Saves (or replaces) a service type.
    pub fn insert_service_type(&self, service_type: &ServiceTypeRecord) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO service_types (id, name) VALUES (?1, ?2)",
            params![service_type.id.to_string(), service_type.name],
        )?;
        Ok(())
    }

    /// Saves (or replaces) an option category.
    pub fn insert_option_type(&self, option_type: &ServiceOptionType) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO service_option_types (id, name, option_type) VALUES (?1, ?2, ?3)",
            params![
                option_type.id.to_string(),
                option_type.name,
                option_type.option_type
            ],
        )?;
        Ok(())
    }

    /// Saves (or replaces) a provider option.
    pub fn insert_service_option(&self, option: &ServiceOption) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO service_options (id, provider_id, option_type_id, name, value, enabled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                option.id.to_string(),
                option.provider_id.to_string(),
                option.option_type_id.to_string(),
                option.name,
                serde_json::to_string(&option.value)?,
                option.enabled,
            ],
        )?;
        Ok(())
    }

    /// Saves (or replaces) a resource pool.
    pub fn insert_pool(&self, pool: &ResourcePool) -> StoreResult<()> {
        let config = pool
            .generator_config
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO resource_pools (id, pool_set_id, name, pool_type, generator_type, generator_config)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                pool.id.to_string(),
                pool.pool_set_id.to_string(),
                pool.name,
                pool.pool_type,
                pool.generator_type.to_string(),
                config,
            ],
        )?;
        Ok(())
    }

    /// Saves a pre-seeded pool value (list pools).
    pub fn insert_pool_value(&self, value: &PoolValue) -> StoreResult<()> {
        self.create_pool_value(value)
    }

    /// Lists every pool (for administrative listings).
    pub fn list_pools(&self) -> StoreResult<Vec<ResourcePool>> {
        self.query_pools(
            "SELECT id, pool_set_id, name, pool_type, generator_type, generator_config
             FROM resource_pools ORDER BY name",
            None,
        )
    }

    fn query_pools(&self, sql: &str, pool_set: Option<&PoolSetId>) -> StoreResult<Vec<ResourcePool>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &Row<'_>| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        };
        let rows = match pool_set {
            Some(set) => stmt
                .query_map(params![set.to_string()], map_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
        };

        let mut result = Vec::with_capacity(rows.len());
        for (id, set_id, name, pool_type, generator_type, config) in rows {
            let generator_type = PoolGeneratorType::from_str(&generator_type)
                .map_err(|e| StoreError::InvalidData(format!("pool {id}: {e}")))?;
            result.push(ResourcePool {
                id: parse_id(&id, "pool id")?,
                pool_set_id: parse_id(&set_id, "pool set id")?,
                name,
                pool_type,
                generator_type,
                generator_config: config.map(|c| serde_json::from_str(&c)).transpose()?,
            });
        }
        Ok(result)
    }

    fn query_pool_values(
        &self,
        filter: &str,
        key: String,
    ) -> StoreResult<Vec<PoolValue>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {POOL_VALUE_COLUMNS} FROM pool_values WHERE {filter} ORDER BY name, id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut result = Vec::with_capacity(rows.len());
        for (id, pool_id, name, value, service_id, property_name, allocated_at) in rows {
            let allocation = match (service_id, property_name, allocated_at) {
                (Some(service), Some(property_name), Some(at)) => Some(Allocation {
                    service_id: parse_id(&service, "service id")?,
                    property_name,
                    allocated_at: parse_timestamp(&at)?,
                }),
                (None, None, None) => None,
                _ => {
                    return Err(StoreError::InvalidData(format!(
                        "pool value {id} is partially allocated"
                    )));
                }
            };
            result.push(PoolValue {
                id: parse_id(&id, "pool value id")?,
                pool_id: parse_id(&pool_id, "pool id")?,
                name,
                value: serde_json::from_str(&value)?,
                allocation,
            });
        }
        Ok(result)
    }
}

impl Store for SqliteStore {
    fn find_service(&self, id: &ServiceId) -> StoreResult<Option<ServiceRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT service_type_id, provider_id, consumer_id, group_id, pool_set_id, current_state, properties
                 FROM services WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((service_type, provider, consumer, group, pool_set, state, properties)) = row
        else {
            return Ok(None);
        };
        Ok(Some(ServiceRecord {
            id: *id,
            service_type_id: parse_id(&service_type, "service type id")?,
            provider_id: parse_id(&provider, "provider id")?,
            consumer_id: parse_id(&consumer, "consumer id")?,
            group_id: parse_id(&group, "group id")?,
            pool_set_id: pool_set.map(|s| parse_id(&s, "pool set id")).transpose()?,
            current_state: state,
            properties: serde_json::from_str(&properties)?,
        }))
    }

    fn find_service_type(&self, id: &ServiceTypeId) -> StoreResult<Option<ServiceTypeRecord>> {
        let conn = self.conn()?;
        let name = conn
            .query_row(
                "SELECT name FROM service_types WHERE id = ?1",
                params![id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(name.map(|name| ServiceTypeRecord { id: *id, name }))
    }

    fn find_service_option_type_by_name(
        &self,
        option_type: &str,
    ) -> StoreResult<Option<ServiceOptionType>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, name FROM service_option_types WHERE option_type = ?1",
                params![option_type],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((id, name)) = row else {
            return Ok(None);
        };
        Ok(Some(ServiceOptionType {
            id: parse_id(&id, "option type id")?,
            name,
            option_type: option_type.to_string(),
        }))
    }

    fn list_enabled_service_options(
        &self,
        provider: &ParticipantId,
        option_type: &OptionTypeId,
    ) -> StoreResult<Vec<ServiceOption>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, value FROM service_options
             WHERE provider_id = ?1 AND option_type_id = ?2 AND enabled = 1
             ORDER BY name",
        )?;
        let rows = stmt
            .query_map(params![provider.to_string(), option_type.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut result = Vec::with_capacity(rows.len());
        for (id, name, value) in rows {
            result.push(ServiceOption {
                id: parse_id(&id, "option id")?,
                provider_id: *provider,
                option_type_id: *option_type,
                name,
                value: serde_json::from_str(&value)?,
                enabled: true,
            });
        }
        Ok(result)
    }

    fn list_pools_by_pool_set(&self, pool_set: &PoolSetId) -> StoreResult<Vec<ResourcePool>> {
        self.query_pools(
            "SELECT id, pool_set_id, name, pool_type, generator_type, generator_config
             FROM resource_pools WHERE pool_set_id = ?1 ORDER BY name",
            Some(pool_set),
        )
    }

    fn list_available_pool_values(&self, pool: &PoolId) -> StoreResult<Vec<PoolValue>> {
        self.query_pool_values("pool_id = ?1 AND service_id IS NULL", pool.to_string())
    }

    fn list_pool_values(&self, pool: &PoolId) -> StoreResult<Vec<PoolValue>> {
        self.query_pool_values("pool_id = ?1", pool.to_string())
    }

    fn list_pool_values_by_service(&self, service: &ServiceId) -> StoreResult<Vec<PoolValue>> {
        self.query_pool_values("service_id = ?1", service.to_string())
    }

    fn create_pool_value(&self, value: &PoolValue) -> StoreResult<()> {
        let conn = self.conn()?;
        let allocation = value.allocation.as_ref();
        conn.execute(
            "INSERT INTO pool_values (id, pool_id, name, value, service_id, property_name, allocated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                value.id.to_string(),
                value.pool_id.to_string(),
                value.name,
                serde_json::to_string(&value.value)?,
                allocation.map(|a| a.service_id.to_string()),
                allocation.map(|a| a.property_name.clone()),
                allocation.map(|a| a.allocated_at.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn update_pool_value(&self, value: &PoolValue) -> StoreResult<()> {
        let conn = self.conn()?;
        let allocation = value.allocation.as_ref();
        let changed = conn.execute(
            "UPDATE pool_values SET service_id = ?1, property_name = ?2, allocated_at = ?3 WHERE id = ?4",
            params![
                allocation.map(|a| a.service_id.to_string()),
                allocation.map(|a| a.property_name.clone()),
                allocation.map(|a| a.allocated_at.to_rfc3339()),
                value.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "pool value",
                id: value.id.to_string(),
            });
        }
        Ok(())
    }

    fn atomic(&self, work: &mut dyn FnMut(&dyn Store) -> StoreResult<()>) -> StoreResult<()> {
        // Not re-entrant: nesting atomic units on one handle deadlocks.
        let _gate = self.tx_gate.lock().map_err(|_| StoreError::Lock)?;
        self.conn()?.execute_batch("BEGIN IMMEDIATE")?;

        let outcome = work(self);
        let finish = match outcome {
            Ok(()) => self.conn()?.execute_batch("COMMIT"),
            Err(_) => self.conn()?.execute_batch("ROLLBACK"),
        };

        match (outcome, finish) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(commit_err)) => {
                if let Err(e) = self.conn()?.execute_batch("ROLLBACK") {
                    warn!("Rollback after failed commit also failed: {}", e);
                }
                Err(commit_err.into())
            }
            (Err(work_err), rollback) => {
                if let Err(e) = rollback {
                    warn!("Rollback failed: {}", e);
                }
                warn!("Atomic unit rolled back: {}", work_err);
                Err(work_err)
            }
        }
    }
}

fn parse_id<T: FromStr<Err = svcschema_types::Error>>(s: &str, what: &str) -> StoreResult<T> {
    s.parse()
        .map_err(|e| StoreError::InvalidData(format!("invalid {what} {s:?}: {e}")))
}

fn parse_timestamp(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("invalid allocation timestamp {s:?}: {e}")))
}
