//! Value generators for omitted properties.

use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::pool::allocator_for;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use svcschema_model::StandardValue;
use svcschema_types::{PoolSetId, ResourcePool};
use tracing::debug;

/// A named producer of values.
pub trait Generator: Send + Sync {
    /// Produces a value for the property at `path`.
    ///
    /// `current` is the service's existing value, if any. Returns the value
    /// to use and whether it was newly generated.
    fn generate(
        &self,
        ctx: &EngineContext<'_>,
        path: &str,
        current: Option<&StandardValue>,
        config: &Value,
    ) -> EngineResult<(Option<StandardValue>, bool)>;

    /// Gives back whatever [`Generator::generate`] took for the service.
    fn release(&self, ctx: &EngineContext<'_>, path: &str, config: &Value) -> EngineResult<()>;

    fn validate_config(&self, config: &Value) -> Result<(), String>;
}

/// Every built-in generator, keyed by name.
pub fn builtin() -> Vec<(&'static str, Arc<dyn Generator>)> {
    let pool: Arc<dyn Generator> = Arc::new(PoolGenerator);
    vec![(PoolGenerator::NAME, pool)]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoolGeneratorConfig {
    pool_type: String,
}

/// Draws values from the service's pool set.
///
/// Config: `{"poolType": "public_ip"}`. The pool set is taken from the
/// service; the first pool of the requested type in it does the
/// allocation, with whatever strategy that pool declares.
pub struct PoolGenerator;

impl PoolGenerator {
    pub const NAME: &'static str = "pool";

    fn parse(config: &Value) -> Result<PoolGeneratorConfig, String> {
        let parsed: PoolGeneratorConfig =
            serde_json::from_value(config.clone()).map_err(|e| e.to_string())?;
        if parsed.pool_type.trim().is_empty() {
            return Err("poolType must not be empty".to_string());
        }
        Ok(parsed)
    }

    fn find_pool(
        ctx: &EngineContext<'_>,
        pool_set: &PoolSetId,
        pool_type: &str,
    ) -> EngineResult<Option<ResourcePool>> {
        let pools = ctx
            .store
            .list_pools_by_pool_set(pool_set)
            .map_err(|e| EngineError::store(format!("listing pools of pool set {pool_set}"), e))?;
        Ok(pools.into_iter().find(|p| p.pool_type == pool_type))
    }
}

impl Generator for PoolGenerator {
    fn generate(
        &self,
        ctx: &EngineContext<'_>,
        path: &str,
        current: Option<&StandardValue>,
        config: &Value,
    ) -> EngineResult<(Option<StandardValue>, bool)> {
        if let Some(current) = current {
            return Ok((Some(current.clone()), false));
        }

        let config = Self::parse(config).map_err(|e| {
            EngineError::generation(path, format!("invalid {} generator config: {e}", Self::NAME))
        })?;
        let Some(pool_set) = ctx.service.pool_set_id else {
            return Err(EngineError::generation(path, "service has no pool set"));
        };
        let Some(pool) = Self::find_pool(ctx, &pool_set, &config.pool_type)? else {
            return Err(EngineError::generation(
                path,
                format!("no pool of type {} in pool set {pool_set}", config.pool_type),
            ));
        };

        let allocator = allocator_for(pool.generator_type);
        let raw = allocator.allocate(ctx.store, &pool, ctx.service.id, path)?;
        match StandardValue::from_json(&raw) {
            Ok(Some(value)) => Ok((Some(value), true)),
            Ok(None) => Err(EngineError::generation(
                path,
                format!("pool {} holds a null value", pool.name),
            )),
            Err(e) => Err(EngineError::generation(path, e.to_string())),
        }
    }

    fn release(&self, ctx: &EngineContext<'_>, path: &str, config: &Value) -> EngineResult<()> {
        let config = Self::parse(config).map_err(|e| {
            EngineError::generation(path, format!("invalid {} generator config: {e}", Self::NAME))
        })?;
        let Some(pool_set) = ctx.service.pool_set_id else {
            debug!("{}: service has no pool set, nothing to release", path);
            return Ok(());
        };
        let Some(pool) = Self::find_pool(ctx, &pool_set, &config.pool_type)? else {
            debug!("{}: no {} pool, nothing to release", path, config.pool_type);
            return Ok(());
        };
        allocator_for(pool.generator_type).release(ctx.store, &pool, ctx.service.id)?;
        Ok(())
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        Self::parse(config).map(drop)
    }
}
