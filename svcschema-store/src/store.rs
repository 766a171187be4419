use crate::StoreResult;
use svcschema_types::{
    OptionTypeId, ParticipantId, PoolId, PoolSetId, PoolValue, ResourcePool, ServiceId,
    ServiceOption, ServiceOptionType, ServiceRecord, ServiceTypeId, ServiceTypeRecord,
};

/// The narrow surface the engine needs from persistence.
///
/// All calls are blocking; retries and timeouts are the implementation's
/// business.
pub trait Store: Send + Sync {
    /// Looks a service up by id.
    fn find_service(&self, id: &ServiceId) -> StoreResult<Option<ServiceRecord>>;

    /// Looks a service type up by id.
    fn find_service_type(&self, id: &ServiceTypeId) -> StoreResult<Option<ServiceTypeRecord>>;

    /// Looks an option category up by its lookup key.
    fn find_service_option_type_by_name(
        &self,
        option_type: &str,
    ) -> StoreResult<Option<ServiceOptionType>>;

    /// Enabled options `provider` offers in `option_type`.
    fn list_enabled_service_options(
        &self,
        provider: &ParticipantId,
        option_type: &OptionTypeId,
    ) -> StoreResult<Vec<ServiceOption>>;

    /// All pools in a pool set.
    fn list_pools_by_pool_set(&self, pool_set: &PoolSetId) -> StoreResult<Vec<ResourcePool>>;

    /// Unallocated values of a pool, ordered by name.
    fn list_available_pool_values(&self, pool: &PoolId) -> StoreResult<Vec<PoolValue>>;

    /// Every value of a pool, allocated or not.
    fn list_pool_values(&self, pool: &PoolId) -> StoreResult<Vec<PoolValue>>;

    /// Every value allocated to `service`, across all pools.
    fn list_pool_values_by_service(&self, service: &ServiceId) -> StoreResult<Vec<PoolValue>>;

    fn create_pool_value(&self, value: &PoolValue) -> StoreResult<()>;

    /// Persists the allocation fields of an existing pool value.
    fn update_pool_value(&self, value: &PoolValue) -> StoreResult<()>;

    /// Runs `work` as one isolated unit: all of it commits or none of it.
    fn atomic(&self, work: &mut dyn FnMut(&dyn Store) -> StoreResult<()>) -> StoreResult<()>;
}
