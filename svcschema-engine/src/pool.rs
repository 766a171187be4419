//! Resource pool allocation strategies.
//!
//! A pool hands out values to services. `list` pools are pre-seeded and
//! hand out their first free value by name; `subnet` pools carve addresses
//! out of a CIDR block on demand. Releasing clears the allocation fields
//! and never deletes the row, so a released value can be handed out again.
//!
//! Neither strategy locks anything: each allocation is a read followed by a
//! write, and isolation from concurrent allocators must come from the
//! caller's atomic unit (see [`crate::run_atomic`]).

use crate::error::{EngineError, EngineResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ops::Range;
use svcschema_store::Store;
use svcschema_types::{PoolGeneratorType, PoolValue, ResourcePool, ServiceId};
use tracing::debug;

/// One allocation strategy.
pub trait PoolAllocator {
    /// Allocates one value of `pool` to `service` for `property` and
    /// returns it.
    fn allocate(
        &self,
        store: &dyn Store,
        pool: &ResourcePool,
        service: ServiceId,
        property: &str,
    ) -> EngineResult<Value>;

    /// Returns every value of `pool` held by `service`. Returns how many
    /// were released.
    fn release(
        &self,
        store: &dyn Store,
        pool: &ResourcePool,
        service: ServiceId,
    ) -> EngineResult<usize> {
        release_service_values(store, pool, service)
    }
}

/// The strategy a pool declares.
pub fn allocator_for(kind: PoolGeneratorType) -> &'static dyn PoolAllocator {
    match kind {
        PoolGeneratorType::List => &ListAllocator,
        PoolGeneratorType::Subnet => &SubnetAllocator,
    }
}

fn release_service_values(
    store: &dyn Store,
    pool: &ResourcePool,
    service: ServiceId,
) -> EngineResult<usize> {
    let held = store
        .list_pool_values_by_service(&service)
        .map_err(|e| EngineError::store(format!("listing pool values of service {service}"), e))?;

    let mut released = 0;
    for mut value in held.into_iter().filter(|v| v.pool_id == pool.id) {
        value.release();
        store
            .update_pool_value(&value)
            .map_err(|e| EngineError::store(format!("releasing pool value {}", value.name), e))?;
        released += 1;
    }
    debug!(
        "Released {} value(s) of pool {} held by service {}",
        released, pool.name, service
    );
    Ok(released)
}

// ── List ─────────────────────────────────────────────────────────

/// Hands out pre-seeded values, first free name first.
pub struct ListAllocator;

impl PoolAllocator for ListAllocator {
    fn allocate(
        &self,
        store: &dyn Store,
        pool: &ResourcePool,
        service: ServiceId,
        property: &str,
    ) -> EngineResult<Value> {
        let available = store
            .list_available_pool_values(&pool.id)
            .map_err(|e| EngineError::store(format!("listing values of pool {}", pool.name), e))?;

        let Some(mut value) = available.into_iter().next() else {
            return Err(EngineError::generation(
                property,
                format!("no available values in pool {}", pool.name),
            ));
        };

        value.allocate(service, property, Utc::now());
        store
            .update_pool_value(&value)
            .map_err(|e| EngineError::store(format!("allocating pool value {}", value.name), e))?;
        debug!(
            "Allocated {} from pool {} to {} of service {}",
            value.name, pool.name, property, service
        );
        Ok(value.value)
    }
}

// ── Subnet ───────────────────────────────────────────────────────

/// Configuration of a subnet pool, as stored in the pool's generator config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetConfig {
    /// Block to allocate from, e.g. `10.0.0.0/24`.
    pub cidr: String,
    /// Addresses never handed out at the start of the block.
    #[serde(default)]
    pub exclude_first: u64,
    /// Addresses never handed out at the end of the block.
    #[serde(default)]
    pub exclude_last: u64,
}

impl SubnetConfig {
    /// Reads the pool's config together with its parsed block.
    pub fn from_pool(pool: &ResourcePool) -> Result<(Self, Subnet), String> {
        let raw = pool
            .generator_config
            .as_ref()
            .ok_or_else(|| format!("subnet pool {} has no configuration", pool.name))?;
        let config: Self = serde_json::from_value(raw.clone())
            .map_err(|e| format!("invalid subnet config of pool {}: {e}", pool.name))?;
        let subnet = Subnet::parse(&config.cidr)?;
        Ok((config, subnet))
    }
}

/// An IPv4 or IPv6 block.
///
/// Candidate addresses are numbered by offset from the address after the
/// network address: offset 0 of `10.0.0.0/30` is `10.0.0.1`, the last
/// offset is `10.0.0.3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    network: u128,
    prefix: u32,
    v6: bool,
}

impl Subnet {
    /// Parses `addr/prefix`. Host bits of `addr` are masked off.
    pub fn parse(cidr: &str) -> Result<Self, String> {
        let (addr, prefix) = cidr
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("invalid CIDR {cidr:?}: missing prefix length"))?;
        let addr: IpAddr = addr
            .parse()
            .map_err(|e| format!("invalid CIDR {cidr:?}: {e}"))?;
        let prefix: u32 = prefix
            .parse()
            .map_err(|e| format!("invalid CIDR {cidr:?}: {e}"))?;

        let (bits, raw, v6) = match addr {
            IpAddr::V4(a) => (32, u128::from(u32::from(a)), false),
            IpAddr::V6(a) => (128, u128::from(a), true),
        };
        if prefix > bits {
            return Err(format!(
                "invalid CIDR {cidr:?}: prefix length {prefix} exceeds {bits}"
            ));
        }

        let host_bits = bits - prefix;
        Ok(Self {
            network: raw & !host_mask(host_bits),
            prefix,
            v6,
        })
    }

    fn host_bits(&self) -> u32 {
        let bits = if self.v6 { 128 } else { 32 };
        bits - self.prefix
    }

    /// Number of addresses after the network address.
    pub fn host_count(&self) -> u128 {
        host_mask(self.host_bits())
    }

    /// The address at `offset`. Callers keep `offset < host_count()`.
    pub fn address(&self, offset: u128) -> IpAddr {
        let raw = self.network + 1 + offset;
        if self.v6 {
            IpAddr::V6(Ipv6Addr::from(raw))
        } else {
            // Offsets stay inside the block, so the value fits in 32 bits.
            IpAddr::V4(Ipv4Addr::from(raw as u32))
        }
    }

    /// Offsets left after dropping `exclude_first` from the start and
    /// `exclude_last` from the end.
    pub fn usable_offsets(&self, exclude_first: u64, exclude_last: u64) -> Range<u128> {
        let end = self.host_count().saturating_sub(u128::from(exclude_last));
        u128::from(exclude_first).min(end)..end
    }

    /// Usable addresses, in ascending order.
    pub fn usable(
        &self,
        exclude_first: u64,
        exclude_last: u64,
    ) -> impl Iterator<Item = IpAddr> + '_ {
        self.usable_offsets(exclude_first, exclude_last)
            .map(move |offset| self.address(offset))
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let network = if self.v6 {
            IpAddr::V6(Ipv6Addr::from(self.network))
        } else {
            IpAddr::V4(Ipv4Addr::from(self.network as u32))
        };
        write!(f, "{network}/{}", self.prefix)
    }
}

fn host_mask(host_bits: u32) -> u128 {
    if host_bits == 0 {
        0
    } else {
        u128::MAX >> (128 - host_bits)
    }
}

/// Carves addresses out of the pool's CIDR block on demand.
pub struct SubnetAllocator;

impl PoolAllocator for SubnetAllocator {
    fn allocate(
        &self,
        store: &dyn Store,
        pool: &ResourcePool,
        service: ServiceId,
        property: &str,
    ) -> EngineResult<Value> {
        let misconfigured = |reason: String| EngineError::generation(property, reason);
        let (config, subnet) = SubnetConfig::from_pool(pool).map_err(misconfigured)?;

        let existing = store
            .list_pool_values(&pool.id)
            .map_err(|e| EngineError::store(format!("listing values of pool {}", pool.name), e))?;
        let mut taken = HashSet::new();
        let mut released: HashMap<String, PoolValue> = HashMap::new();
        for value in existing {
            let address = value
                .value
                .as_str()
                .map_or_else(|| value.name.clone(), str::to_string);
            if value.is_allocated() {
                taken.insert(address);
            } else {
                released.entry(address).or_insert(value);
            }
        }

        let free = subnet
            .usable(config.exclude_first, config.exclude_last)
            .map(|addr| addr.to_string())
            .find(|addr| !taken.contains(addr));
        let Some(address) = free else {
            return Err(EngineError::generation(
                property,
                format!("subnet exhausted: {}", config.cidr),
            ));
        };

        let now = Utc::now();
        let write = match released.remove(&address) {
            Some(mut row) => {
                row.allocate(service, property, now);
                store.update_pool_value(&row)
            }
            None => {
                let mut row =
                    PoolValue::new(pool.id, address.clone(), Value::String(address.clone()));
                row.allocate(service, property, now);
                store.create_pool_value(&row)
            }
        };
        write.map_err(|e| EngineError::store(format!("allocating address {address}"), e))?;

        debug!(
            "Allocated {} from subnet {} to {} of service {}",
            address, subnet, property, service
        );
        Ok(Value::String(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_bits_are_masked() {
        let subnet = Subnet::parse("10.0.0.7/30").unwrap();
        assert_eq!(subnet.to_string(), "10.0.0.4/30");
    }

    #[test]
    fn slash_30_offsets() {
        let subnet = Subnet::parse("10.0.0.0/30").unwrap();
        assert_eq!(subnet.host_count(), 3);
        let all: Vec<String> = subnet.usable(0, 0).map(|a| a.to_string()).collect();
        assert_eq!(all, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        let inner: Vec<String> = subnet.usable(1, 1).map(|a| a.to_string()).collect();
        assert_eq!(inner, vec!["10.0.0.2"]);
    }

    #[test]
    fn exclusions_larger_than_block_leave_nothing() {
        let subnet = Subnet::parse("10.0.0.0/30").unwrap();
        assert_eq!(subnet.usable(5, 0).count(), 0);
        assert_eq!(subnet.usable(0, 5).count(), 0);
        assert_eq!(Subnet::parse("10.0.0.1/32").unwrap().host_count(), 0);
    }

    #[test]
    fn ipv6_blocks() {
        let subnet = Subnet::parse("fd00::/126").unwrap();
        let all: Vec<String> = subnet.usable(0, 0).map(|a| a.to_string()).collect();
        assert_eq!(all, vec!["fd00::1", "fd00::2", "fd00::3"]);
        assert_eq!(Subnet::parse("::/0").unwrap().host_count(), u128::MAX);
    }

    #[test]
    fn malformed_cidrs() {
        assert!(Subnet::parse("10.0.0.0").is_err());
        assert!(Subnet::parse("10.0.0.0/33").is_err());
        assert!(Subnet::parse("banana/8").is_err());
        assert!(Subnet::parse("10.0.0.0/x").is_err());
    }
}
