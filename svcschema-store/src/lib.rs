//! Store collaborator for the svcschema engine.
//!
//! The engine reads services, service types and provider options, and
//! reads/writes resource-pool values, only through the [`Store`] trait.
//! [`SqliteStore`] is the bundled implementation; any other backend can
//! plug in by implementing the trait.
//!
//! # Transactions
//!
//! The engine never opens transactions itself. Callers wrap mutating
//! engine calls (pool allocation and release) in [`Store::atomic`] so the
//! read-then-write sequence of an allocation is isolated from concurrent
//! allocators. Correctness under concurrent allocation against the same
//! pool depends on the isolation the implementation gives that unit.

mod error;
mod sqlite;
mod store;

pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteStore;
pub use store::Store;
