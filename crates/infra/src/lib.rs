//! `storefront-infra` — storage for the catalog and order domains.
//!
//! The [`store::Store`] trait is the transactional boundary the domain needs:
//! the in-memory implementation backs development and tests, and a
//! Postgres-backed implementation is available behind the `postgres` feature.

pub mod store;

pub use store::{MemoryStore, Store, StoreError};

#[cfg(feature = "postgres")]
pub use store::postgres::PgStore;
