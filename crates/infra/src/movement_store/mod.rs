//! Movement ledger persistence.
//!
//! `MovementStore` covers appends and replay reads, `MovementQuery` covers
//! filtered listing and aggregation. Two backends: in-memory for tests and
//! single-process use, Postgres for production.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryMovementStore;
pub use postgres::PostgresMovementStore;
pub use query::{LedgerStats, MovementFilter, MovementPage, MovementQuery, Pagination};
pub use r#trait::{MovementStore, MovementStoreError};
