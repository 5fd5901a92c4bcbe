//! Product catalog persistence.

pub mod postgres;
pub mod store;

pub use postgres::PostgresProductStore;
pub use store::{InMemoryProductStore, ProductFilter, ProductStore, ProductStoreError};
