//! Infrastructure layer: persistence backends, the ledger engine, and the
//! automatic adjustment recorder.

pub mod catalog;
pub mod ledger;
pub mod locks;
pub mod movement_store;
pub mod product_store;
pub mod recorder;

#[cfg(test)]
mod integration_tests;
