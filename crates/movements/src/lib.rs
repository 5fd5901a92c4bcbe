//! Movements domain module.
//!
//! The movement ledger is the system's journal: every stock change is an
//! immutable, append-only record. This crate holds the record types and the
//! pure stock arithmetic; persistence and orchestration live elsewhere.

pub mod effect;
pub mod movement;

pub use effect::{StockEffect, replay_stock};
pub use movement::{InventoryMovement, MovementRequest, MovementType, ReasonCategory};
